//! CPU reference depth pass.
//!
//! The host renderer normally fills the shadow map and the scene depth
//! buffer. For tests and offline analysis the same textures are produced here
//! by casting one ray per texel against simple occluders.

use foundation::math::{Mat4, Vec3};

/// Depth written where no occluder is hit.
pub const CLEAR_DEPTH: f32 = 1.0;

const RAY_EPSILON: f64 = 1.0e-9;

/// NDC (`x, y` in `[-1, 1]`, y up) to texture space (`u, v` in `[0, 1]`,
/// v down). Depth passes through.
pub fn ndc_to_texture() -> Mat4 {
    Mat4::from_rows([
        [0.5, 0.0, 0.0, 0.5],
        [0.0, -0.5, 0.0, 0.5],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ])
}

/// Row-major `f32` depth texture, row 0 at the top.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMap {
    width: u32,
    height: u32,
    depths: Vec<f32>,
}

impl DepthMap {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depths: vec![CLEAR_DEPTH; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.depths.get(y as usize * self.width as usize + x as usize).copied()
    }

    pub fn set(&mut self, x: u32, y: u32, depth: f32) {
        if x < self.width && y < self.height {
            self.depths[y as usize * self.width as usize + x as usize] = depth;
        }
    }

    /// Texel lookup with edge clamping.
    pub fn fetch_clamped(&self, x: i64, y: i64) -> f32 {
        if self.width == 0 || self.height == 0 {
            return CLEAR_DEPTH;
        }
        let x = x.clamp(0, self.width as i64 - 1) as u32;
        let y = y.clamp(0, self.height as i64 - 1) as u32;
        self.get(x, y).unwrap_or(CLEAR_DEPTH)
    }

    /// Raw texel data, e.g. for a `Depth32Float` upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.depths)
    }

    /// Fills the map through `to_texture` (world to `[0, 1]` texture space with
    /// depth). One ray per texel center; the nearest hit wins.
    pub fn render(
        width: u32,
        height: u32,
        to_texture: &Mat4,
        occluders: &[Box<dyn Occluder>],
    ) -> Option<Self> {
        let from_texture = to_texture.inverse()?;
        let mut map = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let u = (x as f64 + 0.5) / width as f64;
                let v = (y as f64 + 0.5) / height as f64;
                let (Some(near), Some(far)) = (
                    from_texture.transform_point(Vec3::new(u, v, 0.0)),
                    from_texture.transform_point(Vec3::new(u, v, 1.0)),
                ) else {
                    continue;
                };
                let ray = Ray::new(near, far - near);
                let hit = occluders
                    .iter()
                    .filter_map(|o| o.intersect(&ray))
                    .fold(f64::INFINITY, f64::min);
                if !hit.is_finite() {
                    continue;
                }
                let Some(p) = to_texture.transform_point(ray.at(hit)) else {
                    continue;
                };
                if (0.0..=1.0).contains(&p.z) {
                    map.set(x, y, p.z as f32);
                }
            }
        }
        Some(map)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    pub fn at(&self, t: f64) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Anything that can block a ray. `intersect` returns the smallest ray
/// parameter `t > 0` of a hit.
pub trait Occluder: std::fmt::Debug {
    fn intersect(&self, ray: &Ray) -> Option<f64>;
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Triangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
}

impl Triangle {
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self { a, b, c }
    }
}

impl Occluder for Triangle {
    // Möller-Trumbore; double-sided.
    fn intersect(&self, ray: &Ray) -> Option<f64> {
        let e1 = self.b - self.a;
        let e2 = self.c - self.a;
        let p = ray.direction.cross(e2);
        let det = e1.dot(p);
        if det.abs() < RAY_EPSILON * e1.length() * e2.length() * ray.direction.length() {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = ray.origin - self.a;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(e1);
        let v = ray.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = e2.dot(q) * inv_det;
        (t > RAY_EPSILON).then_some(t)
    }
}

/// Vertical rectangle standing on the segment `start..end`, extruded along
/// `up` by `height`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Wall {
    pub start: Vec3,
    pub end: Vec3,
    pub up: Vec3,
    pub height: f64,
}

impl Wall {
    pub fn new(start: Vec3, end: Vec3, up: Vec3, height: f64) -> Self {
        Self {
            start,
            end,
            up,
            height,
        }
    }

    fn triangles(&self) -> [Triangle; 2] {
        let lift = self.up.normalize().unwrap_or(Vec3::UNIT_Z) * self.height;
        let (a, b) = (self.start, self.end);
        let (c, d) = (b + lift, a + lift);
        [Triangle::new(a, b, c), Triangle::new(a, c, d)]
    }
}

impl Occluder for Wall {
    fn intersect(&self, ray: &Ray) -> Option<f64> {
        self.triangles()
            .iter()
            .filter_map(|t| t.intersect(ray))
            .reduce(f64::min)
    }
}

/// Infinite plane through `point`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GroundPlane {
    pub point: Vec3,
    pub normal: Vec3,
}

impl GroundPlane {
    pub fn new(point: Vec3, normal: Vec3) -> Self {
        Self { point, normal }
    }
}

impl Occluder for GroundPlane {
    fn intersect(&self, ray: &Ray) -> Option<f64> {
        let denom = self.normal.dot(ray.direction);
        if denom.abs() < RAY_EPSILON {
            return None;
        }
        let t = self.normal.dot(self.point - ray.origin) / denom;
        (t > RAY_EPSILON).then_some(t)
    }
}

#[cfg(test)]
mod tests {
    use super::{CLEAR_DEPTH, DepthMap, GroundPlane, Occluder, Ray, Triangle, Wall};
    use crate::shadow_camera::LightCamera;
    use foundation::math::Vec3;

    fn assert_close(a: f64, b: f64, eps: f64) {
        assert!((a - b).abs() <= eps, "{a} != {b} (eps={eps})");
    }

    #[test]
    fn triangle_hit_and_miss() {
        let tri = Triangle::new(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        let down = Ray::new(Vec3::new(0.2, 0.2, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert_close(tri.intersect(&down).unwrap(), 5.0, 1e-12);

        let outside = Ray::new(Vec3::new(0.8, 0.8, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(tri.intersect(&outside).is_none());

        let behind = Ray::new(Vec3::new(0.2, 0.2, 5.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(tri.intersect(&behind).is_none());
    }

    #[test]
    fn wall_blocks_between_its_ends_and_below_its_top() {
        let wall = Wall::new(
            Vec3::new(25.0, -10.0, 0.0),
            Vec3::new(25.0, 10.0, 0.0),
            Vec3::UNIT_Z,
            80.0,
        );
        let ray = Ray::new(Vec3::new(0.0, 0.0, 100.0), Vec3::new(50.0, 0.0, -100.0));
        assert_close(wall.intersect(&ray).unwrap(), 0.5, 1e-12);

        let over = Ray::new(Vec3::new(0.0, 0.0, 200.0), Vec3::new(50.0, 0.0, -10.0));
        assert!(wall.intersect(&over).is_none());
    }

    #[test]
    fn ground_plane_ignores_parallel_rays() {
        let ground = GroundPlane::new(Vec3::ZERO, Vec3::UNIT_Z);
        let flat = Ray::new(Vec3::new(0.0, 0.0, 1.0), Vec3::UNIT_X);
        assert!(ground.intersect(&flat).is_none());
    }

    #[test]
    fn rendered_depth_matches_projected_hit() {
        let cam = LightCamera::new(
            Vec3::new(0.0, 0.0, 100.0),
            Vec3::new(100.0, 0.0, 0.0),
            Vec3::UNIT_Z,
        )
        .unwrap();
        let m = cam.light_space_matrix().unwrap();
        let occluders: Vec<Box<dyn Occluder>> =
            vec![Box::new(GroundPlane::new(Vec3::ZERO, Vec3::UNIT_Z))];
        let map = DepthMap::render(64, 64, &m, &occluders).unwrap();

        // Center texel looks along the axis at the target.
        let expected = m.transform_point(Vec3::new(100.0, 0.0, 0.0)).unwrap().z;
        let center = map.get(32, 32).unwrap() as f64;
        assert_close(center, expected, 1e-4);

        // Top rows look above the horizon and stay clear.
        assert_eq!(map.get(32, 0), Some(CLEAR_DEPTH));
        assert_eq!(map.as_bytes().len(), 64 * 64 * 4);
    }

    #[test]
    fn out_of_range_access_is_clamped() {
        let mut map = DepthMap::new(2, 2);
        map.set(1, 1, 0.25);
        map.set(5, 5, 0.5);
        assert_eq!(map.fetch_clamped(9, 9), 0.25);
        assert_eq!(map.get(2, 0), None);
    }
}
