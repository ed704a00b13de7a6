use bytemuck::{Pod, Zeroable};
use foundation::Color;
use foundation::math::{Vec3, Vec4};
use gpu::{CameraMatrices, UniformBlock, UniformValue};
use serde::Serialize;

use crate::config::ViewshedConfig;
use crate::depth::{DepthMap, GroundPlane, Occluder, Ray};
use crate::shadow_camera::ShadowMap;

/// Scene depth at or beyond this is background.
pub const BACKGROUND_DEPTH: f32 = 1.0;
/// Light-space depth below which fragments are left untouched.
pub const NEAR_BAND_DEPTH: f64 = 1.0e-6;
/// Constant part of the shadow comparison bias, in light-space depth.
pub const DEPTH_BIAS: f64 = 1.0e-6;
/// Upper bound of the slope factor; also used when no normal is known.
pub const MAX_BIAS_SLOPE: f64 = 10.0;
const PCF_RADIUS: i64 = 1;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClassifierSettings {
    pub horizontal_half_angle: f64,
    pub vertical_half_angle: f64,
    pub max_distance: f64,
    pub visible_color: Color,
    pub hidden_color: Color,
    pub blend: f32,
}

impl ClassifierSettings {
    pub fn from_config(config: &ViewshedConfig) -> Self {
        Self {
            horizontal_half_angle: config.horizontal_half_angle(),
            vertical_half_angle: config.vertical_half_angle(),
            max_distance: config.distance,
            visible_color: config.visible_color,
            hidden_color: config.hidden_color,
            blend: config.alpha as f32,
        }
    }
}

/// Outcome for one fragment. Only `Visible` and `Hidden` change its color.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Classification {
    Background,
    OutsideFrustum,
    BeyondDistance,
    OutsideAngle,
    NearBand,
    Visible,
    /// Fraction of PCF taps that passed, below 1.
    Hidden { visibility: f64 },
}

impl Classification {
    pub fn is_classified(&self) -> bool {
        matches!(self, Classification::Visible | Classification::Hidden { .. })
    }

    pub fn shade(&self, original: Color, settings: &ClassifierSettings) -> Color {
        match self {
            Classification::Visible => original.mix_rgb(settings.visible_color, settings.blend),
            Classification::Hidden { .. } => {
                original.mix_rgb(settings.hidden_color, settings.blend)
            }
            _ => original,
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationCounts {
    pub visible: usize,
    pub hidden: usize,
    pub untouched: usize,
}

impl ClassificationCounts {
    pub fn record(&mut self, c: &Classification) {
        match c {
            Classification::Visible => self.visible += 1,
            Classification::Hidden { .. } => self.hidden += 1,
            _ => self.untouched += 1,
        }
    }
}

/// Composed color plus depth of the frame so far.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneFrame {
    pub color: Vec<Color>,
    pub depth: DepthMap,
}

impl SceneFrame {
    pub fn new(color: Color, depth: DepthMap) -> Self {
        let len = depth.width() as usize * depth.height() as usize;
        Self {
            color: vec![color; len],
            depth,
        }
    }
}

/// World position of a screen sample; `u, v` in `[0, 1]` with v down.
pub fn reconstruct_world(camera: &CameraMatrices, u: f64, v: f64, depth: f64) -> Option<Vec3> {
    let ndc = Vec3::new(2.0 * u - 1.0, 1.0 - 2.0 * v, depth);
    let eye = camera.inverse_projection.transform_point(ndc)?;
    camera.inverse_view.transform_point(eye)
}

/// CPU rendition of the per-pixel viewshed test, bound to one shadow map.
#[derive(Debug, Copy, Clone)]
pub struct Classifier<'a> {
    pub settings: &'a ClassifierSettings,
    pub shadow: &'a ShadowMap,
    pub shadow_depth: &'a DepthMap,
}

impl<'a> Classifier<'a> {
    pub fn new(
        settings: &'a ClassifierSettings,
        shadow: &'a ShadowMap,
        shadow_depth: &'a DepthMap,
    ) -> Self {
        Self {
            settings,
            shadow,
            shadow_depth,
        }
    }

    /// Classifies a world position. `normal`, when known, enables
    /// receiver-plane depth for the PCF taps.
    pub fn classify_world_point(&self, world: Vec3, normal: Option<Vec3>) -> Classification {
        let light = &self.shadow.camera;
        let to_fragment = world - light.position;
        let distance = to_fragment.length();
        if distance < light.near && to_fragment.dot(light.direction) >= 0.0 {
            return Classification::Visible;
        }

        let clip = self
            .shadow
            .light_space_matrix
            .transform_vec4(Vec4::from_point(world));
        if clip.w <= 0.0 {
            return Classification::OutsideFrustum;
        }
        let Some(p) = clip.project() else {
            return Classification::OutsideFrustum;
        };
        if !in_unit_cube(p) {
            return Classification::OutsideFrustum;
        }

        if distance > self.settings.max_distance {
            return Classification::BeyondDistance;
        }

        let horizontal = to_fragment.reject_from(light.up);
        if horizontal.angle_between(light.direction) > self.settings.horizontal_half_angle {
            return Classification::OutsideAngle;
        }
        let vertical = to_fragment.reject_from(light.right);
        if vertical.angle_between(light.direction) > self.settings.vertical_half_angle {
            return Classification::OutsideAngle;
        }

        if p.z < NEAR_BAND_DEPTH {
            return Classification::NearBand;
        }

        let visibility = self.pcf(world, p, normal, to_fragment);
        if visibility >= 1.0 {
            Classification::Visible
        } else {
            Classification::Hidden { visibility }
        }
    }

    /// Full screen-space path: reconstruct the fragment from `depth` at
    /// pixel `(x, y)` of a `width x height` viewport.
    pub fn classify_pixel(
        &self,
        camera: &CameraMatrices,
        (x, y): (u32, u32),
        (width, height): (u32, u32),
        depth: f32,
        normal: Option<Vec3>,
    ) -> Classification {
        if depth >= BACKGROUND_DEPTH {
            return Classification::Background;
        }
        let u = (x as f64 + 0.5) / width as f64;
        let v = (y as f64 + 0.5) / height as f64;
        match reconstruct_world(camera, u, v, depth as f64) {
            Some(world) => self.classify_world_point(world, normal),
            None => Classification::Background,
        }
    }

    /// Tints every pixel of `frame` in place. Normals are estimated from
    /// neighbouring depth samples.
    pub fn classify_frame(&self, camera: &CameraMatrices, frame: &mut SceneFrame) -> ClassificationCounts {
        let (width, height) = (frame.depth.width(), frame.depth.height());
        let positions: Vec<Option<Vec3>> = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| {
                let depth = frame.depth.get(x, y).unwrap_or(BACKGROUND_DEPTH);
                if depth >= BACKGROUND_DEPTH {
                    return None;
                }
                let u = (x as f64 + 0.5) / width as f64;
                let v = (y as f64 + 0.5) / height as f64;
                reconstruct_world(camera, u, v, depth as f64)
            })
            .collect();

        let mut counts = ClassificationCounts::default();
        for y in 0..height {
            for x in 0..width {
                let i = y as usize * width as usize + x as usize;
                let depth = frame.depth.get(x, y).unwrap_or(BACKGROUND_DEPTH);
                let normal = estimate_normal(&positions, width, height, x, y);
                let c = self.classify_pixel(camera, (x, y), (width, height), depth, normal);
                counts.record(&c);
                if let Some(color) = frame.color.get_mut(i) {
                    *color = c.shade(*color, self.settings);
                }
            }
        }
        counts
    }

    /// 3x3 percentage-closer filter at texel centers.
    fn pcf(&self, world: Vec3, p: Vec3, normal: Option<Vec3>, to_fragment: Vec3) -> f64 {
        let map = self.shadow_depth;
        let (w, h) = (map.width() as i64, map.height() as i64);
        if w == 0 || h == 0 {
            return 1.0;
        }
        let normal = normal.and_then(Vec3::normalize);
        let bias = DEPTH_BIAS * (1.0 + bias_slope(normal, to_fragment));
        let receiver = normal.map(|n| GroundPlane::new(world, n));

        let cx = ((p.x * w as f64).floor() as i64).clamp(0, w - 1);
        let cy = ((p.y * h as f64).floor() as i64).clamp(0, h - 1);
        let mut lit = 0u32;
        for dy in -PCF_RADIUS..=PCF_RADIUS {
            for dx in -PCF_RADIUS..=PCF_RADIUS {
                let tx = (cx + dx).clamp(0, w - 1);
                let ty = (cy + dy).clamp(0, h - 1);
                let reference = receiver
                    .as_ref()
                    .and_then(|plane| self.receiver_depth(plane, tx, ty))
                    .unwrap_or(p.z);
                if reference - bias <= map.fetch_clamped(tx, ty) as f64 {
                    lit += 1;
                }
            }
        }
        let taps = (2 * PCF_RADIUS + 1).pow(2) as f64;
        lit as f64 / taps
    }

    /// Light-space depth of the receiver plane seen through texel `(tx, ty)`.
    fn receiver_depth(&self, plane: &GroundPlane, tx: i64, ty: i64) -> Option<f64> {
        let map = self.shadow_depth;
        let u = (tx as f64 + 0.5) / map.width() as f64;
        let v = (ty as f64 + 0.5) / map.height() as f64;
        let inverse = &self.shadow.inverse_light_space_matrix;
        let near = inverse.transform_point(Vec3::new(u, v, 0.0))?;
        let far = inverse.transform_point(Vec3::new(u, v, 1.0))?;
        let ray = Ray::new(near, far - near);
        let t = plane.intersect(&ray)?;
        let p = self.shadow.light_space_matrix.transform_point(ray.at(t))?;
        Some(p.z)
    }
}

fn in_unit_cube(p: Vec3) -> bool {
    let unit = 0.0..=1.0;
    unit.contains(&p.x) && unit.contains(&p.y) && unit.contains(&p.z)
}

/// `tan` of the angle between the surface normal and the light ray, clamped.
fn bias_slope(normal: Option<Vec3>, to_fragment: Vec3) -> f64 {
    let (Some(n), Some(l)) = (normal, to_fragment.normalize()) else {
        return MAX_BIAS_SLOPE;
    };
    let cos = n.dot(l).abs();
    if cos <= 1.0 / MAX_BIAS_SLOPE {
        return MAX_BIAS_SLOPE;
    }
    ((1.0 - cos * cos).max(0.0).sqrt() / cos).min(MAX_BIAS_SLOPE)
}

/// Normal from the closer neighbour on each axis, so depth edges do not
/// blend two surfaces.
fn estimate_normal(
    positions: &[Option<Vec3>],
    width: u32,
    height: u32,
    x: u32,
    y: u32,
) -> Option<Vec3> {
    let at = |x: i64, y: i64| -> Option<Vec3> {
        if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
            return None;
        }
        positions[y as usize * width as usize + x as usize]
    };
    let (x, y) = (x as i64, y as i64);
    let center = at(x, y)?;
    let pick = |a: Option<Vec3>, b: Option<Vec3>| -> Option<Vec3> {
        match (a, b) {
            (Some(a), Some(b)) => {
                if (a - center).length_squared() <= (b - center).length_squared() {
                    Some(a - center)
                } else {
                    Some(center - b)
                }
            }
            (Some(a), None) => Some(a - center),
            (None, Some(b)) => Some(center - b),
            (None, None) => None,
        }
    };
    let dx = pick(at(x + 1, y), at(x - 1, y))?;
    let dy = pick(at(x, y + 1), at(x, y - 1))?;
    dx.cross(dy).normalize()
}

/// Uniform buffer of the GPU post-process, laid out to match
/// [`VIEWSHED_POST_PROCESS_SHADER`].
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ClassifierUniforms {
    pub inverse_view: [[f32; 4]; 4],
    pub inverse_projection: [[f32; 4]; 4],
    pub light_space: [[f32; 4]; 4],
    pub light_position: [f32; 4],
    pub light_direction: [f32; 4],
    pub light_up: [f32; 4],
    pub light_right: [f32; 4],
    pub visible_color: [f32; 4],
    pub hidden_color: [f32; 4],
    pub horizontal_half_angle: f32,
    pub vertical_half_angle: f32,
    pub max_distance: f32,
    pub blend: f32,
    pub texel_size: f32,
    pub depth_bias: f32,
    pub near_band: f32,
    pub light_near: f32,
}

impl ClassifierUniforms {
    pub fn new(settings: &ClassifierSettings, camera: &CameraMatrices, shadow: &ShadowMap) -> Self {
        let light = &shadow.camera;
        let v4 = |v: Vec3| {
            let [x, y, z] = v.to_f32();
            [x, y, z, 0.0]
        };
        Self {
            inverse_view: camera.inverse_view.to_cols_f32(),
            inverse_projection: camera.inverse_projection.to_cols_f32(),
            light_space: shadow.light_space_matrix.to_cols_f32(),
            light_position: v4(light.position),
            light_direction: v4(light.direction),
            light_up: v4(light.up),
            light_right: v4(light.right),
            visible_color: settings.visible_color.to_array(),
            hidden_color: settings.hidden_color.to_array(),
            horizontal_half_angle: settings.horizontal_half_angle as f32,
            vertical_half_angle: settings.vertical_half_angle as f32,
            max_distance: settings.max_distance as f32,
            blend: settings.blend,
            texel_size: shadow.texel_size as f32,
            depth_bias: (DEPTH_BIAS * (1.0 + MAX_BIAS_SLOPE)) as f32,
            near_band: NEAR_BAND_DEPTH as f32,
            light_near: light.near as f32,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    pub fn to_block(&self) -> UniformBlock {
        let mut block = UniformBlock::new();
        block
            .set("u_inverse_view", UniformValue::Mat4(self.inverse_view))
            .set("u_inverse_projection", UniformValue::Mat4(self.inverse_projection))
            .set("u_light_space", UniformValue::Mat4(self.light_space))
            .set("u_light_position", UniformValue::Color(self.light_position))
            .set("u_light_direction", UniformValue::Color(self.light_direction))
            .set("u_light_up", UniformValue::Color(self.light_up))
            .set("u_light_right", UniformValue::Color(self.light_right))
            .set("u_visible_color", UniformValue::Color(self.visible_color))
            .set("u_hidden_color", UniformValue::Color(self.hidden_color))
            .set("u_horizontal_half_angle", UniformValue::Float(self.horizontal_half_angle))
            .set("u_vertical_half_angle", UniformValue::Float(self.vertical_half_angle))
            .set("u_max_distance", UniformValue::Float(self.max_distance))
            .set("u_blend", UniformValue::Float(self.blend))
            .set("u_texel_size", UniformValue::Float(self.texel_size))
            .set("u_depth_bias", UniformValue::Float(self.depth_bias))
            .set("u_near_band", UniformValue::Float(self.near_band))
            .set("u_light_near", UniformValue::Float(self.light_near));
        block
    }
}

/// Fragment stage of the full-screen pass run after the scene; reads the
/// composed color and depth plus the viewshed shadow map.
pub const VIEWSHED_POST_PROCESS_SHADER: &str = r#"
struct Viewshed {
    inverse_view: mat4x4<f32>,
    inverse_projection: mat4x4<f32>,
    light_space: mat4x4<f32>,
    light_position: vec4<f32>,
    light_direction: vec4<f32>,
    light_up: vec4<f32>,
    light_right: vec4<f32>,
    visible_color: vec4<f32>,
    hidden_color: vec4<f32>,
    horizontal_half_angle: f32,
    vertical_half_angle: f32,
    max_distance: f32,
    blend: f32,
    texel_size: f32,
    depth_bias: f32,
    near_band: f32,
    light_near: f32,
};

@group(0) @binding(0) var<uniform> u: Viewshed;
@group(0) @binding(1) var scene_color: texture_2d<f32>;
@group(0) @binding(2) var scene_depth: texture_depth_2d;
@group(0) @binding(3) var shadow_map: texture_depth_2d;

fn angle_between(a: vec3<f32>, b: vec3<f32>) -> f32 {
    return atan2(length(cross(a, b)), dot(a, b));
}

fn shadow_visibility(p: vec3<f32>) -> f32 {
    let size = vec2<i32>(textureDimensions(shadow_map));
    let center = vec2<i32>(floor(p.xy * vec2<f32>(size)));
    var lit = 0.0;
    for (var dy = -1; dy <= 1; dy++) {
        for (var dx = -1; dx <= 1; dx++) {
            let t = clamp(center + vec2<i32>(dx, dy), vec2<i32>(0), size - vec2<i32>(1));
            if (p.z - u.depth_bias <= textureLoad(shadow_map, t, 0)) {
                lit += 1.0;
            }
        }
    }
    return lit / 9.0;
}

@fragment
fn fs_main(@builtin(position) frag_coord: vec4<f32>) -> @location(0) vec4<f32> {
    let pixel = vec2<i32>(frag_coord.xy);
    let uv = frag_coord.xy / vec2<f32>(textureDimensions(scene_color));
    let color = textureLoad(scene_color, pixel, 0);
    let depth = textureLoad(scene_depth, pixel, 0);
    if (depth >= 1.0) {
        return color;
    }

    let ndc = vec4<f32>(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0, depth, 1.0);
    let eye = u.inverse_projection * ndc;
    let world = (u.inverse_view * vec4<f32>(eye.xyz / eye.w, 1.0)).xyz;
    let to_fragment = world - u.light_position.xyz;
    let distance = length(to_fragment);
    if (distance < u.light_near && dot(to_fragment, u.light_direction.xyz) >= 0.0) {
        return vec4<f32>(mix(color.rgb, u.visible_color.rgb, u.blend), color.a);
    }

    let clip = u.light_space * vec4<f32>(world, 1.0);
    if (clip.w <= 0.0) {
        return color;
    }
    let p = clip.xyz / clip.w;
    if (any(p < vec3<f32>(0.0)) || any(p > vec3<f32>(1.0))) {
        return color;
    }
    if (distance > u.max_distance) {
        return color;
    }

    let dir = u.light_direction.xyz;
    let horizontal = to_fragment - u.light_up.xyz * dot(to_fragment, u.light_up.xyz);
    if (angle_between(horizontal, dir) > u.horizontal_half_angle) {
        return color;
    }
    let vertical = to_fragment - u.light_right.xyz * dot(to_fragment, u.light_right.xyz);
    if (angle_between(vertical, dir) > u.vertical_half_angle) {
        return color;
    }
    if (p.z < u.near_band) {
        return color;
    }

    var tint = u.hidden_color.rgb;
    if (shadow_visibility(p) >= 1.0) {
        tint = u.visible_color.rgb;
    }
    return vec4<f32>(mix(color.rgb, tint, u.blend), color.a);
}
"#;

#[cfg(test)]
mod tests {
    use super::{
        BACKGROUND_DEPTH, Classification, Classifier, ClassifierSettings, ClassifierUniforms,
        SceneFrame,
    };
    use crate::depth::{DepthMap, GroundPlane, Occluder, Wall, ndc_to_texture};
    use crate::shadow_camera::ShadowObserverCamera;
    use crate::shadow_camera::ShadowMap;
    use foundation::Color;
    use foundation::math::Vec3;
    use gpu::{Camera3D, HeadlessContext};
    use pretty_assertions::assert_eq;

    const OBSERVER: Vec3 = Vec3::new(0.0, 0.0, 100.0);
    const TARGET: Vec3 = Vec3::new(100.0, 0.0, 0.0);

    fn settings(h_deg: f64, v_deg: f64, max_distance: f64) -> ClassifierSettings {
        ClassifierSettings {
            horizontal_half_angle: (h_deg * 0.5).to_radians(),
            vertical_half_angle: (v_deg * 0.5).to_radians(),
            max_distance,
            visible_color: Color::LIME,
            hidden_color: Color::RED,
            blend: 1.0,
        }
    }

    fn shadow_map() -> ShadowMap {
        let mut ctx = HeadlessContext::new();
        let mut cam = ShadowObserverCamera::new(256);
        cam.configure(&mut ctx, OBSERVER, TARGET).unwrap().clone()
    }

    fn ground() -> Box<dyn Occluder> {
        Box::new(GroundPlane::new(Vec3::ZERO, Vec3::UNIT_Z))
    }

    fn wall() -> Box<dyn Occluder> {
        Box::new(Wall::new(
            Vec3::new(25.0, -10.0, 0.0),
            Vec3::new(25.0, 10.0, 0.0),
            Vec3::UNIT_Z,
            80.0,
        ))
    }

    fn depth(shadow: &ShadowMap, occluders: &[Box<dyn Occluder>]) -> DepthMap {
        DepthMap::render(
            shadow.size(),
            shadow.size(),
            &shadow.light_space_matrix,
            occluders,
        )
        .unwrap()
    }

    #[test]
    fn open_ground_between_observer_and_target_is_visible() {
        let shadow = shadow_map();
        let s = settings(90.0, 90.0, 200.0);
        let d = depth(&shadow, &[ground()]);
        let c = Classifier::new(&s, &shadow, &d);

        let fragment = Vec3::new(50.0, 0.0, 0.0);
        let result = c.classify_world_point(fragment, Some(Vec3::UNIT_Z));
        assert_eq!(result, Classification::Visible);
        assert_eq!(result.shade(Color::BLACK, &s), Color::LIME.with_alpha(1.0));

        // Without a normal the slope-scaled bias alone must avoid acne.
        assert_eq!(c.classify_world_point(fragment, None), Classification::Visible);
    }

    #[test]
    fn wall_between_observer_and_fragment_hides_it() {
        let shadow = shadow_map();
        let s = settings(90.0, 90.0, 200.0);
        let d = depth(&shadow, &[ground(), wall()]);
        let c = Classifier::new(&s, &shadow, &d);

        let result = c.classify_world_point(Vec3::new(50.0, 0.0, 0.0), Some(Vec3::UNIT_Z));
        assert_eq!(result, Classification::Hidden { visibility: 0.0 });
        assert_eq!(result.shade(Color::BLACK, &s), Color::RED.with_alpha(1.0));
    }

    #[test]
    fn observer_position_is_visible() {
        let shadow = shadow_map();
        let s = settings(90.0, 90.0, 200.0);
        let d = depth(&shadow, &[ground(), wall()]);
        let c = Classifier::new(&s, &shadow, &d);
        assert_eq!(c.classify_world_point(OBSERVER, None), Classification::Visible);
    }

    #[test]
    fn inside_near_plane_only_counts_in_front_of_the_observer() {
        let shadow = shadow_map();
        let s = settings(90.0, 90.0, 200.0);
        let d = depth(&shadow, &[ground(), wall()]);
        let c = Classifier::new(&s, &shadow, &d);
        let forward = shadow.camera.direction * (shadow.camera.near * 0.5);
        assert_eq!(
            c.classify_world_point(OBSERVER + forward, None),
            Classification::Visible
        );
        assert_eq!(
            c.classify_world_point(OBSERVER - forward, None),
            Classification::OutsideFrustum
        );
    }

    #[test]
    fn beyond_max_distance_passes_through_even_if_occluded() {
        let shadow = shadow_map();
        let s = settings(90.0, 90.0, 200.0);
        let d = depth(&shadow, &[ground(), wall()]);
        let c = Classifier::new(&s, &shadow, &d);
        let far = Vec3::new(190.0, 0.0, 0.0);
        assert_eq!(
            c.classify_world_point(far, Some(Vec3::UNIT_Z)),
            Classification::BeyondDistance
        );
        assert_eq!(
            Classification::BeyondDistance.shade(Color::BLACK, &s),
            Color::BLACK
        );
    }

    #[test]
    fn outside_horizontal_angle_passes_through() {
        let shadow = shadow_map();
        let s = settings(20.0, 90.0, 200.0);
        let d = depth(&shadow, &[ground()]);
        let c = Classifier::new(&s, &shadow, &d);
        assert_eq!(
            c.classify_world_point(Vec3::new(100.0, 40.0, 0.0), Some(Vec3::UNIT_Z)),
            Classification::OutsideAngle
        );
        // On-axis stays classified with the same narrow angle.
        assert_eq!(
            c.classify_world_point(TARGET, Some(Vec3::UNIT_Z)),
            Classification::Visible
        );
    }

    #[test]
    fn outside_vertical_angle_passes_through() {
        let shadow = shadow_map();
        let s = settings(90.0, 10.0, 200.0);
        let d = depth(&shadow, &[ground()]);
        let c = Classifier::new(&s, &shadow, &d);
        assert_eq!(
            c.classify_world_point(Vec3::new(50.0, 0.0, 0.0), Some(Vec3::UNIT_Z)),
            Classification::OutsideAngle
        );
    }

    #[test]
    fn behind_the_observer_is_outside_frustum() {
        let shadow = shadow_map();
        let s = settings(90.0, 90.0, 200.0);
        let d = depth(&shadow, &[ground()]);
        let c = Classifier::new(&s, &shadow, &d);
        assert_eq!(
            c.classify_world_point(Vec3::new(-50.0, 0.0, 100.0), None),
            Classification::OutsideFrustum
        );
    }

    #[test]
    fn background_pixels_are_untouched() {
        let shadow = shadow_map();
        let s = settings(90.0, 90.0, 200.0);
        let d = depth(&shadow, &[ground()]);
        let c = Classifier::new(&s, &shadow, &d);
        let camera = Camera3D::look_at(
            Vec3::new(50.0, -150.0, 150.0),
            Vec3::new(50.0, 0.0, 0.0),
            60f64.to_radians(),
            1.0,
            5000.0,
        )
        .matrices(1.0)
        .unwrap();
        assert_eq!(
            c.classify_pixel(&camera, (0, 0), (8, 8), BACKGROUND_DEPTH, None),
            Classification::Background
        );
    }

    #[test]
    fn frame_is_split_by_the_wall() {
        let shadow = shadow_map();
        let s = settings(90.0, 90.0, 200.0);
        let occluders = vec![ground(), wall()];
        let d = depth(&shadow, &occluders);
        let c = Classifier::new(&s, &shadow, &d);

        let camera = Camera3D::look_at(
            Vec3::new(50.0, -150.0, 150.0),
            Vec3::new(50.0, 0.0, 0.0),
            60f64.to_radians(),
            1.0,
            5000.0,
        )
        .matrices(1.0)
        .unwrap();
        let screen = ndc_to_texture() * camera.projection * camera.view;
        let scene_depth = DepthMap::render(64, 64, &screen, &occluders).unwrap();
        let mut frame = SceneFrame::new(Color::BLACK, scene_depth);

        let counts = c.classify_frame(&camera, &mut frame);
        assert!(counts.visible > 0, "{counts:?}");
        assert!(counts.hidden > 0, "{counts:?}");
        assert_eq!(counts.visible + counts.hidden + counts.untouched, 64 * 64);
        assert!(frame.color.contains(&Color::LIME));
        assert!(frame.color.contains(&Color::RED));
    }

    #[test]
    fn uniform_layout_is_16_byte_aligned() {
        let shadow = shadow_map();
        let s = settings(90.0, 60.0, 200.0);
        let camera = gpu::CameraMatrices::default();
        let u = ClassifierUniforms::new(&s, &camera, &shadow);
        assert_eq!(u.as_bytes().len() % 16, 0);
        assert_eq!(u.to_block().len(), 17);
    }
}
