use std::f64::consts::FRAC_PI_4;

use bytemuck::{Pod, Zeroable};
use foundation::math::Vec3;

/// Interleaved position + normal, uploaded as-is.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SurfaceVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl SurfaceVertex {
    fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.to_f32(),
            normal: normal.to_f32(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
}

impl LineVertex {
    fn new(position: Vec3) -> Self {
        Self {
            position: position.to_f32(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ScanPlaneMode {
    /// Plane contains the local Y axis and sweeps across the X half-angle.
    #[default]
    Vertical,
    /// Plane contains the local X axis and sweeps across the Y half-angle.
    Horizontal,
}

/// Lateral faces and lines of the pyramid, at unit radius.
#[derive(Debug, Clone, PartialEq)]
pub struct PyramidMesh {
    /// Closed cross-section outline: `4 * slice_count` points, the last one
    /// connecting back to the first.
    pub outline: Vec<Vec3>,
    /// Lateral face triangles, flat normal per face.
    pub sector_vertices: Vec<SurfaceVertex>,
    /// Apex to each of the four corners.
    pub sector_line_vertices: Vec<LineVertex>,
    /// Apex to every outline point.
    pub sector_segment_line_vertices: Vec<LineVertex>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DomeMesh {
    pub surface_vertices: Vec<SurfaceVertex>,
    pub line_vertices: Vec<LineVertex>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanPlaneMesh {
    pub mode: ScanPlaneMode,
    pub surface_vertices: Vec<SurfaceVertex>,
}

/// Geometry of a pyramid clipped by two independent half-angles.
///
/// All output is at unit radius around the apex at the origin, looking down
/// `+Z`; the half-angle `x_half_angle` opens toward `±X` and `y_half_angle`
/// toward `±Y`. Radius and placement belong to the model matrix.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AngleLimitedPyramidMesher {
    pub x_half_angle: f64,
    pub y_half_angle: f64,
    pub slice_count: u32,
}

impl AngleLimitedPyramidMesher {
    pub fn new(x_half_angle: f64, y_half_angle: f64, slice_count: u32) -> Self {
        Self {
            x_half_angle,
            y_half_angle,
            slice_count: slice_count.max(1),
        }
    }

    fn slices(&self) -> usize {
        self.slice_count.max(1) as usize
    }

    /// The four boundary curves, each with `slice_count + 1` points, ordered
    /// right, top, left, bottom so that each curve ends where the next begins.
    pub fn boundary_curves(&self) -> [Vec<Vec3>; 4] {
        let (x, y) = (self.x_half_angle, self.y_half_angle);
        let (max_x, max_y) = corner_limits(x, y);
        let zoy = arc(self.slices(), max_y, |phi| Vec3::new(0.0, phi.sin(), phi.cos()));
        let zox = arc(self.slices(), max_x, |phi| Vec3::new(phi.sin(), 0.0, phi.cos()));

        let right: Vec<Vec3> = zoy.iter().map(|p| rotate_y(*p, x)).collect();
        let top: Vec<Vec3> = zox.iter().rev().map(|p| rotate_x(*p, -y)).collect();
        let left: Vec<Vec3> = zoy.iter().rev().map(|p| rotate_y(*p, -x)).collect();
        let bottom: Vec<Vec3> = zox.iter().map(|p| rotate_x(*p, y)).collect();
        [right, top, left, bottom]
    }

    pub fn build(&self) -> PyramidMesh {
        let curves = self.boundary_curves();
        let n = self.slices();

        let outline: Vec<Vec3> = curves
            .iter()
            .flat_map(|c| c[..n].iter().copied())
            .collect();

        let mut sector_vertices = Vec::with_capacity(4 * n * 3);
        for (face, curve) in curves.iter().enumerate() {
            let normal = curve[0]
                .cross(curve[n])
                .normalize()
                .unwrap_or_else(|| self.face_plane_normal(face));
            for pair in curve.windows(2) {
                sector_vertices.push(SurfaceVertex::new(Vec3::ZERO, normal));
                sector_vertices.push(SurfaceVertex::new(pair[0], normal));
                sector_vertices.push(SurfaceVertex::new(pair[1], normal));
            }
        }

        let sector_line_vertices = curves
            .iter()
            .flat_map(|c| [LineVertex::new(Vec3::ZERO), LineVertex::new(c[0])])
            .collect();

        let sector_segment_line_vertices = outline
            .iter()
            .flat_map(|p| [LineVertex::new(Vec3::ZERO), LineVertex::new(*p)])
            .collect();

        PyramidMesh {
            outline,
            sector_vertices,
            sector_line_vertices,
            sector_segment_line_vertices,
        }
    }

    /// Spherical cap over the same angular region as the lateral faces.
    ///
    /// Row `j` is the horizontal arc at elevation `beta_j`, trimmed to where it
    /// meets the left/right faces, so the cap edge lies on the pyramid.
    pub fn build_dome(&self) -> DomeMesh {
        let n = self.slices();
        let (x, y) = (self.x_half_angle, self.y_half_angle);

        let grid: Vec<Vec<Vec3>> = (0..=n)
            .map(|j| {
                let beta = -y + 2.0 * y * j as f64 / n as f64;
                let (max_x, _) = corner_limits(x, beta);
                arc(n, max_x, |phi| Vec3::new(phi.sin(), 0.0, phi.cos()))
                    .into_iter()
                    .map(|p| rotate_x(p, -beta))
                    .collect()
            })
            .collect();

        let mut surface_vertices = Vec::with_capacity(n * n * 6);
        for j in 0..n {
            for i in 0..n {
                let a = grid[j][i];
                let b = grid[j][i + 1];
                let c = grid[j + 1][i + 1];
                let d = grid[j + 1][i];
                for p in [a, b, c, a, c, d] {
                    surface_vertices.push(SurfaceVertex::new(p, p));
                }
            }
        }

        let mut line_vertices = Vec::with_capacity(4 * n * (n + 1));
        for row in &grid {
            for pair in row.windows(2) {
                line_vertices.push(LineVertex::new(pair[0]));
                line_vertices.push(LineVertex::new(pair[1]));
            }
        }
        for i in 0..=n {
            for j in 0..n {
                line_vertices.push(LineVertex::new(grid[j][i]));
                line_vertices.push(LineVertex::new(grid[j + 1][i]));
            }
        }

        DomeMesh {
            surface_vertices,
            line_vertices,
        }
    }

    /// Fan through the pyramid axis; rotated per frame by the model matrix.
    pub fn build_scan_plane(&self, mode: ScanPlaneMode) -> ScanPlaneMesh {
        let n = self.slices();
        let (points, normal) = match mode {
            ScanPlaneMode::Vertical => (
                arc(n, self.y_half_angle, |phi| {
                    Vec3::new(0.0, phi.sin(), phi.cos())
                }),
                Vec3::UNIT_X,
            ),
            ScanPlaneMode::Horizontal => (
                arc(n, self.x_half_angle, |phi| {
                    Vec3::new(phi.sin(), 0.0, phi.cos())
                }),
                Vec3::UNIT_Y,
            ),
        };

        let surface_vertices = points
            .windows(2)
            .flat_map(|pair| {
                [
                    SurfaceVertex::new(Vec3::ZERO, normal),
                    SurfaceVertex::new(pair[0], normal),
                    SurfaceVertex::new(pair[1], normal),
                ]
            })
            .collect();

        ScanPlaneMesh {
            mode,
            surface_vertices,
        }
    }

    /// Plane normal of a lateral face, oriented like `cross(first, last)`.
    ///
    /// Used when a zero half-angle collapses the face to a single ray.
    fn face_plane_normal(&self, face: usize) -> Vec3 {
        let (x, y) = (self.x_half_angle, self.y_half_angle);
        match face {
            0 => rotate_y(-Vec3::UNIT_X, x),
            1 => rotate_x(-Vec3::UNIT_Y, -y),
            2 => rotate_y(Vec3::UNIT_X, -x),
            _ => rotate_x(Vec3::UNIT_Y, y),
        }
    }
}

/// Rotation angle at which the boundary arcs meet the corner rays.
///
/// Returns `(max_x, max_y)`: the extent of the horizontal arc on the top and
/// bottom faces and of the vertical arc on the left and right faces. With
/// both half-angles at 90 degrees the corners degenerate onto the XY plane
/// and the diagonal is used.
fn corner_limits(x: f64, y: f64) -> (f64, f64) {
    let (sx, cx) = x.sin_cos();
    let (sy, cy) = y.sin_cos();
    if cx * cx * sy * sy + cy * cy <= 1.0e-24 {
        return (FRAC_PI_4, FRAC_PI_4);
    }
    ((cy * sx).atan2(cx), (cx * sy).atan2(cy))
}

/// `slices + 1` points of `f(phi)` for `phi` evenly spaced in `[-limit, limit]`.
fn arc(slices: usize, limit: f64, f: impl Fn(f64) -> Vec3) -> Vec<Vec3> {
    (0..=slices)
        .map(|i| f(-limit + 2.0 * limit * i as f64 / slices as f64))
        .collect()
}

fn rotate_x(v: Vec3, angle: f64) -> Vec3 {
    let (s, c) = angle.sin_cos();
    Vec3::new(v.x, v.y * c - v.z * s, v.y * s + v.z * c)
}

fn rotate_y(v: Vec3, angle: f64) -> Vec3 {
    let (s, c) = angle.sin_cos();
    Vec3::new(v.x * c + v.z * s, v.y, -v.x * s + v.z * c)
}

#[cfg(test)]
mod tests {
    use super::{AngleLimitedPyramidMesher, ScanPlaneMode};
    use foundation::math::Vec3;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn assert_vec_close(a: Vec3, b: Vec3, eps: f64) {
        let diff = (a - b).length();
        assert!(diff <= eps, "expected {a:?} ~= {b:?} (diff {diff})");
    }

    const ANGLES: [f64; 7] = [0.0, 0.1, 0.5, 1.0, FRAC_PI_2, 2.5, PI];

    #[test]
    fn outline_has_four_slices_per_side_and_closes() {
        for slices in [1u32, 2, 3, 8, 17] {
            for &x in &ANGLES {
                for &y in &ANGLES {
                    let mesher = AngleLimitedPyramidMesher::new(x, y, slices);
                    let curves = mesher.boundary_curves();
                    let mesh = mesher.build();
                    assert_eq!(mesh.outline.len(), 4 * slices as usize);

                    // Each side ends where the next begins; the last one
                    // returns to the first outline point.
                    for k in 0..4 {
                        let end = *curves[k].last().unwrap();
                        let start = curves[(k + 1) % 4][0];
                        assert_vec_close(end, start, 1e-9);
                    }
                    assert_vec_close(*curves[3].last().unwrap(), mesh.outline[0], 1e-9);
                    assert!(mesh.outline.iter().all(|p| p.is_finite()));
                }
            }
        }
    }

    #[test]
    fn corners_match_tangent_rectangle() {
        let (x, y) = (0.4, 0.25);
        let mesh = AngleLimitedPyramidMesher::new(x, y, 6).build();
        let corner = mesh.outline[0];
        // Right face start: +x side, -y side.
        assert!((corner.x / corner.z - x.tan()).abs() < 1e-9);
        assert!((corner.y / corner.z + y.tan()).abs() < 1e-9);
        assert!((corner.length() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn buffer_sizes_follow_slice_count() {
        let n = 5usize;
        let mesher = AngleLimitedPyramidMesher::new(0.3, 0.6, n as u32);
        let mesh = mesher.build();
        assert_eq!(mesh.sector_vertices.len(), 4 * n * 3);
        assert_eq!(mesh.sector_line_vertices.len(), 8);
        assert_eq!(mesh.sector_segment_line_vertices.len(), 8 * n);

        let dome = mesher.build_dome();
        assert_eq!(dome.surface_vertices.len(), 6 * n * n);
        assert_eq!(dome.line_vertices.len(), 4 * n * (n + 1));

        let scan = mesher.build_scan_plane(ScanPlaneMode::Horizontal);
        assert_eq!(scan.surface_vertices.len(), 3 * n);
    }

    #[test]
    fn lateral_faces_are_flat_shaded() {
        let mesh = AngleLimitedPyramidMesher::new(0.3, 0.2, 4).build();
        for face in mesh.sector_vertices.chunks(4 * 3) {
            let normal = face[0].normal;
            assert!(face.iter().all(|v| v.normal == normal));
            let len = normal.iter().map(|c| c * c).sum::<f32>().sqrt();
            assert!((len - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn zero_angles_do_not_produce_nan() {
        let mesher = AngleLimitedPyramidMesher::new(0.0, 0.0, 0);
        assert_eq!(mesher.slice_count, 1);
        let mesh = mesher.build();
        for v in &mesh.sector_vertices {
            assert!(v.position.iter().chain(v.normal.iter()).all(|c| c.is_finite()));
        }
        let dome = mesher.build_dome();
        assert!(dome
            .surface_vertices
            .iter()
            .all(|v| v.position.iter().all(|c| c.is_finite())));
    }

    #[test]
    fn dome_edge_lies_on_lateral_faces() {
        let (x, y) = (0.5, 0.3);
        let mesher = AngleLimitedPyramidMesher::new(x, y, 4);
        let dome = mesher.build_dome();
        // First vertex of the first quad is the bottom-left corner.
        let p = dome.surface_vertices[0].position;
        let corner = Vec3::new(p[0] as f64, p[1] as f64, p[2] as f64);
        assert!((corner.x / corner.z + x.tan()).abs() < 1e-5);
        assert!((corner.y / corner.z + y.tan()).abs() < 1e-5);
    }

    #[test]
    fn rebuilds_are_deterministic() {
        let a = AngleLimitedPyramidMesher::new(0.7, 0.2, 8).build();
        let _ = AngleLimitedPyramidMesher::new(0.7, 0.2, 32).build();
        let b = AngleLimitedPyramidMesher::new(0.7, 0.2, 8).build();
        assert_eq!(
            bytemuck::cast_slice::<_, u8>(&a.sector_vertices),
            bytemuck::cast_slice::<_, u8>(&b.sector_vertices)
        );
    }
}
