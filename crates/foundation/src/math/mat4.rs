use super::{Quat, Vec3, Vec4};

/// Row-major 4x4 matrix: `m[row][col]`, acting on column vectors.
///
/// Conventions:
/// - View space is right-handed with the camera looking down `-Z`.
/// - Perspective projections map view depth to a `[0, 1]` clip range (z0),
///   the same range the frustum extraction in the renderer expects.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mat4 {
    pub m: [[f64; 4]; 4],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat4 {
    pub const IDENTITY: Self = Self {
        m: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    pub const fn from_rows(m: [[f64; 4]; 4]) -> Self {
        Self { m }
    }

    pub fn from_translation(t: Vec3) -> Self {
        let mut out = Self::IDENTITY;
        out.m[0][3] = t.x;
        out.m[1][3] = t.y;
        out.m[2][3] = t.z;
        out
    }

    pub fn from_scale(s: f64) -> Self {
        let mut out = Self::IDENTITY;
        out.m[0][0] = s;
        out.m[1][1] = s;
        out.m[2][2] = s;
        out
    }

    pub fn from_rotation(q: Quat) -> Self {
        let [x, y, z] = q.to_basis();
        Self::from_rows([
            [x.x, y.x, z.x, 0.0],
            [x.y, y.y, z.y, 0.0],
            [x.z, y.z, z.z, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// `translate * rotate * scale`.
    pub fn from_rotation_translation_scale(rotation: Quat, translation: Vec3, scale: f64) -> Self {
        Self::from_translation(translation) * Self::from_rotation(rotation) * Self::from_scale(scale)
    }

    /// World-to-view transform for a camera at `eye` looking along `direction`.
    ///
    /// `up` is re-orthogonalized against `direction`. Returns `None` when the
    /// two are parallel or either is degenerate.
    pub fn look_to(eye: Vec3, direction: Vec3, up: Vec3) -> Option<Self> {
        let f = direction.normalize()?;
        let r = f.cross(up).normalize()?;
        let u = r.cross(f);
        Some(Self::from_rows([
            [r.x, r.y, r.z, -r.dot(eye)],
            [u.x, u.y, u.z, -u.dot(eye)],
            [-f.x, -f.y, -f.z, f.dot(eye)],
            [0.0, 0.0, 0.0, 1.0],
        ]))
    }

    /// Right-handed perspective projection with a `[0, 1]` depth range.
    pub fn perspective(fov_y_rad: f64, aspect: f64, near: f64, far: f64) -> Self {
        let f = 1.0 / (fov_y_rad * 0.5).tan();
        let range = near - far;
        Self::from_rows([
            [f / aspect, 0.0, 0.0, 0.0],
            [0.0, f, 0.0, 0.0],
            [0.0, 0.0, far / range, near * far / range],
            [0.0, 0.0, -1.0, 0.0],
        ])
    }

    pub fn translation(&self) -> Vec3 {
        Vec3::new(self.m[0][3], self.m[1][3], self.m[2][3])
    }

    pub fn transform_vec4(&self, v: Vec4) -> Vec4 {
        let r = |i: usize| {
            self.m[i][0] * v.x + self.m[i][1] * v.y + self.m[i][2] * v.z + self.m[i][3] * v.w
        };
        Vec4::new(r(0), r(1), r(2), r(3))
    }

    /// Transform a point (w = 1) and apply the perspective divide.
    pub fn transform_point(&self, p: Vec3) -> Option<Vec3> {
        self.transform_vec4(Vec4::from_point(p)).project()
    }

    /// Transform a direction (w = 0), ignoring translation.
    pub fn transform_direction(&self, d: Vec3) -> Vec3 {
        self.transform_vec4(Vec4::new(d.x, d.y, d.z, 0.0)).xyz()
    }

    pub fn is_finite(&self) -> bool {
        self.m.iter().flatten().all(|v| v.is_finite())
    }

    /// General inverse via cofactor expansion. `None` if singular.
    pub fn inverse(&self) -> Option<Self> {
        let a = &self.m;
        let s0 = a[0][0] * a[1][1] - a[1][0] * a[0][1];
        let s1 = a[0][0] * a[1][2] - a[1][0] * a[0][2];
        let s2 = a[0][0] * a[1][3] - a[1][0] * a[0][3];
        let s3 = a[0][1] * a[1][2] - a[1][1] * a[0][2];
        let s4 = a[0][1] * a[1][3] - a[1][1] * a[0][3];
        let s5 = a[0][2] * a[1][3] - a[1][2] * a[0][3];

        let c5 = a[2][2] * a[3][3] - a[3][2] * a[2][3];
        let c4 = a[2][1] * a[3][3] - a[3][1] * a[2][3];
        let c3 = a[2][1] * a[3][2] - a[3][1] * a[2][2];
        let c2 = a[2][0] * a[3][3] - a[3][0] * a[2][3];
        let c1 = a[2][0] * a[3][2] - a[3][0] * a[2][2];
        let c0 = a[2][0] * a[3][1] - a[3][0] * a[2][1];

        let det = s0 * c5 - s1 * c4 + s2 * c3 + s3 * c2 - s4 * c1 + s5 * c0;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let inv = 1.0 / det;

        let m = [
            [
                (a[1][1] * c5 - a[1][2] * c4 + a[1][3] * c3) * inv,
                (-a[0][1] * c5 + a[0][2] * c4 - a[0][3] * c3) * inv,
                (a[3][1] * s5 - a[3][2] * s4 + a[3][3] * s3) * inv,
                (-a[2][1] * s5 + a[2][2] * s4 - a[2][3] * s3) * inv,
            ],
            [
                (-a[1][0] * c5 + a[1][2] * c2 - a[1][3] * c1) * inv,
                (a[0][0] * c5 - a[0][2] * c2 + a[0][3] * c1) * inv,
                (-a[3][0] * s5 + a[3][2] * s2 - a[3][3] * s1) * inv,
                (a[2][0] * s5 - a[2][2] * s2 + a[2][3] * s1) * inv,
            ],
            [
                (a[1][0] * c4 - a[1][1] * c2 + a[1][3] * c0) * inv,
                (-a[0][0] * c4 + a[0][1] * c2 - a[0][3] * c0) * inv,
                (a[3][0] * s4 - a[3][1] * s2 + a[3][3] * s0) * inv,
                (-a[2][0] * s4 + a[2][1] * s2 - a[2][3] * s0) * inv,
            ],
            [
                (-a[1][0] * c3 + a[1][1] * c1 - a[1][2] * c0) * inv,
                (a[0][0] * c3 - a[0][1] * c1 + a[0][2] * c0) * inv,
                (-a[3][0] * s3 + a[3][1] * s1 - a[3][2] * s0) * inv,
                (a[2][0] * s3 - a[2][1] * s1 + a[2][2] * s0) * inv,
            ],
        ];
        Some(Self::from_rows(m))
    }

    /// Column-major `f32` layout for GPU uniform upload.
    pub fn to_cols_f32(&self) -> [[f32; 4]; 4] {
        let mut out = [[0.0f32; 4]; 4];
        for (c, col) in out.iter_mut().enumerate() {
            for (r, v) in col.iter_mut().enumerate() {
                *v = self.m[r][c] as f32;
            }
        }
        out
    }
}

impl std::ops::Mul for Mat4 {
    type Output = Self;

    fn mul(self, other: Self) -> Self::Output {
        let mut out = [[0.0; 4]; 4];
        for (r, row) in out.iter_mut().enumerate() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = (0..4).map(|k| self.m[r][k] * other.m[k][c]).sum();
            }
        }
        Self::from_rows(out)
    }
}
