use serde::{Deserialize, Serialize};

use super::EPSILON_DIRECTION;

#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const UNIT_X: Self = Self::new(1.0, 0.0, 0.0);
    pub const UNIT_Y: Self = Self::new(0.0, 1.0, 0.0);
    pub const UNIT_Z: Self = Self::new(0.0, 0.0, 1.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn length_squared(self) -> f64 {
        self.dot(self)
    }

    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    pub fn distance(self, other: Self) -> f64 {
        (self - other).length()
    }

    pub fn scale(self, s: f64) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    /// Unit vector in the same direction, or `None` when the length collapses.
    pub fn normalize(self) -> Option<Self> {
        let len = self.length();
        if !len.is_finite() || len <= EPSILON_DIRECTION {
            return None;
        }
        Some(self.scale(1.0 / len))
    }

    /// Angle in radians between two vectors, in `[0, pi]`.
    ///
    /// Returns 0 when either vector is degenerate.
    pub fn angle_between(self, other: Self) -> f64 {
        let (Some(a), Some(b)) = (self.normalize(), other.normalize()) else {
            return 0.0;
        };
        // atan2 keeps precision near 0 and pi where acos does not.
        a.cross(b).length().atan2(a.dot(b))
    }

    /// Component of `self` perpendicular to the unit vector `normal`.
    pub fn reject_from(self, normal: Self) -> Self {
        self - normal.scale(self.dot(normal))
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Any unit vector perpendicular to `self`.
    pub fn any_perpendicular(self) -> Self {
        let helper = if self.x.abs() < 0.9 {
            Self::UNIT_X
        } else {
            Self::UNIT_Y
        };
        self.cross(helper).normalize().unwrap_or(Self::UNIT_Z)
    }

    pub fn to_f32(self) -> [f32; 3] {
        [self.x as f32, self.y as f32, self.z as f32]
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl std::ops::Neg for Vec3 {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl std::ops::Mul<f64> for Vec3 {
    type Output = Self;

    fn mul(self, s: f64) -> Self::Output {
        self.scale(s)
    }
}

/// Homogeneous coordinates, used for clip-space math.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Vec4 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Vec4 {
    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    pub fn from_point(p: Vec3) -> Self {
        Self::new(p.x, p.y, p.z, 1.0)
    }

    pub fn xyz(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// Perspective divide. `None` when `w` is zero or not finite.
    pub fn project(self) -> Option<Vec3> {
        if self.w == 0.0 || !self.w.is_finite() {
            return None;
        }
        let p = self.xyz().scale(1.0 / self.w);
        p.is_finite().then_some(p)
    }
}

#[cfg(test)]
mod tests {
    use super::{Vec3, Vec4};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn vec3_add_sub_dot() {
        let a = Vec3::new(1.0, 2.0, -1.0);
        let b = Vec3::new(0.5, -2.0, 3.0);
        assert_eq!(a + b, Vec3::new(1.5, 0.0, 2.0));
        assert_eq!(a - b, Vec3::new(0.5, 4.0, -4.0));
        assert_eq!(a.dot(b), -6.5);
    }

    #[test]
    fn cross_follows_right_hand_rule() {
        assert_eq!(Vec3::UNIT_X.cross(Vec3::UNIT_Y), Vec3::UNIT_Z);
        assert_eq!(Vec3::UNIT_Y.cross(Vec3::UNIT_Z), Vec3::UNIT_X);
    }

    #[test]
    fn normalize_rejects_zero_and_nan() {
        assert_eq!(Vec3::ZERO.normalize(), None);
        assert_eq!(Vec3::new(f64::NAN, 0.0, 0.0).normalize(), None);
        let n = Vec3::new(3.0, 0.0, 4.0).normalize().unwrap();
        assert_close(n.length(), 1.0, 1e-12);
    }

    #[test]
    fn angle_between_handles_extremes() {
        assert_close(Vec3::UNIT_Z.angle_between(Vec3::UNIT_Z), 0.0, 1e-12);
        assert_close(
            Vec3::UNIT_Z.angle_between(-Vec3::UNIT_Z),
            std::f64::consts::PI,
            1e-12,
        );
        assert_close(
            Vec3::UNIT_X.angle_between(Vec3::UNIT_Y),
            std::f64::consts::FRAC_PI_2,
            1e-12,
        );
        assert_eq!(Vec3::ZERO.angle_between(Vec3::UNIT_X), 0.0);
    }

    #[test]
    fn perpendicular_is_orthogonal() {
        for v in [Vec3::UNIT_X, Vec3::UNIT_Z, Vec3::new(1.0, 1.0, 0.2)] {
            let p = v.any_perpendicular();
            assert_close(p.dot(v), 0.0, 1e-12);
            assert_close(p.length(), 1.0, 1e-12);
        }
    }

    #[test]
    fn project_divides_by_w() {
        let p = Vec4::new(2.0, 4.0, 6.0, 2.0).project().unwrap();
        assert_eq!(p, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(Vec4::new(1.0, 1.0, 1.0, 0.0).project(), None);
    }
}
