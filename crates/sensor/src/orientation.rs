use std::f64::consts::PI;

use foundation::math::{Mat4, Quat, Vec3};
use tracing::debug;

/// Axes shorter than this are treated as collinear with the forward axis.
const COLLINEAR_EPSILON: f64 = 1.0e-9;

/// Orients a `+Z`-forward object (the sensor mesh) from one point toward another.
pub struct OrientationSolver;

impl OrientationSolver {
    pub const FORWARD: Vec3 = Vec3::UNIT_Z;

    /// Minimal rotation taking `+Z` onto the direction `from -> to`.
    ///
    /// Never returns NaN: coincident points give identity, a direction along
    /// `-Z` gives a half turn about a perpendicular axis.
    pub fn solve(from: Vec3, to: Vec3) -> Quat {
        let Some(direction) = (to - from).normalize() else {
            debug!(?from, ?to, "coincident points, keeping identity orientation");
            return Quat::IDENTITY;
        };
        let axis = Self::FORWARD.cross(direction);
        if axis.length() <= COLLINEAR_EPSILON {
            if direction.dot(Self::FORWARD) > 0.0 {
                return Quat::IDENTITY;
            }
            return Quat::from_axis_angle(Self::FORWARD.any_perpendicular(), PI);
        }
        let angle = Self::FORWARD.angle_between(direction);
        Quat::from_axis_angle(axis, angle)
    }

    /// Rotation taking `+Z` onto `from -> to` and `+Y` onto `up` projected
    /// perpendicular to that direction.
    ///
    /// Keeps the local X/Y planes aligned with a camera that uses the same
    /// `up`. Falls back to [`OrientationSolver::solve`] when `up` is parallel
    /// to the direction.
    pub fn solve_with_up(from: Vec3, to: Vec3, up: Vec3) -> Quat {
        let Some(forward) = (to - from).normalize() else {
            return Quat::IDENTITY;
        };
        let Some(x_axis) = up.cross(forward).normalize() else {
            return Self::solve(from, to);
        };
        let y_axis = forward.cross(x_axis);
        Quat::from_basis(x_axis, y_axis, forward)
    }

    /// Model matrix placing the apex at `from`, scaled later by the radius.
    pub fn model_matrix(from: Vec3, rotation: Quat) -> Mat4 {
        Mat4::from_translation(from) * Mat4::from_rotation(rotation)
    }
}

#[cfg(test)]
mod tests {
    use super::OrientationSolver;
    use foundation::math::{Quat, Vec3};

    fn assert_vec_close(a: Vec3, b: Vec3, eps: f64) {
        let diff = (a - b).length();
        assert!(diff <= eps, "expected {a:?} ~= {b:?} (diff {diff})");
    }

    #[test]
    fn forward_points_at_target() {
        let from = Vec3::new(1.0, 2.0, 3.0);
        for to in [
            Vec3::new(10.0, 2.0, 3.0),
            Vec3::new(1.0, -5.0, 3.0),
            Vec3::new(-4.0, 7.0, 9.0),
        ] {
            let q = OrientationSolver::solve(from, to);
            let expected = (to - from).normalize().unwrap();
            assert_vec_close(q.rotate(OrientationSolver::FORWARD), expected, 1e-12);
        }
    }

    #[test]
    fn coincident_points_are_finite() {
        let p = Vec3::new(5.0, 5.0, 5.0);
        let q = OrientationSolver::solve(p, p);
        assert!(q.is_finite());
        assert_eq!(q, Quat::IDENTITY);
    }

    #[test]
    fn collinear_directions_are_handled() {
        let q = OrientationSolver::solve(Vec3::ZERO, Vec3::new(0.0, 0.0, 4.0));
        assert_eq!(q, Quat::IDENTITY);

        let q = OrientationSolver::solve(Vec3::ZERO, Vec3::new(0.0, 0.0, -4.0));
        assert!(q.is_finite());
        assert_vec_close(q.rotate(Vec3::UNIT_Z), -Vec3::UNIT_Z, 1e-12);
    }

    #[test]
    fn up_aligned_solution_keeps_y_toward_up() {
        let from = Vec3::new(0.0, 0.0, 100.0);
        let to = Vec3::new(100.0, 0.0, 0.0);
        let up = from.normalize().unwrap();
        let q = OrientationSolver::solve_with_up(from, to, up);
        let [x, y, z] = q.to_basis();
        assert_vec_close(z, (to - from).normalize().unwrap(), 1e-9);
        assert!(y.dot(up) > 0.0);
        assert!(x.dot(up).abs() < 1e-9);
    }

    #[test]
    fn up_parallel_falls_back() {
        let from = Vec3::ZERO;
        let to = Vec3::new(0.0, 0.0, 10.0);
        let q = OrientationSolver::solve_with_up(from, to, Vec3::UNIT_Z);
        assert!(q.is_finite());
        assert_vec_close(q.rotate(Vec3::UNIT_Z), Vec3::UNIT_Z, 1e-12);
    }
}
