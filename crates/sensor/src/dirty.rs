use foundation::Color;
use foundation::math::Mat4;

use crate::material::Material;
use crate::mesher::ScanPlaneMode;

/// Translucency of each program slot a sensor draws with.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Translucency {
    pub lateral: bool,
    pub dome: bool,
    pub lines: bool,
    pub scan_plane: bool,
}

/// Values last applied to GPU resources; compared once per `update`.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorSnapshot {
    pub x_half_angle: f64,
    pub y_half_angle: f64,
    pub slice_count: u32,
    pub scan_plane_mode: ScanPlaneMode,
    pub radius: f64,
    pub model_matrix: Mat4,
    pub lateral_material: Material,
    pub dome_material: Material,
    pub line_color: Color,
    pub scan_plane_color: Color,
}

impl SensorSnapshot {
    pub fn translucency(&self) -> Translucency {
        Translucency {
            lateral: self.lateral_material.is_translucent(),
            dome: self.dome_material.is_translucent(),
            lines: self.line_color.is_translucent(),
            scan_plane: self.scan_plane_color.is_translucent(),
        }
    }
}

/// Independent staleness bits; each maps to one kind of rebuild.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct DirtyFlags {
    /// Half-angles changed: remesh every enabled element.
    pub angles: bool,
    /// Tessellation density changed: remesh every enabled element.
    pub slice_count: bool,
    /// Scan plane orientation basis changed: remesh the scan plane.
    pub scan_plane_mode: bool,
    /// Only the world transform and bounding volume are stale.
    pub radius_or_matrix: bool,
    /// A material or color changed: new uniform values only.
    pub material: bool,
    /// Some slot flipped between opaque and translucent: new programs and
    /// render states.
    pub translucency: bool,
}

impl DirtyFlags {
    /// Everything stale, as on the first update.
    pub fn all() -> Self {
        Self {
            angles: true,
            slice_count: true,
            scan_plane_mode: true,
            radius_or_matrix: true,
            material: true,
            translucency: true,
        }
    }

    pub fn geometry(&self) -> bool {
        self.angles || self.slice_count
    }

    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

/// Pure comparison of two configurations; `None` means nothing was applied yet.
pub fn diff(old: Option<&SensorSnapshot>, new: &SensorSnapshot) -> DirtyFlags {
    let Some(old) = old else {
        return DirtyFlags::all();
    };
    DirtyFlags {
        angles: old.x_half_angle != new.x_half_angle || old.y_half_angle != new.y_half_angle,
        slice_count: old.slice_count != new.slice_count,
        scan_plane_mode: old.scan_plane_mode != new.scan_plane_mode,
        radius_or_matrix: old.radius != new.radius || old.model_matrix != new.model_matrix,
        material: old.lateral_material != new.lateral_material
            || old.dome_material != new.dome_material
            || old.line_color != new.line_color
            || old.scan_plane_color != new.scan_plane_color,
        translucency: old.translucency() != new.translucency(),
    }
}
