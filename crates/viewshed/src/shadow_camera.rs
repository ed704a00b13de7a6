use std::f64::consts::FRAC_PI_2;

use foundation::math::{Mat4, Vec3};
use gpu::{RenderContext, TextureDesc, TextureFormat, TextureId};
use tracing::{debug, warn};

use crate::depth::ndc_to_texture;
use crate::error::ViewshedError;

pub const SHADOW_FOV_Y_RAD: f64 = FRAC_PI_2;
pub const SHADOW_NEAR: f64 = 0.1;
/// Fixed far plane; the effective range is bounded by the classifier's
/// maximum distance, not by this.
pub const SHADOW_FAR: f64 = 1388.0;

/// Perspective camera at the observer, looking at the target.
///
/// `up` and `right` are orthonormal to `direction`; the classifier clips the
/// horizontal and vertical angles against them.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LightCamera {
    pub position: Vec3,
    pub direction: Vec3,
    pub up: Vec3,
    pub right: Vec3,
    pub fov_y_rad: f64,
    pub near: f64,
    pub far: f64,
}

impl LightCamera {
    /// `None` if the points coincide or the direction is parallel to `up`.
    pub fn new(position: Vec3, target: Vec3, up: Vec3) -> Option<Self> {
        let direction = (target - position).normalize()?;
        let right = direction.cross(up).normalize()?;
        let up = right.cross(direction);
        Some(Self {
            position,
            direction,
            up,
            right,
            fov_y_rad: SHADOW_FOV_Y_RAD,
            near: SHADOW_NEAR,
            far: SHADOW_FAR,
        })
    }

    pub fn view(&self) -> Option<Mat4> {
        Mat4::look_to(self.position, self.direction, self.up)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective(self.fov_y_rad, 1.0, self.near, self.far)
    }

    /// World to shadow-texture space: `u, v` in `[0, 1]` (v down), depth in
    /// `[0, 1]`.
    pub fn light_space_matrix(&self) -> Option<Mat4> {
        Some(ndc_to_texture() * self.projection() * self.view()?)
    }
}

/// Fixed shadow-map options for a viewshed: a single spot frustum with hard
/// edges.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ShadowMapOptions {
    pub size: u32,
    pub is_point_light: bool,
    pub is_spot_light: bool,
    pub cascades: u32,
    pub soft_shadows: bool,
    pub depth_bias: f64,
    pub normal_shading_smooth: f64,
    pub darkness: f64,
}

impl ShadowMapOptions {
    pub fn spot(size: u32) -> Self {
        Self {
            size,
            is_point_light: false,
            is_spot_light: true,
            cascades: 1,
            soft_shadows: false,
            depth_bias: 0.0,
            normal_shading_smooth: 0.3,
            darkness: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShadowMap {
    pub camera: LightCamera,
    pub texture: TextureId,
    pub light_space_matrix: Mat4,
    /// Inverse of `light_space_matrix`, for ray setup.
    pub inverse_light_space_matrix: Mat4,
    pub texel_size: f64,
    /// `|observer - target|`.
    pub point_light_radius: f64,
    pub options: ShadowMapOptions,
}

impl ShadowMap {
    pub fn size(&self) -> u32 {
        self.options.size
    }
}

/// Owns the viewshed's shadow map and keeps it aimed from observer to target.
#[derive(Debug)]
pub struct ShadowObserverCamera {
    size: u32,
    observer: Option<Vec3>,
    target: Option<Vec3>,
    shadow_map: Option<ShadowMap>,
}

impl ShadowObserverCamera {
    pub fn new(size: u32) -> Self {
        Self {
            size: size.max(1),
            observer: None,
            target: None,
            shadow_map: None,
        }
    }

    pub fn shadow_map(&self) -> Option<&ShadowMap> {
        self.shadow_map.as_ref()
    }

    pub fn observer(&self) -> Option<Vec3> {
        self.observer
    }

    pub fn target(&self) -> Option<Vec3> {
        self.target
    }

    pub fn distance(&self) -> Option<f64> {
        Some(self.observer?.distance(self.target?))
    }

    /// Takes effect on the next `configure`.
    pub fn set_size(&mut self, size: u32) {
        self.size = size.max(1);
    }

    /// Aims the shadow camera from `observer` to `target`.
    ///
    /// The camera is replaced in place; the depth texture is only allocated
    /// the first time or when the size changed. Degenerate input leaves the
    /// previous configuration untouched.
    pub fn configure(
        &mut self,
        ctx: &mut dyn RenderContext,
        observer: Vec3,
        target: Vec3,
    ) -> Result<&ShadowMap, ViewshedError> {
        if !observer.is_finite() || !target.is_finite() {
            return Err(ViewshedError::Config("positions must be finite".into()));
        }
        let up = observer.normalize().ok_or(ViewshedError::DegenerateGeometry)?;
        let Some((camera, light_space_matrix, inverse)) = LightCamera::new(observer, target, up)
            .and_then(|c| {
                let m = c.light_space_matrix()?;
                Some((c, m, m.inverse()?))
            })
        else {
            warn!(?observer, ?target, "degenerate shadow camera, keeping previous");
            return Err(ViewshedError::DegenerateGeometry);
        };

        let texture = match &self.shadow_map {
            Some(map) if map.size() == self.size => map.texture,
            previous => {
                let texture = ctx.create_texture(&TextureDesc {
                    label: "viewshed-shadow-map",
                    width: self.size,
                    height: self.size,
                    format: TextureFormat::Depth32Float,
                })?;
                if let Some(old) = previous {
                    if let Err(e) = ctx.destroy_texture(old.texture) {
                        warn!(error = %e, "failed to destroy previous shadow map texture");
                    }
                }
                debug!(size = self.size, "allocated shadow map texture");
                texture
            }
        };

        let distance = observer.distance(target);
        debug!(distance, "shadow camera configured");
        self.observer = Some(observer);
        self.target = Some(target);
        Ok(self.shadow_map.insert(ShadowMap {
            camera,
            texture,
            light_space_matrix,
            inverse_light_space_matrix: inverse,
            texel_size: 1.0 / self.size as f64,
            point_light_radius: distance,
            options: ShadowMapOptions::spot(self.size),
        }))
    }

    pub fn destroy(&mut self, ctx: &mut dyn RenderContext) -> Result<(), ViewshedError> {
        self.observer = None;
        self.target = None;
        if let Some(map) = self.shadow_map.take() {
            ctx.destroy_texture(map.texture)?;
        }
        Ok(())
    }
}
