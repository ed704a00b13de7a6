use foundation::Color;
use foundation::math::Vec3;
use gpu::{
    FrameState, PostProcessCommand, PostProcessDesc, PostProcessId, RenderContext, SceneMode,
};
use sensor::{
    Material, OrientationSolver, RenderResourceCache, SensorVolume, SensorVolumeOptions,
};
use tracing::{debug, warn};

use crate::classifier::{
    Classification, Classifier, ClassifierSettings, ClassifierUniforms,
    VIEWSHED_POST_PROCESS_SHADER,
};
use crate::config::{ViewshedConfig, check_alpha, check_angle, check_distance};
use crate::depth::{DepthMap, Occluder};
use crate::error::ViewshedError;
use crate::shadow_camera::{ShadowMap, ShadowObserverCamera};

const POST_PROCESS_LABEL: &str = "viewshed-classifier";

/// Creates a viewshed analysis.
///
/// The post-process stage is created immediately. The shadow camera is aimed
/// only once a target is known, either from `config` or from a later
/// [`ViewshedHandle::update`]. Anything allocated before a failure is released
/// again.
pub fn create_viewshed(
    ctx: &mut dyn RenderContext,
    config: ViewshedConfig,
) -> Result<ViewshedHandle, ViewshedError> {
    config.validate()?;
    let observer = config
        .observer_position
        .ok_or_else(|| ViewshedError::Config("observerPosition is required".into()))?;

    let sensor = SensorVolume::new(sensor_options(&config))?;
    let stage = ctx.create_post_process_stage(&PostProcessDesc {
        label: POST_PROCESS_LABEL,
        source: VIEWSHED_POST_PROCESS_SHADER,
    })?;

    let mut handle = ViewshedHandle {
        settings: ClassifierSettings::from_config(&config),
        camera: ShadowObserverCamera::new(config.shadow_map_size),
        config,
        sensor,
        stage: Some(stage),
        destroyed: false,
    };

    if let Some(target) = handle.config.target_position {
        if let Err(e) = handle.aim(ctx, observer, target) {
            handle.release_gpu(ctx);
            return Err(e);
        }
    }
    debug!(?observer, target = ?handle.config.target_position, "viewshed created");
    Ok(handle)
}

fn sensor_options(config: &ViewshedConfig) -> SensorVolumeOptions {
    SensorVolumeOptions {
        show: config.target_position.is_some(),
        radius: config.distance,
        x_half_angle: config.horizontal_half_angle(),
        y_half_angle: config.vertical_half_angle(),
        slice_count: config.slice_count,
        show_dome_surfaces: false,
        lateral_material: lateral_material(config),
        line_color: config.visible_color,
        ..SensorVolumeOptions::default()
    }
}

fn lateral_material(config: &ViewshedConfig) -> Material {
    Material::color(config.visible_color.with_alpha(config.alpha as f32))
}

/// A live viewshed: shadow camera, classifier settings and the frustum
/// indicator, plus the post-process stage that tints the frame.
#[derive(Debug)]
pub struct ViewshedHandle {
    config: ViewshedConfig,
    settings: ClassifierSettings,
    camera: ShadowObserverCamera,
    sensor: SensorVolume,
    stage: Option<PostProcessId>,
    destroyed: bool,
}

impl ViewshedHandle {
    pub fn config(&self) -> &ViewshedConfig {
        &self.config
    }

    pub fn settings(&self) -> &ClassifierSettings {
        &self.settings
    }

    pub fn sensor(&self) -> &SensorVolume {
        &self.sensor
    }

    /// `None` until both observer and target are known.
    pub fn shadow_map(&self) -> Option<&ShadowMap> {
        self.camera.shadow_map()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Moves the observer and target. Degenerate input is rejected and the
    /// previous placement stays in effect.
    pub fn update(
        &mut self,
        ctx: &mut dyn RenderContext,
        observer: Vec3,
        target: Vec3,
    ) -> Result<(), ViewshedError> {
        self.ensure_live()?;
        self.aim(ctx, observer, target)
    }

    pub fn set_horizontal_angle(&mut self, degrees: f64) -> Result<(), ViewshedError> {
        self.ensure_live()?;
        check_angle("horizontal", degrees)?;
        self.sensor.set_x_half_angle((degrees * 0.5).to_radians())?;
        self.config.horizontal_angle_deg = degrees;
        self.refresh_settings();
        Ok(())
    }

    pub fn set_vertical_angle(&mut self, degrees: f64) -> Result<(), ViewshedError> {
        self.ensure_live()?;
        check_angle("vertical", degrees)?;
        self.sensor.set_y_half_angle((degrees * 0.5).to_radians())?;
        self.config.vertical_angle_deg = degrees;
        self.refresh_settings();
        Ok(())
    }

    /// Maximum analysed distance; also the indicator's radius.
    pub fn set_distance(&mut self, distance: f64) -> Result<(), ViewshedError> {
        self.ensure_live()?;
        check_distance(distance)?;
        self.sensor.set_radius(distance)?;
        self.config.distance = distance;
        self.refresh_settings();
        Ok(())
    }

    pub fn set_visible_color(&mut self, color: Color) -> Result<(), ViewshedError> {
        self.ensure_live()?;
        if !color.is_finite() {
            return Err(ViewshedError::Config("colors must be finite".into()));
        }
        self.config.visible_color = color;
        self.sensor.set_lateral_material(lateral_material(&self.config));
        self.sensor.set_line_color(color);
        self.refresh_settings();
        Ok(())
    }

    pub fn set_hidden_color(&mut self, color: Color) -> Result<(), ViewshedError> {
        self.ensure_live()?;
        if !color.is_finite() {
            return Err(ViewshedError::Config("colors must be finite".into()));
        }
        self.config.hidden_color = color;
        self.refresh_settings();
        Ok(())
    }

    /// Blend factor of the tint; the indicator's surfaces use it as opacity.
    pub fn set_alpha(&mut self, alpha: f64) -> Result<(), ViewshedError> {
        self.ensure_live()?;
        check_alpha(alpha)?;
        self.config.alpha = alpha;
        self.sensor.set_lateral_material(lateral_material(&self.config));
        self.refresh_settings();
        Ok(())
    }

    /// Takes effect immediately when the camera is already aimed.
    pub fn set_shadow_map_size(
        &mut self,
        ctx: &mut dyn RenderContext,
        size: u32,
    ) -> Result<(), ViewshedError> {
        self.ensure_live()?;
        let mut candidate = self.config.clone();
        candidate.shadow_map_size = size;
        candidate.validate()?;

        self.camera.set_size(size);
        if let (Some(observer), Some(target)) = (self.camera.observer(), self.camera.target()) {
            if let Err(e) = self.camera.configure(ctx, observer, target) {
                self.camera.set_size(self.config.shadow_map_size);
                return Err(e);
            }
        }
        self.config.shadow_map_size = size;
        Ok(())
    }

    /// Per-frame entry point: appends the indicator's draw commands and, once
    /// the camera is aimed, the classifier post-process.
    pub fn render(
        &mut self,
        ctx: &mut dyn RenderContext,
        cache: &mut RenderResourceCache,
        frame_state: &mut FrameState,
    ) -> Result<(), ViewshedError> {
        self.ensure_live()?;
        self.sensor.update(ctx, cache, frame_state)?;

        if frame_state.mode != SceneMode::Scene3D || frame_state.passes.pick {
            return Ok(());
        }
        let (Some(stage), Some(shadow)) = (self.stage, self.camera.shadow_map()) else {
            return Ok(());
        };
        let uniforms = ClassifierUniforms::new(&self.settings, &frame_state.camera, shadow);
        frame_state.post_process.push(PostProcessCommand {
            stage,
            uniforms: uniforms.to_block(),
            textures: vec![("u_shadow_map", shadow.texture)],
        });
        Ok(())
    }

    /// CPU rendition of the shadow pass against `occluders`.
    pub fn render_shadow_depth(
        &self,
        occluders: &[Box<dyn Occluder>],
    ) -> Result<DepthMap, ViewshedError> {
        self.ensure_live()?;
        let shadow = self.camera.shadow_map().ok_or(ViewshedError::MissingTarget)?;
        DepthMap::render(
            shadow.size(),
            shadow.size(),
            &shadow.light_space_matrix,
            occluders,
        )
        .ok_or(ViewshedError::DegenerateGeometry)
    }

    /// Classifier over a shadow depth map produced for this viewshed.
    pub fn classifier<'a>(
        &'a self,
        shadow_depth: &'a DepthMap,
    ) -> Result<Classifier<'a>, ViewshedError> {
        self.ensure_live()?;
        let shadow = self.camera.shadow_map().ok_or(ViewshedError::MissingTarget)?;
        Ok(Classifier::new(&self.settings, shadow, shadow_depth))
    }

    pub fn classify_world_point(
        &self,
        shadow_depth: &DepthMap,
        world: Vec3,
        normal: Option<Vec3>,
    ) -> Result<Classification, ViewshedError> {
        Ok(self.classifier(shadow_depth)?.classify_world_point(world, normal))
    }

    /// Releases the shadow map, the post-process stage and every sensor
    /// resource. The first failure is returned; the handle is unusable either
    /// way.
    pub fn destroy(
        &mut self,
        ctx: &mut dyn RenderContext,
        cache: &mut RenderResourceCache,
    ) -> Result<(), ViewshedError> {
        self.ensure_live()?;
        self.destroyed = true;

        let mut first_error: Option<ViewshedError> = None;
        if let Err(e) = self.sensor.destroy(ctx, cache) {
            first_error.get_or_insert(e.into());
        }
        if let Err(e) = self.camera.destroy(ctx) {
            first_error.get_or_insert(e);
        }
        if let Some(stage) = self.stage.take() {
            if let Err(e) = ctx.destroy_post_process_stage(stage) {
                first_error.get_or_insert(e.into());
            }
        }
        debug!("viewshed destroyed");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn ensure_live(&self) -> Result<(), ViewshedError> {
        if self.destroyed {
            return Err(ViewshedError::Destroyed);
        }
        Ok(())
    }

    fn aim(
        &mut self,
        ctx: &mut dyn RenderContext,
        observer: Vec3,
        target: Vec3,
    ) -> Result<(), ViewshedError> {
        let up = self.camera.configure(ctx, observer, target)?.camera.up;
        let rotation = OrientationSolver::solve_with_up(observer, target, up);
        self.sensor
            .set_model_matrix(OrientationSolver::model_matrix(observer, rotation))?;
        self.sensor.set_show(true);
        self.config.observer_position = Some(observer);
        self.config.target_position = Some(target);
        Ok(())
    }

    fn refresh_settings(&mut self) {
        self.settings = ClassifierSettings::from_config(&self.config);
    }

    /// Cleanup for a handle that never reached the caller; the sensor holds
    /// no GPU resources before its first render.
    fn release_gpu(&mut self, ctx: &mut dyn RenderContext) {
        self.destroyed = true;
        if let Err(e) = self.camera.destroy(ctx) {
            warn!(error = %e, "failed to release shadow map");
        }
        if let Some(stage) = self.stage.take() {
            if let Err(e) = ctx.destroy_post_process_stage(stage) {
                warn!(error = %e, "failed to release post-process stage");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::create_viewshed;
    use crate::classifier::Classification;
    use crate::config::ViewshedConfig;
    use crate::depth::{GroundPlane, Occluder, Wall};
    use crate::error::ViewshedError;
    use foundation::Color;
    use foundation::math::Vec3;
    use gpu::{
        CameraMatrices, FrameState, HeadlessContext, InjectedFault, SceneMode, UniformValue,
    };
    use pretty_assertions::assert_eq;
    use runtime::Frame;
    use sensor::RenderResourceCache;

    const OBSERVER: Vec3 = Vec3::new(0.0, 0.0, 100.0);
    const TARGET: Vec3 = Vec3::new(100.0, 0.0, 0.0);

    fn assert_close(a: f64, b: f64, eps: f64) {
        assert!((a - b).abs() <= eps, "{a} != {b} (eps={eps})");
    }

    fn config() -> ViewshedConfig {
        ViewshedConfig {
            observer_position: Some(OBSERVER),
            target_position: Some(TARGET),
            horizontal_angle_deg: 90.0,
            vertical_angle_deg: 90.0,
            distance: 200.0,
            shadow_map_size: 256,
            ..ViewshedConfig::default()
        }
    }

    fn frame_state(mode: SceneMode) -> FrameState {
        FrameState::new(mode, Frame::default(), CameraMatrices::default())
    }

    fn ground() -> Box<dyn Occluder> {
        Box::new(GroundPlane::new(Vec3::ZERO, Vec3::UNIT_Z))
    }

    #[test]
    fn create_aims_camera_and_indicator() {
        let mut ctx = HeadlessContext::new();
        let handle = create_viewshed(&mut ctx, config()).unwrap();

        let shadow = handle.shadow_map().unwrap();
        assert_eq!(shadow.camera.position, OBSERVER);
        assert_close(shadow.point_light_radius, 100.0 * 2f64.sqrt(), 1e-9);
        assert_eq!(ctx.live_textures(), 1);
        assert_eq!(ctx.live_post_process_stages(), 1);

        let sensor = handle.sensor().options();
        assert!(sensor.show);
        assert_eq!(sensor.radius, 200.0);
        assert_close(sensor.x_half_angle, 45f64.to_radians(), 1e-12);
        assert_eq!(sensor.model_matrix.translation(), OBSERVER);
        // Indicator forward (+Z) points at the target.
        let forward = sensor.model_matrix.transform_direction(Vec3::UNIT_Z);
        assert_close(forward.angle_between(TARGET - OBSERVER), 0.0, 1e-9);
    }

    #[test]
    fn pending_target_draws_nothing() {
        let mut ctx = HeadlessContext::new();
        let mut cache = RenderResourceCache::new();
        let mut handle = create_viewshed(
            &mut ctx,
            ViewshedConfig {
                target_position: None,
                ..config()
            },
        )
        .unwrap();
        assert!(handle.shadow_map().is_none());

        let mut fs = frame_state(SceneMode::Scene3D);
        handle.render(&mut ctx, &mut cache, &mut fs).unwrap();
        assert!(fs.command_list.is_empty());
        assert!(fs.post_process.is_empty());

        let depth = crate::depth::DepthMap::new(4, 4);
        assert_eq!(
            handle.classify_world_point(&depth, TARGET, None),
            Err(ViewshedError::MissingTarget)
        );

        handle.update(&mut ctx, OBSERVER, TARGET).unwrap();
        handle.render(&mut ctx, &mut cache, &mut fs).unwrap();
        assert!(!fs.command_list.is_empty());
        assert_eq!(fs.post_process.len(), 1);
    }

    #[test]
    fn render_appends_classifier_pass() {
        let mut ctx = HeadlessContext::new();
        let mut cache = RenderResourceCache::new();
        let mut handle = create_viewshed(&mut ctx, config()).unwrap();
        let mut fs = frame_state(SceneMode::Scene3D);
        handle.render(&mut ctx, &mut cache, &mut fs).unwrap();

        let texture = handle.shadow_map().unwrap().texture;
        let pass = &fs.post_process[0];
        assert_eq!(pass.textures, vec![("u_shadow_map", texture)]);
        assert_eq!(
            pass.uniforms.get("u_max_distance"),
            Some(UniformValue::Float(200.0))
        );
        assert!(!fs.command_list.is_empty());
    }

    #[test]
    fn non_3d_modes_skip_everything() {
        let mut ctx = HeadlessContext::new();
        let mut cache = RenderResourceCache::new();
        let mut handle = create_viewshed(&mut ctx, config()).unwrap();
        let mut fs = frame_state(SceneMode::Scene2D);
        handle.render(&mut ctx, &mut cache, &mut fs).unwrap();
        assert!(fs.command_list.is_empty());
        assert!(fs.post_process.is_empty());
    }

    #[test]
    fn invalid_setters_leave_state_unchanged() {
        let mut ctx = HeadlessContext::new();
        let mut handle = create_viewshed(&mut ctx, config()).unwrap();
        let before = handle.settings().clone();

        assert_eq!(
            handle.set_horizontal_angle(-10.0),
            Err(ViewshedError::InvalidAngle {
                axis: "horizontal",
                degrees: -10.0
            })
        );
        assert_eq!(
            handle.set_distance(0.0),
            Err(ViewshedError::InvalidDistance(0.0))
        );
        assert_eq!(handle.set_alpha(1.5), Err(ViewshedError::InvalidAlpha(1.5)));
        assert_eq!(handle.settings(), &before);
        assert_eq!(handle.config().horizontal_angle_deg, 90.0);
    }

    #[test]
    fn setters_reach_classifier_and_indicator() {
        let mut ctx = HeadlessContext::new();
        let mut handle = create_viewshed(&mut ctx, config()).unwrap();

        handle.set_horizontal_angle(60.0).unwrap();
        handle.set_vertical_angle(30.0).unwrap();
        handle.set_distance(150.0).unwrap();
        handle.set_hidden_color(Color::BLACK).unwrap();
        handle.set_alpha(0.25).unwrap();

        let s = handle.settings();
        assert_close(s.horizontal_half_angle, 30f64.to_radians(), 1e-12);
        assert_close(s.vertical_half_angle, 15f64.to_radians(), 1e-12);
        assert_eq!(s.max_distance, 150.0);
        assert_eq!(s.hidden_color, Color::BLACK);
        assert_eq!(s.blend, 0.25);

        let o = handle.sensor().options();
        assert_close(o.y_half_angle, 15f64.to_radians(), 1e-12);
        assert_eq!(o.radius, 150.0);
        assert_eq!(
            o.lateral_material,
            sensor::Material::color(Color::LIME.with_alpha(0.25))
        );
    }

    #[test]
    fn wall_flips_fragment_from_visible_to_hidden() {
        let mut ctx = HeadlessContext::new();
        let handle = create_viewshed(&mut ctx, config()).unwrap();
        let fragment = Vec3::new(50.0, 0.0, 0.0);

        let open = handle.render_shadow_depth(&[ground()]).unwrap();
        let c = handle
            .classify_world_point(&open, fragment, Some(Vec3::UNIT_Z))
            .unwrap();
        assert_eq!(c, Classification::Visible);
        assert_eq!(
            c.shade(Color::BLACK, handle.settings()),
            Color::BLACK.mix_rgb(Color::LIME, 0.5)
        );

        let wall: Box<dyn Occluder> = Box::new(Wall::new(
            Vec3::new(25.0, -10.0, 0.0),
            Vec3::new(25.0, 10.0, 0.0),
            Vec3::UNIT_Z,
            80.0,
        ));
        let blocked = handle.render_shadow_depth(&[ground(), wall]).unwrap();
        let c = handle
            .classify_world_point(&blocked, fragment, Some(Vec3::UNIT_Z))
            .unwrap();
        assert!(matches!(c, Classification::Hidden { .. }));
        assert_eq!(
            c.shade(Color::BLACK, handle.settings()),
            Color::BLACK.mix_rgb(Color::RED, 0.5)
        );
    }

    #[test]
    fn degenerate_update_keeps_previous_placement() {
        let mut ctx = HeadlessContext::new();
        let mut handle = create_viewshed(&mut ctx, config()).unwrap();
        let matrix = handle.sensor().options().model_matrix;

        assert_eq!(
            handle.update(&mut ctx, OBSERVER, OBSERVER),
            Err(ViewshedError::DegenerateGeometry)
        );
        assert_eq!(handle.config().target_position, Some(TARGET));
        assert_eq!(handle.sensor().options().model_matrix, matrix);
    }

    #[test]
    fn failed_create_releases_post_process_stage() {
        let mut ctx = HeadlessContext::new();
        ctx.inject_fault(InjectedFault::TextureAlloc);
        let err = create_viewshed(&mut ctx, config()).unwrap_err();
        assert!(matches!(err, ViewshedError::Gpu(_)));
        assert_eq!(ctx.live_resources(), 0);
    }

    #[test]
    fn shadow_map_resize_reallocates() {
        let mut ctx = HeadlessContext::new();
        let mut handle = create_viewshed(&mut ctx, config()).unwrap();
        handle.set_shadow_map_size(&mut ctx, 512).unwrap();
        assert_eq!(handle.shadow_map().unwrap().size(), 512);
        assert_eq!(ctx.live_textures(), 1);
        assert!(matches!(
            handle.set_shadow_map_size(&mut ctx, 0),
            Err(ViewshedError::Config(_))
        ));
        assert_eq!(handle.config().shadow_map_size, 512);
    }

    #[test]
    fn destroy_releases_everything_and_fails_loudly_afterwards() {
        let mut ctx = HeadlessContext::new();
        let mut cache = RenderResourceCache::new();
        let mut handle = create_viewshed(&mut ctx, config()).unwrap();
        let mut fs = frame_state(SceneMode::Scene3D);
        handle.render(&mut ctx, &mut cache, &mut fs).unwrap();
        assert!(ctx.live_resources() > 0);

        handle.destroy(&mut ctx, &mut cache).unwrap();
        assert_eq!(ctx.live_resources(), 0);
        assert!(cache.is_empty());
        assert!(handle.is_destroyed());

        fs.begin_next();
        assert_eq!(
            handle.render(&mut ctx, &mut cache, &mut fs),
            Err(ViewshedError::Destroyed)
        );
        assert_eq!(
            handle.destroy(&mut ctx, &mut cache),
            Err(ViewshedError::Destroyed)
        );
    }
}
