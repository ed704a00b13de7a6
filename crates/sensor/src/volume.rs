use std::collections::BTreeMap;
use std::f64::consts::PI;

use bytemuck::Pod;
use foundation::Color;
use foundation::math::{Mat4, Quat, Vec3, WGS84_A};
use gpu::{
    BoundingSphere, DrawCommand, FrameState, GpuError, Pass, PrimitiveTopology, RenderContext,
    SceneMode, UniformBlock, VertexArrayDesc, VertexArrayId, VertexAttribute,
};
use runtime::Metrics;
use tracing::{debug, warn};

use crate::dirty::{DirtyFlags, SensorSnapshot, diff};
use crate::error::SensorError;
use crate::material::Material;
use crate::mesher::{
    AngleLimitedPyramidMesher, DomeMesh, LineVertex, PyramidMesh, ScanPlaneMode, SurfaceVertex,
};
use crate::resource_cache::{ProgramKey, RenderResourceCache, SensorKind, SensorPrograms};
use crate::uniforms::{SensorUniforms, pick_color};

pub const MAX_SLICE_COUNT: u32 = 4096;

/// World extent used in place of an infinite radius.
pub const INFINITE_SENSOR_EXTENT: f64 = 4.0 * WGS84_A;

const SURFACE_ATTRIBUTES: [VertexAttribute; 2] = [
    VertexAttribute {
        location: 0,
        components: 3,
        offset: 0,
    },
    VertexAttribute {
        location: 1,
        components: 3,
        offset: 12,
    },
];

const LINE_ATTRIBUTES: [VertexAttribute; 1] = [VertexAttribute {
    location: 0,
    components: 3,
    offset: 0,
}];

/// Independently toggled visual elements, each with its own vertex array.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SensorElement {
    LateralSurfaces,
    SectorLines,
    SectorSegmentLines,
    DomeSurfaces,
    DomeLines,
    ScanPlane,
}

impl SensorElement {
    pub const ALL: [SensorElement; 6] = [
        SensorElement::LateralSurfaces,
        SensorElement::SectorLines,
        SensorElement::SectorSegmentLines,
        SensorElement::DomeSurfaces,
        SensorElement::DomeLines,
        SensorElement::ScanPlane,
    ];

    pub fn kind(self) -> SensorKind {
        match self {
            SensorElement::LateralSurfaces
            | SensorElement::DomeSurfaces
            | SensorElement::ScanPlane => SensorKind::Surface,
            _ => SensorKind::Line,
        }
    }

    pub fn slot(self) -> ProgramSlot {
        match self {
            SensorElement::LateralSurfaces => ProgramSlot::Lateral,
            SensorElement::DomeSurfaces => ProgramSlot::Dome,
            SensorElement::ScanPlane => ProgramSlot::ScanPlane,
            _ => ProgramSlot::Lines,
        }
    }

    fn topology(self) -> PrimitiveTopology {
        match self.kind() {
            SensorKind::Surface => PrimitiveTopology::Triangles,
            SensorKind::Line => PrimitiveTopology::Lines,
        }
    }

    /// Labels for the front, back and pick commands.
    fn labels(self) -> [&'static str; 3] {
        match self {
            SensorElement::LateralSurfaces => {
                ["sensor-lateral", "sensor-lateral-back", "sensor-lateral-pick"]
            }
            SensorElement::SectorLines => {
                ["sensor-sector-lines", "sensor-sector-lines", "sensor-sector-lines-pick"]
            }
            SensorElement::SectorSegmentLines => [
                "sensor-segment-lines",
                "sensor-segment-lines",
                "sensor-segment-lines-pick",
            ],
            SensorElement::DomeSurfaces => ["sensor-dome", "sensor-dome-back", "sensor-dome-pick"],
            SensorElement::DomeLines => {
                ["sensor-dome-lines", "sensor-dome-lines", "sensor-dome-lines-pick"]
            }
            SensorElement::ScanPlane => {
                ["sensor-scan-plane", "sensor-scan-plane-back", "sensor-scan-plane-pick"]
            }
        }
    }
}

/// One program set per distinct appearance; elements sharing a slot share
/// programs and translucency.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProgramSlot {
    Lateral,
    Dome,
    Lines,
    ScanPlane,
}

impl ProgramSlot {
    pub const ALL: [ProgramSlot; 4] = [
        ProgramSlot::Lateral,
        ProgramSlot::Dome,
        ProgramSlot::Lines,
        ProgramSlot::ScanPlane,
    ];
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorVolumeOptions {
    pub show: bool,
    /// Metres; `f64::INFINITY` is allowed.
    pub radius: f64,
    pub x_half_angle: f64,
    pub y_half_angle: f64,
    pub slice_count: u32,
    pub model_matrix: Mat4,

    pub show_lateral_surfaces: bool,
    pub show_sector_lines: bool,
    pub show_sector_segment_lines: bool,
    pub show_dome_surfaces: bool,
    pub show_dome_lines: bool,
    pub show_scan_plane: bool,
    pub show_through_ellipsoid: bool,
    pub show_intersection: bool,

    pub lateral_material: Material,
    pub dome_material: Material,
    pub line_color: Color,
    pub scan_plane_color: Color,
    pub intersection_color: Color,
    /// Metres either side of the ellipsoid surface.
    pub intersection_width: f64,

    pub scan_plane_mode: ScanPlaneMode,
    /// Radians per second.
    pub scan_plane_rate: f64,
    pub pick_id: u32,
}

impl Default for SensorVolumeOptions {
    fn default() -> Self {
        Self {
            show: true,
            radius: f64::INFINITY,
            x_half_angle: 20f64.to_radians(),
            y_half_angle: 20f64.to_radians(),
            slice_count: 32,
            model_matrix: Mat4::IDENTITY,
            show_lateral_surfaces: true,
            show_sector_lines: true,
            show_sector_segment_lines: true,
            show_dome_surfaces: true,
            show_dome_lines: true,
            show_scan_plane: false,
            show_through_ellipsoid: false,
            show_intersection: false,
            lateral_material: Material::default(),
            dome_material: Material::default(),
            line_color: Color::WHITE,
            scan_plane_color: Color::YELLOW.with_alpha(0.5),
            intersection_color: Color::WHITE,
            intersection_width: 5.0,
            scan_plane_mode: ScanPlaneMode::Vertical,
            scan_plane_rate: 3.0,
            pick_id: 0,
        }
    }
}

impl SensorVolumeOptions {
    pub fn validate(&self) -> Result<(), SensorError> {
        check_half_angle('x', self.x_half_angle)?;
        check_half_angle('y', self.y_half_angle)?;
        check_radius(self.radius)?;
        check_slice_count(self.slice_count)?;
        check_model_matrix(&self.model_matrix)?;
        check_scan_plane_rate(self.scan_plane_rate)?;
        check_intersection_width(self.intersection_width)
    }

    pub fn is_shown(&self, element: SensorElement) -> bool {
        match element {
            SensorElement::LateralSurfaces => self.show_lateral_surfaces,
            SensorElement::SectorLines => self.show_sector_lines,
            SensorElement::SectorSegmentLines => self.show_sector_segment_lines,
            SensorElement::DomeSurfaces => self.show_dome_surfaces,
            SensorElement::DomeLines => self.show_dome_lines,
            SensorElement::ScanPlane => self.show_scan_plane,
        }
    }

    fn snapshot(&self) -> SensorSnapshot {
        SensorSnapshot {
            x_half_angle: self.x_half_angle,
            y_half_angle: self.y_half_angle,
            slice_count: self.slice_count,
            scan_plane_mode: self.scan_plane_mode,
            radius: self.radius,
            model_matrix: self.model_matrix,
            lateral_material: self.lateral_material,
            dome_material: self.dome_material,
            line_color: self.line_color,
            scan_plane_color: self.scan_plane_color,
        }
    }

    fn slot_key(&self, slot: ProgramSlot) -> ProgramKey {
        match slot {
            ProgramSlot::Lateral => {
                ProgramKey::new(SensorKind::Surface, self.lateral_material.is_translucent())
            }
            ProgramSlot::Dome => {
                ProgramKey::new(SensorKind::Surface, self.dome_material.is_translucent())
            }
            ProgramSlot::Lines => ProgramKey::new(SensorKind::Line, self.line_color.is_translucent()),
            ProgramSlot::ScanPlane => {
                ProgramKey::new(SensorKind::Surface, self.scan_plane_color.is_translucent())
            }
        }
    }
}

fn check_half_angle(axis: char, value: f64) -> Result<(), SensorError> {
    if value.is_finite() && (0.0..=PI).contains(&value) {
        Ok(())
    } else {
        Err(SensorError::InvalidHalfAngle { axis, value })
    }
}

fn check_radius(radius: f64) -> Result<(), SensorError> {
    // NaN fails the comparison.
    if radius >= 0.0 {
        Ok(())
    } else {
        Err(SensorError::InvalidRadius(radius))
    }
}

fn check_slice_count(slices: u32) -> Result<(), SensorError> {
    if (1..=MAX_SLICE_COUNT).contains(&slices) {
        Ok(())
    } else {
        Err(SensorError::InvalidSliceCount(slices))
    }
}

fn check_model_matrix(m: &Mat4) -> Result<(), SensorError> {
    if m.is_finite() {
        Ok(())
    } else {
        Err(SensorError::InvalidModelMatrix)
    }
}

fn check_scan_plane_rate(rate: f64) -> Result<(), SensorError> {
    if rate.is_finite() {
        Ok(())
    } else {
        Err(SensorError::InvalidScanPlaneRate(rate))
    }
}

fn check_intersection_width(width: f64) -> Result<(), SensorError> {
    if width.is_finite() && width >= 0.0 {
        Ok(())
    } else {
        Err(SensorError::InvalidIntersectionWidth(width))
    }
}

/// Radius used for the world transform and bounding sphere.
pub fn effective_extent(radius: f64) -> f64 {
    if radius.is_finite() {
        radius
    } else {
        INFINITE_SENSOR_EXTENT
    }
}

/// Extra rotation of the scan plane at time `t`: sweeps `[-h, h)` and wraps.
pub fn scan_plane_angle(half_angle: f64, rate: f64, time_s: f64) -> f64 {
    if half_angle <= 0.0 {
        return 0.0;
    }
    -half_angle + (time_s * rate).rem_euclid(2.0 * half_angle)
}

/// An angle-limited sensor pyramid drawn through a host `RenderContext`.
///
/// Configuration lives in validated setters; GPU state is only touched from
/// [`SensorVolume::update`], which diffs against the last applied snapshot and
/// commits a rebuild only once every new resource exists.
#[derive(Debug)]
pub struct SensorVolume {
    options: SensorVolumeOptions,
    applied: Option<SensorSnapshot>,
    vertex_arrays: BTreeMap<SensorElement, VertexArrayId>,
    programs: BTreeMap<ProgramSlot, (ProgramKey, SensorPrograms)>,
    world_matrix: Mat4,
    bounding_sphere: BoundingSphere,
    metrics: Metrics,
    destroyed: bool,
}

/// Resources created by a rebuild that has not been committed yet.
struct PendingRebuild {
    vertex_arrays: Vec<(SensorElement, VertexArrayId)>,
    programs: Vec<(ProgramSlot, ProgramKey, SensorPrograms)>,
}

impl SensorVolume {
    pub fn new(options: SensorVolumeOptions) -> Result<Self, SensorError> {
        options.validate()?;
        Ok(Self {
            options,
            applied: None,
            vertex_arrays: BTreeMap::new(),
            programs: BTreeMap::new(),
            world_matrix: Mat4::IDENTITY,
            bounding_sphere: BoundingSphere::new(Vec3::ZERO, 0.0),
            metrics: Metrics::new(),
            destroyed: false,
        })
    }

    pub fn options(&self) -> &SensorVolumeOptions {
        &self.options
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// What the next `update` would rebuild.
    pub fn dirty_flags(&self) -> DirtyFlags {
        diff(self.applied.as_ref(), &self.options.snapshot())
    }

    pub fn vertex_array(&self, element: SensorElement) -> Option<VertexArrayId> {
        self.vertex_arrays.get(&element).copied()
    }

    pub fn programs(&self, slot: ProgramSlot) -> Option<SensorPrograms> {
        self.programs.get(&slot).map(|(_, p)| *p)
    }

    /// Model matrix scaled by the effective radius, as of the last update.
    pub fn world_matrix(&self) -> Mat4 {
        self.world_matrix
    }

    pub fn bounding_sphere(&self) -> BoundingSphere {
        self.bounding_sphere
    }

    pub fn set_show(&mut self, show: bool) {
        self.options.show = show;
    }

    pub fn set_element_shown(&mut self, element: SensorElement, shown: bool) {
        let o = &mut self.options;
        match element {
            SensorElement::LateralSurfaces => o.show_lateral_surfaces = shown,
            SensorElement::SectorLines => o.show_sector_lines = shown,
            SensorElement::SectorSegmentLines => o.show_sector_segment_lines = shown,
            SensorElement::DomeSurfaces => o.show_dome_surfaces = shown,
            SensorElement::DomeLines => o.show_dome_lines = shown,
            SensorElement::ScanPlane => o.show_scan_plane = shown,
        }
    }

    pub fn set_x_half_angle(&mut self, value: f64) -> Result<(), SensorError> {
        check_half_angle('x', value)?;
        self.options.x_half_angle = value;
        Ok(())
    }

    pub fn set_y_half_angle(&mut self, value: f64) -> Result<(), SensorError> {
        check_half_angle('y', value)?;
        self.options.y_half_angle = value;
        Ok(())
    }

    pub fn set_radius(&mut self, radius: f64) -> Result<(), SensorError> {
        check_radius(radius)?;
        self.options.radius = radius;
        Ok(())
    }

    pub fn set_slice_count(&mut self, slices: u32) -> Result<(), SensorError> {
        check_slice_count(slices)?;
        self.options.slice_count = slices;
        Ok(())
    }

    pub fn set_model_matrix(&mut self, m: Mat4) -> Result<(), SensorError> {
        check_model_matrix(&m)?;
        self.options.model_matrix = m;
        Ok(())
    }

    pub fn set_scan_plane_rate(&mut self, rate: f64) -> Result<(), SensorError> {
        check_scan_plane_rate(rate)?;
        self.options.scan_plane_rate = rate;
        Ok(())
    }

    pub fn set_intersection_width(&mut self, width: f64) -> Result<(), SensorError> {
        check_intersection_width(width)?;
        self.options.intersection_width = width;
        Ok(())
    }

    pub fn set_scan_plane_mode(&mut self, mode: ScanPlaneMode) {
        self.options.scan_plane_mode = mode;
    }

    pub fn set_lateral_material(&mut self, material: Material) {
        self.options.lateral_material = material;
    }

    pub fn set_dome_material(&mut self, material: Material) {
        self.options.dome_material = material;
    }

    pub fn set_line_color(&mut self, color: Color) {
        self.options.line_color = color;
    }

    pub fn set_scan_plane_color(&mut self, color: Color) {
        self.options.scan_plane_color = color;
    }

    pub fn set_intersection_color(&mut self, color: Color) {
        self.options.intersection_color = color;
    }

    pub fn set_show_intersection(&mut self, show: bool) {
        self.options.show_intersection = show;
    }

    pub fn set_show_through_ellipsoid(&mut self, show: bool) {
        self.options.show_through_ellipsoid = show;
    }

    pub fn set_pick_id(&mut self, id: u32) {
        self.options.pick_id = id;
    }

    /// Per-frame entry point: rebuild whatever went stale, then append draw
    /// commands for every enabled element.
    ///
    /// On a resource error nothing is committed; the previous geometry and
    /// programs stay in place and the same rebuild is retried next frame.
    pub fn update(
        &mut self,
        ctx: &mut dyn RenderContext,
        cache: &mut RenderResourceCache,
        frame_state: &mut FrameState,
    ) -> Result<(), SensorError> {
        if self.destroyed {
            return Err(SensorError::Destroyed);
        }
        if !self.options.show || frame_state.mode != SceneMode::Scene3D {
            return Ok(());
        }

        let snapshot = self.options.snapshot();
        let flags = diff(self.applied.as_ref(), &snapshot);
        let pending = self.prepare(ctx, cache, flags)?;
        self.commit(ctx, cache, flags, pending);
        self.applied = Some(snapshot);

        self.push_commands(frame_state);
        Ok(())
    }

    /// Releases every vertex array and program reference.
    ///
    /// The sensor is unusable afterwards even if a release failed; the first
    /// failure is returned.
    pub fn destroy(
        &mut self,
        ctx: &mut dyn RenderContext,
        cache: &mut RenderResourceCache,
    ) -> Result<(), SensorError> {
        if self.destroyed {
            return Err(SensorError::Destroyed);
        }
        self.destroyed = true;
        self.applied = None;

        let mut first_error: Option<GpuError> = None;
        for (_, id) in std::mem::take(&mut self.vertex_arrays) {
            if let Err(e) = ctx.destroy_vertex_array(id) {
                first_error.get_or_insert(e);
            }
        }
        for (_, (key, _)) in std::mem::take(&mut self.programs) {
            if let Err(e) = cache.release(ctx, key) {
                first_error.get_or_insert(e);
            }
        }
        debug!("sensor volume destroyed");
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    fn needs_mesh(&self, element: SensorElement, flags: DirtyFlags) -> bool {
        if !self.options.is_shown(element) {
            return false;
        }
        !self.vertex_arrays.contains_key(&element)
            || flags.geometry()
            || (element == SensorElement::ScanPlane && flags.scan_plane_mode)
    }

    /// Creates every resource the rebuild needs. Either all of them exist on
    /// return or none do.
    fn prepare(
        &self,
        ctx: &mut dyn RenderContext,
        cache: &mut RenderResourceCache,
        flags: DirtyFlags,
    ) -> Result<PendingRebuild, SensorError> {
        let elements: Vec<SensorElement> = SensorElement::ALL
            .into_iter()
            .filter(|e| self.needs_mesh(*e, flags))
            .collect();
        let vertex_arrays = self.build_vertex_arrays(ctx, &elements)?;

        let mut programs = Vec::new();
        for slot in ProgramSlot::ALL {
            let key = self.options.slot_key(slot);
            if self.programs.get(&slot).map(|(held, _)| *held) == Some(key) {
                continue;
            }
            match cache.acquire(ctx, key) {
                Ok(p) => programs.push((slot, key, p)),
                Err(e) => {
                    for (element, id) in vertex_arrays {
                        release_vertex_array(ctx, element, id);
                    }
                    for (_, key, _) in programs {
                        if let Err(e) = cache.release(ctx, key) {
                            warn!(?key, error = %e, "failed to release sensor programs");
                        }
                    }
                    return Err(e.into());
                }
            }
        }

        Ok(PendingRebuild {
            vertex_arrays,
            programs,
        })
    }

    fn build_vertex_arrays(
        &self,
        ctx: &mut dyn RenderContext,
        elements: &[SensorElement],
    ) -> Result<Vec<(SensorElement, VertexArrayId)>, GpuError> {
        let o = &self.options;
        let mesher = AngleLimitedPyramidMesher::new(o.x_half_angle, o.y_half_angle, o.slice_count);
        let mut pyramid: Option<PyramidMesh> = None;
        let mut dome: Option<DomeMesh> = None;

        let mut built = Vec::with_capacity(elements.len());
        for &element in elements {
            let label = element.labels()[0];
            let result = match element {
                SensorElement::LateralSurfaces => {
                    let mesh = pyramid.get_or_insert_with(|| mesher.build());
                    upload_surface(ctx, label, &mesh.sector_vertices)
                }
                SensorElement::SectorLines => {
                    let mesh = pyramid.get_or_insert_with(|| mesher.build());
                    upload_lines(ctx, label, &mesh.sector_line_vertices)
                }
                SensorElement::SectorSegmentLines => {
                    let mesh = pyramid.get_or_insert_with(|| mesher.build());
                    upload_lines(ctx, label, &mesh.sector_segment_line_vertices)
                }
                SensorElement::DomeSurfaces => {
                    let mesh = dome.get_or_insert_with(|| mesher.build_dome());
                    upload_surface(ctx, label, &mesh.surface_vertices)
                }
                SensorElement::DomeLines => {
                    let mesh = dome.get_or_insert_with(|| mesher.build_dome());
                    upload_lines(ctx, label, &mesh.line_vertices)
                }
                SensorElement::ScanPlane => {
                    let mesh = mesher.build_scan_plane(o.scan_plane_mode);
                    upload_surface(ctx, label, &mesh.surface_vertices)
                }
            };
            match result {
                Ok(id) => built.push((element, id)),
                Err(e) => {
                    for (element, id) in built {
                        release_vertex_array(ctx, element, id);
                    }
                    return Err(e);
                }
            }
        }
        if !built.is_empty() {
            debug!(elements = built.len(), slices = o.slice_count, "remeshed sensor");
        }
        Ok(built)
    }

    /// Swaps in a prepared rebuild. Nothing here can fail the update; a
    /// failed release of an old resource is only logged.
    fn commit(
        &mut self,
        ctx: &mut dyn RenderContext,
        cache: &mut RenderResourceCache,
        flags: DirtyFlags,
        pending: PendingRebuild,
    ) {
        if flags.geometry() || flags.scan_plane_mode {
            let stale: Vec<SensorElement> = self
                .vertex_arrays
                .keys()
                .copied()
                .filter(|e| !self.options.is_shown(*e))
                .filter(|e| flags.geometry() || *e == SensorElement::ScanPlane)
                .collect();
            for element in stale {
                if let Some(id) = self.vertex_arrays.remove(&element) {
                    release_vertex_array(ctx, element, id);
                }
            }
        }

        self.metrics
            .inc_counter("sensor.remesh", pending.vertex_arrays.len() as u64);
        for (element, id) in pending.vertex_arrays {
            if let Some(old) = self.vertex_arrays.insert(element, id) {
                release_vertex_array(ctx, element, old);
            }
        }

        let acquired = pending.programs.len() as u64;
        self.metrics.inc_counter("sensor.program_acquire", acquired);
        for (slot, key, programs) in pending.programs {
            if let Some((old, _)) = self.programs.insert(slot, (key, programs)) {
                if let Err(e) = cache.release(ctx, old) {
                    warn!(?slot, error = %e, "failed to release sensor programs");
                }
            }
        }
        if acquired > 0 {
            debug!(programs = acquired, "acquired sensor programs");
        } else if flags.material {
            self.metrics.inc_counter("sensor.uniform_swap", 1);
        }

        if flags.radius_or_matrix {
            let extent = effective_extent(self.options.radius);
            self.world_matrix = self.options.model_matrix * Mat4::from_scale(extent);
            self.bounding_sphere =
                BoundingSphere::new(self.options.model_matrix.translation(), extent);
            self.metrics.inc_counter("sensor.transform_update", 1);
        }
        self.metrics
            .set_gauge("sensor.vertex_arrays", self.vertex_arrays.len() as i64);
    }

    fn uniforms(&self) -> SensorUniforms {
        let o = &self.options;
        SensorUniforms {
            radius: effective_extent(o.radius),
            intersection_color: o.intersection_color,
            intersection_width: o.intersection_width,
            show_intersection: o.show_intersection,
            show_through_ellipsoid: o.show_through_ellipsoid,
            pick_color: pick_color(o.pick_id),
        }
    }

    fn element_uniforms(&self, element: SensorElement, uniforms: &SensorUniforms) -> UniformBlock {
        let o = &self.options;
        match element {
            SensorElement::LateralSurfaces => uniforms.surface_block(&o.lateral_material),
            SensorElement::DomeSurfaces => uniforms.surface_block(&o.dome_material),
            SensorElement::ScanPlane => {
                uniforms.surface_block(&Material::color(o.scan_plane_color))
            }
            _ => uniforms.line_block(o.line_color),
        }
    }

    fn scan_plane_rotation(&self, time_s: f64) -> Mat4 {
        let o = &self.options;
        let (axis, half_angle) = match o.scan_plane_mode {
            ScanPlaneMode::Vertical => (Vec3::UNIT_Y, o.x_half_angle),
            ScanPlaneMode::Horizontal => (Vec3::UNIT_X, o.y_half_angle),
        };
        let angle = scan_plane_angle(half_angle, o.scan_plane_rate, time_s);
        Mat4::from_rotation(Quat::from_axis_angle(axis, angle))
    }

    fn push_commands(&self, frame_state: &mut FrameState) {
        let pick = frame_state.passes.pick;
        if !pick && !frame_state.passes.render {
            return;
        }
        let uniforms = self.uniforms();
        let time_s = frame_state.frame.time_s;

        for element in SensorElement::ALL {
            if !self.options.is_shown(element) {
                continue;
            }
            let (Some(&vertex_array), Some(&(key, programs))) = (
                self.vertex_arrays.get(&element),
                self.programs.get(&element.slot()),
            ) else {
                continue;
            };
            let model_matrix = if element == SensorElement::ScanPlane {
                self.world_matrix * self.scan_plane_rotation(time_s)
            } else {
                self.world_matrix
            };
            let [front_label, back_label, pick_label] = element.labels();
            let command = DrawCommand {
                label: front_label,
                vertex_array,
                shader_program: programs.front,
                render_state: programs.front_state,
                topology: element.topology(),
                model_matrix,
                bounding_sphere: self.bounding_sphere,
                pass: if key.translucent {
                    Pass::Translucent
                } else {
                    Pass::Opaque
                },
                uniforms: UniformBlock::new(),
            };

            if pick {
                frame_state.command_list.push(DrawCommand {
                    label: pick_label,
                    shader_program: programs.pick,
                    render_state: programs.pick_state,
                    pass: Pass::Opaque,
                    uniforms: uniforms.pick_block(),
                    ..command
                });
                continue;
            }

            let block = self.element_uniforms(element, &uniforms);
            if key.translucent && key.kind == SensorKind::Surface {
                frame_state.command_list.push(DrawCommand {
                    label: back_label,
                    shader_program: programs.back,
                    render_state: programs.back_state,
                    uniforms: block.clone(),
                    ..command.clone()
                });
            }
            frame_state.command_list.push(DrawCommand {
                uniforms: block,
                ..command
            });
        }
    }
}

fn upload<V: Pod>(
    ctx: &mut dyn RenderContext,
    label: &str,
    vertices: &[V],
    attributes: &[VertexAttribute],
    topology: PrimitiveTopology,
) -> Result<VertexArrayId, GpuError> {
    ctx.create_vertex_array(&VertexArrayDesc {
        label,
        data: bytemuck::cast_slice(vertices),
        stride: std::mem::size_of::<V>() as u32,
        attributes,
        topology,
    })
}

fn upload_surface(
    ctx: &mut dyn RenderContext,
    label: &str,
    vertices: &[SurfaceVertex],
) -> Result<VertexArrayId, GpuError> {
    upload(ctx, label, vertices, &SURFACE_ATTRIBUTES, PrimitiveTopology::Triangles)
}

fn upload_lines(
    ctx: &mut dyn RenderContext,
    label: &str,
    vertices: &[LineVertex],
) -> Result<VertexArrayId, GpuError> {
    upload(ctx, label, vertices, &LINE_ATTRIBUTES, PrimitiveTopology::Lines)
}

fn release_vertex_array(ctx: &mut dyn RenderContext, element: SensorElement, id: VertexArrayId) {
    if let Err(e) = ctx.destroy_vertex_array(id) {
        warn!(?element, error = %e, "failed to destroy sensor vertex array");
    }
}
