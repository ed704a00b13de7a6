use std::collections::BTreeMap;

use gpu::{
    CullFace, GpuError, RenderContext, RenderStateDesc, RenderStateId, ShaderProgramDesc,
    ShaderProgramId,
};
use runtime::Metrics;
use tracing::{debug, warn};

use crate::shaders::{
    DEFINE_BACK_FACE, DEFINE_PICK, DEFINE_TRANSLUCENT, SENSOR_LINE_SHADER, SENSOR_SURFACE_SHADER,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SensorKind {
    /// Lit triangles: lateral faces, dome, scan plane.
    Surface,
    /// Flat-colored line lists.
    Line,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProgramKey {
    pub translucent: bool,
    pub kind: SensorKind,
}

impl ProgramKey {
    pub fn new(kind: SensorKind, translucent: bool) -> Self {
        Self { translucent, kind }
    }

    fn source(&self) -> &'static str {
        match self.kind {
            SensorKind::Surface => SENSOR_SURFACE_SHADER,
            SensorKind::Line => SENSOR_LINE_SHADER,
        }
    }

    fn label(&self) -> &'static str {
        match (self.kind, self.translucent) {
            (SensorKind::Surface, false) => "sensor-surface-opaque",
            (SensorKind::Surface, true) => "sensor-surface-translucent",
            (SensorKind::Line, false) => "sensor-line-opaque",
            (SensorKind::Line, true) => "sensor-line-translucent",
        }
    }
}

/// Programs and render states for one `ProgramKey`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SensorPrograms {
    pub front: ShaderProgramId,
    pub back: ShaderProgramId,
    pub pick: ShaderProgramId,
    pub front_state: RenderStateId,
    pub back_state: RenderStateId,
    pub pick_state: RenderStateId,
}

#[derive(Debug)]
struct Entry {
    programs: SensorPrograms,
    users: u32,
}

/// Shared, reference-counted programs and render states.
///
/// Each sensor acquires the keys it draws with and releases them when it no
/// longer needs them; resources are destroyed only when the last user
/// releases, so one sensor going away never invalidates another's programs.
#[derive(Debug, Default)]
pub struct RenderResourceCache {
    entries: BTreeMap<ProgramKey, Entry>,
    metrics: Metrics,
}

impl RenderResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn users(&self, key: ProgramKey) -> u32 {
        self.entries.get(&key).map(|e| e.users).unwrap_or(0)
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn acquire(
        &mut self,
        ctx: &mut dyn RenderContext,
        key: ProgramKey,
    ) -> Result<SensorPrograms, GpuError> {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.users += 1;
            self.metrics.inc_counter("cache.hit", 1);
            return Ok(entry.programs);
        }

        let programs = build_programs(ctx, key)?;
        debug!(?key, "built sensor programs");
        self.metrics.inc_counter("cache.build", 1);
        self.entries.insert(key, Entry { programs, users: 1 });
        Ok(programs)
    }

    pub fn release(&mut self, ctx: &mut dyn RenderContext, key: ProgramKey) -> Result<(), GpuError> {
        let Some(entry) = self.entries.get_mut(&key) else {
            return Err(GpuError::UnknownHandle);
        };
        entry.users -= 1;
        if entry.users > 0 {
            return Ok(());
        }
        let Some(entry) = self.entries.remove(&key) else {
            return Ok(());
        };
        debug!(?key, "destroying sensor programs");
        self.metrics.inc_counter("cache.evict", 1);
        destroy_programs(ctx, &entry.programs)
    }
}

/// Builds all six objects, or none: anything created before a failure is
/// destroyed again before the error is returned.
fn build_programs(ctx: &mut dyn RenderContext, key: ProgramKey) -> Result<SensorPrograms, GpuError> {
    let mut programs: Vec<ShaderProgramId> = Vec::with_capacity(3);
    let mut states: Vec<RenderStateId> = Vec::with_capacity(3);

    let result = (|| {
        let translucent: &[&str] = if key.translucent {
            &[DEFINE_TRANSLUCENT]
        } else {
            &[]
        };
        let back_defines: Vec<&str> = translucent
            .iter()
            .copied()
            .chain([DEFINE_BACK_FACE])
            .collect();

        for defines in [translucent, back_defines.as_slice(), &[DEFINE_PICK][..]] {
            programs.push(ctx.create_shader_program(&ShaderProgramDesc {
                label: key.label(),
                source: key.source(),
                defines,
            })?);
        }

        let (front_state, back_state) = if key.translucent {
            (
                RenderStateDesc::translucent(Some(CullFace::Back)),
                RenderStateDesc::translucent(Some(CullFace::Front)),
            )
        } else {
            (RenderStateDesc::opaque(), RenderStateDesc::opaque())
        };
        for desc in [front_state, back_state, RenderStateDesc::opaque()] {
            states.push(ctx.create_render_state(&desc)?);
        }
        Ok::<(), GpuError>(())
    })();

    if let Err(e) = result {
        for id in programs {
            if let Err(e) = ctx.destroy_shader_program(id) {
                warn!(?id, error = %e, "failed to destroy shader program during rollback");
            }
        }
        for id in states {
            if let Err(e) = ctx.destroy_render_state(id) {
                warn!(?id, error = %e, "failed to destroy render state during rollback");
            }
        }
        return Err(e);
    }

    Ok(SensorPrograms {
        front: programs[0],
        back: programs[1],
        pick: programs[2],
        front_state: states[0],
        back_state: states[1],
        pick_state: states[2],
    })
}

fn destroy_programs(ctx: &mut dyn RenderContext, p: &SensorPrograms) -> Result<(), GpuError> {
    let results = [
        ctx.destroy_shader_program(p.front),
        ctx.destroy_shader_program(p.back),
        ctx.destroy_shader_program(p.pick),
        ctx.destroy_render_state(p.front_state),
        ctx.destroy_render_state(p.back_state),
        ctx.destroy_render_state(p.pick_state),
    ];
    results.into_iter().collect()
}
