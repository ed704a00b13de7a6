use std::collections::BTreeMap;

use runtime::Metrics;
use tracing::trace;

use crate::context::{
    GpuError, PostProcessDesc, PostProcessId, PrimitiveTopology, RenderContext, RenderStateDesc,
    RenderStateId, ShaderProgramDesc, ShaderProgramId, TextureDesc, TextureFormat, TextureId,
    VertexArrayDesc, VertexArrayId,
};

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessVertexArray {
    pub label: String,
    pub data: Vec<u8>,
    pub vertex_count: u32,
    pub topology: PrimitiveTopology,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessProgram {
    pub label: String,
    pub defines: Vec<String>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HeadlessTexture {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

/// Faults the headless context can be asked to raise on the next matching call.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InjectedFault {
    ShaderCompile,
    VertexArrayAlloc,
    TextureAlloc,
}

/// Device-less `RenderContext` that records every allocation.
///
/// Handles are never reused, so a stale handle is always detectable.
#[derive(Debug, Default)]
pub struct HeadlessContext {
    next_id: u32,
    vertex_arrays: BTreeMap<VertexArrayId, HeadlessVertexArray>,
    programs: BTreeMap<ShaderProgramId, HeadlessProgram>,
    render_states: BTreeMap<RenderStateId, RenderStateDesc>,
    textures: BTreeMap<TextureId, HeadlessTexture>,
    post_process: BTreeMap<PostProcessId, String>,
    faults: Vec<InjectedFault>,
    metrics: Metrics,
}

impl HeadlessContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of the given kind fail.
    pub fn inject_fault(&mut self, fault: InjectedFault) {
        self.faults.push(fault);
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn vertex_array(&self, id: VertexArrayId) -> Option<&HeadlessVertexArray> {
        self.vertex_arrays.get(&id)
    }

    pub fn program(&self, id: ShaderProgramId) -> Option<&HeadlessProgram> {
        self.programs.get(&id)
    }

    pub fn render_state(&self, id: RenderStateId) -> Option<&RenderStateDesc> {
        self.render_states.get(&id)
    }

    pub fn texture(&self, id: TextureId) -> Option<&HeadlessTexture> {
        self.textures.get(&id)
    }

    pub fn live_vertex_arrays(&self) -> usize {
        self.vertex_arrays.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_render_states(&self) -> usize {
        self.render_states.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_post_process_stages(&self) -> usize {
        self.post_process.len()
    }

    /// Total number of live handles of every kind.
    pub fn live_resources(&self) -> usize {
        self.live_vertex_arrays()
            + self.live_programs()
            + self.live_render_states()
            + self.live_textures()
            + self.live_post_process_stages()
    }

    fn take_fault(&mut self, fault: InjectedFault) -> bool {
        match self.faults.iter().position(|f| *f == fault) {
            Some(i) => {
                self.faults.remove(i);
                true
            }
            None => false,
        }
    }

    fn allocate(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

fn remove_or_unknown<K: Ord, V>(map: &mut BTreeMap<K, V>, key: &K) -> Result<(), GpuError> {
    map.remove(key).map(|_| ()).ok_or(GpuError::UnknownHandle)
}

impl RenderContext for HeadlessContext {
    fn create_vertex_array(
        &mut self,
        desc: &VertexArrayDesc<'_>,
    ) -> Result<VertexArrayId, GpuError> {
        if self.take_fault(InjectedFault::VertexArrayAlloc) {
            return Err(GpuError::OutOfMemory {
                label: desc.label.to_string(),
                bytes: desc.data.len(),
            });
        }
        let id = VertexArrayId(self.allocate());
        trace!(label = desc.label, bytes = desc.data.len(), "create vertex array");
        self.vertex_arrays.insert(
            id,
            HeadlessVertexArray {
                label: desc.label.to_string(),
                data: desc.data.to_vec(),
                vertex_count: desc.vertex_count(),
                topology: desc.topology,
            },
        );
        self.metrics.inc_counter("gpu.vertex_array.create", 1);
        Ok(id)
    }

    fn destroy_vertex_array(&mut self, id: VertexArrayId) -> Result<(), GpuError> {
        remove_or_unknown(&mut self.vertex_arrays, &id)?;
        self.metrics.inc_counter("gpu.vertex_array.destroy", 1);
        Ok(())
    }

    fn create_shader_program(
        &mut self,
        desc: &ShaderProgramDesc<'_>,
    ) -> Result<ShaderProgramId, GpuError> {
        if self.take_fault(InjectedFault::ShaderCompile) {
            return Err(GpuError::ShaderCompile {
                label: desc.label.to_string(),
                message: "injected compile failure".to_string(),
            });
        }
        if !desc.source.contains("fn vs_main") || !desc.source.contains("fn fs_main") {
            return Err(GpuError::ShaderCompile {
                label: desc.label.to_string(),
                message: "missing vs_main/fs_main entry point".to_string(),
            });
        }
        let id = ShaderProgramId(self.allocate());
        trace!(label = desc.label, defines = ?desc.defines, "create shader program");
        self.programs.insert(
            id,
            HeadlessProgram {
                label: desc.label.to_string(),
                defines: desc.defines.iter().map(|d| d.to_string()).collect(),
            },
        );
        self.metrics.inc_counter("gpu.program.create", 1);
        Ok(id)
    }

    fn destroy_shader_program(&mut self, id: ShaderProgramId) -> Result<(), GpuError> {
        remove_or_unknown(&mut self.programs, &id)?;
        self.metrics.inc_counter("gpu.program.destroy", 1);
        Ok(())
    }

    fn create_render_state(&mut self, desc: &RenderStateDesc) -> Result<RenderStateId, GpuError> {
        let id = RenderStateId(self.allocate());
        self.render_states.insert(id, *desc);
        self.metrics.inc_counter("gpu.render_state.create", 1);
        Ok(id)
    }

    fn destroy_render_state(&mut self, id: RenderStateId) -> Result<(), GpuError> {
        remove_or_unknown(&mut self.render_states, &id)?;
        self.metrics.inc_counter("gpu.render_state.destroy", 1);
        Ok(())
    }

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureId, GpuError> {
        if self.take_fault(InjectedFault::TextureAlloc) {
            return Err(GpuError::OutOfMemory {
                label: desc.label.to_string(),
                bytes: desc.width as usize * desc.height as usize * 4,
            });
        }
        let id = TextureId(self.allocate());
        self.textures.insert(
            id,
            HeadlessTexture {
                width: desc.width,
                height: desc.height,
                format: desc.format,
            },
        );
        self.metrics.inc_counter("gpu.texture.create", 1);
        Ok(id)
    }

    fn destroy_texture(&mut self, id: TextureId) -> Result<(), GpuError> {
        remove_or_unknown(&mut self.textures, &id)?;
        self.metrics.inc_counter("gpu.texture.destroy", 1);
        Ok(())
    }

    fn create_post_process_stage(
        &mut self,
        desc: &PostProcessDesc<'_>,
    ) -> Result<PostProcessId, GpuError> {
        if self.take_fault(InjectedFault::ShaderCompile) || !desc.source.contains("fn fs_main") {
            return Err(GpuError::ShaderCompile {
                label: desc.label.to_string(),
                message: "post process stage rejected".to_string(),
            });
        }
        let id = PostProcessId(self.allocate());
        self.post_process.insert(id, desc.label.to_string());
        self.metrics.inc_counter("gpu.post_process.create", 1);
        Ok(id)
    }

    fn destroy_post_process_stage(&mut self, id: PostProcessId) -> Result<(), GpuError> {
        remove_or_unknown(&mut self.post_process, &id)?;
        self.metrics.inc_counter("gpu.post_process.destroy", 1);
        Ok(())
    }
}
