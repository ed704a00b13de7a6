macro_rules! resource_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);
    };
}

resource_id!(
    /// Uploaded vertex buffer plus its attribute layout.
    VertexArrayId
);
resource_id!(
    /// Compiled and linked shader program.
    ShaderProgramId
);
resource_id!(
    /// Immutable depth/blend/cull configuration.
    RenderStateId
);
resource_id!(TextureId);
resource_id!(
    /// Full-screen pass executed after the scene has been drawn.
    PostProcessId
);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    Triangles,
    Lines,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    /// Number of `f32` components.
    pub components: u32,
    /// Byte offset inside one vertex.
    pub offset: u32,
}

#[derive(Debug, Copy, Clone)]
pub struct VertexArrayDesc<'a> {
    pub label: &'a str,
    pub data: &'a [u8],
    /// Bytes per vertex.
    pub stride: u32,
    pub attributes: &'a [VertexAttribute],
    pub topology: PrimitiveTopology,
}

impl VertexArrayDesc<'_> {
    pub fn vertex_count(&self) -> u32 {
        if self.stride == 0 {
            return 0;
        }
        (self.data.len() / self.stride as usize) as u32
    }
}

#[derive(Debug, Copy, Clone)]
pub struct ShaderProgramDesc<'a> {
    pub label: &'a str,
    /// WGSL module exposing `vs_main` and `fs_main`.
    pub source: &'a str,
    /// Preprocessor-style defines prepended by the backend.
    pub defines: &'a [&'a str],
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CullFace {
    Front,
    Back,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Premultiplied-free `src_alpha, one_minus_src_alpha`.
    Alpha,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RenderStateDesc {
    pub depth_test: bool,
    pub depth_write: bool,
    pub cull_face: Option<CullFace>,
    pub blending: Option<BlendMode>,
}

impl RenderStateDesc {
    pub fn opaque() -> Self {
        Self {
            depth_test: true,
            depth_write: true,
            cull_face: None,
            blending: None,
        }
    }

    pub fn translucent(cull_face: Option<CullFace>) -> Self {
        Self {
            depth_test: true,
            depth_write: false,
            cull_face,
            blending: Some(BlendMode::Alpha),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TextureFormat {
    Depth32Float,
    Rgba8Unorm,
}

#[derive(Debug, Copy, Clone)]
pub struct TextureDesc<'a> {
    pub label: &'a str,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

#[derive(Debug, Copy, Clone)]
pub struct PostProcessDesc<'a> {
    pub label: &'a str,
    /// WGSL fragment module exposing `fs_main`; the backend supplies the
    /// full-screen triangle and the scene color/depth bindings.
    pub source: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    ShaderCompile { label: String, message: String },
    OutOfMemory { label: String, bytes: usize },
    UnknownHandle,
    DeviceLost,
}

impl std::fmt::Display for GpuError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuError::ShaderCompile { label, message } => {
                write!(f, "shader '{label}' failed to compile: {message}")
            }
            GpuError::OutOfMemory { label, bytes } => {
                write!(f, "allocation for '{label}' failed: {bytes} bytes")
            }
            GpuError::UnknownHandle => write!(f, "unknown or already released gpu handle"),
            GpuError::DeviceLost => write!(f, "gpu device lost"),
        }
    }
}

impl std::error::Error for GpuError {}

/// Resource factory provided by the host renderer.
///
/// Passed explicitly into every component that allocates; nothing in this
/// workspace reaches for a global device.
pub trait RenderContext {
    fn create_vertex_array(&mut self, desc: &VertexArrayDesc<'_>)
    -> Result<VertexArrayId, GpuError>;
    fn destroy_vertex_array(&mut self, id: VertexArrayId) -> Result<(), GpuError>;

    fn create_shader_program(
        &mut self,
        desc: &ShaderProgramDesc<'_>,
    ) -> Result<ShaderProgramId, GpuError>;
    fn destroy_shader_program(&mut self, id: ShaderProgramId) -> Result<(), GpuError>;

    fn create_render_state(&mut self, desc: &RenderStateDesc) -> Result<RenderStateId, GpuError>;
    fn destroy_render_state(&mut self, id: RenderStateId) -> Result<(), GpuError>;

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureId, GpuError>;
    fn destroy_texture(&mut self, id: TextureId) -> Result<(), GpuError>;

    fn create_post_process_stage(
        &mut self,
        desc: &PostProcessDesc<'_>,
    ) -> Result<PostProcessId, GpuError>;
    fn destroy_post_process_stage(&mut self, id: PostProcessId) -> Result<(), GpuError>;
}

#[cfg(test)]
mod tests {
    use super::{GpuError, PrimitiveTopology, RenderStateDesc, VertexArrayDesc};

    #[test]
    fn vertex_count_uses_stride() {
        let data = [0u8; 48];
        let desc = VertexArrayDesc {
            label: "t",
            data: &data,
            stride: 12,
            attributes: &[],
            topology: PrimitiveTopology::Lines,
        };
        assert_eq!(desc.vertex_count(), 4);
    }

    #[test]
    fn translucent_state_disables_depth_write() {
        let s = RenderStateDesc::translucent(None);
        assert!(s.depth_test);
        assert!(!s.depth_write);
        assert!(s.blending.is_some());
        assert!(RenderStateDesc::opaque().depth_write);
    }

    #[test]
    fn errors_render_label() {
        let e = GpuError::ShaderCompile {
            label: "sensor".into(),
            message: "bad token".into(),
        };
        assert_eq!(e.to_string(), "shader 'sensor' failed to compile: bad token");
    }
}
