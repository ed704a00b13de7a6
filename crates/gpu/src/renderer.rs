use std::collections::BTreeMap;

use foundation::Color;
use foundation::math::{Mat4, Vec3};
use runtime::Frame;

use crate::context::{
    PostProcessId, PrimitiveTopology, RenderStateId, ShaderProgramId, TextureId, VertexArrayId,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SceneMode {
    Scene2D,
    ColumbusView,
    Scene3D,
    Morphing,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Pass {
    Opaque,
    Translucent,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Float(f32),
    Color([f32; 4]),
    Mat4([[f32; 4]; 4]),
}

/// Named uniform values for a single draw, built by value every frame.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UniformBlock {
    values: BTreeMap<&'static str, UniformValue>,
}

impl UniformBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &'static str, value: UniformValue) -> &mut Self {
        self.values.insert(name, value);
        self
    }

    pub fn set_float(&mut self, name: &'static str, v: f64) -> &mut Self {
        self.set(name, UniformValue::Float(v as f32))
    }

    pub fn set_color(&mut self, name: &'static str, c: Color) -> &mut Self {
        self.set(name, UniformValue::Color(c.to_array()))
    }

    pub fn set_mat4(&mut self, name: &'static str, m: &Mat4) -> &mut Self {
        self.set(name, UniformValue::Mat4(m.to_cols_f32()))
    }

    pub fn set_bool(&mut self, name: &'static str, v: bool) -> &mut Self {
        self.set(name, UniformValue::Bool(v))
    }

    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, UniformValue)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f64,
}

impl BoundingSphere {
    pub fn new(center: Vec3, radius: f64) -> Self {
        Self { center, radius }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    pub label: &'static str,
    pub vertex_array: VertexArrayId,
    pub shader_program: ShaderProgramId,
    pub render_state: RenderStateId,
    pub topology: PrimitiveTopology,
    pub model_matrix: Mat4,
    pub bounding_sphere: BoundingSphere,
    pub pass: Pass,
    pub uniforms: UniformBlock,
}

/// Scene-wide list that draw commands are appended to once per frame.
#[derive(Debug, Default, Clone)]
pub struct CommandList {
    commands: Vec<DrawCommand>,
}

impl CommandList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &DrawCommand> {
        self.commands.iter()
    }

    /// Commands in the order the host executes them: opaque, then translucent.
    /// Insertion order is kept within a pass.
    pub fn sorted_by_pass(&self) -> Vec<&DrawCommand> {
        let mut out: Vec<&DrawCommand> = self.commands.iter().collect();
        out.sort_by_key(|c| c.pass);
        out
    }
}

/// Full-screen pass appended after all scene commands.
#[derive(Debug, Clone, PartialEq)]
pub struct PostProcessCommand {
    pub stage: PostProcessId,
    pub uniforms: UniformBlock,
    pub textures: Vec<(&'static str, TextureId)>,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera3D {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_rad: f64,
    pub near: f64,
    pub far: f64,
}

impl Camera3D {
    pub fn look_at(position: Vec3, target: Vec3, fov_y_rad: f64, near: f64, far: f64) -> Self {
        Self {
            position,
            target,
            up: Vec3::UNIT_Z,
            fov_y_rad,
            near,
            far,
        }
    }

    pub fn with_up(self, up: Vec3) -> Self {
        Self { up, ..self }
    }

    /// View/projection matrices and their inverses for a viewport aspect.
    pub fn matrices(&self, aspect: f64) -> Option<CameraMatrices> {
        let view = Mat4::look_to(self.position, self.target - self.position, self.up)?;
        let projection = Mat4::perspective(self.fov_y_rad, aspect, self.near, self.far);
        Some(CameraMatrices {
            inverse_view: view.inverse()?,
            inverse_projection: projection.inverse()?,
            view,
            projection,
            position: self.position,
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraMatrices {
    pub view: Mat4,
    pub projection: Mat4,
    pub inverse_view: Mat4,
    pub inverse_projection: Mat4,
    pub position: Vec3,
}

impl Default for CameraMatrices {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            inverse_view: Mat4::IDENTITY,
            inverse_projection: Mat4::IDENTITY,
            position: Vec3::ZERO,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FramePasses {
    pub render: bool,
    pub pick: bool,
}

impl Default for FramePasses {
    fn default() -> Self {
        Self {
            render: true,
            pick: false,
        }
    }
}

/// Per-frame state supplied by the host renderer.
#[derive(Debug, Clone)]
pub struct FrameState {
    pub mode: SceneMode,
    pub frame: Frame,
    pub camera: CameraMatrices,
    pub passes: FramePasses,
    pub command_list: CommandList,
    pub post_process: Vec<PostProcessCommand>,
}

impl FrameState {
    pub fn new(mode: SceneMode, frame: Frame, camera: CameraMatrices) -> Self {
        Self {
            mode,
            frame,
            camera,
            passes: FramePasses::default(),
            command_list: CommandList::new(),
            post_process: Vec::new(),
        }
    }

    /// Advance to the next frame, dropping last frame's commands.
    pub fn begin_next(&mut self) {
        self.frame = self.frame.next();
        self.command_list.clear();
        self.post_process.clear();
    }
}
