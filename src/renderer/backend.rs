//! Graphics Backend Abstraction
//!
//! The renderer never talks to a graphics API directly. Everything that
//! touches the GPU goes through [`GraphicsBackend`], and presentation goes
//! through [`RenderSurface`]:
//!
//! - **`GraphicsBackend`**: buffer upload/deletion, shader compile/link with
//!   uniform/attribute reflection, framebuffer status, clears, state
//!   application and draw calls. Owned by the render context and only ever
//!   called from the thread that drives frames.
//! - **`RenderSurface`**: `make_current` / `swap_buffers` on the native
//!   context. Shared between the façade and the render thread.
//!
//! [`crate::renderer::headless`] provides a recording implementation of both.

use std::path::PathBuf;

use crate::errors::Result;
use crate::resources::gpu_state::GpuState;
use crate::resources::shader::ShaderStage;
use crate::resources::types::{DataType, IndexType, PrimitiveType};
use crate::resources::uniforms::{UniformType, UniformValue};

/// Backend handle of a vertex or index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpuBufferId(pub u32);

/// Backend handle of a linked shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpuProgramId(pub u32);

/// A GPU resource awaiting deletion on the render thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuResource {
    Buffer(GpuBufferId),
    Program(GpuProgramId),
}

/// Buffer binding target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
}

/// Optional features of the target GPU profile.
///
/// Missing features are substituted with safe defaults by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendCapabilities {
    pub adjacency_primitives: bool,
    pub half_float_attributes: bool,
    pub double_attributes: bool,
}

impl Default for BackendCapabilities {
    /// OpenGL ES 2.0 class profile.
    fn default() -> Self {
        Self {
            adjacency_primitives: false,
            half_float_attributes: false,
            double_attributes: false,
        }
    }
}

/// A uniform declared by a linked program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderUniform {
    pub name: String,
    pub ty: UniformType,
    pub location: i32,
}

/// Everything the backend needs to build a program.
#[derive(Debug, Clone, Copy)]
pub struct ProgramDescriptor<'a> {
    pub name: &'a str,
    pub stages: &'a [ShaderStage],
    pub search_dirs: &'a [PathBuf],
}

/// Result of a successful compile/link, including reflection data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledProgram {
    pub id: GpuProgramId,
    pub uniforms: Vec<ShaderUniform>,
    pub attributes: Vec<String>,
}

/// Vertex attribute pointer setup for one draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeBinding<'a> {
    pub name: &'a str,
    pub components: usize,
    pub data_type: DataType,
    pub normalize: bool,
    pub stride: usize,
    pub offset: usize,
}

/// GPU command surface used by the render context.
pub trait GraphicsBackend: Send {
    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities::default()
    }

    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> Result<GpuBufferId>;

    fn delete_buffer(&mut self, id: GpuBufferId);

    /// Loads, compiles and links the program described by `desc`.
    ///
    /// Source lookup (using `desc.search_dirs`) is the backend's concern.
    fn compile_program(&mut self, desc: &ProgramDescriptor<'_>) -> Result<CompiledProgram>;

    fn delete_program(&mut self, id: GpuProgramId);

    /// Returns `false` when the bound framebuffer cannot be rendered to.
    fn framebuffer_complete(&mut self) -> bool;

    fn clear(&mut self, color: [f32; 4], depth: f32);

    fn apply_gpu_state(&mut self, state: &GpuState);

    fn use_program(&mut self, id: GpuProgramId);

    fn set_uniform(&mut self, location: i32, value: &UniformValue);

    fn bind_buffer(&mut self, kind: BufferKind, id: GpuBufferId);

    fn enable_attribute(&mut self, program: GpuProgramId, binding: &AttributeBinding<'_>);

    fn disable_attribute(&mut self, program: GpuProgramId, name: &str);

    fn draw_elements(&mut self, primitive: PrimitiveType, count: usize, index_type: IndexType);
}

/// The native context that frames are presented through.
pub trait RenderSurface: Send + Sync {
    /// Binds the context to the calling thread.
    fn make_current(&self) -> Result<()>;

    fn swap_buffers(&self);
}
