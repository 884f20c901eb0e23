//! Render Resources
//!
//! Data that passes reference while drawing, independent of how it is
//! uploaded:
//! - Buffers: named VBO/IBO handles with deferred GPU release
//! - Attributes: vertex attribute registry and interleaved layouts
//! - Shader: persistent shader programs and their reflection data
//! - Uniforms: tagged uniform values and ordered bindings
//! - GPU state: fixed-function state forwarded to the backend
//! - Types: primitive, index, data and shader-stage enumerations

pub mod attributes;
pub mod buffer;
pub mod gpu_state;
pub mod shader;
pub mod types;
pub mod uniforms;

pub use attributes::{AttributeLayout, AttributeRegistry, AttributeState};
pub use buffer::{IndexBuffer, ReleaseQueue, ResourceTable, VertexBuffer};
pub use gpu_state::GpuState;
pub use shader::{ShaderProgram, ShaderProgramRegistry, ShaderStage};
pub use types::{DataType, IndexType, PrimitiveType, ShaderStageKind};
pub use uniforms::{UniformBindings, UniformType, UniformValue};
