//! Scene State
//!
//! The Object → Pass → Uniform hierarchy that the render thread consumes:
//! - [`RenderObject`]: named renderable with object-global uniforms
//! - [`ObjectPass`]: program + VBO + IBO + topology with pass-specific uniforms
//! - [`ObjectManager`]: name-keyed object table
//! - [`GlobalUniforms`]: system-global uniform tier

pub mod manager;
pub mod object;
pub mod pass;

pub use manager::{GlobalUniforms, ObjectManager};
pub use object::RenderObject;
pub use pass::{ObjectPass, ObjectPassDescriptor};
