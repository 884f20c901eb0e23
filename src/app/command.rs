//! Render Commands
//!
//! Every mutation the client thread can request is a [`Command`] variant that
//! owns its payload (names, buffer bytes, values, boxed hooks). Commands are
//! moved into the queue and executed on the thread that owns the
//! [`RenderContext`], either when the queue is drained or immediately in
//! synchronous mode. Both paths run the same [`Command::apply`].

use std::fmt;

use crate::errors::Result;
use crate::renderer::context::RenderContext;
use crate::renderer::hooks::{
    ObjectRenderHook, ObjectUniformHook, PassHook, UnsatisfiedUniformCallback,
};
use crate::resources::gpu_state::GpuState;
use crate::resources::shader::ShaderStage;
use crate::resources::types::{DataType, IndexType};
use crate::resources::uniforms::UniformValue;
use crate::scene::pass::ObjectPassDescriptor;

/// A deferred mutation of render-thread state.
pub enum Command {
    // Objects
    AddObject(String),
    RemoveObject(String),
    RemoveAllObjects,

    // Buffers & shaders
    AddShaderAttribute {
        name: String,
        components: usize,
        normalize: bool,
        size: usize,
        data_type: DataType,
    },
    AddVbo {
        name: String,
        data: Vec<u8>,
        attributes: Vec<String>,
    },
    RemoveVbo(String),
    AddIbo {
        name: String,
        data: Vec<u8>,
        index_type: IndexType,
    },
    RemoveIbo(String),
    AddPersistentShader {
        name: String,
        stages: Vec<ShaderStage>,
    },

    // Registry passes
    AddPassToFront(String),
    AddPassToBack(String),
    RemovePass(String),

    // Object passes
    AddPassToObject(ObjectPassDescriptor),
    RemovePassFromObject {
        object: String,
        pass: String,
    },
    AddObjectPassGpuState {
        object: String,
        pass: String,
        state: GpuState,
    },

    // Uniforms
    AddObjectPassUniform {
        object: String,
        pass: String,
        uniform: String,
        value: UniformValue,
    },
    RemoveObjectPassUniform {
        object: String,
        pass: String,
        uniform: String,
    },
    AddObjectGlobalUniform {
        object: String,
        uniform: String,
        value: UniformValue,
    },
    RemoveObjectGlobalUniform {
        object: String,
        uniform: String,
    },
    AddGlobalUniform {
        uniform: String,
        value: UniformValue,
    },
    RemoveGlobalUniform(String),

    // Metadata
    AddObjectGlobalMetadata {
        object: String,
        name: String,
        value: UniformValue,
    },
    AddObjectPassMetadata {
        object: String,
        pass: String,
        name: String,
        value: UniformValue,
    },

    // Hooks
    AddBeginAllPassesHook(PassHook),
    AddEndAllPassesHook(PassHook),
    AddPrePassHook {
        pass: String,
        hook: PassHook,
    },
    AddPostPassHook {
        pass: String,
        hook: PassHook,
    },
    AddObjectRenderHook {
        object: String,
        pass: String,
        hook: ObjectRenderHook,
    },
    AddObjectUniformHook {
        object: String,
        pass: String,
        hook: ObjectUniformHook,
    },
    SetUnsatisfiedUniformCallback(Option<UnsatisfiedUniformCallback>),

    /// Signals the sender once every command queued before it has run.
    Barrier(flume::Sender<()>),
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Command").field(&self.label()).finish()
    }
}

impl Command {
    /// Short name used in logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::AddObject(_) => "add_object",
            Self::RemoveObject(_) => "remove_object",
            Self::RemoveAllObjects => "remove_all_objects",
            Self::AddShaderAttribute { .. } => "add_shader_attribute",
            Self::AddVbo { .. } => "add_vbo",
            Self::RemoveVbo(_) => "remove_vbo",
            Self::AddIbo { .. } => "add_ibo",
            Self::RemoveIbo(_) => "remove_ibo",
            Self::AddPersistentShader { .. } => "add_persistent_shader",
            Self::AddPassToFront(_) => "add_pass_to_front",
            Self::AddPassToBack(_) => "add_pass_to_back",
            Self::RemovePass(_) => "remove_pass",
            Self::AddPassToObject(_) => "add_pass_to_object",
            Self::RemovePassFromObject { .. } => "remove_pass_from_object",
            Self::AddObjectPassGpuState { .. } => "add_object_pass_gpu_state",
            Self::AddObjectPassUniform { .. } => "add_object_pass_uniform",
            Self::RemoveObjectPassUniform { .. } => "remove_object_pass_uniform",
            Self::AddObjectGlobalUniform { .. } => "add_object_global_uniform",
            Self::RemoveObjectGlobalUniform { .. } => "remove_object_global_uniform",
            Self::AddGlobalUniform { .. } => "add_global_uniform",
            Self::RemoveGlobalUniform(_) => "remove_global_uniform",
            Self::AddObjectGlobalMetadata { .. } => "add_object_global_metadata",
            Self::AddObjectPassMetadata { .. } => "add_object_pass_metadata",
            Self::AddBeginAllPassesHook(_) => "add_begin_all_passes_hook",
            Self::AddEndAllPassesHook(_) => "add_end_all_passes_hook",
            Self::AddPrePassHook { .. } => "add_pre_pass_hook",
            Self::AddPostPassHook { .. } => "add_post_pass_hook",
            Self::AddObjectRenderHook { .. } => "add_object_render_hook",
            Self::AddObjectUniformHook { .. } => "add_object_uniform_hook",
            Self::SetUnsatisfiedUniformCallback(_) => "set_unsatisfied_uniform_callback",
            Self::Barrier(_) => "barrier",
        }
    }

    /// Executes the command against the render context.
    pub fn apply(self, ctx: &mut RenderContext) -> Result<()> {
        match self {
            Self::AddObject(name) => ctx.add_object(&name),
            Self::RemoveObject(name) => ctx.remove_object(&name),
            Self::RemoveAllObjects => {
                ctx.remove_all_objects();
                Ok(())
            }
            Self::AddShaderAttribute {
                name,
                components,
                normalize,
                size,
                data_type,
            } => {
                ctx.add_shader_attribute(&name, components, normalize, size, data_type);
                Ok(())
            }
            Self::AddVbo {
                name,
                data,
                attributes,
            } => ctx.add_vbo(&name, &data, &attributes),
            Self::RemoveVbo(name) => ctx.remove_vbo(&name),
            Self::AddIbo {
                name,
                data,
                index_type,
            } => ctx.add_ibo(&name, &data, index_type),
            Self::RemoveIbo(name) => ctx.remove_ibo(&name),
            Self::AddPersistentShader { name, stages } => {
                ctx.add_persistent_shader(&name, &stages)
            }
            Self::AddPassToFront(name) => ctx.add_pass_to_front(&name),
            Self::AddPassToBack(name) => ctx.add_pass_to_back(&name),
            Self::RemovePass(name) => ctx.remove_pass(&name),
            Self::AddPassToObject(desc) => ctx.add_pass_to_object(&desc),
            Self::RemovePassFromObject { object, pass } => {
                ctx.remove_pass_from_object(&object, &pass)
            }
            Self::AddObjectPassGpuState {
                object,
                pass,
                state,
            } => ctx.add_object_pass_gpu_state(&object, &pass, state),
            Self::AddObjectPassUniform {
                object,
                pass,
                uniform,
                value,
            } => ctx.add_object_pass_uniform(&object, &pass, &uniform, value),
            Self::RemoveObjectPassUniform {
                object,
                pass,
                uniform,
            } => ctx.remove_object_pass_uniform(&object, &pass, &uniform),
            Self::AddObjectGlobalUniform {
                object,
                uniform,
                value,
            } => ctx.add_object_global_uniform(&object, &uniform, value),
            Self::RemoveObjectGlobalUniform { object, uniform } => {
                ctx.remove_object_global_uniform(&object, &uniform)
            }
            Self::AddGlobalUniform { uniform, value } => ctx.add_global_uniform(&uniform, value),
            Self::RemoveGlobalUniform(uniform) => ctx.remove_global_uniform(&uniform),
            Self::AddObjectGlobalMetadata {
                object,
                name,
                value,
            } => ctx.add_object_global_metadata(&object, &name, value),
            Self::AddObjectPassMetadata {
                object,
                pass,
                name,
                value,
            } => ctx.add_object_pass_metadata(&object, &pass, &name, value),
            Self::AddBeginAllPassesHook(hook) => {
                ctx.add_begin_all_passes_hook(hook);
                Ok(())
            }
            Self::AddEndAllPassesHook(hook) => {
                ctx.add_end_all_passes_hook(hook);
                Ok(())
            }
            Self::AddPrePassHook { pass, hook } => ctx.add_pre_pass_hook(&pass, hook),
            Self::AddPostPassHook { pass, hook } => ctx.add_post_pass_hook(&pass, hook),
            Self::AddObjectRenderHook { object, pass, hook } => {
                ctx.add_object_render_hook(&object, &pass, hook)
            }
            Self::AddObjectUniformHook { object, pass, hook } => {
                ctx.add_object_uniform_hook(&object, &pass, hook)
            }
            Self::SetUnsatisfiedUniformCallback(callback) => {
                ctx.set_unsatisfied_uniform_callback(callback);
                Ok(())
            }
            Self::Barrier(done) => {
                // The waiter may have given up; nothing to report then.
                let _ = done.send(());
                Ok(())
            }
        }
    }
}
