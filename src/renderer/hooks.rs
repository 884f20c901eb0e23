//! Rendering Hooks
//!
//! User callbacks that run inside frame rendering, on the render thread.
//!
//! | Hook | Registered on | Runs |
//! |------|---------------|------|
//! | [`PassHook`] (begin/end all) | pass registry | around the whole pass sequence |
//! | [`PassHook`] (pre/post) | one registry pass | around that pass |
//! | [`ObjectUniformHook`] | one object pass | when that pass has unsatisfied uniforms |
//! | [`ObjectRenderHook`] | one object pass | instead of the built-in draw |
//!
//! All hook lists use push-back semantics: the first hook registered is the
//! first one called.

use crate::errors::{Result, StrataError};
use crate::renderer::backend::GraphicsBackend;
use crate::resources::buffer::{IndexBuffer, VertexBuffer};
use crate::resources::shader::ShaderProgram;
use crate::resources::uniforms::{UniformBindings, UniformType, UniformValue};

/// Hook around all passes or around a single pass.
pub type PassHook = Box<dyn FnMut(&mut PassHookContext<'_>) + Send>;

/// Replaces the built-in draw of one object pass.
pub type ObjectRenderHook = Box<dyn FnMut(&mut ObjectHookContext<'_>) + Send>;

/// Gets a chance to satisfy uniforms of one object pass before the
/// frame-level callback runs.
pub type ObjectUniformHook =
    Box<dyn FnMut(&mut ObjectHookContext<'_>, &mut UnsatisfiedUniforms) + Send>;

/// Frame-level unsatisfied-uniform callback.
pub type UnsatisfiedUniformCallback = Box<dyn FnMut(&mut UnsatisfiedUniforms) + Send>;

/// What a [`PassHook`] can see.
pub struct PassHookContext<'a> {
    /// `None` for the begin/end-all-passes hooks.
    pub pass: Option<&'a str>,
    pub backend: &'a mut dyn GraphicsBackend,
    pub globals: &'a UniformBindings,
}

/// What an object hook can see.
pub struct ObjectHookContext<'a> {
    pub object: &'a str,
    pub pass: &'a str,
    pub program: &'a ShaderProgram,
    pub vbo: &'a VertexBuffer,
    pub ibo: &'a IndexBuffer,
    pub object_metadata: &'a UniformBindings,
    pub pass_metadata: &'a UniformBindings,
    pub globals: &'a UniformBindings,
    pub backend: &'a mut dyn GraphicsBackend,
}

/// A shader-declared uniform with no value at any precedence tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsatisfiedUniform {
    pub name: String,
    pub ty: UniformType,
    pub location: i32,
}

/// The unsatisfied uniforms of one object pass for one draw.
///
/// Hooks and callbacks shrink the pending list either by supplying a value
/// ([`supply`](Self::supply)) or by dismissing an entry they handled
/// themselves ([`dismiss`](Self::dismiss)). Anything left pending when all
/// of them have run causes the draw to be skipped.
#[derive(Debug, Clone)]
pub struct UnsatisfiedUniforms {
    object: String,
    pass: String,
    pending: Vec<UnsatisfiedUniform>,
    supplied: Vec<(UnsatisfiedUniform, UniformValue)>,
}

impl UnsatisfiedUniforms {
    #[must_use]
    pub fn new(object: &str, pass: &str, pending: Vec<UnsatisfiedUniform>) -> Self {
        Self {
            object: object.to_string(),
            pass: pass.to_string(),
            pending,
            supplied: Vec::new(),
        }
    }

    #[must_use]
    pub fn object(&self) -> &str {
        &self.object
    }

    #[must_use]
    pub fn pass(&self) -> &str {
        &self.pass
    }

    #[must_use]
    pub fn pending(&self) -> &[UnsatisfiedUniform] {
        &self.pending
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.pending.iter().any(|u| u.name == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Provides a value for a pending uniform, used for this draw only.
    pub fn supply(&mut self, name: &str, value: impl Into<UniformValue>) -> Result<()> {
        let value = value.into();
        let index = self
            .pending
            .iter()
            .position(|u| u.name == name)
            .ok_or_else(|| StrataError::UniformNotFound {
                uniform: name.to_string(),
                scope: format!("unsatisfied uniforms of '{}'/'{}'", self.object, self.pass),
            })?;

        let expected = self.pending[index].ty;
        if value.uniform_type() != expected {
            return Err(StrataError::UniformTypeMismatch {
                uniform: name.to_string(),
                expected,
                actual: value.uniform_type(),
            });
        }

        let uniform = self.pending.remove(index);
        self.supplied.push((uniform, value));
        Ok(())
    }

    /// Removes a pending entry without a value. Returns `false` if it was not
    /// pending.
    pub fn dismiss(&mut self, name: &str) -> bool {
        let before = self.pending.len();
        self.pending.retain(|u| u.name != name);
        before != self.pending.len()
    }

    pub fn retain(&mut self, f: impl FnMut(&UnsatisfiedUniform) -> bool) {
        self.pending.retain(f);
    }

    pub(crate) fn into_supplied(self) -> Vec<(UnsatisfiedUniform, UniformValue)> {
        self.supplied
    }
}
