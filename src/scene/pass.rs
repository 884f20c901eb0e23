use std::fmt;
use std::sync::Arc;

use crate::errors::{Result, StrataError};
use crate::renderer::hooks::{ObjectRenderHook, ObjectUniformHook, UnsatisfiedUniform};
use crate::renderer::pass_registry::DEFAULT_PASS;
use crate::resources::buffer::{IndexBuffer, VertexBuffer};
use crate::resources::gpu_state::GpuState;
use crate::resources::shader::ShaderProgram;
use crate::resources::types::PrimitiveType;
use crate::resources::uniforms::{UniformBindings, UniformValue};

/// Names everything needed to attach a pass to an object.
///
/// ```rust,ignore
/// // Renders in the default pass
/// let desc = ObjectPassDescriptor::new("obj1", "UniformColor", "vbo1", "ibo1", PrimitiveType::TriangleStrip);
///
/// // Sub-pass "outline", rendered when registry pass "pass1" renders
/// let desc = ObjectPassDescriptor::new("obj1", "Outline", "vbo1", "ibo1", PrimitiveType::Lines)
///     .in_pass("outline")
///     .with_parent("pass1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPassDescriptor {
    pub object: String,
    pub pass: String,
    pub program: String,
    pub vbo: String,
    pub ibo: String,
    pub primitive: PrimitiveType,
    pub parent: Option<String>,
}

impl ObjectPassDescriptor {
    pub fn new(
        object: impl Into<String>,
        program: impl Into<String>,
        vbo: impl Into<String>,
        ibo: impl Into<String>,
        primitive: PrimitiveType,
    ) -> Self {
        Self {
            object: object.into(),
            pass: DEFAULT_PASS.to_string(),
            program: program.into(),
            vbo: vbo.into(),
            ibo: ibo.into(),
            primitive,
            parent: None,
        }
    }

    #[must_use]
    pub fn in_pass(mut self, pass: impl Into<String>) -> Self {
        self.pass = pass.into();
        self
    }

    /// Nests the pass under an existing registry pass.
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Registry pass the object renders under.
    #[must_use]
    pub fn responsible_pass(&self) -> &str {
        self.parent.as_deref().unwrap_or(&self.pass)
    }
}

/// One rendering step of an object: program + VBO + IBO + topology, plus the
/// pass-specific uniform tier.
///
/// The pass keeps its buffers and program alive for as long as it exists,
/// even if their names are removed from the resource tables.
pub struct ObjectPass {
    name: String,
    parent: Option<String>,
    program: Arc<ShaderProgram>,
    vbo: Arc<VertexBuffer>,
    ibo: Arc<IndexBuffer>,
    primitive: PrimitiveType,
    uniforms: UniformBindings,
    metadata: UniformBindings,
    gpu_state: Option<GpuState>,
    pub(crate) render_hooks: Vec<ObjectRenderHook>,
    pub(crate) uniform_hooks: Vec<ObjectUniformHook>,
}

impl fmt::Debug for ObjectPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPass")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("program", &self.program.name())
            .field("vbo", &self.vbo.name())
            .field("ibo", &self.ibo.name())
            .field("primitive", &self.primitive)
            .field("uniforms", &self.uniforms)
            .field("render_hooks", &self.render_hooks.len())
            .field("uniform_hooks", &self.uniform_hooks.len())
            .finish_non_exhaustive()
    }
}

impl ObjectPass {
    #[must_use]
    pub fn new(
        name: &str,
        parent: Option<&str>,
        program: Arc<ShaderProgram>,
        vbo: Arc<VertexBuffer>,
        ibo: Arc<IndexBuffer>,
        primitive: PrimitiveType,
    ) -> Self {
        Self {
            name: name.to_string(),
            parent: parent.map(str::to_string),
            program,
            vbo,
            ibo,
            primitive,
            uniforms: UniformBindings::new(),
            metadata: UniformBindings::new(),
            gpu_state: None,
            render_hooks: Vec::new(),
            uniform_hooks: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registry pass this sub-pass is nested under.
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Registry pass responsible for rendering this pass.
    #[must_use]
    pub fn responsible_pass(&self) -> &str {
        self.parent.as_deref().unwrap_or(&self.name)
    }

    #[must_use]
    pub fn program(&self) -> &Arc<ShaderProgram> {
        &self.program
    }

    #[must_use]
    pub fn vbo(&self) -> &Arc<VertexBuffer> {
        &self.vbo
    }

    #[must_use]
    pub fn ibo(&self) -> &Arc<IndexBuffer> {
        &self.ibo
    }

    #[must_use]
    pub fn primitive(&self) -> PrimitiveType {
        self.primitive
    }

    #[must_use]
    pub fn gpu_state(&self) -> Option<&GpuState> {
        self.gpu_state.as_ref()
    }

    pub fn set_gpu_state(&mut self, state: GpuState) {
        self.gpu_state = Some(state);
    }

    #[must_use]
    pub fn metadata(&self) -> &UniformBindings {
        &self.metadata
    }

    #[must_use]
    pub fn has_hooks(&self) -> bool {
        !self.render_hooks.is_empty() || !self.uniform_hooks.is_empty()
    }

    pub fn set_metadata(&mut self, name: &str, value: UniformValue) {
        // Metadata is never bound to a shader; last write wins.
        self.metadata.replace(name, value);
    }

    #[must_use]
    pub fn uniforms(&self) -> &UniformBindings {
        &self.uniforms
    }

    /// Binds a pass-specific uniform.
    ///
    /// The program must declare `name`, and the value must have the declared
    /// type. On failure the previous value is retained.
    pub fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<()> {
        let declared = self
            .program
            .uniform(name)
            .ok_or_else(|| StrataError::UniformNotFound {
                uniform: name.to_string(),
                scope: format!("program '{}'", self.program.name()),
            })?;

        if declared.ty != value.uniform_type() {
            return Err(StrataError::UniformTypeMismatch {
                uniform: name.to_string(),
                expected: declared.ty,
                actual: value.uniform_type(),
            });
        }

        self.uniforms
            .set(name, value)
            .map_err(|expected| StrataError::UniformTypeMismatch {
                uniform: name.to_string(),
                expected,
                actual: value.uniform_type(),
            })
    }

    pub fn remove_uniform(&mut self, name: &str) -> Result<UniformValue> {
        self.uniforms
            .remove(name)
            .ok_or_else(|| StrataError::UniformNotFound {
                uniform: name.to_string(),
                scope: format!("pass '{}'", self.name),
            })
    }

    #[must_use]
    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.uniforms.get(name)
    }

    /// True only for values bound directly on this pass.
    #[must_use]
    pub fn has_pass_specific_uniform(&self, name: &str) -> bool {
        self.uniforms.contains(name)
    }

    /// Resolves `name` through pass-specific, object-global, then
    /// system-global bindings.
    #[must_use]
    pub fn resolve<'a>(
        &'a self,
        name: &str,
        object_globals: &'a UniformBindings,
        globals: &'a UniformBindings,
    ) -> Option<&'a UniformValue> {
        self.uniforms
            .get(name)
            .or_else(|| object_globals.get(name))
            .or_else(|| globals.get(name))
    }

    /// Declared uniforms with no value at any tier.
    #[must_use]
    pub fn unsatisfied_uniforms(
        &self,
        object_globals: &UniformBindings,
        globals: &UniformBindings,
    ) -> Vec<UnsatisfiedUniform> {
        self.program
            .uniforms()
            .iter()
            .filter(|u| self.resolve(&u.name, object_globals, globals).is_none())
            .map(|u| UnsatisfiedUniform {
                name: u.name.clone(),
                ty: u.ty,
                location: u.location,
            })
            .collect()
    }
}
