use crate::errors::{Result, StrataError};
use crate::renderer::hooks::UnsatisfiedUniform;
use crate::resources::uniforms::{UniformBindings, UniformValue};
use crate::scene::pass::ObjectPass;

/// A named renderable: an ordered set of passes plus the object-global
/// uniform tier.
///
/// # Uniform precedence
///
/// Pass-specific bindings override object-global bindings, which override
/// system-global bindings. Object-global bindings apply to every pass whose
/// program declares the name, including passes added after the binding.
#[derive(Debug)]
pub struct RenderObject {
    name: String,
    passes: Vec<ObjectPass>,
    globals: UniformBindings,
    metadata: UniformBindings,
}

impl RenderObject {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            passes: Vec::new(),
            globals: UniformBindings::new(),
            metadata: UniformBindings::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    // ========================================================================
    // Passes
    // ========================================================================

    /// Adds a pass. Fails if a pass with the same name exists, or if an
    /// object-global uniform conflicts with the type the new program declares.
    pub fn add_pass(&mut self, pass: ObjectPass) -> Result<()> {
        if self.has_pass(pass.name()) {
            return Err(StrataError::DuplicateObjectPass {
                object: self.name.clone(),
                pass: pass.name().to_string(),
            });
        }

        for (uniform, value) in self.globals.iter() {
            if let Some(declared) = pass.program().uniform(uniform)
                && declared.ty != value.uniform_type()
            {
                return Err(StrataError::UniformTypeMismatch {
                    uniform: uniform.to_string(),
                    expected: declared.ty,
                    actual: value.uniform_type(),
                });
            }
        }

        self.passes.push(pass);
        Ok(())
    }

    pub fn remove_pass(&mut self, pass: &str) -> Result<ObjectPass> {
        let index = self
            .passes
            .iter()
            .position(|p| p.name() == pass)
            .ok_or_else(|| self.pass_not_found(pass))?;
        Ok(self.passes.remove(index))
    }

    #[must_use]
    pub fn has_pass(&self, pass: &str) -> bool {
        self.passes.iter().any(|p| p.name() == pass)
    }

    pub fn pass(&self, pass: &str) -> Result<&ObjectPass> {
        self.passes
            .iter()
            .find(|p| p.name() == pass)
            .ok_or_else(|| self.pass_not_found(pass))
    }

    pub fn pass_mut(&mut self, pass: &str) -> Result<&mut ObjectPass> {
        let not_found = self.pass_not_found(pass);
        self.passes
            .iter_mut()
            .find(|p| p.name() == pass)
            .ok_or(not_found)
    }

    #[must_use]
    pub fn num_passes(&self) -> usize {
        self.passes.len()
    }

    pub fn passes(&self) -> impl Iterator<Item = &ObjectPass> {
        self.passes.iter()
    }

    /// True if any pass of this object renders under `registry_pass`.
    #[must_use]
    pub fn renders_under(&self, registry_pass: &str) -> bool {
        self.passes
            .iter()
            .any(|p| p.responsible_pass() == registry_pass)
    }

    /// Indices of the passes drawn when `registry_pass` renders this object:
    /// the pass of that name first, then its sub-passes in insertion order.
    #[must_use]
    pub fn render_order(&self, registry_pass: &str) -> Vec<usize> {
        let own = self
            .passes
            .iter()
            .position(|p| p.name() == registry_pass && p.parent().is_none());
        let subs = self
            .passes
            .iter()
            .enumerate()
            .filter(|(_, p)| p.parent() == Some(registry_pass))
            .map(|(i, _)| i);
        own.into_iter().chain(subs).collect()
    }

    pub(crate) fn split_pass_mut(&mut self, index: usize) -> (&mut ObjectPass, &UniformBindings, &UniformBindings) {
        (&mut self.passes[index], &self.globals, &self.metadata)
    }

    fn pass_not_found(&self, pass: &str) -> StrataError {
        StrataError::ObjectPassNotFound {
            object: self.name.clone(),
            pass: pass.to_string(),
        }
    }

    // ========================================================================
    // Uniforms
    // ========================================================================

    pub fn set_pass_uniform(&mut self, pass: &str, name: &str, value: UniformValue) -> Result<()> {
        self.pass_mut(pass)?.set_uniform(name, value)
    }

    pub fn remove_pass_uniform(&mut self, pass: &str, name: &str) -> Result<UniformValue> {
        self.pass_mut(pass)?.remove_uniform(name)
    }

    #[must_use]
    pub fn pass_uniform(&self, pass: &str, name: &str) -> Option<&UniformValue> {
        self.pass(pass).ok()?.uniform(name)
    }

    /// Binds an object-global uniform.
    ///
    /// The type is fixed by the first binding, and must also match every
    /// existing pass whose program declares the name.
    pub fn set_global_uniform(&mut self, name: &str, value: UniformValue) -> Result<()> {
        for pass in &self.passes {
            if let Some(declared) = pass.program().uniform(name)
                && declared.ty != value.uniform_type()
            {
                return Err(StrataError::UniformTypeMismatch {
                    uniform: name.to_string(),
                    expected: declared.ty,
                    actual: value.uniform_type(),
                });
            }
        }

        self.globals
            .set(name, value)
            .map_err(|expected| StrataError::UniformTypeMismatch {
                uniform: name.to_string(),
                expected,
                actual: value.uniform_type(),
            })
    }

    pub fn remove_global_uniform(&mut self, name: &str) -> Result<UniformValue> {
        self.globals
            .remove(name)
            .ok_or_else(|| StrataError::UniformNotFound {
                uniform: name.to_string(),
                scope: format!("object '{}'", self.name),
            })
    }

    #[must_use]
    pub fn global_uniform(&self, name: &str) -> Option<&UniformValue> {
        self.globals.get(name)
    }

    #[must_use]
    pub fn has_global_uniform(&self, name: &str) -> bool {
        self.globals.contains(name)
    }

    #[must_use]
    pub fn global_uniforms(&self) -> &UniformBindings {
        &self.globals
    }

    /// True only for values bound directly on the pass.
    pub fn has_pass_specific_uniform(&self, pass: &str, name: &str) -> Result<bool> {
        Ok(self.pass(pass)?.has_pass_specific_uniform(name))
    }

    /// True if the pass gets a value for `name` from its own bindings or from
    /// the object-global tier.
    pub fn has_uniform(&self, pass: &str, name: &str) -> Result<bool> {
        let pass = self.pass(pass)?;
        Ok(pass.has_pass_specific_uniform(name)
            || (self.globals.contains(name) && pass.program().uniform(name).is_some()))
    }

    /// Uniforms of `pass` that no tier satisfies.
    pub fn unsatisfied_uniforms(
        &self,
        pass: &str,
        globals: &UniformBindings,
    ) -> Result<Vec<UnsatisfiedUniform>> {
        Ok(self.pass(pass)?.unsatisfied_uniforms(&self.globals, globals))
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    pub fn set_metadata(&mut self, name: &str, value: UniformValue) {
        self.metadata.replace(name, value);
    }

    pub fn set_pass_metadata(&mut self, pass: &str, name: &str, value: UniformValue) -> Result<()> {
        self.pass_mut(pass)?.set_metadata(name, value);
        Ok(())
    }

    #[must_use]
    pub fn metadata(&self) -> &UniformBindings {
        &self.metadata
    }
}
