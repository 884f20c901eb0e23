//! Shader Programs
//!
//! Programs are identified by name and by their stage list (source + stage
//! kind). The backend compiles and links them and reports the uniforms and
//! attributes the program declares; those declarations drive uniform type
//! checks and the unsatisfied-uniform computation.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::errors::{Result, StrataError};
use crate::renderer::backend::{
    GpuProgramId, GpuResource, GraphicsBackend, ProgramDescriptor, ShaderUniform,
};
use crate::resources::types::ShaderStageKind;

/// One source file of a program and the stage it feeds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderStage {
    pub source: String,
    pub kind: ShaderStageKind,
}

impl ShaderStage {
    pub fn new(source: impl Into<String>, kind: ShaderStageKind) -> Self {
        Self {
            source: source.into(),
            kind,
        }
    }

    pub fn vertex(source: impl Into<String>) -> Self {
        Self::new(source, ShaderStageKind::Vertex)
    }

    pub fn fragment(source: impl Into<String>) -> Self {
        Self::new(source, ShaderStageKind::Fragment)
    }
}

impl<S: Into<String>> From<(S, ShaderStageKind)> for ShaderStage {
    fn from((source, kind): (S, ShaderStageKind)) -> Self {
        Self::new(source, kind)
    }
}

/// A linked program with its reflection data.
pub struct ShaderProgram {
    name: String,
    stages: SmallVec<[ShaderStage; 2]>,
    gpu: GpuProgramId,
    uniforms: Vec<ShaderUniform>,
    attributes: Vec<String>,
    release: flume::Sender<GpuResource>,
}

impl fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("name", &self.name)
            .field("gpu", &self.gpu)
            .field("uniforms", &self.uniforms)
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        let _ = self.release.send(GpuResource::Program(self.gpu));
    }
}

impl ShaderProgram {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn stages(&self) -> &[ShaderStage] {
        &self.stages
    }

    #[must_use]
    pub fn gpu_id(&self) -> GpuProgramId {
        self.gpu
    }

    /// Uniforms declared by the program, in reflection order.
    #[must_use]
    pub fn uniforms(&self) -> &[ShaderUniform] {
        &self.uniforms
    }

    #[must_use]
    pub fn uniform(&self, name: &str) -> Option<&ShaderUniform> {
        self.uniforms.iter().find(|u| u.name == name)
    }

    /// Vertex attributes consumed by the program.
    #[must_use]
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a == name)
    }
}

/// Persistent shader programs, keyed by name.
#[derive(Debug, Default)]
pub struct ShaderProgramRegistry {
    programs: FxHashMap<String, Arc<ShaderProgram>>,
}

impl ShaderProgramRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles and registers a persistent program.
    ///
    /// - Unsupported stage kinds fail before anything is compiled.
    /// - A program with the same name and the same stages fails with
    ///   [`StrataError::DuplicateShader`].
    /// - A program with the same name but different stages fails with
    ///   [`StrataError::ShaderSignatureMismatch`].
    pub fn add_persistent(
        &mut self,
        name: &str,
        stages: &[ShaderStage],
        search_dirs: &[PathBuf],
        backend: &mut dyn GraphicsBackend,
        release: flume::Sender<GpuResource>,
    ) -> Result<Arc<ShaderProgram>> {
        if let Some(stage) = stages.iter().find(|s| !s.kind.is_supported()) {
            return Err(StrataError::UnsupportedShaderStage(format!(
                "{:?} ({})",
                stage.kind, stage.source
            )));
        }

        if let Some(existing) = self.programs.get(name) {
            if existing.stages.as_slice() == stages {
                return Err(StrataError::DuplicateShader(name.to_string()));
            }
            return Err(StrataError::ShaderSignatureMismatch(name.to_string()));
        }

        let compiled = backend.compile_program(&ProgramDescriptor {
            name,
            stages,
            search_dirs,
        })?;

        let program = Arc::new(ShaderProgram {
            name: name.to_string(),
            stages: stages.iter().cloned().collect(),
            gpu: compiled.id,
            uniforms: compiled.uniforms,
            attributes: compiled.attributes,
            release,
        });
        self.programs.insert(name.to_string(), Arc::clone(&program));
        Ok(program)
    }

    pub fn get(&self, name: &str) -> Result<Arc<ShaderProgram>> {
        self.programs
            .get(name)
            .cloned()
            .ok_or_else(|| StrataError::ShaderNotFound(name.to_string()))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.programs.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    pub fn clear(&mut self) {
        self.programs.clear();
    }
}
