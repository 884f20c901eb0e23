//! Headless Backend
//!
//! A [`GraphicsBackend`] and [`RenderSurface`] that perform no GPU work and
//! record every call into a shared [`HeadlessLog`]. Used by the test suite
//! and by tools that drive the renderer without a window.
//!
//! Shader "compilation" is driven by reflection registered up front with
//! [`HeadlessBackend::with_shader`]: each source file name maps to the
//! uniforms and attributes it declares, and a program declares the union of
//! its stages.
//!
//! ```rust,ignore
//! let backend = HeadlessBackend::new()
//!     .with_shader("UniformColor.vsh", &[("uProjIVObject", UniformType::Mat4)], &["aPos"])
//!     .with_shader("UniformColor.fsh", &[("uColor", UniformType::Vec4)], &[]);
//! let log = backend.log();
//! ```

use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::errors::{Result, StrataError};
use crate::renderer::backend::{
    AttributeBinding, BackendCapabilities, BufferKind, CompiledProgram, GpuBufferId,
    GpuProgramId, GraphicsBackend, ProgramDescriptor, RenderSurface, ShaderUniform,
};
use crate::resources::gpu_state::GpuState;
use crate::resources::types::{DataType, IndexType, PrimitiveType};
use crate::resources::uniforms::{UniformType, UniformValue};

// ============================================================================
// Recorded data
// ============================================================================

/// A live buffer as uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedBuffer {
    pub kind: BufferKind,
    pub data: Vec<u8>,
}

/// A live program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedProgram {
    pub name: String,
    pub uniforms: Vec<ShaderUniform>,
    pub attributes: Vec<String>,
}

/// Attribute pointer state at draw time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAttribute {
    pub name: String,
    pub components: usize,
    pub data_type: DataType,
    pub normalize: bool,
    pub stride: usize,
    pub offset: usize,
}

/// Everything bound when a draw call was issued.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub program: String,
    pub vbo: Option<GpuBufferId>,
    pub ibo: Option<GpuBufferId>,
    pub primitive: PrimitiveType,
    pub count: usize,
    pub index_type: IndexType,
    /// Uniform values by name, as last set on the program.
    pub uniforms: FxHashMap<String, UniformValue>,
    pub attributes: Vec<RecordedAttribute>,
    pub gpu_state: Option<GpuState>,
}

/// Shared record of everything a [`HeadlessBackend`] was asked to do.
#[derive(Debug)]
pub struct HeadlessLog {
    pub buffers: FxHashMap<GpuBufferId, RecordedBuffer>,
    pub programs: FxHashMap<GpuProgramId, RecordedProgram>,
    pub deleted_buffers: Vec<GpuBufferId>,
    pub deleted_programs: Vec<GpuProgramId>,
    pub compiles: Vec<String>,
    pub draws: Vec<DrawCall>,
    pub clears: usize,
    pub state_applications: Vec<GpuState>,
    /// Threads that issued any backend call.
    pub gpu_threads: FxHashSet<ThreadId>,
    /// Reported by `framebuffer_complete`; tests flip it to simulate an
    /// incomplete target.
    pub framebuffer_complete: bool,
    /// When set, buffer uploads fail with a backend error.
    pub fail_uploads: bool,
}

impl Default for HeadlessLog {
    fn default() -> Self {
        Self {
            buffers: FxHashMap::default(),
            programs: FxHashMap::default(),
            deleted_buffers: Vec::new(),
            deleted_programs: Vec::new(),
            compiles: Vec::new(),
            draws: Vec::new(),
            clears: 0,
            state_applications: Vec::new(),
            gpu_threads: FxHashSet::default(),
            framebuffer_complete: true,
            fail_uploads: false,
        }
    }
}

impl HeadlessLog {
    /// Draws issued with the named program.
    pub fn draws_with(&self, program: &str) -> impl Iterator<Item = &DrawCall> {
        self.draws.iter().filter(move |d| d.program == program)
    }

    #[must_use]
    pub fn last_draw(&self) -> Option<&DrawCall> {
        self.draws.last()
    }

    #[must_use]
    pub fn live_buffer_count(&self) -> usize {
        self.buffers.len()
    }

    #[must_use]
    pub fn live_program_count(&self) -> usize {
        self.programs.len()
    }

    /// Buffer contents reinterpreted as `T`.
    #[must_use]
    pub fn buffer_as<T: bytemuck::Pod>(&self, id: GpuBufferId) -> Option<Vec<T>> {
        self.buffers
            .get(&id)
            .map(|b| bytemuck::pod_collect_to_vec(&b.data))
    }
}

// ============================================================================
// Backend
// ============================================================================

#[derive(Debug, Clone, Default)]
struct SourceReflection {
    uniforms: Vec<(String, UniformType)>,
    attributes: Vec<String>,
}

/// Recording backend with configurable shader reflection.
#[derive(Debug)]
pub struct HeadlessBackend {
    log: Arc<Mutex<HeadlessLog>>,
    sources: FxHashMap<String, SourceReflection>,
    capabilities: BackendCapabilities,
    next_id: u32,

    current_program: Option<GpuProgramId>,
    bound_vertex: Option<GpuBufferId>,
    bound_index: Option<GpuBufferId>,
    current_state: Option<GpuState>,
    uniform_values: FxHashMap<GpuProgramId, FxHashMap<i32, UniformValue>>,
    enabled_attributes: Vec<RecordedAttribute>,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(HeadlessLog::default())),
            sources: FxHashMap::default(),
            capabilities: BackendCapabilities::default(),
            next_id: 1,
            current_program: None,
            bound_vertex: None,
            bound_index: None,
            current_state: None,
            uniform_values: FxHashMap::default(),
            enabled_attributes: Vec::new(),
        }
    }

    /// Declares what a shader source file contains.
    #[must_use]
    pub fn with_shader(
        mut self,
        source: &str,
        uniforms: &[(&str, UniformType)],
        attributes: &[&str],
    ) -> Self {
        self.sources.insert(
            source.to_string(),
            SourceReflection {
                uniforms: uniforms
                    .iter()
                    .map(|(name, ty)| ((*name).to_string(), *ty))
                    .collect(),
                attributes: attributes.iter().map(|a| (*a).to_string()).collect(),
            },
        );
        self
    }

    #[must_use]
    pub fn with_capabilities(mut self, capabilities: BackendCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Shared handle to the call record.
    #[must_use]
    pub fn log(&self) -> Arc<Mutex<HeadlessLog>> {
        Arc::clone(&self.log)
    }

    fn record_thread(&self) -> parking_lot::MutexGuard<'_, HeadlessLog> {
        let mut log = self.log.lock();
        log.gpu_threads.insert(thread::current().id());
        log
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl GraphicsBackend for HeadlessBackend {
    fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }

    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> Result<GpuBufferId> {
        if self.record_thread().fail_uploads {
            return Err(StrataError::Backend("buffer upload rejected".to_string()));
        }
        let id = GpuBufferId(self.allocate_id());
        self.log.lock().buffers.insert(
            id,
            RecordedBuffer {
                kind,
                data: data.to_vec(),
            },
        );
        Ok(id)
    }

    fn delete_buffer(&mut self, id: GpuBufferId) {
        let mut log = self.record_thread();
        log.buffers.remove(&id);
        log.deleted_buffers.push(id);
    }

    fn compile_program(&mut self, desc: &ProgramDescriptor<'_>) -> Result<CompiledProgram> {
        self.record_thread().compiles.push(desc.name.to_string());

        let mut uniforms: Vec<ShaderUniform> = Vec::new();
        let mut attributes: Vec<String> = Vec::new();
        for stage in desc.stages {
            let reflection =
                self.sources
                    .get(&stage.source)
                    .ok_or_else(|| StrataError::ShaderCompile {
                        program: desc.name.to_string(),
                        message: format!("cannot locate shader source '{}'", stage.source),
                    })?;

            for (name, ty) in &reflection.uniforms {
                if uniforms.iter().any(|u| &u.name == name) {
                    continue;
                }
                let location = i32::try_from(uniforms.len()).unwrap_or(i32::MAX);
                uniforms.push(ShaderUniform {
                    name: name.clone(),
                    ty: *ty,
                    location,
                });
            }
            for attribute in &reflection.attributes {
                if !attributes.contains(attribute) {
                    attributes.push(attribute.clone());
                }
            }
        }

        let id = GpuProgramId(self.allocate_id());
        self.log.lock().programs.insert(
            id,
            RecordedProgram {
                name: desc.name.to_string(),
                uniforms: uniforms.clone(),
                attributes: attributes.clone(),
            },
        );
        Ok(CompiledProgram {
            id,
            uniforms,
            attributes,
        })
    }

    fn delete_program(&mut self, id: GpuProgramId) {
        self.uniform_values.remove(&id);
        if self.current_program == Some(id) {
            self.current_program = None;
        }
        let mut log = self.record_thread();
        log.programs.remove(&id);
        log.deleted_programs.push(id);
    }

    fn framebuffer_complete(&mut self) -> bool {
        self.record_thread().framebuffer_complete
    }

    fn clear(&mut self, _color: [f32; 4], _depth: f32) {
        self.record_thread().clears += 1;
    }

    fn apply_gpu_state(&mut self, state: &GpuState) {
        self.current_state = Some(*state);
        self.record_thread().state_applications.push(*state);
    }

    fn use_program(&mut self, id: GpuProgramId) {
        self.record_thread();
        self.current_program = Some(id);
    }

    fn set_uniform(&mut self, location: i32, value: &UniformValue) {
        self.record_thread();
        if let Some(program) = self.current_program {
            self.uniform_values
                .entry(program)
                .or_default()
                .insert(location, *value);
        }
    }

    fn bind_buffer(&mut self, kind: BufferKind, id: GpuBufferId) {
        self.record_thread();
        match kind {
            BufferKind::Vertex => self.bound_vertex = Some(id),
            BufferKind::Index => self.bound_index = Some(id),
        }
    }

    fn enable_attribute(&mut self, _program: GpuProgramId, binding: &AttributeBinding<'_>) {
        self.record_thread();
        self.enabled_attributes.retain(|a| a.name != binding.name);
        self.enabled_attributes.push(RecordedAttribute {
            name: binding.name.to_string(),
            components: binding.components,
            data_type: binding.data_type,
            normalize: binding.normalize,
            stride: binding.stride,
            offset: binding.offset,
        });
    }

    fn disable_attribute(&mut self, _program: GpuProgramId, name: &str) {
        self.record_thread();
        self.enabled_attributes.retain(|a| a.name != name);
    }

    fn draw_elements(&mut self, primitive: PrimitiveType, count: usize, index_type: IndexType) {
        let Some(program) = self.current_program else {
            log::warn!(target: "strata", "headless draw without a bound program");
            return;
        };

        let values = self.uniform_values.get(&program);
        let mut log = self.record_thread();
        let (name, uniforms) = match log.programs.get(&program) {
            Some(recorded) => {
                let uniforms = recorded
                    .uniforms
                    .iter()
                    .filter_map(|u| {
                        values
                            .and_then(|v| v.get(&u.location))
                            .map(|value| (u.name.clone(), *value))
                    })
                    .collect();
                (recorded.name.clone(), uniforms)
            }
            None => (String::new(), FxHashMap::default()),
        };

        log.draws.push(DrawCall {
            program: name,
            vbo: self.bound_vertex,
            ibo: self.bound_index,
            primitive,
            count,
            index_type,
            uniforms,
            attributes: self.enabled_attributes.clone(),
            gpu_state: self.current_state,
        });
    }
}

// ============================================================================
// Surface
// ============================================================================

/// Make-current / swap record of a [`HeadlessSurface`].
#[derive(Debug, Default)]
pub struct SurfaceLog {
    pub make_current: Vec<ThreadId>,
    pub swaps: Vec<ThreadId>,
}

/// Surface that records which threads bound and presented it.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    log: Arc<Mutex<SurfaceLog>>,
}

impl HeadlessSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn log(&self) -> Arc<Mutex<SurfaceLog>> {
        Arc::clone(&self.log)
    }
}

impl RenderSurface for HeadlessSurface {
    fn make_current(&self) -> Result<()> {
        self.log.lock().make_current.push(thread::current().id());
        Ok(())
    }

    fn swap_buffers(&self) {
        self.log.lock().swaps.push(thread::current().id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::shader::ShaderStage;

    fn backend() -> HeadlessBackend {
        HeadlessBackend::new()
            .with_shader(
                "UniformColor.vsh",
                &[("uProjIVObject", UniformType::Mat4)],
                &["aPos"],
            )
            .with_shader(
                "UniformColor.fsh",
                &[("uColor", UniformType::Vec4), ("uProjIVObject", UniformType::Mat4)],
                &[],
            )
    }

    #[test]
    fn program_reflection_is_union_of_stages() {
        let mut backend = backend();
        let stages = [
            ShaderStage::vertex("UniformColor.vsh"),
            ShaderStage::fragment("UniformColor.fsh"),
        ];
        let compiled = backend
            .compile_program(&ProgramDescriptor {
                name: "UniformColor",
                stages: &stages,
                search_dirs: &[],
            })
            .unwrap();

        let names: Vec<_> = compiled.uniforms.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["uProjIVObject", "uColor"]);
        assert_eq!(compiled.attributes, ["aPos"]);
        assert_eq!(backend.log().lock().live_program_count(), 1);
    }

    #[test]
    fn unknown_source_fails_to_compile() {
        let mut backend = backend();
        let stages = [ShaderStage::vertex("Missing.vsh")];
        let err = backend
            .compile_program(&ProgramDescriptor {
                name: "Missing",
                stages: &stages,
                search_dirs: &[],
            })
            .unwrap_err();
        assert!(matches!(err, StrataError::ShaderCompile { .. }));
    }

    #[test]
    fn buffers_are_recorded_until_deleted() {
        let mut backend = backend();
        let log = backend.log();
        let id = backend
            .create_buffer(BufferKind::Index, bytemuck::cast_slice(&[0u16, 1, 2]))
            .unwrap();
        assert_eq!(log.lock().buffer_as::<u16>(id), Some(vec![0, 1, 2]));

        backend.delete_buffer(id);
        assert_eq!(log.lock().live_buffer_count(), 0);
        assert_eq!(log.lock().deleted_buffers, [id]);
    }
}
