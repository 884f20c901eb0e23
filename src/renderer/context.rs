//! Render Context
//!
//! [`RenderContext`] is the explicit owner of all render-thread state: the
//! graphics backend, named buffer tables, persistent shaders, objects,
//! system-global uniforms and the pass registry. Every mutation in this
//! module validates fully before touching state, so a failed call leaves the
//! context unchanged.
//!
//! The context is only ever driven by one thread at a time. In threaded mode
//! that is the render thread (commands reach it through the queue); otherwise
//! it is whichever thread calls the [`crate::Engine`].

use std::fmt;
use std::sync::Arc;

use crate::errors::{Result, StrataError};
use crate::logging::Logger;
use crate::renderer::backend::{BufferKind, GraphicsBackend, RenderSurface};
use crate::renderer::frame::FrameStats;
use crate::renderer::hooks::{
    ObjectRenderHook, ObjectUniformHook, PassHook, UnsatisfiedUniform, UnsatisfiedUniformCallback,
};
use crate::renderer::pass_registry::PassRegistry;
use crate::renderer::settings::RendererSettings;
use crate::resources::attributes::AttributeRegistry;
use crate::resources::buffer::{IndexBuffer, ReleaseQueue, ResourceTable, VertexBuffer};
use crate::resources::gpu_state::GpuState;
use crate::resources::shader::{ShaderProgram, ShaderProgramRegistry, ShaderStage};
use crate::resources::types::{DataType, IndexType, PrimitiveType};
use crate::resources::uniforms::UniformValue;
use crate::scene::manager::{GlobalUniforms, ObjectManager};
use crate::scene::object::RenderObject;
use crate::scene::pass::{ObjectPass, ObjectPassDescriptor};

/// All state owned by the thread that drives frames.
pub struct RenderContext {
    pub(crate) backend: Box<dyn GraphicsBackend>,
    pub(crate) surface: Arc<dyn RenderSurface>,
    pub(crate) settings: RendererSettings,
    pub(crate) logger: Logger,

    pub(crate) vbos: ResourceTable<VertexBuffer>,
    pub(crate) ibos: ResourceTable<IndexBuffer>,
    pub(crate) shaders: ShaderProgramRegistry,
    pub(crate) attributes: AttributeRegistry,

    pub(crate) objects: ObjectManager,
    pub(crate) globals: GlobalUniforms,
    pub(crate) passes: PassRegistry,

    pub(crate) release: ReleaseQueue,
    pub(crate) unsatisfied_callback: Option<UnsatisfiedUniformCallback>,
    pub(crate) stats: FrameStats,
}

impl fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderContext")
            .field("vbos", &self.vbos)
            .field("ibos", &self.ibos)
            .field("shaders", &self.shaders)
            .field("objects", &self.objects.len())
            .field("passes", &self.passes)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl RenderContext {
    pub fn new(
        backend: Box<dyn GraphicsBackend>,
        surface: Arc<dyn RenderSurface>,
        settings: RendererSettings,
        logger: Logger,
    ) -> Self {
        Self {
            backend,
            surface,
            settings,
            logger,
            vbos: ResourceTable::new(),
            ibos: ResourceTable::new(),
            shaders: ShaderProgramRegistry::new(),
            attributes: AttributeRegistry::new(),
            objects: ObjectManager::new(),
            globals: GlobalUniforms::new(),
            passes: PassRegistry::new(),
            release: ReleaseQueue::new(),
            unsatisfied_callback: None,
            stats: FrameStats::default(),
        }
    }

    // ========================================================================
    // Objects
    // ========================================================================

    pub fn add_object(&mut self, name: &str) -> Result<()> {
        self.objects.add(name)?;
        Ok(())
    }

    /// Removes an object and all of its passes.
    pub fn remove_object(&mut self, name: &str) -> Result<()> {
        self.objects.remove(name)?;
        self.passes.remove_object(name);
        self.release_pending();
        Ok(())
    }

    pub fn remove_all_objects(&mut self) {
        self.objects.clear();
        self.passes.clear_members();
        self.release_pending();
    }

    // ========================================================================
    // Buffers
    // ========================================================================

    pub fn add_shader_attribute(
        &mut self,
        name: &str,
        components: usize,
        normalize: bool,
        size: usize,
        data_type: DataType,
    ) {
        self.attributes.add(name, components, normalize, size, data_type);
    }

    /// Uploads an interleaved vertex buffer described by registered
    /// attribute names.
    pub fn add_vbo<S: AsRef<str>>(&mut self, name: &str, data: &[u8], attributes: &[S]) -> Result<()> {
        self.vbos.ensure_vacant(name)?;
        let layout = self.attributes.layout(attributes)?;

        let stride = layout.stride();
        if stride != 0 && data.len() % stride != 0 {
            self.logger.warning(&format!(
                "VBO '{name}': {} bytes is not a whole number of {stride}-byte vertices",
                data.len()
            ));
        }

        let id = self.backend.create_buffer(BufferKind::Vertex, data)?;
        let vbo = VertexBuffer::new(name, id, data.len(), layout, self.release.sender());
        self.vbos.insert(name, vbo)?;
        Ok(())
    }

    pub fn remove_vbo(&mut self, name: &str) -> Result<()> {
        self.vbos.remove(name)?;
        self.release_pending();
        Ok(())
    }

    pub fn add_ibo(&mut self, name: &str, data: &[u8], index_type: IndexType) -> Result<()> {
        self.ibos.ensure_vacant(name)?;
        if data.len() % index_type.size() != 0 {
            return Err(StrataError::InvalidBuffer {
                name: name.to_string(),
                reason: format!(
                    "{} bytes is not a multiple of the {}-byte index size",
                    data.len(),
                    index_type.size()
                ),
            });
        }

        let id = self.backend.create_buffer(BufferKind::Index, data)?;
        let ibo = IndexBuffer::new(name, id, data.len(), index_type, self.release.sender());
        self.ibos.insert(name, ibo)?;
        Ok(())
    }

    pub fn remove_ibo(&mut self, name: &str) -> Result<()> {
        self.ibos.remove(name)?;
        self.release_pending();
        Ok(())
    }

    pub fn vbo(&self, name: &str) -> Result<Arc<VertexBuffer>> {
        self.vbos.get(name)
    }

    pub fn ibo(&self, name: &str) -> Result<Arc<IndexBuffer>> {
        self.ibos.get(name)
    }

    // ========================================================================
    // Shaders
    // ========================================================================

    pub fn add_persistent_shader(&mut self, name: &str, stages: &[ShaderStage]) -> Result<()> {
        let program = self.shaders.add_persistent(
            name,
            stages,
            &self.settings.shader_dirs,
            self.backend.as_mut(),
            self.release.sender(),
        )?;
        self.logger.debug(&format!(
            "compiled program '{name}' ({} uniforms, {} attributes)",
            program.uniforms().len(),
            program.attributes().len()
        ));
        Ok(())
    }

    pub fn shader(&self, name: &str) -> Result<Arc<ShaderProgram>> {
        self.shaders.get(name)
    }

    #[must_use]
    pub fn has_shader(&self, name: &str) -> bool {
        self.shaders.contains(name)
    }

    // ========================================================================
    // Registry passes
    // ========================================================================

    pub fn add_pass_to_front(&mut self, name: &str) -> Result<()> {
        self.passes.add_to_front(name)
    }

    pub fn add_pass_to_back(&mut self, name: &str) -> Result<()> {
        self.passes.add_to_back(name)
    }

    /// Removes a registry pass. Object passes of that name stay attached
    /// but no longer render.
    pub fn remove_pass(&mut self, name: &str) -> Result<()> {
        self.passes.remove(name)
    }

    #[must_use]
    pub fn has_pass(&self, name: &str) -> bool {
        self.passes.contains(name)
    }

    #[must_use]
    pub fn is_object_in_pass(&self, object: &str, pass: &str) -> bool {
        self.passes.is_object_in_pass(object, pass)
    }

    #[must_use]
    pub fn passes(&self) -> &PassRegistry {
        &self.passes
    }

    // ========================================================================
    // Object passes
    // ========================================================================

    /// Attaches a program + VBO + IBO to an object under `desc.pass`.
    ///
    /// The responsible registry pass (the parent if given, otherwise the pass
    /// itself) must exist, and the VBO must provide every attribute the
    /// program consumes.
    pub fn add_pass_to_object(&mut self, desc: &ObjectPassDescriptor) -> Result<()> {
        let object = self.objects.get(&desc.object)?;
        let program = self.shaders.get(&desc.program)?;
        let vbo = self.vbos.get(&desc.vbo)?;
        let ibo = self.ibos.get(&desc.ibo)?;

        if object.has_pass(&desc.pass) {
            return Err(StrataError::DuplicateObjectPass {
                object: desc.object.clone(),
                pass: desc.pass.clone(),
            });
        }

        let responsible = desc.responsible_pass();
        if !self.passes.contains(responsible) {
            return Err(StrataError::PassNotFound(responsible.to_string()));
        }

        if let Some(attribute) = vbo.layout().first_missing(program.attributes()) {
            return Err(StrataError::AttributeMismatch {
                vbo: desc.vbo.clone(),
                program: desc.program.clone(),
                attribute: attribute.to_string(),
            });
        }

        let mut primitive = desc.primitive;
        if primitive.is_adjacency() && !self.backend.capabilities().adjacency_primitives {
            self.logger.error(&format!(
                "{primitive:?} is not supported by the backend; '{}'/'{}' will draw Triangles",
                desc.object, desc.pass
            ));
            primitive = PrimitiveType::Triangles;
        }

        let pass = ObjectPass::new(
            &desc.pass,
            desc.parent.as_deref(),
            program,
            vbo,
            ibo,
            primitive,
        );
        self.objects.get_mut(&desc.object)?.add_pass(pass)?;
        self.passes.add_member(responsible, &desc.object)
    }

    pub fn remove_pass_from_object(&mut self, object: &str, pass: &str) -> Result<()> {
        let obj = self.objects.get_mut(object)?;
        let removed = obj.remove_pass(pass)?;

        let responsible = removed.responsible_pass();
        if !obj.renders_under(responsible) {
            self.passes.remove_member(responsible, object);
        }
        drop(removed);
        self.release_pending();
        Ok(())
    }

    pub fn add_object_pass_uniform(
        &mut self,
        object: &str,
        pass: &str,
        uniform: &str,
        value: UniformValue,
    ) -> Result<()> {
        self.objects
            .get_mut(object)?
            .set_pass_uniform(pass, uniform, value)
    }

    pub fn remove_object_pass_uniform(&mut self, object: &str, pass: &str, uniform: &str) -> Result<()> {
        self.objects
            .get_mut(object)?
            .remove_pass_uniform(pass, uniform)?;
        Ok(())
    }

    pub fn add_object_global_uniform(
        &mut self,
        object: &str,
        uniform: &str,
        value: UniformValue,
    ) -> Result<()> {
        self.objects
            .get_mut(object)?
            .set_global_uniform(uniform, value)
    }

    pub fn remove_object_global_uniform(&mut self, object: &str, uniform: &str) -> Result<()> {
        self.objects.get_mut(object)?.remove_global_uniform(uniform)?;
        Ok(())
    }

    pub fn add_object_pass_gpu_state(&mut self, object: &str, pass: &str, state: GpuState) -> Result<()> {
        self.objects
            .get_mut(object)?
            .pass_mut(pass)?
            .set_gpu_state(state);
        Ok(())
    }

    pub fn add_object_global_metadata(
        &mut self,
        object: &str,
        name: &str,
        value: UniformValue,
    ) -> Result<()> {
        self.objects.get_mut(object)?.set_metadata(name, value);
        Ok(())
    }

    pub fn add_object_pass_metadata(
        &mut self,
        object: &str,
        pass: &str,
        name: &str,
        value: UniformValue,
    ) -> Result<()> {
        self.objects
            .get_mut(object)?
            .set_pass_metadata(pass, name, value)
    }

    // ========================================================================
    // System-global uniforms
    // ========================================================================

    pub fn add_global_uniform(&mut self, uniform: &str, value: UniformValue) -> Result<()> {
        self.globals.set(uniform, value)
    }

    pub fn remove_global_uniform(&mut self, uniform: &str) -> Result<()> {
        self.globals.remove(uniform)?;
        Ok(())
    }

    #[must_use]
    pub fn global_uniform(&self, uniform: &str) -> Option<&UniformValue> {
        self.globals.get(uniform)
    }

    // ========================================================================
    // Hooks
    // ========================================================================

    pub fn add_begin_all_passes_hook(&mut self, hook: PassHook) {
        self.passes.add_begin_all_hook(hook);
    }

    pub fn add_end_all_passes_hook(&mut self, hook: PassHook) {
        self.passes.add_end_all_hook(hook);
    }

    pub fn add_pre_pass_hook(&mut self, pass: &str, hook: PassHook) -> Result<()> {
        self.passes.add_pre_pass_hook(pass, hook)
    }

    pub fn add_post_pass_hook(&mut self, pass: &str, hook: PassHook) -> Result<()> {
        self.passes.add_post_pass_hook(pass, hook)
    }

    pub fn add_object_render_hook(
        &mut self,
        object: &str,
        pass: &str,
        hook: ObjectRenderHook,
    ) -> Result<()> {
        self.objects
            .get_mut(object)?
            .pass_mut(pass)?
            .render_hooks
            .push(hook);
        Ok(())
    }

    pub fn add_object_uniform_hook(
        &mut self,
        object: &str,
        pass: &str,
        hook: ObjectUniformHook,
    ) -> Result<()> {
        self.objects
            .get_mut(object)?
            .pass_mut(pass)?
            .uniform_hooks
            .push(hook);
        Ok(())
    }

    /// Sets (or clears) the frame-level unsatisfied-uniform callback.
    pub fn set_unsatisfied_uniform_callback(&mut self, callback: Option<UnsatisfiedUniformCallback>) {
        self.unsatisfied_callback = callback;
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub fn object(&self, name: &str) -> Result<&RenderObject> {
        self.objects.get(name)
    }

    #[must_use]
    pub fn has_object(&self, name: &str) -> bool {
        self.objects.contains(name)
    }

    #[must_use]
    pub fn num_objects(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn objects(&self) -> &ObjectManager {
        &self.objects
    }

    /// Whether any user callback is registered: pass hooks, object hooks or
    /// the unsatisfied-uniform callback.
    #[must_use]
    pub fn has_hooks(&self) -> bool {
        self.passes.has_hooks()
            || self.unsatisfied_callback.is_some()
            || self
                .objects
                .iter()
                .any(|object| object.passes().any(ObjectPass::has_hooks))
    }

    /// Declared uniforms of an object pass that no tier currently satisfies.
    pub fn unsatisfied_uniforms(&self, object: &str, pass: &str) -> Result<Vec<UnsatisfiedUniform>> {
        self.objects
            .get(object)?
            .unsatisfied_uniforms(pass, self.globals.bindings())
    }

    #[must_use]
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    #[must_use]
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    #[must_use]
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    // ========================================================================
    // GPU resource lifetime
    // ========================================================================

    /// Deletes every GPU handle whose last owner has been dropped.
    pub fn release_pending(&mut self) -> usize {
        self.release.drain(self.backend.as_mut())
    }

    /// Releases every GPU resource: objects, buffer tables and persistent
    /// shaders. Must run on the thread that owns the context.
    pub fn clear_gpu_resources(&mut self) {
        self.objects.clear();
        self.passes.clear_members();
        self.vbos.clear();
        self.ibos.clear();
        self.shaders.clear();
        let released = self.release_pending();
        self.logger.debug(&format!("released {released} GPU resources"));
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        self.clear_gpu_resources();
    }
}
