//! Engine Façade
//!
//! [`Engine`] is the public entry point. It owns the [`RenderContext`], the
//! command queue and the render thread, and exposes the full mutation API.
//!
//! # Threading
//!
//! While the render thread is running, every mutation becomes a
//! [`Command`] pushed onto the bounded queue and is executed by the render
//! thread at the start of its next frame. The call returns as soon as the
//! command is queued; the only error reported at the call site is
//! [`StrataError::QueueFull`]. Failures of the command itself are logged and
//! counted in [`FrameStats::commands_failed`].
//!
//! Otherwise (synchronous mode, or after [`Engine::terminate`]) the same
//! command is applied immediately and its result is returned directly.
//!
//! Panics in hooks are caught per pass. If the render thread still dies,
//! mutations and [`Engine::sync`] fail with
//! [`StrataError::RenderThreadPanicked`] until [`Engine::terminate`] joins it.
//!
//! # Example
//!
//! ```rust,ignore
//! use strata::{Engine, HeadlessBackend, HeadlessSurface, RendererSettings};
//!
//! let engine = Engine::new(backend, HeadlessSurface::new(), RendererSettings::threaded())?;
//! engine.add_object("obj1")?;
//! engine.add_vbo("vbo1", bytemuck::cast_slice(&positions).to_vec(), &["aPos"])?;
//! engine.add_ibo("ibo1", bytemuck::cast_slice(&indices).to_vec(), IndexType::U16)?;
//! engine.add_pass_to_object(ObjectPassDescriptor::new(
//!     "obj1", "UniformColor", "vbo1", "ibo1", PrimitiveType::TriangleStrip,
//! ))?;
//! engine.sync()?;
//! engine.terminate()?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::app::command::Command;
use crate::app::lifecycle::{LifecycleState, RenderThread};
use crate::app::queue::CommandQueue;
use crate::errors::{Result, StrataError};
use crate::logging::{LogSink, Logger};
use crate::renderer::backend::{GraphicsBackend, RenderSurface};
use crate::renderer::context::RenderContext;
use crate::renderer::frame::{DrawOutcome, FrameStats, UnsatisfiedFn};
use crate::renderer::hooks::{ObjectHookContext, PassHookContext, UnsatisfiedUniforms};
use crate::renderer::settings::RendererSettings;
use crate::resources::gpu_state::GpuState;
use crate::resources::shader::ShaderStage;
use crate::resources::types::{DataType, IndexType};
use crate::resources::uniforms::UniformValue;
use crate::scene::pass::ObjectPassDescriptor;

/// How often a blocked [`Engine::sync`] checks whether the render thread
/// is still alive.
const SYNC_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Cross-thread rendering façade.
///
/// All methods take `&self`; an `Engine` can be shared between client
/// threads.
pub struct Engine {
    context: Arc<Mutex<RenderContext>>,
    queue: CommandQueue,
    thread: Mutex<RenderThread>,
    logger: Logger,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("queue", &self.queue)
            .field("state", &self.lifecycle_state())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Creates an engine. Starts the render thread if `settings.threaded`.
    pub fn new(
        backend: impl GraphicsBackend + 'static,
        surface: impl RenderSurface + 'static,
        settings: RendererSettings,
    ) -> Result<Self> {
        Self::build(Box::new(backend), Arc::new(surface), settings, Logger::default())
    }

    /// Like [`Engine::new`], also forwarding every log record to `sink`.
    pub fn with_log_sink(
        backend: impl GraphicsBackend + 'static,
        surface: impl RenderSurface + 'static,
        settings: RendererSettings,
        sink: LogSink,
    ) -> Result<Self> {
        Self::build(
            Box::new(backend),
            Arc::new(surface),
            settings,
            Logger::new(Some(sink)),
        )
    }

    fn build(
        backend: Box<dyn GraphicsBackend>,
        surface: Arc<dyn RenderSurface>,
        settings: RendererSettings,
        logger: Logger,
    ) -> Result<Self> {
        let threaded = settings.threaded;
        let queue = CommandQueue::new(settings.queue_capacity);
        let context = RenderContext::new(backend, surface, settings, logger.clone());

        let engine = Self {
            context: Arc::new(Mutex::new(context)),
            queue,
            thread: Mutex::new(RenderThread::new()),
            logger,
        };
        if threaded {
            engine.create_thread()?;
        }
        Ok(engine)
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    fn submit(&self, command: Command) -> Result<()> {
        let thread = self.thread.lock();
        if thread.has_failed() {
            return Err(StrataError::RenderThreadPanicked);
        }
        if thread.is_running() {
            let label = command.label();
            return self.queue.enqueue(command).inspect_err(|_| {
                self.logger.warning(&format!("command queue full, {label} rejected"));
            });
        }
        let mut ctx = self.context.lock();
        command.apply(&mut ctx)
    }

    // ========================================================================
    // Objects
    // ========================================================================

    pub fn add_object(&self, name: &str) -> Result<()> {
        self.submit(Command::AddObject(name.to_string()))
    }

    /// Removes an object and all of its passes.
    pub fn remove_object(&self, name: &str) -> Result<()> {
        self.submit(Command::RemoveObject(name.to_string()))
    }

    pub fn remove_all_objects(&self) -> Result<()> {
        self.submit(Command::RemoveAllObjects)
    }

    // ========================================================================
    // Buffers & shaders
    // ========================================================================

    /// Registers a vertex attribute that VBOs can then name.
    pub fn add_shader_attribute(
        &self,
        name: &str,
        components: usize,
        normalize: bool,
        size: usize,
        data_type: DataType,
    ) -> Result<()> {
        self.submit(Command::AddShaderAttribute {
            name: name.to_string(),
            components,
            normalize,
            size,
            data_type,
        })
    }

    /// Adds a named VBO. The engine takes ownership of `data`.
    pub fn add_vbo(&self, name: &str, data: Vec<u8>, attributes: &[&str]) -> Result<()> {
        self.submit(Command::AddVbo {
            name: name.to_string(),
            data,
            attributes: attributes.iter().map(|a| (*a).to_string()).collect(),
        })
    }

    /// Removes the name. Passes already using the VBO keep it alive.
    pub fn remove_vbo(&self, name: &str) -> Result<()> {
        self.submit(Command::RemoveVbo(name.to_string()))
    }

    /// Adds a named IBO. The engine takes ownership of `data`.
    pub fn add_ibo(&self, name: &str, data: Vec<u8>, index_type: IndexType) -> Result<()> {
        self.submit(Command::AddIbo {
            name: name.to_string(),
            data,
            index_type,
        })
    }

    /// Removes the name. Passes already using the IBO keep it alive.
    pub fn remove_ibo(&self, name: &str) -> Result<()> {
        self.submit(Command::RemoveIbo(name.to_string()))
    }

    /// Compiles and registers a persistent shader program.
    ///
    /// ```rust,ignore
    /// engine.add_persistent_shader("UniformColor", [
    ///     ("UniformColor.vsh", ShaderStageKind::Vertex),
    ///     ("UniformColor.fsh", ShaderStageKind::Fragment),
    /// ])?;
    /// ```
    pub fn add_persistent_shader<I, S>(&self, name: &str, stages: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<ShaderStage>,
    {
        self.submit(Command::AddPersistentShader {
            name: name.to_string(),
            stages: stages.into_iter().map(Into::into).collect(),
        })
    }

    // ========================================================================
    // Registry passes
    // ========================================================================

    pub fn add_pass_to_front(&self, name: &str) -> Result<()> {
        self.submit(Command::AddPassToFront(name.to_string()))
    }

    pub fn add_pass_to_back(&self, name: &str) -> Result<()> {
        self.submit(Command::AddPassToBack(name.to_string()))
    }

    /// Removes a registry pass. The default pass cannot be removed.
    pub fn remove_pass(&self, name: &str) -> Result<()> {
        self.submit(Command::RemovePass(name.to_string()))
    }

    // ========================================================================
    // Object passes
    // ========================================================================

    pub fn add_pass_to_object(&self, desc: ObjectPassDescriptor) -> Result<()> {
        self.submit(Command::AddPassToObject(desc))
    }

    pub fn remove_pass_from_object(&self, object: &str, pass: &str) -> Result<()> {
        self.submit(Command::RemovePassFromObject {
            object: object.to_string(),
            pass: pass.to_string(),
        })
    }

    /// Fixed-function state applied right before the pass draws.
    pub fn add_object_pass_gpu_state(&self, object: &str, pass: &str, state: GpuState) -> Result<()> {
        self.submit(Command::AddObjectPassGpuState {
            object: object.to_string(),
            pass: pass.to_string(),
            state,
        })
    }

    // ========================================================================
    // Uniforms
    // ========================================================================

    pub fn add_object_pass_uniform(
        &self,
        object: &str,
        pass: &str,
        uniform: &str,
        value: impl Into<UniformValue>,
    ) -> Result<()> {
        self.submit(Command::AddObjectPassUniform {
            object: object.to_string(),
            pass: pass.to_string(),
            uniform: uniform.to_string(),
            value: value.into(),
        })
    }

    /// Removes a pass-specific binding; the pass falls back to the
    /// object-global and system-global tiers.
    pub fn remove_object_pass_uniform(&self, object: &str, pass: &str, uniform: &str) -> Result<()> {
        self.submit(Command::RemoveObjectPassUniform {
            object: object.to_string(),
            pass: pass.to_string(),
            uniform: uniform.to_string(),
        })
    }

    pub fn add_object_global_uniform(
        &self,
        object: &str,
        uniform: &str,
        value: impl Into<UniformValue>,
    ) -> Result<()> {
        self.submit(Command::AddObjectGlobalUniform {
            object: object.to_string(),
            uniform: uniform.to_string(),
            value: value.into(),
        })
    }

    pub fn remove_object_global_uniform(&self, object: &str, uniform: &str) -> Result<()> {
        self.submit(Command::RemoveObjectGlobalUniform {
            object: object.to_string(),
            uniform: uniform.to_string(),
        })
    }

    pub fn add_global_uniform(&self, uniform: &str, value: impl Into<UniformValue>) -> Result<()> {
        self.submit(Command::AddGlobalUniform {
            uniform: uniform.to_string(),
            value: value.into(),
        })
    }

    pub fn remove_global_uniform(&self, uniform: &str) -> Result<()> {
        self.submit(Command::RemoveGlobalUniform(uniform.to_string()))
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    pub fn add_object_global_metadata(
        &self,
        object: &str,
        name: &str,
        value: impl Into<UniformValue>,
    ) -> Result<()> {
        self.submit(Command::AddObjectGlobalMetadata {
            object: object.to_string(),
            name: name.to_string(),
            value: value.into(),
        })
    }

    pub fn add_object_pass_metadata(
        &self,
        object: &str,
        pass: &str,
        name: &str,
        value: impl Into<UniformValue>,
    ) -> Result<()> {
        self.submit(Command::AddObjectPassMetadata {
            object: object.to_string(),
            pass: pass.to_string(),
            name: name.to_string(),
            value: value.into(),
        })
    }

    // ========================================================================
    // Hooks
    // ========================================================================

    pub fn add_begin_all_passes_hook(
        &self,
        hook: impl FnMut(&mut PassHookContext<'_>) + Send + 'static,
    ) -> Result<()> {
        self.submit(Command::AddBeginAllPassesHook(Box::new(hook)))
    }

    pub fn add_end_all_passes_hook(
        &self,
        hook: impl FnMut(&mut PassHookContext<'_>) + Send + 'static,
    ) -> Result<()> {
        self.submit(Command::AddEndAllPassesHook(Box::new(hook)))
    }

    pub fn add_pre_pass_hook(
        &self,
        pass: &str,
        hook: impl FnMut(&mut PassHookContext<'_>) + Send + 'static,
    ) -> Result<()> {
        self.submit(Command::AddPrePassHook {
            pass: pass.to_string(),
            hook: Box::new(hook),
        })
    }

    pub fn add_post_pass_hook(
        &self,
        pass: &str,
        hook: impl FnMut(&mut PassHookContext<'_>) + Send + 'static,
    ) -> Result<()> {
        self.submit(Command::AddPostPassHook {
            pass: pass.to_string(),
            hook: Box::new(hook),
        })
    }

    /// Replaces the built-in draw of one object pass.
    pub fn add_object_render_hook(
        &self,
        object: &str,
        pass: &str,
        hook: impl FnMut(&mut ObjectHookContext<'_>) + Send + 'static,
    ) -> Result<()> {
        self.submit(Command::AddObjectRenderHook {
            object: object.to_string(),
            pass: pass.to_string(),
            hook: Box::new(hook),
        })
    }

    /// Runs when the object pass has unsatisfied uniforms, before the
    /// frame-level callback.
    pub fn add_object_uniform_hook(
        &self,
        object: &str,
        pass: &str,
        hook: impl FnMut(&mut ObjectHookContext<'_>, &mut UnsatisfiedUniforms) + Send + 'static,
    ) -> Result<()> {
        self.submit(Command::AddObjectUniformHook {
            object: object.to_string(),
            pass: pass.to_string(),
            hook: Box::new(hook),
        })
    }

    /// Sets the frame-level callback for uniforms no tier satisfies.
    pub fn set_unsatisfied_uniform_callback(
        &self,
        callback: impl FnMut(&mut UnsatisfiedUniforms) + Send + 'static,
    ) -> Result<()> {
        self.submit(Command::SetUnsatisfiedUniformCallback(Some(Box::new(callback))))
    }

    pub fn clear_unsatisfied_uniform_callback(&self) -> Result<()> {
        self.submit(Command::SetUnsatisfiedUniformCallback(None))
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Runs `f` against the current render state.
    ///
    /// In threaded mode this observes the state as of the last drain; call
    /// [`Engine::sync`] first to include everything submitted so far.
    pub fn inspect<R>(&self, f: impl FnOnce(&RenderContext) -> R) -> R {
        let ctx = self.context.lock();
        f(&*ctx)
    }

    #[must_use]
    pub fn num_objects(&self) -> usize {
        self.inspect(RenderContext::num_objects)
    }

    #[must_use]
    pub fn has_object(&self, name: &str) -> bool {
        self.inspect(|ctx| ctx.has_object(name))
    }

    #[must_use]
    pub fn has_pass(&self, name: &str) -> bool {
        self.inspect(|ctx| ctx.has_pass(name))
    }

    #[must_use]
    pub fn is_object_in_pass(&self, object: &str, pass: &str) -> bool {
        self.inspect(|ctx| ctx.is_object_in_pass(object, pass))
    }

    #[must_use]
    pub fn stats(&self) -> FrameStats {
        self.inspect(|ctx| *ctx.stats())
    }

    /// Number of commands waiting for the render thread.
    #[must_use]
    pub fn pending_commands(&self) -> usize {
        self.queue.len()
    }

    // ========================================================================
    // Render thread
    // ========================================================================

    /// Starts the render thread. Fails if it is already running.
    pub fn create_thread(&self) -> Result<()> {
        self.thread
            .lock()
            .spawn(Arc::clone(&self.context), self.queue.clone())
    }

    /// Stops the render thread, blocking until it has released all GPU
    /// resources and joined. Commands still queued are never executed.
    ///
    /// Afterwards the context can be made current on another thread and
    /// frames driven manually.
    pub fn terminate(&self) -> Result<()> {
        self.thread.lock().terminate()
    }

    #[must_use]
    pub fn lifecycle_state(&self) -> LifecycleState {
        self.thread.lock().state()
    }

    /// Blocks until every command submitted before this call has executed.
    ///
    /// Returns immediately when the render thread is not running. Fails with
    /// [`StrataError::RenderThreadPanicked`] if the thread dies first.
    pub fn sync(&self) -> Result<()> {
        let (done_tx, done_rx) = flume::bounded(1);
        {
            let thread = self.thread.lock();
            if thread.has_failed() {
                return Err(StrataError::RenderThreadPanicked);
            }
            if !thread.is_running() {
                return Ok(());
            }
            self.queue.enqueue(Command::Barrier(done_tx))?;
        }

        loop {
            match done_rx.recv_timeout(SYNC_POLL_INTERVAL) {
                Ok(()) => return Ok(()),
                Err(flume::RecvTimeoutError::Disconnected) => {
                    return Err(StrataError::ContextLost(
                        "render thread stopped before the barrier ran".to_string(),
                    ));
                }
                Err(flume::RecvTimeoutError::Timeout) => {
                    if self.thread.lock().has_failed() {
                        self.queue.discard();
                        return Err(StrataError::RenderThreadPanicked);
                    }
                }
            }
        }
    }

    // ========================================================================
    // Manual frames
    // ========================================================================

    fn ensure_not_threaded(&self, operation: &str) -> Result<()> {
        let thread = self.thread.lock();
        if thread.has_failed() {
            return Err(StrataError::RenderThreadPanicked);
        }
        if thread.is_running() {
            return Err(StrataError::ThreadAffinity(format!(
                "{operation} is driven by the render thread while it is running"
            )));
        }
        Ok(())
    }

    /// Makes the surface current (if asked) and reports framebuffer
    /// completeness.
    pub fn begin_frame(&self, make_current: bool) -> Result<bool> {
        self.ensure_not_threaded("begin_frame")?;
        self.context.lock().begin_frame(make_current)
    }

    /// Fails with [`StrataError::FramebufferIncomplete`] if the target
    /// cannot be rendered to.
    pub fn check_framebuffer(&self) -> Result<()> {
        self.ensure_not_threaded("check_framebuffer")?;
        self.context.lock().check_framebuffer()
    }

    pub fn end_frame(&self) -> Result<()> {
        self.ensure_not_threaded("end_frame")?;
        self.context.lock().end_frame();
        Ok(())
    }

    /// Renders every registry pass. Returns `false` if the framebuffer was
    /// incomplete and nothing was drawn.
    pub fn do_all_passes(&self) -> Result<bool> {
        self.ensure_not_threaded("do_all_passes")?;
        Ok(self.context.lock().do_all_passes())
    }

    /// Drains pending commands, renders all passes and presents.
    pub fn do_frame(&self) -> Result<bool> {
        self.ensure_not_threaded("do_frame")?;
        let mut ctx = self.context.lock();
        self.queue.drain(&mut ctx);
        if !ctx.begin_frame(false)? {
            ctx.stats.frames_skipped += 1;
            return Ok(false);
        }
        let rendered = ctx.do_all_passes();
        if rendered {
            ctx.end_frame();
        }
        Ok(rendered)
    }

    /// Renders one object pass immediately.
    pub fn render_object(
        &self,
        object: &str,
        pass: &str,
        callback: Option<UnsatisfiedFn<'_>>,
    ) -> Result<DrawOutcome> {
        self.ensure_not_threaded("render_object")?;
        self.context.lock().render_object(object, pass, callback)
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(err) = self.terminate() {
            self.logger.error(&format!("render thread did not shut down cleanly: {err}"));
        }
    }
}
