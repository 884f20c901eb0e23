//! Frame Driver
//!
//! Per-frame orchestration on top of [`RenderContext`]:
//!
//! ```text
//! begin_frame ─► do_all_passes ─► end_frame
//!                  │
//!                  ├─ framebuffer check (skip frame if incomplete)
//!                  ├─ clear + default GpuState
//!                  ├─ begin-all hooks
//!                  ├─ for each registry pass, in order:
//!                  │    pre hooks ─► member objects ─► post hooks
//!                  └─ end-all hooks
//! ```
//!
//! Drawing one object pass resolves every declared uniform through the
//! pass-specific, object-global and system-global tiers. Uniforms that no
//! tier satisfies go to the pass's uniform hooks, then to the frame-level
//! callback; whatever is still pending skips the draw.
//!
//! A failure while rendering a registry pass aborts that pass only. It is
//! logged, counted, and the next pass renders normally. Panics raised by
//! hooks and callbacks count as failures of the pass they ran in.

use std::panic::{self, AssertUnwindSafe};

use crate::errors::{Result, StrataError, panic_message};
use crate::logging::Logger;
use crate::renderer::backend::{AttributeBinding, BufferKind, GraphicsBackend};
use crate::renderer::context::RenderContext;
use crate::renderer::hooks::{ObjectHookContext, PassHookContext, UnsatisfiedUniforms};
use crate::renderer::pass_registry::PassRegistry;
use crate::resources::gpu_state::GpuState;
use crate::resources::types::DataType;
use crate::resources::uniforms::UniformBindings;
use crate::scene::manager::ObjectManager;
use crate::scene::object::RenderObject;

/// Callback handed the unsatisfied uniforms of one draw.
pub type UnsatisfiedFn<'a> = &'a mut dyn FnMut(&mut UnsatisfiedUniforms);

/// Running counters, reset only when the context is recreated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frames_rendered: u64,
    /// Frames skipped because the framebuffer was incomplete.
    pub frames_skipped: u64,
    pub draws_issued: u64,
    /// Draws skipped because uniforms stayed unsatisfied.
    pub draws_skipped: u64,
    /// Draws replaced by object render hooks.
    pub draws_hooked: u64,
    pub passes_failed: u64,
    pub commands_applied: u64,
    pub commands_failed: u64,
}

/// What happened to one object pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    Drawn,
    /// An object render hook ran instead of the built-in draw.
    Hooked,
    /// Uniforms were left unsatisfied; nothing was drawn.
    Skipped { unsatisfied: usize },
}

/// Runs user code, turning a panic into [`StrataError::HookPanicked`].
fn guarded<R>(hook: &str, f: impl FnOnce() -> R) -> Result<R> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| StrataError::HookPanicked {
        hook: hook.to_string(),
        message: panic_message(payload.as_ref()),
    })
}

/// Borrowed view of the context used while drawing.
struct FrameScope<'a> {
    backend: &'a mut dyn GraphicsBackend,
    globals: &'a UniformBindings,
    default_state: &'a GpuState,
    logger: &'a Logger,
    stats: &'a mut FrameStats,
}

impl RenderContext {
    /// Prepares a frame.
    ///
    /// Optionally makes the surface current on the calling thread, deletes
    /// released GPU handles, and reports whether the framebuffer can be
    /// rendered to.
    pub fn begin_frame(&mut self, make_current: bool) -> Result<bool> {
        if make_current {
            self.surface.make_current()?;
        }
        self.release_pending();
        Ok(self.check_framebuffer().is_ok())
    }

    /// Fails with [`StrataError::FramebufferIncomplete`] if the target
    /// cannot be rendered to.
    pub fn check_framebuffer(&mut self) -> Result<()> {
        if self.backend.framebuffer_complete() {
            Ok(())
        } else {
            Err(StrataError::FramebufferIncomplete)
        }
    }

    /// Presents the frame.
    pub fn end_frame(&mut self) {
        self.surface.swap_buffers();
    }

    /// Renders every registry pass in order.
    ///
    /// Returns `false` (and draws nothing) when the framebuffer is
    /// incomplete.
    pub fn do_all_passes(&mut self) -> bool {
        if let Err(err) = self.check_framebuffer() {
            self.stats.frames_skipped += 1;
            self.logger.warning(&format!("{err}, frame skipped"));
            return false;
        }

        let Self {
            backend,
            settings,
            logger,
            objects,
            globals,
            passes,
            unsatisfied_callback,
            stats,
            ..
        } = self;

        backend.clear(settings.clear_color, settings.clear_depth);
        backend.apply_gpu_state(&settings.default_gpu_state);

        let mut frame = FrameScope {
            backend: backend.as_mut(),
            globals: globals.bindings(),
            default_state: &settings.default_gpu_state,
            logger,
            stats,
        };
        let mut callback: Option<&mut dyn FnMut(&mut UnsatisfiedUniforms)> = unsatisfied_callback
            .as_deref_mut()
            .map(|cb| cb as &mut dyn FnMut(&mut UnsatisfiedUniforms));

        let began = guarded("begin-all-passes hook", || {
            for hook in &mut passes.begin_hooks {
                hook(&mut PassHookContext {
                    pass: None,
                    backend: &mut *frame.backend,
                    globals: frame.globals,
                });
            }
        });
        if let Err(err) = began {
            frame.logger.error(&err.to_string());
        }

        let names: Vec<String> = passes.names().map(str::to_string).collect();
        for name in &names {
            let rendered = guarded("render pass", || {
                frame.render_registry_pass(&mut *passes, &mut *objects, name, &mut callback)
            })
            .and_then(|result| result);
            if let Err(err) = rendered {
                frame.stats.passes_failed += 1;
                frame.logger.error(&format!("pass '{name}' aborted: {err}"));
            }
        }

        let ended = guarded("end-all-passes hook", || {
            for hook in &mut passes.end_hooks {
                hook(&mut PassHookContext {
                    pass: None,
                    backend: &mut *frame.backend,
                    globals: frame.globals,
                });
            }
        });
        if let Err(err) = ended {
            frame.logger.error(&err.to_string());
        }

        frame.stats.frames_rendered += 1;
        true
    }

    /// Renders one pass of one object immediately, outside the pass
    /// registry.
    ///
    /// `callback` overrides the frame-level unsatisfied-uniform callback for
    /// this draw.
    pub fn render_object(
        &mut self,
        object: &str,
        pass: &str,
        callback: Option<UnsatisfiedFn<'_>>,
    ) -> Result<DrawOutcome> {
        let Self {
            backend,
            settings,
            logger,
            objects,
            globals,
            unsatisfied_callback,
            stats,
            ..
        } = self;

        let obj = objects.get_mut(object)?;
        let index = obj
            .passes()
            .position(|p| p.name() == pass)
            .ok_or_else(|| StrataError::ObjectPassNotFound {
                object: object.to_string(),
                pass: pass.to_string(),
            })?;

        let mut callback: Option<&mut dyn FnMut(&mut UnsatisfiedUniforms)> = match callback {
            Some(cb) => Some(cb as &mut dyn FnMut(&mut UnsatisfiedUniforms)),
            None => unsatisfied_callback
                .as_deref_mut()
                .map(|cb| cb as &mut dyn FnMut(&mut UnsatisfiedUniforms)),
        };

        let mut frame = FrameScope {
            backend: backend.as_mut(),
            globals: globals.bindings(),
            default_state: &settings.default_gpu_state,
            logger,
            stats,
        };
        frame.draw_object_pass(obj, index, &mut callback)
    }
}

impl FrameScope<'_> {
    fn render_registry_pass(
        &mut self,
        passes: &mut PassRegistry,
        objects: &mut ObjectManager,
        name: &str,
        callback: &mut Option<&mut dyn FnMut(&mut UnsatisfiedUniforms)>,
    ) -> Result<()> {
        let entry = passes.get_mut(name)?;
        for hook in &mut entry.pre_hooks {
            hook(&mut PassHookContext {
                pass: Some(name),
                backend: &mut *self.backend,
                globals: self.globals,
            });
        }

        for member in entry.members().to_vec() {
            let object = objects.get_mut(&member)?;
            for index in object.render_order(name) {
                self.draw_object_pass(object, index, callback)?;
            }
        }

        for hook in &mut entry.post_hooks {
            hook(&mut PassHookContext {
                pass: Some(name),
                backend: &mut *self.backend,
                globals: self.globals,
            });
        }
        Ok(())
    }

    fn draw_object_pass(
        &mut self,
        object: &mut RenderObject,
        index: usize,
        callback: &mut Option<&mut dyn FnMut(&mut UnsatisfiedUniforms)>,
    ) -> Result<DrawOutcome> {
        let object_name = object.name().to_string();
        let (pass, object_globals, object_metadata) = object.split_pass_mut(index);

        // Render hooks replace the built-in draw entirely.
        if !pass.render_hooks.is_empty() {
            let mut hooks = std::mem::take(&mut pass.render_hooks);
            let ran = guarded("object render hook", || {
                for hook in &mut hooks {
                    hook(&mut ObjectHookContext {
                        object: &object_name,
                        pass: pass.name(),
                        program: pass.program(),
                        vbo: pass.vbo(),
                        ibo: pass.ibo(),
                        object_metadata,
                        pass_metadata: pass.metadata(),
                        globals: self.globals,
                        backend: &mut *self.backend,
                    });
                }
            });
            pass.render_hooks = hooks;
            ran?;
            self.stats.draws_hooked += 1;
            return Ok(DrawOutcome::Hooked);
        }

        // Bound before any hook runs: uniforms a hook sets itself must land
        // on this program.
        let gpu_program = pass.program().gpu_id();
        self.backend.use_program(gpu_program);

        let pending = pass.unsatisfied_uniforms(object_globals, self.globals);
        let mut supplied = Vec::new();
        if !pending.is_empty() {
            let mut list = UnsatisfiedUniforms::new(&object_name, pass.name(), pending);

            let mut hooks = std::mem::take(&mut pass.uniform_hooks);
            let ran = guarded("object uniform hook", || {
                for hook in &mut hooks {
                    if list.is_empty() {
                        break;
                    }
                    hook(
                        &mut ObjectHookContext {
                            object: &object_name,
                            pass: pass.name(),
                            program: pass.program(),
                            vbo: pass.vbo(),
                            ibo: pass.ibo(),
                            object_metadata,
                            pass_metadata: pass.metadata(),
                            globals: self.globals,
                            backend: &mut *self.backend,
                        },
                        &mut list,
                    );
                }
            });
            pass.uniform_hooks = hooks;
            ran?;

            if !list.is_empty()
                && let Some(callback) = callback.as_deref_mut()
            {
                guarded("unsatisfied-uniform callback", || callback(&mut list))?;
            }

            if !list.is_empty() {
                let names: Vec<&str> = list.pending().iter().map(|u| u.name.as_str()).collect();
                self.logger.error(&format!(
                    "skipping '{object_name}'/'{}': unsatisfied uniforms [{}]",
                    pass.name(),
                    names.join(", ")
                ));
                self.stats.draws_skipped += 1;
                return Ok(DrawOutcome::Skipped {
                    unsatisfied: list.len(),
                });
            }

            supplied = list.into_supplied();
        }

        let program = pass.program();

        for uniform in program.uniforms() {
            let value = pass
                .resolve(&uniform.name, object_globals, self.globals)
                .or_else(|| {
                    supplied
                        .iter()
                        .find(|(u, _)| u.name == uniform.name)
                        .map(|(_, v)| v)
                });
            let Some(value) = value else {
                // Dismissed by a hook or callback that set it itself.
                continue;
            };
            if value.uniform_type() != uniform.ty {
                return Err(StrataError::UniformTypeMismatch {
                    uniform: uniform.name.clone(),
                    expected: uniform.ty,
                    actual: value.uniform_type(),
                });
            }
            self.backend.set_uniform(uniform.location, value);
        }

        if let Some(state) = pass.gpu_state() {
            self.backend.apply_gpu_state(state);
        }

        let vbo = pass.vbo();
        let ibo = pass.ibo();
        self.backend.bind_buffer(BufferKind::Vertex, vbo.gpu_id());
        self.backend.bind_buffer(BufferKind::Index, ibo.gpu_id());

        let capabilities = self.backend.capabilities();
        let layout = vbo.layout();
        let stride = layout.stride();
        let mut enabled = Vec::new();
        for (attribute, offset) in layout.iter_with_offsets() {
            if !program.has_attribute(&attribute.name) {
                continue;
            }
            let data_type = match attribute.data_type {
                DataType::HalfFloat if !capabilities.half_float_attributes => {
                    self.logger.warning(&format!(
                        "attribute '{}': half floats unsupported, using Float",
                        attribute.name
                    ));
                    DataType::Float
                }
                DataType::Double if !capabilities.double_attributes => {
                    self.logger.warning(&format!(
                        "attribute '{}': doubles unsupported, using Float",
                        attribute.name
                    ));
                    DataType::Float
                }
                other => other,
            };
            self.backend.enable_attribute(
                gpu_program,
                &AttributeBinding {
                    name: &attribute.name,
                    components: attribute.components,
                    data_type,
                    normalize: attribute.normalize,
                    stride,
                    offset,
                },
            );
            enabled.push(attribute.name.as_str());
        }

        self.backend.draw_elements(pass.primitive(), ibo.index_count(), ibo.index_type());

        for name in enabled {
            self.backend.disable_attribute(gpu_program, name);
        }
        if pass.gpu_state().is_some() {
            self.backend.apply_gpu_state(self.default_state);
        }

        self.stats.draws_issued += 1;
        Ok(DrawOutcome::Drawn)
    }
}
