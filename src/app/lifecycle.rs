//! Render-Thread Lifecycle
//!
//! ```text
//! NotStarted ──spawn──► Running ──terminate──► Terminating ──join──► Stopped
//!                          ▲                                            │
//!                          └──────────────────spawn─────────────────────┘
//! ```
//!
//! The render thread makes the surface current once, then loops: drain the
//! command queue, render a frame, present, sleep for the rest of the frame
//! interval. It checks the kill flag between frames. On exit it drops any
//! commands still queued and releases every GPU resource on its own thread
//! before the join completes.
//!
//! A panic that escapes frame rendering stops the loop early. Teardown still
//! runs, and the thread is reported as failed until [`RenderThread::terminate`]
//! joins it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::app::queue::CommandQueue;
use crate::errors::{Result, StrataError, panic_message};
use crate::renderer::context::RenderContext;
use crate::renderer::settings::RedrawPolicy;

/// Where the render thread is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    NotStarted,
    Running,
    Terminating,
    Stopped,
}

/// Owner of the render thread's join handle and kill flag.
#[derive(Debug)]
pub struct RenderThread {
    state: LifecycleState,
    kill: Arc<AtomicBool>,
    /// Set by the thread when its loop has returned, for any reason.
    exited: Arc<AtomicBool>,
    /// Set by the thread when its loop ended on a panic.
    panicked: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Default for RenderThread {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderThread {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: LifecycleState::NotStarted,
            kill: Arc::new(AtomicBool::new(false)),
            exited: Arc::new(AtomicBool::new(false)),
            panicked: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Current state. A thread that died on its own reports `Stopped`.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        if self.has_failed() {
            LifecycleState::Stopped
        } else {
            self.state
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == LifecycleState::Running && !self.exited.load(Ordering::Acquire)
    }

    /// The thread exited without being asked to. Cleared by
    /// [`terminate`](Self::terminate).
    #[must_use]
    pub fn has_failed(&self) -> bool {
        self.state == LifecycleState::Running && self.exited.load(Ordering::Acquire)
    }

    /// Starts the render thread. Fails if one is already running.
    pub fn spawn(&mut self, context: Arc<Mutex<RenderContext>>, queue: CommandQueue) -> Result<()> {
        if self.is_running() {
            return Err(StrataError::ThreadAlreadyRunning);
        }

        let (interval, redraw) = {
            let ctx = context.lock();
            (ctx.settings.frame_interval, ctx.settings.redraw)
        };

        self.kill = Arc::new(AtomicBool::new(false));
        self.exited = Arc::new(AtomicBool::new(false));
        self.panicked = Arc::new(AtomicBool::new(false));
        let kill = Arc::clone(&self.kill);
        let exited = Arc::clone(&self.exited);
        let panicked = Arc::clone(&self.panicked);
        let handle = thread::Builder::new()
            .name("strata-render".to_string())
            .spawn(move || {
                let clean = panic::catch_unwind(AssertUnwindSafe(|| {
                    render_loop(&context, &queue, &kill, interval, redraw)
                }))
                .unwrap_or_else(|payload| {
                    log::error!(
                        target: "strata",
                        "render thread teardown panicked: {}",
                        panic_message(payload.as_ref())
                    );
                    false
                });
                panicked.store(!clean, Ordering::Release);
                exited.store(true, Ordering::Release);
            })?;

        self.handle = Some(handle);
        self.state = LifecycleState::Running;
        log::debug!(target: "strata", "render thread started");
        Ok(())
    }

    /// Stops the render thread and blocks until it has joined.
    ///
    /// Does nothing unless the thread was started. Fails with
    /// [`StrataError::RenderThreadPanicked`] if the thread had died on a
    /// panic; it is joined and `Stopped` either way.
    pub fn terminate(&mut self) -> Result<()> {
        if self.state != LifecycleState::Running {
            return Ok(());
        }

        self.state = LifecycleState::Terminating;
        self.kill.store(true, Ordering::Release);
        let joined = self.handle.take().map_or(Ok(()), JoinHandle::join);
        self.state = LifecycleState::Stopped;

        joined.map_err(|_| StrataError::RenderThreadPanicked)?;
        if self.panicked.load(Ordering::Acquire) {
            return Err(StrataError::RenderThreadPanicked);
        }
        log::debug!(target: "strata", "render thread stopped");
        Ok(())
    }
}

/// Returns `false` if the loop was cut short by a panic.
fn render_loop(
    context: &Mutex<RenderContext>,
    queue: &CommandQueue,
    kill: &AtomicBool,
    interval: Duration,
    redraw: RedrawPolicy,
) -> bool {
    {
        let ctx = context.lock();
        if let Err(err) = ctx.surface.make_current() {
            ctx.logger.error(&format!("render thread cannot make the context current: {err}"));
        }
    }

    let mut first_frame = true;
    let mut failure = None;
    while !kill.load(Ordering::Acquire) {
        let started = Instant::now();
        let frame = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut ctx = context.lock();
            let executed = queue.drain(&mut ctx);

            let should_render = match redraw {
                RedrawPolicy::Continuous => true,
                RedrawPolicy::OnChange => first_frame || executed > 0 || ctx.has_hooks(),
            };
            if should_render {
                ctx.release_pending();
                if ctx.do_all_passes() {
                    ctx.end_frame();
                }
                first_frame = false;
            }
        }));
        if let Err(payload) = frame {
            failure = Some(panic_message(payload.as_ref()));
            break;
        }

        if let Some(remaining) = interval.checked_sub(started.elapsed()) {
            thread::sleep(remaining);
        }
    }

    let mut ctx = context.lock();
    if let Some(message) = &failure {
        ctx.logger.error(&format!("render thread stopped after a panic: {message}"));
    }
    let dropped = queue.discard();
    if dropped > 0 {
        ctx.logger.warning(&format!("render thread stopped with {dropped} commands unexecuted"));
    }
    ctx.clear_gpu_resources();
    failure.is_none()
}
