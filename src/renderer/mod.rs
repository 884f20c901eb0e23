//! Renderer
//!
//! Render-thread state and the per-frame driver:
//! - [`backend`]: graphics backend and surface traits
//! - [`headless`]: recording backend for tests and tools
//! - [`context`]: [`RenderContext`], owner of all render-thread state
//! - [`frame`]: `begin_frame` / `do_all_passes` / `end_frame`
//! - [`pass_registry`]: ordered registry passes and their hooks
//! - [`hooks`]: hook signatures and the unsatisfied-uniform contract
//! - [`settings`]: [`RendererSettings`]

pub mod backend;
pub mod context;
pub mod frame;
pub mod headless;
pub mod hooks;
pub mod pass_registry;
pub mod settings;

pub use backend::{BackendCapabilities, GraphicsBackend, RenderSurface};
pub use context::RenderContext;
pub use frame::{DrawOutcome, FrameStats};
pub use headless::{HeadlessBackend, HeadlessLog, HeadlessSurface};
pub use hooks::{UnsatisfiedUniform, UnsatisfiedUniforms};
pub use pass_registry::{DEFAULT_PASS, PassRegistry};
pub use settings::{RedrawPolicy, RendererSettings};
