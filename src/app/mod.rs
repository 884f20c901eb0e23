//! Client ↔ Render Thread Plumbing
//!
//! - [`command`]: owned mutation messages
//! - [`queue`]: bounded command queue with caller-visible backpressure
//! - [`lifecycle`]: render thread creation, termination and teardown

pub mod command;
pub mod lifecycle;
pub mod queue;

pub use command::Command;
pub use lifecycle::{LifecycleState, RenderThread};
pub use queue::CommandQueue;
