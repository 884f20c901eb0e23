//! Renderer Settings
//!
//! Configuration for the render context and the optional render thread.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use strata::{RendererSettings, RedrawPolicy};
//!
//! // Default: synchronous mode, continuous redraw
//! let settings = RendererSettings::default();
//!
//! // Threaded mode with a larger queue, redrawing only after mutations
//! let settings = RendererSettings {
//!     threaded: true,
//!     queue_capacity: 1024,
//!     redraw: RedrawPolicy::OnChange,
//!     ..Default::default()
//! };
//! ```

use std::path::PathBuf;
use std::time::Duration;

use crate::resources::gpu_state::GpuState;

// ---------------------------------------------------------------------------
// RedrawPolicy
// ---------------------------------------------------------------------------

/// When the render thread draws a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedrawPolicy {
    /// Render every frame interval.
    #[default]
    Continuous,
    /// Render only after a command changed state, or while hooks are
    /// registered (hooks may draw time-dependent content).
    OnChange,
}

// ---------------------------------------------------------------------------
// RendererSettings
// ---------------------------------------------------------------------------

/// Global configuration for a [`crate::Engine`].
#[derive(Debug, Clone, PartialEq)]
pub struct RendererSettings {
    /// Start the render thread as soon as the engine is created.
    ///
    /// When `false`, the thread can still be started later with
    /// [`crate::Engine::create_thread`].
    pub threaded: bool,

    /// Capacity of the client → render thread command queue.
    ///
    /// Enqueueing into a full queue fails with
    /// [`crate::StrataError::QueueFull`]; nothing is buffered beyond this.
    pub queue_capacity: usize,

    /// Pacing of the render thread between frames.
    pub frame_interval: Duration,

    pub redraw: RedrawPolicy,

    /// Color written by the frame-start clear.
    pub clear_color: [f32; 4],

    /// Depth written by the frame-start clear.
    pub clear_depth: f32,

    /// Directories handed to the backend to locate shader sources.
    pub shader_dirs: Vec<PathBuf>,

    /// State applied at the start of every frame, before any pass draws.
    pub default_gpu_state: GpuState,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            threaded: false,
            queue_capacity: 256,
            frame_interval: Duration::from_millis(16),
            redraw: RedrawPolicy::default(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            clear_depth: 1.0,
            shader_dirs: Vec::new(),
            default_gpu_state: GpuState::default(),
        }
    }
}

impl RendererSettings {
    /// Settings with the render thread enabled and everything else default.
    #[must_use]
    pub fn threaded() -> Self {
        Self {
            threaded: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_shader_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.shader_dirs.push(dir.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = RendererSettings::default();
        assert!(!settings.threaded);
        assert_eq!(settings.queue_capacity, 256);
        assert_eq!(settings.redraw, RedrawPolicy::Continuous);
        assert_eq!(settings.clear_depth, 1.0);
    }

    #[test]
    fn builder_helpers() {
        let settings = RendererSettings::threaded().with_shader_dir("shaders");
        assert!(settings.threaded);
        assert_eq!(settings.shader_dirs, [PathBuf::from("shaders")]);
    }
}
