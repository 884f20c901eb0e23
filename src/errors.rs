//! Error Types
//!
//! This module defines the error types used throughout the renderer.
//!
//! # Overview
//!
//! The main error type [`StrataError`] covers every failure mode of the
//! façade. Variants fall into a small number of categories, exposed through
//! [`StrataError::kind`]:
//! - Name collisions (objects, buffers, passes, shaders)
//! - Lookup misses
//! - Uniform type mismatches
//! - Context errors (queue backpressure, framebuffer, thread affinity)
//! - Unsupported GPU features
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for `std::result::Result<T, StrataError>`.
//!
//! ```rust,ignore
//! use strata::errors::{ErrorKind, Result};
//!
//! fn add_twice(engine: &strata::Engine) -> Result<()> {
//!     engine.add_object("obj1")?;
//!     match engine.add_object("obj1") {
//!         Err(e) if e.kind() == ErrorKind::Duplicate => Ok(()),
//!         other => other,
//!     }
//! }
//! ```

use thiserror::Error;

use crate::resources::uniforms::UniformType;

/// Coarse error category.
///
/// Lets callers react to a class of failure without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A name is already taken in its namespace.
    Duplicate,
    /// A name lookup failed.
    NotFound,
    /// A uniform was bound with a type different from the established one.
    TypeMismatch,
    /// An argument is structurally invalid (mismatched signature, bad layout).
    InvalidArgument,
    /// The render context cannot service the call right now.
    Context,
    /// The requested feature is not available on the target GPU profile.
    Unsupported,
    /// The graphics backend reported a failure.
    Backend,
    /// Asset decoding failed.
    Asset,
}

/// The main error type for the renderer.
#[derive(Error, Debug)]
pub enum StrataError {
    // ========================================================================
    // Duplicate Names
    // ========================================================================
    /// An object with this name already exists.
    #[error("Duplicate object: {0}")]
    DuplicateObject(String),

    /// A VBO with this name already exists.
    #[error("Duplicate VBO: {0}")]
    DuplicateVbo(String),

    /// An IBO with this name already exists.
    #[error("Duplicate IBO: {0}")]
    DuplicateIbo(String),

    /// A registry pass with this name already exists.
    #[error("Duplicate pass: {0}")]
    DuplicatePass(String),

    /// The object already owns a pass with this name.
    #[error("Object '{object}' already has pass '{pass}'")]
    DuplicateObjectPass {
        /// Object name
        object: String,
        /// Pass name
        pass: String,
    },

    /// An identical persistent shader was already added.
    #[error("Duplicate persistent shader: {0}")]
    DuplicateShader(String),

    // ========================================================================
    // Lookup Errors
    // ========================================================================
    /// The requested object does not exist.
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    /// The requested VBO does not exist.
    #[error("VBO not found: {0}")]
    VboNotFound(String),

    /// The requested IBO does not exist.
    #[error("IBO not found: {0}")]
    IboNotFound(String),

    /// The requested registry pass does not exist.
    #[error("Pass not found: {0}")]
    PassNotFound(String),

    /// The object has no pass with this name.
    #[error("Object '{object}' has no pass '{pass}'")]
    ObjectPassNotFound {
        /// Object name
        object: String,
        /// Pass name
        pass: String,
    },

    /// The requested shader program does not exist.
    #[error("Shader program not found: {0}")]
    ShaderNotFound(String),

    /// The uniform is not bound at the requested scope, or the shader does
    /// not declare it.
    #[error("Uniform '{uniform}' not found in {scope}")]
    UniformNotFound {
        /// Uniform name
        uniform: String,
        /// Where the lookup happened (program, object or global table)
        scope: String,
    },

    /// The shader attribute was never registered.
    #[error("Shader attribute not found: {0}")]
    AttributeNotFound(String),

    // ========================================================================
    // Type Errors
    // ========================================================================
    /// A uniform was bound with a value whose type differs from the
    /// established type. The previous value is retained.
    #[error("Uniform '{uniform}' type mismatch: expected {expected:?}, got {actual:?}")]
    UniformTypeMismatch {
        /// Uniform name
        uniform: String,
        /// Established type
        expected: UniformType,
        /// Rejected type
        actual: UniformType,
    },

    // ========================================================================
    // Invalid Arguments
    // ========================================================================
    /// A persistent shader with the same name but a different stage list
    /// already exists.
    #[error("Shader program '{0}' already exists with a different signature")]
    ShaderSignatureMismatch(String),

    /// The VBO does not provide an attribute consumed by the shader.
    #[error("VBO '{vbo}' does not provide attribute '{attribute}' required by program '{program}'")]
    AttributeMismatch {
        /// VBO name
        vbo: String,
        /// Program name
        program: String,
        /// Missing attribute name
        attribute: String,
    },

    /// The default pass can never be removed.
    #[error("The default pass cannot be removed")]
    DefaultPassRemoval,

    /// Buffer data does not match its declared element size.
    #[error("Invalid buffer '{name}': {reason}")]
    InvalidBuffer {
        /// Buffer name
        name: String,
        /// What is wrong with the data
        reason: String,
    },

    // ========================================================================
    // Context Errors
    // ========================================================================
    /// The command queue is full. The caller must retry or drop the command.
    #[error("Command queue is full (capacity {capacity})")]
    QueueFull {
        /// Queue capacity
        capacity: usize,
    },

    /// The target framebuffer is incomplete, the frame was skipped.
    #[error("Framebuffer incomplete")]
    FramebufferIncomplete,

    /// A render-thread-only operation was called from the wrong place.
    #[error("Thread affinity violation: {0}")]
    ThreadAffinity(String),

    /// A render thread is already running.
    #[error("Render thread is already running")]
    ThreadAlreadyRunning,

    /// The render thread panicked and could not be joined cleanly.
    #[error("Render thread panicked")]
    RenderThreadPanicked,

    /// The render thread went away while a caller was waiting on it.
    #[error("Render context lost: {0}")]
    ContextLost(String),

    /// User code running inside a frame panicked.
    #[error("{hook} panicked: {message}")]
    HookPanicked {
        /// Which callback was running
        hook: String,
        /// Panic payload, if it was a string
        message: String,
    },

    // ========================================================================
    // Unsupported Features
    // ========================================================================
    /// The shader stage is not supported by the target profile.
    #[error("Unsupported shader stage: {0}")]
    UnsupportedShaderStage(String),

    // ========================================================================
    // Backend Errors
    // ========================================================================
    /// Shader compilation or linking failed.
    #[error("Shader compile error in '{program}': {message}")]
    ShaderCompile {
        /// Program name
        program: String,
        /// Backend message
        message: String,
    },

    /// Generic backend failure.
    #[error("Backend error: {0}")]
    Backend(String),

    // ========================================================================
    // Asset Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The asset stream is malformed.
    #[error("Asset format error: {0}")]
    AssetFormat(String),
}

impl StrataError {
    /// Returns the coarse category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateObject(_)
            | Self::DuplicateVbo(_)
            | Self::DuplicateIbo(_)
            | Self::DuplicatePass(_)
            | Self::DuplicateObjectPass { .. }
            | Self::DuplicateShader(_) => ErrorKind::Duplicate,

            Self::ObjectNotFound(_)
            | Self::VboNotFound(_)
            | Self::IboNotFound(_)
            | Self::PassNotFound(_)
            | Self::ObjectPassNotFound { .. }
            | Self::ShaderNotFound(_)
            | Self::UniformNotFound { .. }
            | Self::AttributeNotFound(_) => ErrorKind::NotFound,

            Self::UniformTypeMismatch { .. } => ErrorKind::TypeMismatch,

            Self::ShaderSignatureMismatch(_)
            | Self::AttributeMismatch { .. }
            | Self::DefaultPassRemoval
            | Self::InvalidBuffer { .. } => ErrorKind::InvalidArgument,

            Self::QueueFull { .. }
            | Self::FramebufferIncomplete
            | Self::ThreadAffinity(_)
            | Self::ThreadAlreadyRunning
            | Self::RenderThreadPanicked
            | Self::ContextLost(_)
            | Self::HookPanicked { .. } => ErrorKind::Context,

            Self::UnsupportedShaderStage(_) => ErrorKind::Unsupported,

            Self::ShaderCompile { .. } | Self::Backend(_) => ErrorKind::Backend,

            Self::Io(_) | Self::AssetFormat(_) => ErrorKind::Asset,
        }
    }
}

/// Extracts the message of a caught panic.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

/// Alias for `Result<T, StrataError>`.
pub type Result<T> = std::result::Result<T, StrataError>;
