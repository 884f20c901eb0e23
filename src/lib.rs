#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Strata
//!
//! A cross-thread rendering façade. Client threads describe a scene as named
//! objects, each with one or more passes (shader + VBO + IBO + topology) and
//! uniform bindings; a dedicated render thread owns the graphics context,
//! drains queued mutations each frame and renders every registry pass in
//! order.

pub mod app;
pub mod assets;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod renderer;
pub mod resources;
pub mod scene;

pub use app::LifecycleState;
pub use assets::{Scr5Mesh, load_scr5_asset};
pub use engine::Engine;
pub use errors::{ErrorKind, Result, StrataError};
pub use logging::{LogLevel, LogSink, LoggingConfig, init_logging};
pub use renderer::{
    DEFAULT_PASS, DrawOutcome, FrameStats, GraphicsBackend, HeadlessBackend, HeadlessSurface,
    RedrawPolicy, RenderContext, RenderSurface, RendererSettings, UnsatisfiedUniforms,
};
pub use resources::{
    DataType, GpuState, IndexType, PrimitiveType, ShaderStage, ShaderStageKind, UniformType,
    UniformValue,
};
pub use scene::ObjectPassDescriptor;
