//! Render Thread Tests
//!
//! Tests for:
//! - Lifecycle transitions: NotStarted → Running → Stopped → Running
//! - Command ordering: FIFO execution, equivalence with synchronous mode
//! - Backpressure: QueueFull surfaces to the caller, retry succeeds
//! - Deferred errors: logged through the sink and counted
//! - Teardown: GPU resources released on the render thread, queued
//!   commands discarded, manual frames possible afterwards
//! - Panics: hook panics keep the thread alive, a dead thread is reported
//! - OnChange redraw while object hooks are registered

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use glam::{Mat4, Vec4};
use parking_lot::Mutex;

use strata::renderer::headless::HeadlessLog;
use strata::{
    DEFAULT_PASS, DataType, Engine, HeadlessBackend, HeadlessSurface, IndexType, LifecycleState,
    LogLevel, LogSink, ObjectPassDescriptor, PrimitiveType, RedrawPolicy, RenderSurface,
    RendererSettings, ShaderStageKind, StrataError, UniformType,
};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn backend() -> HeadlessBackend {
    HeadlessBackend::new()
        .with_shader(
            "UniformColor.vsh",
            &[("uProjIVObject", UniformType::Mat4)],
            &["aPos"],
        )
        .with_shader("UniformColor.fsh", &[("uColor", UniformType::Vec4)], &[])
}

fn fast_threaded() -> RendererSettings {
    RendererSettings {
        frame_interval: Duration::from_millis(1),
        ..RendererSettings::threaded()
    }
}

/// The same mutation script, run against any engine.
fn script(engine: &Engine) -> Vec<Result<(), StrataError>> {
    vec![
        engine.add_shader_attribute("aPos", 3, false, 12, DataType::Float),
        engine.add_persistent_shader(
            "UniformColor",
            [
                ("UniformColor.vsh", ShaderStageKind::Vertex),
                ("UniformColor.fsh", ShaderStageKind::Fragment),
            ],
        ),
        engine.add_vbo("vbo1", bytemuck::cast_slice(&[0.0f32; 12]).to_vec(), &["aPos"]),
        engine.add_ibo("ibo1", bytemuck::cast_slice(&[0u16, 1, 2, 3]).to_vec(), IndexType::U16),
        engine.add_pass_to_back("pass1"),
        engine.add_object("obj1"),
        engine.add_object("obj2"),
        engine.add_pass_to_object(ObjectPassDescriptor::new(
            "obj1",
            "UniformColor",
            "vbo1",
            "ibo1",
            PrimitiveType::TriangleStrip,
        )),
        engine.add_pass_to_object(
            ObjectPassDescriptor::new("obj2", "UniformColor", "vbo1", "ibo1", PrimitiveType::Triangles)
                .in_pass("pass1"),
        ),
        engine.add_object_pass_uniform("obj1", DEFAULT_PASS, "uColor", Vec4::ONE),
        engine.add_object_global_uniform("obj2", "uColor", Vec4::ZERO),
        engine.add_global_uniform("uProjIVObject", Mat4::IDENTITY),
        engine.remove_object("obj2"),
        engine.add_object("obj2"),
        engine.remove_vbo("vbo1"),
    ]
}

#[derive(Debug, PartialEq)]
struct Snapshot {
    objects: Vec<(String, Vec<String>)>,
    passes: Vec<(String, Vec<String>)>,
    has_vbo: bool,
    has_ibo: bool,
}

fn snapshot(engine: &Engine) -> Snapshot {
    engine.inspect(|ctx| {
        let mut objects: Vec<(String, Vec<String>)> = ctx
            .objects()
            .iter()
            .map(|o| {
                (
                    o.name().to_string(),
                    o.passes().map(|p| p.name().to_string()).collect(),
                )
            })
            .collect();
        objects.sort();
        Snapshot {
            objects,
            passes: ctx
                .passes()
                .iter()
                .map(|p| (p.name().to_string(), p.members().to_vec()))
                .collect(),
            has_vbo: ctx.vbo("vbo1").is_ok(),
            has_ibo: ctx.ibo("ibo1").is_ok(),
        }
    })
}

fn wait_for_state(engine: &Engine, state: LifecycleState) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if engine.lifecycle_state() == state {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

/// Presents nothing: every swap panics.
struct LostSurface;

impl RenderSurface for LostSurface {
    fn make_current(&self) -> strata::Result<()> {
        Ok(())
    }

    fn swap_buffers(&self) {
        panic!("surface lost");
    }
}

fn sync_with_retry(engine: &Engine) -> anyhow::Result<()> {
    loop {
        match engine.sync() {
            Err(StrataError::QueueFull { .. }) => thread::sleep(Duration::from_millis(1)),
            other => return Ok(other?),
        }
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn lifecycle_transitions() -> anyhow::Result<()> {
    init_logs();
    let engine = Engine::new(backend(), HeadlessSurface::new(), RendererSettings::default())?;
    assert_eq!(engine.lifecycle_state(), LifecycleState::NotStarted);

    engine.create_thread()?;
    assert_eq!(engine.lifecycle_state(), LifecycleState::Running);

    engine.terminate()?;
    assert_eq!(engine.lifecycle_state(), LifecycleState::Stopped);
    // Terminating twice is harmless.
    engine.terminate()?;

    engine.create_thread()?;
    engine.add_object("obj1")?;
    engine.sync()?;
    assert!(engine.has_object("obj1"));
    engine.terminate()?;
    Ok(())
}

#[test]
fn sync_is_immediate_without_a_thread() -> anyhow::Result<()> {
    init_logs();
    let engine = Engine::new(backend(), HeadlessSurface::new(), RendererSettings::default())?;
    engine.sync()?;
    assert_eq!(engine.pending_commands(), 0);
    Ok(())
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn commands_apply_in_fifo_order() -> anyhow::Result<()> {
    init_logs();
    let engine = Engine::new(backend(), HeadlessSurface::new(), fast_threaded())?;

    engine.add_object("a")?;
    engine.remove_object("a")?;
    engine.add_object("a")?;
    engine.add_object("b")?;
    engine.remove_object("b")?;
    engine.sync()?;

    assert!(engine.has_object("a"));
    assert!(!engine.has_object("b"));
    let stats = engine.stats();
    assert_eq!(stats.commands_failed, 0);
    // Five mutations plus the barrier.
    assert_eq!(stats.commands_applied, 6);
    engine.terminate()?;
    Ok(())
}

#[test]
fn threaded_and_synchronous_modes_agree() -> anyhow::Result<()> {
    init_logs();
    let direct = Engine::new(backend(), HeadlessSurface::new(), RendererSettings::default())?;
    let threaded = Engine::new(backend(), HeadlessSurface::new(), fast_threaded())?;

    let direct_results = script(&direct);
    assert!(direct_results.iter().all(Result::is_ok), "{direct_results:?}");

    for result in script(&threaded) {
        result?;
    }
    threaded.sync()?;

    assert_eq!(snapshot(&threaded), snapshot(&direct));
    threaded.terminate()?;
    Ok(())
}

// ============================================================================
// Backpressure & Deferred Errors
// ============================================================================

#[test]
fn full_queue_is_reported_to_the_caller() -> anyhow::Result<()> {
    init_logs();
    let settings = RendererSettings {
        queue_capacity: 2,
        ..fast_threaded()
    };
    let engine = Engine::new(backend(), HeadlessSurface::new(), settings)?;

    // Holding the context keeps the render thread from draining.
    let rejected = engine.inspect(|_| {
        engine.add_object("a").expect("first slot");
        engine.add_object("b").expect("second slot");
        engine.add_object("c").unwrap_err()
    });
    assert!(matches!(rejected, StrataError::QueueFull { capacity: 2 }));

    sync_with_retry(&engine)?;
    engine.add_object("c")?;
    sync_with_retry(&engine)?;
    assert_eq!(engine.num_objects(), 3);
    engine.terminate()?;
    Ok(())
}

#[test]
fn deferred_errors_are_logged_and_counted() -> anyhow::Result<()> {
    init_logs();
    let messages: Arc<Mutex<Vec<(String, LogLevel)>>> = Arc::default();
    let sink_messages = Arc::clone(&messages);
    let sink: LogSink = Arc::new(move |message: &str, level: LogLevel| {
        sink_messages.lock().push((message.to_string(), level));
    });
    let engine =
        Engine::with_log_sink(backend(), HeadlessSurface::new(), fast_threaded(), sink)?;

    engine.add_object("obj1")?;
    // Accepted by the queue; fails on the render thread.
    engine.add_object("obj1")?;
    engine.remove_vbo("missing")?;
    engine.sync()?;

    assert_eq!(engine.stats().commands_failed, 2);
    let messages = messages.lock();
    let errors: Vec<&str> = messages
        .iter()
        .filter(|(_, level)| *level == LogLevel::Error)
        .map(|(m, _)| m.as_str())
        .collect();
    assert_eq!(errors.len(), 2);
    assert!(errors[0].contains("add_object"));
    assert!(errors[1].contains("remove_vbo"));
    drop(messages);
    engine.terminate()?;
    Ok(())
}

// ============================================================================
// Teardown
// ============================================================================

#[test]
fn terminate_releases_resources_on_the_render_thread() -> anyhow::Result<()> {
    init_logs();
    let backend = backend();
    let log: Arc<Mutex<HeadlessLog>> = backend.log();
    let surface = HeadlessSurface::new();
    let surface_log = surface.log();
    let engine = Engine::new(backend, surface, fast_threaded())?;

    for result in script(&engine) {
        result?;
    }
    engine.sync()?;
    {
        let log = log.lock();
        assert_eq!(log.live_buffer_count(), 2);
        assert_eq!(log.live_program_count(), 1);
    }

    engine.terminate()?;

    let caller = thread::current().id();
    let log = log.lock();
    assert_eq!(log.live_buffer_count(), 0);
    assert_eq!(log.live_program_count(), 0);
    assert_eq!(log.deleted_buffers.len(), 2);
    assert_eq!(log.gpu_threads.len(), 1);
    assert!(!log.gpu_threads.contains(&caller));

    let surface_log = surface_log.lock();
    assert_eq!(surface_log.make_current.len(), 1);
    assert_ne!(surface_log.make_current[0], caller);
    assert!(!surface_log.swaps.contains(&caller));
    Ok(())
}

#[test]
fn terminate_discards_unexecuted_commands() -> anyhow::Result<()> {
    init_logs();
    let settings = RendererSettings {
        frame_interval: Duration::from_millis(300),
        ..RendererSettings::threaded()
    };
    let engine = Engine::new(backend(), HeadlessSurface::new(), settings)?;

    engine.add_object("early")?;
    engine.sync()?;
    // The render thread is now sleeping out its frame interval.
    engine.add_object("late")?;
    engine.terminate()?;

    // "early" and the barrier ran; "late" never did.
    assert_eq!(engine.stats().commands_applied, 2);
    assert_eq!(engine.pending_commands(), 0);
    // Teardown released everything, objects included.
    assert_eq!(engine.num_objects(), 0);
    Ok(())
}

#[test]
fn frames_can_be_driven_manually_after_terminate() -> anyhow::Result<()> {
    init_logs();
    let backend = backend();
    let log = backend.log();
    let surface = HeadlessSurface::new();
    let surface_log = surface.log();
    let engine = Engine::new(backend, surface, fast_threaded())?;
    engine.terminate()?;

    // Calls are synchronous again: errors come back directly.
    for result in script(&engine) {
        result?;
    }
    assert!(matches!(
        engine.add_object("obj1"),
        Err(StrataError::DuplicateObject(_))
    ));

    assert!(engine.begin_frame(true)?);
    assert!(engine.do_all_passes()?);
    engine.end_frame()?;

    let caller = thread::current().id();
    assert_eq!(surface_log.lock().make_current.last(), Some(&caller));
    assert!(log.lock().gpu_threads.contains(&caller));
    assert_eq!(log.lock().draws_with("UniformColor").count(), 1);
    Ok(())
}

// ============================================================================
// Panics & Redraw Policy
// ============================================================================

#[test]
fn panicking_hook_keeps_the_render_thread_alive() -> anyhow::Result<()> {
    init_logs();
    let engine = Engine::new(backend(), HeadlessSurface::new(), fast_threaded())?;
    engine.add_pre_pass_hook(DEFAULT_PASS, |_| panic!("pre-pass hook failed"))?;
    // The second barrier drains only after a frame ran the hook.
    sync_with_retry(&engine)?;
    sync_with_retry(&engine)?;

    assert_eq!(engine.lifecycle_state(), LifecycleState::Running);
    assert!(engine.stats().passes_failed >= 1);

    engine.add_object("obj1")?;
    sync_with_retry(&engine)?;
    assert!(engine.has_object("obj1"));
    engine.terminate()?;
    Ok(())
}

#[test]
fn dead_render_thread_is_reported() -> anyhow::Result<()> {
    init_logs();
    let backend = backend();
    let log = backend.log();
    let settings = RendererSettings {
        frame_interval: Duration::from_millis(1),
        ..RendererSettings::default()
    };
    let engine = Engine::new(backend, LostSurface, settings)?;
    engine.add_shader_attribute("aPos", 3, false, 12, DataType::Float)?;
    engine.add_vbo("vbo1", bytemuck::cast_slice(&[0.0f32; 9]).to_vec(), &["aPos"])?;
    engine.add_object("obj1")?;

    engine.create_thread()?;
    assert!(wait_for_state(&engine, LifecycleState::Stopped));

    assert!(matches!(engine.sync(), Err(StrataError::RenderThreadPanicked)));
    assert!(matches!(
        engine.add_object("obj2"),
        Err(StrataError::RenderThreadPanicked)
    ));
    assert!(matches!(engine.do_frame(), Err(StrataError::RenderThreadPanicked)));

    // Teardown still ran before the thread exited.
    assert_eq!(engine.num_objects(), 0);
    assert_eq!(log.lock().live_buffer_count(), 0);

    assert!(matches!(
        engine.terminate(),
        Err(StrataError::RenderThreadPanicked)
    ));
    assert_eq!(engine.lifecycle_state(), LifecycleState::Stopped);
    engine.add_object("obj2")?;
    assert!(engine.has_object("obj2"));
    Ok(())
}

#[test]
fn on_change_redraws_while_object_hooks_exist() -> anyhow::Result<()> {
    init_logs();
    let settings = RendererSettings {
        redraw: RedrawPolicy::OnChange,
        ..fast_threaded()
    };
    let engine = Engine::new(backend(), HeadlessSurface::new(), settings)?;
    for result in script(&engine) {
        result?;
    }

    let frames = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&frames);
    engine.add_object_render_hook("obj1", DEFAULT_PASS, move |_| {
        counter.fetch_add(1, Ordering::Relaxed);
    })?;
    sync_with_retry(&engine)?;

    let after_sync = frames.load(Ordering::Relaxed);
    thread::sleep(Duration::from_millis(100));
    assert!(frames.load(Ordering::Relaxed) > after_sync + 2);
    engine.terminate()?;
    Ok(())
}
