//! Frame Driver Tests
//!
//! Tests for:
//! - Registry order (front/back insertion) and per-pass membership
//! - Hook order: begin-all, pre, members, post, end-all
//! - Framebuffer incomplete: nothing drawn, frame counted as skipped
//! - Per-pass failure isolation, including panicking hooks
//! - Object render hooks, GPU state application and restore
//! - Sub-pass draw order, attribute binding and type substitution
//! - begin_frame / end_frame surface calls

use std::sync::Arc;

use glam::{Mat4, Vec4};
use parking_lot::Mutex;

use strata::renderer::headless::{HeadlessLog, SurfaceLog};
use strata::renderer::hooks::PassHookContext;
use strata::{
    DEFAULT_PASS, DataType, DrawOutcome, Engine, GpuState, HeadlessBackend, HeadlessSurface,
    IndexType, ObjectPassDescriptor, PrimitiveType, RenderContext, RendererSettings,
    ShaderStageKind, StrataError, UniformType, UniformValue,
};

type Events = Arc<Mutex<Vec<String>>>;

struct Fixture {
    engine: Engine,
    log: Arc<Mutex<HeadlessLog>>,
    surface: Arc<Mutex<SurfaceLog>>,
}

fn fixture() -> anyhow::Result<Fixture> {
    let _ = env_logger::builder().is_test(true).try_init();

    let backend = HeadlessBackend::new()
        .with_shader("Flat.vsh", &[("uColor", UniformType::Vec4)], &["aPos"])
        .with_shader("Flat.fsh", &[], &[])
        .with_shader("Field.vsh", &[], &["aPos", "aFieldData"]);
    let log = backend.log();
    let surface = HeadlessSurface::new();
    let surface_log = surface.log();
    let engine = Engine::new(backend, surface, RendererSettings::default())?;

    engine.add_shader_attribute("aPos", 3, false, 12, DataType::Float)?;
    engine.add_shader_attribute("aFieldData", 1, false, 2, DataType::HalfFloat)?;
    engine.add_persistent_shader(
        "Flat",
        [
            ("Flat.vsh", ShaderStageKind::Vertex),
            ("Flat.fsh", ShaderStageKind::Fragment),
        ],
    )?;
    engine.add_vbo("tri", bytemuck::cast_slice(&[0.0f32; 9]).to_vec(), &["aPos"])?;
    engine.add_ibo("tri", bytemuck::cast_slice(&[0u16, 1, 2]).to_vec(), IndexType::U16)?;
    engine.add_global_uniform("uColor", Vec4::ONE)?;

    Ok(Fixture {
        engine,
        log,
        surface: surface_log,
    })
}

fn flat(object: &str) -> ObjectPassDescriptor {
    ObjectPassDescriptor::new(object, "Flat", "tri", "tri", PrimitiveType::Triangles)
}

/// Tags each draw with the object color so the order is observable.
fn add_tagged(engine: &Engine, object: &str, pass: &str, tag: f32) -> anyhow::Result<()> {
    if !engine.has_object(object) {
        engine.add_object(object)?;
    }
    engine.add_pass_to_object(flat(object).in_pass(pass))?;
    engine.add_object_pass_uniform(object, pass, "uColor", Vec4::splat(tag))?;
    Ok(())
}

fn recorder(
    events: &Events,
    label: &'static str,
) -> impl FnMut(&mut PassHookContext<'_>) + Send + 'static {
    let events = Arc::clone(events);
    move |ctx| {
        let pass = ctx.pass.unwrap_or("-");
        events.lock().push(format!("{label}:{pass}"));
    }
}

fn drawn_tags(log: &Mutex<HeadlessLog>) -> Vec<f32> {
    log.lock()
        .draws
        .iter()
        .filter_map(|d| match d.uniforms.get("uColor") {
            Some(UniformValue::Vec4(v)) => Some(v.x),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Registry Order
// ============================================================================

#[test]
fn passes_render_in_registry_order() -> anyhow::Result<()> {
    let fx = fixture()?;
    fx.engine.add_pass_to_back("pass2")?;
    fx.engine.add_pass_to_front("pass1")?;
    fx.engine.add_pass_to_back("pass3")?;

    add_tagged(&fx.engine, "a", "pass3", 3.0)?;
    add_tagged(&fx.engine, "b", DEFAULT_PASS, 0.0)?;
    add_tagged(&fx.engine, "c", "pass1", 1.0)?;
    add_tagged(&fx.engine, "d", "pass2", 2.0)?;

    let order: Vec<String> = fx
        .engine
        .inspect(|ctx| ctx.passes().names().map(str::to_string).collect());
    assert_eq!(order, ["pass1", DEFAULT_PASS, "pass2", "pass3"]);

    assert!(fx.engine.do_frame()?);
    assert_eq!(drawn_tags(&fx.log), [1.0, 0.0, 2.0, 3.0]);
    Ok(())
}

#[test]
fn objects_render_in_join_order_within_a_pass() -> anyhow::Result<()> {
    let fx = fixture()?;
    add_tagged(&fx.engine, "z", DEFAULT_PASS, 1.0)?;
    add_tagged(&fx.engine, "a", DEFAULT_PASS, 2.0)?;
    add_tagged(&fx.engine, "m", DEFAULT_PASS, 3.0)?;

    fx.engine.do_frame()?;
    assert_eq!(drawn_tags(&fx.log), [1.0, 2.0, 3.0]);
    Ok(())
}

#[test]
fn removed_registry_pass_stops_rendering() -> anyhow::Result<()> {
    let fx = fixture()?;
    fx.engine.add_pass_to_back("pass1")?;
    add_tagged(&fx.engine, "obj1", "pass1", 1.0)?;

    fx.engine.remove_pass("pass1")?;
    fx.engine.do_frame()?;
    assert!(fx.log.lock().draws.is_empty());

    // The object keeps its pass.
    fx.engine.inspect(|ctx| {
        assert!(ctx.object("obj1").unwrap().has_pass("pass1"));
    });
    Ok(())
}

// ============================================================================
// Hooks
// ============================================================================

#[test]
fn hooks_run_in_documented_order() -> anyhow::Result<()> {
    let fx = fixture()?;
    let events: Events = Arc::default();
    fx.engine.add_pass_to_back("pass1")?;
    fx.engine.add_object("obj1")?;
    fx.engine.add_pass_to_object(flat("obj1").in_pass("pass1"))?;

    fx.engine.add_end_all_passes_hook(recorder(&events, "end"))?;
    fx.engine.add_begin_all_passes_hook(recorder(&events, "begin"))?;
    fx.engine.add_pre_pass_hook("pass1", recorder(&events, "pre"))?;
    fx.engine.add_post_pass_hook("pass1", recorder(&events, "post"))?;
    fx.engine.add_pre_pass_hook("pass1", recorder(&events, "pre2"))?;

    let draws = Arc::clone(&events);
    fx.engine.add_object_render_hook("obj1", "pass1", move |ctx| {
        draws.lock().push(format!("draw:{}", ctx.object));
    })?;

    fx.engine.do_frame()?;
    assert_eq!(
        *events.lock(),
        [
            "begin:-",
            "pre:pass1",
            "pre2:pass1",
            "draw:obj1",
            "post:pass1",
            "end:-",
        ]
    );
    Ok(())
}

#[test]
fn object_hooks_and_callback_count_as_hooks() -> anyhow::Result<()> {
    let fx = fixture()?;
    add_tagged(&fx.engine, "obj1", DEFAULT_PASS, 1.0)?;
    assert!(!fx.engine.inspect(RenderContext::has_hooks));

    fx.engine.add_object_uniform_hook("obj1", DEFAULT_PASS, |_, _| {})?;
    assert!(fx.engine.inspect(RenderContext::has_hooks));

    fx.engine.remove_object("obj1")?;
    assert!(!fx.engine.inspect(RenderContext::has_hooks));

    fx.engine.set_unsatisfied_uniform_callback(|_| {})?;
    assert!(fx.engine.inspect(RenderContext::has_hooks));
    Ok(())
}

#[test]
fn pass_hooks_require_an_existing_pass() {
    let fx = fixture().unwrap();
    assert!(fx.engine.add_pre_pass_hook("nope", |_| {}).is_err());
    assert!(fx.engine.add_post_pass_hook("nope", |_| {}).is_err());
}

#[test]
fn render_hook_replaces_the_builtin_draw() -> anyhow::Result<()> {
    let fx = fixture()?;
    fx.engine.add_object("obj1")?;
    fx.engine.add_pass_to_object(flat("obj1"))?;
    fx.engine.add_object_pass_metadata("obj1", DEFAULT_PASS, "layer", 7i32)?;

    let seen: Arc<Mutex<Option<(String, usize, UniformValue)>>> = Arc::default();
    let sink = Arc::clone(&seen);
    fx.engine
        .add_object_render_hook("obj1", DEFAULT_PASS, move |ctx| {
            let layer = ctx.pass_metadata.get("layer").copied();
            if let Some(layer) = layer {
                *sink.lock() = Some((ctx.program.name().to_string(), ctx.ibo.index_count(), layer));
            }
        })?;

    fx.engine.do_frame()?;
    assert!(fx.log.lock().draws.is_empty());
    assert_eq!(
        *seen.lock(),
        Some(("Flat".to_string(), 3, UniformValue::Int(7)))
    );
    assert_eq!(fx.engine.stats().draws_hooked, 1);

    let outcome = fx.engine.render_object("obj1", DEFAULT_PASS, None)?;
    assert_eq!(outcome, DrawOutcome::Hooked);
    Ok(())
}

// ============================================================================
// Frame Skipping & Failure Isolation
// ============================================================================

#[test]
fn incomplete_framebuffer_skips_the_frame() -> anyhow::Result<()> {
    let fx = fixture()?;
    add_tagged(&fx.engine, "obj1", DEFAULT_PASS, 1.0)?;
    fx.log.lock().framebuffer_complete = false;

    assert!(matches!(
        fx.engine.check_framebuffer(),
        Err(StrataError::FramebufferIncomplete)
    ));
    assert!(!fx.engine.do_frame()?);
    {
        let log = fx.log.lock();
        assert!(log.draws.is_empty());
        assert_eq!(log.clears, 0);
    }
    assert!(fx.surface.lock().swaps.is_empty());
    assert_eq!(fx.engine.stats().frames_skipped, 1);

    fx.log.lock().framebuffer_complete = true;
    fx.engine.check_framebuffer()?;
    assert!(fx.engine.do_frame()?);
    assert_eq!(fx.log.lock().draws.len(), 1);
    assert_eq!(fx.surface.lock().swaps.len(), 1);
    Ok(())
}

#[test]
fn failing_pass_does_not_abort_the_frame() -> anyhow::Result<()> {
    let fx = fixture()?;
    fx.engine.add_pass_to_back("pass1")?;
    fx.engine.add_pass_to_back("pass2")?;
    add_tagged(&fx.engine, "ok1", "pass1", 1.0)?;
    add_tagged(&fx.engine, "bad", "pass2", 2.0)?;
    add_tagged(&fx.engine, "ok2", DEFAULT_PASS, 0.0)?;

    // "bad" reads uColor from the system tier, which has the wrong type.
    fx.engine.remove_object_pass_uniform("bad", "pass2", "uColor")?;
    fx.engine.remove_global_uniform("uColor")?;
    fx.engine.add_global_uniform("uColor", Mat4::IDENTITY)?;

    assert!(fx.engine.do_frame()?);
    assert_eq!(drawn_tags(&fx.log), [0.0, 1.0]);
    let stats = fx.engine.stats();
    assert_eq!(stats.passes_failed, 1);
    assert_eq!(stats.draws_issued, 2);
    Ok(())
}

#[test]
fn panicking_hooks_abort_only_their_pass() -> anyhow::Result<()> {
    let fx = fixture()?;
    fx.engine.add_pass_to_back("pass1")?;
    fx.engine.add_pass_to_back("pass2")?;
    add_tagged(&fx.engine, "ok", DEFAULT_PASS, 0.0)?;
    add_tagged(&fx.engine, "hooked", "pass1", 1.0)?;
    add_tagged(&fx.engine, "late", "pass2", 2.0)?;

    fx.engine.add_begin_all_passes_hook(|_| panic!("begin hook failed"))?;
    fx.engine.add_object_render_hook("hooked", "pass1", |_| panic!("render hook failed"))?;
    fx.engine.add_pre_pass_hook("pass2", |_| panic!("pre-pass hook failed"))?;

    assert!(fx.engine.do_frame()?);
    assert_eq!(drawn_tags(&fx.log), [0.0]);
    assert_eq!(fx.engine.stats().passes_failed, 2);
    assert_eq!(fx.surface.lock().swaps.len(), 1);

    // The render hook is still registered and fails again.
    assert!(fx.engine.do_frame()?);
    assert_eq!(fx.engine.stats().passes_failed, 4);

    let err = fx.engine.render_object("hooked", "pass1", None).unwrap_err();
    assert!(matches!(err, StrataError::HookPanicked { .. }));
    Ok(())
}

// ============================================================================
// Draw State
// ============================================================================

#[test]
fn pass_gpu_state_is_applied_then_restored() -> anyhow::Result<()> {
    let fx = fixture()?;
    add_tagged(&fx.engine, "obj1", DEFAULT_PASS, 1.0)?;
    let transparent = GpuState::transparent();
    fx.engine
        .add_object_pass_gpu_state("obj1", DEFAULT_PASS, transparent)?;

    fx.engine.do_frame()?;
    let log = fx.log.lock();
    let draw = log.last_draw().expect("draw issued");
    assert_eq!(draw.gpu_state, Some(transparent));

    let default_state = GpuState::default();
    assert_eq!(
        log.state_applications,
        [default_state, transparent, default_state]
    );
    Ok(())
}

#[test]
fn draw_binds_consumed_attributes() -> anyhow::Result<()> {
    let fx = fixture()?;
    let vertex = [0.0f32; 3];
    let mut data: Vec<u8> = Vec::new();
    for _ in 0..3 {
        data.extend_from_slice(bytemuck::cast_slice(&vertex));
        data.extend_from_slice(&[0, 0]);
    }
    fx.engine.add_vbo("fielded", data, &["aPos", "aFieldData"])?;
    fx.engine.add_object("obj1")?;
    fx.engine.add_pass_to_object(ObjectPassDescriptor::new(
        "obj1",
        "Flat",
        "fielded",
        "tri",
        PrimitiveType::Triangles,
    ))?;

    fx.engine.do_frame()?;
    let log = fx.log.lock();
    let draw = log.last_draw().expect("draw issued");
    assert_eq!(draw.count, 3);
    assert_eq!(draw.index_type, IndexType::U16);
    // Flat only consumes aPos.
    assert_eq!(draw.attributes.len(), 1);
    let pos = &draw.attributes[0];
    assert_eq!(pos.name, "aPos");
    assert_eq!((pos.stride, pos.offset, pos.components), (14, 0, 3));
    Ok(())
}

#[test]
fn half_float_attribute_falls_back_to_float() -> anyhow::Result<()> {
    let fx = fixture()?;
    fx.engine
        .add_persistent_shader("Field", [("Field.vsh", ShaderStageKind::Vertex)])?;
    fx.engine
        .add_vbo("fielded", vec![0u8; 3 * 14], &["aPos", "aFieldData"])?;
    fx.engine.add_object("obj1")?;
    fx.engine.add_pass_to_object(ObjectPassDescriptor::new(
        "obj1",
        "Field",
        "fielded",
        "tri",
        PrimitiveType::Triangles,
    ))?;

    fx.engine.do_frame()?;
    let log = fx.log.lock();
    let draw = log.last_draw().expect("draw issued");
    let field = draw
        .attributes
        .iter()
        .find(|a| a.name == "aFieldData")
        .expect("aFieldData enabled");
    assert_eq!(field.data_type, DataType::Float);
    assert_eq!(field.offset, 12);
    Ok(())
}

#[test]
fn sub_passes_draw_after_their_parent() -> anyhow::Result<()> {
    let fx = fixture()?;
    fx.engine.add_pass_to_back("pass1")?;
    fx.engine.add_object("obj1")?;

    fx.engine
        .add_pass_to_object(flat("obj1").in_pass("outline").with_parent("pass1"))?;
    fx.engine
        .add_object_pass_uniform("obj1", "outline", "uColor", Vec4::splat(2.0))?;
    add_tagged(&fx.engine, "obj1", "pass1", 1.0)?;

    fx.engine.do_frame()?;
    assert_eq!(drawn_tags(&fx.log), [1.0, 2.0]);

    // Only one registry membership despite two passes.
    let members: Vec<String> = fx
        .engine
        .inspect(|ctx| ctx.passes().get("pass1").unwrap().members().to_vec());
    assert_eq!(members, ["obj1"]);
    Ok(())
}

#[test]
fn manual_frame_calls_drive_the_surface() -> anyhow::Result<()> {
    let fx = fixture()?;
    add_tagged(&fx.engine, "obj1", DEFAULT_PASS, 1.0)?;

    assert!(fx.engine.begin_frame(true)?);
    assert!(fx.engine.do_all_passes()?);
    fx.engine.end_frame()?;

    let surface = fx.surface.lock();
    assert_eq!(surface.make_current, [std::thread::current().id()]);
    assert_eq!(surface.swaps.len(), 1);
    assert_eq!(fx.log.lock().clears, 1);
    Ok(())
}
