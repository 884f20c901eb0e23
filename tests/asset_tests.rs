//! SCR5 Asset Tests
//!
//! Tests for:
//! - Decoding a single-mesh stream into VBO/IBO bytes
//! - Loading from disk
//! - Feeding loaded buffers straight into the engine

use glam::{Mat4, Vec3, Vec4};

use strata::assets::{SCR5_VERTEX_STRIDE, Scr5MeshRef, load_scr5_file, write_scr5_asset};
use strata::{
    DataType, Engine, HeadlessBackend, HeadlessSurface, IndexType, ObjectPassDescriptor,
    PrimitiveType, RendererSettings, ShaderStageKind, UniformType, load_scr5_asset,
};

fn triangle() -> Vec<(Vec3, Vec3)> {
    vec![
        (Vec3::new(1.0, 0.0, 0.0), Vec3::Z),
        (Vec3::new(0.0, 1.0, 0.0), Vec3::Z),
        (Vec3::new(0.0, 0.0, 0.0), Vec3::Z),
    ]
}

fn encoded_triangle() -> anyhow::Result<Vec<u8>> {
    let vertices = triangle();
    let mut bytes = Vec::new();
    write_scr5_asset(
        &mut bytes,
        &[Scr5MeshRef {
            vertices: &vertices,
            triangles: &[[0, 1, 2]],
        }],
    )?;
    Ok(bytes)
}

// ============================================================================
// Decoding
// ============================================================================

#[test]
fn single_mesh_decodes_exactly() -> anyhow::Result<()> {
    let bytes = encoded_triangle()?;
    assert_eq!(&bytes[..4], b"SCR5");

    let mesh = load_scr5_asset(&mut bytes.as_slice())?;
    assert_eq!(mesh.triangle_count, 1);
    assert_eq!(mesh.vbo.len(), 3 * SCR5_VERTEX_STRIDE);
    assert_eq!(mesh.ibo.len(), 3 * 2);

    let floats: Vec<f32> = bytemuck::pod_collect_to_vec(&mesh.vbo);
    let expected: Vec<f32> = triangle()
        .into_iter()
        .flat_map(|(p, n)| p.to_array().into_iter().chain(n.to_array()))
        .collect();
    assert_eq!(floats, expected);

    let indices: Vec<u16> = bytemuck::pod_collect_to_vec(&mesh.ibo);
    assert_eq!(indices, [0, 1, 2]);
    Ok(())
}

#[test]
fn loads_from_disk() -> anyhow::Result<()> {
    let path = std::env::temp_dir().join(format!("strata-{}-triangle.scr5", std::process::id()));
    std::fs::write(&path, encoded_triangle()?)?;

    let mesh = load_scr5_file(&path);
    std::fs::remove_file(&path)?;
    let mesh = mesh?;
    assert_eq!(mesh.vertex_count(), 3);
    assert_eq!(mesh.index_count(), 3);
    Ok(())
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_scr5_file("/nonexistent/strata/mesh.scr5").unwrap_err();
    assert!(matches!(err, strata::StrataError::Io(_)));
}

// ============================================================================
// Engine Integration
// ============================================================================

#[test]
fn loaded_mesh_renders() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let backend = HeadlessBackend::new()
        .with_shader(
            "DirPhong.vsh",
            &[("uProjIVObject", UniformType::Mat4)],
            &["aPos", "aNormal"],
        )
        .with_shader("DirPhong.fsh", &[("uColor", UniformType::Vec4)], &[]);
    let log = backend.log();
    let engine = Engine::new(backend, HeadlessSurface::new(), RendererSettings::default())?;

    let mesh = load_scr5_asset(&mut encoded_triangle()?.as_slice())?;

    engine.add_shader_attribute("aPos", 3, false, 12, DataType::Float)?;
    engine.add_shader_attribute("aNormal", 3, false, 12, DataType::Float)?;
    engine.add_persistent_shader(
        "DirPhong",
        [
            ("DirPhong.vsh", ShaderStageKind::Vertex),
            ("DirPhong.fsh", ShaderStageKind::Fragment),
        ],
    )?;
    engine.add_vbo("mesh", mesh.vbo, &["aPos", "aNormal"])?;
    engine.add_ibo("mesh", mesh.ibo, IndexType::U16)?;
    engine.add_object("mesh")?;
    engine.add_pass_to_object(ObjectPassDescriptor::new(
        "mesh",
        "DirPhong",
        "mesh",
        "mesh",
        PrimitiveType::Triangles,
    ))?;
    engine.add_global_uniform("uProjIVObject", Mat4::IDENTITY)?;
    engine.add_object_global_uniform("mesh", "uColor", Vec4::ONE)?;

    assert!(engine.do_frame()?);
    let log = log.lock();
    let draw = log.last_draw().expect("mesh drawn");
    assert_eq!(draw.count, 3 * mesh.triangle_count);
    let normal = draw
        .attributes
        .iter()
        .find(|a| a.name == "aNormal")
        .expect("normals bound");
    assert_eq!((normal.offset, normal.stride), (12, SCR5_VERTEX_STRIDE));
    Ok(())
}
