//! SCR5 Binary Mesh Format
//!
//! Little-endian layout:
//!
//! ```text
//! "SCR5"                       4-byte magic
//! u32  mesh_count
//! per mesh:
//!   u32  vertex_count
//!   vertex_count × { f32 px, py, pz, nx, ny, nz }
//!   u32  face_count
//!   face_count × { u8 3, u16 i0, u16 i1, u16 i2 }
//! ```
//!
//! All meshes of a file are concatenated into a single interleaved
//! position+normal VBO and a single `u16` IBO, ready for
//! [`Engine::add_vbo`](crate::Engine::add_vbo) and
//! [`Engine::add_ibo`](crate::Engine::add_ibo).

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use glam::Vec3;

use crate::errors::{Result, StrataError};

/// File magic.
pub const SCR5_MAGIC: &[u8; 4] = b"SCR5";

/// Floats per vertex: position then normal.
pub const SCR5_VERTEX_FLOATS: usize = 6;

/// Byte stride of one vertex.
pub const SCR5_VERTEX_STRIDE: usize = SCR5_VERTEX_FLOATS * std::mem::size_of::<f32>();

// Keeps a corrupt count from reserving gigabytes up front.
const MAX_PREALLOCATED_ELEMENTS: usize = 1 << 16;

/// Decoded SCR5 contents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scr5Mesh {
    /// Interleaved `[px, py, pz, nx, ny, nz]` little-endian `f32`s.
    pub vbo: Vec<u8>,
    /// Little-endian `u16` triangle indices.
    pub ibo: Vec<u8>,
    pub triangle_count: usize,
}

impl Scr5Mesh {
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vbo.len() / SCR5_VERTEX_STRIDE
    }

    #[must_use]
    pub fn index_count(&self) -> usize {
        self.ibo.len() / std::mem::size_of::<u16>()
    }
}

/// One mesh to encode with [`write_scr5_asset`].
#[derive(Debug, Clone, Copy)]
pub struct Scr5MeshRef<'a> {
    /// `(position, normal)` per vertex.
    pub vertices: &'a [(Vec3, Vec3)],
    pub triangles: &'a [[u16; 3]],
}

/// Parses an SCR5 stream.
pub fn load_scr5_asset<R: Read>(reader: &mut R) -> Result<Scr5Mesh> {
    let mut magic = [0u8; 4];
    read_exact(reader, &mut magic, "header")?;
    if &magic != SCR5_MAGIC {
        return Err(StrataError::AssetFormat(format!(
            "bad magic {magic:?}, expected \"SCR5\""
        )));
    }

    let mesh_count = read_u32(reader, "mesh count")?;
    let mut out = Scr5Mesh::default();
    let mut base_vertex: usize = 0;

    for mesh in 0..mesh_count {
        let vertex_count = read_u32(reader, "vertex count")? as usize;
        out.vbo.reserve(
            vertex_count.min(MAX_PREALLOCATED_ELEMENTS) * SCR5_VERTEX_STRIDE,
        );
        let mut vertex = [0u8; SCR5_VERTEX_STRIDE];
        for _ in 0..vertex_count {
            read_exact(reader, &mut vertex, "vertex data")?;
            out.vbo.extend_from_slice(&vertex);
        }

        let face_count = read_u32(reader, "face count")? as usize;
        out.ibo
            .reserve(face_count.min(MAX_PREALLOCATED_ELEMENTS) * 3 * std::mem::size_of::<u16>());
        for face in 0..face_count {
            let arity = read_u8(reader, "face arity")?;
            if arity != 3 {
                return Err(StrataError::AssetFormat(format!(
                    "mesh {mesh} face {face}: only triangles are supported, found {arity}-gon"
                )));
            }
            for _ in 0..3 {
                let index = usize::from(read_u16(reader, "face index")?);
                if index >= vertex_count {
                    return Err(StrataError::AssetFormat(format!(
                        "mesh {mesh} face {face}: index {index} out of range ({vertex_count} vertices)"
                    )));
                }
                let rebased = u16::try_from(base_vertex + index).map_err(|_| {
                    StrataError::AssetFormat(format!(
                        "mesh {mesh}: combined vertex count exceeds the 16-bit index range"
                    ))
                })?;
                out.ibo.extend_from_slice(&rebased.to_le_bytes());
            }
        }

        base_vertex += vertex_count;
        out.triangle_count += face_count;
    }

    log::debug!(
        target: "strata::assets",
        "loaded SCR5: {mesh_count} meshes, {} vertices, {} triangles",
        out.vertex_count(),
        out.triangle_count
    );
    Ok(out)
}

/// Opens and parses an SCR5 file.
pub fn load_scr5_file(path: impl AsRef<Path>) -> Result<Scr5Mesh> {
    let mut reader = BufReader::new(File::open(path)?);
    load_scr5_asset(&mut reader)
}

/// Encodes meshes as an SCR5 stream.
pub fn write_scr5_asset<W: Write>(writer: &mut W, meshes: &[Scr5MeshRef<'_>]) -> Result<()> {
    writer.write_all(SCR5_MAGIC)?;
    writer.write_all(&count_u32(meshes.len(), "mesh count")?.to_le_bytes())?;
    for mesh in meshes {
        writer.write_all(&count_u32(mesh.vertices.len(), "vertex count")?.to_le_bytes())?;
        for (position, normal) in mesh.vertices {
            for value in position.to_array().into_iter().chain(normal.to_array()) {
                writer.write_all(&value.to_le_bytes())?;
            }
        }
        writer.write_all(&count_u32(mesh.triangles.len(), "face count")?.to_le_bytes())?;
        for triangle in mesh.triangles {
            writer.write_all(&[3])?;
            for index in triangle {
                writer.write_all(&index.to_le_bytes())?;
            }
        }
    }
    Ok(())
}

fn count_u32(count: usize, what: &str) -> Result<u32> {
    u32::try_from(count).map_err(|_| StrataError::AssetFormat(format!("{what} {count} exceeds u32")))
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8], what: &str) -> Result<()> {
    reader.read_exact(buf).map_err(|err| match err.kind() {
        io::ErrorKind::UnexpectedEof => {
            StrataError::AssetFormat(format!("stream truncated while reading {what}"))
        }
        _ => StrataError::Io(err),
    })
}

fn read_u8<R: Read>(reader: &mut R, what: &str) -> Result<u8> {
    let mut buf = [0u8; 1];
    read_exact(reader, &mut buf, what)?;
    Ok(buf[0])
}

fn read_u16<R: Read>(reader: &mut R, what: &str) -> Result<u16> {
    let mut buf = [0u8; 2];
    read_exact(reader, &mut buf, what)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32<R: Read>(reader: &mut R, what: &str) -> Result<u32> {
    let mut buf = [0u8; 4];
    read_exact(reader, &mut buf, what)?;
    Ok(u32::from_le_bytes(buf))
}
