//! Asset Loading
//!
//! Mesh file parsers producing raw VBO/IBO bytes for the engine.

pub mod scr5;

pub use scr5::{
    SCR5_VERTEX_STRIDE, Scr5Mesh, Scr5MeshRef, load_scr5_asset, load_scr5_file, write_scr5_asset,
};
