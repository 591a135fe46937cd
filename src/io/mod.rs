//! File I/O.
//!
//! - PLY splat scenes (ascii and binary)
//! - Thumbnail export (JPEG, or any format `image` infers from the path)

mod ply;
mod thumbnail;

pub use ply::{
    load_splat_ply, read_header, read_splat_ply, Element, LoadError, PlyFormat, PlyHeader,
    Property, PropertyKind, ScalarType, SplatRecord, DEFAULT_SCALE,
};
pub use thumbnail::{save_thumbnail, OutputError, DEFAULT_JPEG_QUALITY};
