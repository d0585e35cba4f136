use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("container truncated while reading {field} at byte {offset}: needed {needed} bytes, {available} left")]
    TruncatedInput {
        field: &'static str,
        offset: u64,
        needed: u64,
        available: u64,
    },

    #[error("invalid container counts: min {min_vertices}/{min_indices} exceeds max {max_vertices}/{max_indices} (vertices/indices)")]
    InvalidCounts {
        min_vertices: u32,
        max_vertices: u32,
        min_indices: u32,
        max_indices: u32,
    },

    #[error("corrupt container at collapse {collapse}: {detail}")]
    CorruptContainer { collapse: usize, detail: String },

    #[error("lod level {lod_index} requested but the container only has {available}")]
    LodOutOfRange { lod_index: usize, available: usize },

    #[error("mesh has no vertices or no indices")]
    EmptyMesh,

    #[error("failed to parse obj file: {0}")]
    ObjParse(#[from] tobj::LoadError),

    #[error("failed to find processable mesh data in obj file")]
    NoMeshData,

    #[error("mesh has {0} vertices, 16-bit indices can address at most 65536")]
    TooManyVertices(usize),

    #[error("export format '{0}' is not supported")]
    UnsupportedFormat(String),

    #[error("failed to export mesh: {0}")]
    Export(String),

    #[error("an unsupported operation was attempted: {0}")]
    Unsupported(String),

    #[error("failed to read settings: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("an i/o error occurred: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, ConversionError>;
