//! Reader, writer and LOD reconstruction for `.n3pmesh` progressive mesh containers.

pub mod error;
pub mod exporter;
pub mod importer;
pub mod lod;
pub mod mesh_types;
pub mod pmesh;
pub mod ser;
pub mod settings;

pub use error::{ConversionError, Result};
pub use lod::{LodReport, reconstruct};
pub use mesh_types::{EdgeCollapse, FlatMesh, LodThreshold, ProgressiveMesh, Vertex};
pub use pmesh::decode;
pub use ser::encode;
