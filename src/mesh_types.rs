use encoding_rs::EUC_KR;

/// Size of one vertex record in the container.
pub const VERTEX_SIZE: usize = 32;
/// Size of one edge collapse record in the container, including the padding after the flag.
pub const EDGE_COLLAPSE_SIZE: usize = 24;
pub const LOD_THRESHOLD_SIZE: usize = 8;
pub const INDEX_SIZE: usize = 2;
pub const INDEX_CHANGE_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Vertex and index buffers with no LOD data attached.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
}

impl FlatMesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeCollapse {
    pub indices_to_lose: u32,
    pub index_changes_count: u32,
    pub vertices_to_lose: u32,
    pub index_changes_offset: u32,
    /// Stored by the producer but not consulted during replay.
    pub collapse_target: i32,
    pub should_collapse: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LodThreshold {
    pub distance: f32,
    pub target_vertex_count: i32,
}

/// In-memory form of a `.n3pmesh` container.
///
/// The vertex and index vectors always hold the full-resolution buffers.
/// LOD reconstruction only rewrites index slots and narrows the active counts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressiveMesh {
    pub name: Vec<u8>,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
    pub collapses: Vec<EdgeCollapse>,
    pub index_changes: Vec<i32>,
    pub lod_thresholds: Vec<LodThreshold>,
    pub min_vertex_count: u32,
    pub min_index_count: u32,
    pub active_vertex_count: usize,
    pub active_index_count: usize,
}

impl ProgressiveMesh {
    /// Builds a LOD-less mesh whose min counts equal its max counts.
    pub fn from_flat(mesh: FlatMesh) -> Self {
        let vertex_count = mesh.vertices.len();
        let index_count = mesh.indices.len();
        Self {
            name: Vec::new(),
            vertices: mesh.vertices,
            indices: mesh.indices,
            collapses: Vec::new(),
            index_changes: Vec::new(),
            lod_thresholds: Vec::new(),
            min_vertex_count: vertex_count as u32,
            min_index_count: index_count as u32,
            active_vertex_count: vertex_count,
            active_index_count: index_count,
        }
    }

    pub fn max_vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn max_index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn has_lod_data(&self) -> bool {
        !self.collapses.is_empty() || !self.index_changes.is_empty() || !self.lod_thresholds.is_empty()
    }

    /// Vertices still referenced after the last reconstruction.
    pub fn active_vertices(&self) -> &[Vertex] {
        &self.vertices[..self.active_vertex_count.min(self.vertices.len())]
    }

    /// Container name, decoded as UTF-8 or else as EUC-KR.
    pub fn display_name(&self) -> String {
        match std::str::from_utf8(&self.name) {
            Ok(name) => name.to_string(),
            Err(_) => {
                let (decoded, _, _) = EUC_KR.decode(&self.name);
                decoded.into_owned()
            }
        }
    }

    pub fn to_flat(&self) -> FlatMesh {
        FlatMesh {
            vertices: self.vertices.clone(),
            indices: self.indices.clone(),
        }
    }
}
