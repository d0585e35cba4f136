use crate::error::{ConversionError, Result};
use crate::mesh_types::{INDEX_SIZE, ProgressiveMesh, VERTEX_SIZE};
use byteorder::{LittleEndian, WriteBytesExt};
use log::{debug, warn};

const HEADER_SIZE: usize = 7 * 4;
const FOOTER_SIZE: usize = 4;

/// Serializes `mesh` as a flattened container: no name, no collapses and no LOD table.
pub fn encode(mesh: &ProgressiveMesh) -> Result<Vec<u8>> {
    if mesh.vertices.is_empty() || mesh.indices.is_empty() {
        return Err(ConversionError::EmptyMesh);
    }

    if mesh.has_lod_data() {
        warn!(
            "dropping {} collapses and {} lod thresholds, containers are always written flattened",
            mesh.collapses.len(),
            mesh.lod_thresholds.len()
        );
    }

    let num_verts = u32::try_from(mesh.vertices.len())
        .map_err(|_| ConversionError::Unsupported("vertex count exceeds u32".to_string()))?;
    let num_indices = u32::try_from(mesh.indices.len())
        .map_err(|_| ConversionError::Unsupported("index count exceeds u32".to_string()))?;

    let mut writer = Vec::with_capacity(
        HEADER_SIZE + mesh.vertices.len() * VERTEX_SIZE + mesh.indices.len() * INDEX_SIZE + FOOTER_SIZE,
    );

    writer.write_u32::<LittleEndian>(0)?; // name length
    writer.write_u32::<LittleEndian>(0)?; // collapses
    writer.write_u32::<LittleEndian>(0)?; // index changes
    writer.write_u32::<LittleEndian>(num_verts)?;
    writer.write_u32::<LittleEndian>(num_indices)?;
    writer.write_u32::<LittleEndian>(num_verts)?;
    writer.write_u32::<LittleEndian>(num_indices)?;

    for vertex in &mesh.vertices {
        writer.write_f32::<LittleEndian>(vertex.pos[0])?;
        writer.write_f32::<LittleEndian>(vertex.pos[1])?;
        writer.write_f32::<LittleEndian>(vertex.pos[2])?;
        writer.write_f32::<LittleEndian>(vertex.normal[0])?;
        writer.write_f32::<LittleEndian>(vertex.normal[1])?;
        writer.write_f32::<LittleEndian>(vertex.normal[2])?;
        writer.write_f32::<LittleEndian>(vertex.uv[0])?;
        writer.write_f32::<LittleEndian>(vertex.uv[1])?;
    }

    for &index in &mesh.indices {
        writer.write_u16::<LittleEndian>(index)?;
    }

    writer.write_u32::<LittleEndian>(0)?; // lod count

    debug!("mesh name: \"\"");
    debug!("collapses          -> 0");
    debug!("total index changes -> 0");
    debug!("max vertices       -> {}", num_verts);
    debug!("max indices        -> {}", num_indices);
    debug!("min vertices       -> {}", num_verts);
    debug!("min indices        -> {}", num_indices);

    Ok(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_types::{EdgeCollapse, FlatMesh, LodThreshold, Vertex};
    use crate::pmesh::decode;

    fn triangle_pair() -> FlatMesh {
        let vertices = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]
            .iter()
            .map(|&[x, y]| Vertex {
                pos: [x, y, -0.5],
                normal: [0.0, 0.0, 1.0],
                uv: [x, 1.0 - y],
            })
            .collect();
        FlatMesh {
            vertices,
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    #[test]
    fn encoded_layout_matches_container_shape() {
        let bytes = encode(&ProgressiveMesh::from_flat(triangle_pair())).unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE + 4 * VERTEX_SIZE + 6 * INDEX_SIZE + FOOTER_SIZE);

        let header: Vec<u32> = bytes[..HEADER_SIZE]
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(header, vec![0, 0, 0, 4, 6, 4, 6]);
        assert_eq!(&bytes[bytes.len() - 4..], &[0, 0, 0, 0]);
    }

    #[test]
    fn round_trip_preserves_buffers() {
        let flat = triangle_pair();
        let bytes = encode(&ProgressiveMesh::from_flat(flat.clone())).unwrap();
        let decoded = decode(&bytes).unwrap();

        assert_eq!(decoded.vertices, flat.vertices);
        assert_eq!(decoded.indices, flat.indices);
        assert_eq!(decoded.min_vertex_count as usize, decoded.max_vertex_count());
        assert_eq!(decoded.min_index_count as usize, decoded.max_index_count());
        assert!(!decoded.has_lod_data());
        assert_eq!(encode(&decoded).unwrap(), bytes);
    }

    #[test]
    fn lod_data_is_flattened_away() {
        let mut mesh = ProgressiveMesh::from_flat(triangle_pair());
        let plain = encode(&mesh).unwrap();

        mesh.name = b"bow".to_vec();
        mesh.collapses.push(EdgeCollapse::default());
        mesh.index_changes.push(0);
        mesh.lod_thresholds.push(LodThreshold::default());
        mesh.min_vertex_count = 1;

        assert_eq!(encode(&mesh).unwrap(), plain);
    }

    #[test]
    fn empty_meshes_are_rejected() {
        let mut flat = triangle_pair();
        flat.indices.clear();
        assert!(matches!(
            encode(&ProgressiveMesh::from_flat(flat)),
            Err(ConversionError::EmptyMesh)
        ));

        let mut flat = triangle_pair();
        flat.vertices.clear();
        assert!(matches!(
            encode(&ProgressiveMesh::from_flat(flat)),
            Err(ConversionError::EmptyMesh)
        ));
    }
}
