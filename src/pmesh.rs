use crate::error::{ConversionError, Result};
use crate::mesh_types::{
    EDGE_COLLAPSE_SIZE, EdgeCollapse, INDEX_CHANGE_SIZE, INDEX_SIZE, LOD_THRESHOLD_SIZE,
    LodThreshold, ProgressiveMesh, VERTEX_SIZE, Vertex,
};
use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;
use std::io::{Cursor, Read};

/// Bounds-checked little-endian reader over a whole container.
///
/// Every read first checks that the declared number of bytes is still
/// available, so short input is reported with the field and offset instead
/// of surfacing as a bare EOF.
struct ContainerReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> ContainerReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { cursor: Cursor::new(data) }
    }

    fn offset(&self) -> u64 {
        self.cursor.position()
    }

    fn remaining(&self) -> u64 {
        (self.cursor.get_ref().len() as u64).saturating_sub(self.cursor.position())
    }

    fn require(&self, field: &'static str, count: u64, size: usize) -> Result<()> {
        let needed = count.saturating_mul(size as u64);
        let available = self.remaining();
        if needed > available {
            return Err(ConversionError::TruncatedInput {
                field,
                offset: self.offset(),
                needed,
                available,
            });
        }
        Ok(())
    }

    fn read_u32(&mut self, field: &'static str) -> Result<u32> {
        self.require(field, 1, 4)?;
        Ok(self.cursor.read_u32::<LittleEndian>()?)
    }

    fn read_bytes(&mut self, field: &'static str, len: usize) -> Result<Vec<u8>> {
        self.require(field, len as u64, 1)?;
        let mut bytes = vec![0u8; len];
        self.cursor.read_exact(&mut bytes)?;
        Ok(bytes)
    }
}

pub fn decode(data: &[u8]) -> Result<ProgressiveMesh> {
    let mut reader = ContainerReader::new(data);

    let name_len = reader.read_u32("name length")?;
    let name = reader.read_bytes("name", name_len as usize)?;

    let num_collapses = reader.read_u32("collapse count")?;
    let total_index_changes = reader.read_u32("index change count")?;
    let max_vertices = reader.read_u32("max vertex count")?;
    let max_indices = reader.read_u32("max index count")?;
    let min_vertices = reader.read_u32("min vertex count")?;
    let min_indices = reader.read_u32("min index count")?;

    if min_vertices > max_vertices || min_indices > max_indices {
        return Err(ConversionError::InvalidCounts {
            min_vertices,
            max_vertices,
            min_indices,
            max_indices,
        });
    }

    let vertices = read_vertices(&mut reader, max_vertices as usize)?;
    let indices = read_indices(&mut reader, max_indices as usize)?;
    let collapses = read_collapses(&mut reader, num_collapses as usize)?;
    let index_changes = read_index_changes(&mut reader, total_index_changes as usize)?;

    let lod_count = reader.read_u32("lod count")?;
    let lod_thresholds = read_lod_thresholds(&mut reader, lod_count as usize)?;

    let mesh = ProgressiveMesh {
        name,
        vertices,
        indices,
        collapses,
        index_changes,
        lod_thresholds,
        min_vertex_count: min_vertices,
        min_index_count: min_indices,
        active_vertex_count: max_vertices as usize,
        active_index_count: max_indices as usize,
    };

    debug!("mesh name: \"{}\"", mesh.display_name());
    debug!("collapses          -> {}", num_collapses);
    debug!("total index changes -> {}", total_index_changes);
    debug!("max vertices       -> {}", max_vertices);
    debug!("max indices        -> {}", max_indices);
    debug!("min vertices       -> {}", min_vertices);
    debug!("min indices        -> {}", min_indices);
    debug!("lod thresholds     -> {}", lod_count);

    if reader.remaining() > 0 {
        debug!(
            "ignoring {} trailing bytes after the lod table at offset {}",
            reader.remaining(),
            reader.offset()
        );
    }

    Ok(mesh)
}

fn read_vertices(reader: &mut ContainerReader, count: usize) -> Result<Vec<Vertex>> {
    reader.require("vertex array", count as u64, VERTEX_SIZE)?;
    let cursor = &mut reader.cursor;
    let mut vertices = Vec::with_capacity(count);

    for _ in 0..count {
        let px = cursor.read_f32::<LittleEndian>()?;
        let py = cursor.read_f32::<LittleEndian>()?;
        let pz = cursor.read_f32::<LittleEndian>()?;
        let nx = cursor.read_f32::<LittleEndian>()?;
        let ny = cursor.read_f32::<LittleEndian>()?;
        let nz = cursor.read_f32::<LittleEndian>()?;
        let u = cursor.read_f32::<LittleEndian>()?;
        let v = cursor.read_f32::<LittleEndian>()?;

        vertices.push(Vertex {
            pos: [px, py, pz],
            normal: [nx, ny, nz],
            uv: [u, v],
        });
    }

    Ok(vertices)
}

fn read_indices(reader: &mut ContainerReader, count: usize) -> Result<Vec<u16>> {
    reader.require("index array", count as u64, INDEX_SIZE)?;
    let mut indices = vec![0u16; count];
    reader.cursor.read_u16_into::<LittleEndian>(&mut indices)?;
    Ok(indices)
}

fn read_collapses(reader: &mut ContainerReader, count: usize) -> Result<Vec<EdgeCollapse>> {
    reader.require("edge collapse records", count as u64, EDGE_COLLAPSE_SIZE)?;
    let cursor = &mut reader.cursor;
    let mut collapses = Vec::with_capacity(count);

    for _ in 0..count {
        let indices_to_lose = cursor.read_u32::<LittleEndian>()?;
        let index_changes_count = cursor.read_u32::<LittleEndian>()?;
        let vertices_to_lose = cursor.read_u32::<LittleEndian>()?;
        let index_changes_offset = cursor.read_u32::<LittleEndian>()?;
        let collapse_target = cursor.read_i32::<LittleEndian>()?;
        let should_collapse = cursor.read_u8()? != 0;
        let mut _padding = [0u8; 3];
        cursor.read_exact(&mut _padding)?;

        collapses.push(EdgeCollapse {
            indices_to_lose,
            index_changes_count,
            vertices_to_lose,
            index_changes_offset,
            collapse_target,
            should_collapse,
        });
    }

    Ok(collapses)
}

fn read_index_changes(reader: &mut ContainerReader, count: usize) -> Result<Vec<i32>> {
    reader.require("index change list", count as u64, INDEX_CHANGE_SIZE)?;
    let mut changes = vec![0i32; count];
    reader.cursor.read_i32_into::<LittleEndian>(&mut changes)?;
    Ok(changes)
}

fn read_lod_thresholds(reader: &mut ContainerReader, count: usize) -> Result<Vec<LodThreshold>> {
    reader.require("lod thresholds", count as u64, LOD_THRESHOLD_SIZE)?;
    let cursor = &mut reader.cursor;
    let mut thresholds = Vec::with_capacity(count);

    for _ in 0..count {
        let distance = cursor.read_f32::<LittleEndian>()?;
        let target_vertex_count = cursor.read_i32::<LittleEndian>()?;
        thresholds.push(LodThreshold {
            distance,
            target_vertex_count,
        });
    }

    Ok(thresholds)
}
