use crate::error::{ConversionError, Result};
use crate::mesh_types::ProgressiveMesh;
use log::{debug, warn};

/// Outcome of replaying collapses for one LOD level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LodReport {
    pub lod_index: usize,
    pub target_vertex_count: i32,
    /// Collapses applied while the vertex target was not yet met.
    pub threshold_collapses: usize,
    /// Collapses applied afterwards because they were flagged `should_collapse`.
    pub continuation_collapses: usize,
    pub vertex_count: usize,
    pub index_count: usize,
}

impl LodReport {
    pub fn collapses_applied(&self) -> usize {
        self.threshold_collapses + self.continuation_collapses
    }
}

#[derive(Default)]
struct ReplayState {
    cursor: usize,
    vertices_so_far: u64,
    indices_so_far: u64,
}

/// Rewrites the index buffer in place so it describes the mesh at `lod_index`.
///
/// Collapses are replayed in file order until the next one would overshoot
/// the level's target vertex count, then any immediately following collapses
/// flagged `should_collapse` are replayed as well. Every index slot listed by
/// an applied collapse is pointed at the last surviving vertex
/// (`vertices_so_far - 1`). The collapse's own `collapse_target` is not used.
///
/// A mesh without collapses is left untouched. Nothing is allocated and each
/// collapse is fully validated before any of its slots are written.
pub fn reconstruct(mesh: &mut ProgressiveMesh, lod_index: usize) -> Result<LodReport> {
    if mesh.collapses.is_empty() {
        debug!("no collapses recorded, mesh is already at its only resolution");
        return Ok(LodReport {
            lod_index,
            target_vertex_count: mesh.max_vertex_count() as i32,
            threshold_collapses: 0,
            continuation_collapses: 0,
            vertex_count: mesh.max_vertex_count(),
            index_count: mesh.max_index_count(),
        });
    }

    let threshold = *mesh
        .lod_thresholds
        .get(lod_index)
        .ok_or(ConversionError::LodOutOfRange {
            lod_index,
            available: mesh.lod_thresholds.len(),
        })?;
    let target = threshold.target_vertex_count;

    if target > 0 && target as usize > mesh.max_vertex_count() {
        warn!(
            "lod {} targets {} vertices but the mesh only has {}",
            lod_index,
            target,
            mesh.max_vertex_count()
        );
    }

    let mut state = ReplayState::default();

    while i64::from(target) > state.vertices_so_far as i64 {
        let Some(collapse) = mesh.collapses.get(state.cursor) else {
            break;
        };
        if state.vertices_so_far + u64::from(collapse.vertices_to_lose) > target as u64 {
            break;
        }
        apply_collapse(mesh, &mut state)?;
    }
    let threshold_collapses = state.cursor;

    while mesh
        .collapses
        .get(state.cursor)
        .is_some_and(|collapse| collapse.should_collapse)
    {
        apply_collapse(mesh, &mut state)?;
    }
    let continuation_collapses = state.cursor - threshold_collapses;

    debug!(
        "lod {}: {} threshold collapses, {} continuation collapses, {} of {} records",
        lod_index,
        threshold_collapses,
        continuation_collapses,
        state.cursor,
        mesh.collapses.len()
    );

    if state.cursor > 0 {
        mesh.active_vertex_count = state.vertices_so_far as usize;
        mesh.active_index_count = state.indices_so_far as usize;
    }

    Ok(LodReport {
        lod_index,
        target_vertex_count: target,
        threshold_collapses,
        continuation_collapses,
        vertex_count: mesh.active_vertex_count,
        index_count: mesh.active_index_count,
    })
}

fn apply_collapse(mesh: &mut ProgressiveMesh, state: &mut ReplayState) -> Result<()> {
    let index = state.cursor;
    let collapse = mesh.collapses[index];
    let corrupt = |detail: String| ConversionError::CorruptContainer {
        collapse: index,
        detail,
    };

    let vertices_so_far = state.vertices_so_far + u64::from(collapse.vertices_to_lose);
    let indices_so_far = state.indices_so_far + u64::from(collapse.indices_to_lose);

    let remap = vertices_so_far
        .checked_sub(1)
        .ok_or_else(|| corrupt("collapse leaves no vertex to remap onto".to_string()))?;
    if remap >= mesh.vertices.len() as u64 || remap > u64::from(u16::MAX) {
        return Err(corrupt(format!(
            "remap target {} is outside the {} stored vertices",
            remap,
            mesh.vertices.len()
        )));
    }

    let start = collapse.index_changes_offset as usize;
    let end = start
        .checked_add(collapse.index_changes_count as usize)
        .filter(|&end| end <= mesh.index_changes.len())
        .ok_or_else(|| {
            corrupt(format!(
                "index changes {}..+{} exceed the list of {}",
                collapse.index_changes_offset,
                collapse.index_changes_count,
                mesh.index_changes.len()
            ))
        })?;
    let changes = &mesh.index_changes[start..end];

    let index_count = mesh.indices.len();
    if let Some(&bad) = changes
        .iter()
        .find(|&&offset| offset < 0 || offset as usize >= index_count)
    {
        return Err(corrupt(format!(
            "index change offset {} is outside the {} stored indices",
            bad, index_count
        )));
    }

    for &offset in changes {
        mesh.indices[offset as usize] = remap as u16;
    }

    state.vertices_so_far = vertices_so_far;
    state.indices_so_far = indices_so_far;
    state.cursor += 1;
    Ok(())
}
