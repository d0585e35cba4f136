use crate::error::{ConversionError, Result};
use crate::mesh_types::{FlatMesh, Vertex};
use crate::settings::ImportOptions;
use log::{info, warn};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Largest vertex count addressable by 16-bit indices.
pub const MAX_VERTICES: usize = u16::MAX as usize + 1;

const DEFAULT_NORMAL: [f32; 3] = [0.0, 1.0, 0.0];

pub fn import_flat_mesh(path: &Path, options: &ImportOptions) -> Result<FlatMesh> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("obj") => {
            let data = fs::read(path)?;
            obj_to_flat_mesh(&data, options)
        }
        _ => Err(ConversionError::Unsupported(format!(
            "cannot import '{}', only obj files are supported",
            path.display()
        ))),
    }
}

/// Loads the first triangulated model of an OBJ file.
///
/// Vertices are renumbered in first-use order so unreferenced ones are dropped.
pub fn obj_to_flat_mesh(obj_data: &[u8], options: &ImportOptions) -> Result<FlatMesh> {
    let (models, _) = tobj::load_obj_buf(
        &mut obj_data.as_ref(),
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |_| Ok(Default::default()),
    )?;

    let mut models = models
        .into_iter()
        .filter(|model| !model.mesh.indices.is_empty());
    let model = models.next().ok_or(ConversionError::NoMeshData)?;
    let skipped: Vec<String> = models.map(|model| model.name).collect();
    if !skipped.is_empty() {
        warn!(
            "only the first model '{}' is imported, skipping {:?}",
            model.name, skipped
        );
    }

    let mesh = &model.mesh;
    let has_normals = !mesh.normals.is_empty();
    let has_uvs = !mesh.texcoords.is_empty();

    let mut vertices: Vec<Vertex> = Vec::new();
    let mut vertex_map: HashMap<u32, u32> = HashMap::new();
    let mut faces: Vec<[u32; 3]> = Vec::with_capacity(mesh.indices.len() / 3);

    for face_indices in mesh.indices.chunks_exact(3) {
        let mut new_face = [0u32; 3];
        for (corner, &original_index) in face_indices.iter().enumerate() {
            new_face[corner] = match vertex_map.get(&original_index) {
                Some(&existing) => existing,
                None => {
                    let vertex = read_vertex(mesh, original_index as usize, has_normals, has_uvs, options)?;
                    vertices.push(vertex);
                    let stored = (vertices.len() - 1) as u32;
                    vertex_map.insert(original_index, stored);
                    stored
                }
            };
        }
        faces.push(new_face);
    }

    if vertices.len() > MAX_VERTICES {
        return Err(ConversionError::TooManyVertices(vertices.len()));
    }

    let indices: Vec<u16> = faces.iter().flatten().map(|&i| i as u16).collect();

    if !has_normals && options.generate_normals {
        compute_smooth_normals(&mut vertices, &indices);
    }

    info!(
        "imported '{}': {} vertices, {} triangles",
        model.name,
        vertices.len(),
        faces.len()
    );

    Ok(FlatMesh { vertices, indices })
}

fn read_vertex(
    mesh: &tobj::Mesh,
    idx: usize,
    has_normals: bool,
    has_uvs: bool,
    options: &ImportOptions,
) -> Result<Vertex> {
    let pos = mesh
        .positions
        .get(idx * 3..idx * 3 + 3)
        .ok_or_else(|| ConversionError::Unsupported(format!("face references missing position {}", idx)))?;

    let normal = match mesh.normals.get(idx * 3..idx * 3 + 3) {
        Some(n) if has_normals => [n[0], n[1], n[2]],
        _ => DEFAULT_NORMAL,
    };

    let uv = match mesh.texcoords.get(idx * 2..idx * 2 + 2) {
        Some(t) if has_uvs => [t[0], t[1]],
        _ => [0.0, 0.0],
    };
    let v = if options.flip_v { 1.0 - uv[1] } else { uv[1] };

    Ok(Vertex {
        pos: [pos[0], pos[1], pos[2]],
        normal,
        uv: [uv[0], v],
    })
}

/// Area-weighted vertex normals accumulated from every adjacent triangle.
pub fn compute_smooth_normals(vertices: &mut [Vertex], indices: &[u16]) {
    let mut accum = vec![[0.0f32; 3]; vertices.len()];

    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if a >= vertices.len() || b >= vertices.len() || c >= vertices.len() {
            continue;
        }
        let pa = vertices[a].pos;
        let pb = vertices[b].pos;
        let pc = vertices[c].pos;

        let e1 = [pb[0] - pa[0], pb[1] - pa[1], pb[2] - pa[2]];
        let e2 = [pc[0] - pa[0], pc[1] - pa[1], pc[2] - pa[2]];

        // magnitude is twice the triangle area
        let n = [
            e1[1] * e2[2] - e1[2] * e2[1],
            e1[2] * e2[0] - e1[0] * e2[2],
            e1[0] * e2[1] - e1[1] * e2[0],
        ];

        for &vi in &[a, b, c] {
            accum[vi][0] += n[0];
            accum[vi][1] += n[1];
            accum[vi][2] += n[2];
        }
    }

    for (vertex, n) in vertices.iter_mut().zip(accum) {
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        vertex.normal = if len > 1e-10 {
            [n[0] / len, n[1] / len, n[2] / len]
        } else {
            DEFAULT_NORMAL
        };
    }
}
