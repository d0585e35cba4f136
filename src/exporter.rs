use crate::error::{ConversionError, Result};
use crate::mesh_types::Vertex;
use crate::settings::ExportOptions;
use log::{info, warn};
use std::fmt::{self, Write as FmtWrite};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Obj,
    Ply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportFormat {
    pub id: &'static str,
    pub extension: &'static str,
    pub description: &'static str,
    pub kind: ExportKind,
}

pub const FORMATS: &[ExportFormat] = &[
    ExportFormat {
        id: "obj",
        extension: "obj",
        description: "Wavefront OBJ format, with a companion .mtl carrying the texture",
        kind: ExportKind::Obj,
    },
    ExportFormat {
        id: "ply",
        extension: "ply",
        description: "Stanford Polygon Library (ASCII)",
        kind: ExportKind::Ply,
    },
];

const MATERIAL_NAME: &str = "material0";

pub fn find_format(id: &str) -> Result<&'static ExportFormat> {
    FORMATS
        .iter()
        .find(|format| format.id == id)
        .ok_or_else(|| ConversionError::UnsupportedFormat(id.to_string()))
}

/// Writes `vertices`/`indices` to `path` in the registered format `format_id`.
pub fn export_flat_mesh(
    path: &Path,
    format_id: &str,
    vertices: &[Vertex],
    indices: &[u16],
    texture_name: &str,
    options: &ExportOptions,
) -> Result<()> {
    let format = find_format(format_id)?;
    let indices = checked_triangles(vertices, indices)?;

    match format.kind {
        ExportKind::Obj => {
            let mtl_path = path.with_extension("mtl");
            let mtl_name = mtl_path
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| ConversionError::Export(format!("invalid output path '{}'", path.display())))?;
            fs::write(path, mesh_to_obj_bytes(vertices, indices, Some(mtl_name), options)?)?;
            fs::write(&mtl_path, material_bytes(texture_name)?)?;
        }
        ExportKind::Ply => {
            fs::write(path, mesh_to_ply_bytes(vertices, indices, texture_name, options)?)?;
        }
    }

    info!(
        "exported {} vertices, {} triangles to {} ({})",
        vertices.len(),
        indices.len() / 3,
        path.display(),
        format.id
    );
    Ok(())
}

fn checked_triangles<'a>(vertices: &[Vertex], indices: &'a [u16]) -> Result<&'a [u16]> {
    if vertices.is_empty() || indices.len() < 3 {
        return Err(ConversionError::EmptyMesh);
    }

    let whole = indices.len() - indices.len() % 3;
    if whole != indices.len() {
        warn!(
            "index count {} is not a multiple of 3, dropping the last {}",
            indices.len(),
            indices.len() - whole
        );
    }
    let indices = &indices[..whole];

    if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
        return Err(ConversionError::Export(format!(
            "index {} references a vertex outside the {} given",
            bad,
            vertices.len()
        )));
    }

    Ok(indices)
}

pub fn mesh_to_obj_bytes(
    vertices: &[Vertex],
    indices: &[u16],
    mtl_name: Option<&str>,
    options: &ExportOptions,
) -> Result<Vec<u8>> {
    let mut output = String::new();

    if let Some(mtl_name) = mtl_name {
        fmt_ok(writeln!(&mut output, "mtllib {}", mtl_name))?;
    }

    for vertex in vertices {
        fmt_ok(writeln!(
            &mut output,
            "v {:.6} {:.6} {:.6}",
            vertex.pos[0], vertex.pos[1], vertex.pos[2]
        ))?;
    }

    for vertex in vertices {
        fmt_ok(writeln!(
            &mut output,
            "vt {:.6} {:.6}",
            vertex.uv[0],
            output_v(vertex, options)
        ))?;
    }

    for vertex in vertices {
        fmt_ok(writeln!(
            &mut output,
            "vn {:.6} {:.6} {:.6}",
            vertex.normal[0], vertex.normal[1], vertex.normal[2]
        ))?;
    }

    if mtl_name.is_some() {
        fmt_ok(writeln!(&mut output, "usemtl {}", MATERIAL_NAME))?;
    }

    for face in indices.chunks_exact(3) {
        let [a, b, c] = [face[0] as u32 + 1, face[1] as u32 + 1, face[2] as u32 + 1];
        fmt_ok(writeln!(
            &mut output,
            "f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}"
        ))?;
    }

    Ok(output.into_bytes())
}

pub fn material_bytes(texture_name: &str) -> Result<Vec<u8>> {
    let mut output = String::new();
    fmt_ok(writeln!(&mut output, "newmtl {}", MATERIAL_NAME))?;
    fmt_ok(writeln!(&mut output, "Ka 1.000000 1.000000 1.000000"))?;
    fmt_ok(writeln!(&mut output, "Kd 1.000000 1.000000 1.000000"))?;
    if !texture_name.is_empty() {
        fmt_ok(writeln!(&mut output, "map_Kd {}", texture_name))?;
    }
    Ok(output.into_bytes())
}

pub fn mesh_to_ply_bytes(
    vertices: &[Vertex],
    indices: &[u16],
    texture_name: &str,
    options: &ExportOptions,
) -> Result<Vec<u8>> {
    let mut output = String::new();

    fmt_ok(writeln!(&mut output, "ply"))?;
    fmt_ok(writeln!(&mut output, "format ascii 1.0"))?;
    if !texture_name.is_empty() {
        fmt_ok(writeln!(&mut output, "comment TextureFile {}", texture_name))?;
    }
    fmt_ok(writeln!(&mut output, "element vertex {}", vertices.len()))?;
    for property in ["x", "y", "z", "nx", "ny", "nz", "s", "t"] {
        fmt_ok(writeln!(&mut output, "property float {}", property))?;
    }
    fmt_ok(writeln!(&mut output, "element face {}", indices.len() / 3))?;
    fmt_ok(writeln!(&mut output, "property list uchar int vertex_indices"))?;
    fmt_ok(writeln!(&mut output, "end_header"))?;

    for vertex in vertices {
        fmt_ok(writeln!(
            &mut output,
            "{:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6}",
            vertex.pos[0],
            vertex.pos[1],
            vertex.pos[2],
            vertex.normal[0],
            vertex.normal[1],
            vertex.normal[2],
            vertex.uv[0],
            output_v(vertex, options)
        ))?;
    }

    for face in indices.chunks_exact(3) {
        fmt_ok(writeln!(&mut output, "3 {} {} {}", face[0], face[1], face[2]))?;
    }

    Ok(output.into_bytes())
}

fn output_v(vertex: &Vertex, options: &ExportOptions) -> f32 {
    if options.flip_v { 1.0 - vertex.uv[1] } else { vertex.uv[1] }
}

fn fmt_ok(result: fmt::Result) -> Result<()> {
    result.map_err(|_| ConversionError::Export("failed to format mesh output".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Vec<Vertex> {
        vec![
            Vertex { pos: [0.0, 0.0, 0.0], normal: [0.0, 0.0, 1.0], uv: [0.0, 1.0] },
            Vertex { pos: [1.0, 0.0, 0.0], normal: [0.0, 0.0, 1.0], uv: [1.0, 1.0] },
            Vertex { pos: [0.0, 1.0, 0.0], normal: [0.0, 0.0, 1.0], uv: [0.0, 0.25] },
        ]
    }

    #[test]
    fn registry_lists_obj_and_ply() {
        let ids: Vec<_> = FORMATS.iter().map(|format| format.id).collect();
        assert_eq!(ids, vec!["obj", "ply"]);
        assert_eq!(find_format("ply").unwrap().kind, ExportKind::Ply);
        assert!(matches!(
            find_format("fbx"),
            Err(ConversionError::UnsupportedFormat(id)) if id == "fbx"
        ));
    }

    #[test]
    fn obj_output_has_one_based_faces_and_flipped_v() {
        let bytes = mesh_to_obj_bytes(&triangle(), &[0, 1, 2], Some("bow.mtl"), &ExportOptions::default()).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.starts_with("mtllib bow.mtl\n"));
        assert!(text.contains("vt 0.000000 0.750000\n"));
        assert!(text.contains("usemtl material0\n"));
        assert!(text.ends_with("f 1/1/1 2/2/2 3/3/3\n"));
        assert_eq!(text.lines().filter(|l| l.starts_with("v ")).count(), 3);
        assert_eq!(text.lines().filter(|l| l.starts_with("vn ")).count(), 3);
    }

    #[test]
    fn v_is_kept_when_flip_is_off() {
        let options = ExportOptions { flip_v: false };
        let text = String::from_utf8(mesh_to_obj_bytes(&triangle(), &[0, 1, 2], None, &options).unwrap()).unwrap();
        assert!(text.contains("vt 0.000000 0.250000\n"));
        assert!(!text.contains("mtllib"));
    }

    #[test]
    fn material_references_texture() {
        let text = String::from_utf8(material_bytes("item_co_bow.bmp").unwrap()).unwrap();
        assert!(text.contains("newmtl material0\n"));
        assert!(text.contains("map_Kd item_co_bow.bmp\n"));
    }

    #[test]
    fn ply_header_counts_elements() {
        let text = String::from_utf8(
            mesh_to_ply_bytes(&triangle(), &[0, 1, 2], "tex.dds", &ExportOptions::default()).unwrap(),
        )
        .unwrap();

        assert!(text.starts_with("ply\nformat ascii 1.0\ncomment TextureFile tex.dds\n"));
        assert!(text.contains("element vertex 3\n"));
        assert!(text.contains("element face 1\n"));
        assert!(text.contains("end_header\n0.000000 0.000000 0.000000 0.000000 0.000000 1.000000 0.000000 0.000000\n"));
        assert!(text.ends_with("3 0 1 2\n"));
    }

    #[test]
    fn export_writes_obj_and_material() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bow.obj");

        export_flat_mesh(&path, "obj", &triangle(), &[0, 1, 2], "bow.bmp", &ExportOptions::default()).unwrap();

        let obj = fs::read_to_string(&path).unwrap();
        let mtl = fs::read_to_string(dir.path().join("bow.mtl")).unwrap();
        assert!(obj.starts_with("mtllib bow.mtl\n"));
        assert!(mtl.contains("map_Kd bow.bmp"));
    }

    #[test]
    fn out_of_range_index_is_an_export_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = export_flat_mesh(
            &dir.path().join("bad.ply"),
            "ply",
            &triangle(),
            &[0, 1, 3],
            "",
            &ExportOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConversionError::Export(_)));
    }

    #[test]
    fn partial_triangle_is_dropped() {
        let indices = [0, 1, 2, 0];
        let trimmed = checked_triangles(&triangle(), &indices).unwrap();
        assert_eq!(trimmed, &[0, 1, 2]);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(checked_triangles(&triangle(), &[0, 1]), Err(ConversionError::EmptyMesh)));
        assert!(matches!(checked_triangles(&[], &[0, 1, 2]), Err(ConversionError::EmptyMesh)));
    }
}
