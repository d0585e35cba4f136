use crate::error::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Options shared by every conversion, read from an optional JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConversionSettings {
    /// LOD level reconstructed before export.
    pub lod_index: usize,
    /// Flip the V texture coordinate between OBJ/PLY and container conventions.
    pub flip_v: bool,
    /// Generate smooth normals when an imported file has none.
    pub generate_normals: bool,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            lod_index: 0,
            flip_v: true,
            generate_normals: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    pub flip_v: bool,
    pub generate_normals: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    pub flip_v: bool,
}

impl ConversionSettings {
    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            flip_v: self.flip_v,
            generate_normals: self.generate_normals,
        }
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions { flip_v: self.flip_v }
    }
}

impl Default for ImportOptions {
    fn default() -> Self {
        ConversionSettings::default().import_options()
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        ConversionSettings::default().export_options()
    }
}

pub fn load_settings(path: &Path) -> Result<ConversionSettings> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}
