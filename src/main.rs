use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info};
use n3pmesh_convert::error::Result;
use n3pmesh_convert::exporter::{self, FORMATS};
use n3pmesh_convert::settings::{self, ConversionSettings};
use n3pmesh_convert::{ProgressiveMesh, importer, lod, pmesh, ser};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ContainerType {
    N3pmesh,
}

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON file with conversion settings
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a container into another mesh format
    Export {
        format: String,
        container: PathBuf,
        texture: String,
        /// LOD level to reconstruct, overrides the settings file
        #[arg(long)]
        lod: Option<usize>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Convert a mesh file into a container
    Import {
        mesh: PathBuf,
        #[arg(value_enum)]
        container_type: ContainerType,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List supported export formats
    Formats,
    /// Print the converter version
    Version,
}

/// `<dir>/<name up to the first dot><suffix>.<extension>`, next to `input`.
fn derived_output(input: &Path, suffix: &str, extension: &str) -> PathBuf {
    let file_name = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = file_name.split('.').next().unwrap_or_default();
    input.with_file_name(format!("{}{}.{}", base, suffix, extension))
}

fn convert_container(
    container: &Path,
    format_id: &str,
    texture: &str,
    lod_index: usize,
    output: &Path,
    settings: &ConversionSettings,
) -> Result<()> {
    info!("loading \"{}\"", container.display());
    let data = fs::read(container)?;
    let mut mesh = pmesh::decode(&data)?;

    let report = lod::reconstruct(&mut mesh, lod_index)?;
    info!(
        "lod {}: applied {} of {} collapses, {} vertices, {} indices",
        report.lod_index,
        report.collapses_applied(),
        mesh.collapses.len(),
        report.vertex_count,
        report.index_count
    );

    exporter::export_flat_mesh(
        output,
        format_id,
        &mesh.vertices,
        &mesh.indices,
        texture,
        &settings.export_options(),
    )
}

fn convert_mesh(input: &Path, output: &Path, settings: &ConversionSettings) -> Result<()> {
    info!("loading \"{}\"", input.display());
    let flat = importer::import_flat_mesh(input, &settings.import_options())?;
    let bytes = ser::encode(&ProgressiveMesh::from_flat(flat))?;
    fs::write(output, bytes)?;
    info!("wrote \"{}\"", output.display());
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let settings = match &cli.settings {
        Some(path) => settings::load_settings(path)?,
        None => ConversionSettings::default(),
    };

    match cli.command {
        Commands::Export {
            format,
            container,
            texture,
            lod,
            output,
        } => {
            let export_format = exporter::find_format(&format)?;
            let output =
                output.unwrap_or_else(|| derived_output(&container, "", export_format.extension));
            let lod_index = lod.unwrap_or(settings.lod_index);
            convert_container(&container, &format, &texture, lod_index, &output, &settings)?;
        }
        Commands::Import {
            mesh,
            container_type: ContainerType::N3pmesh,
            output,
        } => {
            let output = output.unwrap_or_else(|| derived_output(&mesh, "_mod", "n3pmesh"));
            convert_mesh(&mesh, &output, &settings)?;
        }
        Commands::Formats => {
            for format in FORMATS {
                println!("{:<6} {}", format.id, format.description);
            }
        }
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let start = Utc::now();
    if let Err(err) = run(cli) {
        error!("{}", err);
        std::process::exit(-1);
    }
    let elapsed = Utc::now().signed_duration_since(start);
    info!("done in {} ms", elapsed.num_milliseconds());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_output_sits_next_to_container() {
        let out = derived_output(Path::new("meshes/1_6011_00_0.n3pmesh"), "", "obj");
        assert_eq!(out, PathBuf::from("meshes/1_6011_00_0.obj"));
    }

    #[test]
    fn import_output_gets_mod_suffix() {
        let out = derived_output(Path::new("bow.v2.obj"), "_mod", "n3pmesh");
        assert_eq!(out, PathBuf::from("bow_mod.n3pmesh"));
    }

    #[test]
    fn cli_parses_export_arguments() {
        let cli = Cli::try_parse_from([
            "n3pmesh_convert",
            "export",
            "obj",
            "bow.n3pmesh",
            "bow.bmp",
            "--lod",
            "2",
        ])
        .unwrap();
        match cli.command {
            Commands::Export { format, lod, .. } => {
                assert_eq!(format, "obj");
                assert_eq!(lod, Some(2));
            }
            _ => panic!("expected export"),
        }
    }

    #[test]
    fn cli_rejects_unknown_container_type() {
        let result = Cli::try_parse_from(["n3pmesh_convert", "import", "bow.obj", "n3cskins"]);
        assert!(result.is_err());
    }
}
