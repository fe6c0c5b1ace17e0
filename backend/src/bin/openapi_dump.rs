//! Print or write the OpenAPI document.

use std::io::Write;
use std::path::{Path, PathBuf};

use cap_std::{ambient_authority, fs::Dir};
use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Context, Result, eyre};
use tracker_backend::doc::ApiDoc;
use utoipa::OpenApi;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Yaml,
}

/// `openapi-dump` command arguments.
#[derive(Debug, Parser)]
#[command(
    name = "openapi-dump",
    about = "Render the tracker OpenAPI document",
    version
)]
struct CliArgs {
    #[arg(long, value_enum, default_value = "json")]
    format: Format,
    /// Write to this file instead of standard output.
    #[arg(long, value_name = "path")]
    output: Option<PathBuf>,
}

fn render(format: Format) -> Result<String> {
    let document = ApiDoc::openapi();
    match format {
        Format::Json => document
            .to_pretty_json()
            .wrap_err("failed to serialise the OpenAPI document as JSON"),
        Format::Yaml => document
            .to_yaml()
            .wrap_err("failed to serialise the OpenAPI document as YAML"),
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| eyre!("output path {} does not name a file", path.display()))?;
    let dir = Dir::open_ambient_dir(parent, ambient_authority())
        .wrap_err_with(|| format!("failed to open {}", parent.display()))?;
    dir.write(Path::new(file_name), contents)
        .wrap_err_with(|| format!("failed to write {}", path.display()))
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = CliArgs::parse();
    let document = render(args.format)?;
    match args.output {
        Some(path) => write_file(&path, &document),
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{document}").wrap_err("failed to write to stdout")
        }
    }
}
