use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use flagbind_gen::manifest::Manifest;
use flagbind_gen::{GenError, GenerateOptions};

/// Generate flagbind flag and setting bindings from a manifest.
#[derive(Debug, Parser)]
#[command(name = "flagbind-gen", version)]
struct Args {
    /// Manifest listing the candidate types.
    #[arg(long, default_value = "flagbind.toml")]
    manifest: PathBuf,

    /// Directory to write into. Overrides `output_dir` from the manifest.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// File prepended to every generated file. Overrides `header_file`.
    #[arg(long)]
    header: Option<PathBuf>,

    /// Verify the files on disk are current instead of writing them.
    #[arg(long)]
    check: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), GenError> {
    let manifest = Manifest::load(&args.manifest)?;
    let base = args
        .manifest
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let output_dir = args
        .output_dir
        .or_else(|| manifest.output_dir.as_ref().map(|d| base.join(d)))
        .unwrap_or_else(|| base.join("src/generated"));

    let header = match args
        .header
        .or_else(|| manifest.header_file.as_ref().map(|h| base.join(h)))
    {
        Some(path) => std::fs::read_to_string(&path).map_err(|source| GenError::Io { path, source })?,
        None => String::new(),
    };

    let options = GenerateOptions {
        runtime_path: manifest.runtime.clone(),
        output_module: manifest.output_module.clone(),
        header,
    };
    let package = flagbind_gen::generate(&manifest.descriptors()?, &options)?;

    if args.check {
        package.check(&output_dir)?;
        info!(dir = %output_dir.display(), "generated files are up to date");
    } else {
        package.write_to(&output_dir)?;
    }
    Ok(())
}
