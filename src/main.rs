use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use cube_pack::data::writer::decode_payload;
use cube_pack::{convert_with, verify, ConvertOptions, CubeShape, PayloadLayout};

const DEFAULT_SOURCE: &str = "static/data/h2_emission_cube.json";
const DEFAULT_DEST: &str = "static/data/h2_emission_cube.msgpack";

/// Repack an H2 emission cube from JSON into MessagePack.
///
/// Without a subcommand, converts the cube at the default paths.
#[derive(Parser, Debug)]
#[command(name = "cube-pack", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Convert a JSON emission cube into a MessagePack file
    Convert(ConvertArgs),
    /// Decode a MessagePack file and print a summary of its contents
    Inspect {
        /// Path to the MessagePack file
        #[arg(default_value = DEFAULT_DEST)]
        file: PathBuf,
    },
}

#[derive(Debug, Args)]
struct ConvertArgs {
    /// JSON document with `wavelengths` and `fluxes` keys
    #[arg(default_value = DEFAULT_SOURCE)]
    source: PathBuf,

    /// MessagePack file to create or overwrite
    #[arg(default_value = DEFAULT_DEST)]
    dest: PathBuf,

    /// Write to a temporary file and rename it into place
    #[arg(long)]
    atomic: bool,

    /// Write a `{wavelengths, fluxes}` map instead of the bare fluxes
    #[arg(long)]
    include_wavelengths: bool,

    /// Decode the output afterwards and compare it with the source
    #[arg(long)]
    verify: bool,
}

impl Default for ConvertArgs {
    fn default() -> Self {
        Self {
            source: PathBuf::from(DEFAULT_SOURCE),
            dest: PathBuf::from(DEFAULT_DEST),
            atomic: false,
            include_wavelengths: false,
            verify: false,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().into_command() {
        Command::Convert(args) => run_convert(args),
        Command::Inspect { file } => run_inspect(&file, &mut std::io::stdout().lock()),
    }
}

impl Cli {
    /// The requested subcommand, `convert` with default paths if none.
    fn into_command(self) -> Command {
        self.command
            .unwrap_or_else(|| Command::Convert(ConvertArgs::default()))
    }
}

fn run_convert(args: ConvertArgs) -> Result<()> {
    let layout = if args.include_wavelengths {
        PayloadLayout::Cube
    } else {
        PayloadLayout::FluxesOnly
    };
    let options = ConvertOptions {
        layout,
        atomic: args.atomic,
    };

    convert_with(&args.source, &args.dest, &options).with_context(|| {
        format!(
            "converting {} to {}",
            args.source.display(),
            args.dest.display()
        )
    })?;

    if args.verify {
        verify(&args.source, &args.dest, layout)
            .with_context(|| format!("verifying {}", args.dest.display()))?;
        log::info!("Verified {}", args.dest.display());
    }
    Ok(())
}

fn run_inspect(file: &Path, out: &mut impl Write) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let value = decode_payload(&bytes).with_context(|| format!("decoding {}", file.display()))?;

    // A cube layout file is a map; summarise each field separately.
    let fields: Vec<(&str, &serde_json::Value)> = match value.as_object() {
        Some(obj) => obj.iter().map(|(k, v)| (k.as_str(), v)).collect(),
        None => vec![("payload", &value)],
    };

    writeln!(out, "{}: {} bytes", file.display(), bytes.len())?;
    for (name, field) in fields {
        match CubeShape::of(field) {
            Some(shape) => writeln!(out, "  {name}: {shape} ({} values)", shape.len())?,
            None => writeln!(out, "  {name}: non-rectangular")?,
        }
    }
    Ok(())
}
