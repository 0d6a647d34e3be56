//! cfgstore: inspect, edit and repair configuration files.
//!
//! Every command goes through the same provider contract hosting code uses,
//! so what this tool reads and writes is exactly what an application sees:
//! the same format dispatch, the same corrupt-file recovery, the same stable
//! rendering.
//!
//! # Usage
//!
//! ```text
//! cfgstore [OPTIONS] <COMMAND>
//!
//! Commands:
//!   show     <FILE>                   Print the document
//!   get      <FILE> <POINTER>         Print the value at a JSON pointer
//!   set      <FILE> <POINTER> <VALUE> Set a value and save
//!   remove   <FILE> <POINTER>         Remove a value and save
//!   repair   <FILE>                   Load the file, resetting it if corrupt
//!   formats                           List registered formats
//!
//! Options:
//!   --format    <TAG>    Format tag; defaults to the file extension
//!   --log-level <LEVEL>  Log filter [default: warn]
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable          | Default | Description                      |
//! |-------------------|---------|----------------------------------|
//! | `CFGSTORE_FORMAT` | (none)  | Format tag used for every file   |
//! | `CFGSTORE_LOG`    | `warn`  | `tracing` filter directive       |

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use cfgstore_core::{ConfigProvider, LoadOutcome, ProviderRegistry};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Inspect, edit and repair cfgstore configuration files.
#[derive(Debug, Parser)]
#[command(name = "cfgstore", version)]
struct Cli {
    /// Format tag (e.g. `json`, `toml`) overriding extension-based dispatch.
    #[arg(long, global = true, env = "CFGSTORE_FORMAT")]
    format: Option<String>,

    /// `tracing` filter: `error`, `warn`, `info`, `debug`, `trace`, or a
    /// full directive such as `cfgstore_core=debug`.
    #[arg(long, global = true, default_value = "warn", env = "CFGSTORE_LOG")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the document in its own format.
    Show { file: PathBuf },

    /// Print the value at a JSON pointer (e.g. `/audio/volume`) as JSON.
    Get { file: PathBuf, pointer: String },

    /// Set the value at a JSON pointer and save.
    ///
    /// VALUE is parsed as JSON; anything that is not valid JSON is stored as
    /// a plain string.
    Set {
        file: PathBuf,
        pointer: String,
        value: String,
    },

    /// Remove the value at a JSON pointer and save if it existed.
    Remove { file: PathBuf, pointer: String },

    /// Load the file, resetting it to an empty document if it is corrupt.
    Repair { file: PathBuf },

    /// List the registered formats and the extensions they claim.
    Formats,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let registry = ProviderRegistry::with_builtin();
    run(&cli, &registry)
}

fn run(cli: &Cli, registry: &ProviderRegistry) -> anyhow::Result<()> {
    match &cli.command {
        Command::Show { file } => {
            let provider = open_loaded(registry, cli.format.as_deref(), file)?;
            print!("{}", provider.render()?);
        }
        Command::Get { file, pointer } => {
            let provider = open_loaded(registry, cli.format.as_deref(), file)?;
            let Some(value) = provider.document().and_then(|doc| doc.pointer(pointer)) else {
                bail!("no value at {pointer} in {}", file.display());
            };
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        Command::Set {
            file,
            pointer,
            value,
        } => {
            let mut provider = open_loaded(registry, cli.format.as_deref(), file)?;
            provider
                .dynamic()
                .set(pointer, parse_value(value))
                .with_context(|| format!("cannot set {pointer}"))?;
            provider
                .save()
                .with_context(|| format!("failed to save {}", file.display()))?;
        }
        Command::Remove { file, pointer } => {
            let mut provider = open_loaded(registry, cli.format.as_deref(), file)?;
            let removed = provider
                .dynamic()
                .remove(pointer)
                .with_context(|| format!("cannot remove {pointer}"))?;
            if removed.is_none() {
                bail!("no value at {pointer} in {}", file.display());
            }
            provider
                .save()
                .with_context(|| format!("failed to save {}", file.display()))?;
        }
        Command::Repair { file } => {
            let mut provider = open(registry, cli.format.as_deref(), file)?;
            let outcome = provider
                .load()
                .with_context(|| format!("failed to load {}", file.display()))?;
            match outcome {
                LoadOutcome::Recovered => {
                    info!(path = %file.display(), "corrupt config reset to an empty document");
                    println!("{}: corrupt, reset to an empty document", file.display());
                }
                LoadOutcome::Missing => println!("{}: does not exist", file.display()),
                LoadOutcome::Loaded | LoadOutcome::Detached => {
                    println!("{}: ok", file.display())
                }
            }
        }
        Command::Formats => {
            for tag in registry.tags() {
                let extensions = registry.extensions(tag).unwrap_or_default();
                println!("{tag}\t{}", extensions.join(", "));
            }
        }
    }
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn open(
    registry: &ProviderRegistry,
    format: Option<&str>,
    file: &Path,
) -> anyhow::Result<Box<dyn ConfigProvider>> {
    let provider = match format {
        Some(tag) => registry.open(tag, file),
        None => registry.open_by_extension(file),
    };
    provider.with_context(|| format!("cannot choose a format for {}", file.display()))
}

fn open_loaded(
    registry: &ProviderRegistry,
    format: Option<&str>,
    file: &Path,
) -> anyhow::Result<Box<dyn ConfigProvider>> {
    let mut provider = open(registry, format, file)?;
    provider
        .load()
        .with_context(|| format!("failed to load {}", file.display()))?;
    Ok(provider)
}

/// Interprets a command-line value as JSON, falling back to a plain string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
