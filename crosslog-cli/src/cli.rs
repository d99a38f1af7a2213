//! CLI argument parsing using clap derive API
//!
//! Purely declarative: no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// crosslog -- pluggable access log pipeline.
///
/// Use `crosslog <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "crosslog", version, about, long_about = None)]
pub struct Cli {
    /// Path to the crosslog.toml configuration file.
    #[arg(short, long, default_value = "crosslog.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Assemble the configured access log pipeline without writing anything.
    Check,

    /// Feed JSON-lines records through the configured pipeline.
    Replay(ReplayArgs),

    /// List registered extensions per role.
    Extensions,
}

// ---- replay ----

/// Replay recorded transactions through the access log pipeline.
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// JSON-lines file, one flat object per transaction.
    #[arg(short, long)]
    pub input: PathBuf,
}
