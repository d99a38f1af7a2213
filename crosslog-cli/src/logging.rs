//! Logging setup for the crosslog CLI.
//!
//! The library crates only emit `tracing` events; the binary decides where
//! they go. Every layer writes to stderr, so `--output json` on stdout can be
//! piped straight into another tool while assembly and replay diagnostics
//! still reach the terminal.

use std::io;

use anyhow::{Context, Result, bail};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crosslog_core::config::GeneralConfig;

/// Level used by commands that run without a configuration file.
const STANDALONE_LOG_LEVEL: &str = "warn";

/// Initialize the global tracing subscriber from the `[general]` section.
///
/// Must be called at most once. `RUST_LOG`, when set, takes precedence over
/// `config.log_level` (which already includes any `--log-level` override).
///
/// # Formats
///
/// * `"json"` - one JSON object per event
/// * `"pretty"` - multi-line human-readable output
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let filter = env_filter(&config.log_level);
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.log_format.as_str() {
        "json" => registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .try_init(),
        "pretty" => registry
            .with(fmt::layer().pretty().with_writer(io::stderr))
            .try_init(),
        other => bail!("unknown log format '{other}', expected 'json' or 'pretty'"),
    };

    result.with_context(|| {
        format!(
            "failed to initialize {} tracing subscriber",
            config.log_format
        )
    })
}

/// Logging settings for commands that never load `crosslog.toml`
/// (currently `crosslog extensions`).
pub fn standalone_config(log_level: Option<String>) -> GeneralConfig {
    GeneralConfig {
        log_level: log_level.unwrap_or_else(|| STANDALONE_LOG_LEVEL.to_owned()),
        log_format: "pretty".to_owned(),
    }
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}
