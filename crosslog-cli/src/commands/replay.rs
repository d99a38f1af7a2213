//! `crosslog replay` command handler
//!
//! Reads recorded transactions (one flat JSON object per line), wraps each in
//! a key-value record and logs it through the configured pipeline.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crosslog_access_log::{
    FileAccessLogManager, KeyValueRecord, PipelineHandle, build_pipeline,
};
use crosslog_core::config::CrosslogConfig;
use crosslog_core::context::LogContext;
use crosslog_core::registry::Registry;

use super::factory_context;
use crate::cli::ReplayArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `replay` command.
pub async fn execute(
    args: ReplayArgs,
    config: &CrosslogConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let registry = crosslog_access_log::ensure_builtin_extensions()?;
    let report = replay(config, &args.input, registry).await?;
    writer.render(&report)
}

/// Replay every record in `input` through a freshly assembled pipeline.
///
/// Lines that are blank are ignored; lines that are not JSON objects are
/// skipped with a warning and counted.
///
/// # Errors
///
/// Assembly failures, an unreadable input file and a failed final flush
/// abort the replay.
pub async fn replay(
    config: &CrosslogConfig,
    input: &Path,
    registry: &Registry,
) -> Result<ReplayReport, CliError> {
    let manager = Arc::new(FileAccessLogManager::new());
    let context = factory_context(config, manager.clone());
    let pipeline = build_pipeline(
        &config.access_log.entries,
        &context,
        &config.access_log.formatter_namespace,
        registry,
    )?;
    let handle = PipelineHandle::new(pipeline);

    let file = tokio::fs::File::open(input).await?;
    let mut lines = BufReader::new(file).lines();
    let mut records = 0u64;
    let mut skipped = 0u64;
    let mut line_no = 0u64;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(&line) {
            Ok(Value::Object(object)) => {
                let record = KeyValueRecord::from_json_object(&object);
                handle.log(&LogContext::new(&record));
                records += 1;
            }
            Ok(_) => {
                warn!(line = line_no, "skipping record that is not a JSON object");
                skipped += 1;
            }
            Err(e) => {
                warn!(line = line_no, error = %e, "skipping malformed record");
                skipped += 1;
            }
        }
    }

    manager.flush_all()?;
    info!(records, skipped, "replay finished");

    Ok(ReplayReport {
        input: input.display().to_string(),
        sinks: handle.load().len(),
        records,
        skipped,
    })
}

/// Replay summary.
#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub input: String,
    pub sinks: usize,
    /// Records passed to the pipeline (before per-sink filtering)
    pub records: u64,
    /// Lines that could not be parsed as a record
    pub skipped: u64,
}

impl Render for ReplayReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Replay: {}", self.input.bold())?;
        writeln!(w, "  Sinks:   {}", self.sinks)?;
        writeln!(w, "  Records: {}", self.records)?;
        if self.skipped > 0 {
            writeln!(w, "  Skipped: {}", self.skipped.to_string().yellow())?;
        }
        Ok(())
    }
}
