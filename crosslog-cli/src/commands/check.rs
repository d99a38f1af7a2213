//! `crosslog check` command handler
//!
//! Assembles the configured pipeline against the built-in registry using a
//! file manager that never touches the filesystem, so a check has no side
//! effects on log destinations.

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crosslog_access_log::{build_pipeline, ensure_builtin_extensions};
use crosslog_core::config::{AccessLogConfig, CrosslogConfig, FilterSpecifier, ValidationMode};
use crosslog_core::error::AccessLogError;
use crosslog_core::manager::{
    AccessLogFile, AccessLogFileSharedPtr, AccessLogManager, FileDestination,
};
use crosslog_core::registry::Registry;

use super::factory_context;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `check` command.
///
/// # Errors
///
/// Returns `CliError::Config` when any entry fails to assemble.
pub fn execute(
    config: &CrosslogConfig,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let registry = ensure_builtin_extensions()?;
    let report = check(config, config_path, registry);
    writer.render(&report)?;

    match report.error {
        Some(error) => Err(CliError::Config(error)),
        None => Ok(()),
    }
}

/// Assemble every configured entry and describe the result.
pub fn check(config: &CrosslogConfig, config_path: &Path, registry: &Registry) -> CheckReport {
    info!(path = %config_path.display(), "checking access log configuration");

    let context = factory_context(config, Arc::new(DryRunManager));
    let result = build_pipeline(
        &config.access_log.entries,
        &context,
        &config.access_log.formatter_namespace,
        registry,
    );

    let (sinks, error, failed_entry) = match result {
        Ok(pipeline) => (pipeline.len(), None, None),
        Err(e) => {
            let failed_entry = match &e {
                AccessLogError::Entry { index, .. } => Some(*index),
                _ => None,
            };
            (0, Some(e.to_string()), failed_entry)
        }
    };

    CheckReport {
        source: config_path.display().to_string(),
        valid: error.is_none(),
        formatter_namespace: config.access_log.formatter_namespace.clone(),
        validation: config.access_log.validation,
        sinks,
        entries: config
            .access_log
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| EntryReport::new(index, entry, failed_entry))
            .collect(),
        error,
    }
}

/// Handle that accepts and discards every write.
struct DiscardFile;

impl AccessLogFile for DiscardFile {
    fn write(&self, _data: &str) -> io::Result<()> {
        Ok(())
    }

    fn flush(&self) -> io::Result<()> {
        Ok(())
    }

    fn reopen(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Manager that hands out discarding handles instead of opening files.
struct DryRunManager;

impl AccessLogManager for DryRunManager {
    fn create_access_log(
        &self,
        _destination: &FileDestination,
    ) -> Result<AccessLogFileSharedPtr, AccessLogError> {
        Ok(Arc::new(DiscardFile))
    }

    fn reopen_all(&self) {}
}

/// Result of assembling the configured pipeline.
#[derive(Serialize)]
pub struct CheckReport {
    /// Configuration file path
    pub source: String,
    /// Whether every entry assembled
    pub valid: bool,
    pub formatter_namespace: String,
    pub validation: ValidationMode,
    /// Number of sinks in the assembled pipeline (0 on failure)
    pub sinks: usize,
    pub entries: Vec<EntryReport>,
    /// Assembly error, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One configured entry as seen by the check.
#[derive(Serialize)]
pub struct EntryReport {
    pub index: usize,
    pub sink: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// `true` for the entry that stopped the assembly
    pub failed: bool,
}

impl EntryReport {
    fn new(index: usize, entry: &AccessLogConfig, failed_entry: Option<usize>) -> Self {
        Self {
            index,
            sink: entry.name.clone(),
            destination: entry
                .typed_config
                .get("path")
                .and_then(|p| p.as_str())
                .map(str::to_owned),
            filter: entry.filter.as_ref().map(|f| match &f.specifier {
                FilterSpecifier::ExtensionFilter(ext) => ext.resolved_type().to_owned(),
                other => other.kind().to_owned(),
            }),
            failed: failed_entry == Some(index),
        }
    }
}

impl Render for CheckReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Access Log Check: {}", self.source.bold())?;
        writeln!(
            w,
            "  Formatter: {}  Validation: {:?}",
            self.formatter_namespace, self.validation
        )?;

        for entry in &self.entries {
            let marker = if entry.failed {
                "FAIL".red().bold()
            } else if self.valid {
                "OK".green()
            } else {
                "-".normal()
            };
            write!(w, "  [{}] #{} {}", marker, entry.index, entry.sink)?;
            if let Some(ref destination) = entry.destination {
                write!(w, " -> {destination}")?;
            }
            if let Some(ref filter) = entry.filter {
                write!(w, " (filter: {filter})")?;
            }
            writeln!(w)?;
        }

        match &self.error {
            None => writeln!(w, "  Result: {} ({} sinks)", "VALID".green().bold(), self.sinks)?,
            Some(error) => {
                writeln!(w, "  Result: {}", "INVALID".red().bold())?;
                writeln!(w, "  Error: {}", error.red())?;
            }
        }
        Ok(())
    }
}
