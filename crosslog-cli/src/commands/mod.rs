//! Command handlers -- one module per subcommand

pub mod check;
pub mod extensions;
pub mod replay;

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crosslog_core::config::{CrosslogConfig, ValidationMode};
use crosslog_core::instance::FactoryContext;
use crosslog_core::manager::AccessLogManager;
use crosslog_core::runtime::StaticRuntime;
use crosslog_core::validation::{
    StrictValidationVisitor, ValidationVisitor, WarningValidationVisitor,
};

use crate::error::CliError;

/// Load the configuration file, apply env overrides and the `--log-level` flag.
pub async fn load_config(path: &Path, log_level: Option<&str>) -> Result<CrosslogConfig, CliError> {
    let mut config = CrosslogConfig::load(path).await?;
    if let Some(level) = log_level {
        config.general.log_level = level.to_owned();
        config.validate()?;
    }
    info!(path = %path.display(), entries = config.access_log.entries.len(), "configuration loaded");
    Ok(config)
}

/// Build the factory context shared by every sink of one assembly run.
///
/// The `[runtime]` table becomes a static snapshot and `access_log.validation`
/// picks the unknown-field policy.
pub fn factory_context(config: &CrosslogConfig, manager: Arc<dyn AccessLogManager>) -> FactoryContext {
    let validation: Arc<dyn ValidationVisitor> = match config.access_log.validation {
        ValidationMode::Strict => Arc::new(StrictValidationVisitor),
        ValidationMode::Warn => Arc::new(WarningValidationVisitor),
    };
    FactoryContext::new(manager)
        .with_runtime(Arc::new(StaticRuntime::from_values(config.runtime.clone())))
        .with_validation(validation)
}
