//! CLI-specific error types and exit code mapping

use crosslog_core::error::{AccessLogError, CrosslogError};

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading, validation or pipeline assembly failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from crosslog-core.
    #[error("{0}")]
    Core(#[from] CrosslogError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                   |
    /// |------|-------------------------------------------|
    /// | 0    | Success                                   |
    /// | 1    | General / command error                   |
    /// | 2    | Configuration or pipeline assembly error  |
    /// | 10   | IO error                                  |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Io(_) => 10,
            Self::Core(CrosslogError::Config(_)) => 2,
            Self::Core(CrosslogError::AccessLog(e)) if e.is_fatal() => 2,
            Self::Core(CrosslogError::AccessLog(_) | CrosslogError::Io(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) => 1,
        }
    }
}

impl From<AccessLogError> for CliError {
    fn from(e: AccessLogError) -> Self {
        Self::Core(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosslog_core::error::ConfigError;
    use crosslog_core::registry::ExtensionRole;

    #[test]
    fn test_exit_code_config_error() {
        let err = CliError::Config("test error".to_owned());
        assert_eq!(err.exit_code(), 2, "config error should return exit code 2");
    }

    #[test]
    fn test_exit_code_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        assert_eq!(CliError::Io(io_err).exit_code(), 10);
    }

    #[test]
    fn test_exit_code_command_error() {
        let err = CliError::Command("test error".to_owned());
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_core_config_error() {
        let err: CliError = CrosslogError::Config(ConfigError::FileNotFound {
            path: "crosslog.toml".to_owned(),
        })
        .into();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_assembly_error_is_config() {
        let err: CliError = AccessLogError::UnknownExtension {
            role: ExtensionRole::SinkInstance,
            name: "crosslog.access_loggers.kafka".to_owned(),
        }
        .in_entry(0, "crosslog.access_loggers.kafka")
        .into();
        assert_eq!(err.exit_code(), 2, "assembly failure should exit with 2");
    }

    #[test]
    fn test_exit_code_open_failure_is_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: CliError = AccessLogError::Io(io_err).into();
        assert_eq!(err.exit_code(), 10);
    }

    #[test]
    fn test_error_display_config() {
        let err = CliError::Config("invalid TOML syntax".to_owned());
        let display_str = err.to_string();
        assert!(display_str.contains("configuration error"));
        assert!(display_str.contains("invalid TOML syntax"));
    }

    #[test]
    fn test_error_display_command() {
        let err = CliError::Command("execution failed".to_owned());
        assert_eq!(err.to_string(), "execution failed");
    }
}
