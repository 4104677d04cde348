//! CLI error types with exit code handling

use miette::Diagnostic;
use thiserror::Error;

use appmarket_core::CoreError;
use appmarket_registry::RegistryError;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Configuration could not be loaded
    #[error("Config error: {message}")]
    #[diagnostic(code(appmarket::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Requested configuration key does not exist
    #[error("Unknown config key: {section}.{key}")]
    #[diagnostic(
        code(appmarket::cli::unknown_key),
        help("Known sections are kubernetes and registry")
    )]
    UnknownKey { section: String, key: String },

    /// One or more charts failed to convert
    #[error("{failed} of {total} chart(s) failed to convert")]
    #[diagnostic(code(appmarket::cli::convert))]
    ConvertFailed { failed: usize, total: usize },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(appmarket::cli::io))]
    Io { message: String },

    /// Internal error (runtime, unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(appmarket::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config { .. } | CliError::UnknownKey { .. } => exit_codes::CONFIG_ERROR,
            CliError::ConvertFailed { .. } => exit_codes::CONVERT_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a config error with help text
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidConfig { message } => CliError::Config {
                message,
                help: None,
            },
            CoreError::Io { .. } | CoreError::ChartNotFound { .. } => CliError::Io {
                message: err.to_string(),
            },
            other => CliError::internal(other.to_string()),
        }
    }
}

impl From<RegistryError> for CliError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidBaseUrl { .. } => CliError::config_with_help(
                err.to_string(),
                "Set registry.base_url to an http(s) URL",
            ),
            other => CliError::internal(other.to_string()),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            CliError::ConvertFailed { failed: 1, total: 2 }.exit_code(),
            exit_codes::CONVERT_ERROR
        );
        assert_eq!(
            CliError::from(CoreError::InvalidConfig {
                message: "x".into()
            })
            .exit_code(),
            exit_codes::CONFIG_ERROR
        );
        assert_eq!(
            CliError::from(CoreError::ChartNotFound { path: "x".into() }).exit_code(),
            exit_codes::IO_ERROR
        );
    }

    #[test]
    fn test_bad_registry_url_is_config_error() {
        let err = CliError::from(RegistryError::InvalidBaseUrl {
            url: "nope".into(),
            reason: "relative URL without a base".into(),
        });
        assert_eq!(err.exit_code(), exit_codes::CONFIG_ERROR);
    }
}
