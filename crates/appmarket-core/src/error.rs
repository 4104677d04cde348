//! Core error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Chart directory not found: {path}")]
    ChartNotFound { path: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Multi-arch probe failed for {image}: {message}")]
    Probe { image: String, message: String },
}

impl CoreError {
    /// Wrap an IO error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a probe error
    pub fn probe(image: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Probe {
            image: image.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
