//! Error types for registry lookups

use thiserror::Error;

/// Registry operation errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid registry URL: {url} - {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Tag not found: {image}:{tag}")]
    TagNotFound { image: String, tag: String },

    #[error("HTTP error: {status} - {message}")]
    HttpError { status: u16, message: String },

    #[error("Rate limited by registry. Retry after {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Request timeout after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Invalid tag metadata: {0}")]
    InvalidResponse(String),
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

impl RegistryError {
    /// Classify a transport error; `timeout_secs` is the client's bound
    pub fn from_transport(e: reqwest::Error, timeout_secs: u64) -> Self {
        if e.is_timeout() {
            RegistryError::Timeout {
                seconds: timeout_secs,
            }
        } else {
            RegistryError::from(e)
        }
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            RegistryError::NetworkError {
                message: format!("Connection failed: {}", e),
            }
        } else if let Some(status) = e.status() {
            RegistryError::HttpError {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else if e.is_decode() {
            RegistryError::InvalidResponse(e.to_string())
        } else {
            RegistryError::NetworkError {
                message: e.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(e: serde_json::Error) -> Self {
        RegistryError::InvalidResponse(e.to_string())
    }
}

impl From<RegistryError> for appmarket_core::CoreError {
    fn from(e: RegistryError) -> Self {
        let image = match &e {
            RegistryError::TagNotFound { image, tag } => format!("{image}:{tag}"),
            _ => String::new(),
        };
        appmarket_core::CoreError::probe(image, e.to_string())
    }
}
