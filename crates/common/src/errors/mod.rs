//! Error types for CiteForge
//!
//! Provides the error taxonomy shared by the client and the traversal engine:
//! - Distinct error types for different failure modes
//! - Error codes for machine-readable identification
//! - Rate-limit classification used when logging failed calls

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,

    // Resource errors (4xxx)
    PaperNotFound,

    // Rate limiting (6xxx)
    RateLimited,

    // External service errors (8xxx)
    UpstreamError,

    // Internal errors (9xxx)
    IoError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,

            ErrorCode::PaperNotFound => 4002,

            ErrorCode::RateLimited => 6001,

            ErrorCode::UpstreamError => 8001,

            ErrorCode::IoError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    // Resource errors
    #[error("Paper not found: {query}")]
    PaperNotFound { query: String },

    // Rate limiting
    #[error("Rate limited by {endpoint} after {attempts} attempts")]
    RateLimited { endpoint: String, attempts: u32 },

    // External service errors
    #[error("Upstream error {status} from {endpoint}")]
    Upstream { status: u16, endpoint: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::PaperNotFound { .. } => ErrorCode::PaperNotFound,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::Upstream { .. } | AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Io(_) => ErrorCode::IoError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
        }
    }

    /// Whether the remote service asked us to slow down
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AppError::RateLimited { .. })
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        let field = err.field_errors().keys().next().map(|f| f.to_string());
        AppError::Validation {
            message: err.to_string(),
            field,
        }
    }
}
