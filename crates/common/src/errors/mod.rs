//! Error types for arxiv-digest
//!
//! Provides the run-level error taxonomy with:
//! - Distinct error types for each failure mode of a digest run
//! - Process exit code mapping
//! - Error codes for log correlation
//!
//! Degraded conditions (one paper failing feature extraction, a malformed
//! feed entry) are not errors: they are logged and the paper is excluded.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Configuration errors (1xxx)
    ConfigurationError,
    ValidationError,
    InvalidCredentials,

    // Source errors (2xxx)
    SourceUnavailable,
    InvalidQuery,
    MalformedResponse,

    // Ranking errors (3xxx)
    NoReferenceData,
    EmbeddingError,

    // Dispatch errors (4xxx)
    DispatchError,

    // Internal errors (9xxx)
    InternalError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ConfigurationError => 1001,
            ErrorCode::ValidationError => 1002,
            ErrorCode::InvalidCredentials => 1003,

            ErrorCode::SourceUnavailable => 2001,
            ErrorCode::InvalidQuery => 2002,
            ErrorCode::MalformedResponse => 2003,

            ErrorCode::NoReferenceData => 3001,
            ErrorCode::EmbeddingError => 3002,

            ErrorCode::DispatchError => 4001,

            ErrorCode::InternalError => 9001,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid credentials for {source_name}")]
    InvalidCredentials { source_name: String },

    // Source errors
    #[error("{source_name} unavailable: {message}")]
    SourceUnavailable { source_name: String, message: String },

    #[error("Invalid arXiv query: {query}")]
    InvalidQuery { query: String },

    #[error("Malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Ranking errors
    #[error("No reference papers available to rank against")]
    NoReferenceData,

    #[error("Embedding service error: {message}")]
    EmbeddingError { message: String },

    // Dispatch errors
    #[error("Failed to dispatch digest: {message}")]
    Dispatch { message: String },

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a [`AppError::SourceUnavailable`]
    pub fn source_unavailable(source_name: impl Into<String>, message: impl ToString) -> Self {
        AppError::SourceUnavailable {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Configuration { .. } | AppError::Config(_) => ErrorCode::ConfigurationError,
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidCredentials { .. } => ErrorCode::InvalidCredentials,
            AppError::SourceUnavailable { .. } => ErrorCode::SourceUnavailable,
            AppError::InvalidQuery { .. } => ErrorCode::InvalidQuery,
            AppError::Xml(_) | AppError::Serialization(_) => ErrorCode::MalformedResponse,
            AppError::NoReferenceData => ErrorCode::NoReferenceData,
            AppError::EmbeddingError { .. } => ErrorCode::EmbeddingError,
            AppError::Dispatch { .. } => ErrorCode::DispatchError,
            AppError::Internal { .. } | AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // 2: fails before any network call, or on rejected credentials
            AppError::Configuration { .. }
            | AppError::Validation { .. }
            | AppError::Config(_)
            | AppError::InvalidCredentials { .. } => 2,

            // 3: a read API was unreachable or returned garbage
            AppError::SourceUnavailable { .. }
            | AppError::InvalidQuery { .. }
            | AppError::Xml(_)
            | AppError::Serialization(_) => 3,

            // 4: ranking had nothing to compare against
            AppError::NoReferenceData | AppError::EmbeddingError { .. } => 4,

            // 5: transport refused the digest
            AppError::Dispatch { .. } => 5,

            AppError::Internal { .. } | AppError::Other(_) => 1,
        }
    }

    /// Check if the error was caused by user-supplied configuration
    pub fn is_configuration_error(&self) -> bool {
        self.exit_code() == 2
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
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
