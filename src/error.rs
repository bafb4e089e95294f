// src/error.rs

//! Unified error handling for the backend handlers.

use std::fmt;

use thiserror::Error;

/// Result type alias for handler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
///
/// The first group mirrors the failure categories surfaced to callers;
/// the second group covers infrastructure failures, which handlers map to
/// `Internal` before returning.
#[derive(Error, Debug)]
pub enum AppError {
    /// No caller identity was attached to the request
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Caller lacks membership or admin rights
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A referenced document does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Missing or malformed request field
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Rate limit exceeded for this window
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Required configuration is absent
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    /// Generation pipeline failed after exhausting its recovery paths
    #[error("internal: {0}")]
    Internal(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl AppError {
    /// Create an unauthenticated error.
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated(message.into())
    }

    /// Create a permission-denied error.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a resource-exhausted error.
    pub fn resource_exhausted(message: impl Into<String>) -> Self {
        Self::ResourceExhausted(message.into())
    }

    /// Create a failed-precondition error.
    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self::FailedPrecondition(message.into())
    }

    /// Create an internal error with context.
    pub fn internal(message: impl fmt::Display) -> Self {
        Self::Internal(message.to_string())
    }

    /// Stable category code for the error, as surfaced to clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "unauthenticated",
            Self::PermissionDenied(_) => "permission-denied",
            Self::NotFound(_) => "not-found",
            Self::InvalidArgument(_) => "invalid-argument",
            Self::ResourceExhausted(_) => "resource-exhausted",
            Self::FailedPrecondition(_) => "failed-precondition",
            Self::Internal(_) | Self::Io(_) | Self::Http(_) | Self::Json(_) | Self::Toml(_) => {
                "internal"
            }
        }
    }
}
