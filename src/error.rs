//! Error types for the status board.
//!
//! This module provides structured errors for registry, device and
//! configuration operations, with HTTP status code mappings for API responses.

use crate::device::DisplayError;

/// Result type for status board operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Status board errors with structured context.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Rejected input (value length, name pattern). Nothing was mutated.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Unknown service name.
    #[error("service not found: {name}")]
    NotFound { name: String },

    /// The display failed. Not retried; the board is expected to halt.
    #[error("display device failure: {0}")]
    DeviceFailure(#[from] DisplayError),

    /// Startup configuration is invalid.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// IO error with context.
    #[error("IO error in {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Create an invalid configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigInvalid(message.into())
    }

    /// Returns true for errors that must stop the process.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::DeviceFailure(_) | Self::ConfigInvalid(_))
    }

    /// Get the appropriate HTTP status code for this error.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::NotFound { .. } => 404,
            Self::DeviceFailure(_) | Self::ConfigInvalid(_) | Self::Io { .. } => 500,
        }
    }

    /// Get a client-safe error message (doesn't leak internal details).
    pub fn client_message(&self) -> &str {
        match self {
            Self::InvalidInput(msg) => msg,
            Self::NotFound { .. } => "No such service",
            _ => "Internal server error",
        }
    }
}
