//! Unified error handling for the walks-tracker library.
//!
//! The taxonomy is deliberately narrow: bad inputs at the boundary, bad
//! configuration, and storage failures. Missing data is never an error; the
//! statistics functions return zeroed or `None` fields instead.

use thiserror::Error;

/// Unified error type for walks-tracker operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackerError {
    /// Input rejected at the boundary (negative miles, reversed date range,
    /// non-monotonic waypoints, zero goal)
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Persistence/storage error
    #[error("Persistence error: {message}")]
    Persistence { message: String },
}

impl TrackerError {
    pub fn invalid(message: impl Into<String>) -> Self {
        TrackerError::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        TrackerError::Config {
            message: message.into(),
        }
    }
}

#[cfg(feature = "persistence")]
impl From<rusqlite::Error> for TrackerError {
    fn from(err: rusqlite::Error) -> Self {
        TrackerError::Persistence {
            message: err.to_string(),
        }
    }
}

/// Result type alias for walks-tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Extension trait for converting Option to TrackerError.
pub trait OptionExt<T> {
    /// Convert Option to Result with an invalid argument error.
    fn ok_or_invalid(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_invalid(self, message: &str) -> Result<T> {
        self.ok_or_else(|| TrackerError::invalid(message))
    }
}
