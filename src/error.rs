//! Error types for sampledb
//!
//! Wraps document-level errors from `sampledb-core` together with the
//! failures of the surrounding I/O, configuration and schema layers.

use std::path::PathBuf;
use thiserror::Error;

pub use sampledb_core::ErrorKind;

/// The main error type for sampledb operations
#[derive(Debug, Error)]
pub enum Error {
    // ==========================================================================
    // Document Errors
    // ==========================================================================
    #[error(transparent)]
    Document(#[from] sampledb_core::Error),

    #[error("Database file '{path}' does not exist")]
    DatabaseNotFound { path: PathBuf },

    #[error("Database file '{path}' already exists")]
    DatabaseAlreadyExists { path: PathBuf },

    #[error("No FASTQ file with a parseable lane and read found in '{path}'")]
    NoFastqFiles { path: PathBuf },

    // ==========================================================================
    // Schema Errors
    // ==========================================================================
    #[error("Invalid schema '{source_name}': {message}")]
    InvalidSchema { source_name: String, message: String },

    // ==========================================================================
    // Validation Errors
    // ==========================================================================
    #[error("Invalid {kind} '{value}': {reason}")]
    InvalidIdentifier {
        kind: &'static str,
        value: String,
        reason: &'static str,
    },

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    #[error("Failed to load config '{path}': {message}")]
    ConfigError { path: PathBuf, message: String },

    // ==========================================================================
    // IO Errors
    // ==========================================================================
    #[error("Failed to read file '{path}': {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete file '{path}': {source}")]
    FileDeleteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ==========================================================================
    // Serialization Errors
    // ==========================================================================
    #[error("Failed to parse JSON: {message}")]
    JsonParseError { message: String },

    #[error("Failed to serialize JSON: {message}")]
    JsonSerializeError { message: String },

    #[error("Failed to parse YAML: {message}")]
    YamlParseError { message: String },

    // ==========================================================================
    // Catch-all
    // ==========================================================================
    #[error("{0}")]
    Other(String),
}

/// Result type alias for sampledb operations
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Conversions from external error types
// =============================================================================

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::JsonParseError {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::YamlParseError {
            message: err.to_string(),
        }
    }
}

impl From<crate::validation::ValidationError> for Error {
    fn from(err: crate::validation::ValidationError) -> Self {
        match err {
            crate::validation::ValidationError::InvalidIdentifier(kind, value, reason) => {
                Error::InvalidIdentifier { kind, value, reason }
            }
            crate::validation::ValidationError::TooLong(kind, value, _max) => {
                Error::InvalidIdentifier {
                    kind,
                    value,
                    reason: "exceeds maximum length",
                }
            }
            crate::validation::ValidationError::Empty(kind) => Error::InvalidIdentifier {
                kind,
                value: String::new(),
                reason: "cannot be empty",
            },
        }
    }
}

// =============================================================================
// Error Display Helpers
// =============================================================================

impl Error {
    /// Broad classification, where one applies
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Document(err) => Some(err.kind()),
            Error::DatabaseNotFound { .. } => Some(ErrorKind::NotFound),
            Error::InvalidIdentifier { .. } | Error::NoFastqFiles { .. } => {
                Some(ErrorKind::InvalidArgument)
            }
            Error::JsonParseError { .. } | Error::YamlParseError { .. } => Some(ErrorKind::Parse),
            _ => None,
        }
    }

    /// Returns a user-friendly suggestion for fixing the error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::Document(sampledb_core::Error::SampleNotFound { .. }) => {
                Some("Register the sample first with: sampledb add-sample <sample>")
            }
            Error::Document(sampledb_core::Error::LaneNotInFilename(_))
            | Error::Document(sampledb_core::Error::ReadNotInFilename(_)) => {
                Some("Use add-fastq and give the lane and reads explicitly")
            }
            Error::Document(sampledb_core::Error::NoFieldsSupplied(_)) => {
                Some("Pass at least one of the listed options")
            }
            Error::DatabaseNotFound { .. } => {
                Some("Create it with: sampledb init, or point --db at an existing file")
            }
            Error::InvalidIdentifier { .. } => {
                Some("Identifiers may not be blank or contain path separators")
            }
            _ => None,
        }
    }

    /// Returns true if retrying with corrected input can succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            Some(ErrorKind::NotFound) | Some(ErrorKind::InvalidArgument) | Some(ErrorKind::Parse)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::DatabaseNotFound {
            path: PathBuf::from("samples.json"),
        };
        assert_eq!(err.to_string(), "Database file 'samples.json' does not exist");
    }

    #[test]
    fn test_core_errors_pass_through() {
        let err: Error = sampledb_core::Error::SampleNotFound {
            sample: "S1".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Sample 'S1' not found");
        assert_eq!(err.kind(), Some(ErrorKind::NotFound));
        assert!(err.suggestion().is_some());
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_io_errors_not_recoverable() {
        let err = Error::FileWriteError {
            path: PathBuf::from("x"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        };
        assert!(!err.is_recoverable());
    }
}
