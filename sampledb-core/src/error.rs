//! Error types for the document core

use thiserror::Error;

use crate::model::ProcessedKind;

/// Broad classification used by callers to pick an exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    Parse,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Sample '{sample}' not found")]
    SampleNotFound { sample: String },

    #[error("Sequencing type '{seq_type}' not found for sample '{sample}'")]
    SeqTypeNotFound { sample: String, seq_type: String },

    #[error("No {kind} entry with file_path '{file_path}' for sample '{sample}' ({seq_type})")]
    ProcessedFileNotFound {
        sample: String,
        seq_type: String,
        kind: ProcessedKind,
        file_path: String,
    },

    #[error("Missing required argument '{0}'")]
    MissingArgument(&'static str),

    #[error("At least one of {0} must be supplied")]
    NoFieldsSupplied(&'static str),

    #[error("Unknown data type '{0}' (expected one of: bam, vcf, cna, qc)")]
    UnknownDataKind(String),

    #[error("Unknown read designator '{0}' (expected R1, R2 or R3)")]
    UnknownRead(String),

    #[error("Could not extract lane (_L###) from filename '{0}'")]
    LaneNotInFilename(String),

    #[error("Could not extract read type (_R1_, _R2_ or _R3_) from filename '{0}'")]
    ReadNotInFilename(String),

    #[error("Epoch '{0}' is not an integer")]
    InvalidEpoch(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidDocument(err.to_string())
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::SampleNotFound { .. }
            | Error::SeqTypeNotFound { .. }
            | Error::ProcessedFileNotFound { .. } => ErrorKind::NotFound,
            Error::MissingArgument(_)
            | Error::NoFieldsSupplied(_)
            | Error::UnknownDataKind(_)
            | Error::UnknownRead(_) => ErrorKind::InvalidArgument,
            Error::LaneNotInFilename(_)
            | Error::ReadNotInFilename(_)
            | Error::InvalidEpoch(_)
            | Error::InvalidDocument(_) => ErrorKind::Parse,
        }
    }
}
