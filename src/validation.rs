//! Input validation for sampledb
//!
//! Identifiers end up as JSON object keys and, for file paths derived from
//! them, on disk; reject the ones that cannot be safely used as either.

use thiserror::Error;

/// Validation errors; the first field names what was being validated
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid {0} '{1}': {2}")]
    InvalidIdentifier(&'static str, String, &'static str),

    #[error("{0} '{1}' is too long (max {2} characters)")]
    TooLong(&'static str, String, usize),

    #[error("{0} cannot be empty")]
    Empty(&'static str),
}

/// Maximum length for identifiers
pub const MAX_IDENTIFIER_LENGTH: usize = 255;

/// Validate a sample key
pub fn validate_sample_key(sample: &str) -> Result<(), ValidationError> {
    validate_label(sample, "sample")
}

/// Validate a sequencing type such as `wgs` or `low_pass_wgs`
///
/// Stricter than other labels: only alphanumeric, underscore and hyphen.
pub fn validate_seq_type(seq_type: &str) -> Result<(), ValidationError> {
    validate_label(seq_type, "sequencing type")?;

    if !seq_type
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ValidationError::InvalidIdentifier(
            "sequencing type",
            seq_type.to_string(),
            "contains invalid characters (only alphanumeric, underscore, and hyphen allowed)",
        ));
    }

    Ok(())
}

/// Core label validation (gf ids, projects, runs, lanes, samples)
pub fn validate_label(value: &str, kind: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty(kind));
    }

    if value.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ValidationError::TooLong(
            kind,
            value.to_string(),
            MAX_IDENTIFIER_LENGTH,
        ));
    }

    if value.trim() != value {
        return Err(ValidationError::InvalidIdentifier(
            kind,
            value.to_string(),
            "has leading or trailing whitespace",
        ));
    }

    if value.contains('/') || value.contains('\\') {
        return Err(ValidationError::InvalidIdentifier(
            kind,
            value.to_string(),
            "contains path separators",
        ));
    }

    if value.chars().any(char::is_control) {
        return Err(ValidationError::InvalidIdentifier(
            kind,
            value.to_string(),
            "contains control characters",
        ));
    }

    Ok(())
}
