use std::fmt;

use thiserror::Error;

/// A single structured schema failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub data_path: String,
    pub message: String,
}

/// Structured schema validation failure: an ordered list of violations.
#[derive(Debug)]
pub struct JsonValidationError {
    pub errors: Vec<SchemaViolation>,
}

impl std::error::Error for JsonValidationError {}

impl fmt::Display for JsonValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Schema validation failed:")?;
        for violation in &self.errors {
            write!(f, " {} {};", violation.data_path, violation.message)?;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid entity: {0}")]
    Shape(String),

    #[error("Hash mismatch for '{field}'")]
    HashMismatch { field: String },

    #[error("Invalid signature: {0}")]
    Signature(String),

    #[error("Timestamp {timestamp} is outside the allowed window of {limit}s around now")]
    TimestampOutsideLimit { timestamp: u64, limit: u64 },

    #[error(transparent)]
    JsonValidation(#[from] JsonValidationError),

    #[error("Invalid query parameter '{field}': {message}")]
    QueryParameter { field: String, message: String },

    #[error(transparent)]
    Identity(#[from] identity::IdentityError),
}

pub type Result<T> = std::result::Result<T, ValidationError>;
