//! Error types for value conversion and the JSON codec

use thiserror::Error;

/// Errors raised while converting between [`crate::SqlValue`] and Rust types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    #[error("Column '{0}' is missing from the result row")]
    MissingColumn(String),

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Value out of range for {target}: {value}")]
    OutOfRange { target: &'static str, value: String },

    #[error("Column '{column}': {source}")]
    Column {
        column: String,
        #[source]
        source: Box<ValueError>,
    },

    #[error("JSON column error: {0}")]
    Json(String),
}

impl ValueError {
    pub fn mismatch(expected: &'static str, found: &crate::SqlValue) -> Self {
        ValueError::TypeMismatch {
            expected,
            found: found.type_name(),
        }
    }

    /// Attach the column name to a conversion error
    pub fn in_column(self, column: &str) -> Self {
        match self {
            already @ ValueError::Column { .. } => already,
            other => ValueError::Column {
                column: column.to_string(),
                source: Box::new(other),
            },
        }
    }
}

/// Errors raised by the JSON column codec
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Malformed JSON payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("JSON payload is not an object (found {0})")]
    NotAnObject(&'static str),
}

/// Raised by the strict temporal parser when no accepted representation matches
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Unrecognized temporal value: '{0}'")]
pub struct TemporalError(pub String);
