use crate::traits::session::SessionError;
use crate::validation::ValidationError;
use thiserror::Error;
use type_mapping::{CodecError, ValueError};

/// Bad or incomplete entity metadata
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MappingError {
    #[error("Entity '{table}' declares no primary key")]
    MissingPrimaryKey { table: String },

    #[error("Entity '{table}' declares several primary keys: {columns:?}")]
    MultiplePrimaryKeys { table: String, columns: Vec<String> },

    #[error("Entity '{table}' maps column '{column}' more than once")]
    DuplicateColumn { table: String, column: String },

    #[error("Entity '{table}' binds field '{field}' to more than one column")]
    DuplicateField { table: String, field: String },

    #[error("Entity '{table}' declares several soft-delete columns: {columns:?}")]
    MultipleSoftDeleteColumns { table: String, columns: Vec<String> },

    #[error("Soft-delete column '{table}.{column}' must be boolean or number, found {found}")]
    InvalidSoftDeleteType {
        table: String,
        column: String,
        found: &'static str,
    },

    #[error("Soft-delete column '{table}.{column}' cannot be the primary key")]
    SoftDeleteOnPrimaryKey { table: String, column: String },

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(#[from] ValidationError),

    #[error("Join alias '{0}' is used more than once")]
    DuplicateJoinAlias(String),

    #[error("Join alias '{0}' is not part of the join")]
    UnknownJoinAlias(String),

    #[error("Join member '{0}' needs an ON condition")]
    MissingJoinCondition(String),

    #[error("Joined row for alias '{0}' is required but missing")]
    MissingJoinedRow(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    #[error("Refusing to {operation} every row of '{table}': a condition is required")]
    UnsafeOperation {
        table: String,
        operation: &'static str,
    },

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Value error: {0}")]
    Value(#[from] ValueError),

    #[error("No active transaction to attach the post-commit callback to")]
    NoActiveTransaction,

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Database error: {0}")]
    Database(#[source] SessionError),
}

impl StoreError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        StoreError::InvalidQuery(message.into())
    }

    /// The session error carried by [`StoreError::Database`], if any
    pub fn session_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            StoreError::Database(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(err: ValidationError) -> Self {
        StoreError::Mapping(MappingError::InvalidIdentifier(err))
    }
}
