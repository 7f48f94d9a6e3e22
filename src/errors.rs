//! Error types for the dbhelper crate
//!
//! This module contains the error type returned by the facade: connection and
//! configuration failures plus everything the engine reports.

use config::ConfigError;
use store_object::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbHelperError {
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Transaction already committed or rolled back")]
    TransactionFinished,
}
