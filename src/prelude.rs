//! Convenience re-exports for common dbhelper usage
//!
//! This prelude module re-exports the most commonly used items of the workspace, making it
//! easier to import everything you need with a single use statement.
//!
//! # Example
//!
//! ```rust
//! use dbhelper::prelude::*;
//!
//! let query = QueryBuilder::raw("where name = ? or age > ?", params!["wu", 18]);
//! assert!(!query.is_empty());
//! ```

// Core components
pub use crate::core::Database;
pub use crate::errors::DbHelperError;
pub use crate::postgres::{PgSession, PgTransactionSession};

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, HelperConfig};

// Re-export commonly used store-object types for convenience
pub use store_object::prelude::*;

// Re-export table derive for model creation
pub use table_derive::{JoinedEntity, TableMetadata, model};

// Common external dependencies
pub use async_trait;
pub use chrono::{DateTime, Utc};
pub use sqlx;
pub use tokio;
pub use uuid::Uuid;
