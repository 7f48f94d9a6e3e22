//! # dbhelper
//!
//! A lightweight, metadata-driven data-access layer for PostgreSQL: entity metadata
//! derived at build time, soft-delete aware CRUD, bounded pagination, joined queries folded
//! into nested results, slow-query reporting and post-commit callbacks.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dbhelper::prelude::*;
//!
//! #[model]
//! #[table(name = "t_student")]
//! pub struct Student {
//!     #[primary_key]
//!     #[auto_increment]
//!     pub id: Option<i64>,
//!
//!     pub name: String,
//!
//!     #[soft_delete]
//!     pub deleted: bool,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let db = Database::connect(&config).await?;
//!     let helper = db.helper();
//!     helper.set_max_page_size(100);
//!     helper.set_timeout_warning_valve(500);
//!
//!     let mut student = Student { id: None, name: "wu".to_string(), deleted: false };
//!     helper.insert(&mut student).await?;
//!
//!     let page = helper
//!         .get_page::<Student>(1, 20, QueryBuilder::raw("where name like ?", params!["w%"]))
//!         .await?;
//!     println!("{} of {} students", page.data.len(), page.total);
//!
//!     let tx = db.begin().await?;
//!     tx.delete::<Student>(QueryBuilder::raw("where id = ?", params![student.id])).await?;
//!     tx.execute_after_commit(|| println!("student removed"))?;
//!     tx.session().commit().await?;
//!
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

pub mod core;
pub mod errors;
pub mod postgres;
pub mod prelude;

// Re-export the main public types for convenience
pub use crate::core::Database;
pub use errors::DbHelperError;
pub use postgres::{PgSession, PgTransactionSession};

// Re-export centralized config
pub use config::{AfterCommitPolicy, AppConfig, DatabaseConfig, HelperConfig};

// Re-export the engine surface
pub use store_object::{
    DbHelper, EntityRegistry, JoinSpec, JoinType, PageData, QueryBuilder, StoreError, UpdateSet,
};

// Derive macros; the generated code refers to the crates re-exported below
pub use table_derive::{JoinedEntity, TableMetadata, model};

// Re-export internal crates used by macros and public API
// These MUST be public for the generated macro code to work correctly
pub use config;
pub use store_object;
pub use type_mapping;

// Re-export external dependencies used in public API
pub use async_trait;
pub use sqlx;
