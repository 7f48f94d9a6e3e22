//! Traits for database operations
//!
//! This module contains the seams of the engine: entity metadata produced by the derive
//! macros, composite (joined) results, and the database session / transaction context
//! supplied by the caller.

pub mod joined;
pub mod session;
pub mod table_metadata;

pub use joined::JoinedEntity;
pub use session::{DatabaseSession, PostCommitHook, SessionError, TransactionContext};
pub use table_metadata::TableMetadata;
