//! Convenience re-exports for common store-object usage

// Core traits
pub use crate::traits::{DatabaseSession, JoinedEntity, TableMetadata, TransactionContext};

// Error types
pub use crate::errors::{MappingError, StoreError};

// Operation surface
pub use crate::helper::DbHelper;
pub use crate::hooks::AfterCommitOutcome;
pub use crate::settings::SlowQuery;

// Query building
pub use crate::query_builder::{
    ConditionNode, JoinSpec, JoinType, PageData, QueryBuilder, SortOrder, UpdateSet,
};

pub use config::AfterCommitPolicy;

// Value model
pub use type_mapping::{params, Json, Row, SqlValue};

// Common external dependencies that are frequently used
pub use async_trait::async_trait;
pub use serde::{Deserialize, Serialize};
