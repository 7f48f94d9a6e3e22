//! Store Object - the dbhelper engine
//!
//! This crate turns entity metadata and caller conditions into SQL, runs it through a
//! caller-supplied [`DatabaseSession`] and maps the rows back: metadata registry,
//! soft-delete aware statement generation, pagination, join folding, slow-query reporting
//! and post-commit hooks.

/// Debug logging that compiles away without the `debug-logging` feature
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        ::tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        ::tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod errors;
pub mod executor;
pub mod helper;
pub mod hooks;
pub mod metadata;
pub mod prelude;
pub mod query_builder;
pub mod registry;
pub mod settings;
pub mod traits;
pub mod validation;

pub use errors::{MappingError, StoreError};
pub use helper::DbHelper;
pub use hooks::{AfterCommitOutcome, HookQueue, TransactionScope};
pub use metadata::{ColumnDescriptor, EntityDescriptor, EntityMetadata, SoftDeleteFlag};
pub use query_builder::{
    ConditionNode, ConditionOperator, JoinGroup, JoinPlan, JoinSpec, JoinType, PageData,
    QueryBuilder, SortOrder, SqlGenerator, Statement, UpdateOperation, UpdateSet,
};
pub use registry::{EntityRegistry, EntityShape};
pub use settings::{HelperSettings, SlowQuery, SlowQueryCallback};
pub use traits::*;
pub use validation::{ValidatedIdentifier, ValidationError};

pub use config::{AfterCommitPolicy, HelperConfig};
pub use type_mapping;
