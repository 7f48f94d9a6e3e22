//! Query builder utilities
//!
//! This module provides SQL query construction utilities: caller post-SQL splitting,
//! structured conditions, the soft-delete rewriter, join planning and statement
//! generation.

pub mod builder;
pub mod filter;
pub mod join;
pub mod lexer;
pub mod pagination;
pub mod placeholders;
pub mod post_sql;
pub mod soft_delete;
pub mod sql_generation;
pub mod update;


pub use builder::{CompiledQuery, PostSql, QueryBuilder, SortOrder};
pub use filter::{ConditionNode, ConditionOperator, Operand};
pub use join::{JoinClause, JoinGroup, JoinPlan, JoinSpec, JoinType, ResolvedMember};
pub use pagination::{PageData, PageWindow};
pub use placeholders::number_placeholders;
pub use soft_delete::inject_soft_delete;
pub use sql_generation::{SqlGenerator, Statement, COUNT_COLUMN};
pub use update::{UpdateOperation, UpdateSet};
