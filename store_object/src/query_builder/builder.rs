//! Query builder
//!
//! A [`QueryBuilder`] carries the caller's selection: raw post-SQL text, structured
//! condition nodes, or both. Compiling it yields the condition (still with `?`
//! placeholders) separately from the tail clauses, which is what the soft-delete rewriter
//! and the statement generator need.

use crate::errors::StoreError;
use crate::query_builder::filter::ConditionNode;
use crate::query_builder::post_sql::{split_post_sql, Clause, ClauseKind};
use crate::query_builder::soft_delete::conjoin;
use crate::validation::validate_column_reference;
use type_mapping::SqlValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Caller-written SQL following `FROM <table>`, with `?` placeholders
#[derive(Debug, Clone, PartialEq)]
pub struct PostSql {
    pub text: String,
    pub params: Vec<SqlValue>,
}

/// Query builder for constructing the selection part of a statement
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    pub(crate) post_sql: Option<PostSql>,
    pub(crate) conditions: Vec<ConditionNode>,
    pub(crate) order_by: Vec<(String, SortOrder)>,
    pub(crate) limit: Option<i64>,
    pub(crate) offset: Option<i64>,
}

/// Output of [`QueryBuilder::compile`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompiledQuery {
    pub condition: Option<String>,
    pub params: Vec<SqlValue>,
    pub clauses: Vec<Clause>,
}

impl CompiledQuery {
    pub fn has_clause(&self, pred: impl Fn(ClauseKind) -> bool) -> bool {
        self.clauses.iter().any(|c| pred(c.kind))
    }
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from raw post-SQL such as `"where name = ? or age > ? order by id"`
    pub fn raw(text: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            post_sql: Some(PostSql {
                text: text.into(),
                params,
            }),
            ..Self::default()
        }
    }

    /// Add a filter condition
    pub fn filter(mut self, condition: ConditionNode) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Add multiple filters (combined with AND)
    pub fn filters(mut self, conditions: impl IntoIterator<Item = ConditionNode>) -> Self {
        self.conditions.extend(conditions);
        self
    }

    /// Add ordering
    pub fn order_by(mut self, column: &str, order: SortOrder) -> Self {
        self.order_by.push((column.to_string(), order));
        self
    }

    /// Add limit
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Add offset
    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.post_sql.is_none()
            && self.conditions.is_empty()
            && self.order_by.is_empty()
            && self.limit.is_none()
            && self.offset.is_none()
    }

    /// Split into condition and tail clauses, validating placeholder counts and
    /// structured column references
    pub fn compile(&self) -> Result<CompiledQuery, StoreError> {
        let mut compiled = CompiledQuery::default();

        if let Some(post_sql) = &self.post_sql {
            let split = split_post_sql(&post_sql.text, post_sql.params.clone())?;
            compiled.condition = split.condition;
            compiled.params = split.condition_params;
            compiled.clauses = split.clauses;
        }

        for node in &self.conditions {
            let rendered = node.render(&mut compiled.params)?;
            compiled.condition = Some(match compiled.condition.take() {
                Some(existing) => conjoin(&existing, &rendered),
                None => rendered,
            });
        }

        let structured_tail = !self.order_by.is_empty() || self.limit.is_some() || self.offset.is_some();
        if structured_tail && !compiled.clauses.is_empty() {
            return Err(StoreError::invalid(
                "structured ordering or limits cannot be combined with a post-SQL tail",
            ));
        }

        if !self.order_by.is_empty() {
            let mut items = Vec::with_capacity(self.order_by.len());
            for (column, order) in &self.order_by {
                validate_column_reference(column)?;
                items.push(format!("{} {}", column, order.to_sql()));
            }
            compiled.clauses.push(Clause {
                kind: ClauseKind::OrderBy,
                text: format!("ORDER BY {}", items.join(", ")),
                params: Vec::new(),
            });
        }
        if let Some(limit) = self.limit {
            compiled.clauses.push(Clause {
                kind: ClauseKind::Limit,
                text: format!("LIMIT {}", limit.max(0)),
                params: Vec::new(),
            });
        }
        if let Some(offset) = self.offset {
            compiled.clauses.push(Clause {
                kind: ClauseKind::Offset,
                text: format!("OFFSET {}", offset.max(0)),
                params: Vec::new(),
            });
        }

        Ok(compiled)
    }
}
