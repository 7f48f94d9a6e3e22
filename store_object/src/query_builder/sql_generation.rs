//! Statement generation
//!
//! Every generator assembles SQL with `?` placeholders and finishes through
//! [`number_placeholders`], so parameter order always equals textual order.

use crate::errors::StoreError;
use crate::metadata::EntityMetadata;
use crate::query_builder::builder::{CompiledQuery, QueryBuilder};
use crate::query_builder::join::JoinPlan;
use crate::query_builder::lexer::references_column;
use crate::query_builder::pagination::PageWindow;
use crate::query_builder::placeholders::number_placeholders;
use crate::query_builder::post_sql::{render_clauses, Clause, ClauseKind};
use crate::query_builder::soft_delete::{conjoin, inject_soft_delete};
use crate::query_builder::update::UpdateSet;
use type_mapping::row::aliased_column;
use type_mapping::SqlValue;

/// Executable statement: SQL with `$n` placeholders and its parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    /// Number the `?` placeholders of `sql` and pair it with `params`
    pub fn build(sql: &str, params: Vec<SqlValue>) -> Result<Self, StoreError> {
        Ok(Self {
            sql: number_placeholders(sql, params.len())?,
            params,
        })
    }
}

/// Label of the count column in generated count statements
pub const COUNT_COLUMN: &str = "total";

pub struct SqlGenerator;

impl SqlGenerator {
    /// `SELECT <columns> FROM <table>` with the live-row filter and caller tail
    pub fn select(meta: &EntityMetadata, query: &QueryBuilder) -> Result<Statement, StoreError> {
        let compiled = query.compile()?;
        let mut sql = format!("SELECT {} FROM {}", meta.column_list(), meta.table());
        let mut params = compiled.params.clone();
        push_where(&mut sql, live_condition(meta, compiled.condition.as_deref()));
        push_tail(&mut sql, &mut params, compiled.clauses.iter());
        Statement::build(&sql, params)
    }

    /// Like [`SqlGenerator::select`] but reads at most one row unless the caller limited it
    pub fn select_first(meta: &EntityMetadata, query: &QueryBuilder) -> Result<Statement, StoreError> {
        let compiled = query.compile()?;
        if compiled.has_clause(ClauseKind::is_row_limit) {
            return Self::select(meta, query);
        }
        Self::select_window(meta, compiled, 1, 0)
    }

    /// One page of rows; a caller LIMIT/OFFSET conflicts with the page window
    pub fn select_page(
        meta: &EntityMetadata,
        query: &QueryBuilder,
        window: &PageWindow,
    ) -> Result<Statement, StoreError> {
        let compiled = query.compile()?;
        if compiled.has_clause(ClauseKind::is_row_limit) {
            return Err(StoreError::invalid(
                "paged queries cannot carry their own LIMIT/OFFSET",
            ));
        }
        Self::select_window(meta, compiled, window.limit, window.offset)
    }

    fn select_window(
        meta: &EntityMetadata,
        compiled: CompiledQuery,
        limit: i64,
        offset: i64,
    ) -> Result<Statement, StoreError> {
        let mut sql = format!("SELECT {} FROM {}", meta.column_list(), meta.table());
        let mut params = compiled.params.clone();
        push_where(&mut sql, live_condition(meta, compiled.condition.as_deref()));

        let (locking, others): (Vec<&Clause>, Vec<&Clause>) = compiled
            .clauses
            .iter()
            .partition(|c| c.kind == ClauseKind::Locking);
        push_tail(&mut sql, &mut params, others);
        sql.push_str(&format!(" LIMIT {}", limit));
        if offset > 0 {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
        push_tail(&mut sql, &mut params, locking);
        Statement::build(&sql, params)
    }

    /// `COUNT(*)` of the live rows matched by the query. Grouped queries are counted
    /// through a sub-select; ordering, limits and locking are dropped.
    pub fn count(meta: &EntityMetadata, query: &QueryBuilder) -> Result<Statement, StoreError> {
        let compiled = query.compile()?;
        let mut params = compiled.params.clone();
        let condition = live_condition(meta, compiled.condition.as_deref());

        let grouping: Vec<&Clause> = compiled
            .clauses
            .iter()
            .filter(|c| c.kind.is_grouping())
            .collect();

        let sql = if grouping.is_empty() {
            let mut sql = format!("SELECT COUNT(*) AS {} FROM {}", COUNT_COLUMN, meta.table());
            push_where(&mut sql, condition);
            sql
        } else {
            let mut inner = format!("SELECT 1 FROM {}", meta.table());
            push_where(&mut inner, condition);
            push_tail(&mut inner, &mut params, grouping);
            format!("SELECT COUNT(*) AS {} FROM ({}) AS grouped", COUNT_COLUMN, inner)
        };
        Statement::build(&sql, params)
    }

    pub fn select_by_key(meta: &EntityMetadata, key: SqlValue) -> Result<Statement, StoreError> {
        let mut sql = format!(
            "SELECT {} FROM {} WHERE {} = ?",
            meta.column_list(),
            meta.table(),
            meta.primary_key().name
        );
        if let Some(flag) = meta.soft_delete_flag() {
            sql.push_str(&format!(" AND {} = {}", flag.column, flag.live));
        }
        Statement::build(&sql, vec![key])
    }

    /// `INSERT` of the non-null insertable columns, returning the primary key
    pub fn insert(meta: &EntityMetadata, values: &[SqlValue]) -> Result<Statement, StoreError> {
        check_arity(meta, values)?;
        let mut columns = Vec::new();
        let mut params = Vec::new();
        for (column, value) in meta.columns().iter().zip(values) {
            if !column.insertable || value.is_null() {
                continue;
            }
            columns.push(column.name.as_str());
            params.push(value.clone());
        }

        let pk = &meta.primary_key().name;
        let sql = if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", meta.table(), pk)
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
                meta.table(),
                columns.join(", "),
                vec!["?"; columns.len()].join(", "),
                pk
            )
        };
        Statement::build(&sql, params)
    }

    /// `UPDATE` by primary key of the non-null updatable columns of a live row.
    /// `None` when there is nothing to write.
    pub fn update_by_key(
        meta: &EntityMetadata,
        values: &[SqlValue],
    ) -> Result<Option<Statement>, StoreError> {
        check_arity(meta, values)?;
        let key = primary_key_value(meta, values)?;

        let mut assignments = Vec::new();
        let mut params = Vec::new();
        for (column, value) in meta.columns().iter().zip(values) {
            if column.primary_key || column.soft_delete || !column.updatable || value.is_null() {
                continue;
            }
            assignments.push(format!("{} = ?", column.name));
            params.push(value.clone());
        }
        if assignments.is_empty() {
            return Ok(None);
        }

        let mut sql = format!(
            "UPDATE {} SET {} WHERE {} = ?",
            meta.table(),
            assignments.join(", "),
            meta.primary_key().name
        );
        params.push(key);
        if let Some(flag) = meta.soft_delete_flag() {
            sql.push_str(&format!(" AND {} = {}", flag.column, flag.live));
        }
        Statement::build(&sql, params).map(Some)
    }

    /// `UPDATE ... SET <set> WHERE <condition>` over live rows; requires a condition
    pub fn update_where(
        meta: &EntityMetadata,
        set: &UpdateSet,
        query: &QueryBuilder,
    ) -> Result<Statement, StoreError> {
        if set.is_empty() {
            return Err(StoreError::invalid("update_where needs at least one assignment"));
        }
        let compiled = guarded_condition(meta, query, "update")?;
        let (assignments, mut params) = set.render(meta)?;
        params.extend(compiled.params);

        let mut sql = format!("UPDATE {} SET {}", meta.table(), assignments);
        push_where(&mut sql, live_condition(meta, compiled.condition.as_deref()));
        Statement::build(&sql, params)
    }

    /// Delete matching rows: a flag update for soft-delete entities, `DELETE` otherwise.
    /// Requires a condition.
    pub fn delete_where(meta: &EntityMetadata, query: &QueryBuilder) -> Result<Statement, StoreError> {
        let compiled = guarded_condition(meta, query, "delete")?;
        let condition = live_condition(meta, compiled.condition.as_deref());
        let mut sql = match meta.soft_delete_flag() {
            Some(flag) => format!("UPDATE {} SET {} = {}", meta.table(), flag.column, flag.deleted),
            None => format!("DELETE FROM {}", meta.table()),
        };
        push_where(&mut sql, condition);
        Statement::build(&sql, compiled.params)
    }

    pub fn delete_by_key(meta: &EntityMetadata, key: SqlValue) -> Result<Statement, StoreError> {
        if key.is_null() {
            return Err(StoreError::invalid(format!(
                "cannot delete from '{}' by a NULL key",
                meta.table()
            )));
        }
        let pk = &meta.primary_key().name;
        let sql = match meta.soft_delete_flag() {
            Some(flag) => format!(
                "UPDATE {} SET {} = {} WHERE {} = ? AND {} = {}",
                meta.table(),
                flag.column,
                flag.deleted,
                pk,
                flag.column,
                flag.live
            ),
            None => format!("DELETE FROM {} WHERE {} = ?", meta.table(), pk),
        };
        Statement::build(&sql, vec![key])
    }

    /// Joined select. The root's live-row predicate goes into `WHERE`; each joined
    /// member's goes into its `ON` clause so outer joins keep roots without a match.
    pub fn select_joined(plan: &JoinPlan, query: &QueryBuilder) -> Result<Statement, StoreError> {
        let compiled = query.compile()?;
        let caller_condition = compiled.condition.as_deref().unwrap_or("");

        let projection: Vec<String> = plan
            .members()
            .iter()
            .flat_map(|member| {
                member.metadata.columns().iter().map(move |column| {
                    format!(
                        "{}.{} AS \"{}\"",
                        member.alias,
                        column.name,
                        aliased_column(&member.alias, &column.name)
                    )
                })
            })
            .collect();

        let root = plan.root();
        let mut sql = format!(
            "SELECT {} FROM {} {}",
            projection.join(", "),
            root.metadata.table(),
            root.alias
        );

        for member in plan.joined() {
            let Some(clause) = &member.clause else {
                continue;
            };
            let on = match member.metadata.soft_delete_flag() {
                Some(flag)
                    if !references_column(caller_condition, flag.column, Some(member.alias.as_str()))
                        && !references_column(&clause.on, flag.column, Some(member.alias.as_str())) =>
                {
                    conjoin(
                        &clause.on,
                        &format!("{}.{} = {}", member.alias, flag.column, flag.live),
                    )
                }
                _ => clause.on.trim().to_string(),
            };
            sql.push_str(&format!(
                " {} {} {} ON {}",
                clause.join_type.to_sql(),
                member.metadata.table(),
                member.alias,
                on
            ));
        }

        let condition = match root.metadata.soft_delete_flag() {
            Some(flag) => Some(inject_soft_delete(
                compiled.condition.as_deref(),
                flag.column,
                Some(root.alias.as_str()),
                flag.live,
            )),
            None => compiled.condition.clone(),
        };
        let mut params = compiled.params.clone();
        push_where(&mut sql, condition);
        push_tail(&mut sql, &mut params, compiled.clauses.iter());
        Statement::build(&sql, params)
    }
}

fn live_condition(meta: &EntityMetadata, condition: Option<&str>) -> Option<String> {
    match meta.soft_delete_flag() {
        Some(flag) => Some(inject_soft_delete(condition, flag.column, None, flag.live)),
        None => condition.map(str::to_string),
    }
}

fn guarded_condition(
    meta: &EntityMetadata,
    query: &QueryBuilder,
    operation: &'static str,
) -> Result<CompiledQuery, StoreError> {
    let compiled = query.compile()?;
    if compiled.condition.as_deref().is_none_or(|c| c.trim().is_empty()) {
        tracing::warn!(table = meta.table(), operation, "Rejected unconditional statement");
        return Err(StoreError::UnsafeOperation {
            table: meta.table().to_string(),
            operation,
        });
    }
    if !compiled.clauses.is_empty() {
        return Err(StoreError::invalid(format!(
            "{} statements cannot carry ORDER BY/GROUP BY/LIMIT clauses",
            operation
        )));
    }
    Ok(compiled)
}

fn push_where(sql: &mut String, condition: Option<String>) {
    if let Some(condition) = condition.filter(|c| !c.trim().is_empty()) {
        sql.push_str(" WHERE ");
        sql.push_str(&condition);
    }
}

fn push_tail<'a>(
    sql: &mut String,
    params: &mut Vec<SqlValue>,
    clauses: impl IntoIterator<Item = &'a Clause>,
) {
    let (tail, tail_params) = render_clauses(clauses);
    if !tail.is_empty() {
        sql.push(' ');
        sql.push_str(&tail);
        params.extend(tail_params);
    }
}

fn check_arity(meta: &EntityMetadata, values: &[SqlValue]) -> Result<(), StoreError> {
    if values.len() != meta.columns().len() {
        return Err(StoreError::invalid(format!(
            "'{}' has {} columns but {} values were supplied",
            meta.table(),
            meta.columns().len(),
            values.len()
        )));
    }
    Ok(())
}

/// Primary key value out of a full column value list
pub(crate) fn primary_key_value(meta: &EntityMetadata, values: &[SqlValue]) -> Result<SqlValue, StoreError> {
    match values.get(meta.primary_key_index()) {
        Some(key) if !key.is_null() => Ok(key.clone()),
        _ => Err(StoreError::invalid(format!(
            "'{}' entity has no primary key value",
            meta.table()
        ))),
    }
}
