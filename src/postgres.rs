//! PostgreSQL session adapter
//!
//! [`PgSession`] runs statements on a pool; [`PgTransactionSession`] runs them inside one
//! transaction and owns its post-commit hooks. Both translate between [`SqlValue`] and
//! PostgreSQL wire values.

use crate::errors::DbHelperError;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgArgumentBuffer, PgArguments, PgRow, PgTypeInfo};
use sqlx::query::Query;
use sqlx::{Column, Encode, PgPool, Postgres, Row as _, Transaction, TypeInfo, ValueRef};
use store_object::hooks::TransactionScope;
use store_object::traits::{DatabaseSession, SessionError, TransactionContext};
use tokio::sync::Mutex;
use type_mapping::{Row, SqlValue};

/// NULL parameter whose type the server infers from context
struct UntypedNull;

impl sqlx::Type<Postgres> for UntypedNull {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_oid(Oid(0))
    }
}

impl Encode<'_, Postgres> for UntypedNull {
    fn encode_by_ref(&self, _buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        Ok(IsNull::Yes)
    }
}

fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[SqlValue],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            SqlValue::Null => query.bind(UntypedNull),
            SqlValue::Bool(v) => query.bind(*v),
            SqlValue::Int(v) => query.bind(*v),
            SqlValue::Float(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.clone()),
            SqlValue::Uuid(v) => query.bind(*v),
            SqlValue::Timestamp(v) => query.bind(*v),
            SqlValue::Json(v) => query.bind(sqlx::types::Json(v.clone())),
        };
    }
    query
}

/// Convert a driver row into the engine's column/value row
pub fn decode_row(row: &PgRow) -> Result<Row, sqlx::Error> {
    let mut decoded = Row::with_capacity(row.len());
    for (index, column) in row.columns().iter().enumerate() {
        let value = if row.try_get_raw(index)?.is_null() {
            SqlValue::Null
        } else {
            decode_value(row, index, column.type_info().name())?
        };
        decoded.push(column.name(), value);
    }
    Ok(decoded)
}

/// How a PostgreSQL column type maps onto [`SqlValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    /// Read exactly and carried as its decimal text
    Numeric,
    Uuid,
    TimestampTz,
    Timestamp,
    Date,
    Time,
    Json,
    Text,
}

impl ColumnKind {
    fn of(type_name: &str) -> Option<Self> {
        let kind = match type_name {
            "BOOL" => Self::Bool,
            "INT2" => Self::Int2,
            "INT4" => Self::Int4,
            "INT8" => Self::Int8,
            "FLOAT4" => Self::Float4,
            "FLOAT8" => Self::Float8,
            "NUMERIC" => Self::Numeric,
            "UUID" => Self::Uuid,
            "TIMESTAMPTZ" => Self::TimestampTz,
            "TIMESTAMP" => Self::Timestamp,
            "DATE" => Self::Date,
            "TIME" => Self::Time,
            "JSON" | "JSONB" => Self::Json,
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CITEXT" | "UNKNOWN" => Self::Text,
            _ => return None,
        };
        Some(kind)
    }
}

fn decode_value(row: &PgRow, index: usize, type_name: &str) -> Result<SqlValue, sqlx::Error> {
    let Some(kind) = ColumnKind::of(type_name) else {
        return Err(sqlx::Error::ColumnDecode {
            index: format!("{index} ({})", row.columns()[index].name()),
            source: format!("unsupported column type {type_name}").into(),
        });
    };
    let value = match kind {
        ColumnKind::Bool => SqlValue::Bool(row.try_get(index)?),
        ColumnKind::Int2 => SqlValue::Int(row.try_get::<i16, _>(index)?.into()),
        ColumnKind::Int4 => SqlValue::Int(row.try_get::<i32, _>(index)?.into()),
        ColumnKind::Int8 => SqlValue::Int(row.try_get(index)?),
        ColumnKind::Float4 => SqlValue::Float(row.try_get::<f32, _>(index)?.into()),
        ColumnKind::Float8 => SqlValue::Float(row.try_get(index)?),
        ColumnKind::Numeric => SqlValue::Text(row.try_get::<Decimal, _>(index)?.to_string()),
        ColumnKind::Uuid => SqlValue::Uuid(row.try_get(index)?),
        ColumnKind::TimestampTz => SqlValue::Timestamp(row.try_get(index)?),
        // zone-less values are read as UTC
        ColumnKind::Timestamp => {
            SqlValue::Timestamp(row.try_get::<NaiveDateTime, _>(index)?.and_utc())
        }
        ColumnKind::Date => SqlValue::from(row.try_get::<NaiveDate, _>(index)?),
        ColumnKind::Time => SqlValue::Text(row.try_get::<NaiveTime, _>(index)?.to_string()),
        ColumnKind::Json => SqlValue::Json(row.try_get(index)?),
        ColumnKind::Text => SqlValue::Text(row.try_get(index)?),
    };
    Ok(value)
}

/// Session over a connection pool, each statement on its own connection
#[derive(Debug, Clone)]
pub struct PgSession {
    pool: PgPool,
}

impl PgSession {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DatabaseSession for PgSession {
    async fn fetch(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, SessionError> {
        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(decode_row).collect::<Result<_, _>>()?)
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64, SessionError> {
        let result = bind_params(sqlx::query(sql), params)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Session bound to one transaction.
///
/// Hooks registered through `execute_after_commit` run once after [`commit`] succeeds;
/// [`rollback`], a failed commit and dropping the session discard them.
///
/// [`commit`]: PgTransactionSession::commit
/// [`rollback`]: PgTransactionSession::rollback
pub struct PgTransactionSession {
    tx: Mutex<Option<Transaction<'static, Postgres>>>,
    scope: TransactionScope,
}

impl std::fmt::Debug for PgTransactionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgTransactionSession")
            .field("active", &self.scope.is_active())
            .field("pending_hooks", &self.scope.pending_hooks())
            .finish()
    }
}

impl PgTransactionSession {
    pub async fn begin(pool: &PgPool) -> Result<Self, DbHelperError> {
        let tx = pool.begin().await?;
        crate::debug_log!("Transaction started");
        Ok(Self {
            tx: Mutex::new(Some(tx)),
            scope: TransactionScope::new(),
        })
    }

    /// Commit, then run the post-commit hooks in registration order
    pub async fn commit(&self) -> Result<(), DbHelperError> {
        let tx = self
            .tx
            .lock()
            .await
            .take()
            .ok_or(DbHelperError::TransactionFinished)?;

        if let Err(err) = tx.commit().await {
            self.scope.rollback_hooks();
            return Err(err.into());
        }
        let _ran = self.scope.commit_hooks();
        crate::debug_log!("Transaction committed, {} post-commit hooks run", _ran);
        Ok(())
    }

    /// Roll back and drop the post-commit hooks
    pub async fn rollback(&self) -> Result<(), DbHelperError> {
        let tx = self
            .tx
            .lock()
            .await
            .take()
            .ok_or(DbHelperError::TransactionFinished)?;
        let _discarded = self.scope.rollback_hooks();
        crate::debug_log!("Transaction rolled back, {} post-commit hooks dropped", _discarded);
        tx.rollback().await?;
        Ok(())
    }
}

impl Drop for PgTransactionSession {
    fn drop(&mut self) {
        if self.scope.is_active() {
            let discarded = self.scope.rollback_hooks();
            if discarded > 0 {
                tracing::warn!(discarded, "Transaction dropped without commit, post-commit hooks discarded");
            }
        }
    }
}

#[async_trait]
impl DatabaseSession for PgTransactionSession {
    async fn fetch(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, SessionError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or(DbHelperError::TransactionFinished)?;
        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(&mut **tx)
            .await?;
        Ok(rows.iter().map(decode_row).collect::<Result<_, _>>()?)
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64, SessionError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or(DbHelperError::TransactionFinished)?;
        let result = bind_params(sqlx::query(sql), params)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected())
    }

    fn transaction(&self) -> Option<&dyn TransactionContext> {
        Some(&self.scope)
    }
}
