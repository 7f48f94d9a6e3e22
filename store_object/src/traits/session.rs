//! Database session boundary
//!
//! The engine never talks to a driver directly. Everything goes through a
//! [`DatabaseSession`], which accepts SQL text with `$n` placeholders plus positional
//! parameters. Errors raised by the session are carried back to the caller unchanged.

use async_trait::async_trait;
use std::sync::Arc;
use type_mapping::{Row, SqlValue};

/// Error type produced by a session implementation
pub type SessionError = Box<dyn std::error::Error + Send + Sync>;

/// Callback deferred until the enclosing transaction commits
pub type PostCommitHook = Box<dyn FnOnce() + Send + 'static>;

#[async_trait]
pub trait DatabaseSession: Send + Sync {
    /// Run a statement that produces rows
    async fn fetch(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, SessionError>;

    /// Run a statement and report the number of affected rows
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64, SessionError>;

    /// Transaction this session runs inside, if any
    fn transaction(&self) -> Option<&dyn TransactionContext> {
        None
    }
}

/// Transaction boundary as seen by the engine
///
/// The implementation owns the hook queue: it runs queued hooks once after a successful
/// commit and discards them on rollback.
pub trait TransactionContext: Send + Sync {
    fn is_active(&self) -> bool;

    /// Queue `hook` for after the commit. Once the transaction has finished the hook is
    /// handed back unqueued; checking and queueing happen under one lock.
    fn register_post_commit(&self, hook: PostCommitHook) -> Result<(), PostCommitHook>;
}

#[async_trait]
impl<S: DatabaseSession + ?Sized> DatabaseSession for Arc<S> {
    async fn fetch(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, SessionError> {
        (**self).fetch(sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64, SessionError> {
        (**self).execute(sql, params).await
    }

    fn transaction(&self) -> Option<&dyn TransactionContext> {
        (**self).transaction()
    }
}
