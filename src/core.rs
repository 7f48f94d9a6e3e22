//! Core dbhelper functionality
//!
//! [`Database`] owns the connection pool and the pool-backed helper, and hands out
//! transaction-bound helpers that share its settings and metadata cache.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use store_object::DbHelper;

use crate::errors::DbHelperError;
use crate::postgres::{PgSession, PgTransactionSession};
use config::{AppConfig, HelperConfig};

pub struct Database {
    pool: PgPool,
    helper: DbHelper<PgSession>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("pool_size", &self.pool.size())
            .field("helper", &self.helper)
            .finish()
    }
}

impl Database {
    /// Connect with the database section of `config` and build the helper from its
    /// helper section
    pub async fn connect(config: &AppConfig) -> Result<Self, DbHelperError> {
        config.validate()?;
        let database = &config.database;

        let mut pool_options = PgPoolOptions::new()
            .max_connections(database.max_connections)
            .min_connections(database.min_connections)
            .acquire_timeout(Duration::from_secs(database.connection_timeout_seconds))
            .idle_timeout(Duration::from_secs(database.idle_timeout_seconds));

        // Set max lifetime if specified
        if database.max_lifetime_seconds > 0 {
            pool_options =
                pool_options.max_lifetime(Duration::from_secs(database.max_lifetime_seconds));
        }

        let pool = pool_options.connect(&database.connection_string()).await?;
        tracing::info!(
            host = %database.host,
            database = %database.database,
            "Connected to PostgreSQL"
        );

        Ok(Self::from_pool(pool, &config.helper))
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool, helper: &HelperConfig) -> Self {
        let helper = DbHelper::from_config(PgSession::new(pool.clone()), helper);
        Self { pool, helper }
    }

    /// Get database pool reference
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn helper(&self) -> &DbHelper<PgSession> {
        &self.helper
    }

    /// Start a transaction. Commit or roll back through the returned helper's
    /// [`session`](DbHelper::session).
    pub async fn begin(&self) -> Result<DbHelper<PgTransactionSession>, DbHelperError> {
        let session = PgTransactionSession::begin(&self.pool).await?;
        Ok(self.helper.with_session(session))
    }

    /// Check database connection health
    pub async fn health_check(&self) -> Result<(), DbHelperError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
