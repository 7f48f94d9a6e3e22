//! Timed statement execution
//!
//! Every statement the helper issues goes through [`Executor`], which measures it and
//! reports slow executions (successful or not) to the tracing target
//! `dbhelper::slow_query` and to the configured callback.

use crate::errors::StoreError;
use crate::query_builder::Statement;
use crate::settings::{HelperSettings, SlowQuery};
use crate::traits::DatabaseSession;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};
use type_mapping::Row;

pub struct Executor<'a, S: DatabaseSession + ?Sized> {
    session: &'a S,
    settings: &'a HelperSettings,
}

impl<'a, S: DatabaseSession + ?Sized> Executor<'a, S> {
    pub fn new(session: &'a S, settings: &'a HelperSettings) -> Self {
        Self { session, settings }
    }

    pub async fn fetch(&self, statement: &Statement) -> Result<Vec<Row>, StoreError> {
        crate::trace_log!(sql = %statement.sql, params = statement.params.len(), "fetch");
        let started = Instant::now();
        let result = self.session.fetch(&statement.sql, &statement.params).await;
        self.observe(started.elapsed(), statement);
        result.map_err(StoreError::Database)
    }

    pub async fn execute(&self, statement: &Statement) -> Result<u64, StoreError> {
        crate::trace_log!(sql = %statement.sql, params = statement.params.len(), "execute");
        let started = Instant::now();
        let result = self.session.execute(&statement.sql, &statement.params).await;
        self.observe(started.elapsed(), statement);
        result.map_err(StoreError::Database)
    }

    fn observe(&self, elapsed: Duration, statement: &Statement) {
        let Some(threshold) = self.settings.slow_query_threshold() else {
            return;
        };
        if elapsed < threshold {
            return;
        }

        tracing::warn!(
            target: "dbhelper::slow_query",
            elapsed_ms = elapsed.as_millis() as u64,
            threshold_ms = threshold.as_millis() as u64,
            sql = %statement.sql,
            params = ?statement.params,
            "Slow query"
        );

        if let Some(callback) = self.settings.slow_query_callback() {
            let report = SlowQuery {
                elapsed,
                sql: &statement.sql,
                params: &statement.params,
            };
            if catch_unwind(AssertUnwindSafe(|| callback(&report))).is_err() {
                tracing::error!(sql = %statement.sql, "Slow-query callback panicked");
            }
        }
    }
}
