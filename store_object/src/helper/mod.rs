//! The operation surface
//!
//! [`DbHelper`] ties a [`DatabaseSession`] to the metadata registry and the runtime
//! settings. Clones share both, as do helpers derived with [`DbHelper::with_session`].

mod crud;
mod join;
mod paging;

use crate::errors::StoreError;
use crate::executor::Executor;
use crate::hooks::AfterCommitOutcome;
use crate::metadata::EntityMetadata;
use crate::registry::EntityRegistry;
use crate::settings::{HelperSettings, SlowQuery};
use crate::traits::{DatabaseSession, PostCommitHook, TableMetadata};
use config::{AfterCommitPolicy, HelperConfig};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

pub struct DbHelper<S: DatabaseSession> {
    session: Arc<S>,
    settings: Arc<HelperSettings>,
    registry: Arc<EntityRegistry>,
}

impl<S: DatabaseSession> Clone for DbHelper<S> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            settings: Arc::clone(&self.settings),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<S: DatabaseSession> std::fmt::Debug for DbHelper<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbHelper")
            .field("settings", &self.settings)
            .field("registry", &self.registry)
            .finish()
    }
}

impl<S: DatabaseSession> DbHelper<S> {
    pub fn new(session: S) -> Self {
        Self::with_settings(session, Arc::new(HelperSettings::new()))
    }

    pub fn from_config(session: S, config: &HelperConfig) -> Self {
        Self::with_settings(session, Arc::new(HelperSettings::from_config(config)))
    }

    pub fn with_settings(session: S, settings: Arc<HelperSettings>) -> Self {
        Self {
            session: Arc::new(session),
            settings,
            registry: Arc::new(EntityRegistry::new()),
        }
    }

    /// A helper over another session (typically a transaction) sharing this helper's
    /// settings and metadata cache
    pub fn with_session<O: DatabaseSession>(&self, session: O) -> DbHelper<O> {
        DbHelper {
            session: Arc::new(session),
            settings: Arc::clone(&self.settings),
            registry: Arc::clone(&self.registry),
        }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn settings(&self) -> &HelperSettings {
        &self.settings
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Validated metadata of `T`, resolved once per registry
    pub fn metadata<T: TableMetadata>(&self) -> Result<Arc<EntityMetadata>, StoreError> {
        Ok(self.registry.resolve::<T>()?)
    }

    pub(crate) fn executor(&self) -> Executor<'_, S> {
        Executor::new(self.session.as_ref(), &self.settings)
    }

    /// Upper bound applied to every requested page size; values below 1 become 1
    pub fn set_max_page_size(&self, max: i64) {
        self.settings.set_max_page_size(max);
    }

    pub fn max_page_size(&self) -> i64 {
        self.settings.max_page_size()
    }

    /// Report executions taking at least `millis` milliseconds
    pub fn set_timeout_warning_valve(&self, millis: u64) {
        self.settings
            .set_slow_query_threshold(Some(Duration::from_millis(millis)));
    }

    pub fn disable_timeout_warning(&self) {
        self.settings.set_slow_query_threshold(None);
    }

    /// Callback invoked once per slow execution, with the SQL and parameters as sent
    pub fn set_timeout_warning_callback<F>(&self, callback: F)
    where
        F: Fn(&SlowQuery<'_>) + Send + Sync + 'static,
    {
        self.settings.set_slow_query_callback(Some(Arc::new(callback)));
    }

    pub fn clear_timeout_warning_callback(&self) {
        self.settings.set_slow_query_callback(None);
    }

    pub fn set_after_commit_policy(&self, policy: AfterCommitPolicy) {
        self.settings.set_after_commit_policy(policy);
    }

    /// Defer `callback` until the session's transaction commits.
    ///
    /// Outside an active transaction the callback either runs right away or the call
    /// fails with [`StoreError::NoActiveTransaction`], depending on the after-commit policy.
    pub fn execute_after_commit<F>(&self, callback: F) -> Result<AfterCommitOutcome, StoreError>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut callback: PostCommitHook = Box::new(callback);
        if let Some(transaction) = self.session.transaction() {
            match transaction.register_post_commit(callback) {
                Ok(()) => {
                    crate::debug_log!("Deferred post-commit callback");
                    return Ok(AfterCommitOutcome::Deferred);
                }
                Err(rejected) => callback = rejected,
            }
        }

        match self.settings.after_commit_policy() {
            AfterCommitPolicy::RunImmediately => {
                if catch_unwind(AssertUnwindSafe(callback)).is_err() {
                    tracing::error!("After-commit callback panicked");
                }
                Ok(AfterCommitOutcome::RanImmediately)
            }
            AfterCommitPolicy::Fail => Err(StoreError::NoActiveTransaction),
        }
    }
}
