//! Runtime settings of a helper
//!
//! Settings are shared between clones of a helper and may be changed at any time from
//! any thread; readers always observe a consistent value.

use config::{AfterCommitPolicy, HelperConfig};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use type_mapping::SqlValue;

/// Details handed to the slow-query callback
#[derive(Debug, Clone, Copy)]
pub struct SlowQuery<'a> {
    pub elapsed: Duration,
    pub sql: &'a str,
    pub params: &'a [SqlValue],
}

pub type SlowQueryCallback = Arc<dyn Fn(&SlowQuery<'_>) + Send + Sync>;

pub struct HelperSettings {
    max_page_size: AtomicI64,
    slow_query_threshold: RwLock<Option<Duration>>,
    slow_query_callback: RwLock<Option<SlowQueryCallback>>,
    after_commit_policy: RwLock<AfterCommitPolicy>,
}

impl std::fmt::Debug for HelperSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HelperSettings")
            .field("max_page_size", &self.max_page_size())
            .field("slow_query_threshold", &self.slow_query_threshold())
            .field("has_slow_query_callback", &self.slow_query_callback().is_some())
            .field("after_commit_policy", &self.after_commit_policy())
            .finish()
    }
}

impl Default for HelperSettings {
    fn default() -> Self {
        Self::from_config(&HelperConfig::default())
    }
}

impl HelperSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &HelperConfig) -> Self {
        Self {
            max_page_size: AtomicI64::new(config.max_page_size.max(1)),
            slow_query_threshold: RwLock::new(
                config.slow_query_threshold_ms.map(Duration::from_millis),
            ),
            slow_query_callback: RwLock::new(None),
            after_commit_policy: RwLock::new(config.after_commit_policy),
        }
    }

    pub fn max_page_size(&self) -> i64 {
        self.max_page_size.load(Ordering::Relaxed)
    }

    /// Values below 1 are raised to 1
    pub fn set_max_page_size(&self, max: i64) {
        if max < 1 {
            tracing::warn!(requested = max, "Max page size must be at least 1, using 1");
        }
        self.max_page_size.store(max.max(1), Ordering::Relaxed);
    }

    pub fn slow_query_threshold(&self) -> Option<Duration> {
        *self
            .slow_query_threshold
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_slow_query_threshold(&self, threshold: Option<Duration>) {
        *self
            .slow_query_threshold
            .write()
            .unwrap_or_else(PoisonError::into_inner) = threshold;
    }

    pub fn slow_query_callback(&self) -> Option<SlowQueryCallback> {
        self.slow_query_callback
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_slow_query_callback(&self, callback: Option<SlowQueryCallback>) {
        *self
            .slow_query_callback
            .write()
            .unwrap_or_else(PoisonError::into_inner) = callback;
    }

    pub fn after_commit_policy(&self) -> AfterCommitPolicy {
        *self
            .after_commit_policy
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_after_commit_policy(&self, policy: AfterCommitPolicy) {
        *self
            .after_commit_policy
            .write()
            .unwrap_or_else(PoisonError::into_inner) = policy;
    }
}
