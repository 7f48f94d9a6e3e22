//! Post-commit hooks
//!
//! [`HookQueue`] holds callbacks registered while a transaction is open. A session that
//! owns a transaction runs the queue after its commit succeeds and discards it on rollback.
//! Either way the queue closes, and a closed queue hands new hooks back to the caller.
//! [`TransactionScope`] wraps the queue and is what session implementations expose as
//! their [`TransactionContext`].

use crate::traits::session::{PostCommitHook, TransactionContext};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Whether an after-commit callback was deferred or ran on the spot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterCommitOutcome {
    Deferred,
    RanImmediately,
}

#[derive(Default)]
struct QueueState {
    closed: bool,
    hooks: Vec<PostCommitHook>,
}

/// FIFO queue of post-commit callbacks
#[derive(Default)]
pub struct HookQueue {
    state: Mutex<QueueState>,
}

impl std::fmt::Debug for HookQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("HookQueue")
            .field("closed", &state.closed)
            .field("pending", &state.hooks.len())
            .finish()
    }
}

impl HookQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a hook, or hand it back if the queue was already run or discarded
    pub fn push(&self, hook: PostCommitHook) -> Result<(), PostCommitHook> {
        let mut state = self.lock();
        if state.closed {
            return Err(hook);
        }
        state.hooks.push(hook);
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        !self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close the queue, then run and drain every queued hook in registration order.
    /// A panicking hook is logged and the remaining hooks still run. Returns the number
    /// of hooks run.
    pub fn run_all(&self) -> usize {
        let hooks = self.close();
        let count = hooks.len();
        for (position, hook) in hooks.into_iter().enumerate() {
            if catch_unwind(AssertUnwindSafe(hook)).is_err() {
                tracing::error!(position, "Post-commit hook panicked");
            }
        }
        count
    }

    /// Close the queue and drop every queued hook without running it
    pub fn discard(&self) -> usize {
        let hooks = self.close();
        if !hooks.is_empty() {
            crate::debug_log!(count = hooks.len(), "Discarding post-commit hooks");
        }
        hooks.len()
    }

    fn close(&self) -> Vec<PostCommitHook> {
        let mut state = self.lock();
        state.closed = true;
        std::mem::take(&mut state.hooks)
    }
}

/// Transaction state shared by session implementations
#[derive(Debug, Default)]
pub struct TransactionScope {
    hooks: HookQueue,
}

impl TransactionScope {
    /// A new, active scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the scope finished and run its hooks; call after the commit succeeded
    pub fn commit_hooks(&self) -> usize {
        self.hooks.run_all()
    }

    /// Mark the scope finished and drop its hooks
    pub fn rollback_hooks(&self) -> usize {
        self.hooks.discard()
    }

    pub fn pending_hooks(&self) -> usize {
        self.hooks.len()
    }
}

impl TransactionContext for TransactionScope {
    fn is_active(&self) -> bool {
        self.hooks.is_open()
    }

    fn register_post_commit(&self, hook: PostCommitHook) -> Result<(), PostCommitHook> {
        self.hooks.push(hook)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter_hook(counter: &Arc<AtomicUsize>) -> PostCommitHook {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_hooks_run_once_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let queue = HookQueue::new();
        for i in 0..3 {
            let order = Arc::clone(&order);
            assert!(queue.push(Box::new(move || order.lock().unwrap().push(i))).is_ok());
        }
        assert_eq!(queue.run_all(), 3);
        assert_eq!(queue.run_all(), 0);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_panicking_hook_does_not_stop_the_rest() {
        let counter = Arc::new(AtomicUsize::new(0));
        let queue = HookQueue::new();
        assert!(queue.push(counter_hook(&counter)).is_ok());
        assert!(queue.push(Box::new(|| panic!("hook failure"))).is_ok());
        assert!(queue.push(counter_hook(&counter)).is_ok());
        assert_eq!(queue.run_all(), 3);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_rollback_discards() {
        let counter = Arc::new(AtomicUsize::new(0));
        let scope = TransactionScope::new();
        assert!(scope.register_post_commit(counter_hook(&counter)).is_ok());
        assert!(scope.is_active());
        assert_eq!(scope.rollback_hooks(), 1);
        assert!(!scope.is_active());
        assert_eq!(scope.commit_hooks(), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_commit_runs_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let scope = TransactionScope::new();
        assert!(scope.register_post_commit(counter_hook(&counter)).is_ok());
        assert!(scope.register_post_commit(counter_hook(&counter)).is_ok());
        assert_eq!(scope.pending_hooks(), 2);
        assert_eq!(scope.commit_hooks(), 2);
        assert_eq!(scope.commit_hooks(), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_register_after_commit_hands_hook_back() {
        let counter = Arc::new(AtomicUsize::new(0));
        let scope = TransactionScope::new();
        assert!(scope.is_active());
        assert_eq!(scope.commit_hooks(), 0);

        let rejected = scope.register_post_commit(counter_hook(&counter));
        assert!(!scope.is_active());
        assert_eq!(scope.pending_hooks(), 0);
        assert_eq!(scope.commit_hooks(), 0);

        let hook = rejected.err().expect("closed scope returns the hook");
        hook();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_register_after_rollback_hands_hook_back() {
        let counter = Arc::new(AtomicUsize::new(0));
        let scope = TransactionScope::new();
        assert_eq!(scope.rollback_hooks(), 0);
        assert!(scope.register_post_commit(counter_hook(&counter)).is_err());
        assert_eq!(scope.pending_hooks(), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
