//! # SafeResult: a value that cannot fail.
//!
//! [`SafeResult`] is the caller-side handle of a submission. It is backed by a
//! `tokio::sync::watch` slot that the supervising unit fills exactly once.
//!
//! ```text
//! supervise ──► Resolver::resolve(v) ──► watch slot: None → Some(v)
//!                                              │
//!                     SafeResult::get() / wait() ◄┘  (any number of clones)
//! ```
//!
//! ## Rules
//! - The slot is written once; every accessor on every clone sees the same value.
//! - The supervising unit owns the write side through a guard that resolves via
//!   the cancel fallback if it is dropped early, so the slot is only left empty
//!   when a fallback itself panicked. Accessors then panic: a broken contract,
//!   not a result.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Write side of a [`SafeResult`], owned by the supervising unit.
pub(crate) struct Resolver<T> {
    tx: watch::Sender<Option<T>>,
}

impl<T> Resolver<T> {
    /// Stores the value. Succeeds even if every `SafeResult` was dropped.
    pub(crate) fn resolve(self, value: T) {
        self.tx.send_replace(Some(value));
    }
}

/// Creates a pending result and its resolver.
pub(crate) fn channel<T>(id: u64, cancel: CancellationToken) -> (Resolver<T>, SafeResult<T>) {
    let (tx, rx) = watch::channel(None);
    (Resolver { tx }, SafeResult { id, rx, cancel })
}

/// Handle to the eventual value of a submitted [`Task`](crate::Task).
///
/// The value is the work's own result, its failure fallback, or its cancel
/// fallback. Accessors never return an error.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use safetask::{RunnerConfig, Task, TaskError, TaskRunner};
///
/// let runner = TaskRunner::new(RunnerConfig::default()).unwrap();
/// let result = runner.timeout(
///     Task::new(
///         |_ctx| async {
///             tokio::time::sleep(Duration::from_millis(50)).await;
///             Ok::<_, TaskError>("X".to_string())
///         },
///         |_e| "ERR".to_string(),
///         || "TIMEOUT".to_string(),
///     ),
///     Duration::from_millis(10),
/// );
/// assert_eq!(result.get(), "TIMEOUT");
/// assert_eq!(result.get(), "TIMEOUT");
/// runner.quit_all().unwrap();
/// ```
#[derive(Debug)]
pub struct SafeResult<T> {
    id: u64,
    rx: watch::Receiver<Option<T>>,
    cancel: CancellationToken,
}

impl<T: Clone> SafeResult<T> {
    /// Creates an already-resolved result.
    pub(crate) fn ready(id: u64, value: T) -> Self {
        let (tx, rx) = watch::channel(Some(value));
        drop(tx);
        Self {
            id,
            rx,
            cancel: CancellationToken::new(),
        }
    }

    /// Blocks the current thread until the value is available, then returns it.
    ///
    /// Do not call this from inside an async task; use [`wait`](Self::wait)
    /// there instead.
    ///
    /// # Panics
    /// If a fallback of the task panicked (the value can never exist).
    pub fn get(&self) -> T {
        futures::executor::block_on(self.wait())
    }

    /// Waits asynchronously for the value.
    ///
    /// # Panics
    /// If a fallback of the task panicked (the value can never exist).
    pub async fn wait(&self) -> T {
        let mut rx = self.rx.clone();
        let resolved = match rx.wait_for(Option::is_some).await {
            Ok(slot) => slot.as_ref().cloned(),
            Err(_closed) => None,
        };
        match resolved {
            Some(v) => v,
            None => contract_violated(self.id),
        }
    }

    /// Returns the value if it is already available.
    pub fn try_get(&self) -> Option<T> {
        self.rx.borrow().as_ref().cloned()
    }
}

impl<T> SafeResult<T> {
    /// True once the value is available.
    pub fn is_resolved(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Requests cancellation of the submission.
    ///
    /// If the value is not resolved yet, it resolves through the task's cancel
    /// fallback. Has no effect on an already resolved result.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Submission id, as carried by runner events.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl<T> Clone for SafeResult<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            rx: self.rx.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

#[cold]
fn contract_violated(id: u64) -> ! {
    panic!("safe result #{id} has no value: a fallback of its task panicked")
}
