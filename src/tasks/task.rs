//! # Task: a unit of work with failure and cancellation fallbacks.
//!
//! A [`Task`] bundles:
//! - the **work**, a closure receiving a [`CancellationToken`] and producing
//!   `Result<T, TaskError>`, either as a future ([`Task::new`]) or on a
//!   blocking thread ([`Task::blocking`]);
//! - **on_failure**, turning a [`TaskError`] into a `T`;
//! - **on_cancel**, producing a `T` when the work is cancelled.
//!
//! Construction never invokes any of the three. Fallbacks must not panic; the
//! runner treats a panicking fallback as a broken contract.
//!
//! Work should watch its token and return `Err(TaskError::Canceled)` (or any
//! value) promptly once it is cancelled.

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::outcome::Fallbacks;

/// Boxed future returned by async work.
pub type BoxWorkFuture<T> = Pin<Box<dyn Future<Output = Result<T, TaskError>> + Send + 'static>>;

type AsyncWork<T> = Box<dyn FnOnce(CancellationToken) -> BoxWorkFuture<T> + Send>;
type BlockingWork<T> = Box<dyn FnOnce(CancellationToken) -> Result<T, TaskError> + Send>;

/// Where and how the work executes.
pub(crate) enum Work<T> {
    /// Polled on the async worker pool; aborted at its next await once cancelled.
    Async(AsyncWork<T>),
    /// Run on the blocking pool; can only stop cooperatively.
    Blocking(BlockingWork<T>),
}

impl<T> Work<T> {
    pub(crate) fn from_async<F, Fut>(work: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
    {
        Work::Async(Box::new(move |ctx| Box::pin(work(ctx))))
    }

    pub(crate) fn from_blocking<F>(work: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Result<T, TaskError> + Send + 'static,
    {
        Work::Blocking(Box::new(work))
    }

    fn label(&self) -> &'static str {
        match self {
            Work::Async(_) => "async",
            Work::Blocking(_) => "blocking",
        }
    }
}

/// # Unit of work prepared for failure and cancellation.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
/// use safetask::{Task, TaskError};
///
/// let task = Task::new(
///     |_ctx: CancellationToken| async {
///         tokio::time::sleep(Duration::from_millis(50)).await;
///         Ok::<_, TaskError>("X".to_string())
///     },
///     |e: TaskError| format!("ERR: {e}"),
///     || "TIMEOUT".to_string(),
/// )
/// .with_name("sleepy");
///
/// assert_eq!(task.name(), "sleepy");
/// ```
pub struct Task<T> {
    name: Cow<'static, str>,
    work: Work<T>,
    fallbacks: Fallbacks<T>,
}

impl<T: Send + 'static> Task<T> {
    /// Creates a task whose work is a future.
    pub fn new<F, Fut, E, C>(work: F, on_failure: E, on_cancel: C) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
        E: Fn(TaskError) -> T + Send + Sync + 'static,
        C: Fn() -> T + Send + Sync + 'static,
    {
        Self::from_parts(
            Work::from_async(work),
            Fallbacks::new(on_failure, on_cancel),
        )
    }

    /// Creates a task whose work blocks a thread (subprocess I/O, CPU work).
    ///
    /// Blocking work cannot be interrupted; it must poll its token to stop
    /// early. Uncooperative work keeps its thread until it returns.
    pub fn blocking<F, E, C>(work: F, on_failure: E, on_cancel: C) -> Self
    where
        F: FnOnce(CancellationToken) -> Result<T, TaskError> + Send + 'static,
        E: Fn(TaskError) -> T + Send + Sync + 'static,
        C: Fn() -> T + Send + Sync + 'static,
    {
        Self::from_parts(
            Work::from_blocking(work),
            Fallbacks::new(on_failure, on_cancel),
        )
    }
}

impl<T> Task<T> {
    pub(crate) fn from_parts(work: Work<T>, fallbacks: Fallbacks<T>) -> Self {
        Self {
            name: Cow::Borrowed("task"),
            work,
            fallbacks,
        }
    }

    /// Returns the task with a display name used in events and diagnostics.
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_parts(self) -> (Cow<'static, str>, Work<T>, Fallbacks<T>) {
        (self.name, self.work, self.fallbacks)
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("work", &self.work.label())
            .finish_non_exhaustive()
    }
}
