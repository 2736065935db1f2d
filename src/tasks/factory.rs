//! # Task factory
//!
//! [`TaskFactory`] stores one failure/cancel producer pair and stamps out
//! tasks that share it, so call sites only supply the work.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use safetask::{TaskError, TaskFactory};
//!
//! let factory = TaskFactory::new(
//!     |e: TaskError| format!("{}: {}", e.kind(), e),
//!     || "Timeout while running code".to_string(),
//! )
//! .with_name("interpreter");
//!
//! let a = factory.new_task(|_ctx: CancellationToken| async { Ok("1".to_string()) });
//! let b = factory.new_blocking_task(|_ctx| Ok("2".to_string()));
//! assert_eq!(a.name(), "interpreter");
//! assert_eq!(b.name(), "interpreter");
//! ```

use std::borrow::Cow;
use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::outcome::Fallbacks;
use crate::tasks::task::{Task, Work};

/// Creates [`Task`]s sharing one fallback policy.
///
/// Read-only after construction; clone it freely across threads.
#[derive(Debug)]
pub struct TaskFactory<T> {
    name: Cow<'static, str>,
    fallbacks: Fallbacks<T>,
}

impl<T: Send + 'static> TaskFactory<T> {
    /// Creates a factory from the failure and cancel producers.
    pub fn new<E, C>(on_failure: E, on_cancel: C) -> Self
    where
        E: Fn(TaskError) -> T + Send + Sync + 'static,
        C: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            name: Cow::Borrowed("task"),
            fallbacks: Fallbacks::new(on_failure, on_cancel),
        }
    }

    /// Sets the name given to every task this factory creates.
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Creates a task with async work.
    pub fn new_task<F, Fut>(&self, work: F) -> Task<T>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
    {
        Task::from_parts(Work::from_async(work), self.fallbacks.clone()).with_name(self.name.clone())
    }

    /// Creates a task with blocking work.
    pub fn new_blocking_task<F>(&self, work: F) -> Task<T>
    where
        F: FnOnce(CancellationToken) -> Result<T, TaskError> + Send + 'static,
    {
        Task::from_parts(Work::from_blocking(work), self.fallbacks.clone())
            .with_name(self.name.clone())
    }
}

impl<T> Clone for TaskFactory<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            fallbacks: self.fallbacks.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::outcome::Outcome;

    #[test]
    fn tasks_share_the_factory_policy() {
        let factory = TaskFactory::new(|e: TaskError| format!("E:{}", e.kind()), || "C".to_string());
        let clone = factory.clone();

        let (_, _, fb1) = factory.new_task(|_ctx| async { Ok(String::new()) }).into_parts();
        let (_, _, fb2) = clone.new_blocking_task(|_ctx| Ok(String::new())).into_parts();

        assert_eq!(fb1.resolve(Outcome::Cancelled), "C");
        assert_eq!(
            fb2.resolve(Outcome::Failed(TaskError::fail("Io", "eof"))),
            "E:Io"
        );
    }
}
