//! # Outcome normalization.
//!
//! The supervising unit classifies how the inner work ended into an
//! [`Outcome`], then [`Fallbacks::resolve`] collapses it into a plain `T`:
//!
//! ```text
//! Completed(v)  ──► v
//! Failed(cause) ──► on_failure(cause)
//! Cancelled     ──► on_cancel()
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::TaskError;

/// Producer invoked when work fails.
pub(crate) type OnFailure<T> = Arc<dyn Fn(TaskError) -> T + Send + Sync>;
/// Producer invoked when work is cancelled.
pub(crate) type OnCancel<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// How one execution of a unit of work ended.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Outcome<T> {
    /// Work returned its own value.
    Completed(T),
    /// Work returned an error or panicked.
    Failed(TaskError),
    /// Deadline, external cancellation, or the work returned `Canceled`.
    Cancelled,
}

impl<T> Outcome<T> {
    /// Classifies the value returned by the work itself.
    pub(crate) fn from_result(res: Result<T, TaskError>) -> Self {
        match res {
            Ok(v) => Outcome::Completed(v),
            Err(TaskError::Canceled) => Outcome::Cancelled,
            Err(e) => Outcome::Failed(e),
        }
    }
}

/// The failure/cancel producer pair shared by tasks of one policy.
pub(crate) struct Fallbacks<T> {
    on_failure: OnFailure<T>,
    on_cancel: OnCancel<T>,
}

impl<T> Fallbacks<T> {
    pub(crate) fn new<E, C>(on_failure: E, on_cancel: C) -> Self
    where
        E: Fn(TaskError) -> T + Send + Sync + 'static,
        C: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            on_failure: Arc::new(on_failure),
            on_cancel: Arc::new(on_cancel),
        }
    }

    /// Collapses an outcome into a value. Panics only if a producer panics.
    pub(crate) fn resolve(&self, outcome: Outcome<T>) -> T {
        match outcome {
            Outcome::Completed(v) => v,
            Outcome::Failed(cause) => (self.on_failure)(cause),
            Outcome::Cancelled => (self.on_cancel)(),
        }
    }
}

impl<T> Clone for Fallbacks<T> {
    fn clone(&self) -> Self {
        Self {
            on_failure: Arc::clone(&self.on_failure),
            on_cancel: Arc::clone(&self.on_cancel),
        }
    }
}

impl<T> fmt::Debug for Fallbacks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fallbacks").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fallbacks() -> Fallbacks<String> {
        Fallbacks::new(|e: TaskError| format!("FAIL:{}", e.kind()), || "N/A".to_string())
    }

    #[test]
    fn canceled_error_is_a_cancellation() {
        let out: Outcome<u8> = Outcome::from_result(Err(TaskError::Canceled));
        assert_eq!(out, Outcome::Cancelled);
    }

    #[test]
    fn resolve_picks_the_matching_producer() {
        let fb = fallbacks();
        assert_eq!(fb.resolve(Outcome::Completed("X".into())), "X");
        assert_eq!(
            fb.resolve(Outcome::Failed(TaskError::fail("DivideByZero", "/ by zero"))),
            "FAIL:DivideByZero"
        );
        assert_eq!(fb.resolve(Outcome::Cancelled), "N/A");
    }
}
