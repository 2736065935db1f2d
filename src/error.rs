//! Error types used by the safetask runner and by task work.
//!
//! This module defines two enums:
//!
//! - [`RuntimeError`]: errors raised by the runner itself (building the pool,
//!   submitting after shutdown, bounded shutdown running out of time).
//! - [`TaskError`]: the failure description a unit of work reports. It never
//!   reaches the caller of [`SafeResult::get`](crate::SafeResult::get); the
//!   runner hands it to the task's failure fallback instead.
//!
//! Both types provide `as_label`/`as_message` helpers for logging.

use std::borrow::Cow;
use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the safetask runner.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The owned worker pool could not be started.
    #[error("failed to build worker pool: {0}")]
    Build(#[from] std::io::Error),

    /// The runner no longer accepts submissions.
    #[error("runner is shut down; submission rejected")]
    Closed,

    /// Shutdown grace period was exceeded while work was still executing.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Work that was still executing, as `name#id`.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use safetask::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Build(_) => "runtime_build_failed",
            RuntimeError::Closed => "runtime_closed",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::Build(e) => format!("build failed: {e}"),
            RuntimeError::Closed => "runner closed".to_string(),
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck tasks={stuck:?}")
            }
        }
    }
}

/// # Failure description of a unit of work.
///
/// Work returns `Err(TaskError)` to report a failure. The runner routes
/// [`TaskError::Canceled`] to the task's cancel fallback and everything else to
/// its failure fallback.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Work failed. `kind` is a short classifier such as `"DivideByZero"`.
    #[error("{kind}: {error}")]
    Fail {
        /// Failure classifier.
        kind: Cow<'static, str>,
        /// The underlying error message.
        error: String,
    },

    /// Work panicked while executing.
    #[error("panicked: {error}")]
    Panic {
        /// The panic payload, if it was a string.
        error: String,
    },

    /// Work observed its cancellation token and stopped early.
    #[error("context cancelled")]
    Canceled,
}

impl TaskError {
    /// Builds a [`TaskError::Fail`].
    ///
    /// # Example
    /// ```
    /// use safetask::TaskError;
    ///
    /// let err = TaskError::fail("DivideByZero", "attempt to divide by zero");
    /// assert_eq!(err.kind(), "DivideByZero");
    /// assert_eq!(err.to_string(), "DivideByZero: attempt to divide by zero");
    /// ```
    pub fn fail(kind: impl Into<Cow<'static, str>>, error: impl Into<String>) -> Self {
        TaskError::Fail {
            kind: kind.into(),
            error: error.into(),
        }
    }

    /// Returns the failure classifier.
    pub fn kind(&self) -> &str {
        match self {
            TaskError::Fail { kind, .. } => kind,
            TaskError::Panic { .. } => "Panic",
            TaskError::Canceled => "Canceled",
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Panic { .. } => "task_panicked",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Fail { kind, error } => format!("{kind}: {error}"),
            TaskError::Panic { error } => format!("panic: {error}"),
            TaskError::Canceled => "context cancelled".to_string(),
        }
    }

    /// Converts a panic payload into [`TaskError::Panic`].
    pub(crate) fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        TaskError::Panic {
            error: panic_message(payload),
        }
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fail_kind_and_message() {
        let err = TaskError::fail("Io", "broken pipe");
        assert_eq!(err.kind(), "Io");
        assert_eq!(err.as_label(), "task_failed");
        assert_eq!(err.as_message(), "Io: broken pipe");
    }

    #[test]
    fn panic_payloads_are_readable() {
        let s: Box<dyn std::any::Any + Send> = Box::new("static boom");
        assert_eq!(
            TaskError::from_panic(s.as_ref()),
            TaskError::Panic {
                error: "static boom".into()
            }
        );

        let owned: Box<dyn std::any::Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(panic_message(owned.as_ref()), "owned boom");

        let other: Box<dyn std::any::Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }

    #[test]
    fn runtime_labels() {
        assert_eq!(RuntimeError::Closed.as_label(), "runtime_closed");
        let io = std::io::Error::other("no threads");
        assert_eq!(RuntimeError::from(io).as_label(), "runtime_build_failed");
    }
}
