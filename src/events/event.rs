//! # Runtime events emitted by the task runner.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Submission events**: a task entering the runner and its resolution
//! - **Work events**: the inner unit of work starting and exiting
//! - **Shutdown events**: drain progress of `quit_all`/`shutdown`
//!
//! The [`Event`] struct carries metadata such as timestamps, submission id,
//! task name, reasons and deadlines.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use safetask::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TimeoutHit)
//!     .with_id(7)
//!     .with_task("compile")
//!     .with_timeout(Duration::from_millis(250));
//!
//! assert_eq!(ev.kind, EventKind::TimeoutHit);
//! assert_eq!(ev.task.as_deref(), Some("compile"));
//! assert_eq!(ev.timeout_ms, Some(250));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets `task` (subscriber name) and `reason` (panic message).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets `task` (subscriber name) and `reason` (`"full"` or `"closed"`).
    SubscriberOverflow,

    // === Shutdown events ===
    /// Shutdown requested; the runner stopped accepting submissions.
    ShutdownRequested,

    /// All in-flight work drained within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some work was still executing.
    GraceExceeded,

    // === Submission events ===
    /// Task accepted by the runner.
    ///
    /// Sets `id`, `task` and `timeout_ms` (absent for unbounded deadlines).
    TaskSubmitted,

    /// Task submitted after shutdown; resolved through its cancel fallback.
    ///
    /// Sets `id` and `task`.
    TaskRejected,

    /// Work resolved with its own value.
    TaskCompleted,

    /// Work failed; resolved through the failure fallback.
    ///
    /// Sets `reason` (failure message).
    TaskFailed,

    /// The watchdog fired before the work completed.
    ///
    /// Sets `timeout_ms`. Always followed by `TaskCancelled`.
    TimeoutHit,

    /// Work was cancelled; resolved through the cancel fallback.
    ///
    /// Sets `reason`: `"deadline"`, `"external"`, `"cooperative"`, or `"dropped"`
    /// when the runner was dropped before the submission resolved.
    TaskCancelled,

    /// A fallback panicked. The submission never resolves and every
    /// `SafeResult::get` on it panics.
    ///
    /// Sets `reason` (panic message).
    ContractViolated,

    // === Work events ===
    /// The inner unit of work started executing on a worker.
    TaskStarting,

    /// The inner unit of work is no longer executing (returned, panicked or
    /// was aborted). For uncooperative blocking work this can arrive long after
    /// the submission was resolved.
    WorkExited,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Submission id, if applicable.
    pub id: Option<u64>,
    /// Name of the task (or subscriber), if applicable.
    pub task: Option<Arc<str>>,
    /// Deadline in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            id: None,
            task: None,
            timeout_ms: None,
            reason: None,
        }
    }

    /// Attaches a submission id.
    #[inline]
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    /// Attaches a task name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a deadline (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    /// Returns `name#id` for submission events, or just the name.
    pub fn label(&self) -> String {
        let name = self.task.as_deref().unwrap_or("?");
        match self.id {
            Some(id) => format!("{name}#{id}"),
            None => name.to_string(),
        }
    }
}
