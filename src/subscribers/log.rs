//! # LogWriter: event logger
//!
//! A minimal subscriber that forwards incoming [`Event`]s to `tracing`.
//! Install any `tracing` subscriber (e.g. `tracing_subscriber::fmt`) to see them.
//!
//! ## Example output
//! ```text
//! INFO  submitted task=python#4 timeout_ms=Some(2000)
//! WARN  timeout task=python#4 timeout_ms=Some(2000)
//! INFO  cancelled task=python#4 reason=Some("deadline")
//! INFO  shutdown requested
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.label();
        let reason = e.reason.as_deref();
        match e.kind {
            EventKind::TaskSubmitted => {
                tracing::info!(%task, timeout_ms = ?e.timeout_ms, "submitted");
            }
            EventKind::TaskRejected => {
                tracing::warn!(%task, "rejected after shutdown");
            }
            EventKind::TaskStarting => tracing::debug!(%task, "starting"),
            EventKind::WorkExited => tracing::debug!(%task, "work exited"),
            EventKind::TaskCompleted => tracing::info!(%task, "completed"),
            EventKind::TaskFailed => tracing::warn!(%task, ?reason, "failed"),
            EventKind::TimeoutHit => {
                tracing::warn!(%task, timeout_ms = ?e.timeout_ms, "timeout");
            }
            EventKind::TaskCancelled => tracing::info!(%task, ?reason, "cancelled"),
            EventKind::ContractViolated => {
                tracing::error!(%task, ?reason, "fallback panicked");
            }
            EventKind::ShutdownRequested => tracing::info!("shutdown requested"),
            EventKind::AllStoppedWithin => tracing::info!("all work drained"),
            EventKind::GraceExceeded => tracing::warn!("grace exceeded"),
            EventKind::SubscriberOverflow => {
                tracing::warn!(subscriber = %task, ?reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                tracing::warn!(subscriber = %task, ?reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
