use std::sync::Arc;

use tokio::runtime::{self, Handle};

use crate::{
    config::RunnerConfig,
    error::RuntimeError,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};
use super::task_runner::TaskRunner;

/// Builder for constructing a [`TaskRunner`] with optional features.
pub struct RunnerBuilder {
    cfg: RunnerConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    handle: Option<Handle>,
}

impl RunnerBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: RunnerConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            handle: None,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (submissions, timeouts, failures, etc.)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Runs work on an existing runtime instead of building a private pool.
    ///
    /// The pool sizing fields of [`RunnerConfig`] are ignored in that case, and
    /// dropping the runner leaves the lent runtime running.
    pub fn with_handle(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }

    /// Builds the runner.
    ///
    /// Initializes the worker pool (unless one was lent), the event bus and the
    /// subscriber workers.
    pub fn build(self) -> Result<TaskRunner, RuntimeError> {
        let (runtime, handle) = match self.handle {
            Some(handle) => (None, handle),
            None => {
                let mut rb = runtime::Builder::new_multi_thread();
                rb.enable_all().thread_name(self.cfg.thread_name.clone());
                if let Some(n) = self.cfg.worker_threads() {
                    rb.worker_threads(n);
                }
                if let Some(n) = self.cfg.max_blocking_threads() {
                    rb.max_blocking_threads(n);
                }
                let rt = rb.build()?;
                let handle = rt.handle().clone();
                (Some(rt), handle)
            }
        };

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone(), &handle);
        tracing::debug!(
            owned_pool = runtime.is_some(),
            subscribers = subs.len(),
            "task runner built"
        );

        Ok(TaskRunner::new_internal(self.cfg, runtime, handle, bus, subs))
    }
}
