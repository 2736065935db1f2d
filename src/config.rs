//! # Runner configuration.
//!
//! Provides [`RunnerConfig`] centralized settings for the [`TaskRunner`](crate::TaskRunner).
//!
//! ## Sentinel values
//! - `worker_threads = 0` → tokio default (one per core)
//! - `max_blocking_threads = 0` → tokio default
//! - `grace = 0s` → shutdown waits for in-flight work without a limit
//!
//! Pool settings only apply when the runner owns its runtime; a runner built
//! with [`RunnerBuilder::with_handle`](crate::RunnerBuilder::with_handle) uses
//! the pool of the lent runtime.

use std::time::Duration;

/// Configuration for the task runner.
///
/// ## Field semantics
/// - `worker_threads`: async worker pool size (`0` = tokio default)
/// - `max_blocking_threads`: blocking pool cap (`0` = tokio default)
/// - `thread_name`: prefix for pool thread names
/// - `grace`: upper bound on shutdown drain (`0s` = unbounded)
/// - `bus_capacity`: event bus ring buffer size (min 1)
#[derive(Clone, Debug)]
pub struct RunnerConfig {
    /// Number of async worker threads.
    pub worker_threads: usize,

    /// Maximum number of threads for blocking work.
    pub max_blocking_threads: usize,

    /// Name given to pool threads.
    pub thread_name: String,

    /// Maximum time shutdown waits for in-flight work.
    ///
    /// When exceeded, shutdown returns `RuntimeError::GraceExceeded` with the
    /// work still executing; that work is not forcibly stopped.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers that lag behind more than `bus_capacity` events skip older ones.
    pub bus_capacity: usize,
}

impl RunnerConfig {
    /// Returns the worker pool size as an `Option` (`None` = tokio default).
    #[inline]
    pub fn worker_threads(&self) -> Option<usize> {
        (self.worker_threads > 0).then_some(self.worker_threads)
    }

    /// Returns the blocking pool cap as an `Option` (`None` = tokio default).
    #[inline]
    pub fn max_blocking_threads(&self) -> Option<usize> {
        (self.max_blocking_threads > 0).then_some(self.max_blocking_threads)
    }

    /// Returns the shutdown bound as an `Option` (`None` = wait until drained).
    #[inline]
    pub fn grace_limit(&self) -> Option<Duration> {
        (self.grace > Duration::ZERO).then_some(self.grace)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for RunnerConfig {
    /// Default configuration:
    ///
    /// - `worker_threads = 0` (tokio default)
    /// - `max_blocking_threads = 0` (tokio default)
    /// - `thread_name = "safetask-worker"`
    /// - `grace = 0s` (wait for everything)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            worker_threads: 0,
            max_blocking_threads: 0,
            thread_name: "safetask-worker".to_string(),
            grace: Duration::ZERO,
            bus_capacity: 1024,
        }
    }
}
