//! # safetask
//!
//! **safetask** runs background work under a deadline and hands back a result
//! that never fails.
//!
//! Every [`Task`] carries its work together with two fallbacks: one turns a
//! failure into a value, the other produces a value when the work is cancelled
//! (deadline elapsed, explicit cancel, shutdown). The caller receives a
//! [`SafeResult`] immediately; reading it always yields a value.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   Task<T>    │   │   Task<U>    │   │   Task<V>    │
//!     │ work + 2 fb  │   │ work + 2 fb  │   │ work + 2 fb  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼ run()            ▼ timeout(d)       ▼ try_run()
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  TaskRunner                                                       │
//! │  - worker pool (owned multi-thread runtime or lent Handle)        │
//! │  - TaskTracker (in-flight submissions, closed on shutdown)        │
//! │  - Bus (broadcast events)                                         │
//! │  - AliveTracker (work still executing, fed by the work guards)    │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │
//!     │  supervise   │   │  supervise   │   │  supervise   │   │
//!     │ (watchdog)   │   │ (watchdog)   │   │ (watchdog)   │   │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘   │
//!      │ resolves         │ resolves         │ resolves        │
//!      ▼                  ▼                  ▼                 │
//!   SafeResult<T>      SafeResult<U>      SafeResult<V>        │
//!                                                              ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │               (capacity: RunnerConfig::bus_capacity)              │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │    event_listener      │
//!                       │    (in TaskRunner)     │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                         ┌─────────┼─────────┐
//!                         ▼         ▼         ▼
//!                      sub1      sub2      subN
//! ```
//!
//! ### Lifecycle of one submission
//! ```text
//! run / timeout ──► TaskSubmitted ──► supervise()
//!   ├─► work starts on the pool         (TaskStarting)
//!   ├─► first of:
//!   │     ├─ Ok(v)                      ─► TaskCompleted  ─► v
//!   │     ├─ Err(e) / panic             ─► TaskFailed     ─► on_failure(e)
//!   │     ├─ deadline elapsed           ─► TimeoutHit, TaskCancelled ─► on_cancel()
//!   │     └─ SafeResult::cancel()       ─► TaskCancelled  ─► on_cancel()
//!   └─► work exits                      (WorkExited)
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                  |
//! |-------------------|--------------------------------------------------------------|-------------------------------------|
//! | **Tasks**         | Work plus failure and cancel fallbacks.                      | [`Task`], [`TaskFactory`]           |
//! | **Execution**     | Deadline-bounded submission and graceful shutdown.           | [`TaskRunner`], [`RunnerBuilder`]   |
//! | **Results**       | Single-assignment values that never fail.                    | [`SafeResult`]                      |
//! | **Subscriber API**| Hook into runner events (logging, metrics, custom).          | [`Subscribe`], [`Event`]            |
//! | **Errors**        | Typed errors for work and for the runner itself.             | [`TaskError`], [`RuntimeError`]     |
//! | **Configuration** | Pool sizing, shutdown grace, bus capacity.                   | [`RunnerConfig`]                    |
//!
//! ## Optional features
//! - `logging`: exports a built-in `LogWriter` subscriber backed by `tracing`.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use safetask::{RunnerConfig, TaskError, TaskFactory, TaskRunner};
//!
//! let runner = TaskRunner::new(RunnerConfig::default())?;
//! let factory = TaskFactory::new(
//!     |e: TaskError| format!("FAIL:{}", e.kind()),
//!     || "TIMEOUT".to_string(),
//! );
//!
//! let slow = runner.timeout(
//!     factory.new_task(|ctx| async move {
//!         tokio::select! {
//!             _ = ctx.cancelled() => Err(TaskError::Canceled),
//!             _ = tokio::time::sleep(Duration::from_secs(5)) => Ok("X".to_string()),
//!         }
//!     }),
//!     Duration::from_millis(10),
//! );
//! let fast = runner.run(factory.new_task(|_ctx| async { Ok("X".to_string()) }));
//!
//! assert_eq!(slow.get(), "TIMEOUT");
//! assert_eq!(fast.get(), "X");
//!
//! runner.quit_all()?;
//! # Ok::<(), safetask::RuntimeError>(())
//! ```
mod config;
mod core;
mod error;
mod events;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use config::RunnerConfig;
pub use core::{RunnerBuilder, SafeResult, TaskRunner};
pub use error::{RuntimeError, TaskError};
pub use events::{Event, EventKind};
pub use subscribers::Subscribe;
pub use tasks::{BoxWorkFuture, Task, TaskFactory};
pub use tokio_util::sync::CancellationToken;

// Optional: expose a simple built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
