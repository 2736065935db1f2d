//! Runtime core: submission, supervision and shutdown.
//!
//! The public API from this module is [`TaskRunner`] (with its [`RunnerBuilder`])
//! and the [`SafeResult`] it hands back for every submission.
//!
//! Internal modules:
//! - [`supervise`]: drives one submission (watchdog, classification, fallbacks);
//! - [`task_runner`]: submission entry points, event listener, graceful shutdown;
//! - [`safe_result`]: single-assignment result slot;
//! - [`alive`]: tracks work still executing, for shutdown diagnostics.

mod alive;
mod builder;
mod safe_result;
mod supervise;
mod task_runner;

pub use builder::RunnerBuilder;
pub use safe_result::SafeResult;
pub use task_runner::TaskRunner;
