//! # Task abstractions.
//!
//! This module provides the task-related types:
//! - [`Task`] - unit of work with failure and cancellation fallbacks
//! - [`TaskFactory`] - stamps out tasks sharing one fallback pair
//! - `Outcome` / `Fallbacks` (internal) - normalization of how work ended

mod factory;
mod outcome;
mod task;

pub use factory::TaskFactory;
pub(crate) use outcome::{Fallbacks, Outcome};
pub use task::{BoxWorkFuture, Task};
pub(crate) use task::Work;
