//! # Event subscribers for the safetask runner.
//!
//! This module provides the [`Subscribe`] trait, the internal `SubscriberSet` fan-out
//! and the optional built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Bus ──► runner event_listener ──► SubscriberSet::emit(&Event)
//!                                       │
//!                          ┌────────────┼────────────┐
//!                          ▼            ▼            ▼
//!                      LogWriter     Metrics      Custom ...
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub(crate) use set::SubscriberSet;
pub use subscriber::Subscribe;
