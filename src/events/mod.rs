//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the runner, its supervising units
//! and the inner work wrappers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `TaskRunner` (submit/shutdown), `core::supervise`,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumer**: the runner's event listener, which fans out to `SubscriberSet`.

mod bus;
mod event;

pub(crate) use bus::Bus;
pub use event::{Event, EventKind};
