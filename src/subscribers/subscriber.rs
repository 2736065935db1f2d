//! Hook for observing what the runner does with submissions.
//!
//! Implement [`Subscribe`] and pass it to
//! [`RunnerBuilder::with_subscribers`](crate::RunnerBuilder::with_subscribers).
//! Each subscriber is fed from its own bounded queue by its own worker, so a
//! slow or panicking subscriber never delays a submission or another
//! subscriber. When its queue is full the event is dropped for it alone and a
//! `SubscriberOverflow` event is published instead.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use async_trait::async_trait;
//! use safetask::{Event, EventKind, Subscribe};
//!
//! #[derive(Default)]
//! struct TimeoutCounter(AtomicU64);
//!
//! #[async_trait]
//! impl Subscribe for TimeoutCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::TimeoutHit {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "timeout-counter" }
//!     fn queue_capacity(&self) -> usize { 64 }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Receives runner events, one at a time and in publish order.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event. Runs on the subscriber's worker, never on a
    /// submission's path; should not block the thread.
    async fn on_event(&self, event: &Event);

    /// Label used when reporting this subscriber's overflows and panics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Events buffered for this subscriber before new ones are dropped (min 1).
    fn queue_capacity(&self) -> usize {
        1024
    }
}
