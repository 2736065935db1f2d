//! # Non-blocking event fan-out to multiple subscribers.
//!
//! Provides [`SubscriberSet`] which distributes events to multiple subscribers
//! without blocking the publisher.
//!
//! ## Architecture
//! ```text
//! emit(event)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!     │    (bounded)         └──────► panic → SubscriberPanicked
//!     ├──► [queue 2] ──► worker 2 ──► subscriber2.on_event()
//!     └──► [queue N] ──► worker N ──► subscriberN.on_event()
//! ```
//!
//! ## Rules
//! - **No cross-subscriber ordering**
//! - **Overflow**: event dropped for that subscriber only, `SubscriberOverflow` published
//! - **Non-blocking**: `emit()` returns immediately (uses `try_send`)
//! - **Per-subscriber FIFO**
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state inconsistent
//! if a subscriber panics while holding a lock.

use std::sync::Arc;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::error::panic_message;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

/// Per-subscriber channel metadata.
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for multiple event subscribers.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber on `handle`.
    ///
    /// Workers run until the set is dropped (their queues close).
    #[must_use]
    pub(crate) fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus, handle: &Handle) -> Self {
        let mut channels = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);
            let bus_for_worker = bus.clone();

            handle.spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());
                    if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await
                    {
                        let info = panic_message(&*panic_err);
                        tracing::warn!(subscriber = sub.name(), %info, "subscriber panicked");
                        bus_for_worker.publish(Event::subscriber_panicked(sub.name(), info));
                    }
                }
            });
            channels.push(SubscriberChannel { name, sender: tx });
        }
        Self { channels, bus }
    }

    /// Emits an event to all subscribers.
    ///
    /// On a full or closed queue the event is dropped for that subscriber and
    /// `SubscriberOverflow` is published, unless the event itself is an overflow
    /// report (prevents feedback loops).
    pub fn emit(&self, event: &Event) {
        let event = Arc::new(event.clone());
        let is_overflow_evt = matches!(event.kind, EventKind::SubscriberOverflow);

        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow_evt {
                tracing::debug!(subscriber = channel.name, reason, "subscriber dropped event");
                self.bus
                    .publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Mutex;

    struct Recorder(Mutex<Vec<EventKind>>);

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.0.lock().await.push(ev.kind);
        }
        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Exploder;

    #[async_trait]
    impl Subscribe for Exploder {
        async fn on_event(&self, _ev: &Event) {
            panic!("exploder");
        }
        fn name(&self) -> &'static str {
            "exploder"
        }
    }

    #[tokio::test]
    async fn delivers_in_order_and_isolates_panics() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let rec = Arc::new(Recorder(Mutex::new(Vec::new())));
        let subs: Vec<Arc<dyn Subscribe>> = vec![rec.clone(), Arc::new(Exploder)];
        let set = SubscriberSet::new(subs, bus.clone(), &Handle::current());
        assert_eq!(set.len(), 2);

        set.emit(&Event::new(EventKind::TaskSubmitted));
        set.emit(&Event::new(EventKind::TaskCompleted));

        let panicked = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(panicked.kind, EventKind::SubscriberPanicked);
        assert_eq!(panicked.task.as_deref(), Some("exploder"));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(
            *rec.0.lock().await,
            vec![EventKind::TaskSubmitted, EventKind::TaskCompleted]
        );
    }
}
