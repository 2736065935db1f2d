//! Broadcast bus carrying runner events.
//!
//! Publishers are the submission path, each supervising unit and its work
//! guard, shutdown, and subscriber workers reporting overflow or panics. The
//! only consumer is the runner's listener, which forwards to subscribers when
//! there are any. Nothing the runner needs for correctness travels here: a
//! lagging listener loses events, never results or alive bookkeeping.

use tokio::sync::broadcast;

use super::event::Event;

#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Ring buffer of `capacity` events (at least one).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Fire-and-forget. Dropped when nobody listens.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
