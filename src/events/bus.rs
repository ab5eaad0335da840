//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] shared by the gate,
//! the slot table, device workers and the journal. A bus built with
//! [`Bus::with_journal_feed`] additionally copies every journaled event into an unbounded
//! `mpsc` queue drained by the [`Journal`](crate::Journal).
//!
//! ## Architecture
//! ```text
//! Publishers (many):                 Consumers:
//!   Gate    ──┐                ┌──► broadcast ──► listener ──► SubscriberSet   (best effort)
//!   Slots   ──┼──────► Bus ────┤
//!   Worker N──┤                └──► mpsc (journaled kinds + RunFinished) ──► Journal (lossless)
//!   Journal ──┘
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks and may be called while holding a std lock.
//! - **Total order**: every receiver observes events in the order `publish` was called.
//! - **Lag handling**: slow broadcast receivers get `RecvError::Lagged(n)` and skip `n`
//!   oldest items. The journal feed never drops.
//! - **No persistence**: broadcast events are lost if there are no active receivers at send time.

use tokio::sync::{broadcast, mpsc};

use super::event::{Event, EventKind};

/// Broadcast channel for runtime events.
///
/// Cheap to clone (internally holds `Arc`-backed senders).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
    journal: Option<mpsc::UnboundedSender<Event>>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to a minimum of 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx, journal: None }
    }

    /// Creates a bus plus the receiving end of its journal feed.
    ///
    /// The feed carries every event whose kind [`is_journaled`](EventKind::is_journaled),
    /// and `RunFinished`, in publish order.
    pub fn with_journal_feed(capacity: usize) -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (feed, rx) = mpsc::unbounded_channel();
        let mut bus = Self::new(capacity);
        bus.journal = Some(feed);
        (bus, rx)
    }

    /// Publishes an event to all active receivers.
    ///
    /// If there are no broadcast receivers, the broadcast copy is dropped.
    pub fn publish(&self, ev: Event) {
        if let Some(feed) = &self.journal {
            if ev.kind.is_journaled() || ev.kind == EventKind::RunFinished {
                let _ = feed.send(ev.clone());
            }
        }
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_receivers_see_publish_order() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();

        bus.publish(Event::new(EventKind::DeviceArrived));
        bus.publish(Event::new(EventKind::SlotOccupied));
        bus.publish(Event::new(EventKind::RunFinished));

        let kinds: Vec<_> = [
            rx.recv().await.map(|e| e.kind).ok(),
            rx.recv().await.map(|e| e.kind).ok(),
            rx.recv().await.map(|e| e.kind).ok(),
        ]
        .into_iter()
        .flatten()
        .collect();
        assert_eq!(
            kinds,
            vec![EventKind::DeviceArrived, EventKind::SlotOccupied, EventKind::RunFinished]
        );
    }

    #[test]
    fn test_publish_without_receivers_is_noop() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::RunFinished));
    }

    #[test]
    fn test_journal_feed_keeps_everything_the_ring_drops() {
        let (bus, mut feed) = Bus::with_journal_feed(4);
        let mut rx = bus.subscribe();

        for _ in 0..100 {
            bus.publish(Event::new(EventKind::DeviceLogin));
            bus.publish(Event::new(EventKind::SlotFreed));
        }
        bus.publish(Event::new(EventKind::RunFinished));

        let mut kinds = Vec::new();
        while let Ok(ev) = feed.try_recv() {
            kinds.push(ev.kind);
        }
        assert_eq!(kinds.len(), 101);
        assert!(kinds[..100].iter().all(|k| *k == EventKind::DeviceLogin));
        assert_eq!(kinds[100], EventKind::RunFinished);

        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(_))
        ));
    }
}
