//! # Journal: the run's human-readable event log.
//!
//! [`Journal`] turns lifecycle events into log lines (see [`Event::log_line`]) and appends
//! them to a [`LogSink`]. One journal exists per run; the simulation clears it before any
//! device starts and drains it before `run` returns.
//!
//! Unlike [`Subscribe`](crate::Subscribe) implementations, the journal does not sit behind the
//! broadcast ring: it reads the bus journal feed, an unbounded queue that never drops, so
//! every line reaches the sink no matter how many devices run.
//!
//! ```text
//! Bus::publish ──► journal feed (mpsc, unbounded) ──► Journal::drain ──► LogSink::append
//!                                                       └─ stops after RunFinished
//! ```
//!
//! ## Example output
//! ```text
//! - (A) (Mobile) Arrived
//! - Connection 1: A Occupied
//! - Connection 1: A Login
//! - (B) (PC) Arrived and Waiting
//! - Connection 1: A performs online activity
//! - Connection 1: A Logged out
//! - Connection 1: B Occupied
//! ```
//!
//! ## Failure policy
//! A failed write is reported to the operator (stderr and a `SinkFailed` event) and the
//! journal moves on with the next line; counters of the gate and slot table are never touched.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

use crate::events::{Bus, Event, EventKind};
use crate::sinks::LogSink;

/// Sink-backed event log.
pub struct Journal {
    sink: Arc<dyn LogSink>,
    bus: Bus,
    failures: AtomicU64,
}

impl Journal {
    /// Creates a journal writing to `sink` and reporting failures on `bus`.
    pub fn new(sink: Arc<dyn LogSink>, bus: Bus) -> Self {
        Self {
            sink,
            bus,
            failures: AtomicU64::new(0),
        }
    }

    /// Truncates the sink. Failures are reported like append failures.
    pub async fn clear(&self) {
        if let Err(e) = self.sink.clear().await {
            self.report("clear", &e);
        }
    }

    /// Number of sink operations that failed so far.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Appends the line of `ev`, if it has one.
    pub async fn write(&self, ev: &Event) {
        let Some(line) = ev.log_line() else { return };
        if let Err(e) = self.sink.append(&line).await {
            self.report("append", &e);
        }
    }

    /// Writes every event of `feed` until `RunFinished` arrives or the feed closes.
    pub(crate) async fn drain(self: Arc<Self>, mut feed: mpsc::UnboundedReceiver<Event>) {
        while let Some(ev) = feed.recv().await {
            if ev.kind == EventKind::RunFinished {
                break;
            }
            self.write(&ev).await;
        }
    }

    fn report(&self, op: &str, err: &std::io::Error) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        eprintln!("[journal] {op} failed: {err}");
        self.bus.publish(
            Event::new(EventKind::SinkFailed).with_reason(format!("op={op} err={err}")),
        );
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use async_trait::async_trait;

    use super::*;
    use crate::devices::{Category, Device, DeviceId};
    use crate::sinks::MemorySink;

    struct BrokenSink;

    #[async_trait]
    impl LogSink for BrokenSink {
        async fn clear(&self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        }

        async fn append(&self, _line: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::StorageFull, "disk full"))
        }
    }

    #[tokio::test]
    async fn test_only_lifecycle_lines_are_written() {
        let sink = Arc::new(MemorySink::new());
        let journal = Journal::new(sink.clone(), Bus::new(8));
        let d = Device::new(DeviceId(1), "A", Category::Mobile);

        journal.write(&Event::new(EventKind::DeviceArrived).with_device(&d)).await;
        journal
            .write(&Event::new(EventKind::SlotFreed).with_device_id(d.id()).with_order(1))
            .await;
        journal
            .write(&Event::new(EventKind::SlotOccupied).with_device(&d).with_order(1))
            .await;

        assert_eq!(
            sink.lines(),
            vec!["- (A) (Mobile) Arrived", "- Connection 1: A Occupied"]
        );
    }

    #[tokio::test]
    async fn test_clear_resets_sink() {
        let sink = Arc::new(MemorySink::new());
        sink.append("old").await.unwrap();
        let journal = Journal::new(sink.clone(), Bus::new(8));

        journal.clear().await;
        assert!(sink.lines().is_empty());
        assert_eq!(journal.failures(), 0);
    }

    #[tokio::test]
    async fn test_sink_failure_is_reported_not_swallowed() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let journal = Journal::new(Arc::new(BrokenSink), bus);
        let d = Device::new(DeviceId(1), "A", Category::PC);

        journal.clear().await;
        journal.write(&Event::new(EventKind::DeviceArrived).with_device(&d)).await;

        assert_eq!(journal.failures(), 2);
        let first = rx.recv().await.unwrap();
        assert_eq!(first.kind, EventKind::SinkFailed);
        assert!(first.reason.as_deref().unwrap_or_default().contains("op=clear"));
        let second = rx.recv().await.unwrap();
        assert!(second.reason.as_deref().unwrap_or_default().contains("disk full"));
    }

    #[tokio::test]
    async fn test_drain_writes_whole_feed_until_run_finished() {
        let (bus, feed) = Bus::with_journal_feed(1);
        let sink = Arc::new(MemorySink::new());
        let journal = Arc::new(Journal::new(sink.clone(), bus.clone()));

        for i in 0..5000u32 {
            let d = Device::new(DeviceId(i + 1), format!("d{i}"), Category::Tablet);
            bus.publish(Event::new(EventKind::DeviceArrived).with_device(&d));
        }
        bus.publish(Event::new(EventKind::RunFinished));
        let late = Device::new(DeviceId(9999), "late", Category::PC);
        bus.publish(Event::new(EventKind::DeviceArrived).with_device(&late));

        journal.drain(feed).await;

        let lines = sink.lines();
        assert_eq!(lines.len(), 5000);
        assert_eq!(lines[0], "- (d0) (Tablet) Arrived");
        assert_eq!(lines[4999], "- (d4999) (Tablet) Arrived");
    }
}
