//! # Runtime events emitted by the gate, the slot table and device workers.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Device lifecycle**: arrival, waiting, occupation, login, activity, logout
//! - **Bookkeeping**: slot freed, admission cancelled or timed out, worker failures
//! - **Run control**: shutdown, grace handling, end of run
//! - **Delivery**: subscriber overflow/panic, sink failures
//!
//! The [`Event`] struct carries the metadata: timestamps, device identity, slot order and reasons.
//! Six kinds map to a human-readable log line via [`Event::log_line`].
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Events published by one device worker are in its lifecycle order.
//!
//! ## Example
//! ```rust
//! use routergate::{Category, Device, DeviceId, Event, EventKind};
//!
//! let phone = Device::new(DeviceId(1), "phone", Category::Mobile);
//! let ev = Event::new(EventKind::DeviceLogin).with_device(&phone).with_order(2);
//!
//! assert_eq!(ev.kind, EventKind::DeviceLogin);
//! assert_eq!(ev.log_line().as_deref(), Some("- Connection 2: phone Login"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::devices::{Category, Device, DeviceId};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Device lifecycle ===
    /// Device arrived and was admitted without contention.
    ///
    /// Sets: `device`, `device_id`, `category`.
    DeviceArrived,

    /// Device arrived at a saturated gate and is about to suspend.
    ///
    /// Sets: `device`, `device_id`, `category`.
    DeviceWaiting,

    /// Slot assigned to an admitted device.
    ///
    /// Sets: `device`, `device_id`, `category`, `order` (1-based slot index).
    SlotOccupied,

    /// Device logged in on its slot.
    ///
    /// Sets: `device`, `device_id`, `category`, `order`.
    DeviceLogin,

    /// Device performs online activity.
    ///
    /// Sets: `device`, `device_id`, `category`, `order`.
    DeviceActive,

    /// Device logged out (slot still held).
    ///
    /// Sets: `device`, `device_id`, `category`, `order`.
    DeviceLoggedOut,

    /// Device returned slot and permit.
    ///
    /// Sets: `device`, `device_id`, `category`.
    DeviceDisconnected,

    // === Bookkeeping ===
    /// Slot cleared by the table (published under the table lock).
    ///
    /// Sets: `device_id`, `order`.
    SlotFreed,

    /// Waiting device left the gate because its worker was cancelled.
    ///
    /// Sets: `device`, `device_id`, `category`.
    AdmissionCancelled,

    /// Waiting device gave up after the admission timeout.
    ///
    /// Sets: `device`, `device_id`, `category`, `timeout_ms`.
    AdmissionTimedOut,

    /// Worker terminated abnormally (bookkeeping fault or panic).
    ///
    /// Sets: `device`, `device_id`, `category`, `reason`.
    WorkerFailed,

    // === Run control ===
    /// Shutdown requested (OS signal observed).
    ShutdownRequested,

    /// All workers stopped within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some workers were still running.
    GraceExceeded,

    /// Last event of a run; the listener stops after forwarding it.
    RunFinished,

    // === Delivery ===
    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `device` (subscriber name), `reason`.
    SubscriberOverflow,

    /// Subscriber panicked while handling an event.
    ///
    /// Sets: `device` (subscriber name), `reason`.
    SubscriberPanicked,

    /// Log sink failed to persist a line.
    ///
    /// Sets: `reason`.
    SinkFailed,
}

impl EventKind {
    /// Returns `true` for the kinds rendered as journal lines (see [`Event::log_line`]).
    #[inline]
    pub fn is_journaled(&self) -> bool {
        matches!(
            self,
            EventKind::DeviceArrived
                | EventKind::DeviceWaiting
                | EventKind::SlotOccupied
                | EventKind::DeviceLogin
                | EventKind::DeviceActive
                | EventKind::DeviceLoggedOut
        )
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Device name (or subscriber name for delivery events).
    pub device: Option<Arc<str>>,
    /// Device identity.
    pub device_id: Option<DeviceId>,
    /// Device category.
    pub category: Option<Category>,
    /// 1-based connection order (slot index).
    pub order: Option<usize>,
    /// Admission timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            device: None,
            device_id: None,
            category: None,
            order: None,
            timeout_ms: None,
            reason: None,
        }
    }

    /// Attaches name, id and category of a device.
    #[inline]
    pub fn with_device(mut self, device: &Device) -> Self {
        self.device = Some(device.name_arc());
        self.device_id = Some(device.id());
        self.category = Some(device.category());
        self
    }

    /// Attaches only a device id.
    #[inline]
    pub fn with_device_id(mut self, id: DeviceId) -> Self {
        self.device_id = Some(id);
        self
    }

    /// Attaches a connection order.
    #[inline]
    pub fn with_order(mut self, order: usize) -> Self {
        self.order = Some(order);
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        let mut ev = Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"));
        ev.device = Some(Arc::from(subscriber));
        ev
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        let mut ev = Event::new(EventKind::SubscriberPanicked).with_reason(info);
        ev.device = Some(Arc::from(subscriber));
        ev
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    /// Renders the journal line for this event, if it has one.
    ///
    /// ```text
    /// - (<name>) (<category>) Arrived and Waiting
    /// - (<name>) (<category>) Arrived
    /// - Connection <order>: <name> Occupied
    /// - Connection <order>: <name> Login
    /// - Connection <order>: <name> performs online activity
    /// - Connection <order>: <name> Logged out
    /// ```
    pub fn log_line(&self) -> Option<String> {
        let name = self.device.as_deref()?;
        match self.kind {
            EventKind::DeviceArrived => Some(format!("- ({name}) ({}) Arrived", self.category?)),
            EventKind::DeviceWaiting => Some(format!(
                "- ({name}) ({}) Arrived and Waiting",
                self.category?
            )),
            EventKind::SlotOccupied => Some(format!("- Connection {}: {name} Occupied", self.order?)),
            EventKind::DeviceLogin => Some(format!("- Connection {}: {name} Login", self.order?)),
            EventKind::DeviceActive => Some(format!(
                "- Connection {}: {name} performs online activity",
                self.order?
            )),
            EventKind::DeviceLoggedOut => {
                Some(format!("- Connection {}: {name} Logged out", self.order?))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tablet() -> Device {
        Device::new(DeviceId(3), "C", Category::Tablet)
    }

    #[test]
    fn test_arrival_lines() {
        let d = tablet();
        assert_eq!(
            Event::new(EventKind::DeviceArrived).with_device(&d).log_line().as_deref(),
            Some("- (C) (Tablet) Arrived")
        );
        assert_eq!(
            Event::new(EventKind::DeviceWaiting).with_device(&d).log_line().as_deref(),
            Some("- (C) (Tablet) Arrived and Waiting")
        );
    }

    #[test]
    fn test_connection_lines_carry_order() {
        let d = tablet();
        let line = |kind| {
            Event::new(kind)
                .with_device(&d)
                .with_order(4)
                .log_line()
                .unwrap_or_default()
        };
        assert_eq!(line(EventKind::SlotOccupied), "- Connection 4: C Occupied");
        assert_eq!(line(EventKind::DeviceLogin), "- Connection 4: C Login");
        assert_eq!(
            line(EventKind::DeviceActive),
            "- Connection 4: C performs online activity"
        );
        assert_eq!(line(EventKind::DeviceLoggedOut), "- Connection 4: C Logged out");
    }

    #[test]
    fn test_internal_events_have_no_line() {
        let d = tablet();
        assert!(Event::new(EventKind::DeviceDisconnected).with_device(&d).log_line().is_none());
        assert!(Event::new(EventKind::SlotFreed).with_order(1).log_line().is_none());
        assert!(Event::new(EventKind::RunFinished).log_line().is_none());
        // Missing order means no connection line rather than a bogus one.
        assert!(Event::new(EventKind::DeviceLogin).with_device(&d).log_line().is_none());
    }

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::RunFinished);
        let b = Event::new(EventKind::RunFinished);
        assert!(b.seq > a.seq);
    }
}
