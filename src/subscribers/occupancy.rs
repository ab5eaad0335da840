//! # Occupancy tracker rebuilt from the event stream.
//!
//! Replays `SlotOccupied` / `SlotFreed` to maintain which device holds which slot,
//! the peak number of simultaneously connected devices, and any anomaly seen on the way.
//!
//! ## Architecture
//! ```text
//! SlotTable ──► Bus ──► listener ──► SubscriberSet ──► OccupancyTracker::on_event()
//!                                                            │
//!                                                            ▼
//!                                            HashMap<DeviceId, order> + peak + anomalies
//! ```
//!
//! ## Rules
//! - Slot events are published under the table lock, so replay order equals table order.
//! - Anomalies (slot reused while held, device connected twice, free of an unknown device,
//!   occupancy above capacity) are recorded, never panicked on.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::devices::DeviceId;
use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

#[derive(Debug, Default)]
struct State {
    held: HashMap<DeviceId, usize>,
    peak: usize,
    anomalies: Vec<String>,
}

/// Event-driven view of router occupancy.
#[derive(Debug)]
pub struct OccupancyTracker {
    capacity: usize,
    state: Mutex<State>,
}

impl OccupancyTracker {
    /// Creates a tracker that flags occupancy above `capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(State::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies one event.
    pub fn update(&self, ev: &Event) {
        let (Some(device), Some(order)) = (ev.device_id, ev.order) else {
            return;
        };
        let mut guard = self.lock();
        let state = &mut *guard;
        match ev.kind {
            EventKind::SlotOccupied => {
                let holder = state
                    .held
                    .iter()
                    .find(|(_, o)| **o == order)
                    .map(|(d, _)| *d);
                if let Some(other) = holder {
                    let msg = format!("slot {order} given to {device} while held by {other}");
                    state.anomalies.push(msg);
                }
                if let Some(prev) = state.held.insert(device, order) {
                    let msg = format!("{device} occupied slot {order} while holding {prev}");
                    state.anomalies.push(msg);
                }
                let now = state.held.len();
                state.peak = state.peak.max(now);
                if now > self.capacity {
                    let msg = format!("{now} devices connected, capacity {}", self.capacity);
                    state.anomalies.push(msg);
                }
            }
            EventKind::SlotFreed => match state.held.remove(&device) {
                Some(held) if held == order => {}
                Some(held) => state
                    .anomalies
                    .push(format!("{device} freed slot {order} but held {held}")),
                None => state
                    .anomalies
                    .push(format!("{device} freed slot {order} without holding one")),
            },
            _ => {}
        }
    }

    /// Devices currently connected.
    pub fn connected(&self) -> usize {
        self.lock().held.len()
    }

    /// Highest simultaneous occupancy observed.
    pub fn peak(&self) -> usize {
        self.lock().peak
    }

    /// Anomalies observed so far.
    pub fn anomalies(&self) -> Vec<String> {
        self.lock().anomalies.clone()
    }
}

#[async_trait]
impl Subscribe for OccupancyTracker {
    async fn on_event(&self, ev: &Event) {
        self.update(ev);
    }

    fn name(&self) -> &'static str {
        "occupancy"
    }

    fn queue_capacity(&self) -> usize {
        4096
    }
}
