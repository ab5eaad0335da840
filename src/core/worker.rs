//! # DeviceWorker: drives one device through its lifecycle.
//!
//! ## State machine
//! ```text
//! Requesting ──acquire──► (Waiting) ──► Connected ──sleep──► Active ──sleep──► LoggingOut ──► Disconnected
//!      │                      │
//!      └── Closed             └── Cancelled / TimedOut   (leave without connecting)
//! ```
//!
//! ## Event flow
//! ```text
//! DeviceArrived | DeviceWaiting   (published by the gate)
//! SlotOccupied                    (published by the slot table)
//! DeviceLogin → DeviceActive → DeviceLoggedOut → [SlotFreed] → DeviceDisconnected
//! ```
//!
//! ## Rules
//! - One pass, no retries: a worker never re-enters the gate.
//! - The only cancellation point is the admission wait; timed phases run to completion.
//! - Slot and permit are held by a [`Lease`](crate::Lease): released explicitly on the
//!   happy path (slot first, then permit) and by its guard on any abnormal exit.
//! - Slot bookkeeping faults are returned as `Err` and end the worker.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        gate::{Admission, AdmissionGate},
        slots::SlotTable,
    },
    devices::{Device, DeviceState},
    error::{AdmissionError, SlotError},
    events::{Bus, Event, EventKind},
    policies::DurationSource,
};

/// How a worker ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerExit {
    /// Full lifecycle completed.
    Disconnected,
    /// Cancelled while waiting for admission.
    Cancelled,
    /// Admission timeout elapsed.
    TimedOut,
    /// Gate closed before admission.
    Closed,
    /// The worker panicked; its lease (if any) was released by the guard.
    Panicked,
}

impl WorkerExit {
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerExit::Disconnected => "disconnected",
            WorkerExit::Cancelled => "cancelled",
            WorkerExit::TimedOut => "timed_out",
            WorkerExit::Closed => "closed",
            WorkerExit::Panicked => "panicked",
        }
    }
}

/// Outcome of one device worker.
#[derive(Clone, Debug)]
pub struct WorkerReport {
    /// The device that was driven.
    pub device: Arc<Device>,
    /// How the worker ended.
    pub exit: WorkerExit,
    /// States visited, in order, starting with `Requesting`.
    pub path: Vec<DeviceState>,
    /// Connection order while connected (`None` if never connected).
    pub order: Option<usize>,
}

/// Parameters shared by every worker of a run.
#[derive(Clone)]
pub struct WorkerParams {
    /// Source of the two activity delays.
    pub activity: Arc<dyn DurationSource>,
    /// Optional admission timeout (`None` = wait indefinitely).
    pub admission_timeout: Option<Duration>,
}

/// Drives a single [`Device`] from arrival to disconnect.
pub struct DeviceWorker {
    device: Arc<Device>,
    gate: Arc<AdmissionGate>,
    slots: Arc<SlotTable>,
    params: WorkerParams,
    bus: Bus,
    state: DeviceState,
    path: Vec<DeviceState>,
    order: Option<usize>,
}

impl DeviceWorker {
    /// Creates a worker in the `Requesting` state.
    pub fn new(
        device: Arc<Device>,
        gate: Arc<AdmissionGate>,
        slots: Arc<SlotTable>,
        params: WorkerParams,
        bus: Bus,
    ) -> Self {
        Self {
            device,
            gate,
            slots,
            params,
            bus,
            state: DeviceState::Requesting,
            path: vec![DeviceState::Requesting],
            order: None,
        }
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Runs the lifecycle once.
    ///
    /// ### Exit conditions
    /// - `Ok(Disconnected)`: slot and permit returned
    /// - `Ok(Cancelled | TimedOut | Closed)`: never admitted, gate counters untouched
    /// - `Err(SlotError)`: bookkeeping fault; slot and permit released by the lease guard
    pub async fn run(mut self, token: CancellationToken) -> Result<WorkerReport, SlotError> {
        let permit = match self
            .gate
            .acquire(&self.device, &token, self.params.admission_timeout)
            .await
        {
            Ok(permit) => permit,
            Err(e) => return Ok(self.abandon(e)),
        };
        if permit.admission() == Admission::AfterWait {
            self.advance(DeviceState::Waiting);
        }

        let lease = self.slots.assign(permit, &self.device)?;
        self.order = Some(lease.order());
        self.advance(DeviceState::Connected);
        self.publish(EventKind::DeviceLogin, lease.order());

        time::sleep(self.params.activity.next_delay()).await;
        self.advance(DeviceState::Active);
        let order = self.slots.order_of(self.device.id())?;
        self.publish(EventKind::DeviceActive, order);

        time::sleep(self.params.activity.next_delay()).await;
        self.advance(DeviceState::LoggingOut);
        let order = self.slots.order_of(self.device.id())?;
        self.publish(EventKind::DeviceLoggedOut, order);

        lease.release()?;
        self.advance(DeviceState::Disconnected);
        debug_assert!(self.state.is_terminal());
        self.bus
            .publish(Event::new(EventKind::DeviceDisconnected).with_device(&self.device));

        Ok(self.report(WorkerExit::Disconnected))
    }

    /// Leaves without connecting.
    fn abandon(mut self, err: AdmissionError) -> WorkerReport {
        let (exit, event) = match err {
            AdmissionError::Cancelled => (
                WorkerExit::Cancelled,
                Event::new(EventKind::AdmissionCancelled),
            ),
            AdmissionError::TimedOut { timeout } => (
                WorkerExit::TimedOut,
                Event::new(EventKind::AdmissionTimedOut).with_timeout(timeout),
            ),
            AdmissionError::Closed { .. } => (
                WorkerExit::Closed,
                Event::new(EventKind::AdmissionCancelled),
            ),
        };
        // Only a gate closed before arrival leaves without a DeviceWaiting line.
        if err != (AdmissionError::Closed { waited: false }) {
            self.advance(DeviceState::Waiting);
        }
        debug_assert!(!self.state.holds_slot());
        self.bus.publish(
            event
                .with_device(&self.device)
                .with_reason(err.as_label()),
        );
        self.report(exit)
    }

    fn advance(&mut self, next: DeviceState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug_assert!(!next.holds_slot() || self.order.is_some());
        self.state = next;
        self.path.push(next);
    }

    fn publish(&self, kind: EventKind, order: usize) {
        self.bus
            .publish(Event::new(kind).with_device(&self.device).with_order(order));
    }

    fn report(self, exit: WorkerExit) -> WorkerReport {
        WorkerReport {
            device: self.device,
            exit,
            path: self.path,
            order: self.order,
        }
    }
}
