//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the admission gate, the slot table,
//! device workers, the journal and the simulation itself.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification, payload metadata and log line rendering
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `AdmissionGate`, `SlotTable`, `DeviceWorker`, `Simulation`,
//!   `Journal` (sink failures), `SubscriberSet` workers (overflow/panic).
//! - **Consumer**: the simulation listener, which fans out to the `SubscriberSet`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
