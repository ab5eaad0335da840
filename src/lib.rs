//! # routergate
//!
//! **routergate** simulates a router with a fixed number of connection slots shared by
//! many devices. Each device arrives, is admitted (at once or after waiting), occupies a
//! numbered slot, performs two timed phases of activity and logs out. Every step is
//! published as an event and written, in order, to a log sink.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  DeviceSpec  │   │  DeviceSpec  │   │  DeviceSpec  │
//!     │  (name, cat) │   │  (name, cat) │   │  (name, cat) │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Simulation (coordinator)                                         │
//! │  - AdmissionGate (capacity permits, signed `available`)           │
//! │  - SlotTable (lowest free slot first)                             │
//! │  - Bus (broadcast + journal feed) + SubscriberSet (per-sub queues)│
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │
//!     │ DeviceWorker │   │ DeviceWorker │   │ DeviceWorker │   │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘   │
//!      │ Publishes:       │                  │                 │
//!      │ - DeviceArrived / DeviceWaiting     │                 │
//!      │ - SlotOccupied, DeviceLogin         │                 │
//!      │ - DeviceActive, DeviceLoggedOut     │                 │
//!      │ - SlotFreed, DeviceDisconnected     │                 │
//!      ▼                  ▼                  ▼                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!              ┌────────────────────┴───────────────────┐
//!              ▼                                        ▼
//!   journal feed (mpsc, lossless)           ┌────────────────────────┐
//!              │                            │   listener (in run)    │
//!              ▼                            └───────────┬────────────┘
//!          Journal ──► LogSink                          ▼
//!                                                 SubscriberSet
//!                                              ┌────────┴────────┐
//!                                              ▼                 ▼
//!                                      OccupancyTracker   LogWriter / custom
//! ```
//!
//! ### Device lifecycle
//! ```text
//! Requesting ─► [Waiting] ─► Connected ─► Active ─► LoggingOut ─► Disconnected
//!
//! - (A) (Mobile) Arrived                   or  - (A) (Mobile) Arrived and Waiting
//! - Connection 1: A Occupied
//! - Connection 1: A Login
//! - Connection 1: A performs online activity
//! - Connection 1: A Logged out
//! ```
//!
//! ## Features
//! | Area              | Description                                             | Key types / traits                       |
//! |-------------------|---------------------------------------------------------|------------------------------------------|
//! | **Admission**     | Bounded, cancellable, optionally timed admission.       | [`AdmissionGate`], [`Permit`]            |
//! | **Slots**         | Numbered connection slots with scoped release.          | [`SlotTable`], [`Lease`]                 |
//! | **Simulation**    | Runs a batch of devices and reports how each ended.     | [`Simulation`], [`RunReport`]            |
//! | **Subscriber API**| Hook into device events.                                | [`Subscribe`], [`OccupancyTracker`]      |
//! | **Journal**       | Ordered log lines written to a sink.                    | [`Journal`], [`LogSink`], [`FileSink`]   |
//! | **Errors**        | Typed errors for admission, slots and the run.          | [`AdmissionError`], [`SlotError`], [`RuntimeError`] |
//! | **Configuration** | Centralize run settings.                                | [`Config`], [`ActivityPolicy`]           |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in `LogWriter` that echoes lines to stdout
//!   _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use routergate::{ActivityPolicy, Category, Config, DeviceSpec, MemorySink, Simulation};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = Config::with_capacity(1);
//!     cfg.activity = ActivityPolicy::Fixed(Duration::from_millis(5));
//!
//!     let sink = Arc::new(MemorySink::new());
//!     let sim = Simulation::builder(cfg).with_sink(sink.clone()).build()?;
//!
//!     let report = sim
//!         .run(vec![
//!             DeviceSpec::new("phone", Category::Mobile),
//!             DeviceSpec::new("laptop", Category::PC),
//!         ])
//!         .await?;
//!
//!     assert_eq!(report.completed(), 2);
//!     assert_eq!(sink.lines().len(), 10);
//!     Ok(())
//! }
//! ```

mod core;
mod devices;
mod error;
mod events;
mod policies;
mod sinks;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{
    Admission, AdmissionGate, Config, DeviceWorker, GateSnapshot, Lease, Permit, RunReport,
    Simulation, SimulationBuilder, SlotTable, WorkerExit, WorkerParams, WorkerReport,
};
pub use devices::{Category, Device, DeviceId, DeviceSpec, DeviceState};
pub use error::{AdmissionError, RuntimeError, SlotError};
pub use events::{Bus, Event, EventKind};
pub use policies::{ActivityPolicy, DurationSource};
pub use sinks::{FileSink, LogSink, MemorySink};
pub use subscribers::{Journal, OccupancyTracker, Subscribe, SubscriberSet};

// Optional: expose a simple built-in stdout writer (demo/reference only).
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
