//! Runtime core: admission, slot bookkeeping and orchestration.
//!
//! Internal modules:
//! - [`gate`]: counting semaphore with the signed `available` counter;
//! - [`slots`]: connection slot table and the [`Lease`] guard;
//! - [`worker`]: drives one device through its lifecycle;
//! - [`simulation`]: spawns workers, handles shutdown, drains subscribers;
//! - [`builder`]: assembles a [`Simulation`] from a [`Config`];
//! - [`config`]: run settings;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod builder;
mod config;
mod gate;
mod shutdown;
mod simulation;
mod slots;
mod worker;

pub use builder::SimulationBuilder;
pub use config::Config;
pub use gate::{Admission, AdmissionGate, GateSnapshot, Permit};
pub use simulation::{RunReport, Simulation};
pub use slots::{Lease, SlotTable};
pub use worker::{DeviceWorker, WorkerExit, WorkerParams, WorkerReport};
