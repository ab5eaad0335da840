//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and the
//! built-in subscribers fed from the [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Gate / SlotTable / DeviceWorker ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!                                                         │                     │
//!                                                         │          ┌──────────┼─────────┐
//!                                                         ▼          ▼          ▼         ▼
//!                                                      Journal  OccupancyTracker LogWriter Custom
//!                                                  (journal feed) (peak / anomalies) (stdout)
//! ```
//!
//! - [`Journal`] is installed by the simulation when a sink is configured. It reads the
//!   lossless journal feed of the bus, not a subscriber queue.
//! - `LogWriter` requires the `logging` feature.

mod journal;
#[cfg(feature = "logging")]
mod log;
mod occupancy;
mod set;
mod subscriber;

pub use journal::Journal;
#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use occupancy::OccupancyTracker;
pub(crate) use set::panic_message;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
