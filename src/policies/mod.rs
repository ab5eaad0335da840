//! Timing policies for device workers.
//!
//! ## Contents
//! - [`ActivityPolicy`] how long a connected device stays in each phase (instant / fixed / uniform)
//! - [`DurationSource`] trait for plugging in any other duration generator
//!
//! ## Quick wiring
//! ```text
//! Config { activity: ActivityPolicy, .. }
//!      └─► SimulationBuilder::with_activity_source(Arc<dyn DurationSource>) (optional override)
//!           └─► core::worker::DeviceWorker sleeps next_delay() before Active and before LoggingOut
//! ```
//!
//! ## Defaults
//! - `ActivityPolicy::default()` → uniform in `[0ms, 1500ms]`.

mod activity;

pub use activity::{ActivityPolicy, DurationSource};
