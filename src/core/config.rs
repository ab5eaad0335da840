//! # Simulation configuration.
//!
//! Provides [`Config`] centralized settings for one simulation run.
//!
//! ## Sentinel values
//! - `capacity = 0` → rejected by [`SimulationBuilder::build`](crate::SimulationBuilder::build)
//! - `admission_timeout = 0s` → devices wait for admission indefinitely

use std::num::NonZeroUsize;
use std::time::Duration;

use crate::policies::ActivityPolicy;

/// Configuration for one simulation run.
///
/// ## Field semantics
/// - `capacity`: Number of router slots (must be at least 1)
/// - `activity`: Duration policy for the two timed phases of a connected device
/// - `admission_timeout`: Give up waiting for a slot after this long (`0s` = never)
/// - `grace`: Maximum wait for workers after a shutdown signal
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum number of devices connected at once.
    pub capacity: usize,

    /// How long a connected device stays in each timed phase.
    ///
    /// Overridable per run with
    /// [`SimulationBuilder::with_activity_source`](crate::SimulationBuilder::with_activity_source).
    pub activity: ActivityPolicy,

    /// Admission timeout.
    ///
    /// - `Duration::ZERO` = wait until admitted or cancelled
    /// - `> 0` = a device still waiting after this long leaves without connecting
    pub admission_timeout: Duration,

    /// Maximum time to wait for workers after a shutdown signal.
    ///
    /// Waiting devices are cancelled at once; connected devices finish their lifecycle.
    /// If they take longer, the run returns `RuntimeError::GraceExceeded`.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,
}

impl Config {
    /// Creates a default configuration with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Returns the capacity if it is usable.
    #[inline]
    pub fn capacity_checked(&self) -> Option<NonZeroUsize> {
        NonZeroUsize::new(self.capacity)
    }

    /// Returns the admission timeout as an `Option`.
    ///
    /// - `None` → wait indefinitely
    /// - `Some(d)` → give up after `d`
    #[inline]
    pub fn admission_timeout(&self) -> Option<Duration> {
        if self.admission_timeout == Duration::ZERO {
            None
        } else {
            Some(self.admission_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `capacity = 1`
    /// - `activity = ActivityPolicy::default()` (uniform 0..=1500ms)
    /// - `admission_timeout = 0s` (wait indefinitely)
    /// - `grace = 5s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            capacity: 1,
            activity: ActivityPolicy::default(),
            admission_timeout: Duration::ZERO,
            grace: Duration::from_secs(5),
            bus_capacity: 1024,
        }
    }
}
