//! Error types used by the admission gate, the slot table and the simulation runtime.
//!
//! - [`AdmissionError`]: a device was not admitted (cancelled, timed out, gate closed).
//! - [`SlotError`]: slot bookkeeping faults; they indicate a broken lifecycle invariant.
//! - [`RuntimeError`]: failures of a whole run.
//!
//! Every type provides `as_label` (stable snake_case) for logs and events.

use std::time::Duration;
use thiserror::Error;

use crate::devices::DeviceId;

/// # Reasons an admission request ended without a permit.
///
/// None of these is a fault: each is a well-defined exit that leaves the gate
/// counters exactly as if the request had never been made.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionError {
    /// The waiting worker was cancelled before a permit was released to it.
    #[error("admission cancelled while waiting")]
    Cancelled,

    /// No permit became available within the admission timeout.
    #[error("not admitted within {timeout:?}")]
    TimedOut {
        /// The configured admission timeout.
        timeout: Duration,
    },

    /// The gate was closed (run shutting down).
    #[error("admission gate closed")]
    Closed {
        /// `true` if the caller had already suspended (and published `DeviceWaiting`).
        waited: bool,
    },
}

impl AdmissionError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use routergate::AdmissionError;
    ///
    /// assert_eq!(AdmissionError::Cancelled.as_label(), "admission_cancelled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            AdmissionError::Cancelled => "admission_cancelled",
            AdmissionError::TimedOut { .. } => "admission_timed_out",
            AdmissionError::Closed { .. } => "admission_closed",
        }
    }
}

/// # Slot bookkeeping faults.
///
/// Any of these means the occupancy invariant was (or would have been) broken.
/// Workers treat them as fatal and the simulation aborts the run.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotError {
    /// The device does not occupy any slot.
    #[error("device {device} holds no slot")]
    NotFound {
        /// Device that was looked up.
        device: DeviceId,
    },

    /// The device already occupies a slot.
    #[error("device {device} already holds slot {order}")]
    AlreadyAssigned {
        /// Device that asked twice.
        device: DeviceId,
        /// Slot it already holds.
        order: usize,
    },

    /// The permit was issued by a different gate.
    #[error("permit was issued by another admission gate")]
    ForeignPermit,

    /// Every slot is taken although a permit was held.
    #[error("all {capacity} slots occupied while holding a permit")]
    Exhausted {
        /// Table capacity.
        capacity: usize,
    },
}

impl SlotError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            SlotError::NotFound { .. } => "slot_not_found",
            SlotError::AlreadyAssigned { .. } => "slot_already_assigned",
            SlotError::ForeignPermit => "slot_foreign_permit",
            SlotError::Exhausted { .. } => "slot_exhausted",
        }
    }
}

/// # Errors produced by a simulation run.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The router must have room for at least one device.
    #[error("router capacity must be at least 1")]
    InvalidCapacity,

    /// Shutdown grace period was exceeded; some devices were still running.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of devices whose workers did not finish in time.
        stuck: Vec<String>,
    },

    /// A worker hit a slot bookkeeping fault; shared state can no longer be trusted.
    #[error("invariant violated by device {device:?}: {source}")]
    InvariantViolated {
        /// Name of the offending device.
        device: String,
        /// The underlying fault.
        #[source]
        source: SlotError,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use routergate::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::InvalidCapacity => "runtime_invalid_capacity",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::InvariantViolated { .. } => "runtime_invariant_violated",
        }
    }
}
