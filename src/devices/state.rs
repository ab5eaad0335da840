//! # Device lifecycle states.
//!
//! ```text
//! Requesting ──► (Waiting) ──► Connected ──► Active ──► LoggingOut ──► Disconnected
//! ```
//!
//! `Waiting` is visited only when the admission gate was saturated on arrival.
//! `Disconnected` is terminal and reached at most once per device.

use std::fmt;

/// Lifecycle state of a device worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeviceState {
    /// Asking the gate for a permit.
    Requesting,
    /// Blocked in the gate until a permit is released.
    Waiting,
    /// Holds a permit and a slot.
    Connected,
    /// Performing online activity.
    Active,
    /// Finished activity, about to give the slot back.
    LoggingOut,
    /// Slot and permit returned.
    Disconnected,
}

impl DeviceState {
    /// Returns `true` while the device occupies a slot.
    #[inline]
    pub fn holds_slot(&self) -> bool {
        matches!(
            self,
            DeviceState::Connected | DeviceState::Active | DeviceState::LoggingOut
        )
    }

    /// Returns `true` for the terminal state.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeviceState::Disconnected)
    }

    /// Returns `true` if `next` is a legal successor of `self`.
    pub fn can_advance_to(&self, next: DeviceState) -> bool {
        use DeviceState::*;
        matches!(
            (self, next),
            (Requesting, Waiting)
                | (Requesting, Connected)
                | (Waiting, Connected)
                | (Connected, Active)
                | (Active, LoggingOut)
                | (LoggingOut, Disconnected)
        )
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            DeviceState::Requesting => "requesting",
            DeviceState::Waiting => "waiting",
            DeviceState::Connected => "connected",
            DeviceState::Active => "active",
            DeviceState::LoggingOut => "logging_out",
            DeviceState::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}
