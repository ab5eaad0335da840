//! Simulated clients and their lifecycle states.
//!
//! - [`Device`], [`DeviceId`], [`Category`], [`DeviceSpec`] plain device records
//! - [`DeviceState`] states visited by a device worker

mod device;
mod state;

pub use device::{Category, Device, DeviceId, DeviceSpec};
pub use state::DeviceState;
