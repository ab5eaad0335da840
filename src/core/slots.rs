//! # SlotTable: which device occupies which router slot.
//!
//! A fixed arena of `capacity` slots plus a free-index set. The 1-based slot index is
//! the device's **connection order** for as long as it stays connected.
//!
//! ```text
//! assign(permit, device) ──► lowest free index ──► publish SlotOccupied ──► Lease
//! Lease::release()       ──► free(device)      ──► publish SlotFreed    ──► permit dropped
//! ```
//!
//! ## Rules
//! - `assign` consumes a [`Permit`] of the gate this table was built for; a slot can
//!   never be taken without admission.
//! - A device appears in at most one slot; its index does not change until freed.
//! - The lowest free index is always picked.
//! - `assign`, `free` and `order_of` share one lock, independent of the gate's lock.
//! - Slot events are published under that lock, so the event stream replays occupancy exactly.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::core::gate::{AdmissionGate, Permit};
use crate::devices::{Device, DeviceId};
use crate::error::SlotError;
use crate::events::{Bus, Event, EventKind};

#[derive(Debug)]
struct Slots {
    /// Slot `i` holds the device connected with order `i + 1`.
    entries: Vec<Option<DeviceId>>,
    /// Free zero-based indices; `first()` is the lowest.
    free: BTreeSet<usize>,
    /// Reverse index for O(1) lookups.
    by_device: HashMap<DeviceId, usize>,
}

/// Bounded slot-assignment table shared by all device workers of one run.
#[derive(Debug)]
pub struct SlotTable {
    gate: u64,
    capacity: usize,
    inner: Mutex<Slots>,
    bus: Bus,
}

impl SlotTable {
    /// Creates a table sized to `gate` that only accepts that gate's permits.
    pub fn for_gate(gate: &AdmissionGate, bus: Bus) -> Self {
        let capacity = gate.capacity();
        Self {
            gate: gate.id(),
            capacity,
            inner: Mutex::new(Slots {
                entries: vec![None; capacity],
                free: (0..capacity).collect(),
                by_device: HashMap::with_capacity(capacity),
            }),
            bus,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        // Every mutation below completes before the guard drops; a poisoned table is still consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of occupied slots.
    pub fn occupied(&self) -> usize {
        self.lock().by_device.len()
    }

    /// Places `device` in the lowest free slot and returns a [`Lease`] on it.
    ///
    /// On error the permit is dropped, i.e. returned to the gate.
    pub fn assign(self: &Arc<Self>, permit: Permit, device: &Device) -> Result<Lease, SlotError> {
        if permit.gate_id() != self.gate {
            return Err(SlotError::ForeignPermit);
        }

        let mut slots = self.lock();
        if let Some(&index) = slots.by_device.get(&device.id()) {
            return Err(SlotError::AlreadyAssigned {
                device: device.id(),
                order: index + 1,
            });
        }
        let index = slots.free.pop_first().ok_or(SlotError::Exhausted {
            capacity: self.capacity,
        })?;
        slots.entries[index] = Some(device.id());
        slots.by_device.insert(device.id(), index);

        let order = index + 1;
        self.bus.publish(
            Event::new(EventKind::SlotOccupied)
                .with_device(device)
                .with_order(order),
        );
        drop(slots);

        Ok(Lease {
            table: Arc::clone(self),
            device: device.id(),
            order,
            permit: Some(permit),
            freed: false,
        })
    }

    /// Clears the slot held by `device`.
    ///
    /// `NotFound` means the lifecycle was violated.
    pub fn free(&self, device: DeviceId) -> Result<usize, SlotError> {
        let mut slots = self.lock();
        let index = slots
            .by_device
            .remove(&device)
            .ok_or(SlotError::NotFound { device })?;
        slots.entries[index] = None;
        slots.free.insert(index);

        let order = index + 1;
        self.bus.publish(
            Event::new(EventKind::SlotFreed)
                .with_device_id(device)
                .with_order(order),
        );
        Ok(order)
    }

    /// Current connection order (1-based slot index) of `device`.
    pub fn order_of(&self, device: DeviceId) -> Result<usize, SlotError> {
        self.lock()
            .by_device
            .get(&device)
            .map(|index| index + 1)
            .ok_or(SlotError::NotFound { device })
    }

    /// Copy of the slot contents in index order.
    pub fn snapshot(&self) -> Vec<Option<DeviceId>> {
        self.lock().entries.clone()
    }
}

/// Scoped ownership of one slot and the permit that admitted it.
///
/// [`Lease::release`] frees the slot and then returns the permit. If the lease is dropped
/// instead (early return, panic, cancellation) the same cleanup runs in the same order.
#[derive(Debug)]
pub struct Lease {
    table: Arc<SlotTable>,
    device: DeviceId,
    order: usize,
    permit: Option<Permit>,
    freed: bool,
}

impl Lease {
    /// Connection order assigned at `assign` time.
    #[inline]
    pub fn order(&self) -> usize {
        self.order
    }

    #[inline]
    pub fn device(&self) -> DeviceId {
        self.device
    }

    /// Frees the slot, then returns the permit to the gate.
    ///
    /// The permit is returned even when freeing fails.
    pub fn release(mut self) -> Result<(), SlotError> {
        self.freed = true;
        self.table.free(self.device).map(|_| ())
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if !self.freed {
            if let Err(e) = self.table.free(self.device) {
                eprintln!("[slots] lease cleanup failed: {e}");
            }
        }
        drop(self.permit.take());
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use super::*;
    use crate::devices::Category;

    fn router(capacity: usize) -> (Arc<AdmissionGate>, Arc<SlotTable>) {
        let bus = Bus::new(64);
        let gate = Arc::new(AdmissionGate::new(
            NonZeroUsize::new(capacity).unwrap(),
            bus.clone(),
        ));
        let table = Arc::new(SlotTable::for_gate(&gate, bus));
        (gate, table)
    }

    fn device(id: u32) -> Device {
        Device::new(DeviceId(id), format!("d{id}"), Category::PC)
    }

    fn connect(gate: &AdmissionGate, table: &Arc<SlotTable>, d: &Device) -> Lease {
        let permit = gate.try_acquire(d).expect("permit available");
        table.assign(permit, d).expect("slot available")
    }

    #[test]
    fn test_lowest_free_index_is_reused() {
        let (gate, table) = router(3);
        let (a, b, c, d) = (device(1), device(2), device(3), device(4));

        let la = connect(&gate, &table, &a);
        let lb = connect(&gate, &table, &b);
        let lc = connect(&gate, &table, &c);
        assert_eq!((la.order(), lb.order(), lc.order()), (1, 2, 3));

        lb.release().unwrap();
        assert_eq!(table.occupied(), 2);

        let ld = connect(&gate, &table, &d);
        assert_eq!(ld.order(), 2);
        assert_eq!(
            table.snapshot(),
            vec![Some(a.id()), Some(d.id()), Some(c.id())]
        );
    }

    #[test]
    fn test_order_is_stable_while_connected() {
        let (gate, table) = router(2);
        let (a, b) = (device(1), device(2));
        let la = connect(&gate, &table, &a);
        let lb = connect(&gate, &table, &b);

        la.release().unwrap();
        assert_eq!(table.order_of(b.id()), Ok(2));
        assert_eq!(lb.order(), 2);
        assert_eq!(table.order_of(a.id()), Err(SlotError::NotFound { device: a.id() }));
    }

    #[test]
    fn test_release_returns_permit_after_slot() {
        let (gate, table) = router(1);
        let a = device(1);
        let lease = connect(&gate, &table, &a);
        assert!(gate.try_acquire(&device(2)).is_none());

        lease.release().unwrap();
        assert_eq!(table.occupied(), 0);
        assert_eq!(gate.snapshot().held, 0);
    }

    #[test]
    fn test_dropped_lease_cleans_up() {
        let (gate, table) = router(1);
        let a = device(1);
        {
            let _lease = connect(&gate, &table, &a);
            assert_eq!(table.occupied(), 1);
        }
        assert_eq!(table.occupied(), 0);
        assert_eq!(gate.snapshot().available(), 1);
    }

    #[test]
    fn test_foreign_permit_rejected() {
        let (_gate, table) = router(1);
        let (other_gate, _) = router(1);
        let a = device(1);

        let permit = other_gate.try_acquire(&a).unwrap();
        assert_eq!(table.assign(permit, &a).unwrap_err(), SlotError::ForeignPermit);
        assert_eq!(other_gate.snapshot().held, 0, "rejected permit is returned");
        assert_eq!(table.occupied(), 0);
    }

    #[test]
    fn test_device_cannot_hold_two_slots() {
        let (gate, table) = router(2);
        let a = device(1);
        let _lease = connect(&gate, &table, &a);

        let second = gate.try_acquire(&a).unwrap();
        assert_eq!(
            table.assign(second, &a).unwrap_err(),
            SlotError::AlreadyAssigned {
                device: a.id(),
                order: 1
            }
        );
        assert_eq!(gate.snapshot().held, 1);
    }

    #[test]
    fn test_free_unknown_device_is_reported() {
        let (_gate, table) = router(1);
        assert_eq!(
            table.free(DeviceId(9)),
            Err(SlotError::NotFound { device: DeviceId(9) })
        );
    }

    #[test]
    fn test_slot_events_mirror_occupancy() {
        let (gate, table) = router(2);
        let mut rx = table.bus.subscribe();
        let a = device(1);
        connect(&gate, &table, &a).release().unwrap();

        let kinds: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| (e.kind, e.order))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (EventKind::DeviceArrived, None),
                (EventKind::SlotOccupied, Some(1)),
                (EventKind::SlotFreed, Some(1)),
            ]
        );
    }
}
