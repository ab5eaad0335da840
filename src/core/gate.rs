//! # AdmissionGate: counting semaphore bounding router occupancy.
//!
//! The gate hands out at most `capacity` [`Permit`]s at a time. It is built on a
//! [`tokio::sync::Semaphore`] (tokens are permits) plus a small counter block that
//! mirrors the classic signed `available` value:
//!
//! ```text
//! available = capacity - held - waiting
//!
//!   available >= 0  → `capacity - available` devices are admitted
//!   available <  0  → `|available|` devices are suspended in acquire()
//! ```
//!
//! ## Acquire
//! ```text
//! acquire(device)
//!   ├─ lock counters
//!   │    ├─ token free → held += 1, publish DeviceArrived   → Ok(Permit::Immediate)
//!   │    └─ no token   → waiting += 1, publish DeviceWaiting
//!   └─ suspend on semaphore | cancellation | optional timeout
//!        ├─ granted   → waiting -= 1, held += 1             → Ok(Permit::AfterWait)
//!        └─ otherwise → waiting -= 1 (undo)                 → Err(AdmissionError)
//! ```
//!
//! ## Rules
//! - The arrival event is published under the counter lock, **before** suspending.
//! - A cancelled, timed-out or dropped wait never consumes a permit.
//! - Dropping a [`Permit`] releases it; release never blocks.
//! - Wake-up order is whatever the semaphore provides (FIFO in practice); callers
//!   must treat it as best-effort fairness, not a guarantee.

use std::future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::devices::Device;
use crate::error::AdmissionError;
use crate::events::{Bus, Event, EventKind};

/// Source of unique gate identities (binds permits to their gate).
static GATE_IDS: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Default)]
struct Counters {
    held: usize,
    waiting: usize,
}

fn lock(counters: &Mutex<Counters>) -> MutexGuard<'_, Counters> {
    // Counters are updated in single statements; a poisoned lock still holds consistent values.
    counters.lock().unwrap_or_else(PoisonError::into_inner)
}

/// How a permit was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// A token was free on arrival.
    Immediate,
    /// The caller suspended until another device released.
    AfterWait,
}

/// Point-in-time view of the gate counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GateSnapshot {
    /// Configured capacity.
    pub capacity: usize,
    /// Permits currently held.
    pub held: usize,
    /// Callers currently suspended in `acquire`.
    pub waiting: usize,
}

impl GateSnapshot {
    /// The signed `available` counter: negative values count waiters.
    pub fn available(&self) -> isize {
        self.capacity as isize - self.held as isize - self.waiting as isize
    }
}

/// Counting admission gate shared by all device workers of one run.
#[derive(Debug)]
pub struct AdmissionGate {
    id: u64,
    capacity: usize,
    semaphore: Arc<Semaphore>,
    counters: Arc<Mutex<Counters>>,
    bus: Bus,
}

impl AdmissionGate {
    /// Creates a gate with `capacity` permits.
    pub fn new(capacity: NonZeroUsize, bus: Bus) -> Self {
        Self {
            id: GATE_IDS.fetch_add(1, Ordering::Relaxed),
            capacity: capacity.get(),
            semaphore: Arc::new(Semaphore::new(capacity.get())),
            counters: Arc::new(Mutex::new(Counters::default())),
            bus,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Identity that permits carry back to the slot table.
    #[inline]
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Takes a permit only if one is free right now.
    ///
    /// Publishes `DeviceArrived` on success; publishes nothing otherwise.
    pub fn try_acquire(&self, device: &Device) -> Option<Permit> {
        let mut counters = lock(&self.counters);
        let token = self.semaphore.clone().try_acquire_owned().ok()?;
        counters.held += 1;
        self.bus
            .publish(Event::new(EventKind::DeviceArrived).with_device(device));
        drop(counters);
        Some(self.permit(token, Admission::Immediate))
    }

    /// Requests a permit for `device`, suspending while the gate is saturated.
    ///
    /// ### Exit conditions
    /// - `Ok(permit)`: admitted (immediately or after waiting)
    /// - `Err(Cancelled)`: `token` was cancelled while waiting
    /// - `Err(TimedOut)`: `timeout` elapsed while waiting
    /// - `Err(Closed { waited })`: the gate was closed, before or during the wait
    ///
    /// Every error path restores the counters as if the call never happened.
    /// Dropping the returned future mid-wait does the same.
    pub async fn acquire(
        &self,
        device: &Device,
        token: &CancellationToken,
        timeout: Option<Duration>,
    ) -> Result<Permit, AdmissionError> {
        let waiter = {
            let mut counters = lock(&self.counters);
            match self.semaphore.clone().try_acquire_owned() {
                Ok(permit) => {
                    counters.held += 1;
                    self.bus
                        .publish(Event::new(EventKind::DeviceArrived).with_device(device));
                    return Ok(self.permit(permit, Admission::Immediate));
                }
                Err(TryAcquireError::Closed) => {
                    return Err(AdmissionError::Closed { waited: false });
                }
                Err(TryAcquireError::NoPermits) => {
                    counters.waiting += 1;
                    self.bus
                        .publish(Event::new(EventKind::DeviceWaiting).with_device(device));
                    WaitGuard {
                        counters: Arc::clone(&self.counters),
                        armed: true,
                    }
                }
            }
        };

        let deadline = async {
            match timeout {
                Some(d) => time::sleep(d).await,
                None => future::pending::<()>().await,
            }
        };

        let granted = select! {
            res = self.semaphore.clone().acquire_owned() => {
                res.map_err(|_closed| AdmissionError::Closed { waited: true })
            }
            _ = token.cancelled() => Err(AdmissionError::Cancelled),
            _ = deadline => Err(AdmissionError::TimedOut { timeout: timeout.unwrap_or_default() }),
        }?;

        waiter.admit();
        Ok(self.permit(granted, Admission::AfterWait))
    }

    /// Returns a permit to the gate. Equivalent to dropping it.
    pub fn release(&self, permit: Permit) {
        debug_assert_eq!(permit.gate, self.id, "permit released to a foreign gate");
        drop(permit);
    }

    /// Closes the gate: current waiters and later callers get [`AdmissionError::Closed`].
    ///
    /// Outstanding permits stay valid and are still returned on drop.
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    /// Returns a consistent snapshot of the counters.
    pub fn snapshot(&self) -> GateSnapshot {
        let counters = lock(&self.counters);
        GateSnapshot {
            capacity: self.capacity,
            held: counters.held,
            waiting: counters.waiting,
        }
    }

    fn permit(&self, token: OwnedSemaphorePermit, admission: Admission) -> Permit {
        Permit {
            gate: self.id,
            admission,
            counters: Arc::clone(&self.counters),
            token: Some(token),
        }
    }
}

/// Undoes the `waiting += 1` of a suspended acquire unless it was admitted.
struct WaitGuard {
    counters: Arc<Mutex<Counters>>,
    armed: bool,
}

impl WaitGuard {
    fn admit(mut self) {
        let mut counters = lock(&self.counters);
        counters.waiting = counters.waiting.saturating_sub(1);
        counters.held += 1;
        self.armed = false;
    }
}

impl Drop for WaitGuard {
    fn drop(&mut self) {
        if self.armed {
            let mut counters = lock(&self.counters);
            counters.waiting = counters.waiting.saturating_sub(1);
        }
    }
}

/// One unit of router capacity.
///
/// Not clonable; required by [`SlotTable::assign`](crate::SlotTable::assign).
/// Dropping it returns the capacity to the gate.
#[derive(Debug)]
pub struct Permit {
    gate: u64,
    admission: Admission,
    counters: Arc<Mutex<Counters>>,
    token: Option<OwnedSemaphorePermit>,
}

impl Permit {
    /// How this permit was obtained.
    #[inline]
    pub fn admission(&self) -> Admission {
        self.admission
    }

    /// Identity of the issuing gate.
    #[inline]
    pub(crate) fn gate_id(&self) -> u64 {
        self.gate
    }

    /// Returns the permit to its gate.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            let mut counters = lock(&self.counters);
            counters.held = counters.held.saturating_sub(1);
            // Hand the token back while the counters are locked so arrivals never see a free
            // token that is still counted as held.
            drop(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::{Category, DeviceId};

    fn gate(capacity: usize) -> Arc<AdmissionGate> {
        let capacity = NonZeroUsize::new(capacity).unwrap();
        Arc::new(AdmissionGate::new(capacity, Bus::new(64)))
    }

    fn device(id: u32, name: &str) -> Device {
        Device::new(DeviceId(id), name, Category::Mobile)
    }

    async fn settle(gate: &AdmissionGate, waiting: usize) {
        for _ in 0..100 {
            if gate.snapshot().waiting == waiting {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("gate never reached {waiting} waiters: {:?}", gate.snapshot());
    }

    #[test]
    fn test_try_acquire_bounded_by_capacity() {
        let gate = gate(3);
        let permits: Vec<_> = (0..10)
            .filter_map(|i| gate.try_acquire(&device(i, "d")))
            .collect();
        assert_eq!(permits.len(), 3);
        assert_eq!(gate.snapshot().held, 3);
        assert_eq!(gate.snapshot().available(), 0);

        drop(permits);
        assert_eq!(gate.snapshot().held, 0);
        assert_eq!(gate.snapshot().available(), 3);
    }

    #[tokio::test]
    async fn test_waiter_admitted_after_release() {
        let gate = gate(1);
        let token = CancellationToken::new();
        let first = gate.acquire(&device(1, "A"), &token, None).await.unwrap();
        assert_eq!(first.admission(), Admission::Immediate);

        let g = Arc::clone(&gate);
        let t = token.clone();
        let waiter = tokio::spawn(async move { g.acquire(&device(2, "B"), &t, None).await });
        settle(&gate, 1).await;

        let snap = gate.snapshot();
        assert_eq!(snap.held, 1);
        assert_eq!(snap.available(), -1);

        gate.release(first);
        let second = waiter.await.unwrap().unwrap();
        assert_eq!(second.admission(), Admission::AfterWait);
        assert_eq!(
            gate.snapshot(),
            GateSnapshot {
                capacity: 1,
                held: 1,
                waiting: 0
            }
        );
    }

    #[tokio::test]
    async fn test_arrival_events_distinguish_waiting() {
        let gate = gate(1);
        let mut rx = gate.bus.subscribe();
        let token = CancellationToken::new();

        let _held = gate.acquire(&device(1, "A"), &token, None).await.unwrap();
        let g = Arc::clone(&gate);
        let t = token.clone();
        let waiter = tokio::spawn(async move { g.acquire(&device(2, "B"), &t, None).await });
        settle(&gate, 1).await;

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.kind, EventKind::DeviceArrived);
        assert_eq!(first.device.as_deref(), Some("A"));
        assert_eq!(second.kind, EventKind::DeviceWaiting);
        assert_eq!(second.device.as_deref(), Some("B"));

        token.cancel();
        assert_eq!(waiter.await.unwrap().unwrap_err(), AdmissionError::Cancelled);
    }

    #[tokio::test]
    async fn test_cancelled_wait_restores_counter() {
        let gate = gate(1);
        let token = CancellationToken::new();
        let held = gate.acquire(&device(1, "A"), &token, None).await.unwrap();

        let waiter_token = CancellationToken::new();
        let g = Arc::clone(&gate);
        let t = waiter_token.clone();
        let waiter = tokio::spawn(async move { g.acquire(&device(2, "B"), &t, None).await });
        settle(&gate, 1).await;

        waiter_token.cancel();
        assert_eq!(waiter.await.unwrap().unwrap_err(), AdmissionError::Cancelled);
        assert_eq!(gate.snapshot().available(), 0);

        drop(held);
        let next = gate.try_acquire(&device(3, "C"));
        assert!(next.is_some(), "cancelled waiter must not keep a permit");
    }

    #[tokio::test]
    async fn test_aborted_wait_restores_counter() {
        let gate = gate(1);
        let token = CancellationToken::new();
        let held = gate.acquire(&device(1, "A"), &token, None).await.unwrap();

        let g = Arc::clone(&gate);
        let t = token.clone();
        let waiter = tokio::spawn(async move { g.acquire(&device(2, "B"), &t, None).await });
        settle(&gate, 1).await;

        waiter.abort();
        assert!(waiter.await.unwrap_err().is_cancelled());
        assert_eq!(gate.snapshot().waiting, 0);

        drop(held);
        assert_eq!(gate.snapshot().available(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_returns_not_admitted() {
        let gate = gate(1);
        let token = CancellationToken::new();
        let _held = gate.acquire(&device(1, "A"), &token, None).await.unwrap();

        let res = gate
            .acquire(&device(2, "B"), &token, Some(Duration::from_millis(50)))
            .await;
        assert_eq!(
            res.unwrap_err(),
            AdmissionError::TimedOut {
                timeout: Duration::from_millis(50)
            }
        );
        assert_eq!(gate.snapshot().waiting, 0);
        assert_eq!(gate.snapshot().held, 1);
    }

    #[tokio::test]
    async fn test_close_rejects_waiters_and_arrivals() {
        let gate = gate(1);
        let token = CancellationToken::new();
        let held = gate.acquire(&device(1, "A"), &token, None).await.unwrap();

        let g = Arc::clone(&gate);
        let t = token.clone();
        let waiter = tokio::spawn(async move { g.acquire(&device(2, "B"), &t, None).await });
        settle(&gate, 1).await;

        gate.close();
        assert_eq!(
            waiter.await.unwrap().unwrap_err(),
            AdmissionError::Closed { waited: true }
        );
        assert_eq!(
            gate.acquire(&device(3, "C"), &token, None).await.unwrap_err(),
            AdmissionError::Closed { waited: false }
        );

        drop(held);
        assert_eq!(gate.snapshot().held, 0);
        assert!(gate.is_closed());
    }
}
