//! # Simulation: runs a batch of devices against one router.
//!
//! The [`Simulation`] owns the event bus, the subscriber list and the run configuration.
//! [`Simulation::run`] builds a fresh [`AdmissionGate`] and [`SlotTable`], spawns one
//! [`DeviceWorker`] per device and waits for all of them (or for a shutdown request).
//!
//! ## High-level architecture
//! ```text
//! Inputs to run():
//!   Vec<DeviceSpec>  ──►  Simulation::run()
//!
//! Preparation:
//!   - Journal::clear()                          (sink truncated before any line)
//!   - spawn Journal::drain(feed)                (lossless journal feed of the bus)
//!   - AdmissionGate::new(capacity) + SlotTable::for_gate()
//!   - listener(): Bus.subscribe() ─► SubscriberSet::emit(Event)   (only with subscribers)
//!
//! Spawn workers:
//!   DeviceSpec[0] → Device #1 ─► DeviceWorker ─► set.spawn(catch_unwind(worker.run(child_token)))
//!   DeviceSpec[1] → Device #2 ─► ...
//!
//! Completion:
//!   all workers joined ─────────────────────────────────────────────┐
//!   shutdown signal / cancel ─► ShutdownRequested                    │
//!        └─► token.cancel() + gate.close()                           │
//!        └─► wait up to cfg.grace ─► AllStoppedWithin | GraceExceeded│
//!                                                                    ▼
//!   Bus.publish(RunFinished) ─► journal drain stops after the last line is written
//!                            ─► listener forwards it and returns the set
//!        └─► SubscriberSet::shutdown()   (every queued event is handled)
//! ```
//!
//! ## Rules
//! - Device ids are assigned in input order, starting at `#1`.
//! - A worker panic is contained: the lease guard returns its slot, the run goes on and
//!   the report records [`WorkerExit::Panicked`].
//! - A slot bookkeeping fault cancels every waiting device and makes the run fail with
//!   [`RuntimeError::InvariantViolated`].
//! - Every journal line is in the sink when `run` returns, whatever the number of devices.
//!   Subscribers are best effort: a lagging listener skips events for them, never for the journal.
//! - `run` returns only after every subscriber has drained its queue.

use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::{
    sync::{broadcast::error::RecvError, mpsc},
    task::{JoinHandle, JoinSet},
};
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        builder::SimulationBuilder,
        config::Config,
        gate::{AdmissionGate, GateSnapshot},
        shutdown,
        slots::SlotTable,
        worker::{DeviceWorker, WorkerExit, WorkerParams, WorkerReport},
    },
    devices::{Device, DeviceId, DeviceSpec},
    error::{RuntimeError, SlotError},
    events::{Bus, Event, EventKind},
    policies::DurationSource,
    subscribers::{Journal, Subscribe, SubscriberSet, panic_message},
};

type WorkerOutcome = (Arc<Device>, std::thread::Result<Result<WorkerReport, SlotError>>);

/// Per-device outcomes of a finished run, in input order.
#[derive(Clone, Debug, Default)]
pub struct RunReport {
    /// One report per device that finished.
    pub workers: Vec<WorkerReport>,
    /// Gate counters once every worker has been joined.
    pub gate: GateSnapshot,
}

impl RunReport {
    /// Number of workers that ended with `exit`.
    pub fn count(&self, exit: WorkerExit) -> usize {
        self.workers.iter().filter(|w| w.exit == exit).count()
    }

    /// Number of devices that went through the full lifecycle.
    pub fn completed(&self) -> usize {
        self.count(WorkerExit::Disconnected)
    }

    /// Report for the device with the given name (first match).
    pub fn find(&self, name: &str) -> Option<&WorkerReport> {
        self.workers.iter().find(|w| w.device.name() == name)
    }
}

/// Collected worker results, indexed by device id.
struct Tally {
    devices: Vec<Arc<Device>>,
    reports: Vec<Option<WorkerReport>>,
    fault: Option<RuntimeError>,
}

impl Tally {
    fn new(devices: Vec<Arc<Device>>) -> Self {
        let reports = vec![None; devices.len()];
        Self {
            devices,
            reports,
            fault: None,
        }
    }

    fn slot_of(id: DeviceId) -> usize {
        id.0 as usize - 1
    }

    fn store(&mut self, report: WorkerReport) {
        let idx = Self::slot_of(report.device.id());
        if let Some(entry) = self.reports.get_mut(idx) {
            *entry = Some(report);
        }
    }

    /// Names of devices whose worker has not reported yet.
    fn pending(&self) -> Vec<String> {
        self.devices
            .iter()
            .zip(&self.reports)
            .filter(|(_, r)| r.is_none())
            .map(|(d, _)| d.name().to_string())
            .collect()
    }

    fn into_report(self, gate: GateSnapshot) -> Result<RunReport, RuntimeError> {
        if let Some(fault) = self.fault {
            return Err(fault);
        }
        Ok(RunReport {
            workers: self.reports.into_iter().flatten().collect(),
            gate,
        })
    }
}

/// The journal and the receiving end of the bus journal feed.
pub(crate) struct JournalFeed {
    pub(crate) journal: Arc<Journal>,
    pub(crate) feed: mpsc::UnboundedReceiver<Event>,
}

/// Runs devices through a bounded router and delivers their events to subscribers.
pub struct Simulation {
    cfg: Config,
    capacity: NonZeroUsize,
    bus: Bus,
    subscribers: Vec<Arc<dyn Subscribe>>,
    journal: Option<JournalFeed>,
    activity: Arc<dyn DurationSource>,
    shutdown: CancellationToken,
}

impl Simulation {
    /// Returns a builder for the given configuration.
    pub fn builder(cfg: Config) -> SimulationBuilder {
        SimulationBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        capacity: NonZeroUsize,
        bus: Bus,
        subscribers: Vec<Arc<dyn Subscribe>>,
        journal: Option<JournalFeed>,
        activity: Arc<dyn DurationSource>,
    ) -> Self {
        Self {
            cfg,
            capacity,
            bus,
            subscribers,
            journal,
            activity,
            shutdown: CancellationToken::new(),
        }
    }

    /// Router capacity.
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// The event bus used by this simulation.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Token that stops the run the same way a termination signal does.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs every device once and waits until all of them have finished.
    ///
    /// ### Errors
    /// - [`RuntimeError::GraceExceeded`]: a shutdown was requested and some devices were
    ///   still connected after `cfg.grace`
    /// - [`RuntimeError::InvariantViolated`]: a worker hit a slot bookkeeping fault
    pub async fn run(mut self, devices: Vec<DeviceSpec>) -> Result<RunReport, RuntimeError> {
        let writer = match self.journal.take() {
            Some(JournalFeed { journal, feed }) => {
                journal.clear().await;
                Some(tokio::spawn(journal.drain(feed)))
            }
            None => None,
        };
        let subs = SubscriberSet::new(self.subscribers.clone(), self.bus.clone());
        let listener = (!subs.is_empty()).then(|| self.subscriber_listener(subs));

        let gate = Arc::new(AdmissionGate::new(self.capacity, self.bus.clone()));
        let slots = Arc::new(SlotTable::for_gate(&gate, self.bus.clone()));
        let devices: Vec<Arc<Device>> = devices
            .into_iter()
            .enumerate()
            .map(|(i, spec)| Arc::new(Device::from_spec(DeviceId(i as u32 + 1), spec)))
            .collect();

        let workers_token = self.shutdown.child_token();
        let mut set = JoinSet::new();
        self.spawn_workers(&mut set, &gate, &slots, &devices, &workers_token);

        let mut tally = Tally::new(devices);
        let driven = self
            .drive(&mut set, &gate, &workers_token, &mut tally)
            .await;
        set.abort_all();
        let snapshot = gate.snapshot();

        self.bus.publish(Event::new(EventKind::RunFinished));
        if let Some(writer) = writer {
            if let Err(e) = writer.await {
                eprintln!("[simulation] journal writer failed: {e}");
            }
        }
        if let Some(listener) = listener {
            match listener.await {
                Ok(subs) => subs.shutdown().await,
                Err(e) => eprintln!("[simulation] event listener failed: {e}"),
            }
        }

        driven?;
        tally.into_report(snapshot)
    }

    /// Subscribes to the bus and forwards events until `RunFinished` has been forwarded.
    fn subscriber_listener(&self, subs: SubscriberSet) -> JoinHandle<SubscriberSet> {
        let mut rx = self.bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => {
                        let last = ev.kind == EventKind::RunFinished;
                        subs.emit(ev);
                        if last {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        eprintln!("[simulation] listener lagged, {skipped} events lost");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            subs
        })
    }

    fn spawn_workers(
        &self,
        set: &mut JoinSet<WorkerOutcome>,
        gate: &Arc<AdmissionGate>,
        slots: &Arc<SlotTable>,
        devices: &[Arc<Device>],
        token: &CancellationToken,
    ) {
        let params = WorkerParams {
            activity: Arc::clone(&self.activity),
            admission_timeout: self.cfg.admission_timeout(),
        };
        for device in devices {
            let worker = DeviceWorker::new(
                Arc::clone(device),
                Arc::clone(gate),
                Arc::clone(slots),
                params.clone(),
                self.bus.clone(),
            );
            let device = Arc::clone(device);
            let child = token.child_token();
            set.spawn(async move {
                let outcome = AssertUnwindSafe(worker.run(child)).catch_unwind().await;
                (device, outcome)
            });
        }
    }

    /// Waits until either all workers finish or a shutdown is requested.
    async fn drive(
        &self,
        set: &mut JoinSet<WorkerOutcome>,
        gate: &AdmissionGate,
        workers_token: &CancellationToken,
        tally: &mut Tally,
    ) -> Result<(), RuntimeError> {
        let signal = async {
            match shutdown::wait_for_shutdown_signal().await {
                Ok(name) => name,
                Err(e) => {
                    eprintln!("[simulation] signal handlers unavailable: {e}");
                    std::future::pending().await
                }
            }
        };
        tokio::select! {
            name = signal => {
                self.shutdown.cancel();
                self.stop(set, gate, workers_token, tally, name).await
            }
            _ = self.shutdown.cancelled() => {
                self.stop(set, gate, workers_token, tally, "cancelled").await
            }
            _ = self.collect(set, workers_token, tally) => Ok(()),
        }
    }

    /// Cancels waiting devices, closes the gate and waits up to `cfg.grace`.
    async fn stop(
        &self,
        set: &mut JoinSet<WorkerOutcome>,
        gate: &AdmissionGate,
        workers_token: &CancellationToken,
        tally: &mut Tally,
        reason: &str,
    ) -> Result<(), RuntimeError> {
        self.bus
            .publish(Event::new(EventKind::ShutdownRequested).with_reason(reason));
        workers_token.cancel();
        gate.close();

        let grace = self.cfg.grace;
        let done = self.collect(set, workers_token, tally);
        match tokio::time::timeout(grace, done).await {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_) => {
                let stuck = tally.pending();
                self.bus.publish(
                    Event::new(EventKind::GraceExceeded).with_reason(stuck.join(",")),
                );
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }

    /// Joins workers until the set is empty.
    async fn collect(
        &self,
        set: &mut JoinSet<WorkerOutcome>,
        workers_token: &CancellationToken,
        tally: &mut Tally,
    ) {
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(outcome) => self.record(outcome, workers_token, tally),
                Err(e) => eprintln!("[simulation] worker task failed: {e}"),
            }
        }
    }

    fn record(&self, outcome: WorkerOutcome, workers_token: &CancellationToken, tally: &mut Tally) {
        let (device, result) = outcome;
        match result {
            Ok(Ok(report)) => tally.store(report),
            Ok(Err(fault)) => {
                self.bus.publish(
                    Event::new(EventKind::WorkerFailed)
                        .with_device(&device)
                        .with_reason(fault.to_string()),
                );
                workers_token.cancel();
                if tally.fault.is_none() {
                    tally.fault = Some(RuntimeError::InvariantViolated {
                        device: device.name().to_string(),
                        source: fault,
                    });
                }
            }
            Err(panic) => {
                let info = panic_message(panic.as_ref());
                self.bus.publish(
                    Event::new(EventKind::WorkerFailed)
                        .with_device(&device)
                        .with_reason(format!("panic: {info}")),
                );
                tally.store(WorkerReport {
                    device,
                    exit: WorkerExit::Panicked,
                    path: Vec::new(),
                    order: None,
                });
            }
        }
    }
}
