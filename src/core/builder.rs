use std::sync::Arc;

use crate::{
    core::{
        config::Config,
        simulation::{JournalFeed, Simulation},
    },
    error::RuntimeError,
    events::Bus,
    policies::DurationSource,
    sinks::LogSink,
    subscribers::{Journal, Subscribe},
};

/// Builder for a [`Simulation`].
///
/// ```rust
/// use std::sync::Arc;
/// use routergate::{Config, MemorySink, Simulation};
///
/// let sim = Simulation::builder(Config::with_capacity(2))
///     .with_sink(Arc::new(MemorySink::new()))
///     .build()
///     .expect("capacity is positive");
/// assert_eq!(sim.capacity(), 2);
/// ```
pub struct SimulationBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    sink: Option<Arc<dyn LogSink>>,
    activity: Option<Arc<dyn DurationSource>>,
}

impl SimulationBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            sink: None,
            activity: None,
        }
    }

    /// Sets additional event subscribers (replaces any previously set).
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one event subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Sets the journal sink. Without one, no log lines are written.
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Overrides `Config::activity` with a custom duration source.
    pub fn with_activity_source(mut self, source: Arc<dyn DurationSource>) -> Self {
        self.activity = Some(source);
        self
    }

    /// Validates the configuration and assembles the simulation.
    ///
    /// Fails with [`RuntimeError::InvalidCapacity`] when `capacity` is zero.
    /// With a sink, the bus is built with a journal feed so no line is ever dropped.
    pub fn build(self) -> Result<Simulation, RuntimeError> {
        let capacity = self
            .cfg
            .capacity_checked()
            .ok_or(RuntimeError::InvalidCapacity)?;
        let (bus, journal) = match self.sink {
            Some(sink) => {
                let (bus, feed) = Bus::with_journal_feed(self.cfg.bus_capacity_clamped());
                let journal = Arc::new(Journal::new(sink, bus.clone()));
                (bus, Some(JournalFeed { journal, feed }))
            }
            None => (Bus::new(self.cfg.bus_capacity_clamped()), None),
        };

        let activity: Arc<dyn DurationSource> = match self.activity {
            Some(source) => source,
            None => Arc::new(self.cfg.activity),
        };

        Ok(Simulation::new_internal(
            self.cfg,
            capacity,
            bus,
            self.subscribers,
            journal,
            activity,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_is_rejected() {
        let err = SimulationBuilder::new(Config::with_capacity(0))
            .build()
            .err()
            .map(|e| e.as_label());
        assert_eq!(err, Some("runtime_invalid_capacity"));
    }
}
