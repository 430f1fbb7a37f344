//! Event sink trait and implementations.

use super::{EventKind, PipelineEvent};
use parking_lot::RwLock;
use std::fmt::Debug;
use tracing::{debug, info, Level};

/// Receives pipeline events.
///
/// Recording must never fail or block: bolts call it from inside the
/// stream while items are being pulled.
pub trait EventSink: Send + Sync + Debug {
    /// Records one event.
    fn record(&self, event: PipelineEvent);
}

/// Discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn record(&self, _event: PipelineEvent) {}
}

/// Writes events to the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a logging sink with the given level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl EventSink for LoggingEventSink {
    fn record(&self, event: PipelineEvent) {
        let name = event.kind.as_str();
        let bolt = event.bolt.as_deref().unwrap_or("-");
        if self.level == Level::DEBUG {
            debug!(event_type = name, bolt, event_data = %event.data, "Event: {}", name);
        } else {
            info!(event_type = name, bolt, event_data = %event.data, "Event: {}", name);
        }
    }
}

/// Keeps every event in memory, for tests and run reports.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<PipelineEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.read().clone()
    }

    /// Returns the events of one kind.
    #[must_use]
    pub fn events_of(&self, kind: EventKind) -> Vec<PipelineEvent> {
        self.events
            .read()
            .iter()
            .filter(|event| event.kind == kind)
            .cloned()
            .collect()
    }

    /// Counts the events of one kind.
    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        self.events.read().iter().filter(|event| event.kind == kind).count()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl EventSink for CollectingEventSink {
    fn record(&self, event: PipelineEvent) {
        self.events.write().push(event);
    }
}
