//! Event sinks for pipeline observability.
//!
//! Bolts report completions, dropped items and aborts to the sink carried
//! by their [`ExecutionContext`](crate::context::ExecutionContext). There is
//! no process-wide sink; a context without one uses [`NoOpEventSink`].

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use serde::{Deserialize, Serialize};

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A pipeline run started pulling items.
    RunStarted,
    /// A pipeline run materialized all of its items.
    RunCompleted,
    /// A pipeline run ended with a fatal error.
    RunFailed,
    /// A bolt exhausted its input.
    BoltCompleted,
    /// A bolt dropped one input item after an isolated failure.
    ItemDropped,
    /// A bolt raised a pipeline-fatal failure.
    PipelineAborted,
    /// A delegated session was opened for a sub-chain.
    SessionDelegated,
}

impl EventKind {
    /// Dotted event name used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RunStarted => "run.started",
            Self::RunCompleted => "run.completed",
            Self::RunFailed => "run.failed",
            Self::BoltCompleted => "bolt.completed",
            Self::ItemDropped => "bolt.item_dropped",
            Self::PipelineAborted => "bolt.aborted",
            Self::SessionDelegated => "session.delegated",
        }
    }
}

/// A single observability event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// Event kind.
    pub kind: EventKind,
    /// Name of the emitting bolt, if any.
    pub bolt: Option<String>,
    /// Structured payload.
    pub data: serde_json::Value,
}

impl PipelineEvent {
    /// Creates a run-level event.
    #[must_use]
    pub fn run(kind: EventKind, data: serde_json::Value) -> Self {
        Self {
            kind,
            bolt: None,
            data,
        }
    }

    /// Creates a bolt-level event.
    #[must_use]
    pub fn bolt(kind: EventKind, bolt: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            kind,
            bolt: Some(bolt.into()),
            data,
        }
    }
}
