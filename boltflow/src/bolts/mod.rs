//! Bolts and chains.
//!
//! A bolt turns a lazy stream of [`PipelineUnit`]s into another one. Nothing
//! runs until the consumer polls: each bolt pulls one unit from upstream,
//! yields what it produced for it, and suspends until the next pull.
//!
//! A fatal error travels as an `Err` item. Every bolt forwards the first
//! `Err` it pulls and then ends, so no later record is processed.

mod batch;
mod call;
mod delegated;
mod operation;
mod paginated;
mod then;
mod transform;

pub use batch::BatchBolt;
pub use call::PostProcess;
pub use delegated::DelegatedSessionBolt;
pub use operation::OperationBolt;
pub use paginated::PaginatedOperationBolt;
pub use then::{ThenBolt, ThenFn};
pub use transform::{TransformBolt, TransformFn};

use crate::context::ExecutionContext;
use crate::core::PipelineUnit;
use crate::errors::PipelineResult;
use crate::events::{EventKind, PipelineEvent};
use crate::observability::SpanTimer;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::fmt::Debug;
use std::sync::Arc;

/// A lazy stream of units; an `Err` item is fatal and ends the stream.
pub type UnitStream = BoxStream<'static, PipelineResult<PipelineUnit>>;

/// A pipeline stage.
pub trait Bolt: Send + Sync + Debug {
    /// Returns the name of the bolt, used in logs and events.
    fn name(&self) -> &str;

    /// Wraps `input` into the stream of units this bolt produces.
    ///
    /// Must not pull from `input` before the returned stream is polled.
    fn apply(&self, input: UnitStream, ctx: ExecutionContext) -> UnitStream;
}

/// Turns already-adapted units into a stream.
#[must_use]
pub fn unit_stream(units: Vec<PipelineUnit>) -> UnitStream {
    futures::stream::iter(units.into_iter().map(Ok)).boxed()
}

/// An ordered list of bolts, fixed before execution.
#[derive(Debug, Clone, Default)]
pub struct Chain {
    bolts: Vec<Arc<dyn Bolt>>,
}

impl Chain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a bolt.
    #[must_use]
    pub fn bolt(mut self, bolt: impl Bolt + 'static) -> Self {
        self.bolts.push(Arc::new(bolt));
        self
    }

    /// Appends an already shared bolt.
    #[must_use]
    pub fn shared(mut self, bolt: Arc<dyn Bolt>) -> Self {
        self.bolts.push(bolt);
        self
    }

    /// Returns the number of bolts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bolts.len()
    }

    /// Returns true if the chain has no bolts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bolts.is_empty()
    }

    /// Returns the bolt names in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.bolts.iter().map(|bolt| bolt.name()).collect()
    }

    /// Folds the chain over `input`: bolt `i`'s output is bolt `i + 1`'s input.
    #[must_use]
    pub fn apply(&self, input: UnitStream, ctx: &ExecutionContext) -> UnitStream {
        tracing::debug!(bolts = ?self.names(), run_id = %ctx.run_id(), "Assembling bolt chain");
        self.bolts
            .iter()
            .fold(input, |stream, bolt| bolt.apply(stream, ctx.clone()))
    }
}

impl FromIterator<Arc<dyn Bolt>> for Chain {
    fn from_iter<T: IntoIterator<Item = Arc<dyn Bolt>>>(iter: T) -> Self {
        Self {
            bolts: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<Arc<dyn Bolt>>> for Chain {
    fn from(bolts: Vec<Arc<dyn Bolt>>) -> Self {
        Self { bolts }
    }
}

/// Logs the one-line summary of a bolt that exhausted its input.
pub(crate) fn report_completion(ctx: &ExecutionContext, timer: &SpanTimer, items: usize) {
    let duration_ms = timer.elapsed_ms();
    tracing::info!(
        bolt = timer.name(),
        items,
        duration_ms,
        run_id = %ctx.run_id(),
        "Successfully '{}' {} item(s).",
        timer.name(),
        items
    );
    ctx.emit(PipelineEvent::bolt(
        EventKind::BoltCompleted,
        timer.name(),
        serde_json::json!({"items": items, "duration_ms": duration_ms}),
    ));
}
