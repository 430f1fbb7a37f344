//! A bolt running caller-supplied logic on every item.

use super::{report_completion, Bolt, UnitStream};
use crate::context::ExecutionContext;
use crate::core::{History, Item, PipelineUnit, Produced};
use crate::errors::{PipelineError, PipelineResult};
use crate::failure::{abort_pipeline, FailureMode, FailureRecord};
use crate::observability::SpanTimer;
use async_stream::stream;
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

type ValueFn = dyn Fn(&Item) -> anyhow::Result<Produced> + Send + Sync;
type ValueHistoryFn = dyn Fn(&Item, &History) -> anyhow::Result<Produced> + Send + Sync;
type ValueHistoryContextFn =
    dyn Fn(&Item, &History, &ExecutionContext) -> anyhow::Result<Produced> + Send + Sync;

/// A transform function, tagged with what it gets to see.
#[derive(Clone)]
pub enum TransformFn {
    /// Sees the current item only.
    Value(Arc<ValueFn>),
    /// Sees the current item and its history.
    ValueHistory(Arc<ValueHistoryFn>),
    /// Sees the current item, its history and the execution context.
    ValueHistoryContext(Arc<ValueHistoryContextFn>),
}

impl TransformFn {
    fn call(&self, unit: &PipelineUnit, ctx: &ExecutionContext) -> anyhow::Result<Produced> {
        match self {
            Self::Value(f) => f(&unit.item),
            Self::ValueHistory(f) => f(&unit.item, &unit.history),
            Self::ValueHistoryContext(f) => f(&unit.item, &unit.history, ctx),
        }
    }

    fn convention(&self) -> &'static str {
        match self {
            Self::Value(_) => "value",
            Self::ValueHistory(_) => "value+history",
            Self::ValueHistoryContext(_) => "value+history+context",
        }
    }
}

impl fmt::Debug for TransformFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransformFn({})", self.convention())
    }
}

/// Applies a caller-supplied function to each unit.
///
/// The function returns nothing, one value, or a lazy sequence of values;
/// null values are filtered out and every other value becomes a child unit.
///
/// Transform logic is caller business logic, so a failure is never
/// swallowed: it is logged with the offending item and ends the pipeline.
#[derive(Debug, Clone)]
pub struct TransformBolt {
    name: String,
    func: TransformFn,
}

impl TransformBolt {
    /// Creates a transform bolt from a tagged function.
    #[must_use]
    pub fn new(func: TransformFn) -> Self {
        Self {
            name: "transform".to_string(),
            func,
        }
    }

    /// A transform over the current item.
    #[must_use]
    pub fn value<F>(f: F) -> Self
    where
        F: Fn(&Item) -> anyhow::Result<Produced> + Send + Sync + 'static,
    {
        Self::new(TransformFn::Value(Arc::new(f)))
    }

    /// A transform over the current item and its history.
    #[must_use]
    pub fn with_history<F>(f: F) -> Self
    where
        F: Fn(&Item, &History) -> anyhow::Result<Produced> + Send + Sync + 'static,
    {
        Self::new(TransformFn::ValueHistory(Arc::new(f)))
    }

    /// A transform over the current item, its history and the context.
    #[must_use]
    pub fn with_context<F>(f: F) -> Self
    where
        F: Fn(&Item, &History, &ExecutionContext) -> anyhow::Result<Produced> + Send + Sync + 'static,
    {
        Self::new(TransformFn::ValueHistoryContext(Arc::new(f)))
    }

    /// Sets the bolt name used in logs and errors.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Bolt for TransformBolt {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, input: UnitStream, ctx: ExecutionContext) -> UnitStream {
        transform_each(self.name.clone(), self.func.clone(), input, ctx).boxed()
    }
}

fn transform_each(
    name: String,
    func: TransformFn,
    mut input: UnitStream,
    ctx: ExecutionContext,
) -> impl Stream<Item = PipelineResult<PipelineUnit>> + Send + 'static {
    stream! {
        let timer = SpanTimer::start(name.as_str());
        let mut produced = 0usize;

        while let Some(next) = input.next().await {
            let unit = match next {
                Ok(unit) => unit,
                Err(err) => {
                    yield Err(err);
                    return;
                }
            };

            let output = match func.call(&unit, &ctx) {
                Ok(output) => output,
                Err(source) => {
                    let record = FailureRecord::new(
                        name.as_str(),
                        FailureMode::AbortPipeline,
                        "TransformFailure",
                        format!("{source:#}"),
                        unit.item.clone(),
                    );
                    let err = PipelineError::Transform {
                        bolt: name.clone(),
                        item: unit.item.clone(),
                        source,
                    };
                    yield Err(abort_pipeline(&ctx, &record, err));
                    return;
                }
            };

            for value in output.into_sequence() {
                if value.is_null() {
                    continue;
                }
                produced += 1;
                yield Ok(unit.derive(value));
            }
        }

        report_completion(&ctx, &timer, produced);
    }
}
