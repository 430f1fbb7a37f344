//! A bolt grouping items into fixed-size batches.

use super::{report_completion, Bolt, UnitStream};
use crate::context::ExecutionContext;
use crate::core::{Item, PipelineUnit};
use crate::errors::{PipelineError, PipelineResult};
use crate::observability::SpanTimer;
use async_stream::stream;
use futures::{Stream, StreamExt};
use serde_json::{Map, Value};

/// Field holding the grouped items in a batch item.
pub const BATCH_RECORDS_FIELD: &str = "Records";

/// Groups consecutive items into `{"Records": [...]}` items of at most
/// `size` elements; the last batch may be shorter.
///
/// A batch unit continues the lineage of the last unit in its chunk: its
/// history is that unit's history followed by the batch item.
#[derive(Debug, Clone)]
pub struct BatchBolt {
    size: usize,
    name: String,
}

impl BatchBolt {
    /// Creates a batch bolt.
    ///
    /// # Errors
    ///
    /// Returns an error if `size` is zero.
    pub fn new(size: usize) -> PipelineResult<Self> {
        if size == 0 {
            return Err(PipelineError::Configuration(
                "batch size must be positive".to_string(),
            ));
        }
        Ok(Self {
            size,
            name: format!("batch({size})"),
        })
    }

    /// Returns the batch size.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Bolt for BatchBolt {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, input: UnitStream, ctx: ExecutionContext) -> UnitStream {
        batch_units(self.name.clone(), self.size, input, ctx).boxed()
    }
}

fn batch_unit(mut chunk: Vec<PipelineUnit>) -> Option<PipelineUnit> {
    let last = chunk.pop()?;
    let mut records: Vec<Item> = chunk.into_iter().map(PipelineUnit::into_item).collect();
    records.push(last.item.clone());

    let mut fields = Map::new();
    fields.insert(BATCH_RECORDS_FIELD.to_string(), Value::Array(records));
    Some(last.derive(Value::Object(fields)))
}

fn batch_units(
    name: String,
    size: usize,
    mut input: UnitStream,
    ctx: ExecutionContext,
) -> impl Stream<Item = PipelineResult<PipelineUnit>> + Send + 'static {
    stream! {
        let timer = SpanTimer::start(name);
        let mut batches = 0usize;
        let mut pending: Vec<PipelineUnit> = Vec::with_capacity(size);

        while let Some(next) = input.next().await {
            match next {
                Ok(unit) => pending.push(unit),
                Err(err) => {
                    yield Err(err);
                    return;
                }
            }

            if pending.len() == size {
                let chunk = std::mem::replace(&mut pending, Vec::with_capacity(size));
                if let Some(unit) = batch_unit(chunk) {
                    batches += 1;
                    yield Ok(unit);
                }
            }
        }

        if let Some(unit) = batch_unit(pending) {
            batches += 1;
            yield Ok(unit);
        }

        report_completion(&ctx, &timer, batches);
    }
}
