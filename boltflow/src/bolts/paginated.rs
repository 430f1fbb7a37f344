//! A bolt flattening every page of a paginated operation.

use super::call::{merge_output, CallSpec, PostProcess, POST_PROCESS_FAILURE};
use super::{report_completion, Bolt, UnitStream};
use crate::client::{Kwargs, Operation};
use crate::context::ExecutionContext;
use crate::core::{PipelineUnit, Produced};
use crate::errors::PipelineResult;
use crate::observability::SpanTimer;
use crate::utils::{ArgumentSpec, KeyCasing};
use async_stream::stream;
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::sync::Arc;

/// Iterates every page of a paginated operation for each input unit.
///
/// Each page (or the output of the post-processing function) is normalized
/// into values, and each value becomes a child unit of the input unit.
/// When a page fails to load or to post-process, the units already
/// yielded for that input stay yielded, the rest of its pages are skipped,
/// and the bolt moves on to the next input unit.
#[derive(Debug, Clone)]
pub struct PaginatedOperationBolt {
    call: Arc<CallSpec>,
}

impl PaginatedOperationBolt {
    /// Creates a bolt for a paginated operation.
    #[must_use]
    pub fn new(operation: Operation) -> Self {
        Self {
            call: Arc::new(CallSpec::new(operation)),
        }
    }

    /// Shortcut for `PaginatedOperationBolt::new(Operation::new(service, name))`.
    #[must_use]
    pub fn call(service: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(Operation::new(service, name))
    }

    /// Sets the post-processing function applied to each page.
    #[must_use]
    pub fn then<F>(mut self, then: F) -> Self
    where
        F: Fn(Value) -> anyhow::Result<Produced> + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.call).then = Some(Arc::new(then) as PostProcess);
        self
    }

    /// Sets the fixed keyword arguments.
    #[must_use]
    pub fn with_kwargs(mut self, kwargs: Kwargs) -> Self {
        Arc::make_mut(&mut self.call).kwargs = kwargs;
        self
    }

    /// Adds one fixed keyword argument.
    #[must_use]
    pub fn with_kwarg(mut self, key: impl Into<String>, value: Value) -> Self {
        Arc::make_mut(&mut self.call).kwargs.insert(key.into(), value);
        self
    }

    /// Declares which call arguments are taken from each item.
    #[must_use]
    pub fn iterating_over(mut self, spec: ArgumentSpec) -> Self {
        Arc::make_mut(&mut self.call).iterating_over = Some(spec);
        self
    }

    /// Overrides the key casing chosen from the configuration.
    #[must_use]
    pub fn with_key_casing(mut self, casing: KeyCasing) -> Self {
        Arc::make_mut(&mut self.call).key_casing = Some(casing);
        self
    }
}

impl Bolt for PaginatedOperationBolt {
    fn name(&self) -> &str {
        self.call.label()
    }

    fn apply(&self, input: UnitStream, ctx: ExecutionContext) -> UnitStream {
        paginate_each(Arc::clone(&self.call), input, ctx).boxed()
    }
}

fn paginate_each(
    call: Arc<CallSpec>,
    mut input: UnitStream,
    ctx: ExecutionContext,
) -> impl Stream<Item = PipelineResult<PipelineUnit>> + Send + 'static {
    stream! {
        let timer = SpanTimer::start(call.label());
        let mut produced = 0usize;

        while let Some(next) = input.next().await {
            let unit = match next {
                Ok(unit) => unit,
                Err(err) => {
                    yield Err(err);
                    return;
                }
            };

            let client = match call.client(&ctx).await {
                Ok(client) => client,
                Err(err) => {
                    yield Err(err);
                    return;
                }
            };

            let kwargs: Kwargs = match call.call_arguments(&unit.item, &ctx) {
                Ok(kwargs) => kwargs,
                Err(err) => {
                    call.isolate(&ctx, err.kind(), err.to_string(), &unit.item, None);
                    continue;
                }
            };

            let mut pages = client.paginate(&call.operation.name, kwargs.clone());
            let mut page_count = 0usize;

            while let Some(page) = pages.next().await {
                let page = match page {
                    Ok(page) => page,
                    Err(err) => {
                        call.isolate(&ctx, &err.kind, err.detail, &unit.item, Some(&kwargs));
                        break;
                    }
                };
                page_count += 1;

                let values = match call.produce(page) {
                    Ok(values) => values,
                    Err(err) => {
                        call.isolate(&ctx, POST_PROCESS_FAILURE, format!("{err:#}"), &unit.item, Some(&kwargs));
                        break;
                    }
                };

                for value in values {
                    match merge_output(&kwargs, value) {
                        None => {}
                        Some(Ok(item)) => {
                            produced += 1;
                            yield Ok(unit.derive(item));
                        }
                        Some(Err(err)) => {
                            call.isolate(&ctx, err.kind(), err.to_string(), &unit.item, Some(&kwargs));
                        }
                    }
                }
            }

            tracing::debug!(bolt = call.label(), pages = page_count, "Paginated one item");
        }

        report_completion(&ctx, &timer, produced);
    }
}
