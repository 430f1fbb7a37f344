//! The pipeline driver.

use super::{ChainBuilder, PipelineConfig};
use crate::bolts::{unit_stream, Chain, UnitStream};
use crate::context::ExecutionContext;
use crate::core::{Item, PipelineUnit};
use crate::errors::PipelineResult;
use crate::events::{EventKind, EventSink, PipelineEvent};
use crate::source::{EventAdapter, RecordBatchAdapter};
use crate::utils::generate_run_id;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

/// The outcome of one materialized run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// The run id every bolt logged under.
    pub run_id: Uuid,
    /// Final items, in output order.
    pub items: Vec<Item>,
    /// Items dropped by isolated failures during the run.
    pub dropped: usize,
    /// When the first bolt was polled.
    pub started_at: DateTime<Utc>,
    /// When the last item was materialized.
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Returns the wall-clock duration of the run in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Runs chains over inbound events.
///
/// Each run adapts the raw event into initial units, builds the chain,
/// folds it over the units and materializes the result. Histories stay
/// inside the run; callers get the final items only.
#[derive(Debug, Clone)]
pub struct Pipeline {
    ctx: ExecutionContext,
    adapter: Option<Arc<dyn EventAdapter>>,
}

impl Pipeline {
    /// Creates a driver running under `ctx`.
    #[must_use]
    pub fn new(ctx: ExecutionContext) -> Self {
        Self { ctx, adapter: None }
    }

    /// Replaces the configuration of the context.
    #[must_use]
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.ctx = self.ctx.with_config(Arc::new(config));
        self
    }

    /// Replaces the default [`RecordBatchAdapter`].
    #[must_use]
    pub fn with_adapter(mut self, adapter: Arc<dyn EventAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Attaches the hosting process's invocation metadata to every run.
    #[must_use]
    pub fn with_host(mut self, host: Value) -> Self {
        self.ctx = self.ctx.with_host(host);
        self
    }

    /// Returns the base context.
    #[must_use]
    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    /// Adapts `event` and returns the un-materialized output stream.
    ///
    /// Nothing runs until the stream is polled.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be adapted or the chain cannot
    /// be built.
    pub fn stream(&self, builder: &ChainBuilder, event: &Value) -> PipelineResult<UnitStream> {
        let ctx = self.run_context();
        self.prepare(builder, event, &ctx)
    }

    /// Runs the chain built by `builder` over `event` and returns the final items.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error raised while adapting, building or
    /// pulling items.
    pub async fn run(&self, builder: &ChainBuilder, event: &Value) -> PipelineResult<Vec<Item>> {
        Ok(self.run_report(builder, event).await?.items)
    }

    /// Like [`run`](Self::run), returning a [`RunReport`].
    ///
    /// # Errors
    ///
    /// Returns the first fatal error raised while adapting, building or
    /// pulling items.
    pub async fn run_report(&self, builder: &ChainBuilder, event: &Value) -> PipelineResult<RunReport> {
        let tally = Arc::new(DropTally::new(self.ctx.event_sink()));
        let ctx = self.run_context().with_event_sink(tally.clone());
        let stream = self.prepare(builder, event, &ctx)?;
        materialize(&ctx, stream, &tally).await
    }

    /// Runs `chain` over units that were already adapted.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error raised while pulling items.
    pub async fn run_units(&self, chain: &Chain, units: Vec<PipelineUnit>) -> PipelineResult<Vec<Item>> {
        let tally = Arc::new(DropTally::new(self.ctx.event_sink()));
        let ctx = self.run_context().with_event_sink(tally.clone());
        let stream = chain.apply(unit_stream(units), &ctx);
        Ok(materialize(&ctx, stream, &tally).await?.items)
    }

    /// Runs on a fresh current-thread runtime, for synchronous hosts.
    ///
    /// Must not be called from inside an async runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be built, or whatever
    /// [`run`](Self::run) returns.
    pub fn run_blocking(&self, builder: &ChainBuilder, event: &Value) -> PipelineResult<Vec<Item>> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.run(builder, event))
    }

    fn run_context(&self) -> ExecutionContext {
        self.ctx.clone().with_run_id(generate_run_id())
    }

    fn adapter(&self) -> Arc<dyn EventAdapter> {
        match &self.adapter {
            Some(adapter) => Arc::clone(adapter),
            None => Arc::new(RecordBatchAdapter::from_config(self.ctx.config())),
        }
    }

    fn prepare(&self, builder: &ChainBuilder, event: &Value, ctx: &ExecutionContext) -> PipelineResult<UnitStream> {
        let units = self.adapter().adapt(event)?;
        let chain = builder.build(event, ctx)?;
        debug!(
            run_id = %ctx.run_id(),
            records = units.len(),
            bolts = ?chain.names(),
            "Adapted event into records"
        );
        Ok(chain.apply(unit_stream(units), ctx))
    }
}

async fn materialize(ctx: &ExecutionContext, stream: UnitStream, tally: &DropTally) -> PipelineResult<RunReport> {
    let started_at = Utc::now();
    info!(run_id = %ctx.run_id(), "Starting iteration...");
    ctx.emit(PipelineEvent::run(
        EventKind::RunStarted,
        json!({"run_id": ctx.run_id().to_string()}),
    ));

    let collected: PipelineResult<Vec<Item>> = stream.map_ok(PipelineUnit::into_item).try_collect().await;
    let finished_at = Utc::now();

    match collected {
        Ok(items) => {
            let report = RunReport {
                run_id: ctx.run_id(),
                dropped: tally.dropped(),
                items,
                started_at,
                finished_at,
            };
            info!(
                run_id = %report.run_id,
                items = report.items.len(),
                dropped = report.dropped,
                duration_ms = report.duration_ms(),
                "Finished iteration."
            );
            if ctx.config().log_results {
                debug!(run_id = %report.run_id, items = ?report.items, "Iteration results");
            }
            ctx.emit(PipelineEvent::run(
                EventKind::RunCompleted,
                json!({"items": report.items.len(), "dropped": report.dropped}),
            ));
            Ok(report)
        }
        Err(err) => {
            error!(run_id = %ctx.run_id(), error = %err, kind = err.kind(), "Iteration failed");
            ctx.emit(PipelineEvent::run(EventKind::RunFailed, json!(err.to_dict())));
            Err(err)
        }
    }
}

/// Forwards events to the context's sink and counts dropped items.
#[derive(Debug)]
struct DropTally {
    inner: Arc<dyn EventSink>,
    dropped: AtomicUsize,
}

impl DropTally {
    fn new(inner: &Arc<dyn EventSink>) -> Self {
        Self {
            inner: Arc::clone(inner),
            dropped: AtomicUsize::new(0),
        }
    }

    fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl EventSink for DropTally {
    fn record(&self, event: PipelineEvent) {
        if event.kind == EventKind::ItemDropped {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.inner.record(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolts::{OperationBolt, TransformBolt};
    use crate::errors::InvocationError;
    use crate::testing::TestContext;
    use pretty_assertions::assert_eq;

    fn pipeline(tc: &TestContext) -> Pipeline {
        Pipeline::new(tc.ctx.clone())
    }

    #[tokio::test]
    async fn test_run_emits_lifecycle_events() {
        let tc = TestContext::new();
        let builder = ChainBuilder::fixed(Chain::new());

        let items = pipeline(&tc).run(&builder, &json!({"id": 1})).await.unwrap();

        assert_eq!(items, vec![json!({"id": 1})]);
        assert_eq!(tc.events.count(EventKind::RunStarted), 1);
        assert_eq!(tc.events.count(EventKind::RunCompleted), 1);
    }

    #[tokio::test]
    async fn test_run_report_counts_dropped_items() {
        let tc = TestContext::new();
        tc.session.on_invoke("sqs", "send_message", |kwargs| {
            if kwargs["id"] == json!(2) {
                Err(InvocationError::new("Throttling", "slow down"))
            } else {
                Ok(json!({"sent": true}))
            }
        });

        let event = json!({"Records": [{"body": "{\"id\":1}"}, {"body": "{\"id\":2}"}]});
        let builder = ChainBuilder::fixed(Chain::new().bolt(OperationBolt::call("sqs", "send_message")));
        let report = pipeline(&tc).run_report(&builder, &event).await.unwrap();

        assert_eq!(report.items, vec![json!({"id": 1, "sent": true})]);
        assert_eq!(report.dropped, 1);
        assert!(report.finished_at >= report.started_at);
        assert_eq!(tc.events.count(EventKind::ItemDropped), 1);
    }

    #[tokio::test]
    async fn test_each_run_gets_its_own_id() {
        let tc = TestContext::new();
        let builder = ChainBuilder::fixed(Chain::new());
        let driver = pipeline(&tc);

        let first = driver.run_report(&builder, &json!(1)).await.unwrap();
        let second = driver.run_report(&builder, &json!(2)).await.unwrap();
        assert_ne!(first.run_id, second.run_id);
    }

    #[tokio::test]
    async fn test_fatal_error_is_returned_and_reported() {
        let tc = TestContext::new();
        let builder = ChainBuilder::fixed(
            Chain::new().bolt(TransformBolt::value(|_| anyhow::bail!("rejected"))),
        );

        let err = pipeline(&tc).run(&builder, &json!({"id": 1})).await.unwrap_err();

        assert_eq!(err.kind(), "TransformFailure");
        let failed = tc.events.events_of(EventKind::RunFailed);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].data["type"], "TransformFailure");
    }

    #[tokio::test]
    async fn test_decode_failure_stops_before_any_bolt() {
        let tc = TestContext::new();
        let probe = crate::testing::RecordingBolt::new("probe");
        let builder = ChainBuilder::fixed(Chain::new().shared(probe.clone()));

        let err = pipeline(&tc)
            .run(&builder, &json!({"Records": [{"body": "nope"}]}))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "EventDecode");
        assert_eq!(probe.count(), 0);
        assert_eq!(tc.events.count(EventKind::RunStarted), 0);
    }

    #[tokio::test]
    async fn test_run_units_skips_adaptation() {
        let tc = TestContext::new();
        let units = vec![PipelineUnit::initial(json!({"body": "{\"raw\":true}"}))];
        let items = pipeline(&tc).run_units(&Chain::new(), units).await.unwrap();
        assert_eq!(items, vec![json!({"body": "{\"raw\":true}"})]);
    }

    #[tokio::test]
    async fn test_custom_adapter() {
        #[derive(Debug)]
        struct Lines;

        impl EventAdapter for Lines {
            fn adapt(&self, event: &Value) -> PipelineResult<Vec<PipelineUnit>> {
                Ok(event
                    .as_str()
                    .unwrap_or_default()
                    .lines()
                    .map(|line| PipelineUnit::initial(json!(line)))
                    .collect())
            }
        }

        let tc = TestContext::new();
        let items = pipeline(&tc)
            .with_adapter(Arc::new(Lines))
            .run(&ChainBuilder::fixed(Chain::new()), &json!("a\nb"))
            .await
            .unwrap();
        assert_eq!(items, vec![json!("a"), json!("b")]);
    }

    #[test]
    fn test_run_blocking() {
        let tc = TestContext::new();
        let driver = pipeline(&tc).with_config(PipelineConfig::default().with_log_results(false));
        let items = driver
            .run_blocking(&ChainBuilder::fixed(Chain::new()), &json!({"Records": [{"n": 1}]}))
            .unwrap();
        assert_eq!(items, vec![json!({"n": 1})]);
        assert!(!driver.context().config().log_results);
    }
}
