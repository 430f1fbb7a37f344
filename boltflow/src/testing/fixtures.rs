//! Test fixtures for pipeline testing.

use futures::TryStreamExt;
use std::sync::Arc;

use super::MockSession;
use crate::bolts::{unit_stream, UnitStream};
use crate::context::ExecutionContext;
use crate::core::{Item, PipelineUnit};
use crate::errors::PipelineResult;
use crate::events::CollectingEventSink;
use crate::pipeline::PipelineConfig;

/// A context wired to a mock session and a collecting event sink.
#[derive(Debug)]
pub struct TestContext {
    /// The scripted session.
    pub session: Arc<MockSession>,
    /// Every event recorded by bolts.
    pub events: Arc<CollectingEventSink>,
    /// The context handed to bolts.
    pub ctx: ExecutionContext,
}

impl TestContext {
    /// Creates a context over a fresh root session.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    /// Creates a context with a specific configuration.
    #[must_use]
    pub fn with_config(config: PipelineConfig) -> Self {
        let session = MockSession::new("root");
        let events = Arc::new(CollectingEventSink::new());
        let ctx = ExecutionContext::new(session.clone())
            .with_event_sink(events.clone())
            .with_config(Arc::new(config));

        Self {
            session,
            events,
            ctx,
        }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a stream of initial units from plain items.
pub fn stream_of(items: impl IntoIterator<Item = Item>) -> UnitStream {
    unit_stream(items.into_iter().map(PipelineUnit::initial).collect())
}

/// Drains a stream into units, stopping at the first fatal error.
pub async fn collect_units(stream: UnitStream) -> PipelineResult<Vec<PipelineUnit>> {
    stream.try_collect().await
}

/// Drains a stream into items, stopping at the first fatal error.
pub async fn collect_items(stream: UnitStream) -> PipelineResult<Vec<Item>> {
    stream.map_ok(PipelineUnit::into_item).try_collect().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_stream_of_builds_initial_units() {
        let units = collect_units(stream_of(vec![json!(1), json!(2)])).await.unwrap();
        assert_eq!(units.len(), 2);
        assert!(units.iter().all(|unit| unit.history.is_empty()));
    }

    #[tokio::test]
    async fn test_collect_items() {
        let items = collect_items(stream_of(vec![json!("a")])).await.unwrap();
        assert_eq!(items, vec![json!("a")]);
    }

    #[test]
    fn test_context_uses_root_session() {
        let tc = TestContext::new();
        assert_eq!(tc.ctx.session().name(), "root");
        assert!(tc.events.is_empty());
    }
}
