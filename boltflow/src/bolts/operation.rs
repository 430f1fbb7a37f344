//! A bolt calling a single, non-paginated operation per item.

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

/// Calls an external operation once per input unit.
///
/// Each call's result (or the output of the post-processing function) is
/// normalized into zero or more values. Every value is merged over the
/// call arguments and yielded as a child unit of the input unit.
///
/// A failed call, a failed post-processing step, or an item that cannot
/// be mapped onto arguments is logged and dropped; the bolt moves on to
/// the next unit. A missing operation is fatal.
#[derive(Debug, Clone)]
pub struct OperationBolt {
    call: Arc<CallSpec>,
}

impl OperationBolt {
    /// Creates a bolt for an operation.
    #[must_use]
    pub fn new(operation: Operation) -> Self {
        Self {
            call: Arc::new(CallSpec::new(operation)),
        }
    }

    /// Shortcut for `OperationBolt::new(Operation::new(service, name))`.
    #[must_use]
    pub fn call(service: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(Operation::new(service, name))
    }

    /// Sets the post-processing function applied to each raw result.
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

    /// Returns the wrapped operation.
    #[must_use]
    pub fn operation(&self) -> &Operation {
        &self.call.operation
    }
}

impl Bolt for OperationBolt {
    fn name(&self) -> &str {
        self.call.label()
    }

    fn apply(&self, input: UnitStream, ctx: ExecutionContext) -> UnitStream {
        invoke_each(Arc::clone(&self.call), input, ctx).boxed()
    }
}

fn invoke_each(
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

            let result = match client.invoke(&call.operation.name, kwargs.clone()).await {
                Ok(result) => result,
                Err(err) => {
                    call.isolate(&ctx, &err.kind, err.detail, &unit.item, Some(&kwargs));
                    continue;
                }
            };

            let values = match call.produce(result) {
                Ok(values) => values,
                Err(err) => {
                    call.isolate(&ctx, POST_PROCESS_FAILURE, format!("{err:#}"), &unit.item, Some(&kwargs));
                    continue;
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

        report_completion(&ctx, &timer, produced);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::InvocationError;
    use crate::events::EventKind;
    use crate::testing::{assert_history_len, assert_lineage, collect_units, stream_of, TestContext};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn echo_ok(tc: &TestContext) {
        tc.session
            .on_invoke("sqs", "send_message", |_| Ok(json!({"status": "ok"})));
    }

    #[tokio::test]
    async fn test_result_is_merged_over_arguments() {
        let tc = TestContext::new();
        echo_ok(&tc);

        let bolt = OperationBolt::call("sqs", "send_message").with_kwarg("QueueUrl", json!("q"));
        let units = collect_units(bolt.apply(stream_of(vec![json!({"id": 1})]), tc.ctx.clone()))
            .await
            .unwrap();

        assert_eq!(units.len(), 1);
        assert_eq!(units[0].item, json!({"QueueUrl": "q", "id": 1, "status": "ok"}));
        assert_lineage(&units[0]);
        assert_history_len(&units, 1);
    }

    #[tokio::test]
    async fn test_failing_item_is_dropped_and_stream_continues() {
        let tc = TestContext::new();
        tc.session.on_invoke("sqs", "send_message", |kwargs| {
            if kwargs["id"] == json!(3) {
                Err(InvocationError::new("Throttling", "rate exceeded"))
            } else {
                Ok(json!({"sent": true}))
            }
        });

        let input = stream_of((1..=5).map(|id| json!({"id": id})));
        let bolt = OperationBolt::call("sqs", "send_message");
        let units = collect_units(bolt.apply(input, tc.ctx.clone())).await.unwrap();

        let ids: Vec<i64> = units.iter().map(|u| u.item["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 4, 5]);

        let dropped = tc.events.events_of(EventKind::ItemDropped);
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].data["error"], "Throttling");
        assert_eq!(dropped[0].data["method_kwargs"]["id"], 3);

        let completed = tc.events.events_of(EventKind::BoltCompleted);
        assert_eq!(completed[0].data["items"], 4);
    }

    #[tokio::test]
    async fn test_missing_operation_is_fatal() {
        let tc = TestContext::new();
        let bolt = OperationBolt::call("sqs", "does_not_exist");

        let err = collect_units(bolt.apply(stream_of(vec![json!({"id": 1})]), tc.ctx.clone()))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "OperationNotFound");
    }

    #[tokio::test]
    async fn test_then_fans_out() {
        let tc = TestContext::new();
        tc.session.on_invoke("sqs", "receive_message", |_| {
            Ok(json!({"Messages": [{"Body": "a"}, {"Body": "b"}]}))
        });

        let bolt = OperationBolt::call("sqs", "receive_message").then(|result| {
            let messages = result["Messages"].as_array().cloned().unwrap_or_default();
            Ok(Produced::many(messages))
        });
        let units = collect_units(bolt.apply(stream_of(vec![json!({"QueueUrl": "q"})]), tc.ctx.clone()))
            .await
            .unwrap();

        let bodies: Vec<&Value> = units.iter().map(|u| &u.item["Body"]).collect();
        assert_eq!(bodies, vec![&json!("a"), &json!("b")]);
        assert!(units.iter().all(|u| u.item["QueueUrl"] == "q"));
    }

    #[tokio::test]
    async fn test_failing_then_drops_only_its_item() {
        let tc = TestContext::new();
        tc.session.on_invoke("s3", "get_object", |kwargs| {
            if kwargs["Key"] == json!("broken") {
                Ok(json!({"Body": "not json"}))
            } else {
                Ok(json!({"Body": "{\"size\": 1}"}))
            }
        });

        let bolt = OperationBolt::call("s3", "get_object").then(|result| {
            let body = result["Body"].as_str().unwrap_or_default();
            let parsed: Value = serde_json::from_str(body)?;
            Ok(parsed.into())
        });
        let input = stream_of(vec![json!({"Key": "a"}), json!({"Key": "broken"}), json!({"Key": "c"})]);
        let units = collect_units(bolt.apply(input, tc.ctx.clone())).await.unwrap();

        let keys: Vec<&Value> = units.iter().map(|u| &u.item["Key"]).collect();
        assert_eq!(keys, vec![&json!("a"), &json!("c")]);
        assert!(units.iter().all(|u| u.item["size"] == 1));

        let dropped = tc.events.events_of(EventKind::ItemDropped);
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].data["error"], "PostProcessFailure");
        assert_eq!(dropped[0].data["method_kwargs"]["Key"], "broken");
    }

    #[tokio::test]
    async fn test_iterating_over_wraps_scalar_items() {
        let tc = TestContext::new();
        tc.session.on_invoke("sqs", "get_queue_url", |kwargs| {
            Ok(json!({"QueueUrl": format!("https://q/{}", kwargs["QueueName"].as_str().unwrap_or(""))}))
        });

        let bolt = OperationBolt::call("sqs", "get_queue_url").iterating_over(ArgumentSpec::key("QueueName"));
        let units = collect_units(bolt.apply(stream_of(vec![json!("jobs")]), tc.ctx.clone()))
            .await
            .unwrap();

        assert_eq!(units[0].item, json!({"QueueName": "jobs", "QueueUrl": "https://q/jobs"}));
    }

    #[tokio::test]
    async fn test_arity_mismatch_is_isolated() {
        let tc = TestContext::new();
        tc.session.on_invoke("s3", "get_object", |_| Ok(json!({"Body": "x"})));

        let bolt = OperationBolt::call("s3", "get_object").iterating_over(ArgumentSpec::keys(["Bucket", "Key"]));
        let input = stream_of(vec![json!(["b"]), json!(["b", "k"])]);
        let units = collect_units(bolt.apply(input, tc.ctx.clone())).await.unwrap();

        assert_eq!(units.len(), 1);
        assert_eq!(units[0].item["Key"], "k");
        assert_eq!(tc.events.events_of(EventKind::ItemDropped)[0].data["error"], "ArityMismatch");
        assert_eq!(tc.session.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_null_and_non_mapping_results() {
        let tc = TestContext::new();
        tc.session.on_invoke("sqs", "purge_queue", |kwargs| {
            Ok(if kwargs["id"] == json!(1) { Value::Null } else { json!("done") })
        });

        let bolt = OperationBolt::call("sqs", "purge_queue");
        let input = stream_of(vec![json!({"id": 1}), json!({"id": 2})]);
        let units = collect_units(bolt.apply(input, tc.ctx.clone())).await.unwrap();

        assert!(units.is_empty());
        assert_eq!(tc.events.count(EventKind::ItemDropped), 1);
    }

    #[tokio::test]
    async fn test_client_options_reach_the_session() {
        let tc = TestContext::new();
        echo_ok(&tc);

        let op = Operation::new("sqs", "send_message").with_client_option("region_name", json!("eu-west-1"));
        let bolt = OperationBolt::new(op);
        collect_units(bolt.apply(stream_of(vec![json!({})]), tc.ctx.clone()))
            .await
            .unwrap();

        let requests = tc.session.client_requests();
        assert_eq!(requests[0].1, "sqs");
        assert_eq!(requests[0].2["region_name"], "eu-west-1");
    }

    #[tokio::test]
    async fn test_upstream_error_is_forwarded() {
        let tc = TestContext::new();
        echo_ok(&tc);

        let input: UnitStream = futures::stream::iter(vec![
            Ok(PipelineUnit::initial(json!({"id": 1}))),
            Err(crate::errors::PipelineError::Configuration("boom".to_string())),
            Ok(PipelineUnit::initial(json!({"id": 2}))),
        ])
        .boxed();

        let bolt = OperationBolt::call("sqs", "send_message");
        let mut out = bolt.apply(input, tc.ctx.clone());

        assert!(out.next().await.unwrap().is_ok());
        assert!(out.next().await.unwrap().is_err());
        assert!(out.next().await.is_none());
        assert_eq!(tc.session.calls().len(), 1);
    }
}
