//! Call configuration shared by the operation-backed bolts.

use crate::client::{Client, Kwargs, Operation};
use crate::context::ExecutionContext;
use crate::core::{Item, Produced, Sequence};
use crate::errors::{shape_of, ArgumentError, PipelineError, PipelineResult};
use crate::failure::{isolate_item, FailureMode, FailureRecord};
use crate::utils::{resolve_call_arguments, ArgumentSpec, KeyCasing};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Post-processing applied to a raw result or page before fan-out.
///
/// An error drops the item that produced the result.
pub type PostProcess = Arc<dyn Fn(Value) -> anyhow::Result<Produced> + Send + Sync>;

/// Failure kind recorded when post-processing fails.
pub(crate) const POST_PROCESS_FAILURE: &str = "PostProcessFailure";

/// How an operation is called for each item.
#[derive(Clone)]
pub(crate) struct CallSpec {
    pub operation: Operation,
    pub kwargs: Kwargs,
    pub iterating_over: Option<ArgumentSpec>,
    pub key_casing: Option<KeyCasing>,
    pub then: Option<PostProcess>,
    label: String,
}

impl CallSpec {
    pub fn new(operation: Operation) -> Self {
        Self {
            label: operation.to_string(),
            operation,
            kwargs: Kwargs::new(),
            iterating_over: None,
            key_casing: None,
            then: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Resolves the client and checks that it exposes the operation.
    pub async fn client(&self, ctx: &ExecutionContext) -> PipelineResult<Arc<dyn Client>> {
        let client = ctx
            .client(&self.operation.service, &self.operation.client_options)
            .await?;

        if !client.has_operation(&self.operation.name) {
            return Err(PipelineError::operation_not_found(
                &self.operation.service,
                &self.operation.name,
            ));
        }

        Ok(client)
    }

    /// Merges the fixed kwargs with the arguments taken from `item`.
    ///
    /// Item arguments win over fixed ones.
    pub fn call_arguments(&self, item: &Item, ctx: &ExecutionContext) -> Result<Kwargs, ArgumentError> {
        let from_item = match (&self.iterating_over, item) {
            (Some(spec), _) => resolve_call_arguments(spec, item)?,
            (None, Value::Object(fields)) => fields.clone(),
            (None, other) => {
                return Err(ArgumentError::unsupported(format!(
                    "{} item cannot be merged into call arguments",
                    shape_of(other)
                )))
            }
        };

        let mut kwargs = self.kwargs.clone();
        kwargs.extend(from_item);

        let casing = self
            .key_casing
            .unwrap_or_else(|| ctx.config().key_casing_for(&self.operation.service));
        Ok(casing.apply(kwargs))
    }

    /// Runs the optional post-processing and normalizes into a sequence.
    pub fn produce(&self, result: Value) -> anyhow::Result<Sequence> {
        match &self.then {
            Some(then) => Ok(then(result)?.into_sequence()),
            None => Ok(Sequence::once(result)),
        }
    }

    /// Builds the isolation record for a failed item.
    pub fn failure(&self, kind: &str, detail: impl Into<String>, item: &Item) -> FailureRecord {
        FailureRecord::new(&self.label, FailureMode::IsolateItem, kind, detail, item.clone())
    }

    /// Logs and drops an item whose call failed.
    pub fn isolate(
        &self,
        ctx: &ExecutionContext,
        kind: &str,
        detail: impl Into<String>,
        item: &Item,
        kwargs: Option<&Kwargs>,
    ) {
        let mut record = self.failure(kind, detail, item);
        if let Some(kwargs) = kwargs {
            record = record.with_kwargs(Value::Object(kwargs.clone()));
        }
        isolate_item(ctx, &record);
    }
}

impl fmt::Debug for CallSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallSpec")
            .field("operation", &self.label)
            .field("kwargs", &self.kwargs)
            .field("iterating_over", &self.iterating_over)
            .field("key_casing", &self.key_casing)
            .field("then", &self.then.is_some())
            .finish()
    }
}

/// Merges call arguments with one produced value.
///
/// Produced keys win over argument keys. Returns `None` for null values.
pub(crate) fn merge_output(kwargs: &Kwargs, value: Value) -> Option<Result<Item, ArgumentError>> {
    match value {
        Value::Null => None,
        Value::Object(fields) => {
            let mut merged = kwargs.clone();
            merged.extend(fields);
            Some(Ok(Value::Object(merged)))
        }
        other => Some(Err(ArgumentError::unsupported(format!(
            "{} result cannot be merged with call arguments",
            shape_of(&other)
        )))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_item_overrides_fixed_kwargs() {
        let tc = TestContext::new();
        let mut spec = CallSpec::new(Operation::new("sqs", "send_message"));
        spec.kwargs.insert("QueueUrl".to_string(), json!("default"));
        spec.kwargs.insert("DelaySeconds".to_string(), json!(0));

        let kwargs = spec
            .call_arguments(&json!({"QueueUrl": "override", "MessageBody": "m"}), &tc.ctx)
            .unwrap();

        assert_eq!(
            Value::Object(kwargs),
            json!({"QueueUrl": "override", "DelaySeconds": 0, "MessageBody": "m"})
        );
    }

    #[test]
    fn test_scalar_item_without_argument_spec_is_rejected() {
        let tc = TestContext::new();
        let spec = CallSpec::new(Operation::new("sqs", "send_message"));
        let err = spec.call_arguments(&json!("raw"), &tc.ctx).unwrap_err();
        assert_eq!(err.kind(), "UnsupportedItemShape");
    }

    #[test]
    fn test_camel_cased_service_lowercases_keys() {
        let tc = TestContext::new();
        let spec = CallSpec::new(Operation::new("batch", "submit_job"));
        let kwargs = spec.call_arguments(&json!({"JobName": "j"}), &tc.ctx).unwrap();
        assert_eq!(Value::Object(kwargs), json!({"jobName": "j"}));
    }

    #[test]
    fn test_explicit_key_casing_overrides_config() {
        let tc = TestContext::new();
        let mut spec = CallSpec::new(Operation::new("batch", "submit_job"));
        spec.key_casing = Some(KeyCasing::Preserve);
        let kwargs = spec.call_arguments(&json!({"JobName": "j"}), &tc.ctx).unwrap();
        assert_eq!(Value::Object(kwargs), json!({"JobName": "j"}));
    }

    #[test]
    fn test_merge_output() {
        let mut kwargs = Kwargs::new();
        kwargs.insert("id".to_string(), json!(1));

        let merged = merge_output(&kwargs, json!({"status": "ok", "id": 9})).unwrap().unwrap();
        assert_eq!(merged, json!({"id": 9, "status": "ok"}));
        assert!(merge_output(&kwargs, Value::Null).is_none());
        assert!(merge_output(&kwargs, json!("text")).unwrap().is_err());
    }

    #[test]
    fn test_produce_without_then_is_single() {
        let spec = CallSpec::new(Operation::new("s3", "get_object"));
        let out: Vec<Value> = spec.produce(json!([1, 2])).unwrap().collect();
        assert_eq!(out, vec![json!([1, 2])]);
    }

    #[test]
    fn test_produce_surfaces_then_errors() {
        let mut spec = CallSpec::new(Operation::new("s3", "get_object"));
        spec.then = Some(Arc::new(|result: Value| -> anyhow::Result<Produced> {
            let body = result["Body"]
                .as_str()
                .ok_or_else(|| anyhow::anyhow!("result has no Body"))?;
            Ok(json!({"len": body.len()}).into())
        }) as PostProcess);

        let out: Vec<Value> = spec.produce(json!({"Body": "abc"})).unwrap().collect();
        assert_eq!(out, vec![json!({"len": 3})]);

        let err = spec.produce(json!({})).unwrap_err();
        assert_eq!(err.to_string(), "result has no Body");
    }
}
