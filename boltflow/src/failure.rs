//! Failure handling strategies for bolts.
//!
//! Two strategies exist and each bolt uses exactly one:
//!
//! - [`isolate_item`]: operation, paginated and delegated-session bolts log
//!   the failure, report a dropped item and carry on with the next input.
//! - [`abort_pipeline`]: transform bolts log the failure with the offending
//!   item and hand back a fatal [`PipelineError`] that ends the run.

use crate::context::ExecutionContext;
use crate::errors::PipelineError;
use crate::events::{EventKind, PipelineEvent};
use crate::utils::iso_timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which strategy a bolt applies to a failed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureMode {
    /// Drop the item, keep streaming.
    IsolateItem,
    /// Stop the whole pipeline.
    AbortPipeline,
}

/// Everything known about one failed item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Name of the bolt the failure happened in.
    pub bolt: String,
    /// Error kind (e.g. "ThrottlingException", "ArityMismatch").
    pub error: String,
    /// Error detail.
    pub error_detail: String,
    /// Arguments of the failed call, if a call was attempted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_kwargs: Option<Value>,
    /// The item being processed.
    pub item: Value,
    /// Strategy applied.
    pub mode: FailureMode,
    /// When the failure was recorded (ISO 8601, UTC).
    pub failed_at: String,
}

impl FailureRecord {
    /// Creates a record for a failed item.
    #[must_use]
    pub fn new(
        bolt: impl Into<String>,
        mode: FailureMode,
        error: impl Into<String>,
        error_detail: impl Into<String>,
        item: Value,
    ) -> Self {
        Self {
            bolt: bolt.into(),
            error: error.into(),
            error_detail: error_detail.into(),
            method_kwargs: None,
            item,
            mode,
            failed_at: iso_timestamp(),
        }
    }

    /// Attaches the call arguments.
    #[must_use]
    pub fn with_kwargs(mut self, kwargs: Value) -> Self {
        self.method_kwargs = Some(kwargs);
        self
    }

    fn to_event_data(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Logs an isolated failure and reports the dropped item.
pub fn isolate_item(ctx: &ExecutionContext, record: &FailureRecord) {
    tracing::error!(
        bolt = %record.bolt,
        error = %record.error,
        error_detail = %record.error_detail,
        method_kwargs = ?record.method_kwargs,
        run_id = %ctx.run_id(),
        "An unhandled exception has occurred executing '{}', dropping item",
        record.bolt
    );
    ctx.emit(PipelineEvent::bolt(
        EventKind::ItemDropped,
        &record.bolt,
        record.to_event_data(),
    ));
}

/// Logs a fatal failure with its item and returns the error to propagate.
#[must_use]
pub fn abort_pipeline(ctx: &ExecutionContext, record: &FailureRecord, error: PipelineError) -> PipelineError {
    tracing::error!(
        bolt = %record.bolt,
        error = %record.error,
        error_detail = %record.error_detail,
        item = %record.item,
        run_id = %ctx.run_id(),
        "An unhandled exception occurred within '{}', aborting pipeline",
        record.bolt
    );
    ctx.emit(PipelineEvent::bolt(
        EventKind::PipelineAborted,
        &record.bolt,
        record.to_event_data(),
    ));
    error
}
