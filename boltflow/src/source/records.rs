//! The default adapter for queue-style record batches.

use super::EventAdapter;
use crate::core::PipelineUnit;
use crate::errors::{PipelineError, PipelineResult};
use crate::pipeline::PipelineConfig;
use serde_json::Value;
use tracing::debug;

/// Adapts record batches such as `{"Records": [{"body": "..."}]}`.
///
/// - When the event holds an array under the records field, every record
///   becomes one unit. A record whose body field is a string has the body
///   parsed as JSON; other records pass through whole.
/// - Any other event is a single record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordBatchAdapter {
    records_field: String,
    body_field: String,
}

impl Default for RecordBatchAdapter {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl RecordBatchAdapter {
    /// Creates an adapter for custom field names.
    #[must_use]
    pub fn new(records_field: impl Into<String>, body_field: impl Into<String>) -> Self {
        Self {
            records_field: records_field.into(),
            body_field: body_field.into(),
        }
    }

    /// Creates an adapter using the configured field names.
    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.records_field.clone(), config.body_field.clone())
    }

    fn decode(&self, index: usize, record: &Value) -> PipelineResult<Value> {
        match record.get(&self.body_field) {
            Some(Value::String(body)) => {
                serde_json::from_str(body).map_err(|err| PipelineError::EventDecode {
                    index,
                    message: err.to_string(),
                })
            }
            Some(body) => Ok(body.clone()),
            None => Ok(record.clone()),
        }
    }
}

impl EventAdapter for RecordBatchAdapter {
    fn adapt(&self, event: &Value) -> PipelineResult<Vec<PipelineUnit>> {
        let Some(records) = event.get(&self.records_field).and_then(Value::as_array) else {
            debug!("Event is not a record batch; treating it as one record");
            return Ok(vec![PipelineUnit::initial(event.clone())]);
        };

        debug!(records = records.len(), "Event is a record batch; decoding record bodies");
        records
            .iter()
            .enumerate()
            .map(|(index, record)| self.decode(index, record).map(PipelineUnit::initial))
            .collect()
    }
}
