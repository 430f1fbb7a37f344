//! Adapting raw inbound events into pipeline units.
//!
//! An event source hands the driver one raw event per invocation. The
//! adapter decides how that event splits into records and decodes any
//! embedded payload before the records enter the first bolt.

mod records;

pub use records::RecordBatchAdapter;

use crate::core::PipelineUnit;
use crate::errors::PipelineResult;
use serde_json::Value;
use std::fmt::Debug;

/// Splits a raw inbound event into initial units.
pub trait EventAdapter: Send + Sync + Debug {
    /// Adapts `event` into units with empty histories, in record order.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EventDecode`](crate::errors::PipelineError::EventDecode)
    /// when a record's payload cannot be decoded.
    fn adapt(&self, event: &Value) -> PipelineResult<Vec<PipelineUnit>>;
}
