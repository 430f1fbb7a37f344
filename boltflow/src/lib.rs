//! # Boltflow
//!
//! Composable pipelines over batches of inbound event records.
//!
//! Boltflow threads each record through an ordered chain of bolts with
//! support for:
//!
//! - **Lazy, pull-based execution**: each bolt yields one unit at a time
//! - **Per-record history**: every unit carries the outputs of earlier bolts
//! - **External operations**: single-call and paginated, with per-item failure isolation
//! - **Delegated sessions**: run a sub-chain under temporary elevated credentials
//! - **Event-driven observability**: bolt summaries and dropped items on an event sink
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use boltflow::prelude::*;
//!
//! let builder = ChainBuilder::from_event(|_event| {
//!     Ok(Chain::new()
//!         .bolt(OperationBolt::call("sqs", "send_message").with_kwarg("QueueUrl", json!(url)))
//!         .bolt(BatchBolt::new(10)?))
//! });
//!
//! let pipeline = Pipeline::new(ExecutionContext::new(session));
//! let items = pipeline.run(&builder, &event).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod bolts;
pub mod client;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod failure;
pub mod observability;
pub mod pipeline;
pub mod source;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::bolts::{
        BatchBolt, Bolt, Chain, DelegatedSessionBolt, OperationBolt, PaginatedOperationBolt,
        ThenBolt, TransformBolt, UnitStream,
    };
    pub use crate::client::{Client, Credentials, Kwargs, Operation, Session};
    pub use crate::context::ExecutionContext;
    pub use crate::core::{normalize_to_sequence, History, Item, PipelineUnit, Produced};
    pub use crate::errors::{ArgumentError, InvocationError, PipelineError, PipelineResult};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::{ChainBuilder, HistoryResolver, Pipeline, PipelineConfig, RunReport};
    pub use crate::source::{EventAdapter, RecordBatchAdapter};
    pub use crate::utils::{normalize_key_casing, resolve_call_arguments, ArgumentSpec, KeyCasing};
}
