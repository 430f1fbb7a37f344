//! Pipeline building and execution.
//!
//! This module provides:
//! - Pipeline configuration
//! - Chain builders and deferred history lookups
//! - The driver that adapts an event, runs a chain and materializes it

mod builder;
mod config;
mod driver;

pub use builder::{ChainBuilder, HistoryLookup, HistoryResolver};
pub use config::{PipelineConfig, DEFAULT_CAMEL_CASED_SERVICES, DEFAULT_MAX_DELEGATION_DEPTH};
pub use driver::{Pipeline, RunReport};
