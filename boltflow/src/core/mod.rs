//! Core domain model types for boltflow.
//!
//! This module contains the fundamental types flowing between bolts:
//! - Items and their per-lineage history
//! - Pipeline units, the sole unit of currency between stages
//! - Produced values, the "one value or a lazy sequence" result shape

mod produced;
mod unit;

pub use produced::{normalize_to_sequence, Produced, Sequence};
pub use unit::{History, Item, PipelineUnit};
