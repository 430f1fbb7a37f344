//! Utility functions shared by multiple bolts.
//!
//! This module provides:
//! - Call argument resolution from the current item
//! - Key casing normalization for camel-cased services
//! - Run identifiers and RFC3339 timestamps

mod arguments;
mod keys;

pub use arguments::{resolve_call_arguments, ArgumentSpec};
pub use keys::{normalize_key_casing, KeyCasing};

use chrono::Utc;
use uuid::Uuid;

/// Generates a new random (v4) run identifier.
#[must_use]
pub fn generate_run_id() -> Uuid {
    Uuid::new_v4()
}

/// Returns the current UTC time as an ISO 8601 string.
#[must_use]
pub fn iso_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}
