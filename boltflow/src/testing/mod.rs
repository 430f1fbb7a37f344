//! Testing utilities for boltflow pipelines.
//!
//! This module provides:
//! - A scripted in-memory session and client
//! - Fixtures for building contexts and unit streams
//! - Assertions over units and their histories

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_history_len, assert_items, assert_lineage};
pub use fixtures::{collect_items, collect_units, stream_of, TestContext};
pub use mocks::{MockClient, MockSession, RecordedCall, RecordingBolt};
