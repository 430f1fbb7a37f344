//! Execution context threaded through every bolt.
//!
//! The context is an immutable handle: delegating to a new session creates
//! a new context for the sub-chain and leaves the parent binding untouched.

mod execution;
#[cfg(test)]
mod context_tests;

pub use execution::ExecutionContext;
