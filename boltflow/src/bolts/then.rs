//! A bolt handing the whole stream to caller code.

use super::{Bolt, UnitStream};
use crate::context::ExecutionContext;
use std::fmt;
use std::sync::Arc;

type StreamFn = dyn Fn(UnitStream) -> UnitStream + Send + Sync;
type StreamContextFn = dyn Fn(UnitStream, ExecutionContext) -> UnitStream + Send + Sync;

/// A whole-stream function, tagged with what it gets to see.
#[derive(Clone)]
pub enum ThenFn {
    /// Sees the stream only.
    Stream(Arc<StreamFn>),
    /// Sees the stream and the execution context.
    StreamContext(Arc<StreamContextFn>),
}

impl fmt::Debug for ThenFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream(_) => f.write_str("ThenFn(stream)"),
            Self::StreamContext(_) => f.write_str("ThenFn(stream+context)"),
        }
    }
}

/// Applies a caller-supplied stream combinator.
///
/// Unlike the other bolts this one sees the whole stream at once, so it can
/// filter, reorder within its own buffering, or stop early. Laziness and
/// error forwarding are up to the function.
#[derive(Debug, Clone)]
pub struct ThenBolt {
    name: String,
    func: ThenFn,
}

impl ThenBolt {
    /// Creates a bolt from a tagged function.
    #[must_use]
    pub fn new(func: ThenFn) -> Self {
        Self {
            name: "then".to_string(),
            func,
        }
    }

    /// A combinator over the stream.
    #[must_use]
    pub fn stream<F>(f: F) -> Self
    where
        F: Fn(UnitStream) -> UnitStream + Send + Sync + 'static,
    {
        Self::new(ThenFn::Stream(Arc::new(f)))
    }

    /// A combinator over the stream and the context.
    #[must_use]
    pub fn with_context<F>(f: F) -> Self
    where
        F: Fn(UnitStream, ExecutionContext) -> UnitStream + Send + Sync + 'static,
    {
        Self::new(ThenFn::StreamContext(Arc::new(f)))
    }

    /// Sets the bolt name used in logs.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Bolt for ThenBolt {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, input: UnitStream, ctx: ExecutionContext) -> UnitStream {
        match &self.func {
            ThenFn::Stream(f) => f(input),
            ThenFn::StreamContext(f) => f(input, ctx),
        }
    }
}
