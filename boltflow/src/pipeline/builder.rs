//! Chain construction at run time.

use crate::bolts::Chain;
use crate::context::ExecutionContext;
use crate::core::{History, Item};
use crate::errors::PipelineResult;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

type StaticFn = dyn Fn() -> PipelineResult<Chain> + Send + Sync;
type EventFn = dyn Fn(&Value) -> PipelineResult<Chain> + Send + Sync;
type EventContextFn = dyn Fn(&Value, &ExecutionContext) -> PipelineResult<Chain> + Send + Sync;
type EventContextResolverFn =
    dyn Fn(&Value, &ExecutionContext, &HistoryResolver) -> PipelineResult<Chain> + Send + Sync;

/// Builds the chain for one run, tagged with what it gets to see.
///
/// The chain is built once per run, before any item flows, from the raw
/// inbound event and optionally the execution context.
#[derive(Clone)]
pub enum ChainBuilder {
    /// Sees nothing.
    Static(Arc<StaticFn>),
    /// Sees the raw event.
    Event(Arc<EventFn>),
    /// Sees the raw event and the context.
    EventContext(Arc<EventContextFn>),
    /// Sees the raw event, the context and a [`HistoryResolver`].
    EventContextResolver(Arc<EventContextResolverFn>),
}

impl ChainBuilder {
    /// Always returns `chain`.
    #[must_use]
    pub fn fixed(chain: Chain) -> Self {
        Self::Static(Arc::new(move || Ok(chain.clone())))
    }

    /// A builder that ignores its inputs.
    #[must_use]
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn() -> PipelineResult<Chain> + Send + Sync + 'static,
    {
        Self::Static(Arc::new(f))
    }

    /// A builder over the raw event.
    #[must_use]
    pub fn from_event<F>(f: F) -> Self
    where
        F: Fn(&Value) -> PipelineResult<Chain> + Send + Sync + 'static,
    {
        Self::Event(Arc::new(f))
    }

    /// A builder over the raw event and the context.
    #[must_use]
    pub fn from_event_context<F>(f: F) -> Self
    where
        F: Fn(&Value, &ExecutionContext) -> PipelineResult<Chain> + Send + Sync + 'static,
    {
        Self::EventContext(Arc::new(f))
    }

    /// A builder that also gets a resolver for deferred history lookups.
    #[must_use]
    pub fn with_resolver<F>(f: F) -> Self
    where
        F: Fn(&Value, &ExecutionContext, &HistoryResolver) -> PipelineResult<Chain> + Send + Sync + 'static,
    {
        Self::EventContextResolver(Arc::new(f))
    }

    /// Builds the chain for one run.
    ///
    /// # Errors
    ///
    /// Returns whatever the wrapped function returns.
    pub fn build(&self, event: &Value, ctx: &ExecutionContext) -> PipelineResult<Chain> {
        match self {
            Self::Static(f) => f(),
            Self::Event(f) => f(event),
            Self::EventContext(f) => f(event, ctx),
            Self::EventContextResolver(f) => f(event, ctx, &HistoryResolver),
        }
    }

    fn convention(&self) -> &'static str {
        match self {
            Self::Static(_) => "static",
            Self::Event(_) => "event",
            Self::EventContext(_) => "event+context",
            Self::EventContextResolver(_) => "event+context+resolver",
        }
    }
}

impl fmt::Debug for ChainBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainBuilder({})", self.convention())
    }
}

impl From<Chain> for ChainBuilder {
    fn from(chain: Chain) -> Self {
        Self::fixed(chain)
    }
}

/// Hands out deferred lookups into the history of items not yet produced.
///
/// The chain is built before any item flows, so a builder cannot read a
/// history directly. It asks for a [`HistoryLookup`] instead and captures
/// it in a bolt, which resolves it against each unit's history.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryResolver;

impl HistoryResolver {
    /// Looks up the entry produced by the bolt at `index` (0 is the first).
    #[must_use]
    pub fn at(&self, index: usize) -> HistoryLookup {
        HistoryLookup::At(index)
    }

    /// Looks up the most recent entry.
    #[must_use]
    pub fn last(&self) -> HistoryLookup {
        HistoryLookup::Last
    }
}

/// A history position, resolved later against a unit's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryLookup {
    /// Absolute index.
    At(usize),
    /// The last entry.
    Last,
}

impl HistoryLookup {
    /// Resolves against a history; `None` when the position does not exist yet.
    #[must_use]
    pub fn resolve<'h>(&self, history: &'h History) -> Option<&'h Item> {
        match self {
            Self::At(index) => history.get(*index),
            Self::Last => history.last(),
        }
    }

    /// Resolves and reads one field of the entry.
    #[must_use]
    pub fn field<'h>(&self, history: &'h History, key: &str) -> Option<&'h Value> {
        self.resolve(history).and_then(|item| item.get(key))
    }
}
