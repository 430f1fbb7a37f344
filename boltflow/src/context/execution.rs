//! The execution context handed to bolts.

use crate::client::{Client, Kwargs, Session};
use crate::errors::{InvocationError, PipelineError, PipelineResult};
use crate::events::{EventSink, NoOpEventSink, PipelineEvent};
use crate::pipeline::PipelineConfig;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// The session, event sink and configuration a bolt runs under.
///
/// Cloning is cheap; every field is shared.
#[derive(Clone)]
pub struct ExecutionContext {
    run_id: Uuid,
    session: Arc<dyn Session>,
    events: Arc<dyn EventSink>,
    config: Arc<PipelineConfig>,
    host: Option<serde_json::Value>,
    delegation_depth: u32,
}

impl ExecutionContext {
    /// Creates a top-level context for a session.
    #[must_use]
    pub fn new(session: Arc<dyn Session>) -> Self {
        Self {
            run_id: crate::utils::generate_run_id(),
            session,
            events: Arc::new(NoOpEventSink),
            config: Arc::new(PipelineConfig::default()),
            host: None,
            delegation_depth: 0,
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    /// Sets the pipeline configuration.
    #[must_use]
    pub fn with_config(mut self, config: Arc<PipelineConfig>) -> Self {
        self.config = config;
        self
    }

    /// Attaches the hosting process's invocation metadata.
    #[must_use]
    pub fn with_host(mut self, host: serde_json::Value) -> Self {
        self.host = Some(host);
        self
    }

    /// Sets the run id.
    #[must_use]
    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    /// Returns a child context bound to a delegated session.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DelegationDepthExceeded`] when the new
    /// context would nest deeper than the configured maximum.
    pub fn delegated(&self, session: Arc<dyn Session>) -> PipelineResult<Self> {
        self.check_delegation_depth()?;

        Ok(Self {
            session,
            delegation_depth: self.delegation_depth + 1,
            ..self.clone()
        })
    }

    /// Fails when one more delegated session would exceed the configured
    /// maximum depth.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DelegationDepthExceeded`] at the limit.
    pub fn check_delegation_depth(&self) -> PipelineResult<()> {
        let max_depth = self.config.max_delegation_depth;
        if self.delegation_depth >= max_depth {
            return Err(PipelineError::DelegationDepthExceeded { max_depth });
        }
        Ok(())
    }

    /// Resolves a client under this context's session.
    ///
    /// # Errors
    ///
    /// Returns the session's error if the client cannot be built.
    pub async fn client(&self, service: &str, options: &Kwargs) -> Result<Arc<dyn Client>, InvocationError> {
        self.session.client(service, options).await
    }

    /// Records an event on this context's sink.
    pub fn emit(&self, event: PipelineEvent) {
        self.events.record(event);
    }

    /// Returns the run id.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the session.
    #[must_use]
    pub fn session(&self) -> &Arc<dyn Session> {
        &self.session
    }

    /// Returns the event sink.
    #[must_use]
    pub fn event_sink(&self) -> &Arc<dyn EventSink> {
        &self.events
    }

    /// Returns the pipeline configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the hosting process's invocation metadata, if any.
    #[must_use]
    pub fn host(&self) -> Option<&serde_json::Value> {
        self.host.as_ref()
    }

    /// Returns how many delegated sessions enclose this context.
    #[must_use]
    pub fn delegation_depth(&self) -> u32 {
        self.delegation_depth
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("run_id", &self.run_id)
            .field("session", &self.session.name())
            .field("delegation_depth", &self.delegation_depth)
            .finish_non_exhaustive()
    }
}
