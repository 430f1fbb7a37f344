//! In-memory sessions, clients and bolts for testing.

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::bolts::{Bolt, UnitStream};
use crate::client::{Client, Credentials, Kwargs, PageStream, Session};
use crate::context::ExecutionContext;
use crate::core::PipelineUnit;
use crate::errors::InvocationError;

type InvokeHandler = Arc<dyn Fn(&Kwargs) -> Result<Value, InvocationError> + Send + Sync>;
type PageHandler = Arc<dyn Fn(&Kwargs) -> Vec<Result<Value, InvocationError>> + Send + Sync>;

/// A call observed by a mock client.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Name of the session the client was built from.
    pub session: String,
    /// Service name.
    pub service: String,
    /// Operation name.
    pub operation: String,
    /// Arguments as received.
    pub kwargs: Kwargs,
}

#[derive(Default)]
struct MockState {
    invokers: Mutex<HashMap<(String, String), InvokeHandler>>,
    paginators: Mutex<HashMap<(String, String), PageHandler>>,
    calls: Mutex<Vec<RecordedCall>>,
    delegations: Mutex<Vec<Credentials>>,
    client_requests: Mutex<Vec<(String, String, Kwargs)>>,
}

/// A scripted session.
///
/// Operations are registered with [`on_invoke`](Self::on_invoke) and
/// [`on_paginate`](Self::on_paginate). Sessions opened through
/// [`Session::delegate`] share the script and the call log but report a
/// different name, so tests can tell which session served each call.
pub struct MockSession {
    name: String,
    state: Arc<MockState>,
}

impl MockSession {
    /// Creates a new root session.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            state: Arc::new(MockState::default()),
        })
    }

    /// Scripts a single-call operation.
    pub fn on_invoke<F>(&self, service: &str, operation: &str, handler: F)
    where
        F: Fn(&Kwargs) -> Result<Value, InvocationError> + Send + Sync + 'static,
    {
        self.state
            .invokers
            .lock()
            .insert((service.to_string(), operation.to_string()), Arc::new(handler));
    }

    /// Scripts a paginated operation; the handler returns every page.
    pub fn on_paginate<F>(&self, service: &str, operation: &str, handler: F)
    where
        F: Fn(&Kwargs) -> Vec<Result<Value, InvocationError>> + Send + Sync + 'static,
    {
        self.state
            .paginators
            .lock()
            .insert((service.to_string(), operation.to_string()), Arc::new(handler));
    }

    /// Returns every call made through this session or its delegates.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.calls.lock().clone()
    }

    /// Returns the calls made to one operation.
    #[must_use]
    pub fn calls_to(&self, service: &str, operation: &str) -> Vec<RecordedCall> {
        self.state
            .calls
            .lock()
            .iter()
            .filter(|call| call.service == service && call.operation == operation)
            .cloned()
            .collect()
    }

    /// Returns the credentials every delegated session was opened with.
    #[must_use]
    pub fn delegations(&self) -> Vec<Credentials> {
        self.state.delegations.lock().clone()
    }

    /// Returns (session, service, options) for every client requested.
    #[must_use]
    pub fn client_requests(&self) -> Vec<(String, String, Kwargs)> {
        self.state.client_requests.lock().clone()
    }
}

impl std::fmt::Debug for MockSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSession").field("name", &self.name).finish()
    }
}

#[async_trait]
impl Session for MockSession {
    fn name(&self) -> &str {
        &self.name
    }

    async fn client(&self, service: &str, options: &Kwargs) -> Result<Arc<dyn Client>, InvocationError> {
        self.state
            .client_requests
            .lock()
            .push((self.name.clone(), service.to_string(), options.clone()));

        Ok(Arc::new(MockClient {
            session: self.name.clone(),
            service: service.to_string(),
            state: Arc::clone(&self.state),
        }))
    }

    async fn delegate(&self, credentials: &Credentials) -> Result<Arc<dyn Session>, InvocationError> {
        self.state.delegations.lock().push(credentials.clone());
        Ok(Arc::new(Self {
            name: format!("delegated:{}", credentials.session_token),
            state: Arc::clone(&self.state),
        }))
    }
}

/// A client served by a [`MockSession`] script.
pub struct MockClient {
    session: String,
    service: String,
    state: Arc<MockState>,
}

impl MockClient {
    fn record(&self, operation: &str, kwargs: &Kwargs) {
        self.state.calls.lock().push(RecordedCall {
            session: self.session.clone(),
            service: self.service.clone(),
            operation: operation.to_string(),
            kwargs: kwargs.clone(),
        });
    }

    fn key(&self, operation: &str) -> (String, String) {
        (self.service.clone(), operation.to_string())
    }
}

impl std::fmt::Debug for MockClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockClient")
            .field("session", &self.session)
            .field("service", &self.service)
            .finish()
    }
}

#[async_trait]
impl Client for MockClient {
    fn service(&self) -> &str {
        &self.service
    }

    fn has_operation(&self, name: &str) -> bool {
        let key = self.key(name);
        self.state.invokers.lock().contains_key(&key) || self.state.paginators.lock().contains_key(&key)
    }

    async fn invoke(&self, name: &str, kwargs: Kwargs) -> Result<Value, InvocationError> {
        self.record(name, &kwargs);
        let handler = self.state.invokers.lock().get(&self.key(name)).cloned();
        match handler {
            Some(handler) => handler(&kwargs),
            None => Err(InvocationError::new("OperationNotScripted", name)),
        }
    }

    fn paginate(&self, name: &str, kwargs: Kwargs) -> PageStream {
        self.record(name, &kwargs);
        let handler = self.state.paginators.lock().get(&self.key(name)).cloned();
        let pages = match handler {
            Some(handler) => handler(&kwargs),
            None => vec![Err(InvocationError::new("OperationNotScripted", name))],
        };
        futures::stream::iter(pages).boxed()
    }
}

/// A pass-through bolt that records every unit it sees, along with the
/// name of the session it ran under.
#[derive(Debug)]
pub struct RecordingBolt {
    name: String,
    seen: Arc<Mutex<Vec<(String, PipelineUnit)>>>,
}

impl RecordingBolt {
    /// Creates a new recording bolt.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            seen: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Returns the recorded units.
    #[must_use]
    pub fn units(&self) -> Vec<PipelineUnit> {
        self.seen.lock().iter().map(|(_, unit)| unit.clone()).collect()
    }

    /// Returns the session name for each recorded unit.
    #[must_use]
    pub fn sessions(&self) -> Vec<String> {
        self.seen.lock().iter().map(|(session, _)| session.clone()).collect()
    }

    /// Returns the number of units seen.
    #[must_use]
    pub fn count(&self) -> usize {
        self.seen.lock().len()
    }
}

impl Bolt for RecordingBolt {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, input: UnitStream, ctx: ExecutionContext) -> UnitStream {
        let seen = Arc::clone(&self.seen);
        let session = ctx.session().name().to_string();
        input
            .inspect(move |unit| {
                if let Ok(unit) = unit {
                    seen.lock().push((session.clone(), unit.clone()));
                }
            })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_invoke_records_calls() {
        let session = MockSession::new("root");
        session.on_invoke("sqs", "send_message", |kwargs| Ok(json!({"Echo": kwargs["Body"]})));

        let client = session.client("sqs", &Kwargs::new()).await.unwrap();
        assert!(client.has_operation("send_message"));
        assert!(!client.has_operation("delete_queue"));

        let mut kwargs = Kwargs::new();
        kwargs.insert("Body".to_string(), json!("hi"));
        let out = client.invoke("send_message", kwargs).await.unwrap();

        assert_eq!(out, json!({"Echo": "hi"}));
        assert_eq!(session.calls().len(), 1);
        assert_eq!(session.calls()[0].session, "root");
    }

    #[tokio::test]
    async fn test_mock_paginate_yields_pages() {
        let session = MockSession::new("root");
        session.on_paginate("s3", "list_objects_v2", |_| vec![Ok(json!({"p": 1})), Ok(json!({"p": 2}))]);

        let client = session.client("s3", &Kwargs::new()).await.unwrap();
        let pages: Vec<_> = client.paginate("list_objects_v2", Kwargs::new()).collect().await;

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1], Ok(json!({"p": 2})));
    }

    #[tokio::test]
    async fn test_delegated_session_shares_script() {
        let session = MockSession::new("root");
        session.on_invoke("s3", "list_buckets", |_| Ok(json!({})));

        let creds = Credentials {
            access_key_id: "a".to_string(),
            secret_access_key: "s".to_string(),
            session_token: "tok".to_string(),
            expiration: None,
        };
        let nested = session.delegate(&creds).await.unwrap();
        let client = nested.client("s3", &Kwargs::new()).await.unwrap();
        client.invoke("list_buckets", Kwargs::new()).await.unwrap();

        assert_eq!(nested.name(), "delegated:tok");
        assert_eq!(session.calls()[0].session, "delegated:tok");
        assert_eq!(session.delegations(), vec![creds]);
    }
}
