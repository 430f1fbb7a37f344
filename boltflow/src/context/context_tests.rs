//! Tests for the execution context.

use super::*;
use crate::client::{Credentials, Session};
use crate::pipeline::PipelineConfig;
use crate::testing::MockSession;
use std::sync::Arc;

fn credentials(token: &str) -> Credentials {
    Credentials {
        access_key_id: "AKIA".to_string(),
        secret_access_key: "secret".to_string(),
        session_token: token.to_string(),
        expiration: None,
    }
}

#[tokio::test]
async fn test_delegated_context_keeps_parent_binding() {
    let root = MockSession::new("root");
    let parent = ExecutionContext::new(root.clone());

    let nested = root.delegate(&credentials("t1")).await.unwrap();
    let child = parent.delegated(nested).unwrap();

    assert_eq!(parent.session().name(), "root");
    assert_eq!(parent.delegation_depth(), 0);
    assert_eq!(child.delegation_depth(), 1);
    assert_eq!(child.run_id(), parent.run_id());
    assert_ne!(child.session().name(), "root");
}

#[tokio::test]
async fn test_delegation_depth_is_bounded() {
    let root = MockSession::new("root");
    let config = PipelineConfig::default().with_max_delegation_depth(1);
    let parent = ExecutionContext::new(root.clone()).with_config(Arc::new(config));

    assert!(parent.check_delegation_depth().is_ok());
    let child = parent.delegated(root.clone()).unwrap();
    assert_eq!(child.check_delegation_depth().unwrap_err().kind(), "DelegationDepthExceeded");
    let err = child.delegated(root).unwrap_err();

    assert_eq!(err.kind(), "DelegationDepthExceeded");
}

#[test]
fn test_host_metadata() {
    let ctx = ExecutionContext::new(MockSession::new("root"))
        .with_host(serde_json::json!({"aws_request_id": "req-1"}));
    assert_eq!(ctx.host().unwrap()["aws_request_id"], "req-1");
}
