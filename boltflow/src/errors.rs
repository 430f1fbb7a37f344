//! Error types for the boltflow framework.
//!
//! Failures fall in two families. Per-item failures ([`ArgumentError`],
//! [`InvocationError`]) are isolated by operation bolts: the offending item
//! is logged and dropped. Pipeline-fatal failures ([`PipelineError`]) travel
//! down the stream as an `Err` item and end the run.
//!
//! Bolts never escalate per-item failures. The `ArgumentResolution` and
//! `Invocation` variants exist so host code (chain builders, direct client
//! calls in the entry point) can propagate them with `?`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// The main error type for boltflow operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The resolved client does not expose the requested operation.
    #[error("Client operation '{service}.{operation}' does not exist")]
    OperationNotFound {
        /// The service name.
        service: String,
        /// The operation name.
        operation: String,
    },

    /// Arguments could not be resolved outside a bolt, e.g. in a chain builder.
    #[error("{0}")]
    ArgumentResolution(#[from] ArgumentError),

    /// An external call made by host code failed.
    #[error("{0}")]
    Invocation(#[from] InvocationError),

    /// A caller-supplied transform function failed.
    #[error("Transform '{bolt}' failed: {source}")]
    Transform {
        /// The name of the failing bolt.
        bolt: String,
        /// The item being transformed.
        item: serde_json::Value,
        /// The underlying error.
        #[source]
        source: anyhow::Error,
    },

    /// An inbound event record could not be decoded.
    #[error("Failed to decode event record {index}: {message}")]
    EventDecode {
        /// Position of the record in the inbound batch.
        index: usize,
        /// Decoder message.
        message: String,
    },

    /// Delegated sessions were nested deeper than allowed.
    #[error("Maximum delegation depth ({max_depth}) exceeded")]
    DelegationDepthExceeded {
        /// The configured maximum.
        max_depth: u32,
    },

    /// Invalid pipeline configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Creates an operation-not-found error.
    #[must_use]
    pub fn operation_not_found(service: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::OperationNotFound {
            service: service.into(),
            operation: operation.into(),
        }
    }

    /// Short name of the error kind, used in logs and events.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OperationNotFound { .. } => "OperationNotFound",
            Self::ArgumentResolution(err) => err.kind(),
            Self::Invocation(_) => "ExternalInvocationFailure",
            Self::Transform { .. } => "TransformFailure",
            Self::EventDecode { .. } => "EventDecode",
            Self::DelegationDepthExceeded { .. } => "DelegationDepthExceeded",
            Self::Configuration(_) => "Configuration",
            Self::Serialization(_) => "Serialization",
            Self::Io(_) => "Io",
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!(self.kind()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));

        match self {
            Self::OperationNotFound { service, operation } => {
                map.insert("service".to_string(), serde_json::json!(service));
                map.insert("operation".to_string(), serde_json::json!(operation));
            }
            Self::Transform { bolt, item, .. } => {
                map.insert("bolt".to_string(), serde_json::json!(bolt));
                map.insert("item".to_string(), item.clone());
            }
            Self::Invocation(err) => {
                map.insert("error".to_string(), serde_json::json!(err.kind));
                map.insert("errorDetail".to_string(), serde_json::json!(err.detail));
            }
            _ => {}
        }

        map
    }
}

/// Errors raised while mapping an item onto call arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    /// A sequence item does not have as many elements as declared keys.
    #[error("Arity mismatch: expected {expected} argument(s), item has {actual}")]
    ArityMismatch {
        /// Number of declared argument keys.
        expected: usize,
        /// Number of elements in the item.
        actual: usize,
    },

    /// The item shape cannot be mapped onto arguments.
    #[error("Unsupported item shape: {shape}")]
    UnsupportedItemShape {
        /// Description of the offending shape.
        shape: String,
    },
}

impl ArgumentError {
    /// Creates an unsupported shape error.
    #[must_use]
    pub fn unsupported(shape: impl Into<String>) -> Self {
        Self::UnsupportedItemShape {
            shape: shape.into(),
        }
    }

    /// Short name of the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ArityMismatch { .. } => "ArityMismatch",
            Self::UnsupportedItemShape { .. } => "UnsupportedItemShape",
        }
    }
}

/// A failure raised by the external capability during a call.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {detail}")]
pub struct InvocationError {
    /// Error kind (e.g. "ThrottlingException").
    pub kind: String,
    /// Human readable detail.
    pub detail: String,
}

impl InvocationError {
    /// Creates a new invocation error.
    #[must_use]
    pub fn new(kind: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            detail: detail.into(),
        }
    }
}

/// Describes a JSON value's shape for error messages.
pub(crate) fn shape_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "sequence",
        serde_json::Value::Object(_) => "mapping",
    }
}
