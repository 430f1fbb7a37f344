//! The external capability bolts call into.
//!
//! Concrete cloud clients live outside this crate. Bolts only need a
//! [`Session`] able to hand out [`Client`]s for a service name, and a way
//! to open a new session from temporary credentials.

mod credentials;
mod operation;

pub use credentials::Credentials;
pub use operation::Operation;

use crate::errors::InvocationError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::{Map, Value};
use std::fmt::Debug;
use std::sync::Arc;

/// Keyword arguments passed to an operation.
pub type Kwargs = Map<String, Value>;

/// A stream of result pages.
pub type PageStream = BoxStream<'static, Result<Value, InvocationError>>;

/// An authenticated session able to build service clients.
#[async_trait]
pub trait Session: Send + Sync + Debug {
    /// A label for diagnostics (profile, role session name, ...).
    fn name(&self) -> &str;

    /// Resolves the client for a service.
    async fn client(&self, service: &str, options: &Kwargs) -> Result<Arc<dyn Client>, InvocationError>;

    /// Opens a new session scoped to temporary credentials.
    async fn delegate(&self, credentials: &Credentials) -> Result<Arc<dyn Session>, InvocationError>;
}

/// A low level service client.
#[async_trait]
pub trait Client: Send + Sync + Debug {
    /// The service this client talks to.
    fn service(&self) -> &str;

    /// Returns true if the client exposes the named operation.
    fn has_operation(&self, name: &str) -> bool;

    /// Invokes a single, non-paginated operation.
    async fn invoke(&self, name: &str, kwargs: Kwargs) -> Result<Value, InvocationError>;

    /// Iterates over every page of a paginated operation.
    fn paginate(&self, name: &str, kwargs: Kwargs) -> PageStream;
}
