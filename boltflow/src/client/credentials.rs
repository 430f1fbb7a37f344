//! Temporary credentials returned by a privilege elevation call.

use crate::errors::ArgumentError;
use serde::{Deserialize, Serialize};

/// Temporary credentials, as found under the `Credentials` field of an
/// elevation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Credentials {
    /// Access key id.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Session token.
    pub session_token: String,
    /// Expiration timestamp, if the service reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<String>,
}

impl Credentials {
    /// Extracts the credentials from an elevation result.
    ///
    /// # Errors
    ///
    /// Returns an error if the result has no well-formed `Credentials` field.
    pub fn from_result(result: &serde_json::Value) -> Result<Self, ArgumentError> {
        let raw = result
            .get("Credentials")
            .ok_or_else(|| ArgumentError::unsupported("elevation result without Credentials"))?;
        serde_json::from_value(raw.clone())
            .map_err(|err| ArgumentError::unsupported(format!("malformed Credentials: {err}")))
    }
}
