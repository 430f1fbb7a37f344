//! Identifies an external operation.

use super::Kwargs;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A service operation, with the options used to build its client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Service name (e.g. "sqs").
    pub service: String,
    /// Operation name (e.g. "send_message").
    pub name: String,
    /// Client construction options (e.g. region).
    #[serde(default, skip_serializing_if = "Kwargs::is_empty")]
    pub client_options: Kwargs,
}

impl Operation {
    /// Creates a new operation identifier.
    #[must_use]
    pub fn new(service: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            name: name.into(),
            client_options: Kwargs::new(),
        }
    }

    /// Adds a client construction option.
    #[must_use]
    pub fn with_client_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.client_options.insert(key.into(), value);
        self
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.service, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let op = Operation::new("sts", "assume_role").with_client_option("region_name", "eu-west-1".into());
        assert_eq!(op.to_string(), "sts.assume_role");
        assert_eq!(op.client_options.len(), 1);
    }
}
