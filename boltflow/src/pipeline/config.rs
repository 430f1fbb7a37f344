//! Pipeline configuration.

use crate::errors::{PipelineError, PipelineResult};
use crate::observability::{init_tracing, LogFormat};
use crate::utils::KeyCasing;
use serde::{Deserialize, Serialize};

/// Services whose APIs expect lower-camel-cased argument keys.
pub const DEFAULT_CAMEL_CASED_SERVICES: &[&str] = &["batch"];

/// Default maximum nesting of delegated sessions.
pub const DEFAULT_MAX_DELEGATION_DEPTH: u32 = 5;

/// Configuration shared by the driver and every bolt of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Services that get [`KeyCasing::LowerFirst`] applied to call arguments.
    pub camel_cased_services: Vec<String>,
    /// Maximum nesting of delegated sessions.
    pub max_delegation_depth: u32,
    /// Field holding the record list in an inbound batch event.
    pub records_field: String,
    /// Field holding a record's serialized payload.
    pub body_field: String,
    /// Log every materialized item at debug level once a run completes.
    pub log_results: bool,
    /// Output format used by [`PipelineConfig::init_tracing`].
    pub log_format: LogFormat,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            camel_cased_services: DEFAULT_CAMEL_CASED_SERVICES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            max_delegation_depth: DEFAULT_MAX_DELEGATION_DEPTH,
            records_field: "Records".to_string(),
            body_field: "body".to_string(),
            log_results: true,
            log_format: LogFormat::Text,
        }
    }
}

impl PipelineConfig {
    /// Parses a configuration from JSON; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the result is invalid.
    pub fn from_json(raw: &str) -> PipelineResult<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the camel-cased services.
    #[must_use]
    pub fn with_camel_cased_services<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.camel_cased_services = services.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the maximum delegation depth.
    #[must_use]
    pub fn with_max_delegation_depth(mut self, depth: u32) -> Self {
        self.max_delegation_depth = depth;
        self
    }

    /// Enables or disables result logging.
    #[must_use]
    pub fn with_log_results(mut self, enabled: bool) -> Self {
        self.log_results = enabled;
        self
    }

    /// Sets the log output format.
    #[must_use]
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Installs the process-wide tracing subscriber in this configuration's
    /// log format. `RUST_LOG` wins over `level` when set.
    pub fn init_tracing(&self, level: &str) {
        init_tracing(level, self.log_format);
    }

    /// Returns the key casing for a service.
    #[must_use]
    pub fn key_casing_for(&self, service: &str) -> KeyCasing {
        if self.camel_cased_services.iter().any(|s| s == service) {
            KeyCasing::LowerFirst
        } else {
            KeyCasing::Preserve
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a field name is empty.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.records_field.is_empty() || self.body_field.is_empty() {
            return Err(PipelineError::Configuration(
                "records_field and body_field must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
