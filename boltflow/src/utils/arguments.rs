//! Mapping the current item onto operation call arguments.

use crate::errors::{shape_of, ArgumentError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The call arguments that vary with each item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgumentSpec {
    /// One argument name.
    Key(String),
    /// Several argument names.
    Keys(Vec<String>),
}

impl ArgumentSpec {
    /// A single varying argument.
    #[must_use]
    pub fn key(name: impl Into<String>) -> Self {
        Self::Key(name.into())
    }

    /// Several varying arguments.
    #[must_use]
    pub fn keys<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Keys(names.into_iter().map(Into::into).collect())
    }
}

/// Produces the keyword arguments for an external call from the current item.
///
/// - A single key takes the matching field of a mapping item, or the whole
///   item when the item is not a mapping or lacks the key.
/// - Several keys take the fields present in a mapping item, or zip
///   positionally with a sequence item of the same length.
///
/// # Errors
///
/// Returns [`ArgumentError::ArityMismatch`] when a sequence item has a
/// different length than the declared keys, and
/// [`ArgumentError::UnsupportedItemShape`] for scalar items with several keys.
pub fn resolve_call_arguments(
    spec: &ArgumentSpec,
    item: &Value,
) -> Result<Map<String, Value>, ArgumentError> {
    let mut kwargs = Map::new();

    match (spec, item) {
        (ArgumentSpec::Key(key), Value::Object(fields)) if fields.contains_key(key) => {
            kwargs.insert(key.clone(), fields[key].clone());
        }
        (ArgumentSpec::Key(key), whole) => {
            kwargs.insert(key.clone(), whole.clone());
        }
        (ArgumentSpec::Keys(keys), Value::Object(fields)) => {
            for key in keys {
                if let Some(value) = fields.get(key) {
                    kwargs.insert(key.clone(), value.clone());
                }
            }
        }
        (ArgumentSpec::Keys(keys), Value::Array(values)) => {
            if keys.len() != values.len() {
                return Err(ArgumentError::ArityMismatch {
                    expected: keys.len(),
                    actual: values.len(),
                });
            }
            kwargs.extend(keys.iter().cloned().zip(values.iter().cloned()));
        }
        (ArgumentSpec::Keys(_), other) => {
            return Err(ArgumentError::unsupported(shape_of(other)));
        }
    }

    Ok(kwargs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_single_key_extracts_field() {
        let spec = ArgumentSpec::key("RoleArn");
        let out = resolve_call_arguments(&spec, &json!({"RoleArn": "arn:1", "Other": 2})).unwrap();
        assert_eq!(Value::Object(out), json!({"RoleArn": "arn:1"}));
    }

    #[test]
    fn test_single_key_wraps_whole_item() {
        let spec = ArgumentSpec::key("RoleArn");
        let out = resolve_call_arguments(&spec, &json!("arn:1")).unwrap();
        assert_eq!(Value::Object(out), json!({"RoleArn": "arn:1"}));

        let out = resolve_call_arguments(&spec, &json!({"Other": 2})).unwrap();
        assert_eq!(Value::Object(out), json!({"RoleArn": {"Other": 2}}));
    }

    #[test]
    fn test_keys_extract_present_fields() {
        let spec = ArgumentSpec::keys(["Bucket", "Key", "VersionId"]);
        let out = resolve_call_arguments(&spec, &json!({"Bucket": "b", "Key": "k", "x": 1})).unwrap();
        assert_eq!(Value::Object(out), json!({"Bucket": "b", "Key": "k"}));
    }

    #[test]
    fn test_keys_zip_sequence() {
        let spec = ArgumentSpec::keys(["Bucket", "Key"]);
        let out = resolve_call_arguments(&spec, &json!(["b", "k"])).unwrap();
        assert_eq!(Value::Object(out), json!({"Bucket": "b", "Key": "k"}));
    }

    #[test]
    fn test_keys_arity_mismatch() {
        let spec = ArgumentSpec::keys(["Bucket", "Key"]);
        let err = resolve_call_arguments(&spec, &json!(["b"])).unwrap_err();
        assert_eq!(err, ArgumentError::ArityMismatch { expected: 2, actual: 1 });
    }

    #[test]
    fn test_keys_with_scalar_is_unsupported() {
        let spec = ArgumentSpec::keys(["Bucket"]);
        let err = resolve_call_arguments(&spec, &json!(42)).unwrap_err();
        assert_eq!(err.kind(), "UnsupportedItemShape");
    }

    #[test]
    fn test_spec_deserializes_untagged() {
        let single: ArgumentSpec = serde_json::from_value(json!("QueueUrl")).unwrap();
        assert_eq!(single, ArgumentSpec::key("QueueUrl"));

        let many: ArgumentSpec = serde_json::from_value(json!(["A", "B"])).unwrap();
        assert_eq!(many, ArgumentSpec::keys(["A", "B"]));
    }
}
