//! Key casing normalization for services with non-standard naming.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How call argument keys are cased before invoking an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyCasing {
    /// Keys are passed as written.
    #[default]
    Preserve,
    /// The first letter of every key is lowercased, recursively.
    LowerFirst,
}

impl KeyCasing {
    /// Applies the casing to a mapping of call arguments.
    #[must_use]
    pub fn apply(self, kwargs: Map<String, Value>) -> Map<String, Value> {
        match self {
            Self::Preserve => kwargs,
            Self::LowerFirst => normalize_key_casing(&kwargs),
        }
    }
}

/// Lowercases the first character of every key, descending into nested
/// mappings. Arrays and scalars are left untouched.
#[must_use]
pub fn normalize_key_casing(mapping: &Map<String, Value>) -> Map<String, Value> {
    mapping
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::Object(nested) => Value::Object(normalize_key_casing(nested)),
                other => other.clone(),
            };
            (lower_first(key), value)
        })
        .collect()
}

fn lower_first(key: &str) -> String {
    let mut chars = key.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_lowercase().chain(chars).collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_lowercases_first_letter_only() {
        let out = normalize_key_casing(&as_map(json!({"JobQueue": "q", "JobName": "n"})));
        assert_eq!(Value::Object(out), json!({"jobQueue": "q", "jobName": "n"}));
    }

    #[test]
    fn test_recurses_into_nested_mappings() {
        let input = as_map(json!({
            "ContainerOverrides": {"Command": ["Echo", "Hi"], "Environment": {"Name": "X"}},
            "Count": 3
        }));
        let out = normalize_key_casing(&input);

        assert_eq!(out.len(), input.len());
        assert_eq!(
            Value::Object(out),
            json!({
                "containerOverrides": {"command": ["Echo", "Hi"], "environment": {"name": "X"}},
                "count": 3
            })
        );
    }

    #[test]
    fn test_arrays_of_mappings_are_untouched() {
        let out = normalize_key_casing(&as_map(json!({"Tags": [{"Key": "a"}]})));
        assert_eq!(Value::Object(out), json!({"tags": [{"Key": "a"}]}));
    }

    #[test]
    fn test_empty_key_survives() {
        let out = normalize_key_casing(&as_map(json!({"": 1})));
        assert_eq!(out.get(""), Some(&json!(1)));
    }

    #[test]
    fn test_preserve_is_identity() {
        let input = as_map(json!({"Key": 1}));
        assert_eq!(KeyCasing::Preserve.apply(input.clone()), input);
    }
}
