//! Normalization of "one value or many" results into a uniform sequence.

use serde_json::Value;
use std::fmt;

/// A lazy, single-pass sequence of produced values.
pub struct Sequence(Box<dyn Iterator<Item = Value> + Send>);

impl Sequence {
    /// Wraps any sendable iterator.
    pub fn new<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: Send + 'static,
    {
        Self(Box::new(iter.into_iter()))
    }

    /// A sequence with no values.
    #[must_use]
    pub fn empty() -> Self {
        Self(Box::new(std::iter::empty()))
    }

    /// A sequence with exactly one value.
    #[must_use]
    pub fn once(value: Value) -> Self {
        Self(Box::new(std::iter::once(value)))
    }
}

impl Iterator for Sequence {
    type Item = Value;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence").finish_non_exhaustive()
    }
}

/// What a post-processing or transform function hands back.
///
/// A [`Value`] is always one produced value, even when it is a string,
/// a mapping or an array. Only an explicit [`Sequence`] fans out.
#[derive(Debug)]
pub enum Produced {
    /// Exactly one value (`Value::Null` means "nothing").
    Single(Value),
    /// Zero or more values, pulled lazily.
    Many(Sequence),
}

impl Produced {
    /// Nothing was produced.
    #[must_use]
    pub fn none() -> Self {
        Self::Many(Sequence::empty())
    }

    /// A lazy sequence from any sendable iterator.
    pub fn many<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: Send + 'static,
    {
        Self::Many(Sequence::new(iter))
    }

    /// Converts into a sequence without decomposing single values.
    #[must_use]
    pub fn into_sequence(self) -> Sequence {
        match self {
            Self::Single(value) => Sequence::once(value),
            Self::Many(seq) => seq,
        }
    }
}

impl From<Value> for Produced {
    fn from(value: Value) -> Self {
        Self::Single(value)
    }
}

impl From<Option<Value>> for Produced {
    fn from(value: Option<Value>) -> Self {
        value.map_or_else(Self::none, Self::Single)
    }
}

impl From<Sequence> for Produced {
    fn from(seq: Sequence) -> Self {
        Self::Many(seq)
    }
}

impl From<Vec<Value>> for Produced {
    fn from(values: Vec<Value>) -> Self {
        Self::many(values)
    }
}

/// Normalizes a single value or a sequence into a sequence.
///
/// A sequence is returned unchanged; anything else becomes a
/// one-element sequence. `Value::Null` is not filtered here.
pub fn normalize_to_sequence(value: impl Into<Produced>) -> Sequence {
    value.into().into_sequence()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_string_is_not_decomposed() {
        let values: Vec<Value> = normalize_to_sequence(json!("abc")).collect();
        assert_eq!(values, vec![json!("abc")]);
    }

    #[test]
    fn test_mapping_and_array_are_single_values() {
        let values: Vec<Value> = normalize_to_sequence(json!({"a": 1, "b": 2})).collect();
        assert_eq!(values.len(), 1);

        let values: Vec<Value> = normalize_to_sequence(json!([1, 2, 3])).collect();
        assert_eq!(values, vec![json!([1, 2, 3])]);
    }

    #[test]
    fn test_sequence_passes_through() {
        let seq = Sequence::new(vec![json!(1), json!(2)]);
        let values: Vec<Value> = normalize_to_sequence(seq).collect();
        assert_eq!(values, vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let once: Vec<Value> = normalize_to_sequence(json!({"k": "v"})).collect();
        let twice: Vec<Value> =
            normalize_to_sequence(normalize_to_sequence(json!({"k": "v"}))).collect();
        assert_eq!(once, twice);

        let many = || Produced::many(vec![json!(1), json!(2), json!(3)]);
        let once: Vec<Value> = normalize_to_sequence(many()).collect();
        let twice: Vec<Value> = normalize_to_sequence(normalize_to_sequence(many())).collect();
        assert_eq!(once, twice);
        assert_eq!(once.len(), 3);
    }

    #[test]
    fn test_null_is_kept() {
        let values: Vec<Value> = normalize_to_sequence(Value::Null).collect();
        assert_eq!(values, vec![Value::Null]);
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(normalize_to_sequence(None::<Value>).count(), 0);
        assert_eq!(normalize_to_sequence(Some(json!(1))).count(), 1);
    }
}
