//! Assertions over pipeline units.

use crate::core::{Item, PipelineUnit};

/// Asserts that every unit carries `expected` history entries.
pub fn assert_history_len(units: &[PipelineUnit], expected: usize) {
    for (index, unit) in units.iter().enumerate() {
        assert_eq!(
            unit.history.len(),
            expected,
            "Unit {} has history of length {}, expected {}: {:?}",
            index,
            unit.history.len(),
            expected,
            unit.history
        );
    }
}

/// Asserts that a unit's history ends with its own item.
pub fn assert_lineage(unit: &PipelineUnit) {
    assert_eq!(
        unit.history.last(),
        Some(&unit.item),
        "Expected history to end with the current item {:?}, got {:?}",
        unit.item,
        unit.history
    );
}

/// Asserts the items carried by `units`, in order.
pub fn assert_items(units: &[PipelineUnit], expected: &[Item]) {
    let actual: Vec<&Item> = units.iter().map(|unit| &unit.item).collect();
    let expected: Vec<&Item> = expected.iter().collect();
    assert_eq!(actual, expected, "Unexpected items in units");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lineage_assertions() {
        let unit = PipelineUnit::initial(json!(1)).derive(json!(2));
        assert_lineage(&unit);
        assert_history_len(std::slice::from_ref(&unit), 1);
        assert_items(&[unit], &[json!(2)]);
    }

    #[test]
    #[should_panic(expected = "history of length")]
    fn test_history_len_mismatch_panics() {
        assert_history_len(&[PipelineUnit::initial(json!(1))], 1);
    }
}
