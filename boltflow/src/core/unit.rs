//! Items, histories and pipeline units.

use serde::{Deserialize, Serialize};
use std::ops::Index;

/// The current record value flowing through the pipeline.
///
/// Mapping items keep their key order.
pub type Item = serde_json::Value;

/// Ordered, append-only sequence of the items produced by earlier stages
/// for one record lineage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History(Vec<Item>);

impl History {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new history with `item` appended.
    ///
    /// The receiver is left untouched.
    #[must_use]
    pub fn appended(&self, item: Item) -> Self {
        let mut entries = Vec::with_capacity(self.0.len() + 1);
        entries.extend(self.0.iter().cloned());
        entries.push(item);
        Self(entries)
    }

    /// Returns the entry at `index`, oldest first.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Item> {
        self.0.get(index)
    }

    /// Returns the most recent entry.
    #[must_use]
    pub fn last(&self) -> Option<&Item> {
        self.0.last()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no stage has produced anything yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the entries in execution order.
    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.0.iter()
    }

    /// Returns the entries as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Item] {
        &self.0
    }
}

impl Index<usize> for History {
    type Output = Item;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl From<Vec<Item>> for History {
    fn from(entries: Vec<Item>) -> Self {
        Self(entries)
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// An (item, history) pair.
///
/// Units are never mutated once yielded; a stage consumes a unit and
/// yields new ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineUnit {
    /// The current value.
    pub item: Item,
    /// Outputs of every earlier stage for this lineage.
    pub history: History,
}

impl PipelineUnit {
    /// Creates a unit entering the pipeline, with an empty history.
    #[must_use]
    pub fn initial(item: Item) -> Self {
        Self {
            item,
            history: History::new(),
        }
    }

    /// Creates a unit from its parts.
    #[must_use]
    pub fn new(item: Item, history: History) -> Self {
        Self { item, history }
    }

    /// Derives a child unit: the child's history is this unit's history
    /// followed by the child item itself.
    #[must_use]
    pub fn derive(&self, item: Item) -> Self {
        Self {
            history: self.history.appended(item.clone()),
            item,
        }
    }

    /// Consumes the unit, returning its item.
    #[must_use]
    pub fn into_item(self) -> Item {
        self.item
    }
}
