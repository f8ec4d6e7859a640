// B-Tree Index Implementation
// B-Trees keep keys sorted and give O(log n) lookups, which is why they are
// the default index structure of relational databases

use super::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Index structure using Rust's built-in BTreeMap
/// Maps a column value to the IDs of every row holding that value
#[derive(Debug, Clone)]
pub struct BTreeIndex {
    tree: BTreeMap<IndexKey, Vec<usize>>,
}

/// Wrapper for Value to make it totally ordered
/// Values of different kinds are ordered by kind first, so a column holding
/// NULLs next to integers still forms a consistent tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexKey(pub Value);

impl IndexKey {
    fn rank(&self) -> u8 {
        match self.0 {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Integer(_) => 2,
            Value::Text(_) => 3,
            Value::Blob(_) => 4,
            Value::Time(_) => 5,
            Value::Date(_) => 6,
            Value::Timestamp(_) => 7,
        }
    }
}

impl PartialOrd for IndexKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.0.compare(&other.0).unwrap_or(Ordering::Equal))
    }
}

impl BTreeIndex {
    /// Create a new, empty index
    pub fn new() -> Self {
        Self {
            tree: BTreeMap::new(),
        }
    }

    /// Record that `row_id` holds `value`
    pub fn insert(&mut self, value: Value, row_id: usize) {
        self.tree.entry(IndexKey(value)).or_default().push(row_id);
    }

    /// Look up the row IDs holding a value
    pub fn lookup(&self, value: &Value) -> Option<&Vec<usize>> {
        self.tree.get(&IndexKey(value.clone()))
    }

    /// Check whether any row holds a value
    pub fn contains(&self, value: &Value) -> bool {
        self.lookup(value).is_some_and(|ids| !ids.is_empty())
    }

    /// Remove a (value, row) pair from the index
    pub fn remove(&mut self, value: &Value, row_id: usize) {
        let key = IndexKey(value.clone());

        if let Some(row_ids) = self.tree.get_mut(&key) {
            row_ids.retain(|&id| id != row_id);

            // If no more rows have this value, remove the key entirely
            if row_ids.is_empty() {
                self.tree.remove(&key);
            }
        }
    }

    /// Get the number of distinct values in the index
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

impl Default for BTreeIndex {
    fn default() -> Self {
        Self::new()
    }
}
