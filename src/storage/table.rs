// Table implementation
// A table combines schema, data (pages), and indexes

use super::{btree::BTreeIndex, page::PageManager, DataType, Row, Schema, Value};
use anyhow::{anyhow, Result};
use std::collections::HashMap;

/// Rows per page
const PAGE_ROWS: usize = 100;

/// Represents a database table
pub struct Table {
    /// The name of the table
    pub name: String,
    /// The schema (column definitions)
    pub schema: Schema,
    /// Page-based storage for rows
    page_manager: PageManager,
    /// Indexes keyed by lower-cased column name
    indexes: HashMap<String, BTreeIndex>,
    /// Next value handed out for a generated INTEGER PRIMARY KEY
    next_key: i64,
}

impl Table {
    /// Create a new table with the given name and schema
    pub fn new(name: String, schema: Schema) -> Self {
        let mut table = Self {
            name,
            schema,
            page_manager: PageManager::new(PAGE_ROWS),
            indexes: HashMap::new(),
            next_key: 1,
        };

        // The primary key is always indexed; uniqueness checks rely on it
        if let Some(pk_index) = table.schema.get_primary_key_index() {
            let pk_name = table.schema.columns[pk_index].name.to_ascii_lowercase();
            table.indexes.insert(pk_name, BTreeIndex::new());
        }

        table
    }

    /// Insert a full row (one value per column, in schema order)
    ///
    /// An INTEGER PRIMARY KEY given as NULL is generated. Returns the row ID
    /// and the generated key, if any.
    pub fn insert(&mut self, values: Vec<Value>) -> Result<(usize, Option<i64>)> {
        if values.len() != self.schema.columns.len() {
            return Err(anyhow!(
                "Expected {} values, got {}",
                self.schema.columns.len(),
                values.len()
            ));
        }

        let mut generated = None;
        let mut stored = Vec::with_capacity(values.len());
        for (column, value) in self.schema.columns.iter().zip(values) {
            let mut value = column.data_type.coerce(value)?;
            if value.is_null() && column.primary_key && column.data_type == DataType::Integer {
                generated = Some(self.next_key);
                value = Value::Integer(self.next_key);
            }
            stored.push(value);
        }
        self.check_row(&stored, None)?;

        let row_id = self.page_manager.insert(Row {
            values: stored.clone(),
        });
        self.index_row(&stored, row_id);
        self.track_key(&stored);

        Ok((row_id, generated))
    }

    /// Validate NOT NULL and PRIMARY KEY constraints for a candidate row
    /// `existing` is the row ID being replaced, if any
    fn check_row(&self, values: &[Value], existing: Option<usize>) -> Result<()> {
        for (column, value) in self.schema.columns.iter().zip(values) {
            if value.is_null() && (!column.nullable || column.primary_key) {
                return Err(anyhow!(
                    "Column '{}.{}' may not be NULL",
                    self.name,
                    column.name
                ));
            }
        }

        if let Some(pk_index) = self.schema.get_primary_key_index() {
            let pk_value = &values[pk_index];
            let pk_name = self.schema.columns[pk_index].name.to_ascii_lowercase();
            if let Some(ids) = self.indexes.get(&pk_name).and_then(|i| i.lookup(pk_value)) {
                if ids.iter().any(|id| Some(*id) != existing) {
                    return Err(anyhow!(
                        "Primary key violation: duplicate value {} in '{}'",
                        pk_value,
                        self.name
                    ));
                }
            }
        }

        Ok(())
    }

    fn index_row(&mut self, values: &[Value], row_id: usize) {
        for (column, value) in self.schema.columns.iter().zip(values) {
            if let Some(index) = self.indexes.get_mut(&column.name.to_ascii_lowercase()) {
                index.insert(value.clone(), row_id);
            }
        }
    }

    fn unindex_row(&mut self, values: &[Value], row_id: usize) {
        for (column, value) in self.schema.columns.iter().zip(values) {
            if let Some(index) = self.indexes.get_mut(&column.name.to_ascii_lowercase()) {
                index.remove(value, row_id);
            }
        }
    }

    fn track_key(&mut self, values: &[Value]) {
        if let Some(pk_index) = self.schema.get_primary_key_index() {
            if let Value::Integer(key) = values[pk_index] {
                self.next_key = self.next_key.max(key + 1);
            }
        }
    }

    /// Get a live row by ID
    pub fn get(&self, row_id: usize) -> Option<&Row> {
        self.page_manager.get(row_id)
    }

    /// All live rows with their IDs, in insertion order
    pub fn scan(&self) -> Vec<(usize, &Row)> {
        self.page_manager.scan()
    }

    /// Probe the index of a column, if one exists
    /// Returns None when the column is not indexed (caller must scan)
    pub fn lookup(&self, column_name: &str, value: &Value) -> Option<Vec<usize>> {
        let index = self.indexes.get(&column_name.to_ascii_lowercase())?;
        Some(index.lookup(value).cloned().unwrap_or_default())
    }

    /// Apply column changes to one row
    /// Returns the row as it was before the update
    pub fn update_row(&mut self, row_id: usize, changes: &[(usize, Value)]) -> Result<Row> {
        let old = self
            .page_manager
            .get(row_id)
            .cloned()
            .ok_or_else(|| anyhow!("Row {} not found in '{}'", row_id, self.name))?;

        let mut values = old.values.clone();
        for (col_index, value) in changes {
            let column = &self.schema.columns[*col_index];
            values[*col_index] = column.data_type.coerce(value.clone())?;
        }
        self.check_row(&values, Some(row_id))?;

        self.replace_row(row_id, Row { values });
        Ok(old)
    }

    /// Overwrite a live row, keeping indexes in step
    pub fn replace_row(&mut self, row_id: usize, row: Row) {
        if let Some(current) = self.page_manager.get(row_id).cloned() {
            self.unindex_row(&current.values, row_id);
        }
        self.index_row(&row.values, row_id);
        self.track_key(&row.values);
        if let Some(slot) = self.page_manager.get_mut(row_id) {
            *slot = row;
        }
    }

    /// Delete one row, returning it
    pub fn delete_row(&mut self, row_id: usize) -> Option<Row> {
        let row = self.page_manager.delete(row_id)?;
        self.unindex_row(&row.values, row_id);
        Some(row)
    }

    /// Put a deleted row back under its original ID
    pub fn restore_row(&mut self, row_id: usize, row: Row) {
        self.index_row(&row.values, row_id);
        self.page_manager.restore(row_id, row);
    }

    /// Create an index on a column
    pub fn create_index(&mut self, column_name: &str) -> Result<()> {
        let col_index = self
            .schema
            .get_column_index(column_name)
            .ok_or_else(|| anyhow!("Column not found: {}", column_name))?;

        let key = column_name.to_ascii_lowercase();
        if self.indexes.contains_key(&key) {
            return Err(anyhow!("Index already exists on column: {}", column_name));
        }

        // Index all existing rows
        let mut index = BTreeIndex::new();
        for (row_id, row) in self.page_manager.scan() {
            index.insert(row.values[col_index].clone(), row_id);
        }

        self.indexes.insert(key, index);
        Ok(())
    }

    /// Remove a secondary index
    pub fn drop_index(&mut self, column_name: &str) {
        self.indexes.remove(&column_name.to_ascii_lowercase());
    }

    /// Get the number of rows in the table
    pub fn row_count(&self) -> usize {
        self.page_manager.total_rows()
    }

    /// Get the schema of the table
    pub fn get_schema(&self) -> &Schema {
        &self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Column;

    fn stations() -> Table {
        Table::new(
            "stations".to_string(),
            Schema::new(vec![
                Column {
                    name: "id".into(),
                    data_type: DataType::Integer,
                    primary_key: true,
                    nullable: false,
                },
                Column {
                    name: "code".into(),
                    data_type: DataType::Text,
                    primary_key: false,
                    nullable: false,
                },
            ]),
        )
    }

    #[test]
    fn test_generated_keys_follow_explicit_ones() {
        let mut table = stations();
        let (_, generated) = table
            .insert(vec![Value::Integer(7), Value::Text("KPIT".into())])
            .unwrap();
        assert_eq!(generated, None);

        let (row_id, generated) = table
            .insert(vec![Value::Null, Value::Text("KAGC".into())])
            .unwrap();
        assert_eq!(generated, Some(8));
        assert_eq!(table.get(row_id).unwrap().values[0], Value::Integer(8));
    }

    #[test]
    fn test_constraints() {
        let mut table = stations();
        table
            .insert(vec![Value::Integer(1), Value::Text("KPIT".into())])
            .unwrap();

        assert!(table
            .insert(vec![Value::Integer(1), Value::Text("KAGC".into())])
            .is_err());
        assert!(table.insert(vec![Value::Integer(2), Value::Null]).is_err());
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_update_delete_and_restore_keep_index_in_step() {
        let mut table = stations();
        let (row_id, _) = table
            .insert(vec![Value::Integer(1), Value::Text("KPIT".into())])
            .unwrap();
        table.create_index("code").unwrap();

        let old = table
            .update_row(row_id, &[(1, Value::Text("KAGC".into()))])
            .unwrap();
        assert_eq!(table.lookup("code", &Value::Text("KPIT".into())), Some(vec![]));
        assert_eq!(
            table.lookup("code", &Value::Text("KAGC".into())),
            Some(vec![row_id])
        );

        table.replace_row(row_id, old);
        let removed = table.delete_row(row_id).unwrap();
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.lookup("id", &Value::Integer(1)), Some(vec![]));

        table.restore_row(row_id, removed);
        assert_eq!(
            table.lookup("code", &Value::Text("KPIT".into())),
            Some(vec![row_id])
        );
    }
}
