// Storage module - handles in-memory row storage and indexing
// This module contains the core storage engine behind the embedded database

pub mod btree;
pub mod page;
pub mod table;

use anyhow::{anyhow, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Text layout accepted for TIME columns
pub const TIME_FORMAT: &str = "%H:%M:%S";
/// Text layout accepted for DATE columns
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Text layout accepted for TIMESTAMP columns
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Represents a single row in a table
/// Each Value is one column, in schema order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Row {
    pub values: Vec<Value>,
}

/// A single SQL value
/// Both bound parameters and stored column values use this type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Value {
    Null,
    Integer(i64),
    Text(String),
    Boolean(bool),
    Blob(Vec<u8>),
    Time(NaiveTime),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Compare two values of the same kind (used for WHERE clauses and indexes)
    /// Values of different kinds are not comparable
    pub fn compare(&self, other: &Value) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(std::cmp::Ordering::Equal),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Blob(a), Value::Blob(b)) => Some(a.cmp(b)),
            (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the value's kind, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Integer(_) => "INTEGER",
            Value::Text(_) => "TEXT",
            Value::Boolean(_) => "BOOLEAN",
            Value::Blob(_) => "BLOB",
            Value::Time(_) => "TIME",
            Value::Date(_) => "DATE",
            Value::Timestamp(_) => "TIMESTAMP",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Text(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Blob(bytes) => write!(f, "<{} bytes>", bytes.len()),
            Value::Time(t) => write!(f, "{}", t.format(TIME_FORMAT)),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Value::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
        }
    }
}

/// Represents the schema (structure) of a table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Schema {
    pub columns: Vec<Column>,
}

/// Represents a single column definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub primary_key: bool,
    pub nullable: bool,
}

/// The column types the engine supports
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DataType {
    Integer,
    Text,
    Boolean,
    Blob,
    Time,
    Date,
    Timestamp,
}

impl DataType {
    /// Convert a value into this column type
    ///
    /// Dates and times arrive as text far more often than as typed values,
    /// so text is parsed with the fixed layouts above. NULL passes through;
    /// nullability is checked by the table.
    pub fn coerce(&self, value: Value) -> Result<Value> {
        let coerced = match (self, value) {
            (_, Value::Null) => Value::Null,
            (DataType::Integer, v @ Value::Integer(_)) => v,
            (DataType::Integer, Value::Boolean(b)) => Value::Integer(i64::from(b)),
            (DataType::Text, v @ Value::Text(_)) => v,
            (DataType::Boolean, v @ Value::Boolean(_)) => v,
            (DataType::Boolean, Value::Integer(i)) => Value::Boolean(i != 0),
            (DataType::Blob, v @ Value::Blob(_)) => v,
            (DataType::Blob, Value::Text(s)) => Value::Blob(s.into_bytes()),
            (DataType::Time, v @ Value::Time(_)) => v,
            (DataType::Time, Value::Text(s)) => Value::Time(
                NaiveTime::parse_from_str(&s, TIME_FORMAT)
                    .map_err(|e| anyhow!("Invalid TIME '{}': {}", s, e))?,
            ),
            (DataType::Date, v @ Value::Date(_)) => v,
            (DataType::Date, Value::Text(s)) => Value::Date(
                NaiveDate::parse_from_str(&s, DATE_FORMAT)
                    .map_err(|e| anyhow!("Invalid DATE '{}': {}", s, e))?,
            ),
            (DataType::Date, Value::Timestamp(ts)) => Value::Date(ts.date()),
            (DataType::Timestamp, v @ Value::Timestamp(_)) => v,
            (DataType::Timestamp, Value::Date(d)) => Value::Timestamp(d.and_time(NaiveTime::default())),
            (DataType::Timestamp, Value::Text(s)) => Value::Timestamp(
                NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT)
                    .map_err(|e| anyhow!("Invalid TIMESTAMP '{}': {}", s, e))?,
            ),
            (data_type, other) => {
                return Err(anyhow!(
                    "Cannot store {} value in {:?} column",
                    other.kind(),
                    data_type
                ))
            }
        };
        Ok(coerced)
    }
}

impl Schema {
    /// Create a new schema with the given columns
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// Find the index of a column by name
    /// SQL identifiers are case-insensitive, so the lookup is too
    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|col| col.name.eq_ignore_ascii_case(name))
    }

    /// Get the primary key column index
    pub fn get_primary_key_index(&self) -> Option<usize> {
        self.columns.iter().position(|col| col.primary_key)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_text_into_temporal_columns() {
        assert_eq!(
            DataType::Time.coerce(Value::Text("06:30:00".into())).unwrap(),
            Value::Time(NaiveTime::from_hms_opt(6, 30, 0).unwrap())
        );
        assert_eq!(
            DataType::Date.coerce(Value::Text("2016-08-18".into())).unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2016, 8, 18).unwrap())
        );
        assert!(DataType::Timestamp
            .coerce(Value::Text("yesterday".into()))
            .is_err());
    }

    #[test]
    fn test_coerce_rejects_mismatched_kinds() {
        assert!(DataType::Integer.coerce(Value::Text("5".into())).is_err());
        assert_eq!(
            DataType::Boolean.coerce(Value::Integer(1)).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(DataType::Text.coerce(Value::Null).unwrap(), Value::Null);
    }
}
