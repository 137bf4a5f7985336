//! Grid records.
//!
//! A record keeps the column order of the query that produced it and
//! carries the row identifier under `recid`, which is how the grid
//! addresses rows in later delete and save calls.

use crate::error::{Error, Result};
use crate::value::Value;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Name of the synthetic identifier field expected by the grid
pub const RECID: &str = "recid";

/// An ordered list of field/value pairs
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Appends a field, keeping insertion order.
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.fields.push((name.into(), value));
    }

    /// Returns the first value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Returns the row identifier.
    pub fn recid(&self) -> Option<i64> {
        self.get(RECID).and_then(Value::as_integer)
    }

    /// Field names in order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(name, _)| name.as_str()).collect()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Builds records from a result set.
///
/// `columns` must start with the row identifier column. Each row becomes
/// a record with one field per column, in column order, followed by
/// `recid` holding the identifier. Values are passed through unchanged.
///
/// # Errors
///
/// Returns `Error::Storage` if a row is empty or its width does not match
/// the column list.
pub fn format_records(columns: &[String], rows: Vec<Vec<Value>>) -> Result<Vec<Record>> {
    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        if row.len() != columns.len() {
            return Err(Error::Storage(format!(
                "row has {} values but the query projected {} columns",
                row.len(),
                columns.len()
            )));
        }
        let recid = row
            .first()
            .cloned()
            .ok_or_else(|| Error::Storage("row is missing its identifier column".to_string()))?;

        let mut record = Record {
            fields: Vec::with_capacity(columns.len() + 1),
        };
        for (name, value) in columns.iter().zip(row) {
            record.push(name.clone(), value);
        }
        record.push(RECID, recid);
        records.push(record);
    }
    Ok(records)
}
