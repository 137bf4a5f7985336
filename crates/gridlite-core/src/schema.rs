//! Table metadata.
//!
//! A [`TableSchema`] is the allow-list of columns for one table. Every
//! field name that reaches generated SQL has been looked up here first.

use crate::error::{Error, Result};
use std::fmt;

/// Type category of a column, derived from its declared type using
/// SQLite's affinity rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Text,
    Blob,
    Integer,
    Real,
    Numeric,
    /// No declared type; the column may hold any storage class
    Untyped,
}

impl TypeCategory {
    /// Derives the category from a declared column type.
    ///
    /// Follows the order of SQLite's affinity rules: INT, then
    /// CHAR/CLOB/TEXT, then BLOB, then REAL/FLOA/DOUB, otherwise NUMERIC.
    /// A column without a declared type is `Untyped`.
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.trim().to_ascii_uppercase();
        if upper.is_empty() {
            TypeCategory::Untyped
        } else if upper.contains("INT") {
            TypeCategory::Integer
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            TypeCategory::Text
        } else if upper.contains("BLOB") {
            TypeCategory::Blob
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            TypeCategory::Real
        } else {
            TypeCategory::Numeric
        }
    }

    /// Returns true for categories searched with text operators.
    pub fn is_textual(&self) -> bool {
        matches!(self, TypeCategory::Text | TypeCategory::Blob)
    }

    /// Returns true for categories searched with numeric comparisons.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            TypeCategory::Integer | TypeCategory::Real | TypeCategory::Numeric
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TypeCategory::Text => "TEXT",
            TypeCategory::Blob => "BLOB",
            TypeCategory::Integer => "INTEGER",
            TypeCategory::Real => "REAL",
            TypeCategory::Numeric => "NUMERIC",
            TypeCategory::Untyped => "UNTYPED",
        }
    }
}

impl fmt::Display for TypeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One column of a table
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    pub category: TypeCategory,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        let declared_type = declared_type.into();
        let category = TypeCategory::from_declared(&declared_type);
        Self {
            name: name.into(),
            declared_type,
            category,
        }
    }
}

/// Ordered column list of a table
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<ColumnInfo>,
}

impl TableSchema {
    pub fn new(table: impl Into<String>, columns: Vec<ColumnInfo>) -> Self {
        Self {
            table: table.into(),
            columns,
        }
    }

    /// Looks up a column by exact name.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownColumn` if the table has no such column.
    pub fn column(&self, name: &str) -> Result<&ColumnInfo> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| Error::UnknownColumn {
                table: self.table.clone(),
                column: name.to_string(),
            })
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// Quotes an identifier for inclusion in SQL text.
///
/// Callers validate identifiers against a schema or allow-list first;
/// quoting keeps keywords and mixed case intact.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
