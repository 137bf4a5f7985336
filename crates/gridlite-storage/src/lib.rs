//! # gridlite storage
//!
//! SQLite access for gridlite.
//!
//! ## ⚠️ Internal Implementation Detail
//!
//! **This crate is an internal implementation detail of gridlite.**
//!
//! Users should depend on the main `gridlite` crate instead, which provides
//! the stable public API.
//!
//! ---
//!
//! Every operation opens its own connection, runs inside a single
//! transaction and releases the connection when the closure returns,
//! on success and on error alike:
//!
//! ```text
//! Storage::read(|tx| ...)   deferred transaction, committed after the closure
//! Storage::write(|tx| ...)  immediate transaction, rolled back if the closure fails
//! ```
//!
//! Connections are never shared between callers.

use gridlite_core::{
    quote_identifier, ColumnInfo, Error, Result, RowChange, TableSchema, Value, WhereFragment,
};
use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection, Transaction, TransactionBehavior};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

pub mod lifecycle;

pub use lifecycle::{ColumnDef, TableLifecycle, TableSeed};

/// Default database file, relative to the working directory
const DEFAULT_DB_PATH: &str = "demo.db";

/// Default time a connection waits on a locked database (5s)
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Path of the SQLite database file
    pub db_path: PathBuf,
    /// How long a statement waits for a lock before failing
    pub busy_timeout: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

impl StorageConfig {
    /// Create config for the database file at `path`
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            db_path: path.into(),
            ..Default::default()
        }
    }

    /// Set the busy timeout
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }
}

/// One page of a result set
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Projected column names, row identifier first
    pub columns: Vec<String>,
    /// Row values in column order
    pub rows: Vec<Vec<Value>>,
}

/// Handle to the database file.
///
/// Holds configuration only; connections are opened per operation.
#[derive(Debug, Clone)]
pub struct Storage {
    config: StorageConfig,
}

impl Storage {
    /// Creates a storage handle. No connection is opened.
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.config.db_path).map_err(storage_error)?;
        conn.busy_timeout(self.config.busy_timeout)
            .map_err(storage_error)?;
        Ok(conn)
    }

    /// Runs `f` inside a deferred (read) transaction on a fresh connection.
    ///
    /// All statements issued by `f` see the same snapshot of the database.
    pub fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        self.scoped(TransactionBehavior::Deferred, f)
    }

    /// Runs `f` inside an immediate (write) transaction on a fresh connection.
    ///
    /// The transaction commits only if `f` succeeds; any error rolls back
    /// every change made by `f`.
    pub fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        self.scoped(TransactionBehavior::Immediate, f)
    }

    fn scoped<T, F>(&self, behavior: TransactionBehavior, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.connect()?;
        let tx = conn
            .transaction_with_behavior(behavior)
            .map_err(storage_error)?;
        // Dropping an uncommitted transaction rolls it back.
        let out = f(&tx)?;
        tx.commit().map_err(storage_error)?;
        Ok(out)
    }
}

/// Reads the ordered column list of `table`.
///
/// # Errors
///
/// Returns `Error::Storage` if the table does not exist.
pub fn table_schema(conn: &Connection, table: &str) -> Result<TableSchema> {
    let mut stmt = conn
        .prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")
        .map_err(storage_error)?;
    let columns = stmt
        .query_map([table], |row| {
            Ok(ColumnInfo::new(
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
            ))
        })
        .map_err(storage_error)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(storage_error)?;

    if columns.is_empty() {
        return Err(Error::Storage(format!("table '{}' does not exist", table)));
    }
    Ok(TableSchema::new(table, columns))
}

/// Counts the rows of `schema.table` matching `filter`.
pub fn count_rows(conn: &Connection, schema: &TableSchema, filter: &WhereFragment) -> Result<u64> {
    let sql = format!(
        "SELECT COUNT(*) FROM {}{}",
        quote_identifier(&schema.table),
        filter.to_sql()
    );
    debug!(sql = %sql, params = filter.params.len(), "Counting rows");

    let params: Vec<rusqlite::types::Value> = filter.params.iter().map(to_sql).collect();
    let count: i64 = conn
        .query_row(&sql, params_from_iter(params), |row| row.get(0))
        .map_err(storage_error)?;
    Ok(count.max(0) as u64)
}

/// Selects one page of `schema.table`, projecting `rowid` followed by all
/// table columns.
///
/// The identifier is aliased so it keeps the name `rowid` even when the
/// table declares an INTEGER PRIMARY KEY.
///
/// `order_by` must come from `gridlite_core::translate_sort`. Limit and
/// offset are bound as integer parameters.
pub fn select_page(
    conn: &Connection,
    schema: &TableSchema,
    filter: &WhereFragment,
    order_by: &str,
    limit: u64,
    offset: u64,
) -> Result<Page> {
    let table = quote_identifier(&schema.table);
    let sql = format!(
        "SELECT rowid AS \"rowid\", {table}.* FROM {table}{}{} LIMIT ? OFFSET ?",
        filter.to_sql(),
        order_by
    );
    debug!(sql = %sql, params = filter.params.len() + 2, "Selecting page");

    let mut params: Vec<rusqlite::types::Value> = filter.params.iter().map(to_sql).collect();
    params.push(rusqlite::types::Value::Integer(to_i64("limit", limit)?));
    params.push(rusqlite::types::Value::Integer(to_i64("offset", offset)?));

    let mut stmt = conn.prepare(&sql).map_err(storage_error)?;
    let columns: Vec<String> = stmt
        .column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    let mut rows_iter = stmt.query(params_from_iter(params)).map_err(storage_error)?;
    let mut rows = Vec::new();
    while let Some(row) = rows_iter.next().map_err(storage_error)? {
        let mut values = Vec::with_capacity(columns.len());
        for idx in 0..columns.len() {
            values.push(from_sql(row.get_ref(idx).map_err(storage_error)?));
        }
        rows.push(values);
    }

    Ok(Page { columns, rows })
}

/// Deletes the rows whose `rowid` is listed in `recids`.
///
/// Returns the number of rows removed.
pub fn delete_rows(conn: &Connection, schema: &TableSchema, recids: &[i64]) -> Result<usize> {
    if recids.is_empty() {
        return Ok(0);
    }
    let placeholders = vec!["?"; recids.len()].join(", ");
    let sql = format!(
        "DELETE FROM {} WHERE rowid IN ({})",
        quote_identifier(&schema.table),
        placeholders
    );
    debug!(sql = %sql, params = recids.len(), "Deleting rows");

    conn.execute(&sql, params_from_iter(recids.iter()))
        .map_err(storage_error)
}

/// Applies the field assignments of `change` to the row `change.recid`.
///
/// Every field is resolved against `schema` before any SQL is built.
/// Returns the number of rows updated (0 if the row does not exist).
pub fn update_row(conn: &Connection, schema: &TableSchema, change: &RowChange) -> Result<usize> {
    let mut assignments = Vec::with_capacity(change.fields.len());
    let mut params = Vec::with_capacity(change.fields.len() + 1);
    for (field, value) in &change.fields {
        let column = schema.column(field)?;
        assignments.push(format!("{} = ?", quote_identifier(&column.name)));
        params.push(to_sql(value));
    }
    params.push(rusqlite::types::Value::Integer(change.recid));

    let sql = format!(
        "UPDATE {} SET {} WHERE rowid = ?",
        quote_identifier(&schema.table),
        assignments.join(", ")
    );
    debug!(sql = %sql, params = params.len(), "Updating row");

    conn.execute(&sql, params_from_iter(params))
        .map_err(storage_error)
}

fn to_i64(name: &str, value: u64) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| Error::MalformedRequest(format!("{} {} is out of range", name, value)))
}

/// Converts a value into the form rusqlite binds.
pub fn to_sql(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::Null => rusqlite::types::Value::Null,
        Value::Integer(i) => rusqlite::types::Value::Integer(*i),
        Value::Real(f) => rusqlite::types::Value::Real(*f),
        Value::Text(s) => rusqlite::types::Value::Text(s.clone()),
        Value::Blob(b) => rusqlite::types::Value::Blob(b.clone()),
    }
}

/// Converts a column value read by rusqlite.
pub fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    }
}

/// Maps a rusqlite failure into the storage error kind.
///
/// Does not log; failures are reported once by the caller that turns them
/// into a response.
pub fn storage_error(err: rusqlite::Error) -> Error {
    Error::Storage(err.to_string())
}
