//! Table lifecycle.
//!
//! Creates and seeds the tables served by gridlite when the host process
//! starts and drops them when it stops. The host calls
//! [`TableLifecycle::setup`] and [`TableLifecycle::teardown`] explicitly.

use crate::{storage_error, to_sql, Storage};
use gridlite_core::{quote_identifier, Result, Value};
use rusqlite::params_from_iter;
use tracing::{debug, info};

/// Column definition used when creating a table
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub declared_type: String,
    pub not_null: bool,
}

/// Definition and seed rows of one table
#[derive(Debug, Clone, PartialEq)]
pub struct TableSeed {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    /// Column groups covered by a UNIQUE constraint
    pub unique: Vec<Vec<String>>,
    /// Rows inserted with `INSERT OR IGNORE`, in column order
    pub rows: Vec<Vec<Value>>,
}

impl TableSeed {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            unique: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn column(mut self, name: &str, declared_type: &str, not_null: bool) -> Self {
        self.columns.push(ColumnDef {
            name: name.to_string(),
            declared_type: declared_type.to_string(),
            not_null,
        });
        self
    }

    pub fn unique(mut self, columns: &[&str]) -> Self {
        self.unique
            .push(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn row(mut self, values: Vec<Value>) -> Self {
        self.rows.push(values);
        self
    }

    /// The `test` table of people served by the demo grid.
    pub fn demo() -> Self {
        let people = [
            ("Thomas", "Rukwid", "thomas.rukwid@nemetris.com"),
            ("Max", "Muster", "max.muster@gmail.com"),
            ("John", "Doe", "john.doe@gmail.com"),
            ("Jane", "Doe", "jane.doe@gmail.com"),
        ];
        people.iter().fold(
            TableSeed::new("test")
                .column("fname", "TEXT", true)
                .column("lname", "TEXT", true)
                .column("email", "TEXT", true)
                .unique(&["fname", "lname"]),
            |seed, (fname, lname, email)| {
                seed.row(vec![
                    Value::from(*fname),
                    Value::from(*lname),
                    Value::from(*email),
                ])
            },
        )
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for this table.
    pub fn create_sql(&self) -> String {
        let mut defs: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                let mut def = format!("{} {}", quote_identifier(&c.name), c.declared_type);
                if c.not_null {
                    def.push_str(" NOT NULL");
                }
                def
            })
            .collect();
        for group in &self.unique {
            let cols: Vec<String> = group.iter().map(|c| quote_identifier(c)).collect();
            defs.push(format!("UNIQUE ({})", cols.join(", ")));
        }
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_identifier(&self.name),
            defs.join(", ")
        )
    }

    /// `INSERT OR IGNORE` statement with one placeholder per column.
    pub fn insert_sql(&self) -> String {
        let cols: Vec<String> = self
            .columns
            .iter()
            .map(|c| quote_identifier(&c.name))
            .collect();
        let placeholders = vec!["?"; self.columns.len()].join(", ");
        format!(
            "INSERT OR IGNORE INTO {} ({}) VALUES ({})",
            quote_identifier(&self.name),
            cols.join(", "),
            placeholders
        )
    }
}

/// Create-on-start / drop-on-stop pair for a set of tables
#[derive(Debug, Clone)]
pub struct TableLifecycle {
    storage: Storage,
    seeds: Vec<TableSeed>,
}

impl TableLifecycle {
    pub fn new(storage: Storage, seeds: Vec<TableSeed>) -> Self {
        Self { storage, seeds }
    }

    /// Names of the managed tables.
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.seeds.iter().map(|s| s.name.as_str())
    }

    /// Creates every table and inserts its seed rows.
    ///
    /// Idempotent: existing tables are kept and rows that collide with a
    /// unique constraint are skipped. Runs in one transaction. Returns the
    /// number of rows inserted.
    pub fn setup(&self) -> Result<usize> {
        let inserted = self.storage.write(|tx| {
            let mut inserted = 0;
            for seed in &self.seeds {
                tx.execute(&seed.create_sql(), [])
                    .map_err(storage_error)?;
                let mut stmt = tx.prepare(&seed.insert_sql()).map_err(storage_error)?;
                for row in &seed.rows {
                    let params: Vec<rusqlite::types::Value> = row.iter().map(to_sql).collect();
                    inserted += stmt
                        .execute(params_from_iter(params))
                        .map_err(storage_error)?;
                }
                debug!(table = %seed.name, "Table ready");
            }
            Ok(inserted)
        })?;

        info!(
            tables = self.seeds.len(),
            rows_inserted = inserted,
            path = %self.storage.config().db_path.display(),
            "Tables set up"
        );
        Ok(inserted)
    }

    /// Drops every managed table.
    pub fn teardown(&self) -> Result<()> {
        self.storage.write(|tx| {
            for seed in &self.seeds {
                tx.execute(
                    &format!("DROP TABLE IF EXISTS {}", quote_identifier(&seed.name)),
                    [],
                )
                .map_err(storage_error)?;
            }
            Ok(())
        })?;
        info!(tables = self.seeds.len(), "Tables dropped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_seed_sql() {
        let seed = TableSeed::demo();
        assert_eq!(
            seed.create_sql(),
            "CREATE TABLE IF NOT EXISTS \"test\" (\"fname\" TEXT NOT NULL, \
             \"lname\" TEXT NOT NULL, \"email\" TEXT NOT NULL, UNIQUE (\"fname\", \"lname\"))"
        );
        assert_eq!(
            seed.insert_sql(),
            "INSERT OR IGNORE INTO \"test\" (\"fname\", \"lname\", \"email\") VALUES (?, ?, ?)"
        );
        assert_eq!(seed.rows.len(), 4);
    }
}
