//! Service configuration.

use crate::security::validate_identifier;
use gridlite_core::{Error, Result};
use gridlite_storage::StorageConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default largest page returned by a list request
pub const DEFAULT_MAX_PAGE_SIZE: u64 = 1000;

/// Default table served by the demo grid
pub const DEFAULT_TABLE: &str = "test";

/// Configuration of a [`GridService`](crate::GridService)
#[derive(Debug, Clone)]
pub struct GridConfig {
    /// Database file and connection settings
    pub storage: StorageConfig,
    /// Tables clients may address; every other name is rejected
    pub tables: Vec<String>,
    /// Table listed by the parameterless endpoint
    pub default_table: String,
    /// Upper bound applied to the requested page size
    pub max_page_size: u64,
    /// HTTP listen address
    pub listen: SocketAddr,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            tables: vec![DEFAULT_TABLE.to_string()],
            default_table: DEFAULT_TABLE.to_string(),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            listen: SocketAddr::from(([127, 0, 0, 1], 4444)),
        }
    }
}

impl GridConfig {
    /// Set the database file
    pub fn with_db_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.storage.db_path = path.into();
        self
    }

    /// Set the busy timeout of every connection
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.storage.busy_timeout = timeout;
        self
    }

    /// Replace the table allow-list. The first table becomes the default.
    pub fn with_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables = tables.into_iter().map(Into::into).collect();
        if let Some(first) = self.tables.first() {
            self.default_table = first.clone();
        }
        self
    }

    /// Set the maximum page size
    pub fn with_max_page_size(mut self, max: u64) -> Self {
        self.max_page_size = max;
        self
    }

    /// Set the listen address
    pub fn with_listen(mut self, listen: SocketAddr) -> Self {
        self.listen = listen;
        self
    }

    /// Checks the configuration before a service is built from it.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the allow-list is empty, holds a
    /// name that is not a plain identifier, does not contain the default
    /// table, or if the page size is zero.
    pub fn validate(&self) -> Result<()> {
        if self.tables.is_empty() {
            return Err(Error::InvalidInput(
                "at least one table must be configured".to_string(),
            ));
        }
        for table in &self.tables {
            validate_identifier(table)?;
        }
        if !self.tables.contains(&self.default_table) {
            return Err(Error::InvalidInput(format!(
                "default table '{}' is not in the table list",
                self.default_table
            )));
        }
        if self.max_page_size == 0 {
            return Err(Error::InvalidInput(
                "max page size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
