// Common test utilities for storage integration tests

use gridlite_storage::{Storage, StorageConfig, TableLifecycle, TableSeed};
use std::path::PathBuf;
use tempfile::TempDir;

/// Test fixture with the demo table set up in a temporary database file
pub struct StorageTestFixture {
    #[allow(dead_code)]
    pub temp_dir: TempDir,
    pub db_path: PathBuf,
    pub storage: Storage,
    pub lifecycle: TableLifecycle,
}

impl StorageTestFixture {
    pub fn new() -> Self {
        Self::with_seeds(vec![TableSeed::demo()])
    }

    pub fn with_seeds(seeds: Vec<TableSeed>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("grid.db");
        let storage = Storage::new(StorageConfig::new(&db_path));
        let lifecycle = TableLifecycle::new(storage.clone(), seeds);
        lifecycle.setup().expect("Failed to set up tables");

        Self {
            temp_dir,
            db_path,
            storage,
            lifecycle,
        }
    }
}

impl Default for StorageTestFixture {
    fn default() -> Self {
        Self::new()
    }
}
