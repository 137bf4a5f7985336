//! # gridlite
//!
//! Data endpoints for the w2ui grid widget, backed by SQLite.
//!
//! The grid sends a JSON document describing what it wants to see (table,
//! search clauses, sort keys, page). gridlite resolves every field against
//! the table's schema, binds every value as a parameter, and answers with
//! the envelope the grid expects.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gridlite::{GridConfig, GridService, TableSeed};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = GridService::new(GridConfig::default().with_db_path("./demo.db"))?;
//!
//!     // Create and seed the demo table
//!     let lifecycle = service.lifecycle(vec![TableSeed::demo()]);
//!     lifecycle.setup()?;
//!
//!     let envelope = service.list_raw(
//!         r#"{"table_name": "test", "limit": 2, "offset": 0,
//!             "search": [{"field": "fname", "operator": "begins", "value": "Jo"}],
//!             "searchLogic": "AND"}"#,
//!     );
//!     println!("{}", serde_json::to_string(&envelope)?);
//!
//!     lifecycle.teardown()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Endpoints
//!
//! See [`server::router`] for the HTTP routes served by `gridlite-server`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod logging;
pub mod security;
pub mod server;

use std::sync::Arc;

use tracing::{error, info, warn};

// Re-export core types
pub use gridlite_core::{
    DeleteRequest, Envelope, Error, GridRequest, QueryRequest, Record, Result, SaveRequest,
    SearchClause, SearchLogic, SortClause, Value,
};

// Storage components
pub use gridlite_storage::{Storage, StorageConfig, TableLifecycle, TableSeed};

pub use config::GridConfig;

use gridlite_core::{format_records, translate_search, translate_sort};
use gridlite_storage::{count_rows, delete_rows, select_page, table_schema, update_row};
use security::{clamp_limit, validate_request, validate_table};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The grid service.
///
/// Answers list, delete and save requests. Holds no connection: each call
/// opens one, runs a single transaction and releases it. Cheap to clone and
/// safe to share across threads.
#[derive(Debug, Clone)]
pub struct GridService {
    config: Arc<GridConfig>,
    storage: Storage,
}

impl GridService {
    /// Creates a service from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the configuration is invalid.
    pub fn new(config: GridConfig) -> Result<Self> {
        config.validate()?;
        let storage = Storage::new(config.storage.clone());
        Ok(Self {
            config: Arc::new(config),
            storage,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Lifecycle manager for `seeds` on this service's database.
    ///
    /// Only seeds for configured tables are kept; the others are skipped
    /// with a warning, so setup never creates a table clients cannot reach
    /// and teardown never drops one the service does not serve.
    pub fn lifecycle(&self, seeds: Vec<TableSeed>) -> TableLifecycle {
        let (served, skipped): (Vec<_>, Vec<_>) = seeds
            .into_iter()
            .partition(|seed| self.config.tables.contains(&seed.name));
        for seed in &skipped {
            warn!(table = %seed.name, "Skipping seed for a table that is not configured");
        }
        TableLifecycle::new(self.storage.clone(), served)
    }

    /// Lists one page of a table.
    ///
    /// Never fails: every error is returned as an error envelope.
    pub fn list(&self, query: QueryRequest) -> Envelope {
        respond("list", self.try_list(query))
    }

    /// Parses the grid's JSON document and lists one page.
    pub fn list_raw(&self, raw: &str) -> Envelope {
        let query = validate_request(raw)
            .and_then(|_| GridRequest::from_json(raw))
            .and_then(GridRequest::into_query);
        match query {
            Ok(query) => self.list(query),
            Err(err) => respond("list", Err(err)),
        }
    }

    /// Lists the first page of the default table, without search or sort.
    pub fn list_default(&self) -> Envelope {
        self.list(QueryRequest::first_page(
            self.config.default_table.clone(),
            self.config.max_page_size,
        ))
    }

    /// Deletes the rows listed in the request, all or none.
    ///
    /// Fails without deleting anything if a listed recid matches no row.
    pub fn delete(&self, request: DeleteRequest) -> Envelope {
        respond("delete", self.try_delete(request))
    }

    /// Parses the grid's JSON document and deletes rows.
    pub fn delete_raw(&self, raw: &str) -> Envelope {
        match validate_request(raw).and_then(|_| DeleteRequest::from_json(raw)) {
            Ok(request) => self.delete(request),
            Err(err) => respond("delete", Err(err)),
        }
    }

    /// Applies the field changes in the request, all or none.
    pub fn save(&self, request: SaveRequest) -> Envelope {
        respond("save", self.try_save(request))
    }

    /// Parses the grid's JSON document and saves changes.
    pub fn save_raw(&self, raw: &str) -> Envelope {
        match validate_request(raw).and_then(|_| SaveRequest::from_json(raw)) {
            Ok(request) => self.save(request),
            Err(err) => respond("save", Err(err)),
        }
    }

    fn try_list(&self, query: QueryRequest) -> Result<Envelope> {
        validate_table(&query.table_name, &self.config.tables)?;
        let limit = clamp_limit(query.limit, self.config.max_page_size);

        let (total, page) = self.storage.read(|tx| {
            let schema = table_schema(tx, &query.table_name)?;
            let filter = translate_search(&schema, &query.search, query.logic)?;
            let order_by = translate_sort(&schema, &query.sort)?;
            let total = count_rows(tx, &schema, &filter)?;
            let page = select_page(tx, &schema, &filter, &order_by, limit, query.offset)?;
            Ok((total, page))
        })?;
        let records = format_records(&page.columns, page.rows)?;

        info!(
            table = %query.table_name,
            clauses = query.search.len(),
            total,
            returned = records.len(),
            "Listed records"
        );
        Ok(Envelope::Records { total, records })
    }

    fn try_delete(&self, request: DeleteRequest) -> Result<Envelope> {
        let table = self.requested_table(request.table_name)?;
        if request.recid.is_empty() {
            return Err(Error::MalformedRequest(
                "no records selected for deletion".to_string(),
            ));
        }

        let mut recids = request.recid;
        recids.sort_unstable();
        recids.dedup();

        let deleted = self.storage.write(|tx| {
            let schema = table_schema(tx, &table)?;
            let deleted = delete_rows(tx, &schema, &recids)?;
            if deleted < recids.len() {
                return Err(Error::MalformedRequest(format!(
                    "{} of {} selected records do not exist",
                    recids.len() - deleted,
                    recids.len()
                )));
            }
            Ok(deleted)
        })?;

        info!(table = %table, deleted, "Deleted records");
        Ok(Envelope::Done)
    }

    fn try_save(&self, request: SaveRequest) -> Result<Envelope> {
        let changes = request.row_changes()?;
        let table = self.requested_table(request.table_name)?;
        if changes.is_empty() {
            return Err(Error::MalformedRequest("no changes to save".to_string()));
        }

        self.storage.write(|tx| {
            let schema = table_schema(tx, &table)?;
            for change in &changes {
                if update_row(tx, &schema, change)? == 0 {
                    return Err(Error::MalformedRequest(format!(
                        "no record with recid {}",
                        change.recid
                    )));
                }
            }
            Ok(())
        })?;

        info!(table = %table, rows = changes.len(), "Saved changes");
        Ok(Envelope::Done)
    }

    /// Table named by a write request, falling back to the default table.
    fn requested_table(&self, table_name: Option<String>) -> Result<String> {
        let table = table_name.unwrap_or_else(|| self.config.default_table.clone());
        validate_table(&table, &self.config.tables)?;
        Ok(table)
    }
}

/// Converts an operation result into an envelope, logging failures.
fn respond(operation: &str, result: Result<Envelope>) -> Envelope {
    if let Err(err) = &result {
        if err.is_client_error() {
            warn!(operation, kind = err.kind(), error = %err, "Request rejected");
        } else {
            error!(operation, kind = err.kind(), error = %err, "Request failed");
        }
    }
    result.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, "0.3.0");
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = GridConfig::default().with_max_page_size(0);
        assert!(GridService::new(config).is_err());
    }

    #[test]
    fn test_list_default() {
        let dir = tempdir().unwrap();
        let service =
            GridService::new(GridConfig::default().with_db_path(dir.path().join("g.db"))).unwrap();
        service.lifecycle(vec![TableSeed::demo()]).setup().unwrap();

        match service.list_default() {
            Envelope::Records { total, records } => {
                assert_eq!(total, 4);
                assert_eq!(records.len(), 4);
            }
            other => panic!("unexpected envelope {:?}", other),
        }
    }

    #[test]
    fn test_lifecycle_only_manages_configured_tables() {
        let dir = tempdir().unwrap();
        let config = GridConfig::default()
            .with_db_path(dir.path().join("g.db"))
            .with_tables(["people"]);
        let service = GridService::new(config).unwrap();

        let lifecycle = service.lifecycle(vec![
            TableSeed::demo(),
            TableSeed::new("people").column("name", "TEXT", true),
        ]);
        assert_eq!(lifecycle.tables().collect::<Vec<_>>(), vec!["people"]);

        assert_eq!(lifecycle.setup().unwrap(), 0);
        let exists = |table: &str| {
            service
                .storage
                .read(|tx| Ok(gridlite_storage::table_schema(tx, table).is_ok()))
                .unwrap()
        };
        assert!(exists("people"));
        assert!(!exists("test"));

        // A user table that happens to share the demo name survives teardown
        TableLifecycle::new(service.storage.clone(), vec![TableSeed::demo()])
            .setup()
            .unwrap();
        lifecycle.teardown().unwrap();
        assert!(!exists("people"));
        assert!(exists("test"));
    }

    /// Counts ERROR events
    struct ErrorCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for ErrorCounter {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            if *event.metadata().level() == tracing::Level::ERROR {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn test_storage_failure_is_logged_once() {
        let dir = tempdir().unwrap();
        let service =
            GridService::new(GridConfig::default().with_db_path(dir.path().join("g.db"))).unwrap();
        service.lifecycle(vec![TableSeed::demo()]).setup().unwrap();

        let errors = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(ErrorCounter(errors.clone()));
        // Collides with John Doe on UNIQUE(fname, lname)
        let envelope = tracing::subscriber::with_default(subscriber, || {
            service.save_raw(r#"{"changes": [{"recid": 4, "fname": "John"}]}"#)
        });

        assert_eq!(envelope.status(), "error");
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_write_request_defaults_to_default_table() {
        let dir = tempdir().unwrap();
        let service =
            GridService::new(GridConfig::default().with_db_path(dir.path().join("g.db"))).unwrap();
        service.lifecycle(vec![TableSeed::demo()]).setup().unwrap();

        let envelope = service.delete_raw(r#"{"recid": [2]}"#);
        assert_eq!(envelope, Envelope::Done);
    }
}
