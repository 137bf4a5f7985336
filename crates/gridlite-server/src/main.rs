//! gridlite server
//!
//! Creates the demo table, serves the grid endpoints over HTTP and drops the
//! table again on shutdown.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use gridlite::config::DEFAULT_MAX_PAGE_SIZE;
use gridlite::logging::LogConfig;
use gridlite::{server, GridConfig, GridService, TableSeed};

#[derive(Parser, Debug)]
#[command(name = "gridlite-server")]
#[command(about = "SQLite-backed data endpoints for the w2ui grid", version)]
struct Args {
    /// SQLite database file
    #[arg(short, long, env = "GRIDLITE_DB", default_value = "demo.db")]
    db: PathBuf,

    /// Listen address
    #[arg(short, long, env = "GRIDLITE_LISTEN", default_value = "127.0.0.1:4444")]
    listen: SocketAddr,

    /// Tables clients may query; the first one is the default table
    #[arg(short, long, env = "GRIDLITE_TABLES", value_delimiter = ',', default_value = "test")]
    table: Vec<String>,

    /// Largest page returned by a list request
    #[arg(long, env = "GRIDLITE_MAX_PAGE_SIZE", default_value_t = DEFAULT_MAX_PAGE_SIZE)]
    max_page_size: u64,

    /// Log level filter, overridden by RUST_LOG
    #[arg(long, env = "GRIDLITE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Also write logs to this file, rotated daily
    #[arg(long, env = "GRIDLITE_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Keep the demo table when the server stops
    #[arg(long, env = "GRIDLITE_KEEP_TABLES")]
    keep_tables: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_config = LogConfig::info().with_level(args.log_level.as_str());
    let log_config = match &args.log_file {
        Some(path) => log_config.with_both(path),
        None => log_config,
    };
    let _guard = log_config.init();

    info!("Starting gridlite server v{}", gridlite::VERSION);

    let config = GridConfig::default()
        .with_db_path(&args.db)
        .with_tables(args.table.iter().cloned())
        .with_max_page_size(args.max_page_size)
        .with_listen(args.listen);
    let service = GridService::new(config).context("invalid configuration")?;

    // Seeds for tables outside the allow-list are skipped
    let lifecycle = service.lifecycle(vec![TableSeed::demo()]);
    let inserted = lifecycle
        .setup()
        .with_context(|| format!("failed to prepare tables in {}", args.db.display()))?;
    let managed: Vec<&str> = lifecycle.tables().collect();
    info!(db = %args.db.display(), tables = ?managed, inserted, "Tables ready");

    let listen = service.config().listen;
    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {}", listen))?;

    let served = server::serve(listener, service, shutdown_signal()).await;

    if args.keep_tables {
        info!("Keeping tables");
    } else if let Err(e) = lifecycle.teardown() {
        warn!(error = %e, "Failed to drop tables");
    }

    served.context("server error")?;
    info!("gridlite server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
