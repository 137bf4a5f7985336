//! Logging configuration for gridlite
//!
//! Logging through the `tracing` framework with a level filter, stdout or
//! daily-rotated file output, and a pretty or compact format.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default log file name when the configured path has none
const DEFAULT_LOG_FILE: &str = "gridlite.log";

/// Log output destination
#[derive(Debug, Clone)]
pub enum LogOutput {
    /// Output to stdout
    Stdout,
    /// Output to a file with rotation
    File(std::path::PathBuf),
    /// Output to both stdout and file
    Both(std::path::PathBuf),
}

/// Log format style
#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Pretty,
    /// Compact single-line format
    Compact,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level filter
    pub level: String,
    /// Output destination
    pub output: LogOutput,
    /// Format style
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            output: LogOutput::Stdout,
            format: LogFormat::Pretty,
        }
    }
}

impl LogConfig {
    /// Create config with info level and stdout output
    pub fn info() -> Self {
        Self::default()
    }

    /// Create config with debug level, which also logs generated SQL
    pub fn debug() -> Self {
        Self {
            level: "debug".to_string(),
            ..Default::default()
        }
    }

    /// Set log output to file with rotation
    pub fn with_file<P: Into<std::path::PathBuf>>(mut self, path: P) -> Self {
        self.output = LogOutput::File(path.into());
        self
    }

    /// Set log output to both stdout and file
    pub fn with_both<P: Into<std::path::PathBuf>>(mut self, path: P) -> Self {
        self.output = LogOutput::Both(path.into());
        self
    }

    /// Set log format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set log level filter
    pub fn with_level<S: Into<String>>(mut self, level: S) -> Self {
        self.level = level.into();
        self
    }

    /// Initialize global logging with this configuration
    ///
    /// `RUST_LOG` takes precedence over the configured level. An invalid
    /// level falls back to `info`. If a global subscriber is already
    /// installed this is a no-op.
    ///
    /// Returns a guard that must be kept alive for file logging to work.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use gridlite::logging::LogConfig;
    ///
    /// // Keep the guard alive for the lifetime of your application
    /// let _guard = LogConfig::info().init();
    /// ```
    pub fn init(self) -> Option<WorkerGuard> {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        match self.output {
            LogOutput::Stdout => {
                let _ = match self.format {
                    LogFormat::Pretty => tracing_subscriber::registry()
                        .with(env_filter)
                        .with(fmt::layer().pretty())
                        .try_init(),
                    LogFormat::Compact => tracing_subscriber::registry()
                        .with(env_filter)
                        .with(fmt::layer().compact())
                        .try_init(),
                };
                None
            }
            LogOutput::File(path) => {
                let (non_blocking, guard) = tracing_appender::non_blocking(rolling_file(&path));

                let _ = match self.format {
                    LogFormat::Pretty => tracing_subscriber::registry()
                        .with(env_filter)
                        .with(fmt::layer().with_writer(non_blocking).pretty())
                        .try_init(),
                    LogFormat::Compact => tracing_subscriber::registry()
                        .with(env_filter)
                        .with(fmt::layer().with_writer(non_blocking).compact())
                        .try_init(),
                };
                Some(guard)
            }
            LogOutput::Both(path) => {
                let (non_blocking, guard) = tracing_appender::non_blocking(rolling_file(&path));

                // Both outputs share the default format
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer())
                    .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                    .try_init();

                Some(guard)
            }
        }
    }
}

fn rolling_file(path: &std::path::Path) -> tracing_appender::rolling::RollingFileAppender {
    tracing_appender::rolling::daily(
        path.parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::Path::new(".")),
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(DEFAULT_LOG_FILE),
    )
}
