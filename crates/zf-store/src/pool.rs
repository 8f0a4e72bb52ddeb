//! # Store Configuration and Pool
//!
//! ## Start-up
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  StoreConfig::new(path).with_env_overrides()                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DocumentStore::open(config).await                                     │
//! │       ├── connect_pool(): SqlitePool (WAL, NORMAL sync)                │
//! │       ├── run_migrations(): documents table                            │
//! │       └── change feed: broadcast::channel(change_buffer)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};

/// Environment variable that overrides the database path.
pub const DB_PATH_ENV: &str = "ZF_DB_PATH";

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Document store configuration.
///
/// ## Example
/// ```rust
/// use zf_store::StoreConfig;
///
/// let config = StoreConfig::new("./zf-ops.db")
///     .max_connections(8)
///     .change_buffer(512);
/// assert_eq!(config.max_connections, 8);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of pooled connections. Default: 5
    pub max_connections: u32,

    /// Minimum number of connections kept open. Default: 1
    pub min_connections: u32,

    /// How long to wait for a free connection. Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle time before a connection above the minimum is closed.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Whether `open` applies migrations. Default: true
    pub run_migrations: bool,

    /// Change events buffered per subscriber before it lags. Default: 256
    pub change_buffer: usize,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StoreConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
            change_buffer: 256,
        }
    }

    /// An isolated in-memory database (for tests and the seed dry run).
    ///
    /// Every SQLite connection to `:memory:` is a separate database, so the
    /// pool is pinned to one connection that never expires.
    pub fn in_memory() -> Self {
        StoreConfig {
            database_path: PathBuf::from(MEMORY_PATH),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            run_migrations: true,
            change_buffer: 256,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub fn change_buffer(mut self, capacity: usize) -> Self {
        self.change_buffer = capacity.max(1);
        self
    }

    /// Applies `ZF_DB_PATH` when set.
    pub fn with_env_overrides(self) -> Self {
        self.with_path_override(std::env::var(DB_PATH_ENV).ok())
    }

    fn with_path_override(mut self, path: Option<String>) -> Self {
        if let Some(path) = path.filter(|p| !p.trim().is_empty()) {
            self.database_path = PathBuf::from(path);
        }
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }
}

// =============================================================================
// Pool
// =============================================================================

/// Opens the SQLite pool described by `config`.
pub(crate) async fn connect_pool(config: &StoreConfig) -> StoreResult<SqlitePool> {
    info!(
        path = %config.database_path.display(),
        "Initializing document store"
    );

    let base = if config.is_in_memory() {
        SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?
    } else {
        SqliteConnectOptions::new()
            .filename(&config.database_path)
            .create_if_missing(true)
    };

    let connect_options = base
        // Readers don't block the writer
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal);

    debug!("Connection options configured");

    let mut options = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connect_timeout)
        .idle_timeout(Some(config.idle_timeout));

    if config.is_in_memory() {
        options = options
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>);
    }

    let pool = options
        .connect_with(connect_options)
        .await
        .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

    info!(max_connections = config.max_connections, "Store pool created");
    Ok(pool)
}
