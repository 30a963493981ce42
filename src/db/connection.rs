/// Database connection management with connection pooling
///
/// Provides a thread-safe connection pool to the SQLite task store.

use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Maximum number of database connections in the pool
const MAX_CONNECTIONS: u32 = 5;

// CLI invocations and a running engine can overlap on the same file
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database wrapper with connection pool
#[derive(Clone)]
pub struct Database {
    pool: Arc<SqlitePool>,
    db_path: PathBuf,
}

impl Database {
    /// Open (or create) the task store at `db_path`
    ///
    /// # Arguments
    /// * `db_path` - Path to the SQLite database file
    ///
    /// # Returns
    /// * `Ok(Database)` - Store with the schema in place
    /// * `Err(EngineError)` - If the directory or connection cannot be created
    ///
    /// # Examples
    /// ```no_run
    /// use taskpulse_lib::db::Database;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let db = Database::new("/tmp/taskpulse/tasks.db").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        Self::open(options, MAX_CONNECTIONS, db_path).await
    }

    /// In-memory store for tests and throwaway sessions
    ///
    /// One connection only: every new connection to `:memory:` would see an
    /// empty database of its own.
    pub async fn new_test() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        Self::open(options, 1, PathBuf::from(":memory:")).await
    }

    async fn open(
        options: SqliteConnectOptions,
        max_connections: u32,
        db_path: PathBuf,
    ) -> Result<Self> {
        let options = options
            .create_if_missing(true)
            .foreign_keys(true)
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let db = Self {
            pool: Arc::new(pool),
            db_path,
        };
        db.initialize_schema().await?;

        tracing::debug!(path = %db.db_path.display(), "task store ready");
        Ok(db)
    }

    /// Initialize database schema
    ///
    /// Creates all required tables and indexes if they don't exist.
    async fn initialize_schema(&self) -> Result<()> {
        let schema = include_str!("../../database/schema.sql");

        // SQLite doesn't support multiple statements in execute,
        // so split and execute each statement
        for statement in schema.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed).execute(self.pool.as_ref()).await?;
            }
        }

        Ok(())
    }

    /// Get reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Close all connections in the pool
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Row counts and pool usage, for `taskpulse status`
    pub async fn stats(&self) -> Result<DatabaseStats> {
        let (total_work_items, completed_work_items): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(status = 'completed'), 0) FROM work_items",
        )
        .fetch_one(self.pool())
        .await?;

        let (total_activity_entries,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM activity_log")
            .fetch_one(self.pool())
            .await?;

        Ok(DatabaseStats {
            total_work_items,
            completed_work_items,
            total_activity_entries,
            pool_size: self.pool.size(),
            idle_connections: self.pool.num_idle(),
        })
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub total_work_items: i64,
    pub completed_work_items: i64,
    pub total_activity_entries: i64,
    pub pool_size: u32,
    pub idle_connections: usize,
}
