use std::time::{Duration, Instant};

use sqlx::{Database, IntoArguments};

use crate::config::ConnectionConfig;
use crate::dialect::{SqlDialect, decode_rows};
use crate::error::{QuarryError, QuarryResult};
use crate::row::Cursor;
use crate::value::Value;

/// A configured connection: owns the pool and runs statements against it.
///
/// Created once per process and shared by reference with every query.
pub struct DatabaseManager<DB: SqlDialect> {
    pool: sqlx::Pool<DB>,
    config: ConnectionConfig,
    server_version: Option<String>,
}

impl<DB: SqlDialect> std::fmt::Debug for DatabaseManager<DB> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseManager")
            .field("connection", &self.config.connection_name)
            .field("driver", &self.config.driver)
            .field("server_version", &self.server_version)
            .finish()
    }
}

impl<DB: SqlDialect> DatabaseManager<DB> {
    /// Name reported in query logs.
    pub fn connection_name(&self) -> &str {
        &self.config.connection_name
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Configured or autodetected server version.
    pub fn server_version(&self) -> Option<&str> {
        self.server_version.as_deref()
    }

    pub fn pool(&self) -> &sqlx::Pool<DB> {
        &self.pool
    }

    /// Table name with the configured prefix applied.
    pub fn prefixed(&self, table: &str) -> String {
        format!("{}{}", self.config.prefix, table)
    }

    /// Closes the pool, waiting for checked-out connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // Bound values stay out of the log.
    fn log_query(&self, kind: &str, sql: &str, elapsed: Duration, results: usize) {
        let elapsed_ms = elapsed.as_millis();
        tracing::info!(
            connection = %self.config.connection_name,
            operation = kind,
            elapsed_ms = elapsed_ms as u64,
            results,
            "Executed {} query ({}ms, {} results, {}) : {}",
            kind,
            elapsed_ms,
            results,
            self.config.connection_name,
            sql
        );
    }
}

impl<DB> DatabaseManager<DB>
where
    DB: SqlDialect,
    for<'c> &'c mut <DB as Database>::Connection: sqlx::Executor<'c, Database = DB>,
    for<'q> <DB as Database>::Arguments<'q>: IntoArguments<'q, DB>,
{
    /// Connects using `config`.
    ///
    /// # Errors
    /// Returns [`QuarryError::Config`] when the configuration is invalid for
    /// this driver, or [`QuarryError::Sqlx`] when the server cannot be reached
    /// or rejects the credentials.
    #[tracing::instrument(skip(config), fields(driver = %config.driver, connection = %config.connection_name))]
    pub async fn create(config: ConnectionConfig) -> QuarryResult<Self> {
        if !DB::accepts(config.driver) {
            return Err(QuarryError::config(format!(
                "driver '{}' is not supported by this connection type",
                config.driver
            )));
        }
        let pool = DB::connect(&config).await?;
        Self::from_pool(pool, config).await
    }

    /// Wraps an existing pool. The server version is detected unless configured.
    pub async fn from_pool(pool: sqlx::Pool<DB>, config: ConnectionConfig) -> QuarryResult<Self> {
        let mut manager = Self {
            pool,
            config,
            server_version: None,
        };
        manager.server_version = match manager.config.version.clone() {
            Some(version) => Some(version),
            None => manager.detect_version().await?,
        };
        tracing::debug!(
            connection = %manager.config.connection_name,
            version = ?manager.server_version,
            config = %serde_json::to_string(&manager.config).unwrap_or_default(),
            "connection ready"
        );
        Ok(manager)
    }

    async fn detect_version(&self) -> QuarryResult<Option<String>> {
        let rows = sqlx::raw_sql(DB::version_query())
            .fetch_all(&self.pool)
            .await?;
        let mut cursor = decode_rows::<DB>(&rows, self.config.app_timezone)?;
        if cursor.advance() {
            cursor.get::<Option<String>, _>(0)
        } else {
            Ok(None)
        }
    }

    /// Runs `sql` as-is, without parameter binding.
    ///
    /// Only use this with trusted SQL; nothing in `sql` is escaped.
    pub async fn unprepared(&self, sql: &str) -> QuarryResult<Cursor> {
        let start = Instant::now();
        let rows = sqlx::raw_sql(sql).fetch_all(&self.pool).await?;
        let cursor = decode_rows::<DB>(&rows, self.config.app_timezone)?;
        self.log_query("unprepared", sql, start.elapsed(), cursor.size());
        Ok(cursor)
    }

    /// Runs `sql` as a prepared statement with positional `bindings`.
    pub async fn select(&self, sql: &str, bindings: Vec<Value>) -> QuarryResult<Cursor> {
        let start = Instant::now();
        let query = bindings
            .into_iter()
            .fold(sqlx::query::<DB>(sql), DB::bind_value);
        let rows = query.fetch_all(&self.pool).await?;
        let cursor = decode_rows::<DB>(&rows, self.config.app_timezone)?;
        self.log_query("prepared", sql, start.elapsed(), cursor.size());
        Ok(cursor)
    }

    /// Runs a statement that returns no rows and reports the affected row count.
    pub async fn statement(&self, sql: &str, bindings: Vec<Value>) -> QuarryResult<u64> {
        let start = Instant::now();
        let query = bindings
            .into_iter()
            .fold(sqlx::query::<DB>(sql), DB::bind_value);
        let result = query.execute(&self.pool).await?;
        let affected = DB::rows_affected(&result);
        self.log_query("prepared", sql, start.elapsed(), 0);
        Ok(affected)
    }
}
