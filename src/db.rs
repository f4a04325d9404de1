pub mod transaction;

use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::middleware_helpers::retry::{with_retry, DbRetryPolicy, RetryConfig};
use futures::future::BoxFuture;
use metrics::{counter, gauge, histogram};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction, DbErr,
};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub use transaction::with_transaction;

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Idle timeout duration
    pub idle_timeout: Duration,
    /// Acquire connection timeout
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        }
    }
}

/// Establishes a connection pool to the database with custom configuration
///
/// # Errors
/// Returns a `ServiceError` if the connection cannot be established
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    let mut opt = ConnectOptions::new(config.url.clone());

    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(false);

    gauge!("bookstore_db.max_connections", config.max_connections as f64);

    info!(
        max_connections = config.max_connections,
        "Connecting to database"
    );

    let db_pool = Database::connect(opt).await?;

    info!("Database connection pool established successfully");

    Ok(db_pool)
}

/// Establish DB pool using AppConfig tuning
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    let db_cfg: DbConfig = cfg.into();
    establish_connection_with_config(&db_cfg).await
}

/// Injected database client.
///
/// Every operation runs through the retry policy, so connection-level failures
/// (pool exhaustion, dropped sockets) are retried before reaching services.
/// Business errors raised inside a transaction are never retried.
#[derive(Debug, Clone)]
pub struct DatabaseAccess {
    pool: Arc<DbPool>,
    retry: RetryConfig,
}

impl DatabaseAccess {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self::with_retry_config(pool, RetryConfig::default())
    }

    pub fn with_retry_config(pool: Arc<DbPool>, retry: RetryConfig) -> Self {
        Self { pool, retry }
    }

    /// Get a reference to the connection pool
    pub fn get_pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Run a read or single-statement write with metrics and retries.
    pub async fn execute<F, T>(&self, operation: &str, f: F) -> Result<T, ServiceError>
    where
        F: for<'c> Fn(&'c DbPool) -> BoxFuture<'c, Result<T, DbErr>>,
    {
        let db = &*self.pool;
        let start = std::time::Instant::now();

        debug!(operation = %operation, "Starting database operation");

        let result = with_retry(&self.retry, DbRetryPolicy, || f(db))
            .await
            .map_err(|e| {
                error!(operation = %operation, error = %e, "Database operation failed");
                counter!("bookstore_db.operation.error", 1, "operation" => operation.to_string());
                ServiceError::from(e)
            });

        let elapsed = start.elapsed();
        histogram!("bookstore_db.operation.duration", elapsed, "operation" => operation.to_string());

        result
    }

    /// Run `f` inside a transaction. The whole unit is retried only when the
    /// failure is connection-level; typed business errors pass through untouched.
    pub async fn transaction<F, T>(&self, operation: &str, f: F) -> Result<T, ServiceError>
    where
        F: for<'c> Fn(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, ServiceError>>
            + Send
            + Sync,
        T: Send,
    {
        let db = &*self.pool;
        let transaction_id = Uuid::new_v4();
        let start = std::time::Instant::now();

        debug!(%transaction_id, operation = %operation, "Starting database transaction");
        counter!("bookstore_db.transaction.started", 1);

        let result = with_retry(&self.retry, DbRetryPolicy, || {
            with_transaction(db, |txn| f(txn))
        })
        .await;

        let elapsed = start.elapsed();
        histogram!("bookstore_db.transaction.duration", elapsed, "operation" => operation.to_string());

        match &result {
            Ok(_) => {
                counter!("bookstore_db.transaction.committed", 1);
                debug!(%transaction_id, ?elapsed, "Transaction committed");
            }
            Err(e) => {
                counter!("bookstore_db.transaction.rolled_back", 1);
                warn!(%transaction_id, operation = %operation, error = %e, "Transaction rolled back");
            }
        }

        result
    }
}

/// Runs database migrations
///
/// # Errors
/// Returns a `ServiceError` if migrations fail to execute
pub async fn run_migrations(pool: &DbPool) -> Result<(), ServiceError> {
    info!("Running database migrations");
    let start = std::time::Instant::now();

    let result = crate::migrator::Migrator::up(pool, None)
        .await
        .map_err(ServiceError::DatabaseError);

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => info!(?elapsed, "Database migrations completed"),
        Err(e) => error!(?elapsed, error = %e, "Database migrations failed"),
    }

    result
}

/// Checks if the database connection is active
pub async fn check_connection<C: ConnectionTrait>(pool: &C) -> Result<(), ServiceError> {
    let start = std::time::Instant::now();

    let result = pool
        .execute_unprepared("SELECT 1")
        .await
        .map(|_| ())
        .map_err(ServiceError::DatabaseError);

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => {
            gauge!("bookstore_db.connection_latency", elapsed.as_millis() as f64);
        }
        Err(e) => {
            error!(?elapsed, error = %e, "Database connection check failed");
            counter!("bookstore_db.connection_failures", 1);
        }
    }

    result
}

/// Migrated single-connection SQLite database for unit tests.
#[cfg(test)]
pub(crate) async fn memory_db() -> DatabaseAccess {
    let pool = establish_connection_with_config(&DbConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        ..Default::default()
    })
    .await
    .unwrap();
    run_migrations(&pool).await.unwrap();
    DatabaseAccess::new(Arc::new(pool))
}
