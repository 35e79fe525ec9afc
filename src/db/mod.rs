mod error;
#[cfg(feature = "database-postgres")]
pub mod postgres;
pub mod repos;
#[cfg(feature = "database-sqlite")]
pub mod sqlite;

#[cfg(all(test, any(feature = "database-sqlite", feature = "database-postgres")))]
pub mod tests;

use std::sync::Arc;

pub use error::{DbError, DbResult};
pub use repos::*;

use crate::config::DatabaseConfig;

/// PostgreSQL pool configuration with optional read replica.
#[cfg(feature = "database-postgres")]
pub struct PgPoolPair {
    /// Primary pool for writes.
    pub write: sqlx::PgPool,
    /// Optional read replica pool. If None, reads use the write pool.
    pub read: Option<sqlx::PgPool>,
}

/// Cached repository trait objects, created once at startup.
struct CachedRepos {
    accounts: Arc<dyn AccountRepo>,
    credentials: Arc<dyn CredentialRepo>,
    rate_limits: Arc<dyn RateLimitRepo>,
    federation_configs: Arc<dyn FederationConfigRepo>,
    sync_locks: Arc<dyn SyncLockRepo>,
    staff: Arc<dyn StaffRepo>,
    identity_links: Arc<dyn IdentityLinkRepo>,
}

impl CachedRepos {
    #[cfg(feature = "database-sqlite")]
    fn sqlite(pool: &sqlx::SqlitePool) -> Self {
        Self {
            accounts: Arc::new(sqlite::SqliteAccountRepo::new(pool.clone())),
            credentials: Arc::new(sqlite::SqliteCredentialRepo::new(pool.clone())),
            rate_limits: Arc::new(sqlite::SqliteRateLimitRepo::new(pool.clone())),
            federation_configs: Arc::new(sqlite::SqliteFederationConfigRepo::new(pool.clone())),
            sync_locks: Arc::new(sqlite::SqliteSyncLockRepo::new(pool.clone())),
            staff: Arc::new(sqlite::SqliteStaffRepo::new(pool.clone())),
            identity_links: Arc::new(sqlite::SqliteIdentityLinkRepo::new(pool.clone())),
        }
    }

    #[cfg(feature = "database-postgres")]
    fn postgres(write: &sqlx::PgPool, read: &Option<sqlx::PgPool>) -> Self {
        Self {
            accounts: Arc::new(postgres::PostgresAccountRepo::new(
                write.clone(),
                read.clone(),
            )),
            credentials: Arc::new(postgres::PostgresCredentialRepo::new(
                write.clone(),
                read.clone(),
            )),
            rate_limits: Arc::new(postgres::PostgresRateLimitRepo::new(
                write.clone(),
                read.clone(),
            )),
            federation_configs: Arc::new(postgres::PostgresFederationConfigRepo::new(
                write.clone(),
                read.clone(),
            )),
            sync_locks: Arc::new(postgres::PostgresSyncLockRepo::new(
                write.clone(),
                read.clone(),
            )),
            staff: Arc::new(postgres::PostgresStaffRepo::new(write.clone(), read.clone())),
            identity_links: Arc::new(postgres::PostgresIdentityLinkRepo::new(
                write.clone(),
                read.clone(),
            )),
        }
    }
}

enum PoolStorage {
    #[cfg(feature = "database-sqlite")]
    Sqlite(sqlx::SqlitePool),
    #[cfg(feature = "database-postgres")]
    Postgres(PgPoolPair),
    #[cfg(not(any(feature = "database-sqlite", feature = "database-postgres")))]
    _None(std::convert::Infallible),
}

/// Database pool supporting both SQLite and PostgreSQL.
///
/// Repositories are cached at construction time to avoid allocation on each access.
pub struct DbPool {
    inner: PoolStorage,
    repos: CachedRepos,
}

impl DbPool {
    /// Create a DbPool from an existing SQLite pool.
    /// Primarily useful for testing.
    #[cfg(feature = "database-sqlite")]
    pub fn from_sqlite(pool: sqlx::SqlitePool) -> Self {
        DbPool {
            repos: CachedRepos::sqlite(&pool),
            inner: PoolStorage::Sqlite(pool),
        }
    }

    /// Create a DbPool from existing PostgreSQL pools.
    /// Primarily useful for testing.
    #[cfg(feature = "database-postgres")]
    pub fn from_postgres(write_pool: sqlx::PgPool, read_pool: Option<sqlx::PgPool>) -> Self {
        DbPool {
            repos: CachedRepos::postgres(&write_pool, &read_pool),
            inner: PoolStorage::Postgres(PgPoolPair {
                write: write_pool,
                read: read_pool,
            }),
        }
    }

    pub async fn from_config(config: &DatabaseConfig) -> DbResult<Self> {
        match config {
            DatabaseConfig::None => Err(DbError::NotConfigured),
            #[cfg(feature = "database-sqlite")]
            DatabaseConfig::Sqlite(cfg) => {
                let pool = sqlx::sqlite::SqlitePoolOptions::new()
                    .max_connections(cfg.max_connections)
                    .connect_with(
                        sqlx::sqlite::SqliteConnectOptions::new()
                            .filename(&cfg.path)
                            .create_if_missing(cfg.create_if_missing)
                            .foreign_keys(true)
                            .journal_mode(if cfg.wal_mode {
                                sqlx::sqlite::SqliteJournalMode::Wal
                            } else {
                                sqlx::sqlite::SqliteJournalMode::Delete
                            })
                            .busy_timeout(std::time::Duration::from_millis(cfg.busy_timeout_ms)),
                    )
                    .await?;

                Ok(Self::from_sqlite(pool))
            }
            #[cfg(feature = "database-postgres")]
            DatabaseConfig::Postgres(cfg) => {
                let write_pool = sqlx::postgres::PgPoolOptions::new()
                    .min_connections(cfg.min_connections)
                    .max_connections(cfg.max_connections)
                    .acquire_timeout(std::time::Duration::from_secs(cfg.connect_timeout_secs))
                    .idle_timeout(std::time::Duration::from_secs(cfg.idle_timeout_secs))
                    .connect(&cfg.url)
                    .await?;

                let read_pool = if let Some(read_url) = &cfg.read_url {
                    tracing::info!("Configuring read replica pool");
                    Some(
                        sqlx::postgres::PgPoolOptions::new()
                            .min_connections(cfg.min_connections)
                            .max_connections(cfg.max_connections)
                            .acquire_timeout(std::time::Duration::from_secs(
                                cfg.connect_timeout_secs,
                            ))
                            .idle_timeout(std::time::Duration::from_secs(cfg.idle_timeout_secs))
                            .connect(read_url)
                            .await?,
                    )
                } else {
                    None
                };

                Ok(Self::from_postgres(write_pool, read_pool))
            }
        }
    }

    /// Run database migrations using sqlx's migration runner.
    /// Migrations always run on the primary (write) pool.
    pub async fn run_migrations(&self) -> DbResult<()> {
        match &self.inner {
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => {
                tracing::info!("Running SQLite migrations");
                sqlx::migrate!("./migrations_sqlx/sqlite").run(pool).await?;
                tracing::info!("SQLite migrations completed successfully");
                Ok(())
            }
            #[cfg(feature = "database-postgres")]
            PoolStorage::Postgres(pools) => {
                tracing::info!("Running PostgreSQL migrations");
                sqlx::migrate!("./migrations_sqlx/postgres")
                    .run(&pools.write)
                    .await?;
                tracing::info!("PostgreSQL migrations completed successfully");
                Ok(())
            }
            #[cfg(not(any(feature = "database-sqlite", feature = "database-postgres")))]
            PoolStorage::_None(infallible) => match *infallible {},
        }
    }

    pub fn accounts(&self) -> Arc<dyn AccountRepo> {
        Arc::clone(&self.repos.accounts)
    }

    pub fn credentials(&self) -> Arc<dyn CredentialRepo> {
        Arc::clone(&self.repos.credentials)
    }

    pub fn rate_limits(&self) -> Arc<dyn RateLimitRepo> {
        Arc::clone(&self.repos.rate_limits)
    }

    pub fn federation_configs(&self) -> Arc<dyn FederationConfigRepo> {
        Arc::clone(&self.repos.federation_configs)
    }

    pub fn sync_locks(&self) -> Arc<dyn SyncLockRepo> {
        Arc::clone(&self.repos.sync_locks)
    }

    pub fn staff(&self) -> Arc<dyn StaffRepo> {
        Arc::clone(&self.repos.staff)
    }

    pub fn identity_links(&self) -> Arc<dyn IdentityLinkRepo> {
        Arc::clone(&self.repos.identity_links)
    }

    /// Health check for database connectivity
    pub async fn health_check(&self) -> DbResult<()> {
        match &self.inner {
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
                Ok(())
            }
            #[cfg(feature = "database-postgres")]
            PoolStorage::Postgres(pools) => {
                sqlx::query("SELECT 1").execute(&pools.write).await?;
                if let Some(read) = &pools.read {
                    sqlx::query("SELECT 1").execute(read).await?;
                }
                Ok(())
            }
            #[cfg(not(any(feature = "database-sqlite", feature = "database-postgres")))]
            PoolStorage::_None(infallible) => match *infallible {},
        }
    }
}
