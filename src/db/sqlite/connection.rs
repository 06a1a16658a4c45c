//! SQLite database connection and migration management.

use std::path::Path;
use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use super::{
    SqliteApiKeyRepository, SqliteDependencyRepository, SqliteHosterRepository,
    SqliteServerRepository, SqliteServiceImageRepository, SqliteServiceRepository,
    SqliteUserRepository,
};
use crate::db::{Database, DbError, DbResult};

/// SQLite database implementation.
///
/// Provides access to repositories via associated types, avoiding dynamic dispatch.
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Open (or create) a database at the given path.
    pub async fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await
            .map_err(|e| DbError::Connection {
                message: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    /// Create an in-memory database (useful for testing).
    ///
    /// A single connection is used: every new connection to `:memory:`
    /// would otherwise see its own empty database.
    pub async fn in_memory() -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| DbError::Connection {
                message: e.to_string(),
            })?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| DbError::Connection {
                message: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    /// Direct pool access for tests and ad-hoc queries.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl Database for SqliteDatabase {
    type Servers<'a> = SqliteServerRepository<'a>;
    type Services<'a> = SqliteServiceRepository<'a>;
    type Dependencies<'a> = SqliteDependencyRepository<'a>;
    type Hosters<'a> = SqliteHosterRepository<'a>;
    type Users<'a> = SqliteUserRepository<'a>;
    type ApiKeys<'a> = SqliteApiKeyRepository<'a>;
    type ServiceImages<'a> = SqliteServiceImageRepository<'a>;

    async fn migrate(&self) -> DbResult<()> {
        sqlx::migrate!("./data/sql/sqlite")
            .run(&self.pool)
            .await
            .map_err(|e| DbError::Migration {
                message: e.to_string(),
            })
    }

    async fn ping(&self) -> DbResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| DbError::Connection {
                message: e.to_string(),
            })?;
        Ok(())
    }

    fn servers(&self) -> Self::Servers<'_> {
        SqliteServerRepository { pool: &self.pool }
    }

    fn services(&self) -> Self::Services<'_> {
        SqliteServiceRepository { pool: &self.pool }
    }

    fn dependencies(&self) -> Self::Dependencies<'_> {
        SqliteDependencyRepository { pool: &self.pool }
    }

    fn hosters(&self) -> Self::Hosters<'_> {
        SqliteHosterRepository { pool: &self.pool }
    }

    fn users(&self) -> Self::Users<'_> {
        SqliteUserRepository { pool: &self.pool }
    }

    fn api_keys(&self) -> Self::ApiKeys<'_> {
        SqliteApiKeyRepository { pool: &self.pool }
    }

    fn service_images(&self) -> Self::ServiceImages<'_> {
        SqliteServiceImageRepository { pool: &self.pool }
    }
}
