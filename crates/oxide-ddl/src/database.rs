//! Database connections.
//!
//! The dialect is picked once from the URL scheme and carried by the
//! [`Database`] variant, so introspection and execution always agree on it.

use std::str::FromStr;

use oxide_ddl_core::catalog::Catalog;
use oxide_ddl_core::dialect::DialectKind;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::error::{EnsureError, Result};
use crate::introspect::{Introspect, MySqlIntrospector, PostgresIntrospector, SqliteIntrospector};

/// A connection pool for one of the supported databases.
#[derive(Debug, Clone)]
pub enum Database {
    Postgres(PgPool),
    MySql(MySqlPool),
    Sqlite(SqlitePool),
}

impl Database {
    /// Connects to `url`, inferring the dialect from its scheme.
    ///
    /// SQLite databases are created if missing and run with foreign keys
    /// enforced. An in-memory SQLite database lives as long as the pool's
    /// single connection, so that connection is never recycled.
    ///
    /// # Errors
    ///
    /// Returns [`EnsureError::UnsupportedUrl`] for an unknown scheme and
    /// [`EnsureError::Database`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self> {
        let kind =
            DialectKind::from_url(url).ok_or_else(|| EnsureError::UnsupportedUrl(url.to_string()))?;
        info!(dialect = %kind, "Connecting to database");

        let database = match kind {
            DialectKind::Postgres => {
                Self::Postgres(PgPoolOptions::new().max_connections(5).connect(url).await?)
            }
            DialectKind::MySql => {
                Self::MySql(MySqlPoolOptions::new().max_connections(5).connect(url).await?)
            }
            DialectKind::Sqlite => {
                let options = SqliteConnectOptions::from_str(url)?
                    .create_if_missing(true)
                    .foreign_keys(true);
                let pool = SqlitePoolOptions::new()
                    .max_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .connect_with(options)
                    .await?;
                Self::Sqlite(pool)
            }
        };
        Ok(database)
    }

    /// Returns the dialect of the connected database.
    #[must_use]
    pub const fn kind(&self) -> DialectKind {
        match self {
            Self::Postgres(_) => DialectKind::Postgres,
            Self::MySql(_) => DialectKind::MySql,
            Self::Sqlite(_) => DialectKind::Sqlite,
        }
    }

    /// Reads the live schema.
    ///
    /// # Errors
    ///
    /// Returns [`EnsureError::Introspection`] naming the table if reading
    /// one fails, and [`EnsureError::Database`] if listing tables fails.
    pub async fn snapshot(&self) -> Result<Catalog> {
        match self {
            Self::Postgres(pool) => PostgresIntrospector::new(pool.clone()).snapshot().await,
            Self::MySql(pool) => MySqlIntrospector::new(pool.clone()).snapshot().await,
            Self::Sqlite(pool) => SqliteIntrospector::new(pool.clone()).snapshot().await,
        }
    }

    /// Executes one statement without bind arguments.
    ///
    /// # Errors
    ///
    /// Returns the driver error unchanged so the caller can attach the SQL.
    pub async fn execute(&self, sql: &str) -> std::result::Result<(), sqlx::Error> {
        match self {
            Self::Postgres(pool) => sqlx::query(sql).execute(pool).await.map(drop),
            Self::MySql(pool) => sqlx::query(sql).execute(pool).await.map(drop),
            Self::Sqlite(pool) => sqlx::query(sql).execute(pool).await.map(drop),
        }
    }

    /// Closes the pool.
    pub async fn close(&self) {
        match self {
            Self::Postgres(pool) => pool.close().await,
            Self::MySql(pool) => pool.close().await,
            Self::Sqlite(pool) => pool.close().await,
        }
    }
}

impl From<SqlitePool> for Database {
    fn from(pool: SqlitePool) -> Self {
        Self::Sqlite(pool)
    }
}

impl From<PgPool> for Database {
    fn from(pool: PgPool) -> Self {
        Self::Postgres(pool)
    }
}

impl From<MySqlPool> for Database {
    fn from(pool: MySqlPool) -> Self {
        Self::MySql(pool)
    }
}
