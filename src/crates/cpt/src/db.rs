//! Database access handle
//!
//! Provides the single connection every command issues its statements
//! through. The schema belongs to the workflow engine; nothing here creates
//! or migrates tables.

pub mod statement;

pub use statement::{Bind, Executor, Statement};

use crate::config::DatabaseConfig;
use crate::error::{CptError, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{FromRow, Postgres, Row, Sqlite};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// SQL dialect of the connected backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Suffix that turns a SELECT into a locking read
    pub fn row_lock_suffix(&self) -> &'static str {
        match self {
            Self::Postgres => " FOR UPDATE",
            Self::Sqlite => "",
        }
    }

    /// Expression exposing `data` as a JSON value
    pub fn json_projection(&self) -> &'static str {
        match self {
            Self::Postgres => "data::jsonb",
            Self::Sqlite => "json(data)",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Postgres => write!(f, "postgres"),
            Self::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Connection pool of one of the supported backends
#[derive(Clone, Debug)]
pub enum DatabasePool {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

/// Database connection wrapper
#[derive(Clone, Debug)]
pub struct Database {
    pub(crate) pool: DatabasePool,
}

impl Database {
    /// Open the connection described by the configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = config.url.as_deref().ok_or_else(|| {
            CptError::Config(
                "No database configured. Make sure that DATABASE_URL environment variable is set"
                    .to_string(),
            )
        })?;

        Self::connect_with(
            url,
            config.max_connections,
            Duration::from_secs(config.connect_timeout_secs),
        )
        .await
    }

    /// Open a single connection to `url`
    pub async fn connect_url(url: &str) -> Result<Self> {
        Self::connect_with(url, 1, Duration::from_secs(30)).await
    }

    async fn connect_with(url: &str, max_connections: u32, timeout: Duration) -> Result<Self> {
        let pool = if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            let pool = PgPoolOptions::new()
                .max_connections(max_connections)
                .acquire_timeout(timeout)
                .connect(url)
                .await
                .map_err(|e| CptError::Connection(e.to_string()))?;
            DatabasePool::Postgres(pool)
        } else if url.starts_with("sqlite:") {
            let pool = SqlitePoolOptions::new()
                .max_connections(max_connections)
                .acquire_timeout(timeout)
                .connect(url)
                .await
                .map_err(|e| CptError::Connection(e.to_string()))?;
            DatabasePool::Sqlite(pool)
        } else {
            return Err(CptError::Config(
                "Unsupported DATABASE_URL scheme, expected postgres:// or sqlite:".to_string(),
            ));
        };

        let db = Self { pool };
        info!(backend = %db.dialect(), "Database connection established");
        Ok(db)
    }

    /// Dialect of the connected backend
    pub fn dialect(&self) -> Dialect {
        match self.pool {
            DatabasePool::Postgres(_) => Dialect::Postgres,
            DatabasePool::Sqlite(_) => Dialect::Sqlite,
        }
    }

    /// Run a statement expected to return a single count column
    pub async fn fetch_count(&self, statement: &Statement) -> Result<i64> {
        debug!(sql = statement.sql(), "fetch_count");
        let count = match &self.pool {
            DatabasePool::Postgres(pool) => bind_pg(statement).fetch_one(pool).await?.try_get(0)?,
            DatabasePool::Sqlite(pool) => {
                bind_sqlite(statement).fetch_one(pool).await?.try_get(0)?
            }
        };
        Ok(count)
    }

    /// Run a statement and collect its first column as strings
    ///
    /// Rows whose value cannot be read are logged and skipped.
    pub async fn fetch_strings(&self, statement: &Statement) -> Result<Vec<String>> {
        debug!(sql = statement.sql(), "fetch_strings");
        let values: Vec<sqlx::Result<String>> = match &self.pool {
            DatabasePool::Postgres(pool) => bind_pg(statement)
                .fetch_all(pool)
                .await?
                .iter()
                .map(|row| row.try_get(0))
                .collect(),
            DatabasePool::Sqlite(pool) => bind_sqlite(statement)
                .fetch_all(pool)
                .await?
                .iter()
                .map(|row| row.try_get(0))
                .collect(),
        };

        Ok(keep_readable(values))
    }

    /// Run a statement and map every readable row to `T`
    pub async fn fetch_all_as<T>(&self, statement: &Statement) -> Result<Vec<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + for<'r> FromRow<'r, SqliteRow>,
    {
        debug!(sql = statement.sql(), "fetch_all_as");
        let values: Vec<sqlx::Result<T>> = match &self.pool {
            DatabasePool::Postgres(pool) => bind_pg(statement)
                .fetch_all(pool)
                .await?
                .iter()
                .map(|row| <T as FromRow<'_, PgRow>>::from_row(row))
                .collect(),
            DatabasePool::Sqlite(pool) => bind_sqlite(statement)
                .fetch_all(pool)
                .await?
                .iter()
                .map(|row| <T as FromRow<'_, SqliteRow>>::from_row(row))
                .collect(),
        };

        Ok(keep_readable(values))
    }

    /// Run a statement returning at most one row mapped to `T`
    pub async fn fetch_optional_as<T>(&self, statement: &Statement) -> Result<Option<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + for<'r> FromRow<'r, SqliteRow>,
    {
        debug!(sql = statement.sql(), "fetch_optional_as");
        let value = match &self.pool {
            DatabasePool::Postgres(pool) => bind_pg(statement)
                .fetch_optional(pool)
                .await?
                .map(|row| <T as FromRow<'_, PgRow>>::from_row(&row))
                .transpose()?,
            DatabasePool::Sqlite(pool) => bind_sqlite(statement)
                .fetch_optional(pool)
                .await?
                .map(|row| <T as FromRow<'_, SqliteRow>>::from_row(&row))
                .transpose()?,
        };
        Ok(value)
    }

    /// Close the database connection
    pub async fn close(&self) {
        match &self.pool {
            DatabasePool::Postgres(pool) => pool.close().await,
            DatabasePool::Sqlite(pool) => pool.close().await,
        }
        debug!("Database connection closed");
    }
}

#[async_trait]
impl Executor for Database {
    fn dialect(&self) -> Dialect {
        Database::dialect(self)
    }

    async fn execute(&self, statement: &Statement) -> Result<u64> {
        debug!(sql = statement.sql(), "execute");
        let rows = match &self.pool {
            DatabasePool::Postgres(pool) => bind_pg(statement).execute(pool).await?.rows_affected(),
            DatabasePool::Sqlite(pool) => {
                bind_sqlite(statement).execute(pool).await?.rows_affected()
            }
        };
        Ok(rows)
    }
}

fn bind_pg(statement: &Statement) -> Query<'_, Postgres, PgArguments> {
    statement
        .binds()
        .iter()
        .fold(sqlx::query(statement.sql()), |query, bind| match bind {
            Bind::Text(value) => query.bind(value.as_str()),
            Bind::Int(value) => query.bind(*value),
            Bind::Timestamp(value) => query.bind(*value),
        })
}

fn bind_sqlite(statement: &Statement) -> Query<'_, Sqlite, SqliteArguments<'_>> {
    statement
        .binds()
        .iter()
        .fold(sqlx::query(statement.sql()), |query, bind| match bind {
            Bind::Text(value) => query.bind(value.as_str()),
            Bind::Int(value) => query.bind(*value),
            Bind::Timestamp(value) => query.bind(*value),
        })
}

fn keep_readable<T>(values: Vec<sqlx::Result<T>>) -> Vec<T> {
    values
        .into_iter()
        .filter_map(|value| match value {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable row");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_in_memory_database() {
        let db = Database::connect_url("sqlite::memory:").await.unwrap();

        assert_eq!(db.dialect(), Dialect::Sqlite);
        let one = db.fetch_count(&Statement::new("SELECT CAST(1 AS BIGINT)")).await;
        assert_eq!(one.unwrap(), 1);
        db.close().await;
    }

    #[tokio::test]
    async fn test_unsupported_scheme_is_config_error() {
        let err = Database::connect_url("mysql://localhost/copper").await.unwrap_err();
        assert!(matches!(err, CptError::Config(_)));
    }

    #[tokio::test]
    async fn test_missing_url_is_config_error() {
        let config = DatabaseConfig::default();
        let err = Database::connect(&config).await.unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[tokio::test]
    async fn test_execute_and_fetch_with_binds() {
        let db = Database::connect_url("sqlite::memory:").await.unwrap();
        db.execute(&Statement::new("CREATE TABLE t (id TEXT, state INTEGER)"))
            .await
            .unwrap();

        let inserted = db
            .execute(
                &Statement::new("INSERT INTO t (id, state) VALUES ($1, $2), ($3, $4)")
                    .bind("a")
                    .bind(5)
                    .bind("b")
                    .bind(3),
            )
            .await
            .unwrap();
        assert_eq!(inserted, 2);

        let ids = db
            .fetch_strings(&Statement::new("SELECT id FROM t WHERE state = $1").bind(5))
            .await
            .unwrap();
        assert_eq!(ids, vec!["a".to_string()]);

        let count = db
            .fetch_count(&Statement::new("SELECT count(id) FROM t"))
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_dialect_fragments() {
        assert_eq!(Dialect::Postgres.row_lock_suffix(), " FOR UPDATE");
        assert_eq!(Dialect::Sqlite.row_lock_suffix(), "");
        assert_eq!(Dialect::Postgres.json_projection(), "data::jsonb");
    }
}
