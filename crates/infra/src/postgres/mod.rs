//! Postgres-backed stores.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | ServiceError |
//! |------------|----------------------|--------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `NotFound` |
//! | Database (other) | any other | `Internal` |
//! | PoolTimedOut / PoolClosed / Io / other | N/A | `Internal` |
//!
//! Every mutation runs in its own transaction. A transaction dropped before
//! `commit` (early return, deadline expiry) is rolled back by `sqlx`.

mod actions;
mod associations;
mod credentials;
mod roles;

use std::str::FromStr;
use std::sync::Arc;

use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tracing::instrument;

use warden_core::ServiceError;

use crate::config::DbConfig;

const SCHEMA: &str = include_str!("../../sql/schema.sql");

/// Postgres implementation of every store trait, sharing one pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Open a pool sized and timed from `config`.
    ///
    /// The statement timeout is set per connection, so a runaway query is
    /// cancelled server-side even if the caller stops waiting.
    pub async fn connect(config: &DbConfig) -> Result<Self, sqlx::Error> {
        let options = PgConnectOptions::from_str(&config.url)?.options([(
            "statement_timeout",
            format!("{}ms", config.statement_timeout.as_millis()),
        )]);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .max_lifetime(Some(config.max_lifetime))
            .connect_with(options)
            .await?;

        tracing::info!(
            max_connections = config.max_connections,
            statement_timeout_ms = config.statement_timeout.as_millis() as u64,
            "postgres pool ready"
        );
        Ok(Self::new(pool))
    }

    /// Create any missing tables and indexes.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), ServiceError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> ServiceError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => ServiceError::conflict("resource already exists"),
                Some("23503") => ServiceError::not_found("referenced resource"),
                _ => ServiceError::internal(msg),
            }
        }
        sqlx::Error::PoolTimedOut => {
            ServiceError::internal(format!("connection pool timed out in {operation}"))
        }
        sqlx::Error::PoolClosed => {
            ServiceError::internal(format!("connection pool closed in {operation}"))
        }
        other => ServiceError::internal(format!("database error in {operation}: {other}")),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23503";
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::ErrorKind;

    #[test]
    fn non_database_errors_are_internal() {
        assert_eq!(map_sqlx_error("get_role", sqlx::Error::PoolTimedOut).kind(), ErrorKind::Internal);
        assert_eq!(map_sqlx_error("get_role", sqlx::Error::RowNotFound).kind(), ErrorKind::Internal);
        assert!(!is_unique_violation(&sqlx::Error::PoolClosed));
        assert!(!is_foreign_key_violation(&sqlx::Error::PoolClosed));
    }

    #[test]
    fn schema_is_idempotent_ddl() {
        for stmt in SCHEMA.split(';').map(str::trim).filter(|s| s.contains("CREATE")) {
            assert!(stmt.contains("IF NOT EXISTS"), "non-idempotent statement: {stmt}");
        }
        assert!(SCHEMA.contains("credentials_id  BIGINT NOT NULL UNIQUE"));
    }
}
