//! PostgreSQL row source.
//!
//! Each fixed query is wrapped so that the server aggregates the rows into a
//! single JSON array. Column types never need to be known in Rust: whatever
//! PostgreSQL's `row_to_json` produces for a row is what the client sees.

use crate::application::ports::{QueryError, RowSource};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::time::Duration;

/// How long a request waits for a pooled connection before failing.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// [`RowSource`] backed by a lazily connected `sqlx` pool.
#[derive(Debug, Clone)]
pub struct PgRowSource {
    pool: PgPool,
}

impl PgRowSource {
    /// Create a row source without opening any connection yet.
    ///
    /// Connections are established on first use, so the server starts even
    /// when the database is down and answers 500 until it comes back.
    pub fn connect_lazy(options: PgConnectOptions, max_connections: u32) -> Self {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_lazy_with(options);
        Self { pool }
    }

    /// Create a row source from a connection URL, or from the standard
    /// `PGHOST`, `PGPORT`, `PGUSER`, `PGPASSWORD` and `PGDATABASE` variables
    /// when no URL is given.
    ///
    /// # Errors
    /// Returns an error if `database_url` cannot be parsed.
    pub fn from_env(database_url: Option<&str>, max_connections: u32) -> Result<Self, sqlx::Error> {
        let options = match database_url {
            Some(url) => url.parse::<PgConnectOptions>()?,
            None => PgConnectOptions::new(),
        };
        Ok(Self::connect_lazy(options, max_connections))
    }

    /// The underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn wrap_query(sql: &str) -> String {
    format!("SELECT COALESCE(json_agg(q), '[]'::json) FROM ({sql}) AS q")
}

fn map_error(err: sqlx::Error) -> QueryError {
    match err {
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            QueryError::Decode(err.to_string())
        }
        other => QueryError::Database(other.to_string()),
    }
}

#[async_trait]
impl RowSource for PgRowSource {
    async fn fetch_rows(&self, sql: &str) -> Result<Vec<Value>, QueryError> {
        let wrapped = wrap_query(sql);
        let Json(rows) = sqlx::query_scalar::<_, Json<Vec<Value>>>(&wrapped)
            .fetch_one(&self.pool)
            .await
            .map_err(map_error)?;

        tracing::debug!(rows = rows.len(), "query complete");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_query() {
        let wrapped = wrap_query("SELECT * FROM public.poi");
        assert_eq!(
            wrapped,
            "SELECT COALESCE(json_agg(q), '[]'::json) FROM (SELECT * FROM public.poi) AS q"
        );
    }

    #[test]
    fn test_map_error() {
        assert!(matches!(
            map_error(sqlx::Error::RowNotFound),
            QueryError::Database(_)
        ));
        assert!(matches!(
            map_error(sqlx::Error::Decode("bad json".into())),
            QueryError::Decode(_)
        ));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let result = PgRowSource::from_env(Some("not a url"), 1);
        assert!(result.is_err());
    }
}
