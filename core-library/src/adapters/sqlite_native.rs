//! Native SQLite Database Adapter
//!
//! Implements the `DatabaseAdapter` trait using `sqlx` with the native
//! SQLite driver. Rendered query text from the builder arrives here with
//! its positional binds; rows go back as column-name → value maps.

use async_trait::async_trait;
use bridge_traits::database::{DatabaseAdapter, DatabaseConfig, QueryRow, QueryValue};
use bridge_traits::error::{BridgeError, Result};
use sqlx::{Column, Pool, Row, Sqlite};
use std::collections::HashMap;
use tracing::debug;

/// Native SQLite implementation of `DatabaseAdapter`.
///
/// Wraps a `sqlx::Pool<Sqlite>`; pool construction (and migrations) happen
/// in [`crate::db::create_pool`], so an adapter is always backed by a
/// migrated store.
pub struct SqliteAdapter {
    pool: Pool<Sqlite>,
}

impl SqliteAdapter {
    /// Connect to the store described by `config` and wrap it.
    pub async fn connect(config: &DatabaseConfig) -> crate::Result<Self> {
        let pool = crate::db::create_pool(config).await?;
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Direct access to the underlying pool for advanced use cases.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Convert a sqlx row to a `QueryRow` map.
    fn row_to_query_row(row: &sqlx::sqlite::SqliteRow) -> QueryRow {
        let mut result = HashMap::new();

        for column in row.columns() {
            let column_name = column.name().to_string();

            // Try the value as each storage class in turn
            let value = if let Ok(v) = row.try_get::<Option<i64>, _>(column.ordinal()) {
                v.map(QueryValue::Integer).unwrap_or(QueryValue::Null)
            } else if let Ok(v) = row.try_get::<Option<f64>, _>(column.ordinal()) {
                v.map(QueryValue::Real).unwrap_or(QueryValue::Null)
            } else if let Ok(v) = row.try_get::<Option<String>, _>(column.ordinal()) {
                v.map(QueryValue::Text).unwrap_or(QueryValue::Null)
            } else if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(column.ordinal()) {
                v.map(QueryValue::Blob).unwrap_or(QueryValue::Null)
            } else {
                QueryValue::Null
            };

            result.insert(column_name, value);
        }

        result
    }

    /// Bind `QueryValue` parameters onto a sqlx query.
    fn bind_params<'q>(
        query: sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
        params: &'q [QueryValue],
    ) -> sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
        let mut query = query;
        for param in params {
            query = match param {
                QueryValue::Null => query.bind(None::<i64>),
                QueryValue::Integer(i) => query.bind(i),
                QueryValue::Real(r) => query.bind(r),
                QueryValue::Text(s) => query.bind(s.as_str()),
                QueryValue::Blob(b) => query.bind(b.as_slice()),
            };
        }
        query
    }
}

#[async_trait]
impl DatabaseAdapter for SqliteAdapter {
    async fn query(&self, query: &str, params: &[QueryValue]) -> Result<Vec<QueryRow>> {
        debug!(query = %query, param_count = params.len(), "Executing query");

        let sqlx_query = Self::bind_params(sqlx::query(query), params);

        let rows = sqlx_query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Query failed: {}", e)))?;

        let result: Vec<QueryRow> = rows.iter().map(Self::row_to_query_row).collect();

        debug!(row_count = result.len(), "Query executed successfully");
        Ok(result)
    }

    async fn query_one_optional(
        &self,
        query: &str,
        params: &[QueryValue],
    ) -> Result<Option<QueryRow>> {
        let sqlx_query = Self::bind_params(sqlx::query(query), params);

        let row = sqlx_query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Query one optional failed: {}", e)))?;

        Ok(row.as_ref().map(Self::row_to_query_row))
    }

    async fn query_one(&self, query: &str, params: &[QueryValue]) -> Result<QueryRow> {
        let sqlx_query = Self::bind_params(sqlx::query(query), params);

        let row = sqlx_query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Query one failed: {}", e)))?;

        Ok(Self::row_to_query_row(&row))
    }

    async fn execute(&self, statement: &str, params: &[QueryValue]) -> Result<u64> {
        debug!(statement = %statement, param_count = params.len(), "Executing statement");

        let sqlx_query = Self::bind_params(sqlx::query(statement), params);

        let result = sqlx_query
            .execute(&self.pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Execute failed: {}", e)))?;

        Ok(result.rows_affected())
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Health check failed: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    #[tokio::test]
    async fn query_decodes_all_storage_classes() {
        let pool = create_test_pool().await.unwrap();
        let adapter = SqliteAdapter::from_pool(pool);

        adapter
            .execute(
                "INSERT INTO tracks (id, title, year, bpm, filename) \
                 VALUES (?, ?, ?, ?, ?)",
                &[
                    QueryValue::Integer(1),
                    QueryValue::Text("Song".to_string()),
                    QueryValue::Integer(1999),
                    QueryValue::Real(121.5),
                    QueryValue::Null,
                ],
            )
            .await
            .unwrap();

        let rows = adapter
            .query(
                "SELECT id, title, year, bpm, filename FROM tracks WHERE id = ?",
                &[QueryValue::Integer(1)],
            )
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.get("id"), Some(&QueryValue::Integer(1)));
        assert_eq!(row.get("title"), Some(&QueryValue::Text("Song".into())));
        assert_eq!(row.get("year"), Some(&QueryValue::Integer(1999)));
        assert_eq!(row.get("bpm"), Some(&QueryValue::Real(121.5)));
        assert_eq!(row.get("filename"), Some(&QueryValue::Null));
    }

    #[tokio::test]
    async fn query_one_fails_on_no_rows() {
        let pool = create_test_pool().await.unwrap();
        let adapter = SqliteAdapter::from_pool(pool);

        let result = adapter
            .query_one("SELECT * FROM tracks WHERE id = ?", &[QueryValue::Integer(404)])
            .await;
        assert!(result.is_err());

        let optional = adapter
            .query_one_optional("SELECT * FROM tracks WHERE id = ?", &[QueryValue::Integer(404)])
            .await
            .unwrap();
        assert!(optional.is_none());
    }

    #[tokio::test]
    async fn malformed_sql_is_a_database_error() {
        let pool = create_test_pool().await.unwrap();
        let adapter = SqliteAdapter::from_pool(pool);

        let err = adapter.query("SELECT FROM nothing", &[]).await.unwrap_err();
        assert!(matches!(err, BridgeError::DatabaseError(_)));
    }

    #[tokio::test]
    async fn health_check_passes() {
        let pool = create_test_pool().await.unwrap();
        let adapter = SqliteAdapter::from_pool(pool);
        adapter.health_check().await.unwrap();
    }
}
