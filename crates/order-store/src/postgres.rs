use async_trait::async_trait;
use sqlx::PgPool;

use crate::{OrderId, Result, store::OrderStore};

/// PostgreSQL-backed order store.
///
/// All bounded-context tables share one `order_records` relation, keyed by
/// `(table_name, id)`.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[tracing::instrument(skip(self))]
    async fn get(&self, table: &str, id: &OrderId) -> Result<Option<serde_json::Value>> {
        let record: Option<serde_json::Value> = sqlx::query_scalar(
            "SELECT record FROM order_records WHERE table_name = $1 AND id = $2",
        )
        .bind(table)
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self, record))]
    async fn put(&self, table: &str, id: &OrderId, record: serde_json::Value) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO order_records (table_name, id, record, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (table_name, id)
            DO UPDATE SET record = EXCLUDED.record, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(table)
        .bind(id.as_str())
        .bind(&record)
        .execute(&self.pool)
        .await?;

        metrics::counter!("order_store_writes_total").increment(1);
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, table: &str, id: &OrderId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM order_records WHERE table_name = $1 AND id = $2")
            .bind(table)
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
