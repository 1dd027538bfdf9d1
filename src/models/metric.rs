use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// One measured request of a run. Maps to the `metrics` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Metric {
    pub id: Uuid,
    pub task_id: Uuid,
    pub ts: DateTime<Utc>,
    pub latency_ms: Option<i32>,
    pub http_status: Option<i32>,
    pub prompt_tokens: Option<i32>,
    pub completion_tokens: Option<i32>,
    pub cost_usd: Option<f64>,
    pub quality: Option<f64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMetric {
    pub task_id: Uuid,
    pub ts: DateTime<Utc>,
    pub latency_ms: Option<i32>,
    pub http_status: Option<i32>,
    pub prompt_tokens: Option<i32>,
    pub completion_tokens: Option<i32>,
    pub cost_usd: Option<f64>,
    pub quality: Option<f64>,
    pub error: Option<String>,
}

impl Metric {
    /// Insert every item in one transaction; nothing is stored on failure
    pub async fn insert_batch(pool: &PgPool, items: &[NewMetric]) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO metrics (id, task_id, ts, latency_ms, http_status, prompt_tokens,
                                     completion_tokens, cost_usd, quality, error)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(item.task_id)
            .bind(item.ts)
            .bind(item.latency_ms)
            .bind(item.http_status)
            .bind(item.prompt_tokens)
            .bind(item.completion_tokens)
            .bind(item.cost_usd)
            .bind(item.quality)
            .bind(item.error.as_deref())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(items.len() as u64)
    }

    /// Metrics of one task in timestamp order, optionally bounded (inclusive)
    pub async fn for_task(
        pool: &PgPool,
        task_id: Uuid,
        ts_ge: Option<DateTime<Utc>>,
        ts_le: Option<DateTime<Utc>>,
    ) -> Result<Vec<Metric>, sqlx::Error> {
        sqlx::query_as::<_, Metric>(
            r#"
            SELECT id, task_id, ts, latency_ms, http_status, prompt_tokens,
                   completion_tokens, cost_usd, quality, error
            FROM metrics
            WHERE task_id = $1
              AND ($2::timestamptz IS NULL OR ts >= $2)
              AND ($3::timestamptz IS NULL OR ts <= $3)
            ORDER BY ts ASC
            "#,
        )
        .bind(task_id)
        .bind(ts_ge)
        .bind(ts_le)
        .fetch_all(pool)
        .await
    }
}
