//! # benchmark_users
//!
//! The tutorial table and its demonstration statements. Each operation is a
//! single SQL statement against the pool; errors are whatever PostgreSQL
//! reports. No validation is layered on top, so a 101-character email fails
//! in the database (`22001`), not here.

use crate::constants::ADULT_PERMISSION_GROUP;
use crate::logging::log_database_operation;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::time::Instant;
use tracing::info;

pub const TABLE_NAME: &str = "benchmark_users";

/// A row of `benchmark_users`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct BenchmarkUser {
    pub id: i32,
    pub email: Option<String>,
    /// Meaning is unresolved (tier vs. age-like threshold); stored as-is
    pub permission_group: Option<i32>,
    /// Column has a default but no NOT NULL constraint
    pub created_at: Option<NaiveDateTime>,
}

impl BenchmarkUser {
    pub async fn create_table(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS benchmark_users (
                id SERIAL PRIMARY KEY,
                email VARCHAR(100),
                permission_group INT,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Full scan (`SELECT *`)
    pub async fn fetch_all(pool: &PgPool) -> Result<Vec<BenchmarkUser>, sqlx::Error> {
        sqlx::query_as::<_, BenchmarkUser>(
            "SELECT id, email, permission_group, created_at FROM benchmark_users",
        )
        .fetch_all(pool)
        .await
    }

    /// Single-column projection
    pub async fn emails(pool: &PgPool) -> Result<Vec<Option<String>>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<String>>("SELECT email FROM benchmark_users")
            .fetch_all(pool)
            .await
    }

    /// Filtered scan: `permission_group >= min_group`
    pub async fn with_min_permission_group(
        pool: &PgPool,
        min_group: i32,
    ) -> Result<Vec<BenchmarkUser>, sqlx::Error> {
        sqlx::query_as::<_, BenchmarkUser>(
            r#"
            SELECT id, email, permission_group, created_at
            FROM benchmark_users
            WHERE permission_group >= $1
            "#,
        )
        .bind(min_group)
        .fetch_all(pool)
        .await
    }

    pub async fn insert(
        pool: &PgPool,
        email: Option<&str>,
        permission_group: Option<i32>,
    ) -> Result<BenchmarkUser, sqlx::Error> {
        sqlx::query_as::<_, BenchmarkUser>(
            r#"
            INSERT INTO benchmark_users (email, permission_group)
            VALUES ($1, $2)
            RETURNING id, email, permission_group, created_at
            "#,
        )
        .bind(email)
        .bind(permission_group)
        .fetch_one(pool)
        .await
    }

    /// Rows matching `email` exactly; the column is not unique
    pub async fn find_by_email(
        pool: &PgPool,
        email: &str,
    ) -> Result<Vec<BenchmarkUser>, sqlx::Error> {
        sqlx::query_as::<_, BenchmarkUser>(
            r#"
            SELECT id, email, permission_group, created_at
            FROM benchmark_users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_all(pool)
        .await
    }

    /// Conditional update; returns rows affected
    pub async fn update_permission_group(
        pool: &PgPool,
        email: &str,
        permission_group: i32,
    ) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("UPDATE benchmark_users SET permission_group = $2 WHERE email = $1")
                .bind(email)
                .bind(permission_group)
                .execute(pool)
                .await?;
        Ok(result.rows_affected())
    }

    /// Conditional delete; returns rows affected. NULL groups are kept.
    pub async fn delete_below_permission_group(
        pool: &PgPool,
        threshold: i32,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM benchmark_users WHERE permission_group < $1")
            .bind(threshold)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Paginated ordered scan (`ORDER BY id LIMIT .. OFFSET ..`)
    pub async fn page(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BenchmarkUser>, sqlx::Error> {
        sqlx::query_as::<_, BenchmarkUser>(
            r#"
            SELECT id, email, permission_group, created_at
            FROM benchmark_users
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    pub async fn drop_table(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::query("DROP TABLE benchmark_users").execute(pool).await?;
        Ok(())
    }
}

/// Catalog listing of tables in the `public` schema
pub async fn list_tables(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    // information_schema columns are `sql_identifier`, which does not decode as TEXT
    sqlx::query_scalar::<_, String>(
        r#"
        SELECT table_name::text
        FROM information_schema.tables
        WHERE table_schema = 'public'
        ORDER BY table_name
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Rows inserted by [`walkthrough`]
pub const SAMPLE_ROWS: [(&str, i32); 3] = [
    ("alice@example.com", 25),
    ("bob@example.com", 16),
    ("carol@example.com", 42),
];

/// What each step of the demonstration sequence observed
#[derive(Debug, Clone, Default, Serialize)]
pub struct WalkthroughReport {
    pub inserted: Vec<BenchmarkUser>,
    pub all_rows: Vec<BenchmarkUser>,
    pub emails: Vec<Option<String>>,
    pub adults: Vec<BenchmarkUser>,
    pub updated: u64,
    pub deleted: u64,
    pub first_page: Vec<BenchmarkUser>,
    pub tables: Vec<String>,
    pub dropped: bool,
}

/// Run the demonstration sequence end to end.
///
/// create → insert samples → full scan → projection → filtered scan →
/// update alice to 26 → delete below the threshold → first page of 10 →
/// catalog listing → drop (unless `keep_table`).
pub async fn walkthrough(pool: &PgPool, keep_table: bool) -> Result<WalkthroughReport, sqlx::Error> {
    let mut report = WalkthroughReport::default();

    step("create_table", None, || BenchmarkUser::create_table(pool)).await?;

    for (email, group) in SAMPLE_ROWS {
        let row = step("insert", Some(1), || {
            BenchmarkUser::insert(pool, Some(email), Some(group))
        })
        .await?;
        report.inserted.push(row);
    }

    report.all_rows = BenchmarkUser::fetch_all(pool).await?;
    info!(rows = report.all_rows.len(), "SELECT * FROM benchmark_users");

    report.emails = BenchmarkUser::emails(pool).await?;
    info!(rows = report.emails.len(), "SELECT email FROM benchmark_users");

    report.adults = BenchmarkUser::with_min_permission_group(pool, ADULT_PERMISSION_GROUP).await?;
    info!(
        rows = report.adults.len(),
        threshold = ADULT_PERMISSION_GROUP,
        "SELECT ... WHERE permission_group >= threshold"
    );

    report.updated = BenchmarkUser::update_permission_group(pool, "alice@example.com", 26).await?;
    log_database_operation("update", Some(TABLE_NAME), Some(report.updated), "ok", None);

    report.deleted =
        BenchmarkUser::delete_below_permission_group(pool, ADULT_PERMISSION_GROUP).await?;
    log_database_operation("delete", Some(TABLE_NAME), Some(report.deleted), "ok", None);

    report.first_page = BenchmarkUser::page(pool, 10, 0).await?;
    info!(rows = report.first_page.len(), "ORDER BY id LIMIT 10 OFFSET 0");

    report.tables = list_tables(pool).await?;
    info!(tables = ?report.tables, "public tables");

    if !keep_table {
        step("drop_table", None, || BenchmarkUser::drop_table(pool)).await?;
        report.dropped = true;
    }

    Ok(report)
}

async fn step<T, F, Fut>(operation: &str, rows: Option<u64>, f: F) -> Result<T, sqlx::Error>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    let started = Instant::now();
    let result = f().await;
    let status = if result.is_ok() { "ok" } else { "error" };
    log_database_operation(
        operation,
        Some(TABLE_NAME),
        rows,
        status,
        Some(started.elapsed().as_millis() as u64),
    );
    result
}
