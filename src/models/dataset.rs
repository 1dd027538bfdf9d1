use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

/// Registered benchmark dataset. Maps to the `datasets` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Dataset {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub storage_uri: String,
    pub description: Option<String>,
    pub tags: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDataset {
    pub user_id: Uuid,
    pub name: String,
    pub storage_uri: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DatasetChanges {
    pub name: Option<String>,
    pub storage_uri: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Listing filter; `name_like` is a case-insensitive substring match
#[derive(Debug, Clone, Default)]
pub struct DatasetFilter {
    pub user_id: Option<Uuid>,
    pub name_like: Option<String>,
}

/// Immutable snapshot of a dataset. Maps to `dataset_versions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DatasetVersion {
    pub id: Uuid,
    pub dataset_id: Uuid,
    pub version: String,
    pub storage_uri: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

const DATASET_COLUMNS: &str =
    "id, user_id, name, storage_uri, description, tags, created_at, updated_at";

impl Dataset {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    pub async fn create(pool: &PgPool, new_dataset: NewDataset) -> Result<Dataset, sqlx::Error> {
        sqlx::query_as::<_, Dataset>(&format!(
            r#"
            INSERT INTO datasets (id, user_id, name, storage_uri, description, tags, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
            RETURNING {DATASET_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(new_dataset.user_id)
        .bind(new_dataset.name)
        .bind(new_dataset.storage_uri)
        .bind(new_dataset.description)
        .bind(Json(new_dataset.tags))
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Dataset>, sqlx::Error> {
        sqlx::query_as::<_, Dataset>(&format!(
            "SELECT {DATASET_COLUMNS} FROM datasets WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// One page of datasets, newest first, plus the unpaginated total
    pub async fn list(
        pool: &PgPool,
        filter: &DatasetFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Dataset>, i64), sqlx::Error> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM datasets WHERE TRUE");
        push_filter(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {DATASET_COLUMNS} FROM datasets WHERE TRUE"
        ));
        push_filter(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let items = select.build_query_as::<Dataset>().fetch_all(pool).await?;

        Ok((items, total))
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        changes: DatasetChanges,
    ) -> Result<Option<Dataset>, sqlx::Error> {
        sqlx::query_as::<_, Dataset>(&format!(
            r#"
            UPDATE datasets
            SET name = COALESCE($2, name),
                storage_uri = COALESCE($3, storage_uri),
                description = COALESCE($4, description),
                tags = COALESCE($5, tags),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {DATASET_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.storage_uri)
        .bind(changes.description)
        .bind(changes.tags.map(Json))
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM datasets WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl DatasetVersion {
    /// Fails with a unique violation when `version` already exists for the dataset
    pub async fn create(
        pool: &PgPool,
        dataset_id: Uuid,
        version: &str,
        storage_uri: Option<&str>,
        notes: Option<&str>,
    ) -> Result<DatasetVersion, sqlx::Error> {
        sqlx::query_as::<_, DatasetVersion>(
            r#"
            INSERT INTO dataset_versions (id, dataset_id, version, storage_uri, notes, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING id, dataset_id, version, storage_uri, notes, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(dataset_id)
        .bind(version)
        .bind(storage_uri)
        .bind(notes)
        .fetch_one(pool)
        .await
    }

    /// Versions of a dataset, newest first
    pub async fn list_for_dataset(
        pool: &PgPool,
        dataset_id: Uuid,
    ) -> Result<Vec<DatasetVersion>, sqlx::Error> {
        sqlx::query_as::<_, DatasetVersion>(
            r#"
            SELECT id, dataset_id, version, storage_uri, notes, created_at
            FROM dataset_versions
            WHERE dataset_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(dataset_id)
        .fetch_all(pool)
        .await
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &DatasetFilter) {
    if let Some(user_id) = filter.user_id {
        builder.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(name_like) = filter.name_like.as_deref().filter(|s| !s.is_empty()) {
        builder
            .push(" AND name ILIKE ")
            .push_bind(format!("%{name_like}%"));
    }
}
