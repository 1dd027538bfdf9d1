use crate::constants::TaskStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

/// A benchmark task. Maps to the `tasks` table; a run is the same row viewed
/// as one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub model: String,
    pub route: String,
    pub dataset: String,
    pub params: Value,
    pub concurrency: i32,
    pub duration_sec: i32,
    pub status: String,
    pub tags: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// New Task for creation (without generated fields)
#[derive(Debug, Clone)]
pub struct NewTask {
    pub user_id: Uuid,
    pub name: String,
    pub model: String,
    pub route: String,
    pub dataset: String,
    pub params: Value,
    pub concurrency: i32,
    pub duration_sec: i32,
    pub tags: Vec<String>,
}

/// Client-editable fields; status transitions stay server-controlled
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub name: Option<String>,
    pub params: Option<Value>,
    pub concurrency: Option<i32>,
    pub duration_sec: Option<i32>,
    pub tags: Option<Vec<String>>,
}

/// Listing filter; `user_id = None` means every owner
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub user_id: Option<Uuid>,
    pub status: Option<TaskStatus>,
    pub model: Option<String>,
}

/// Status report pushed by an external worker
#[derive(Debug, Clone)]
pub struct WorkerStatusUpdate {
    pub status: TaskStatus,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

const TASK_COLUMNS: &str = "id, user_id, name, model, route, dataset, params, concurrency, \
     duration_sec, status, tags, created_at, started_at, finished_at, error";

impl Task {
    /// Parsed status; rows written by this crate always parse
    pub fn task_status(&self) -> Option<TaskStatus> {
        self.status.parse().ok()
    }

    pub fn is_terminal(&self) -> bool {
        self.task_status().is_some_and(|s| s.is_terminal())
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    /// `params.wait` as whole seconds, defaulting to 1
    pub fn wait_seconds(&self) -> i64 {
        match self.params.get("wait") {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
                .unwrap_or(1),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(1),
            _ => 1,
        }
    }

    pub async fn create(pool: &PgPool, new_task: NewTask) -> Result<Task, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (id, user_id, name, model, route, dataset, params,
                               concurrency, duration_sec, status, tags, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'queued', $10, NOW())
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(new_task.user_id)
        .bind(new_task.name)
        .bind(new_task.model)
        .bind(new_task.route)
        .bind(new_task.dataset)
        .bind(new_task.params)
        .bind(new_task.concurrency)
        .bind(new_task.duration_sec)
        .bind(Json(new_task.tags))
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_many(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ANY($1) ORDER BY created_at"
        ))
        .bind(ids)
        .fetch_all(pool)
        .await
    }

    /// One page of tasks, newest first, plus the unpaginated total
    pub async fn list(
        pool: &PgPool,
        filter: &TaskFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Task>, i64), sqlx::Error> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tasks WHERE TRUE");
        push_filter(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE TRUE"
        ));
        push_filter(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let items = select.build_query_as::<Task>().fetch_all(pool).await?;

        Ok((items, total))
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        changes: TaskChanges,
    ) -> Result<Option<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET name = COALESCE($2, name),
                params = COALESCE($3, params),
                concurrency = COALESCE($4, concurrency),
                duration_sec = COALESCE($5, duration_sec),
                tags = COALESCE($6, tags)
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.params)
        .bind(changes.concurrency)
        .bind(changes.duration_sec)
        .bind(changes.tags.map(Json))
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Put the task back in the queue for a fresh run
    pub async fn requeue(pool: &PgPool, id: Uuid) -> Result<Option<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET status = 'queued', started_at = NULL, finished_at = NULL, error = NULL
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Cancel unless already terminal. `None` means not found or terminal.
    pub async fn cancel(pool: &PgPool, id: Uuid) -> Result<Option<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET status = 'canceled', finished_at = NOW()
            WHERE id = $1 AND status NOT IN ('succeeded', 'failed', 'canceled')
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Apply a worker status report; absent timestamps/error keep stored values
    pub async fn apply_worker_status(
        pool: &PgPool,
        id: Uuid,
        update: WorkerStatusUpdate,
    ) -> Result<Option<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET status = $2,
                error = COALESCE($3, error),
                started_at = COALESCE($4, started_at),
                finished_at = COALESCE($5, finished_at)
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.status.as_str())
        .bind(update.error)
        .bind(update.started_at)
        .bind(update.finished_at)
        .fetch_optional(pool)
        .await
    }

    /// Claim the oldest queued task and mark it running.
    ///
    /// `SKIP LOCKED` keeps concurrent workers from claiming the same row.
    pub async fn claim_next(pool: &PgPool) -> Result<Option<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET status = 'running', started_at = NOW(), finished_at = NULL, error = NULL
            WHERE id = (
                SELECT id FROM tasks
                WHERE status = 'queued'
                ORDER BY created_at
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .fetch_optional(pool)
        .await
    }

    /// Record the outcome of a run returned by [`Task::claim_next`].
    ///
    /// The row must still be running the same claim: a task canceled while it
    /// ran, or requeued and claimed again, is left untouched and `None` is
    /// returned.
    pub async fn finish(
        pool: &PgPool,
        claimed: &Task,
        status: TaskStatus,
        error: Option<String>,
    ) -> Result<Option<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET status = $2, error = $3, finished_at = NOW()
            WHERE id = $1 AND status = 'running' AND started_at IS NOT DISTINCT FROM $4
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(claimed.id)
        .bind(status.as_str())
        .bind(error)
        .bind(claimed.started_at)
        .fetch_optional(pool)
        .await
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &TaskFilter) {
    if let Some(user_id) = filter.user_id {
        builder.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(model) = &filter.model {
        builder.push(" AND model = ").push_bind(model.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task_with_params(params: Value) -> Task {
        Task {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "t".into(),
            model: "m".into(),
            route: "/r".into(),
            dataset: "d".into(),
            params,
            concurrency: 1,
            duration_sec: 60,
            status: "queued".into(),
            tags: Json(vec![]),
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    #[test]
    fn test_wait_seconds_defaults_and_parsing() {
        assert_eq!(task_with_params(json!({})).wait_seconds(), 1);
        assert_eq!(task_with_params(json!({"wait": 3})).wait_seconds(), 3);
        assert_eq!(task_with_params(json!({"wait": -2})).wait_seconds(), -2);
        assert_eq!(task_with_params(json!({"wait": 2.7})).wait_seconds(), 2);
        assert_eq!(task_with_params(json!({"wait": "4"})).wait_seconds(), 4);
        assert_eq!(task_with_params(json!({"wait": null})).wait_seconds(), 1);
    }

    #[test]
    fn test_status_helpers() {
        let mut task = task_with_params(json!({}));
        assert_eq!(task.task_status(), Some(TaskStatus::Queued));
        assert!(!task.is_terminal());
        task.status = "canceled".into();
        assert!(task.is_terminal());
        assert!(task.is_owned_by(task.user_id));
        assert!(!task.is_owned_by(Uuid::new_v4()));
    }
}
