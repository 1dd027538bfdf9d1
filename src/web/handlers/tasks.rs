//! # Task Handlers
//!
//! CRUD for benchmark tasks under `/api/v1/tasks`. Non-admins only ever see
//! their own tasks.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::{require_range, require_tags, require_text, Page, PageMeta};
use crate::constants::TaskStatus;
use crate::logging::log_task_operation;
use crate::models::{NewTask, Task, TaskChanges, TaskFilter};
use crate::web::errors::{ApiError, ApiResult, ErrorResponse};
use crate::web::extractors::CurrentUser;
use crate::web::state::AppState;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateTaskRequest {
    pub name: String,
    pub model: String,
    pub route: String,
    pub dataset: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub params: Option<Map<String, Value>>,
    pub concurrency: Option<i32>,
    pub duration_sec: Option<i32>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateTaskRequest {
    pub name: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub params: Option<Map<String, Value>>,
    pub concurrency: Option<i32>,
    pub duration_sec: Option<i32>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TaskResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub model: String,
    pub route: String,
    pub dataset: String,
    #[schema(value_type = Object)]
    pub params: Value,
    pub concurrency: i32,
    pub duration_sec: i32,
    pub status: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            user_id: task.user_id,
            name: task.name,
            model: task.model,
            route: task.route,
            dataset: task.dataset,
            params: task.params,
            concurrency: task.concurrency,
            duration_sec: task.duration_sec,
            status: task.status,
            tags: task.tags.0,
            created_at: task.created_at,
            started_at: task.started_at,
            finished_at: task.finished_at,
            error: task.error,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaskListResponse {
    pub meta: PageMeta,
    pub items: Vec<TaskResponse>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TaskListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<TaskStatus>,
    pub model: Option<String>,
    /// Admins may pass `false` to see every user's tasks
    pub mine: Option<bool>,
}

fn require_concurrency(value: i32) -> ApiResult<i32> {
    require_range("concurrency", value, 1, 10_000)
}

fn require_duration(value: i32) -> ApiResult<i32> {
    require_range("duration_sec", value, 1, 86_400)
}

/// Load a task the caller may act on: 404 when absent, 403 for strangers
pub(crate) async fn load_owned_task(
    state: &AppState,
    user: &CurrentUser,
    task_id: Uuid,
    not_found: &str,
) -> ApiResult<Task> {
    let task = Task::find_by_id(&state.db_pool, task_id)
        .await?
        .ok_or_else(|| ApiError::not_found(not_found))?;
    user.ensure_owner_or_admin(task.user_id)?;
    Ok(task)
}

/// Create a task: POST /api/v1/tasks
#[utoipa::path(
    post,
    path = "/api/v1/tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task queued", body = TaskResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "tasks"
)]
pub async fn create_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    let new_task = NewTask {
        user_id: user.id(),
        name: require_text("name", &payload.name, 1, 200)?,
        model: require_text("model", &payload.model, 1, 100)?,
        route: require_text("route", &payload.route, 1, 200)?,
        dataset: require_text("dataset", &payload.dataset, 1, 200)?,
        params: Value::Object(payload.params.unwrap_or_default()),
        concurrency: require_concurrency(payload.concurrency.unwrap_or(1))?,
        duration_sec: require_duration(payload.duration_sec.unwrap_or(60))?,
        tags: require_tags(payload.tags)?.unwrap_or_default(),
    };

    let task = Task::create(&state.db_pool, new_task).await?;
    log_task_operation("create", Some(task.id), &task.status, None);
    state.log_publisher.task_queued(task.id, task.user_id);

    Ok((StatusCode::CREATED, Json(task.into())))
}

/// List tasks: GET /api/v1/tasks
#[utoipa::path(
    get,
    path = "/api/v1/tasks",
    params(TaskListQuery),
    responses(
        (status = 200, description = "One page of tasks", body = TaskListResponse),
        (status = 400, description = "Invalid paging", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "tasks"
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<TaskListQuery>,
) -> ApiResult<Json<TaskListResponse>> {
    let page = Page::from_query(query.page, query.per_page)?;
    let filter = TaskFilter {
        user_id: user.owner_filter(query.mine.unwrap_or(true)),
        status: query.status,
        model: query.model.filter(|m| !m.is_empty()),
    };

    let (items, total) = Task::list(&state.db_pool, &filter, page.limit(), page.offset()).await?;
    Ok(Json(TaskListResponse {
        meta: page.meta(total),
        items: items.into_iter().map(TaskResponse::from).collect(),
    }))
}

/// Fetch a task: GET /api/v1/tasks/{id}
#[utoipa::path(
    get,
    path = "/api/v1/tasks/{id}",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task", body = TaskResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "tasks"
)]
pub async fn get_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<TaskResponse>> {
    let task = load_owned_task(&state, &user, task_id, "Task not found").await?;
    Ok(Json(task.into()))
}

/// Update editable task fields: PATCH /api/v1/tasks/{id}
#[utoipa::path(
    patch,
    path = "/api/v1/tasks/{id}",
    params(("id" = Uuid, Path, description = "Task id")),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Updated task", body = TaskResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "tasks"
)]
pub async fn update_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<UpdateTaskRequest>,
) -> ApiResult<Json<TaskResponse>> {
    load_owned_task(&state, &user, task_id, "Task not found").await?;

    let changes = TaskChanges {
        name: payload
            .name
            .as_deref()
            .map(|name| require_text("name", name, 1, 200))
            .transpose()?,
        params: payload.params.map(Value::Object),
        concurrency: payload.concurrency.map(require_concurrency).transpose()?,
        duration_sec: payload.duration_sec.map(require_duration).transpose()?,
        tags: require_tags(payload.tags)?,
    };

    let task = Task::update(&state.db_pool, task_id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;
    Ok(Json(task.into()))
}

/// Delete a task and its metrics: DELETE /api/v1/tasks/{id}
#[utoipa::path(
    delete,
    path = "/api/v1/tasks/{id}",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "tasks"
)]
pub async fn delete_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    load_owned_task(&state, &user, task_id, "Task not found").await?;
    if !Task::delete(&state.db_pool, task_id).await? {
        return Err(ApiError::not_found("Task not found"));
    }
    info!(task_id = %task_id, user_id = %user.id(), "Task deleted");
    Ok(StatusCode::NO_CONTENT)
}
