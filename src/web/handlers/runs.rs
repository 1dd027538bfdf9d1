//! # Run Handlers
//!
//! A run is a task viewed as one execution; `run_id` and `task_id` are the
//! same value.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::tasks::load_owned_task;
use super::Page;
use crate::constants::TaskStatus;
use crate::logging::log_task_operation;
use crate::models::{Task, TaskFilter};
use crate::web::errors::{ApiError, ApiResult, ErrorResponse};
use crate::web::extractors::CurrentUser;
use crate::web::state::AppState;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StartRunRequest {
    pub task_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RunInfo {
    pub run_id: Uuid,
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl From<Task> for RunInfo {
    fn from(task: Task) -> Self {
        Self {
            run_id: task.id,
            task_id: task.id,
            user_id: task.user_id,
            status: task.status,
            created_at: task.created_at,
            started_at: task.started_at,
            finished_at: task.finished_at,
            error: task.error,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RunListResponse {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub items: Vec<RunInfo>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RunListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<TaskStatus>,
    pub mine: Option<bool>,
}

/// Queue a fresh run of a task: POST /api/v1/runs
#[utoipa::path(
    post,
    path = "/api/v1/runs",
    request_body = StartRunRequest,
    responses(
        (status = 201, description = "Run queued", body = RunInfo),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "runs"
)]
pub async fn start_run(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<StartRunRequest>,
) -> ApiResult<(StatusCode, Json<RunInfo>)> {
    load_owned_task(&state, &user, payload.task_id, "Task not found").await?;

    let task = Task::requeue(&state.db_pool, payload.task_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;
    log_task_operation("requeue", Some(task.id), &task.status, None);
    state.log_publisher.task_queued(task.id, task.user_id);

    Ok((StatusCode::CREATED, Json(task.into())))
}

/// List runs: GET /api/v1/runs
#[utoipa::path(
    get,
    path = "/api/v1/runs",
    params(RunListQuery),
    responses(
        (status = 200, description = "One page of runs", body = RunListResponse),
        (status = 400, description = "Invalid paging", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "runs"
)]
pub async fn list_runs(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<RunListQuery>,
) -> ApiResult<Json<RunListResponse>> {
    let page = Page::from_query(query.page, query.per_page)?;
    let filter = TaskFilter {
        user_id: user.owner_filter(query.mine.unwrap_or(true)),
        status: query.status,
        model: None,
    };

    let (items, total) = Task::list(&state.db_pool, &filter, page.limit(), page.offset()).await?;
    Ok(Json(RunListResponse {
        page: page.page,
        per_page: page.per_page,
        total,
        items: items.into_iter().map(RunInfo::from).collect(),
    }))
}

/// Fetch a run: GET /api/v1/runs/{run_id}
#[utoipa::path(
    get,
    path = "/api/v1/runs/{run_id}",
    params(("run_id" = Uuid, Path, description = "Run id (same as task id)")),
    responses(
        (status = 200, description = "Run", body = RunInfo),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Run not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "runs"
)]
pub async fn get_run(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(run_id): Path<Uuid>,
) -> ApiResult<Json<RunInfo>> {
    let task = load_owned_task(&state, &user, run_id, "Run not found").await?;
    Ok(Json(task.into()))
}

/// Cancel a run that has not finished: POST /api/v1/runs/{run_id}/cancel
#[utoipa::path(
    post,
    path = "/api/v1/runs/{run_id}/cancel",
    params(("run_id" = Uuid, Path, description = "Run id (same as task id)")),
    responses(
        (status = 200, description = "Run canceled", body = RunInfo),
        (status = 404, description = "Run not found", body = ErrorResponse),
        (status = 409, description = "Run already finished", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "runs"
)]
pub async fn cancel_run(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(run_id): Path<Uuid>,
) -> ApiResult<Json<RunInfo>> {
    let task = load_owned_task(&state, &user, run_id, "Run not found").await?;
    if task.is_terminal() {
        return Err(ApiError::conflict(format!("Run already {}", task.status)));
    }

    match Task::cancel(&state.db_pool, run_id).await? {
        Some(task) => {
            log_task_operation("cancel", Some(task.id), &task.status, None);
            Ok(Json(task.into()))
        }
        // Finished between the read and the update
        None => {
            let status = Task::find_by_id(&state.db_pool, run_id)
                .await?
                .map(|t| t.status)
                .ok_or_else(|| ApiError::not_found("Run not found"))?;
            Err(ApiError::conflict(format!("Run already {status}")))
        }
    }
}
