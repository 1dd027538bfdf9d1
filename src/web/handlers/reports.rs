//! # Report Handlers
//!
//! Run summaries, multi-run comparison and raw CSV export.

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::tasks::load_owned_task;
use crate::models::{Metric, Task};
use crate::reports::{metrics_csv, summarize, RunSummary};
use crate::web::errors::{ApiError, ApiResult, ErrorResponse};
use crate::web::extractors::CurrentUser;
use crate::web::state::AppState;

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RunReportQuery {
    /// Only metrics at or after this instant
    pub ts_ge: Option<DateTime<Utc>>,
    /// Only metrics at or before this instant
    pub ts_le: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CompareItem {
    pub task_id: Uuid,
    pub model: String,
    pub route: String,
    pub dataset: String,
    pub p50_ms: Option<i64>,
    pub p90_ms: Option<i64>,
    pub p99_ms: Option<i64>,
    pub rps: Option<f64>,
    pub error_rate: Option<f64>,
    pub cost_usd: Option<f64>,
    pub quality: Option<f64>,
}

impl CompareItem {
    fn new(task: &Task, summary: RunSummary) -> Self {
        Self {
            task_id: task.id,
            model: task.model.clone(),
            route: task.route.clone(),
            dataset: task.dataset.clone(),
            p50_ms: summary.p50_ms,
            p90_ms: summary.p90_ms,
            p99_ms: summary.p99_ms,
            rps: summary.rps,
            error_rate: summary.error_rate,
            cost_usd: summary.cost_usd,
            quality: summary.quality,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CompareResponse {
    pub items: Vec<CompareItem>,
}

/// Summary of one run: GET /api/v1/reports/runs/{task_id}
#[utoipa::path(
    get,
    path = "/api/v1/reports/runs/{task_id}",
    params(("task_id" = Uuid, Path, description = "Task id"), RunReportQuery),
    responses(
        (status = 200, description = "Run summary", body = RunSummary),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn report_run(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<Uuid>,
    Query(query): Query<RunReportQuery>,
) -> ApiResult<Json<RunSummary>> {
    load_owned_task(&state, &user, task_id, "Task not found").await?;
    let rows = Metric::for_task(&state.db_pool, task_id, query.ts_ge, query.ts_le).await?;
    Ok(Json(summarize(task_id, &rows)))
}

/// Side-by-side summaries: GET /api/v1/reports/compare?task_ids=..&task_ids=..
#[utoipa::path(
    get,
    path = "/api/v1/reports/compare",
    params(("task_ids" = Vec<Uuid>, Query, description = "Repeat task_ids=<id> for each run")),
    responses(
        (status = 200, description = "Summaries in request order", body = CompareResponse),
        (status = 400, description = "No or malformed ids", body = ErrorResponse),
        (status = 404, description = "Unknown task ids", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn report_compare(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<Json<CompareResponse>> {
    let ids = parse_task_ids(&params)?;

    let tasks: HashMap<Uuid, Task> = Task::find_many(&state.db_pool, &ids)
        .await?
        .into_iter()
        .map(|task| (task.id, task))
        .collect();
    let mut missing: Vec<String> = ids
        .iter()
        .filter(|id| !tasks.contains_key(id))
        .map(Uuid::to_string)
        .collect();
    if !missing.is_empty() {
        missing.sort();
        return Err(ApiError::not_found(format!(
            "Missing tasks: [{}]",
            missing.join(", ")
        )));
    }

    let mut items = Vec::with_capacity(ids.len());
    for id in &ids {
        let Some(task) = tasks.get(id) else { continue };
        user.ensure_owner_or_admin(task.user_id)?;
        let rows = Metric::for_task(&state.db_pool, task.id, None, None).await?;
        items.push(CompareItem::new(task, summarize(task.id, &rows)));
    }

    Ok(Json(CompareResponse { items }))
}

/// Raw metrics as CSV: GET /api/v1/reports/runs/{task_id}/export.csv
#[utoipa::path(
    get,
    path = "/api/v1/reports/runs/{task_id}/export.csv",
    params(("task_id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "CSV attachment", content_type = "text/csv", body = String),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn export_csv(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Response> {
    load_owned_task(&state, &user, task_id, "Task not found").await?;
    let rows = Metric::for_task(&state.db_pool, task_id, None, None).await?;

    let disposition = format!("attachment; filename=\"metrics_{task_id}.csv\"");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        metrics_csv(&rows),
    )
        .into_response())
}

/// Every `task_ids` value in first-seen order without duplicates
fn parse_task_ids(params: &[(String, String)]) -> ApiResult<Vec<Uuid>> {
    let mut seen = BTreeSet::new();
    let mut ids = Vec::new();
    for (key, value) in params {
        if key != "task_ids" {
            continue;
        }
        let id = Uuid::parse_str(value.trim())
            .map_err(|_| ApiError::bad_request(format!("Invalid task id: {value}")))?;
        if seen.insert(id) {
            ids.push(id);
        }
    }
    if ids.is_empty() {
        return Err(ApiError::bad_request("task_ids is required"));
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(key: &str, value: &str) -> (String, String) {
        (key.to_string(), value.to_string())
    }

    #[test]
    fn test_parse_task_ids_keeps_order_and_dedupes() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let params = vec![
            pair("task_ids", &b.to_string()),
            pair("other", "x"),
            pair("task_ids", &a.to_string()),
            pair("task_ids", &b.to_string()),
        ];
        assert_eq!(parse_task_ids(&params).unwrap(), vec![b, a]);
    }

    #[test]
    fn test_parse_task_ids_rejects_empty_and_malformed() {
        assert!(parse_task_ids(&[]).is_err());
        assert!(parse_task_ids(&[pair("task_ids", "nope")]).is_err());
    }
}
