//! # Worker Webhooks
//!
//! Endpoints external workers call to report task status and metrics. When a
//! webhook secret is configured, the `X-Signature` header must carry the hex
//! HMAC-SHA256 of the raw request body, so bodies are read as bytes and
//! parsed only after the signature checks out.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::constants::TaskStatus;
use crate::logging::log_task_operation;
use crate::models::{Metric, NewMetric, Task, WorkerStatusUpdate};
use crate::web::auth::verify_signature;
use crate::web::errors::{ApiError, ApiResult, ErrorResponse};
use crate::web::extractors::RequestContext;
use crate::web::state::AppState;

pub const SIGNATURE_HEADER: &str = "x-signature";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WorkerStatusRequest {
    pub task_id: Uuid,
    /// queued|running|succeeded|failed|canceled
    pub status: String,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WorkerStatusResponse {
    pub ok: bool,
    pub task_id: Uuid,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MetricItem {
    pub task_id: Uuid,
    /// Defaults to the time the batch is received
    pub ts: Option<DateTime<Utc>>,
    pub latency_ms: Option<i32>,
    pub http_status: Option<i32>,
    pub prompt_tokens: Option<i32>,
    pub completion_tokens: Option<i32>,
    pub cost_usd: Option<f64>,
    pub quality: Option<f64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MetricBatch {
    pub items: Vec<MetricItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MetricBatchResponse {
    pub ok: bool,
    pub accepted: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PingResponse {
    pub ok: bool,
}

/// Verify the signature, then decode the JSON body
fn signed_json<T: DeserializeOwned>(state: &AppState, headers: &HeaderMap, body: &Bytes) -> ApiResult<T> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    verify_signature(state.webhook_secret(), body, signature).map_err(|e| {
        warn!(error = %e, "Webhook signature rejected");
        ApiError::unauthorized(e.to_string())
    })?;

    serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid request body: {e}")))
}

/// Liveness probe for workers: GET /api/v1/webhooks/ping
#[utoipa::path(
    get,
    path = "/api/v1/webhooks/ping",
    responses((status = 200, description = "Webhooks reachable", body = PingResponse)),
    tag = "webhooks"
)]
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse { ok: true })
}

/// Worker status report: POST /api/v1/webhooks/worker/status
#[utoipa::path(
    post,
    path = "/api/v1/webhooks/worker/status",
    request_body = WorkerStatusRequest,
    params(("X-Signature" = Option<String>, Header, description = "Hex HMAC-SHA256 of the body")),
    responses(
        (status = 200, description = "Status applied", body = WorkerStatusResponse),
        (status = 400, description = "Unknown status", body = ErrorResponse),
        (status = 401, description = "Missing or invalid signature", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    tag = "webhooks"
)]
pub async fn worker_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WorkerStatusResponse>> {
    let payload: WorkerStatusRequest = signed_json(&state, &headers, &body)?;
    let status: TaskStatus = payload.status.parse().map_err(ApiError::bad_request)?;

    let update = WorkerStatusUpdate {
        status,
        error: payload.error,
        started_at: payload.started_at,
        finished_at: payload.finished_at,
    };
    let task = Task::apply_worker_status(&state.db_pool, payload.task_id, update)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;

    log_task_operation("worker_status", Some(task.id), &task.status, task.error.as_deref());
    Ok(Json(WorkerStatusResponse {
        ok: true,
        task_id: task.id,
        status: task.status,
    }))
}

/// Worker metric batch: POST /api/v1/webhooks/worker/metrics
#[utoipa::path(
    post,
    path = "/api/v1/webhooks/worker/metrics",
    request_body = MetricBatch,
    params(("X-Signature" = Option<String>, Header, description = "Hex HMAC-SHA256 of the body")),
    responses(
        (status = 200, description = "Metrics stored", body = MetricBatchResponse),
        (status = 401, description = "Missing or invalid signature", body = ErrorResponse),
        (status = 404, description = "Unknown task ids", body = ErrorResponse)
    ),
    tag = "webhooks"
)]
pub async fn worker_metrics(
    State(state): State<AppState>,
    ctx: RequestContext,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<MetricBatchResponse>> {
    let batch: MetricBatch = signed_json(&state, &headers, &body)?;

    let ids: BTreeSet<Uuid> = batch.items.iter().map(|item| item.task_id).collect();
    if !ids.is_empty() {
        let ids: Vec<Uuid> = ids.into_iter().collect();
        let found: BTreeSet<Uuid> = Task::find_many(&state.db_pool, &ids)
            .await?
            .into_iter()
            .map(|task| task.id)
            .collect();
        let missing = missing_ids(&ids, &found);
        if !missing.is_empty() {
            return Err(ApiError::not_found(format!(
                "Missing tasks: [{}]",
                missing.join(", ")
            )));
        }
    }

    let received_at = Utc::now();
    let rows: Vec<NewMetric> = batch
        .items
        .into_iter()
        .map(|item| NewMetric {
            task_id: item.task_id,
            ts: item.ts.unwrap_or(received_at),
            latency_ms: item.latency_ms,
            http_status: item.http_status,
            prompt_tokens: item.prompt_tokens,
            completion_tokens: item.completion_tokens,
            cost_usd: item.cost_usd,
            quality: item.quality,
            error: item.error,
        })
        .collect();

    let accepted = Metric::insert_batch(&state.db_pool, &rows).await?;
    info!(accepted, request_id = %ctx.request_id, "Worker metrics stored");
    Ok(Json(MetricBatchResponse { ok: true, accepted }))
}

/// Requested ids absent from `found`, in sorted order
fn missing_ids(requested: &[Uuid], found: &BTreeSet<Uuid>) -> Vec<String> {
    let mut missing: Vec<String> = requested
        .iter()
        .filter(|id| !found.contains(id))
        .map(Uuid::to_string)
        .collect();
    missing.sort();
    missing
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_ids_sorted_as_strings() {
        let a = Uuid::parse_str("00000000-0000-0000-0000-00000000000a").unwrap();
        let b = Uuid::parse_str("00000000-0000-0000-0000-00000000000b").unwrap();
        let c = Uuid::parse_str("00000000-0000-0000-0000-00000000000c").unwrap();
        let found: BTreeSet<Uuid> = [b].into_iter().collect();

        assert_eq!(
            missing_ids(&[c, a, b], &found),
            vec![a.to_string(), c.to_string()]
        );
        assert!(missing_ids(&[b], &found).is_empty());
    }

    #[test]
    fn test_metric_item_defaults() {
        let item: MetricItem =
            serde_json::from_str(r#"{"task_id":"00000000-0000-0000-0000-000000000001"}"#).unwrap();
        assert!(item.ts.is_none());
        assert!(item.latency_ms.is_none());
    }
}
