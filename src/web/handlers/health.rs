//! # Health Check Handlers
//!
//! Liveness, readiness and version endpoints. None require authentication.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::constants::{SERVICE_NAME, SERVICE_VERSION};
use crate::database::ping;
use crate::web::state::AppState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReadyResponse {
    pub ready: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VersionResponse {
    pub name: String,
    pub version: String,
}

/// Liveness probe: GET /api/v1/healthz
#[utoipa::path(
    get,
    path = "/api/v1/healthz",
    responses((status = 200, description = "Process is alive", body = OkResponse)),
    tag = "health"
)]
pub async fn healthz() -> Json<OkResponse> {
    Json(OkResponse { ok: true })
}

/// Readiness probe: GET /api/v1/ready
///
/// Always 200; `ready` reports whether `SELECT 1` succeeded.
#[utoipa::path(
    get,
    path = "/api/v1/ready",
    responses((status = 200, description = "Database reachability", body = ReadyResponse)),
    tag = "health"
)]
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    Json(ReadyResponse {
        ready: database_reachable(&state).await,
    })
}

/// Service name and version: GET /api/v1/version
#[utoipa::path(
    get,
    path = "/api/v1/version",
    responses((status = 200, description = "Service version", body = VersionResponse)),
    tag = "health"
)]
pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        name: SERVICE_NAME.to_string(),
        version: SERVICE_VERSION.to_string(),
    })
}

pub(crate) async fn database_reachable(state: &AppState) -> bool {
    match ping(&state.db_pool).await {
        Ok(healthy) => healthy,
        Err(e) => {
            warn!(error = %e, "Database ping failed");
            false
        }
    }
}
