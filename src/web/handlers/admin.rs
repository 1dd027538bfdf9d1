//! Administrative endpoints under `/api/v1/admin`; all require [`AdminUser`].

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use super::health::database_reachable;
use crate::models::User;
use crate::web::errors::{ApiError, ApiResult, ErrorResponse};
use crate::web::extractors::AdminUser;
use crate::web::state::AppState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AdminUserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for AdminUserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            is_active: user.is_active,
            is_admin: user.is_admin,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminUsersResponse {
    pub items: Vec<AdminUserResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminHealthResponse {
    pub db: bool,
}

/// GET /api/v1/admin/users
#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    responses(
        (status = 200, description = "All users, newest first", body = AdminUsersResponse),
        (status = 403, description = "Admins only", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn list_all_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Json<AdminUsersResponse>> {
    let users = User::list_all(&state.db_pool).await?;
    Ok(Json(AdminUsersResponse {
        items: users.into_iter().map(AdminUserResponse::from).collect(),
    }))
}

async fn set_active(state: &AppState, admin: &AdminUser, user_id: Uuid, active: bool) -> ApiResult<AdminUserResponse> {
    let user = User::set_active(&state.db_pool, user_id, active)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    info!(admin_id = %admin.0.id, user_id = %user.id, active, "User activation changed");
    Ok(user.into())
}

/// POST /api/v1/admin/users/{user_id}/disable
#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{user_id}/disable",
    params(("user_id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Disabled user", body = AdminUserResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn disable_user(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<AdminUserResponse>> {
    set_active(&state, &admin, user_id, false).await.map(Json)
}

/// POST /api/v1/admin/users/{user_id}/enable
#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{user_id}/enable",
    params(("user_id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Enabled user", body = AdminUserResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn enable_user(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<AdminUserResponse>> {
    set_active(&state, &admin, user_id, true).await.map(Json)
}

/// GET /api/v1/admin/health
#[utoipa::path(
    get,
    path = "/api/v1/admin/health",
    responses((status = 200, description = "Dependency checks", body = AdminHealthResponse)),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn admin_health(State(state): State<AppState>, _admin: AdminUser) -> Json<AdminHealthResponse> {
    Json(AdminHealthResponse {
        db: database_reachable(&state).await,
    })
}
