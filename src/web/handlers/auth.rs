//! Token endpoints under `/api/v1/auth`.

use axum::extract::State;
use axum::{Form, Json};

use super::users::{authenticate, issue_token, LoginForm, TokenResponse};
use crate::web::errors::{ApiResult, ErrorResponse};
use crate::web::extractors::CurrentUser;
use crate::web::state::AppState;

/// Login and get a token: POST /api/v1/auth/login
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Access token", body = TokenResponse),
        (status = 401, description = "Wrong credentials", body = ErrorResponse),
        (status = 403, description = "User disabled", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> ApiResult<Json<TokenResponse>> {
    authenticate(&state, &form).await.map(Json)
}

/// Fresh token for the current user: POST /api/v1/auth/refresh
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    responses(
        (status = 200, description = "Access token", body = TokenResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn refresh(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Json<TokenResponse>> {
    issue_token(&state, current.id()).map(Json)
}
