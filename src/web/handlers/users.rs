//! # User Handlers
//!
//! Signup, login and profile management under `/api/v1/users`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Form, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{require_email, require_text};
use crate::models::{NewUser, User, UserChanges};
use crate::web::auth::{hash_password, verify_password};
use crate::web::errors::{ApiError, ApiResult, ErrorResponse};
use crate::web::extractors::{AdminUser, CurrentUser};
use crate::web::state::AppState;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// OAuth2 password-flow form; extra fields such as `grant_type` are ignored
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateMeRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

fn require_password(password: &str) -> ApiResult<&str> {
    let len = password.chars().count();
    if !(8..=128).contains(&len) {
        return Err(ApiError::bad_request(
            "password must be between 8 and 128 characters",
        ));
    }
    Ok(password)
}

fn hash(password: &str) -> ApiResult<String> {
    hash_password(password).map_err(|e| {
        warn!(error = %e, "Password hashing failed");
        ApiError::Internal
    })
}

/// Check credentials and issue a token. Shared by both login routes.
pub(crate) async fn authenticate(state: &AppState, form: &LoginForm) -> ApiResult<TokenResponse> {
    let user = User::find_by_username(&state.db_pool, form.username.trim()).await?;
    let user = match user {
        Some(user) if verify_password(&form.password, &user.password_hash) => user,
        _ => {
            info!(username = %form.username.trim(), "Login rejected");
            return Err(ApiError::unauthorized("Incorrect username or password"));
        }
    };
    if !user.is_active {
        return Err(ApiError::forbidden("User is disabled"));
    }

    issue_token(state, user.id)
}

pub(crate) fn issue_token(state: &AppState, user_id: Uuid) -> ApiResult<TokenResponse> {
    let token = state.authenticator.generate_token(user_id).map_err(|e| {
        warn!(error = %e, "Token generation failed");
        ApiError::Internal
    })?;
    Ok(TokenResponse::bearer(token))
}

/// Register a user: POST /api/v1/users/signup
#[utoipa::path(
    post,
    path = "/api/v1/users/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Username or email taken", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let username = require_text("username", &payload.username, 3, 50)?;
    let email = require_email(&payload.email)?;
    let password = require_password(&payload.password)?;

    if User::find_by_username(&state.db_pool, &username).await?.is_some() {
        return Err(ApiError::conflict("Username already exists"));
    }
    if User::find_by_email(&state.db_pool, &email).await?.is_some() {
        return Err(ApiError::conflict("Email already exists"));
    }

    let user = User::create(
        &state.db_pool,
        NewUser {
            username,
            email,
            password_hash: hash(password)?,
        },
    )
    .await?;

    info!(user_id = %user.id, username = %user.username, "User registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Exchange credentials for a token: POST /api/v1/users/login
#[utoipa::path(
    post,
    path = "/api/v1/users/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Access token", body = TokenResponse),
        (status = 401, description = "Wrong credentials", body = ErrorResponse),
        (status = 403, description = "User disabled", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> ApiResult<Json<TokenResponse>> {
    authenticate(&state, &form).await.map(Json)
}

/// Current user profile: GET /api/v1/users/me
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(user.into())
}

/// Update the current user: PATCH /api/v1/users/me
#[utoipa::path(
    patch,
    path = "/api/v1/users/me",
    request_body = UpdateMeRequest,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 409, description = "Username or email taken", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Json(payload): Json<UpdateMeRequest>,
) -> ApiResult<Json<UserResponse>> {
    let mut changes = UserChanges::default();

    if let Some(username) = payload.username.as_deref().filter(|u| !u.trim().is_empty()) {
        let username = require_text("username", username, 3, 50)?;
        if username != current.username {
            if User::find_by_username(&state.db_pool, &username).await?.is_some() {
                return Err(ApiError::conflict("Username already exists"));
            }
            changes.username = Some(username);
        }
    }

    if let Some(email) = payload.email.as_deref().filter(|e| !e.trim().is_empty()) {
        let email = require_email(email)?;
        if email != current.email {
            if User::find_by_email(&state.db_pool, &email).await?.is_some() {
                return Err(ApiError::conflict("Email already exists"));
            }
            changes.email = Some(email);
        }
    }

    if let Some(password) = payload.password.as_deref().filter(|p| !p.is_empty()) {
        changes.password_hash = Some(hash(require_password(password)?)?);
    }

    let user = User::update(&state.db_pool, current.id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(user.into()))
}

/// All users, newest first (admins only): GET /api/v1/users
#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "Users", body = [UserResponse]),
        (status = 403, description = "Admins only", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> ApiResult<Json<Vec<UserResponse>>> {
    let users = User::list_all(&state.db_pool).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}
