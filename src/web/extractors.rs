//! # Custom Axum Extractors
//!
//! Authenticated-user extractors and request context.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::debug;
use uuid::Uuid;

use crate::models::User;
use crate::web::auth::JwtAuthenticator;
use crate::web::errors::ApiError;
use crate::web::middleware::request_id::RequestId;
use crate::web::state::AppState;

/// The active user behind a valid bearer token
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> Uuid {
        self.0.id
    }

    pub fn is_admin(&self) -> bool {
        self.0.is_admin
    }

    /// Owners and admins may touch a resource; everyone else gets 403
    pub fn ensure_owner_or_admin(&self, owner_id: Uuid) -> Result<(), ApiError> {
        if self.0.is_admin || self.0.id == owner_id {
            Ok(())
        } else {
            Err(ApiError::forbidden("Forbidden"))
        }
    }

    /// Owner filter for listings: admins may opt out with `mine=false`
    pub fn owner_filter(&self, mine: bool) -> Option<Uuid> {
        if mine || !self.0.is_admin {
            Some(self.0.id)
        } else {
            None
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| ApiError::bearer_challenge("Not authenticated"))?;
        let token = JwtAuthenticator::extract_bearer_token(header)
            .map_err(|_| ApiError::bearer_challenge("Not authenticated"))?;

        let invalid = || ApiError::bearer_challenge("Invalid credentials");
        let claims = state
            .authenticator
            .validate_token(token)
            .map_err(|_| invalid())?;
        let user_id = claims.user_id().map_err(|_| invalid())?;

        let user = User::find_by_id(&state.db_pool, user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(invalid)?;

        debug!(user_id = %user.id, "Extracted authenticated user");
        Ok(Self(user))
    }
}

/// [`CurrentUser`] with admin rights
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(ApiError::forbidden("Admins only"));
        }
        Ok(Self(user))
    }
}

/// Request context extractor
pub struct RequestContext {
    pub request_id: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let request_id = parts
            .extensions
            .get::<RequestId>()
            .map(|id| id.as_str().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        Ok(Self { request_id })
    }
}
