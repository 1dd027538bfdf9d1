//! # Dataset Handlers
//!
//! Dataset registry with ownership checks and immutable versions.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::{require_tags, require_text, Page, PageMeta};
use crate::database::is_unique_violation;
use crate::models::{Dataset, DatasetChanges, DatasetFilter, DatasetVersion, NewDataset};
use crate::web::errors::{ApiError, ApiResult, ErrorResponse};
use crate::web::extractors::CurrentUser;
use crate::web::state::AppState;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateDatasetRequest {
    pub name: String,
    pub storage_uri: String,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateDatasetRequest {
    pub name: Option<String>,
    pub storage_uri: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DatasetResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub storage_uri: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Dataset> for DatasetResponse {
    fn from(dataset: Dataset) -> Self {
        Self {
            id: dataset.id,
            user_id: dataset.user_id,
            name: dataset.name,
            storage_uri: dataset.storage_uri,
            description: dataset.description,
            tags: dataset.tags.0,
            created_at: dataset.created_at,
            updated_at: dataset.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DatasetListResponse {
    pub meta: PageMeta,
    pub items: Vec<DatasetResponse>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DatasetListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Case-insensitive substring of the dataset name
    pub name_like: Option<String>,
    pub mine: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateVersionRequest {
    pub version: String,
    pub storage_uri: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DatasetVersionResponse {
    pub id: Uuid,
    pub dataset_id: Uuid,
    pub version: String,
    pub storage_uri: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<DatasetVersion> for DatasetVersionResponse {
    fn from(version: DatasetVersion) -> Self {
        Self {
            id: version.id,
            dataset_id: version.dataset_id,
            version: version.version,
            storage_uri: version.storage_uri,
            notes: version.notes,
            created_at: version.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DatasetVersionListResponse {
    pub items: Vec<DatasetVersionResponse>,
}

async fn load_owned_dataset(
    state: &AppState,
    user: &CurrentUser,
    dataset_id: Uuid,
) -> ApiResult<Dataset> {
    let dataset = Dataset::find_by_id(&state.db_pool, dataset_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Dataset not found"))?;
    user.ensure_owner_or_admin(dataset.user_id)?;
    Ok(dataset)
}

fn optional_text(field: &str, value: Option<&str>, max: usize) -> ApiResult<Option<String>> {
    value.map(|v| require_text(field, v, 1, max)).transpose()
}

/// Register a dataset: POST /api/v1/datasets
#[utoipa::path(
    post,
    path = "/api/v1/datasets",
    request_body = CreateDatasetRequest,
    responses(
        (status = 201, description = "Dataset created", body = DatasetResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "datasets"
)]
pub async fn create_dataset(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<CreateDatasetRequest>,
) -> ApiResult<(StatusCode, Json<DatasetResponse>)> {
    let new_dataset = NewDataset {
        user_id: user.id(),
        name: require_text("name", &payload.name, 1, 200)?,
        storage_uri: require_text("storage_uri", &payload.storage_uri, 1, 500)?,
        description: payload.description,
        tags: require_tags(payload.tags)?.unwrap_or_default(),
    };
    let dataset = Dataset::create(&state.db_pool, new_dataset).await?;
    Ok((StatusCode::CREATED, Json(dataset.into())))
}

/// List datasets: GET /api/v1/datasets
#[utoipa::path(
    get,
    path = "/api/v1/datasets",
    params(DatasetListQuery),
    responses(
        (status = 200, description = "One page of datasets", body = DatasetListResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "datasets"
)]
pub async fn list_datasets(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<DatasetListQuery>,
) -> ApiResult<Json<DatasetListResponse>> {
    let page = Page::from_query(query.page, query.per_page)?;
    let filter = DatasetFilter {
        user_id: user.owner_filter(query.mine.unwrap_or(true)),
        name_like: query.name_like,
    };
    let (items, total) =
        Dataset::list(&state.db_pool, &filter, page.limit(), page.offset()).await?;
    Ok(Json(DatasetListResponse {
        meta: page.meta(total),
        items: items.into_iter().map(DatasetResponse::from).collect(),
    }))
}

/// Fetch a dataset: GET /api/v1/datasets/{id}
#[utoipa::path(
    get,
    path = "/api/v1/datasets/{id}",
    params(("id" = Uuid, Path, description = "Dataset id")),
    responses(
        (status = 200, description = "Dataset", body = DatasetResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Dataset not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "datasets"
)]
pub async fn get_dataset(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(dataset_id): Path<Uuid>,
) -> ApiResult<Json<DatasetResponse>> {
    let dataset = load_owned_dataset(&state, &user, dataset_id).await?;
    Ok(Json(dataset.into()))
}

/// Update a dataset: PATCH /api/v1/datasets/{id}
#[utoipa::path(
    patch,
    path = "/api/v1/datasets/{id}",
    params(("id" = Uuid, Path, description = "Dataset id")),
    request_body = UpdateDatasetRequest,
    responses(
        (status = 200, description = "Updated dataset", body = DatasetResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Dataset not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "datasets"
)]
pub async fn update_dataset(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(dataset_id): Path<Uuid>,
    Json(payload): Json<UpdateDatasetRequest>,
) -> ApiResult<Json<DatasetResponse>> {
    load_owned_dataset(&state, &user, dataset_id).await?;
    let changes = DatasetChanges {
        name: optional_text("name", payload.name.as_deref(), 200)?,
        storage_uri: optional_text("storage_uri", payload.storage_uri.as_deref(), 500)?,
        description: payload.description,
        tags: require_tags(payload.tags)?,
    };
    let dataset = Dataset::update(&state.db_pool, dataset_id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("Dataset not found"))?;
    Ok(Json(dataset.into()))
}

/// Delete a dataset and its versions: DELETE /api/v1/datasets/{id}
#[utoipa::path(
    delete,
    path = "/api/v1/datasets/{id}",
    params(("id" = Uuid, Path, description = "Dataset id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Dataset not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "datasets"
)]
pub async fn delete_dataset(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(dataset_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    load_owned_dataset(&state, &user, dataset_id).await?;
    if !Dataset::delete(&state.db_pool, dataset_id).await? {
        return Err(ApiError::not_found("Dataset not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Add a version: POST /api/v1/datasets/{id}/versions
#[utoipa::path(
    post,
    path = "/api/v1/datasets/{id}/versions",
    params(("id" = Uuid, Path, description = "Dataset id")),
    request_body = CreateVersionRequest,
    responses(
        (status = 201, description = "Version created", body = DatasetVersionResponse),
        (status = 404, description = "Dataset not found", body = ErrorResponse),
        (status = 409, description = "Version already exists", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "datasets"
)]
pub async fn create_version(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(dataset_id): Path<Uuid>,
    Json(payload): Json<CreateVersionRequest>,
) -> ApiResult<(StatusCode, Json<DatasetVersionResponse>)> {
    let dataset = load_owned_dataset(&state, &user, dataset_id).await?;
    let version = require_text("version", &payload.version, 1, 50)?;
    let storage_uri = payload
        .storage_uri
        .filter(|uri| !uri.trim().is_empty())
        .unwrap_or(dataset.storage_uri);

    let created = DatasetVersion::create(
        &state.db_pool,
        dataset_id,
        &version,
        Some(&storage_uri),
        payload.notes.as_deref(),
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::conflict("Version already exists")
        } else {
            ApiError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// List versions, newest first: GET /api/v1/datasets/{id}/versions
#[utoipa::path(
    get,
    path = "/api/v1/datasets/{id}/versions",
    params(("id" = Uuid, Path, description = "Dataset id")),
    responses(
        (status = 200, description = "Versions", body = DatasetVersionListResponse),
        (status = 404, description = "Dataset not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "datasets"
)]
pub async fn list_versions(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(dataset_id): Path<Uuid>,
) -> ApiResult<Json<DatasetVersionListResponse>> {
    load_owned_dataset(&state, &user, dataset_id).await?;
    let versions = DatasetVersion::list_for_dataset(&state.db_pool, dataset_id).await?;
    Ok(Json(DatasetVersionListResponse {
        items: versions.into_iter().map(DatasetVersionResponse::from).collect(),
    }))
}
