//! Root hello route.

use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HelloResponse {
    pub msg: String,
}

/// Static greeting: GET /
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Static greeting", body = HelloResponse)
    ),
    tag = "root"
)]
pub async fn hello() -> Json<HelloResponse> {
    Json(HelloResponse {
        msg: "Hello, FastAPI".to_string(),
    })
}
