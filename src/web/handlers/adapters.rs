//! # Adapter Handlers
//!
//! Model adapter endpoints. The registry is still a placeholder; `probe`
//! sends one request to an adapter URL and reports what came back.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;
use utoipa::ToSchema;

use crate::web::errors::{ApiError, ApiResult, ErrorResponse};
use crate::web::extractors::CurrentUser;
use crate::web::state::AppState;

/// Longest error body echoed back from a failed probe
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProbeMethod {
    #[default]
    Get,
    Post,
    Head,
}

impl From<ProbeMethod> for reqwest::Method {
    fn from(method: ProbeMethod) -> Self {
        match method {
            ProbeMethod::Get => reqwest::Method::GET,
            ProbeMethod::Post => reqwest::Method::POST,
            ProbeMethod::Head => reqwest::Method::HEAD,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ProbeRequest {
    /// Absolute http(s) URL, e.g. `https://host:port/health`
    pub url: String,
    #[serde(default)]
    pub method: ProbeMethod,
    pub headers: Option<HashMap<String, String>>,
    /// JSON body, sent with POST only
    #[schema(value_type = Option<Object>)]
    pub json: Option<Value>,
    /// Seconds in (0, 60]
    #[serde(default = "default_timeout_sec")]
    pub timeout_sec: f64,
}

fn default_timeout_sec() -> f64 {
    5.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProbeResponse {
    pub ok: bool,
    pub status: Option<u16>,
    pub latency_ms: Option<u64>,
    pub resp_bytes: Option<u64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdapterListResponse {
    #[schema(value_type = Vec<Object>)]
    pub items: Vec<Value>,
    pub note: String,
}

/// Registered adapters: GET /api/v1/adapters
#[utoipa::path(
    get,
    path = "/api/v1/adapters",
    responses((status = 200, description = "Adapter registry", body = AdapterListResponse)),
    security(("bearer_auth" = [])),
    tag = "adapters"
)]
pub async fn list_adapters(_user: CurrentUser) -> Json<AdapterListResponse> {
    Json(AdapterListResponse {
        items: Vec::new(),
        note: "Adapter registry not implemented yet".to_string(),
    })
}

/// Probe an adapter endpoint: POST /api/v1/adapters/probe
#[utoipa::path(
    post,
    path = "/api/v1/adapters/probe",
    request_body = ProbeRequest,
    responses(
        (status = 200, description = "Probe outcome", body = ProbeResponse),
        (status = 400, description = "Invalid probe request", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "adapters"
)]
pub async fn probe_adapter(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(payload): Json<ProbeRequest>,
) -> ApiResult<Json<ProbeResponse>> {
    let url = validate_url(&payload.url)?;
    let timeout = validate_timeout(payload.timeout_sec)?;

    let mut request = state
        .http_client
        .request(payload.method.into(), url)
        .timeout(timeout);
    for (name, value) in payload.headers.iter().flatten() {
        request = request.header(name.as_str(), value.as_str());
    }
    if payload.method == ProbeMethod::Post {
        if let Some(body) = &payload.json {
            request = request.json(body);
        }
    }

    let started = Instant::now();
    let outcome = match request.send().await {
        Ok(response) => {
            let status = response.status();
            match response.bytes().await {
                Ok(body) => {
                    let ok = status.is_success();
                    ProbeResponse {
                        ok,
                        status: Some(status.as_u16()),
                        latency_ms: Some(elapsed_ms(started)),
                        resp_bytes: Some(body.len() as u64),
                        error: (!ok).then(|| {
                            truncate_chars(&String::from_utf8_lossy(&body), MAX_ERROR_BODY_CHARS)
                        }),
                    }
                }
                Err(e) => transport_failure(&e, started),
            }
        }
        Err(e) => transport_failure(&e, started),
    };

    debug!(url = %payload.url, ok = outcome.ok, status = ?outcome.status, "Adapter probe finished");
    Ok(Json(outcome))
}

/// Send or body-read failure; timeouts anywhere in the exchange read as "timeout"
fn transport_failure(error: &reqwest::Error, started: Instant) -> ProbeResponse {
    ProbeResponse {
        ok: false,
        status: None,
        latency_ms: Some(elapsed_ms(started)),
        resp_bytes: Some(0),
        error: Some(if error.is_timeout() {
            "timeout".to_string()
        } else {
            error.to_string()
        }),
    }
}

fn validate_url(raw: &str) -> ApiResult<reqwest::Url> {
    let url = reqwest::Url::parse(raw.trim())
        .map_err(|e| ApiError::bad_request(format!("url is not a valid URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ApiError::bad_request("url must be an http or https URL"));
    }
    Ok(url)
}

fn validate_timeout(seconds: f64) -> ApiResult<Duration> {
    if !(seconds > 0.0 && seconds <= 60.0) {
        return Err(ApiError::bad_request("timeout_sec must be in (0, 60]"));
    }
    Ok(Duration::from_secs_f64(seconds))
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
