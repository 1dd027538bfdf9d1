//! # Test Helpers
//!
//! Builders shared by unit and integration tests: an [`AppState`] wired to
//! an in-memory log sink, users with ready-made bearer tokens, and request
//! helpers for driving the router without a listener.

pub mod test_utils;

use axum::body::Body;
use axum::http::{header, Request};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::{BenchConfig, LogSinkKind};
use crate::messaging::{LogPublisher, MemoryLogSink, SinkMessage};
use crate::models::{NewUser, User};
use crate::web::auth::hash_password;
use crate::web::state::AppState;

pub use test_utils::{get_test_database_url, setup_test_environment};

pub const TEST_JWT_SECRET: &str = "test-jwt-secret";
pub const TEST_PASSWORD: &str = "password123";

/// Configuration for tests: fixed secret, worker off, docs on
pub fn test_config() -> BenchConfig {
    let mut config = BenchConfig::default();
    config.database.url = get_test_database_url();
    config.auth.jwt_secret = TEST_JWT_SECRET.to_string();
    config.logs.sink = LogSinkKind::Disabled;
    config.worker.enabled = false;
    config
}

/// Application state plus the sink its log publisher drains into
#[derive(Debug, Clone)]
pub struct TestContext {
    pub state: AppState,
    pub sink: MemoryLogSink,
}

impl TestContext {
    pub fn new(pool: PgPool) -> Self {
        Self::with_config(pool, test_config())
    }

    /// Must be called inside a tokio runtime; the drain task is spawned here
    pub fn with_config(pool: PgPool, config: BenchConfig) -> Self {
        let sink = MemoryLogSink::new();
        let (publisher, _drain) = LogPublisher::spawn(Arc::new(sink.clone()), 256);
        let state = AppState::new(Arc::new(config), pool, publisher);
        Self { state, sink }
    }

    pub fn app(&self) -> axum::Router {
        crate::web::create_app(self.state.clone())
    }

    pub fn pool(&self) -> &PgPool {
        &self.state.db_pool
    }

    /// Insert a user with [`TEST_PASSWORD`] and return it with a valid token
    pub async fn create_user(&self, username: &str, is_admin: bool) -> (User, String) {
        let user = User::create(
            self.pool(),
            NewUser {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password_hash: hash_password(TEST_PASSWORD).expect("hash password"),
            },
        )
        .await
        .expect("create user");

        let user = if is_admin {
            User::set_admin(self.pool(), user.id, true)
                .await
                .expect("grant admin")
                .expect("user exists")
        } else {
            user
        };

        let token = self.token_for(user.id);
        (user, token)
    }

    pub fn token_for(&self, user_id: Uuid) -> String {
        self.state
            .authenticator
            .generate_token(user_id)
            .expect("generate token")
    }

    /// Wait until the sink holds at least `count` messages or a second passes
    pub async fn wait_for_messages(&self, count: usize) -> Vec<SinkMessage> {
        for _ in 0..100 {
            if self.sink.len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.sink.messages()
    }
}

/// Request builder with an optional bearer token and JSON body
pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).expect("valid request")
}

/// Collect a response body into JSON
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).expect("JSON body")
}

pub async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    use http_body_util::BodyExt;
    response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes()
        .to_vec()
}
