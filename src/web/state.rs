//! # Web API Application State
//!
//! Shared state handed to every handler: the database pool, configuration,
//! the token authenticator and the request-log publisher.

use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use crate::config::BenchConfig;
use crate::messaging::LogPublisher;
use crate::web::auth::JwtAuthenticator;

/// Shared application state for the web API
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<BenchConfig>,

    pub db_pool: PgPool,

    pub authenticator: Arc<JwtAuthenticator>,

    /// Request logs and job notifications; never blocks the request
    pub log_publisher: LogPublisher,

    /// Outbound client for adapter probes
    pub http_client: reqwest::Client,
}

impl AppState {
    pub fn new(config: Arc<BenchConfig>, db_pool: PgPool, log_publisher: LogPublisher) -> Self {
        let authenticator = Arc::new(JwtAuthenticator::from_config(&config.auth));
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            config,
            db_pool,
            authenticator,
            log_publisher,
            http_client,
        }
    }

    pub fn webhook_secret(&self) -> Option<&str> {
        self.config.webhooks.secret.as_deref()
    }
}
