use crate::config::DatabaseConfig;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::time::Duration;
use tracing::{debug, info};

/// Schema migrations for the service tables, embedded at compile time
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Owned connection pool plus the lifecycle helpers the binaries need
#[derive(Debug, Clone)]
pub struct DatabaseConnection {
    pool: PgPool,
}

impl DatabaseConnection {
    /// Connect eagerly using the configured pool limits
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        debug!(
            max_connections = config.max_connections,
            acquire_timeout_seconds = config.acquire_timeout_seconds,
            "Connecting to database"
        );

        let pool = Self::pool_options(config).connect(&config.url).await?;

        info!("Database pool established");
        Ok(Self { pool })
    }

    fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply outstanding migrations from `migrations/`
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        MIGRATOR.run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<bool, sqlx::Error> {
        ping(&self.pool).await
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

/// Lightweight connectivity check (`SELECT 1`)
pub async fn ping(pool: &PgPool) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT 1 AS health").fetch_one(pool).await?;
    let health: i32 = row.get("health");
    Ok(health == 1)
}
