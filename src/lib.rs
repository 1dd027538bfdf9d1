#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Benchmark API
//!
//! Service side of a local LLM benchmark environment: an HTTP API over
//! PostgreSQL for users, benchmark tasks, runs, datasets, worker metrics and
//! reports, plus the `benchmark_users` SQL walkthrough used to smoke-test a
//! fresh database.
//!
//! ## Module Organization
//!
//! - [`web`] - axum router, handlers, auth and OpenAPI docs
//! - [`models`] - `FromRow` models and their queries
//! - [`database`] - pool setup, migrations and SQLSTATE helpers
//! - [`messaging`] - request-log and job-notification sink (pgmq)
//! - [`worker`] - background loop executing queued tasks
//! - [`reports`] - run summaries and CSV export
//! - [`config`] - layered configuration
//! - [`logging`] - structured logging setup
//! - [`error`] - crate error type
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use benchmark_api::config::ConfigManager;
//! use benchmark_api::database::DatabaseConnection;
//! use benchmark_api::messaging::LogPublisher;
//! use benchmark_api::web::{create_app, state::AppState};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let config = Arc::new(manager.config().clone());
//! let db = DatabaseConnection::connect(&config.database).await?;
//! db.migrate().await?;
//!
//! let state = AppState::new(config, db.pool().clone(), LogPublisher::disabled());
//! let app = create_app(state);
//! # let _ = app;
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! Database-backed tests use SQLx native testing with per-test databases:
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # All tests (needs DATABASE_URL)
//! ```

pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod reports;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_helpers;
pub mod web;
pub mod worker;

pub use config::{BenchConfig, ConfigManager};
pub use constants::TaskStatus;
pub use error::{BenchError, Result};
