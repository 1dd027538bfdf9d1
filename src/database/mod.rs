//! # Database Operations
//!
//! Connection management, embedded migrations and PostgreSQL error-code
//! helpers shared by the models, the worker and the web layer.
//!
//! ```rust,no_run
//! use benchmark_api::config::DatabaseConfig;
//! use benchmark_api::database::DatabaseConnection;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = DatabaseConnection::connect(&DatabaseConfig::default()).await?;
//! db.migrate().await?;
//! assert!(db.health_check().await?);
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error_codes;

pub use connection::{ping, DatabaseConnection, MIGRATOR};
pub use error_codes::{is_undefined_table, is_unique_violation, PgErrorCode};
