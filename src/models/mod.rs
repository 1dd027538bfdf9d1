//! # Models
//!
//! sqlx-backed persistence. Every model exposes async associated functions
//! taking a `&PgPool`, returning raw `sqlx::Error` so callers decide how a
//! database failure surfaces.

pub mod benchmark_user;
pub mod dataset;
pub mod metric;
pub mod task;
pub mod user;

pub use benchmark_user::{list_tables, walkthrough, BenchmarkUser, WalkthroughReport};
pub use dataset::{Dataset, DatasetChanges, DatasetFilter, DatasetVersion, NewDataset};
pub use metric::{Metric, NewMetric};
pub use task::{NewTask, Task, TaskChanges, TaskFilter, WorkerStatusUpdate};
pub use user::{NewUser, User, UserChanges};
