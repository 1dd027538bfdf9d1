//! # System Constants
//!
//! Shared constants and the task status enum used by the API, the worker
//! loop and the persistence layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Threshold used by the `benchmark_users` walkthrough statements.
///
/// The column is called `permission_group` but the sample predicates read it
/// like an age, so no meaning beyond "the number 18" is attached here.
pub const ADULT_PERMISSION_GROUP: i32 = 18;

/// Default page size for paginated listings
pub const DEFAULT_PER_PAGE: i64 = 20;
/// Upper bound for `per_page`
pub const MAX_PER_PAGE: i64 = 200;

/// Name and version reported by `/api/v1/version`
pub const SERVICE_NAME: &str = "LLM Benchmark API";
pub const SERVICE_VERSION: &str = "1.0";

/// Message payload kinds published to the log sink
pub mod events {
    pub const REQUEST_LOG: &str = "request_log";
    pub const TASK_QUEUED: &str = "task_queued";
}

/// Lifecycle state of a benchmark task (and of the run it represents)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

impl TaskStatus {
    /// Terminal states never transition again without an explicit new run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            "canceled" => Ok(Self::Canceled),
            _ => Err(format!("Invalid task status: {s}")),
        }
    }
}
