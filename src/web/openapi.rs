//! # OpenAPI Documentation
//!
//! utoipa-generated OpenAPI 3 document served at `/openapi.json`.

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::constants::TaskStatus;
use crate::reports::RunSummary;
use crate::web::errors::ErrorResponse;
use crate::web::handlers;
use crate::web::handlers::adapters::{
    AdapterListResponse, ProbeMethod, ProbeRequest, ProbeResponse,
};
use crate::web::handlers::admin::{AdminHealthResponse, AdminUserResponse, AdminUsersResponse};
use crate::web::handlers::datasets::{
    CreateDatasetRequest, CreateVersionRequest, DatasetListResponse, DatasetResponse,
    DatasetVersionListResponse, DatasetVersionResponse, UpdateDatasetRequest,
};
use crate::web::handlers::health::{OkResponse, ReadyResponse, VersionResponse};
use crate::web::handlers::reports::{CompareItem, CompareResponse};
use crate::web::handlers::root::HelloResponse;
use crate::web::handlers::runs::{RunInfo, RunListResponse, StartRunRequest};
use crate::web::handlers::tasks::{
    CreateTaskRequest, TaskListResponse, TaskResponse, UpdateTaskRequest,
};
use crate::web::handlers::users::{
    LoginForm, SignupRequest, TokenResponse, UpdateMeRequest, UserResponse,
};
use crate::web::handlers::webhooks::{
    MetricBatch, MetricBatchResponse, MetricItem, PingResponse, WorkerStatusRequest,
    WorkerStatusResponse,
};
use crate::web::handlers::PageMeta;

/// Registers the `bearer_auth` scheme referenced by protected paths
#[derive(Debug)]
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    paths(
        handlers::root::hello,

        handlers::health::healthz,
        handlers::health::ready,
        handlers::health::version,

        handlers::auth::login,
        handlers::auth::refresh,

        handlers::users::signup,
        handlers::users::login,
        handlers::users::me,
        handlers::users::update_me,
        handlers::users::list_users,

        handlers::tasks::create_task,
        handlers::tasks::list_tasks,
        handlers::tasks::get_task,
        handlers::tasks::update_task,
        handlers::tasks::delete_task,

        handlers::runs::start_run,
        handlers::runs::list_runs,
        handlers::runs::get_run,
        handlers::runs::cancel_run,

        handlers::datasets::create_dataset,
        handlers::datasets::list_datasets,
        handlers::datasets::get_dataset,
        handlers::datasets::update_dataset,
        handlers::datasets::delete_dataset,
        handlers::datasets::create_version,
        handlers::datasets::list_versions,

        handlers::webhooks::ping,
        handlers::webhooks::worker_status,
        handlers::webhooks::worker_metrics,

        handlers::reports::report_run,
        handlers::reports::report_compare,
        handlers::reports::export_csv,

        handlers::admin::list_all_users,
        handlers::admin::disable_user,
        handlers::admin::enable_user,
        handlers::admin::admin_health,

        handlers::adapters::list_adapters,
        handlers::adapters::probe_adapter,
    ),
    components(schemas(
        ErrorResponse,
        PageMeta,
        TaskStatus,
        HelloResponse,
        OkResponse,
        ReadyResponse,
        VersionResponse,
        SignupRequest,
        LoginForm,
        UpdateMeRequest,
        UserResponse,
        TokenResponse,
        CreateTaskRequest,
        UpdateTaskRequest,
        TaskResponse,
        TaskListResponse,
        StartRunRequest,
        RunInfo,
        RunListResponse,
        CreateDatasetRequest,
        UpdateDatasetRequest,
        DatasetResponse,
        DatasetListResponse,
        CreateVersionRequest,
        DatasetVersionResponse,
        DatasetVersionListResponse,
        WorkerStatusRequest,
        WorkerStatusResponse,
        MetricItem,
        MetricBatch,
        MetricBatchResponse,
        PingResponse,
        RunSummary,
        CompareItem,
        CompareResponse,
        AdminUserResponse,
        AdminUsersResponse,
        AdminHealthResponse,
        ProbeMethod,
        ProbeRequest,
        ProbeResponse,
        AdapterListResponse,
    )),
    tags(
        (name = "root", description = "Greeting"),
        (name = "health", description = "Liveness, readiness and version"),
        (name = "auth", description = "Access tokens"),
        (name = "users", description = "Signup and profiles"),
        (name = "tasks", description = "Benchmark task management"),
        (name = "runs", description = "Task executions"),
        (name = "datasets", description = "Dataset registry and versions"),
        (name = "webhooks", description = "Worker callbacks"),
        (name = "reports", description = "Run summaries and exports"),
        (name = "admin", description = "User administration"),
        (name = "adapters", description = "Model adapter probes"),
    ),
    info(
        title = "LLM Benchmark API",
        version = "1.0",
        description = "Benchmark tasks, runs, metrics and reports for LLM endpoints"
    )
)]
pub struct ApiDoc;
