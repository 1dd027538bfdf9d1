//! # Web API Route Definitions
//!
//! The root route, interactive docs and the versioned `/api/v1` tree.

use crate::web::handlers;
use crate::web::openapi::ApiDoc;
use crate::web::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// `GET /` greeting
pub fn root_routes() -> Router<AppState> {
    Router::new().route("/", get(handlers::root::hello))
}

/// Swagger UI at `/docs`, OpenAPI document at `/openapi.json`
pub fn docs_routes() -> Router<AppState> {
    SwaggerUi::new("/docs")
        .url("/openapi.json", ApiDoc::openapi())
        .into()
}

/// Everything mounted under `/api/v1`
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        // Health
        .route("/healthz", get(handlers::health::healthz))
        .route("/ready", get(handlers::health::ready))
        .route("/version", get(handlers::health::version))
        // Auth
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh))
        // Users
        .route("/users", get(handlers::users::list_users))
        .route("/users/signup", post(handlers::users::signup))
        .route("/users/login", post(handlers::users::login))
        .route(
            "/users/me",
            get(handlers::users::me).patch(handlers::users::update_me),
        )
        // Tasks
        .route(
            "/tasks",
            get(handlers::tasks::list_tasks).post(handlers::tasks::create_task),
        )
        .route(
            "/tasks/:id",
            get(handlers::tasks::get_task)
                .patch(handlers::tasks::update_task)
                .delete(handlers::tasks::delete_task),
        )
        // Runs
        .route(
            "/runs",
            get(handlers::runs::list_runs).post(handlers::runs::start_run),
        )
        .route("/runs/:run_id", get(handlers::runs::get_run))
        .route("/runs/:run_id/cancel", post(handlers::runs::cancel_run))
        // Datasets
        .route(
            "/datasets",
            get(handlers::datasets::list_datasets).post(handlers::datasets::create_dataset),
        )
        .route(
            "/datasets/:id",
            get(handlers::datasets::get_dataset)
                .patch(handlers::datasets::update_dataset)
                .delete(handlers::datasets::delete_dataset),
        )
        .route(
            "/datasets/:id/versions",
            get(handlers::datasets::list_versions).post(handlers::datasets::create_version),
        )
        // Webhooks (worker -> API)
        .route("/webhooks/ping", get(handlers::webhooks::ping))
        .route(
            "/webhooks/worker/status",
            post(handlers::webhooks::worker_status),
        )
        .route(
            "/webhooks/worker/metrics",
            post(handlers::webhooks::worker_metrics),
        )
        // Reports
        .route("/reports/compare", get(handlers::reports::report_compare))
        .route("/reports/runs/:task_id", get(handlers::reports::report_run))
        .route(
            "/reports/runs/:task_id/export.csv",
            get(handlers::reports::export_csv),
        )
        // Admin
        .route("/admin/users", get(handlers::admin::list_all_users))
        .route(
            "/admin/users/:user_id/disable",
            post(handlers::admin::disable_user),
        )
        .route(
            "/admin/users/:user_id/enable",
            post(handlers::admin::enable_user),
        )
        .route("/admin/health", get(handlers::admin::admin_health))
        // Adapters
        .route("/adapters", get(handlers::adapters::list_adapters))
        .route("/adapters/probe", post(handlers::adapters::probe_adapter))
}
