//! # Web API Module
//!
//! Axum REST API for the benchmark service.
//!
//! - [`routes`] - route tree (`/`, docs, `/api/v1`)
//! - [`handlers`] - request handlers per API area
//! - [`middleware`] - request ids and request-log publishing
//! - [`extractors`] - authenticated-user extractors
//! - [`auth`] - tokens, password hashing, webhook signatures
//! - [`state`] - shared application state

pub mod auth;
pub mod errors;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::Router;
use state::AppState;

/// Create the Axum application with all routes and middleware
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()` so
/// request logs carry the client address.
pub fn create_app(app_state: AppState) -> Router {
    let mut router = Router::new()
        .merge(routes::root_routes())
        .nest("/api/v1", routes::api_v1_routes());

    if app_state.config.server.docs_enabled {
        router = router.merge(routes::docs_routes());
    }

    with_middleware(router, app_state)
}

/// The request log wraps the timeout so 408 responses are logged too
fn with_middleware(router: Router<AppState>, app_state: AppState) -> Router {
    let request_timeout = app_state.config.server.request_timeout();

    router
        // Responds 408 when the handler runs past the deadline
        .layer(tower_http::timeout::TimeoutLayer::new(request_timeout))
        .layer(axum::middleware::from_fn_with_state(
            app_state.clone(),
            middleware::request_log::log_requests,
        ))
        .layer(axum::middleware::from_fn(
            middleware::request_id::add_request_id,
        ))
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(app_state)
}
