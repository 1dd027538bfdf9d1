//! # Request Log Middleware
//!
//! Publishes one [`RequestLogEntry`] per handled request to the log sink.

use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::HOST;
use axum::middleware::Next;
use axum::response::Response;
use std::net::SocketAddr;
use std::time::Instant;

use crate::messaging::RequestLogEntry;
use crate::web::state::AppState;

pub async fn log_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !state.log_publisher.is_enabled() {
        return next.run(request).await;
    }

    let started = Instant::now();
    let method = request.method().to_string();
    let url = request_url(&request);
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());

    let response = next.run(request).await;

    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    state.log_publisher.request_log(RequestLogEntry {
        method,
        url,
        status_code: response.status().as_u16(),
        process_time_ms: (elapsed_ms * 1000.0).round() / 1000.0,
        client_ip,
    });

    response
}

/// Absolute URL when a Host header is present, otherwise path and query
fn request_url(request: &Request) -> String {
    let uri = request.uri();
    if uri.scheme().is_some() {
        return uri.to_string();
    }
    match request.headers().get(HOST).and_then(|h| h.to_str().ok()) {
        Some(host) => format!("http://{host}{uri}"),
        None => uri.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_request_url_uses_host_header() {
        let request = Request::builder()
            .uri("/api/v1/healthz?x=1")
            .header(HOST, "localhost:8000")
            .body(Body::empty())
            .unwrap();
        assert_eq!(request_url(&request), "http://localhost:8000/api/v1/healthz?x=1");

        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert_eq!(request_url(&request), "/");
    }
}
