use axum::body::Body;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use benchmark_api::test_helpers::{body_json, json_request, TestContext};
use futures::stream::{self, StreamExt};
use serde_json::json;
use sqlx::PgPool;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceExt;

/// Serve a stand-in model adapter on an ephemeral port
async fn spawn_adapter() -> String {
    let app = Router::new()
        .route("/ok", get(|| async { "pong" }))
        .route(
            "/fail",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "x".repeat(2_000)) }),
        )
        .route("/echo", post(|body: String| async move { body }))
        .route(
            "/stall",
            get(|| async {
                let first = stream::iter([Ok::<_, std::io::Error>("partial")]);
                let rest = stream::once(async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok::<_, std::io::Error>("late")
                });
                Body::from_stream(first.chain(rest))
            }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[sqlx::test(migrator = "benchmark_api::database::MIGRATOR")]
async fn test_adapter_listing_placeholder(pool: PgPool) {
    let ctx = TestContext::new(pool);
    let (_, token) = ctx.create_user("prober", false).await;
    let app = ctx.app();

    let response = app
        .clone()
        .oneshot(json_request("GET", "/api/v1/adapters", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(json_request("GET", "/api/v1/adapters", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(
        body_json(response).await,
        json!({"items": [], "note": "Adapter registry not implemented yet"})
    );
}

#[sqlx::test(migrator = "benchmark_api::database::MIGRATOR")]
async fn test_probe_outcomes(pool: PgPool) {
    let base = spawn_adapter().await;
    let ctx = TestContext::new(pool);
    let (_, token) = ctx.create_user("prober", false).await;
    let app = ctx.app();

    let probe = |body: serde_json::Value| {
        json_request("POST", "/api/v1/adapters/probe", Some(&token), Some(body))
    };

    let response = app
        .clone()
        .oneshot(probe(json!({"url": format!("{base}/ok")})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let ok = body_json(response).await;
    assert_eq!(ok["ok"], true);
    assert_eq!(ok["status"], 200);
    assert_eq!(ok["resp_bytes"], 4);
    assert!(ok["error"].is_null());

    let response = app
        .clone()
        .oneshot(probe(json!({
            "url": format!("{base}/echo"),
            "method": "POST",
            "json": {"prompt": "hi"}
        })))
        .await
        .unwrap();
    let echoed = body_json(response).await;
    assert_eq!(echoed["ok"], true);
    assert_eq!(echoed["resp_bytes"], r#"{"prompt":"hi"}"#.len());

    let response = app
        .clone()
        .oneshot(probe(json!({"url": format!("{base}/fail")})))
        .await
        .unwrap();
    let failed = body_json(response).await;
    assert_eq!(failed["ok"], false);
    assert_eq!(failed["status"], 503);
    assert_eq!(failed["resp_bytes"], 2_000);
    assert_eq!(failed["error"].as_str().unwrap().len(), 512);

    let response = app
        .clone()
        .oneshot(probe(json!({"url": format!("{base}/slow"), "timeout_sec": 0.2})))
        .await
        .unwrap();
    let timed_out = body_json(response).await;
    assert_eq!(timed_out["ok"], false);
    assert_eq!(timed_out["error"], "timeout");
    assert!(timed_out["status"].is_null());

    let response = app
        .oneshot(probe(json!({"url": "ftp://example.com", "timeout_sec": 5})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrator = "benchmark_api::database::MIGRATOR")]
async fn test_body_stall_reports_timeout(pool: PgPool) {
    let base = spawn_adapter().await;
    let ctx = TestContext::new(pool);
    let (_, token) = ctx.create_user("prober", false).await;

    let response = ctx
        .app()
        .oneshot(json_request(
            "POST",
            "/api/v1/adapters/probe",
            Some(&token),
            Some(json!({"url": format!("{base}/stall"), "timeout_sec": 0.5})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stalled = body_json(response).await;
    assert_eq!(stalled["ok"], false);
    assert_eq!(stalled["error"], "timeout");
    assert_eq!(stalled["resp_bytes"], 0);
}
