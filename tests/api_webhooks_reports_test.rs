use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use benchmark_api::models::{NewTask, Task};
use benchmark_api::test_helpers::{
    body_bytes, body_json, json_request, test_config, TestContext,
};
use benchmark_api::web::auth::sign_payload;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "worker-secret";

fn signed_ctx(pool: PgPool) -> TestContext {
    let mut config = test_config();
    config.webhooks.secret = Some(SECRET.to_string());
    TestContext::with_config(pool, config)
}

fn webhook(path: &str, body: &Value, signature: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        builder = builder.header("X-Signature", signature);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn sign(body: &Value) -> String {
    sign_payload(SECRET, body.to_string().as_bytes()).unwrap()
}

async fn seed_task(ctx: &TestContext, user_id: Uuid, model: &str) -> Task {
    Task::create(
        ctx.pool(),
        NewTask {
            user_id,
            name: format!("{model}-task"),
            model: model.to_string(),
            route: "/v1/chat".to_string(),
            dataset: "smoke".to_string(),
            params: json!({}),
            concurrency: 1,
            duration_sec: 60,
            tags: vec![],
        },
    )
    .await
    .unwrap()
}

#[sqlx::test(migrator = "benchmark_api::database::MIGRATOR")]
async fn test_webhook_signature_enforced(pool: PgPool) {
    let ctx = signed_ctx(pool);
    let (user, _) = ctx.create_user("worker-owner", false).await;
    let task = seed_task(&ctx, user.id, "m1").await;
    let app = ctx.app();
    let body = json!({"task_id": task.id, "status": "running"});

    let response = app
        .clone()
        .oneshot(webhook("/api/v1/webhooks/worker/status", &body, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["detail"], "Missing signature");

    let response = app
        .clone()
        .oneshot(webhook(
            "/api/v1/webhooks/worker/status",
            &body,
            Some("00".repeat(32)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["detail"], "Invalid signature");

    let response = app
        .oneshot(webhook("/api/v1/webhooks/worker/status", &body, Some(sign(&body))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let ack = body_json(response).await;
    assert_eq!(ack, json!({"ok": true, "task_id": task.id, "status": "running"}));
}

#[sqlx::test(migrator = "benchmark_api::database::MIGRATOR")]
async fn test_worker_status_errors(pool: PgPool) {
    let ctx = TestContext::new(pool);
    let (user, _) = ctx.create_user("owner", false).await;
    let task = seed_task(&ctx, user.id, "m1").await;
    let app = ctx.app();

    let body = json!({"task_id": task.id, "status": "exploded"});
    let response = app
        .clone()
        .oneshot(webhook("/api/v1/webhooks/worker/status", &body, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json!({"task_id": Uuid::new_v4(), "status": "failed"});
    let response = app
        .clone()
        .oneshot(webhook("/api/v1/webhooks/worker/status", &body, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = json!({"task_id": task.id, "status": "failed", "error": "upstream 500"});
    let response = app
        .oneshot(webhook("/api/v1/webhooks/worker/status", &body, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stored = Task::find_by_id(ctx.pool(), task.id).await.unwrap().unwrap();
    assert_eq!(stored.status, "failed");
    assert_eq!(stored.error.as_deref(), Some("upstream 500"));
}

#[sqlx::test(migrator = "benchmark_api::database::MIGRATOR")]
async fn test_metrics_batch_and_reports(pool: PgPool) {
    let ctx = TestContext::new(pool);
    let (user, token) = ctx.create_user("analyst", false).await;
    let (_, other) = ctx.create_user("stranger", false).await;
    let task = seed_task(&ctx, user.id, "m1").await;
    let second = seed_task(&ctx, user.id, "m2").await;
    let app = ctx.app();

    let missing = Uuid::new_v4();
    let body = json!({"items": [
        {"task_id": task.id, "latency_ms": 100},
        {"task_id": missing, "latency_ms": 100}
    ]});
    let response = app
        .clone()
        .oneshot(webhook("/api/v1/webhooks/worker/metrics", &body, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await["detail"],
        format!("Missing tasks: [{missing}]")
    );

    let body = json!({"items": [
        {"task_id": task.id, "ts": "2025-01-01T00:00:00Z", "latency_ms": 100, "http_status": 200,
         "cost_usd": 0.001, "quality": 0.9},
        {"task_id": task.id, "ts": "2025-01-01T00:00:01Z", "latency_ms": 200, "http_status": 200,
         "cost_usd": 0.001, "quality": 0.7},
        {"task_id": task.id, "ts": "2025-01-01T00:00:02Z", "latency_ms": 300, "http_status": 500,
         "error": "bad \"gateway\""},
        {"task_id": task.id, "ts": "2025-01-01T00:00:04Z", "latency_ms": 400, "http_status": 200}
    ]});
    let response = app
        .clone()
        .oneshot(webhook("/api/v1/webhooks/worker/metrics", &body, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"ok": true, "accepted": 4}));

    let response = app
        .clone()
        .oneshot(json_request(
            "GET",
            &format!("/api/v1/reports/runs/{}", task.id),
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let summary = body_json(response).await;
    assert_eq!(summary["p50_ms"], 250);
    let p90 = summary["p90_ms"].as_i64().unwrap();
    let p99 = summary["p99_ms"].as_i64().unwrap();
    assert!((369..=370).contains(&p90));
    assert!((396..=397).contains(&p99));
    assert_eq!(summary["rps"], 1.0);
    assert_eq!(summary["error_rate"], 0.25);
    assert_eq!(summary["cost_usd"], 0.002);
    assert_eq!(summary["quality"], 0.8);

    // Time window keeps only the first two rows
    let response = app
        .clone()
        .oneshot(json_request(
            "GET",
            &format!(
                "/api/v1/reports/runs/{}?ts_le=2025-01-01T00:00:01Z",
                task.id
            ),
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    let windowed = body_json(response).await;
    assert_eq!(windowed["p50_ms"], 150);
    assert_eq!(windowed["error_rate"], 0.0);

    let response = app
        .clone()
        .oneshot(json_request(
            "GET",
            &format!(
                "/api/v1/reports/compare?task_ids={}&task_ids={}",
                task.id, second.id
            ),
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let compare = body_json(response).await;
    let items = compare["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["model"], "m1");
    assert_eq!(items[1]["model"], "m2");
    assert!(items[1]["p50_ms"].is_null());

    let response = app
        .clone()
        .oneshot(json_request(
            "GET",
            &format!("/api/v1/reports/compare?task_ids={}", task.id),
            Some(&other),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(json_request(
            "GET",
            &format!("/api/v1/reports/runs/{}/export.csv", task.id),
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        format!("attachment; filename=\"metrics_{}.csv\"", task.id).as_str()
    );
    let csv = String::from_utf8(body_bytes(response).await).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "ts,latency_ms,http_status,prompt_tokens,completion_tokens,cost_usd,quality,error"
    );
    assert_eq!(lines.len(), 5);
    assert!(lines[3].ends_with("\"bad \"\"gateway\"\"\""));
}

#[sqlx::test(migrator = "benchmark_api::database::MIGRATOR")]
async fn test_webhook_ping(pool: PgPool) {
    let app = TestContext::new(pool).app();
    let response = app
        .oneshot(json_request("GET", "/api/v1/webhooks/ping", None, None))
        .await
        .unwrap();
    assert_eq!(body_json(response).await, json!({"ok": true}));
}
