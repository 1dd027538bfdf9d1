use axum::http::StatusCode;
use benchmark_api::test_helpers::{body_json, json_request, TestContext};
use serde_json::json;
use sqlx::PgPool;
use tower::ServiceExt;

#[sqlx::test(migrator = "benchmark_api::database::MIGRATOR")]
async fn test_dataset_crud(pool: PgPool) {
    let ctx = TestContext::new(pool);
    let (_, token) = ctx.create_user("curator", false).await;
    let (_, other) = ctx.create_user("outsider", false).await;
    let app = ctx.app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/datasets",
            Some(&token),
            Some(json!({
                "name": "Support Tickets",
                "storage_uri": "s3://bucket/tickets.jsonl",
                "tags": ["support", "en"]
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let dataset = body_json(response).await;
    assert_eq!(dataset["tags"], json!(["support", "en"]));
    let id = dataset["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "GET",
            "/api/v1/datasets?name_like=ticket",
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    let listing = body_json(response).await;
    assert_eq!(listing["meta"]["total"], 1);
    assert_eq!(listing["items"][0]["name"], "Support Tickets");

    let response = app
        .clone()
        .oneshot(json_request(
            "GET",
            &format!("/api/v1/datasets/{id}"),
            Some(&other),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/v1/datasets/{id}"),
            Some(&token),
            Some(json!({"description": "Ticket triage prompts"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["description"], "Ticket triage prompts");
    assert_eq!(updated["name"], "Support Tickets");

    let response = app
        .clone()
        .oneshot(json_request(
            "DELETE",
            &format!("/api/v1/datasets/{id}"),
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(json_request(
            "GET",
            &format!("/api/v1/datasets/{id}"),
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["detail"], "Dataset not found");
}

#[sqlx::test(migrator = "benchmark_api::database::MIGRATOR")]
async fn test_dataset_versions(pool: PgPool) {
    let ctx = TestContext::new(pool);
    let (_, token) = ctx.create_user("curator", false).await;
    let app = ctx.app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/datasets",
            Some(&token),
            Some(json!({"name": "qa", "storage_uri": "s3://bucket/qa"})),
        ))
        .await
        .unwrap();
    let id = body_json(response).await["id"].as_str().unwrap().to_string();
    let versions_uri = format!("/api/v1/datasets/{id}/versions");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &versions_uri,
            Some(&token),
            Some(json!({"version": "v1"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["storage_uri"], "s3://bucket/qa");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &versions_uri,
            Some(&token),
            Some(json!({"version": "v2", "storage_uri": "s3://bucket/qa-v2", "notes": "dedup"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &versions_uri,
            Some(&token),
            Some(json!({"version": "v1"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["detail"], "Version already exists");

    let response = app
        .oneshot(json_request("GET", &versions_uri, Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let items = body_json(response).await["items"].as_array().unwrap().clone();
    assert_eq!(items.len(), 2);
    let names: Vec<&str> = items.iter().map(|v| v["version"].as_str().unwrap()).collect();
    assert!(names.contains(&"v1") && names.contains(&"v2"));
}
