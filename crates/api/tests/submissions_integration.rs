//! Integration tests for the aggregator submission HTTP surface (spec.md §4.5, §8).

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use common::*;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn submitting_a_completed_record_creates_a_submission_row() {
    let pool = create_test_pool().await;
    cleanup_all_test_data(&pool).await;

    let config = test_config();
    let jwt_config = test_jwt_config(&config);
    let staff = seed_care_staff(&pool, "BRANCH_ADMIN").await;
    let client = seed_client(&pool, "TX").await;
    let caregiver = seed_caregiver(&pool).await;
    let visit = seed_assigned_visit(
        &pool,
        staff.organization_id,
        staff.branch_id,
        staff.user_id,
        client.id,
        caregiver.id,
        Utc::now().date_naive(),
        "PCA",
    )
    .await;
    let record = seed_complete_evv_record(
        &pool,
        staff.organization_id,
        staff.branch_id,
        staff.user_id,
        visit.id,
        client.id,
        caregiver.id,
        Utc::now() - chrono::Duration::days(1),
    )
    .await;

    let token = mint_access_token(&jwt_config, staff.user_id);
    let app = create_test_app(config, pool.clone());

    // No aggregator endpoint is configured for the test environment, so the
    // adapter returns AGGREGATOR_DISABLED rather than making a network call.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/submissions")
                .header("content-type", "application/json")
                .header("authorization", bearer(&token))
                .body(Body::from(json!({"evvRecordId": record.id}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let submission = body_json(response).await;
    assert_eq!(submission["evvRecordId"], record.id.to_string());
    assert_eq!(submission["aggregatorType"], "HH_AE_XCHANGE");
    assert_eq!(submission["errorCode"], "AGGREGATOR_DISABLED");

    let submission_id = submission["id"].as_str().unwrap();
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/v1/submissions/{submission_id}"))
                .header("authorization", bearer(&token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn caregiver_cannot_submit_to_aggregator() {
    let pool = create_test_pool().await;
    cleanup_all_test_data(&pool).await;

    let config = test_config();
    let jwt_config = test_jwt_config(&config);
    let staff = seed_care_staff(&pool, "CAREGIVER").await;
    let token = mint_access_token(&jwt_config, staff.user_id);
    let app = create_test_app(config, pool);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/submissions")
                .header("content-type", "application/json")
                .header("authorization", bearer(&token))
                .body(Body::from(json!({"evvRecordId": uuid::Uuid::new_v4()}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn dashboard_returns_rows_grouped_by_state_and_aggregator() {
    let pool = create_test_pool().await;
    cleanup_all_test_data(&pool).await;

    let config = test_config();
    let jwt_config = test_jwt_config(&config);
    let staff = seed_care_staff(&pool, "CAREGIVER").await;
    let token = mint_access_token(&jwt_config, staff.user_id);
    let app = create_test_app(config, pool);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/submissions/dashboard")
                .header("authorization", bearer(&token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["rows"].is_array());
}
