//! Integration tests for the visit scheduling HTTP surface (spec.md §4.2, §8).

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

fn service_address(client: &SeededClient) -> Value {
    json!({
        "line1": "1 Main St",
        "city": "Austin",
        "state": "TX",
        "postalCode": "78701",
        "latitude": client.latitude,
        "longitude": client.longitude,
        "geofenceRadiusMeters": 100,
    })
}

#[tokio::test]
async fn create_schedule_and_assign_a_visit() {
    let pool = create_test_pool().await;
    cleanup_all_test_data(&pool).await;

    let config = test_config();
    let jwt_config = test_jwt_config(&config);
    let staff = seed_care_staff(&pool, "COORDINATOR").await;
    let client = seed_client(&pool, "TX").await;
    let caregiver = seed_caregiver(&pool).await;
    seed_caregiver_authorization(&pool, caregiver.id, client.id, "PCA").await;
    let token = mint_access_token(&jwt_config, staff.user_id);
    let app = create_test_app(config, pool.clone());

    let create_body = json!({
        "clientId": client.id,
        "visitType": "ONE_TIME",
        "serviceDate": Utc::now().date_naive(),
        "scheduledStartTime": "09:00",
        "scheduledEndTime": "10:00",
        "scheduledDurationMinutes": 60,
        "timezone": "America/Chicago",
        "serviceAddress": service_address(&client),
        "serviceTypeCode": "PCA",
    });

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/visits")
                .header("content-type", "application/json")
                .header("authorization", bearer(&token))
                .body(Body::from(create_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let visit = body_json(response).await;
    assert_eq!(visit["status"], "DRAFT");
    let visit_id = visit["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/api/v1/visits/{visit_id}/status"))
                .header("content-type", "application/json")
                .header("authorization", bearer(&token))
                .body(Body::from(json!({"status": "SCHEDULED"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/visits/unassigned")
                .header("authorization", bearer(&token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/visits/{visit_id}/assign"))
                .header("content-type", "application/json")
                .header("authorization", bearer(&token))
                .body(Body::from(
                    json!({"caregiverId": caregiver.id, "method": "MANUAL"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let visit = body_json(response).await;
    assert_eq!(visit["status"], "ASSIGNED");
    assert_eq!(visit["caregiverId"], caregiver.id.to_string());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/v1/visits?clientId={}", client.id))
                .header("authorization", bearer(&token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let list = body_json(response).await;
    assert_eq!(list["pagination"]["total"], 1);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/v1/visits/{visit_id}"))
                .header("authorization", bearer(&token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn assigning_a_draft_visit_without_transition_is_rejected() {
    let pool = create_test_pool().await;
    cleanup_all_test_data(&pool).await;

    let config = test_config();
    let jwt_config = test_jwt_config(&config);
    let staff = seed_care_staff(&pool, "COORDINATOR").await;
    let client = seed_client(&pool, "TX").await;
    let caregiver = seed_caregiver(&pool).await;
    let token = mint_access_token(&jwt_config, staff.user_id);
    let app = create_test_app(config, pool.clone());

    let create_body = json!({
        "clientId": client.id,
        "visitType": "ONE_TIME",
        "serviceDate": Utc::now().date_naive(),
        "scheduledStartTime": "09:00",
        "scheduledEndTime": "10:00",
        "scheduledDurationMinutes": 60,
        "timezone": "America/Chicago",
        "serviceAddress": service_address(&client),
        "serviceTypeCode": "PCA",
    });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/visits")
                .header("content-type", "application/json")
                .header("authorization", bearer(&token))
                .body(Body::from(create_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let visit = body_json(response).await;
    let visit_id = visit["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/visits/{visit_id}/assign"))
                .header("content-type", "application/json")
                .header("authorization", bearer(&token))
                .body(Body::from(
                    json!({"caregiverId": caregiver.id, "method": "MANUAL"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
