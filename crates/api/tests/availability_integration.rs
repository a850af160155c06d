//! Integration tests for the caregiver availability HTTP surface (spec.md §4.3, §8).

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use common::*;
use serde_json::Value;
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn caregiver_with_no_visits_is_available_all_day() {
    let pool = create_test_pool().await;
    cleanup_all_test_data(&pool).await;

    let config = test_config();
    let jwt_config = test_jwt_config(&config);
    let staff = seed_care_staff(&pool, "CAREGIVER").await;
    let caregiver = seed_caregiver(&pool).await;
    let token = mint_access_token(&jwt_config, staff.user_id);
    let app = create_test_app(config, pool);

    let today = Utc::now().date_naive();
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!(
                    "/api/v1/caregivers/{}/availability?caregiverId={}&date={today}",
                    caregiver.id, caregiver.id
                ))
                .header("authorization", bearer(&token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["available"], true);
}

#[tokio::test]
async fn availability_slots_cover_the_full_day_when_unbooked() {
    let pool = create_test_pool().await;
    cleanup_all_test_data(&pool).await;

    let config = test_config();
    let jwt_config = test_jwt_config(&config);
    let staff = seed_care_staff(&pool, "CAREGIVER").await;
    let caregiver = seed_caregiver(&pool).await;
    let token = mint_access_token(&jwt_config, staff.user_id);
    let app = create_test_app(config, pool);

    let today = Utc::now().date_naive();
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!(
                    "/api/v1/caregivers/{}/availability-slots?caregiverId={}&date={today}&durationMinutes=60",
                    caregiver.id, caregiver.id
                ))
                .header("authorization", bearer(&token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(!body["slots"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn availability_requires_authentication() {
    let pool = create_test_pool().await;
    cleanup_all_test_data(&pool).await;

    let config = test_config();
    let app = create_test_app(config, pool);

    let today = Utc::now().date_naive();
    let caregiver_id = uuid::Uuid::new_v4();
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!(
                    "/api/v1/caregivers/{caregiver_id}/availability?caregiverId={caregiver_id}&date={today}"
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
