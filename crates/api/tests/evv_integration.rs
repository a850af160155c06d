//! Integration tests for the EVV clock-in/clock-out HTTP surface (spec.md §4.4, §8).

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
async fn clock_in_then_clock_out_completes_evv_record() {
    let pool = create_test_pool().await;
    cleanup_all_test_data(&pool).await;

    let config = test_config();
    let jwt_config = test_jwt_config(&config);

    let staff = seed_care_staff(&pool, "CAREGIVER").await;
    let client = seed_client(&pool, "TX").await;
    let caregiver = seed_caregiver(&pool).await;
    // EVV gating (can_clock_in/can_provide_service) is keyed by the caller's
    // care_staff user_id, not the caregivers table's own PK, so the visit
    // assignment and the authorization row must both use caregiver.user_id.
    seed_caregiver_authorization(&pool, caregiver.user_id, client.id, "PCA").await;
    let visit = seed_assigned_visit(
        &pool,
        staff.organization_id,
        staff.branch_id,
        staff.user_id,
        client.id,
        caregiver.user_id,
        Utc::now().date_naive(),
        "PCA",
    )
    .await;

    let token = mint_access_token(&jwt_config, caregiver.user_id);
    let app = create_test_app(config, pool.clone());

    let clock_in_body = json!({
        "visitId": visit.id,
        "location": {
            "latitude": client.latitude,
            "longitude": client.longitude,
            "accuracyMeters": 10.0,
            "timestamp": Utc::now().to_rfc3339(),
            "method": "GPS",
            "mockLocationDetected": false,
        },
    });

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/evv/clock-in")
                .header("content-type", "application/json")
                .header("authorization", bearer(&token))
                .body(Body::from(clock_in_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let record = body_json(response).await;
    assert_eq!(record["status"], "PENDING");
    assert_eq!(record["visitId"], visit.id.to_string());
    assert!(record["integrityHash"].as_str().unwrap().len() > 0);

    let clock_out_body = json!({
        "visitId": visit.id,
        "location": {
            "latitude": client.latitude,
            "longitude": client.longitude,
            "accuracyMeters": 10.0,
            "timestamp": (Utc::now() + chrono::Duration::minutes(45)).to_rfc3339(),
            "method": "GPS",
            "mockLocationDetected": false,
        },
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/evv/clock-out")
                .header("content-type", "application/json")
                .header("authorization", bearer(&token))
                .body(Body::from(clock_out_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let record = body_json(response).await;
    assert_eq!(record["status"], "COMPLETE");
    assert!(record["totalDurationMinutes"].as_i64().unwrap() >= 44);
}

#[tokio::test]
async fn clock_in_without_token_is_rejected() {
    let pool = create_test_pool().await;
    cleanup_all_test_data(&pool).await;
    let config = test_config();
    let app = create_test_app(config, pool);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/evv/clock-in")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "visitId": uuid::Uuid::new_v4(),
                        "location": {
                            "latitude": 30.0,
                            "longitude": -97.0,
                            "accuracyMeters": 10.0,
                            "timestamp": Utc::now().to_rfc3339(),
                            "method": "GPS",
                            "mockLocationDetected": false,
                        },
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn clock_in_for_unassigned_caregiver_is_rejected() {
    let pool = create_test_pool().await;
    cleanup_all_test_data(&pool).await;

    let config = test_config();
    let jwt_config = test_jwt_config(&config);

    let staff = seed_care_staff(&pool, "CAREGIVER").await;
    let client = seed_client(&pool, "TX").await;
    let caregiver = seed_caregiver(&pool).await;
    seed_caregiver_authorization(&pool, caregiver.user_id, client.id, "PCA").await;
    let visit = seed_assigned_visit(
        &pool,
        staff.organization_id,
        staff.branch_id,
        staff.user_id,
        client.id,
        caregiver.user_id,
        Utc::now().date_naive(),
        "PCA",
    )
    .await;

    // A different caregiver than the one assigned to the visit.
    let other_staff = seed_care_staff(&pool, "CAREGIVER").await;
    let token = mint_access_token(&jwt_config, other_staff.user_id);
    let app = create_test_app(config, pool);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/evv/clock-in")
                .header("content-type", "application/json")
                .header("authorization", bearer(&token))
                .body(Body::from(
                    json!({
                        "visitId": visit.id,
                        "location": {
                            "latitude": client.latitude,
                            "longitude": client.longitude,
                            "accuracyMeters": 10.0,
                            "timestamp": Utc::now().to_rfc3339(),
                            "method": "GPS",
                            "mockLocationDetected": false,
                        },
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn supervisor_can_create_and_fetch_a_geofence() {
    let pool = create_test_pool().await;
    cleanup_all_test_data(&pool).await;

    let config = test_config();
    let jwt_config = test_jwt_config(&config);
    let staff = seed_care_staff(&pool, "BRANCH_ADMIN").await;
    let client = seed_client(&pool, "TX").await;
    let token = mint_access_token(&jwt_config, staff.user_id);
    let app = create_test_app(config, pool.clone());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/evv/geofences")
                .header("content-type", "application/json")
                .header("authorization", bearer(&token))
                .body(Body::from(
                    json!({
                        "clientId": client.id,
                        "center": {"latitude": client.latitude, "longitude": client.longitude},
                        "radiusMeters": 150.0,
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/v1/evv/geofences/{}", client.id))
                .header("authorization", bearer(&token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let geofence = body_json(response).await;
    assert_eq!(geofence["radiusMeters"], 150.0);
}

#[tokio::test]
async fn caregiver_cannot_create_a_geofence() {
    let pool = create_test_pool().await;
    cleanup_all_test_data(&pool).await;

    let config = test_config();
    let jwt_config = test_jwt_config(&config);
    let staff = seed_care_staff(&pool, "CAREGIVER").await;
    let client = seed_client(&pool, "TX").await;
    let token = mint_access_token(&jwt_config, staff.user_id);
    let app = create_test_app(config, pool);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/evv/geofences")
                .header("content-type", "application/json")
                .header("authorization", bearer(&token))
                .body(Body::from(
                    json!({
                        "clientId": client.id,
                        "center": {"latitude": client.latitude, "longitude": client.longitude},
                        "radiusMeters": 150.0,
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
