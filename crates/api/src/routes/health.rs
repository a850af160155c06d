//! Health check endpoint handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::app::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: DatabaseHealth,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_services: Option<ExternalServicesHealth>,
}

/// Database health status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseHealth {
    pub connected: bool,
    pub latency_ms: Option<u64>,
}

/// External services health status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalServicesHealth {
    pub map_matching: MapMatchingHealth,
}

/// Map-matching service health status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapMatchingHealth {
    /// Whether map-matching is configured and enabled.
    pub enabled: bool,
    /// Whether the service is currently available (circuit closed).
    pub available: bool,
    /// Current circuit breaker state.
    pub circuit_state: String,
}

/// Simple status response for liveness/readiness probes.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Full health check endpoint.
///
/// Returns detailed health information including database connectivity
/// and external service status.
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let start = std::time::Instant::now();
    let db_connected = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();
    let latency_ms = start.elapsed().as_millis() as u64;

    // Check map-matching service configuration
    let map_matching_config = &state.config.map_matching;
    let map_matching_enabled = map_matching_config.enabled;
    let map_matching_configured = !map_matching_config.url.is_empty();

    // For availability, we can only report based on configuration
    // Actual circuit breaker state would require the client instance
    let map_matching_available = map_matching_enabled && map_matching_configured;

    let external_services = Some(ExternalServicesHealth {
        map_matching: MapMatchingHealth {
            enabled: map_matching_enabled,
            available: map_matching_available,
            circuit_state: if !map_matching_enabled {
                "disabled".to_string()
            } else if !map_matching_configured {
                "not_configured".to_string()
            } else {
                "available".to_string()
            },
        },
    });

    let response = HealthResponse {
        status: if db_connected { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: DatabaseHealth {
            connected: db_connected,
            latency_ms: if db_connected { Some(latency_ms) } else { None },
        },
        external_services,
    };

    if db_connected {
        Ok(Json(response))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

/// Liveness probe endpoint.
///
/// Returns 200 OK if the process is running.
pub async fn live() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "alive".to_string(),
    })
}

/// Readiness probe endpoint.
///
/// Returns 200 OK if the service can accept traffic (database connected).
pub async fn ready(State(state): State<AppState>) -> Result<Json<StatusResponse>, StatusCode> {
    let db_connected = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();

    if db_connected {
        Ok(Json(StatusResponse {
            status: "ready".to_string(),
        }))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}
