use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, require_branch_admin, require_caregiver,
    require_coordinator, require_user_auth, security_headers_middleware, trace_id,
};
use crate::routes::{availability, evv, health, openapi, patterns, submissions, visits, vmurs};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
}

pub fn create_app(config: Config, pool: PgPool) -> Router {
    let config = Arc::new(config);

    let state = AppState {
        pool,
        config: config.clone(),
    };

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty()
        || config.security.cors_origins.iter().any(|o| o == "*")
    {
        // Default: allow any origin (for development or when "*" is specified)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        // Production: only allow specified origins
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Scheduling routes (spec.md §4.1/§4.2/§4.3): patterns, visits, and
    // availability. Writes require COORDINATOR; the availability reads are
    // open to any authenticated care-staff member.
    let scheduling_routes = Router::new()
        .route("/api/v1/patterns", post(patterns::create_pattern))
        .route("/api/v1/patterns", get(patterns::list_patterns_for_client))
        .route("/api/v1/patterns/:id", get(patterns::get_pattern))
        .route(
            "/api/v1/patterns/:id/status",
            patch(patterns::update_pattern_status),
        )
        .route(
            "/api/v1/patterns/:id",
            axum::routing::delete(patterns::delete_pattern),
        )
        .route(
            "/api/v1/patterns/:id/generate-schedule",
            post(patterns::generate_schedule),
        )
        .route("/api/v1/visits", post(visits::create_visit))
        .route("/api/v1/visits", get(visits::list_visits))
        .route("/api/v1/visits/unassigned", get(visits::list_unassigned_visits))
        .route("/api/v1/visits/:id", get(visits::get_visit))
        .route("/api/v1/visits/:id/assign", post(visits::assign_visit))
        .route("/api/v1/visits/:id/status", patch(visits::transition_visit))
        .route(
            "/api/v1/caregivers/:id/availability",
            get(availability::check_availability),
        )
        .route(
            "/api/v1/caregivers/:id/availability-slots",
            get(availability::list_availability_slots),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_coordinator,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_user_auth,
        ));

    // EVV clock-in/out routes (spec.md §4.4): open to any active caregiver,
    // since caregivers clock themselves in/out.
    let evv_caregiver_routes = Router::new()
        .route("/api/v1/evv/clock-in", post(evv::clock_in_handler))
        .route("/api/v1/evv/clock-out", post(evv::clock_out_handler))
        .route(
            "/api/v1/evv/geofences/:clientId",
            get(evv::get_evv_geofence),
        )
        .route("/api/v1/submissions/:id", get(submissions::get_submission))
        .route(
            "/api/v1/submissions/dashboard",
            get(submissions::submission_dashboard),
        )
        .route("/api/v1/vmurs", post(vmurs::create_vmur_handler))
        .route("/api/v1/vmurs/:id", get(vmurs::get_vmur))
        .route(
            "/api/v1/evv-records/:id/vmurs/pending",
            get(vmurs::list_pending_vmurs),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_caregiver,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_user_auth,
        ));

    // Supervisor-only EVV routes (spec.md §4.4/§4.5): manual overrides,
    // geofence configuration, aggregator resubmission, and VMUR decisions.
    let evv_supervisor_routes = Router::new()
        .route(
            "/api/v1/evv-records/:id/override",
            post(evv::override_evv_record),
        )
        .route("/api/v1/evv/geofences", post(evv::create_evv_geofence))
        .route(
            "/api/v1/submissions",
            post(submissions::submit_evv_record),
        )
        .route(
            "/api/v1/submissions/:id/retry",
            post(submissions::retry_submission_handler),
        )
        .route(
            "/api/v1/vmurs/:id/approve",
            post(vmurs::approve_vmur_handler),
        )
        .route("/api/v1/vmurs/:id/deny", post(vmurs::deny_vmur_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_branch_admin,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_user_auth,
        ));

    // OpenAPI documentation routes (public, no auth)
    let openapi_routes = Router::new()
        .route("/api/docs", get(openapi::swagger_ui_redirect))
        .route("/api/docs/", get(openapi::swagger_ui))
        .route("/api/docs/*path", get(openapi::swagger_ui))
        .route("/api/docs/openapi.yaml", get(openapi::openapi_spec));

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    // Merge all routes
    let app = Router::new()
        .merge(public_routes)
        .merge(openapi_routes)
        .merge(scheduling_routes)
        .merge(evv_caregiver_routes)
        .merge(evv_supervisor_routes);

    // Global middleware (order matters: bottom layers run first)
    app.layer(middleware::from_fn(security_headers_middleware)) // Security headers
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware)) // Prometheus metrics
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id)) // Request ID and logging
        .layer(cors)
        .with_state(state)
}
