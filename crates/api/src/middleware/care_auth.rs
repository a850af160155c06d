//! RBAC middleware for the scheduling/EVV HTTP surface (spec.md §4.6).
//!
//! The scheduling/EVV routes are not organization-scoped in the URL, so
//! this middleware resolves the caller's most privileged active
//! [`CareStaff`] assignment and stashes it in request extensions for
//! handlers to use when scoping their own reads/writes.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use domain::models::care_staff::{CareRole, CareStaff};
use persistence::repositories::CareStaffRepository;
use serde_json::json;

use crate::app::AppState;
use crate::middleware::user_auth::UserAuth;

/// Requires at least `COORDINATOR` — the minimum bar for scheduling writes
/// (creating/updating patterns and visits).
pub async fn require_coordinator(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    require_care_role_impl(state, req, next, CareRole::Coordinator).await
}

/// Requires at least `BRANCH_ADMIN` — VMUR approval/denial and manual
/// EVV overrides (spec.md §4.4/§4.5 supervisor actions).
pub async fn require_branch_admin(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    require_care_role_impl(state, req, next, CareRole::BranchAdmin).await
}

/// Requires at least `CAREGIVER` — the floor for clock-in/out, i.e. any
/// authenticated care-staff member.
pub async fn require_caregiver(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    require_care_role_impl(state, req, next, CareRole::Caregiver).await
}

async fn require_care_role_impl(
    state: AppState,
    mut req: Request<Body>,
    next: Next,
    min_role: CareRole,
) -> Response {
    let user_auth = match req.extensions().get::<UserAuth>() {
        Some(auth) => auth.clone(),
        None => {
            tracing::warn!("care_auth middleware called without UserAuth in extensions");
            return unauthorized_response("Authentication required");
        }
    };

    let repo = CareStaffRepository::new(state.pool.clone());
    let entity = match repo.find_highest_active_role(user_auth.user_id).await {
        Ok(Some(entity)) => entity,
        Ok(None) => {
            return forbidden_response("No active care-staff role assigned");
        }
        Err(e) => {
            tracing::error!("Database error checking care-staff role: {}", e);
            return internal_error_response("Failed to verify care-staff role");
        }
    };

    let care_staff: CareStaff = entity.into();
    if !care_staff.role.has_at_least(min_role) {
        return forbidden_response(&format!(
            "Insufficient permissions. Required role: {:?} or higher",
            min_role
        ));
    }

    req.extensions_mut().insert(care_staff);
    next.run(req).await
}

fn forbidden_response(message: &str) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "error": "forbidden", "message": message })),
    )
        .into_response()
}

fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "unauthorized", "message": message })),
    )
        .into_response()
}

fn internal_error_response(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal_error", "message": message })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_response_has_forbidden_status() {
        let response = forbidden_response("nope");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn unauthorized_response_has_unauthorized_status() {
        let response = unauthorized_response("nope");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
