//! Service pattern endpoint handlers (spec.md §3, §4.1).

use std::collections::HashSet;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Datelike;
use persistence::repositories::{ServicePatternRepository, VisitRepository};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use domain::models::care_staff::CareStaff;
use domain::models::common::EntityMeta;
use domain::models::recurrence::RecurrenceRule;
use domain::models::service_pattern::{
    CreateServicePatternRequest, GenerateScheduleRequest, GenerateScheduleResponse, PatternStatus,
    PatternType, ServicePattern,
};
use domain::models::visit::{ServiceAddress, Visit, VisitFlags, VisitStatus, VisitType};
use domain::services::lifecycle_manager::{check_create_conflict, format_visit_number};
use domain::services::pattern_expander::{expand, ExpansionOptions};

/// `POST /api/v1/patterns`: register a new recurring-care template.
pub async fn create_pattern(
    State(state): State<AppState>,
    Extension(care_staff): Extension<CareStaff>,
    Json(request): Json<CreateServicePatternRequest>,
) -> Result<(StatusCode, Json<ServicePattern>), ApiError> {
    request.validate()?;

    let candidate = ServicePattern {
        meta: EntityMeta::new(care_staff.organization_id, care_staff.branch_id, care_staff.user_id),
        pattern_type: request.pattern_type,
        recurrence: request.recurrence.clone(),
        service_type_code: request.service_type_code.clone(),
        duration_minutes: request.duration_minutes,
        required_skills: request.required_skills.clone(),
        required_certifications: request.required_certifications.clone(),
        preferred_caregiver_ids: request.preferred_caregiver_ids.clone(),
        blocked_caregiver_ids: request.blocked_caregiver_ids.clone(),
        client_id: request.client_id,
        authorization_start_date: request.authorization_start_date,
        authorization_end_date: request.authorization_end_date,
        weekly_hour_cap: request.weekly_hour_cap,
        weekly_visit_cap: request.weekly_visit_cap,
        effective_from: request.effective_from,
        effective_to: request.effective_to,
        status: PatternStatus::Draft,
    };
    candidate.validate()?;

    let repo = ServicePatternRepository::new(state.pool.clone());
    let required_skills: Vec<String> = request.required_skills.into_iter().collect();
    let required_certifications: Vec<String> = request.required_certifications.into_iter().collect();
    let blocked_caregiver_ids: Vec<Uuid> = request.blocked_caregiver_ids.into_iter().collect();
    let entity = repo
        .create(
            care_staff.organization_id,
            care_staff.branch_id,
            care_staff.user_id,
            request.pattern_type.as_str(),
            &request.recurrence,
            &request.service_type_code,
            request.duration_minutes as i32,
            &required_skills,
            &required_certifications,
            &request.preferred_caregiver_ids,
            &blocked_caregiver_ids,
            request.client_id,
            request.authorization_start_date,
            request.authorization_end_date,
            request.weekly_hour_cap.map(|v| v as i32),
            request.weekly_visit_cap.map(|v| v as i32),
            request.effective_from,
            request.effective_to,
        )
        .await?;

    let pattern: ServicePattern = entity.into();
    info!(pattern_id = %pattern.meta.id, client_id = %pattern.client_id, "service pattern created");
    Ok((StatusCode::CREATED, Json(pattern)))
}

/// `GET /api/v1/patterns/:id`.
pub async fn get_pattern(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ServicePattern>, ApiError> {
    let repo = ServicePatternRepository::new(state.pool.clone());
    let entity = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("service pattern not found".into()))?;
    Ok(Json(entity.into()))
}

#[derive(Debug, Deserialize)]
pub struct ListPatternsQuery {
    pub client_id: Uuid,
}

/// `GET /api/v1/patterns?clientId=`: active patterns for a client.
pub async fn list_patterns_for_client(
    State(state): State<AppState>,
    Query(query): Query<ListPatternsQuery>,
) -> Result<Json<Vec<ServicePattern>>, ApiError> {
    let repo = ServicePatternRepository::new(state.pool.clone());
    let entities = repo.list_active_for_client(query.client_id).await?;
    Ok(Json(entities.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePatternStatusRequest {
    pub status: PatternStatus,
}

/// `PATCH /api/v1/patterns/:id/status`.
pub async fn update_pattern_status(
    State(state): State<AppState>,
    Extension(care_staff): Extension<CareStaff>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePatternStatusRequest>,
) -> Result<Json<ServicePattern>, ApiError> {
    let repo = ServicePatternRepository::new(state.pool.clone());
    let existing = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("service pattern not found".into()))?;

    let entity = repo
        .update_status(id, existing.version, request.status.as_str(), care_staff.user_id)
        .await?;

    let pattern: ServicePattern = entity.into();
    info!(pattern_id = %pattern.meta.id, status = request.status.as_str(), "service pattern status updated");
    Ok(Json(pattern))
}

/// `DELETE /api/v1/patterns/:id`.
pub async fn delete_pattern(
    State(state): State<AppState>,
    Extension(care_staff): Extension<CareStaff>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = ServicePatternRepository::new(state.pool.clone());
    let rows = repo.soft_delete(id, care_staff.user_id).await?;
    if rows == 0 {
        return Err(ApiError::NotFound("service pattern not found".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/v1/patterns/:id/generate-schedule` (spec.md §4.1): expands the
/// pattern's recurrence rule into visit instances over the requested window
/// and persists each as a DRAFT visit, skipping any that conflict with an
/// existing live visit for the same client/day.
pub async fn generate_schedule(
    State(state): State<AppState>,
    Extension(care_staff): Extension<CareStaff>,
    Path(id): Path<Uuid>,
    Json(request): Json<GenerateScheduleRequest>,
) -> Result<Json<GenerateScheduleResponse>, ApiError> {
    request.validate()?;

    let pattern_repo = ServicePatternRepository::new(state.pool.clone());
    let entity = pattern_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("service pattern not found".into()))?;
    let pattern: ServicePattern = entity.into();

    let dates = expand(
        &pattern,
        request.window_start,
        request.window_end,
        &ExpansionOptions::default(),
        &HashSet::new(),
    )?;

    let visit_repo = VisitRepository::new(state.pool.clone());
    let (start_time, end_time) = recurrence_window(&pattern.recurrence);
    let mut instance_count = 0usize;

    for service_date in dates {
        let existing = visit_repo
            .find_same_day_non_terminal(pattern.client_id, service_date)
            .await?;
        let existing_visits: Vec<Visit> = existing.into_iter().map(Into::into).collect();

        let candidate = Visit {
            meta: EntityMeta::new(care_staff.organization_id, care_staff.branch_id, care_staff.user_id),
            pattern_id: Some(pattern.meta.id),
            client_id: pattern.client_id,
            caregiver_id: None,
            visit_number: String::new(),
            visit_type: VisitType::Recurring,
            service_date,
            scheduled_start_time: start_time.clone(),
            scheduled_end_time: end_time.clone(),
            scheduled_duration_minutes: pattern.duration_minutes,
            timezone: pattern.recurrence.timezone.clone(),
            actual_start: None,
            actual_end: None,
            assignment: None,
            service_address: ServiceAddress {
                line1: String::new(),
                line2: None,
                city: String::new(),
                state: String::new(),
                postal_code: String::new(),
                latitude: None,
                longitude: None,
                geofence_radius_meters: None,
            },
            required_skills: pattern.required_skills.iter().cloned().collect(),
            required_certifications: pattern.required_certifications.iter().cloned().collect(),
            service_type_code: pattern.service_type_code.clone(),
            status: VisitStatus::Draft,
            flags: VisitFlags::default(),
            status_history: vec![],
            billing_status: domain::models::visit::BillingStatus::Unbilled,
        };

        if check_create_conflict(&existing_visits, &candidate).is_err() {
            continue;
        }

        let sequence = visit_repo
            .count_search(care_staff.organization_id, None, None, None, None, None)
            .await? as u32
            + instance_count as u32
            + 1;
        let visit_number = format_visit_number(service_date.year(), sequence);

        visit_repo
            .create(
                care_staff.organization_id,
                care_staff.branch_id,
                care_staff.user_id,
                Some(pattern.meta.id),
                pattern.client_id,
                &visit_number,
                VisitType::Recurring.as_str(),
                service_date,
                &start_time,
                &end_time,
                pattern.duration_minutes as i32,
                &pattern.recurrence.timezone,
                &candidate.service_address,
                &pattern.service_type_code,
            )
            .await?;
        instance_count += 1;
    }

    info!(pattern_id = %pattern.meta.id, instance_count, "schedule generated from pattern");
    Ok(Json(GenerateScheduleResponse {
        pattern_id: pattern.meta.id,
        instance_count,
    }))
}

fn recurrence_window(rule: &RecurrenceRule) -> (String, String) {
    (
        rule.start_time.clone(),
        rule.end_time.clone().unwrap_or_else(|| rule.start_time.clone()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_pattern_status_request_deserializes() {
        let json = r#"{"status": "ACTIVE"}"#;
        let request: UpdatePatternStatusRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.status, PatternStatus::Active);
    }

    #[test]
    fn list_patterns_query_deserializes() {
        let json = r#"{"clientId": "550e8400-e29b-41d4-a716-446655440000"}"#;
        let query: ListPatternsQuery = serde_json::from_str(json).unwrap();
        assert_eq!(query.client_id.to_string(), "550e8400-e29b-41d4-a716-446655440000");
    }
}
