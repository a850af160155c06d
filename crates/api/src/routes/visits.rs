//! Visit endpoint handlers (spec.md §4.2).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Datelike;
use persistence::repositories::VisitRepository;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use domain::models::care_staff::CareStaff;
use domain::models::common::EntityMeta;
use domain::models::visit::{
    AssignVisitRequest, CreateVisitRequest, ListVisitsQuery, TransitionVisitRequest, Visit,
    VisitFlags, VisitListResponse, VisitPagination, VisitStatus, VisitType,
};
use domain::services::availability::is_available;
use domain::services::lifecycle_manager::{assign_caregiver, check_create_conflict, format_visit_number};

const DEFAULT_PER_PAGE: u32 = 20;

/// `POST /api/v1/visits`: schedules a one-off visit, rejecting it if it
/// overlaps an existing live visit for the same client/day.
pub async fn create_visit(
    State(state): State<AppState>,
    Extension(care_staff): Extension<CareStaff>,
    Json(request): Json<CreateVisitRequest>,
) -> Result<(StatusCode, Json<Visit>), ApiError> {
    request.validate()?;

    let repo = VisitRepository::new(state.pool.clone());
    let existing = repo
        .find_same_day_non_terminal(request.client_id, request.service_date)
        .await?;
    let existing_visits: Vec<Visit> = existing.into_iter().map(Into::into).collect();

    let candidate = Visit {
        meta: EntityMeta::new(care_staff.organization_id, care_staff.branch_id, care_staff.user_id),
        pattern_id: request.pattern_id,
        client_id: request.client_id,
        caregiver_id: None,
        visit_number: String::new(),
        visit_type: request.visit_type,
        service_date: request.service_date,
        scheduled_start_time: request.scheduled_start_time.clone(),
        scheduled_end_time: request.scheduled_end_time.clone(),
        scheduled_duration_minutes: request.scheduled_duration_minutes,
        timezone: request.timezone.clone(),
        actual_start: None,
        actual_end: None,
        assignment: None,
        service_address: request.service_address.clone(),
        required_skills: vec![],
        required_certifications: vec![],
        service_type_code: request.service_type_code.clone(),
        status: VisitStatus::Draft,
        flags: VisitFlags::default(),
        status_history: vec![],
        billing_status: domain::models::visit::BillingStatus::Unbilled,
    };
    candidate.validate_schedule()?;
    check_create_conflict(&existing_visits, &candidate)?;

    let sequence = repo
        .count_search(care_staff.organization_id, None, None, None, None, None)
        .await? as u32
        + 1;
    let visit_number = format_visit_number(request.service_date.year(), sequence);

    let entity = repo
        .create(
            care_staff.organization_id,
            care_staff.branch_id,
            care_staff.user_id,
            request.pattern_id,
            request.client_id,
            &visit_number,
            request.visit_type.as_str(),
            request.service_date,
            &request.scheduled_start_time,
            &request.scheduled_end_time,
            request.scheduled_duration_minutes as i32,
            &request.timezone,
            &request.service_address,
            &request.service_type_code,
        )
        .await?;

    let visit: Visit = entity.into();
    info!(visit_id = %visit.meta.id, visit_number = %visit.visit_number, "visit created");
    Ok((StatusCode::CREATED, Json(visit)))
}

/// `GET /api/v1/visits/:id`.
pub async fn get_visit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Visit>, ApiError> {
    let repo = VisitRepository::new(state.pool.clone());
    let entity = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("visit not found".into()))?;
    Ok(Json(entity.into()))
}

/// `GET /api/v1/visits`: paged, filtered, sorted search scoped to the
/// caller's organization.
pub async fn list_visits(
    State(state): State<AppState>,
    Extension(care_staff): Extension<CareStaff>,
    Query(query): Query<ListVisitsQuery>,
) -> Result<Json<VisitListResponse>, ApiError> {
    query.validate()?;

    let page = query.page.unwrap_or(1);
    let per_page = query.per_page.unwrap_or(DEFAULT_PER_PAGE);
    let sort_field = query.sort.unwrap_or_default();
    let sort_order = query.order.unwrap_or_default();
    let status = query.status.map(|s| s.as_str());

    let repo = VisitRepository::new(state.pool.clone());
    let entities = repo
        .search(
            care_staff.organization_id,
            query.client_id,
            query.caregiver_id,
            status,
            query.service_date_from,
            query.service_date_to,
            sort_field,
            sort_order,
            per_page,
            (page - 1) * per_page,
        )
        .await?;
    let total = repo
        .count_search(
            care_staff.organization_id,
            query.client_id,
            query.caregiver_id,
            status,
            query.service_date_from,
            query.service_date_to,
        )
        .await?;

    let data: Vec<Visit> = entities.into_iter().map(Into::into).collect();
    let total_pages = if total == 0 {
        0
    } else {
        ((total as u64 + per_page as u64 - 1) / per_page as u64) as u32
    };

    Ok(Json(VisitListResponse {
        data,
        pagination: VisitPagination {
            page,
            per_page,
            total,
            total_pages,
        },
    }))
}

/// `GET /api/v1/visits/unassigned`: the dispatch queue.
pub async fn list_unassigned_visits(
    State(state): State<AppState>,
    Extension(care_staff): Extension<CareStaff>,
) -> Result<Json<Vec<Visit>>, ApiError> {
    let repo = VisitRepository::new(state.pool.clone());
    let entities = repo
        .find_unassigned(care_staff.organization_id, Some(care_staff.branch_id))
        .await?;
    Ok(Json(entities.into_iter().map(Into::into).collect()))
}

/// `POST /api/v1/visits/:id/assign` (spec.md §4.2 caregiver assignment):
/// checks the caregiver's availability against same-day visits before
/// committing the assignment.
pub async fn assign_visit(
    State(state): State<AppState>,
    Extension(care_staff): Extension<CareStaff>,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignVisitRequest>,
) -> Result<Json<Visit>, ApiError> {
    request.validate()?;

    let repo = VisitRepository::new(state.pool.clone());
    let entity = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("visit not found".into()))?;
    let mut visit: Visit = entity.clone().into();

    let same_day = repo
        .find_for_caregiver_on_date(request.caregiver_id, visit.service_date)
        .await?;
    let caregiver_visits: Vec<Visit> = same_day
        .into_iter()
        .filter(|v| v.id != id)
        .map(Into::into)
        .collect();
    let (start, end) = visit.minute_interval()?;
    let availability_ok = is_available(&caregiver_visits, Some(start), Some(end), true);

    assign_caregiver(&mut visit, request.caregiver_id, request.method, availability_ok, care_staff.user_id)?;

    let updated = repo
        .assign_caregiver(
            id,
            entity.version,
            request.caregiver_id,
            visit.status.as_str(),
            visit.assignment.as_ref().expect("assign_caregiver sets assignment"),
            care_staff.user_id,
        )
        .await?;

    let visit: Visit = updated.into();
    info!(visit_id = %visit.meta.id, caregiver_id = %request.caregiver_id, "caregiver assigned to visit");
    Ok(Json(visit))
}

/// `PATCH /api/v1/visits/:id/status` (spec.md §4.2 guarded transitions).
pub async fn transition_visit(
    State(state): State<AppState>,
    Extension(care_staff): Extension<CareStaff>,
    Path(id): Path<Uuid>,
    Json(request): Json<TransitionVisitRequest>,
) -> Result<Json<Visit>, ApiError> {
    request.validate()?;

    let repo = VisitRepository::new(state.pool.clone());
    let entity = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("visit not found".into()))?;
    let mut visit: Visit = entity.clone().into();

    visit.transition(request.status, care_staff.user_id, request.reason.clone(), false)?;

    let history = serde_json::to_value(&visit.status_history)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let updated = repo
        .update_status(id, entity.version, visit.status.as_str(), &history, care_staff.user_id)
        .await?;

    let visit: Visit = updated.into();
    info!(visit_id = %visit.meta.id, status = visit.status.as_str(), "visit transitioned");
    Ok(Json(visit))
}
