//! Availability endpoint handlers (spec.md §4.3).

use axum::extract::{Query, State};
use chrono::NaiveDate;
use persistence::repositories::VisitRepository;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use domain::models::visit::Visit;
use domain::services::availability::{availability_slots, is_available, AvailabilitySlot};

fn parse_minutes(hhmm: &str) -> Result<u32, ApiError> {
    let (h, m) = hhmm
        .split_once(':')
        .ok_or_else(|| ApiError::Validation("expected HH:MM".into()))?;
    let h: u32 = h.parse().map_err(|_| ApiError::Validation("invalid hour".into()))?;
    let m: u32 = m.parse().map_err(|_| ApiError::Validation("invalid minute".into()))?;
    Ok(h * 60 + m)
}

#[derive(Debug, Deserialize)]
pub struct IsAvailableQuery {
    pub caregiver_id: Uuid,
    pub date: NaiveDate,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub include_travel: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IsAvailableResponse {
    pub available: bool,
}

/// `GET /api/v1/caregivers/:id/availability`.
pub async fn check_availability(
    State(state): State<AppState>,
    Query(query): Query<IsAvailableQuery>,
) -> Result<axum::Json<IsAvailableResponse>, ApiError> {
    let start = query.start_time.as_deref().map(parse_minutes).transpose()?;
    let end = query.end_time.as_deref().map(parse_minutes).transpose()?;

    let repo = VisitRepository::new(state.pool.clone());
    let entities = repo
        .find_for_caregiver_on_date(query.caregiver_id, query.date)
        .await?;
    let existing: Vec<Visit> = entities.into_iter().map(Into::into).collect();

    let available = is_available(&existing, start, end, query.include_travel);
    Ok(axum::Json(IsAvailableResponse { available }))
}

#[derive(Debug, Deserialize)]
pub struct AvailabilitySlotsQuery {
    pub caregiver_id: Uuid,
    pub date: NaiveDate,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub include_travel: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySlotsResponse {
    pub slots: Vec<AvailabilitySlot>,
}

/// `GET /api/v1/caregivers/:id/availability-slots`: the work-window slot
/// grid, stepping by `durationMinutes` (default 60).
pub async fn list_availability_slots(
    State(state): State<AppState>,
    Query(query): Query<AvailabilitySlotsQuery>,
) -> Result<axum::Json<AvailabilitySlotsResponse>, ApiError> {
    let repo = VisitRepository::new(state.pool.clone());
    let entities = repo
        .find_for_caregiver_on_date(query.caregiver_id, query.date)
        .await?;
    let existing: Vec<Visit> = entities.into_iter().map(Into::into).collect();

    let slots = availability_slots(&existing, query.duration_minutes, query.include_travel);
    Ok(axum::Json(AvailabilitySlotsResponse { slots }))
}
