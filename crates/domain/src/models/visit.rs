//! Visit aggregate and its 15-state lifecycle (spec.md §4.2).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::common::EntityMeta;
use crate::error::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitStatus {
    Draft,
    Scheduled,
    Unassigned,
    Assigned,
    Confirmed,
    EnRoute,
    Arrived,
    InProgress,
    Paused,
    Completed,
    Incomplete,
    Cancelled,
    NoShowClient,
    NoShowCaregiver,
    Rejected,
}

impl VisitStatus {
    /// Guarded transition table, verbatim from spec.md §4.2.
    pub fn can_transition_to(&self, next: VisitStatus) -> bool {
        use VisitStatus::*;
        matches!(
            (self, next),
            (Draft, Scheduled)
                | (Draft, Cancelled)
                | (Scheduled, Unassigned)
                | (Scheduled, Assigned)
                | (Scheduled, Cancelled)
                | (Unassigned, Assigned)
                | (Unassigned, Cancelled)
                | (Assigned, Confirmed)
                | (Assigned, EnRoute)
                | (Assigned, Cancelled)
                | (Assigned, Rejected)
                | (Confirmed, EnRoute)
                | (Confirmed, Cancelled)
                | (Confirmed, NoShowCaregiver)
                | (EnRoute, Arrived)
                | (EnRoute, Cancelled)
                | (EnRoute, NoShowCaregiver)
                | (Arrived, InProgress)
                | (Arrived, NoShowClient)
                | (InProgress, Paused)
                | (InProgress, Completed)
                | (InProgress, Incomplete)
                | (Paused, InProgress)
                | (Paused, Completed)
                | (Paused, Incomplete)
                | (NoShowCaregiver, Assigned)
                | (Rejected, Assigned)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            VisitStatus::Completed
                | VisitStatus::Incomplete
                | VisitStatus::Cancelled
                | VisitStatus::NoShowClient
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VisitStatus::Draft => "DRAFT",
            VisitStatus::Scheduled => "SCHEDULED",
            VisitStatus::Unassigned => "UNASSIGNED",
            VisitStatus::Assigned => "ASSIGNED",
            VisitStatus::Confirmed => "CONFIRMED",
            VisitStatus::EnRoute => "EN_ROUTE",
            VisitStatus::Arrived => "ARRIVED",
            VisitStatus::InProgress => "IN_PROGRESS",
            VisitStatus::Paused => "PAUSED",
            VisitStatus::Completed => "COMPLETED",
            VisitStatus::Incomplete => "INCOMPLETE",
            VisitStatus::Cancelled => "CANCELLED",
            VisitStatus::NoShowClient => "NO_SHOW_CLIENT",
            VisitStatus::NoShowCaregiver => "NO_SHOW_CAREGIVER",
            VisitStatus::Rejected => "REJECTED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentMethod {
    Manual,
    AutoMatch,
    SelfAssign,
    Preferred,
    Overflow,
}

impl AssignmentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentMethod::Manual => "MANUAL",
            AssignmentMethod::AutoMatch => "AUTO_MATCH",
            AssignmentMethod::SelfAssign => "SELF_ASSIGN",
            AssignmentMethod::Preferred => "PREFERRED",
            AssignmentMethod::Overflow => "OVERFLOW",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentMeta {
    pub method: AssignmentMethod,
    pub assigned_by: Uuid,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub from: VisitStatus,
    pub to: VisitStatus,
    pub changed_at: DateTime<Utc>,
    pub changed_by: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub automatic: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitType {
    Recurring,
    OneTime,
    AsNeeded,
    Respite,
}

impl VisitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitType::Recurring => "RECURRING",
            VisitType::OneTime => "ONE_TIME",
            VisitType::AsNeeded => "AS_NEEDED",
            VisitType::Respite => "RESPITE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingStatus {
    Unbilled,
    Billed,
    Held,
    Disputed,
}

impl BillingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingStatus::Unbilled => "UNBILLED",
            BillingStatus::Billed => "BILLED",
            BillingStatus::Held => "HELD",
            BillingStatus::Disputed => "DISPUTED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAddress {
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geofence_radius_meters: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitFlags {
    #[serde(default)]
    pub urgent: bool,
    #[serde(default)]
    pub priority: bool,
    #[serde(default)]
    pub requires_supervision: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub pattern_id: Option<Uuid>,
    pub client_id: Uuid,
    pub caregiver_id: Option<Uuid>,
    /// Human-readable, per-org per-year, monotonic zero-padded: `V2024-000123`.
    pub visit_number: String,
    pub visit_type: VisitType,
    pub service_date: NaiveDate,
    /// `HH:MM`.
    pub scheduled_start_time: String,
    /// `HH:MM`.
    pub scheduled_end_time: String,
    pub scheduled_duration_minutes: u32,
    pub timezone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_end: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment: Option<AssignmentMeta>,
    pub service_address: ServiceAddress,
    pub required_skills: Vec<String>,
    pub required_certifications: Vec<String>,
    pub service_type_code: String,
    pub status: VisitStatus,
    #[serde(default)]
    pub flags: VisitFlags,
    pub status_history: Vec<StatusChange>,
    pub billing_status: BillingStatus,
}

impl Visit {
    /// Applies a status transition, validating it against the guard table
    /// and appending to history. Mutates `meta.version` via `touch`.
    pub fn transition(
        &mut self,
        next: VisitStatus,
        actor: Uuid,
        reason: Option<String>,
        automatic: bool,
    ) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::conflict("visit is in a terminal state"));
        }
        if !self.status.can_transition_to(next) {
            return Err(DomainError::validation(format!(
                "cannot transition visit from {:?} to {:?}",
                self.status, next
            )));
        }
        self.status_history.push(StatusChange {
            from: self.status,
            to: next,
            changed_at: Utc::now(),
            changed_by: actor,
            reason,
            automatic,
        });
        self.status = next;
        self.meta.touch(actor);
        Ok(())
    }

    /// `scheduledStartTime < scheduledEndTime` within the same calendar day.
    pub fn validate_schedule(&self) -> DomainResult<()> {
        if self.scheduled_start_time >= self.scheduled_end_time {
            return Err(DomainError::validation(
                "scheduledStartTime must be before scheduledEndTime",
            ));
        }
        Ok(())
    }

    /// Minutes-since-midnight half-open interval, used by conflict
    /// detection and availability checks (spec.md §4.2/§4.3).
    pub fn minute_interval(&self) -> DomainResult<(u32, u32)> {
        let start = parse_minutes(&self.scheduled_start_time)?;
        let end = parse_minutes(&self.scheduled_end_time)?;
        Ok((start, end))
    }

    /// True if `other` is for the same client and date, and the
    /// `[start,end)` minute intervals overlap (spec.md §4.2 conflict
    /// detection). Caller is responsible for restricting the comparison
    /// set to non-terminal statuses.
    pub fn overlaps(&self, other: &Visit) -> DomainResult<bool> {
        if self.client_id != other.client_id || self.service_date != other.service_date {
            return Ok(false);
        }
        let (a_start, a_end) = self.minute_interval()?;
        let (b_start, b_end) = other.minute_interval()?;
        Ok(a_start < b_end && b_start < a_end)
    }
}

fn parse_minutes(hhmm: &str) -> DomainResult<u32> {
    let (h, m) = hhmm
        .split_once(':')
        .ok_or_else(|| DomainError::validation("expected HH:MM"))?;
    let h: u32 = h
        .parse()
        .map_err(|_| DomainError::validation("invalid hour"))?;
    let m: u32 = m
        .parse()
        .map_err(|_| DomainError::validation("invalid minute"))?;
    Ok(h * 60 + m)
}

/// `POST /api/v1/visits` request body for a one-off visit not generated
/// from a pattern.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateVisitRequest {
    #[serde(default)]
    pub pattern_id: Option<Uuid>,
    pub client_id: Uuid,
    pub visit_type: VisitType,
    pub service_date: NaiveDate,
    pub scheduled_start_time: String,
    pub scheduled_end_time: String,
    #[validate(range(min = 1, max = 1440))]
    pub scheduled_duration_minutes: u32,
    pub timezone: String,
    pub service_address: ServiceAddress,
    #[validate(length(min = 1, max = 20))]
    pub service_type_code: String,
}

/// `POST /api/v1/visits/:id/assign` request body.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignVisitRequest {
    pub caregiver_id: Uuid,
    pub method: AssignmentMethod,
}

/// `PATCH /api/v1/visits/:id/status` request body: a guarded transition.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TransitionVisitRequest {
    pub status: VisitStatus,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Sort fields for `GET /api/v1/visits` search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VisitSortField {
    #[default]
    ServiceDate,
    ScheduledStartTime,
    CreatedAt,
    Status,
}

impl VisitSortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitSortField::ServiceDate => "service_date",
            VisitSortField::ScheduledStartTime => "scheduled_start_time",
            VisitSortField::CreatedAt => "created_at",
            VisitSortField::Status => "status",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// `GET /api/v1/visits` query string: paged search over an org's visits.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListVisitsQuery {
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub per_page: Option<u32>,
    #[serde(default)]
    pub client_id: Option<Uuid>,
    #[serde(default)]
    pub caregiver_id: Option<Uuid>,
    #[serde(default)]
    pub status: Option<VisitStatus>,
    #[serde(default)]
    pub service_date_from: Option<NaiveDate>,
    #[serde(default)]
    pub service_date_to: Option<NaiveDate>,
    #[serde(default)]
    pub sort: Option<VisitSortField>,
    #[serde(default)]
    pub order: Option<SortOrder>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitPagination {
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub total_pages: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitListResponse {
    pub data: Vec<Visit>,
    pub pagination: VisitPagination,
}
