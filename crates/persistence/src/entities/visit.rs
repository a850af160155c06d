//! Visit entity (database row mapping).

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::common::EntityMeta;
use domain::models::visit::{
    AssignmentMeta, BillingStatus, ServiceAddress, StatusChange, Visit, VisitFlags, VisitStatus,
    VisitType,
};

/// Database row mapping for the `visits` table.
#[derive(Debug, Clone, FromRow)]
pub struct VisitEntity {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub branch_id: Uuid,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub updated_by: Uuid,
    pub deleted_at: Option<DateTime<Utc>>,
    pub pattern_id: Option<Uuid>,
    pub client_id: Uuid,
    pub caregiver_id: Option<Uuid>,
    pub visit_number: String,
    pub visit_type: String,
    pub service_date: NaiveDate,
    pub scheduled_start_time: String,
    pub scheduled_end_time: String,
    pub scheduled_duration_minutes: i32,
    pub timezone: String,
    pub actual_start: Option<DateTime<Utc>>,
    pub actual_end: Option<DateTime<Utc>>,
    pub assignment: Option<Json<AssignmentMeta>>,
    pub service_address: Json<ServiceAddress>,
    pub required_skills: Vec<String>,
    pub required_certifications: Vec<String>,
    pub service_type_code: String,
    pub status: String,
    pub flags: Json<VisitFlags>,
    pub status_history: Json<Vec<StatusChange>>,
    pub billing_status: String,
}

fn parse_visit_type(s: &str) -> VisitType {
    match s {
        "ONE_TIME" => VisitType::OneTime,
        "AS_NEEDED" => VisitType::AsNeeded,
        "RESPITE" => VisitType::Respite,
        _ => VisitType::Recurring,
    }
}

fn parse_visit_status(s: &str) -> VisitStatus {
    match s {
        "SCHEDULED" => VisitStatus::Scheduled,
        "UNASSIGNED" => VisitStatus::Unassigned,
        "ASSIGNED" => VisitStatus::Assigned,
        "CONFIRMED" => VisitStatus::Confirmed,
        "EN_ROUTE" => VisitStatus::EnRoute,
        "ARRIVED" => VisitStatus::Arrived,
        "IN_PROGRESS" => VisitStatus::InProgress,
        "PAUSED" => VisitStatus::Paused,
        "COMPLETED" => VisitStatus::Completed,
        "INCOMPLETE" => VisitStatus::Incomplete,
        "CANCELLED" => VisitStatus::Cancelled,
        "NO_SHOW_CLIENT" => VisitStatus::NoShowClient,
        "NO_SHOW_CAREGIVER" => VisitStatus::NoShowCaregiver,
        "REJECTED" => VisitStatus::Rejected,
        _ => VisitStatus::Draft,
    }
}

fn parse_billing_status(s: &str) -> BillingStatus {
    match s {
        "BILLED" => BillingStatus::Billed,
        "HELD" => BillingStatus::Held,
        "DISPUTED" => BillingStatus::Disputed,
        _ => BillingStatus::Unbilled,
    }
}

impl From<VisitEntity> for Visit {
    fn from(e: VisitEntity) -> Self {
        Self {
            meta: EntityMeta {
                id: e.id,
                organization_id: e.organization_id,
                branch_id: e.branch_id,
                version: e.version,
                created_at: e.created_at,
                updated_at: e.updated_at,
                created_by: e.created_by,
                updated_by: e.updated_by,
                deleted_at: e.deleted_at,
            },
            pattern_id: e.pattern_id,
            client_id: e.client_id,
            caregiver_id: e.caregiver_id,
            visit_number: e.visit_number,
            visit_type: parse_visit_type(&e.visit_type),
            service_date: e.service_date,
            scheduled_start_time: e.scheduled_start_time,
            scheduled_end_time: e.scheduled_end_time,
            scheduled_duration_minutes: e.scheduled_duration_minutes as u32,
            timezone: e.timezone,
            actual_start: e.actual_start,
            actual_end: e.actual_end,
            assignment: e.assignment.map(|j| j.0),
            service_address: e.service_address.0,
            required_skills: e.required_skills,
            required_certifications: e.required_certifications,
            service_type_code: e.service_type_code,
            status: parse_visit_status(&e.status),
            flags: e.flags.0,
            status_history: e.status_history.0,
            billing_status: parse_billing_status(&e.billing_status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_visit_status_round_trip_names() {
        for (text, status) in [
            ("SCHEDULED", VisitStatus::Scheduled),
            ("IN_PROGRESS", VisitStatus::InProgress),
            ("NO_SHOW_CAREGIVER", VisitStatus::NoShowCaregiver),
        ] {
            assert_eq!(parse_visit_status(text), status);
        }
    }

    #[test]
    fn unknown_status_falls_back_to_draft() {
        assert_eq!(parse_visit_status("BOGUS"), VisitStatus::Draft);
    }
}
