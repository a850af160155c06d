//! Service pattern entity (database row mapping).

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use std::collections::BTreeSet;
use uuid::Uuid;

use domain::models::common::EntityMeta;
use domain::models::recurrence::RecurrenceRule;
use domain::models::service_pattern::{PatternStatus, PatternType, ServicePattern};

/// Database row mapping for the `service_patterns` table.
#[derive(Debug, Clone, FromRow)]
pub struct ServicePatternEntity {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub branch_id: Uuid,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub updated_by: Uuid,
    pub deleted_at: Option<DateTime<Utc>>,
    pub pattern_type: String,
    pub recurrence: Json<RecurrenceRule>,
    pub service_type_code: String,
    pub duration_minutes: i32,
    pub required_skills: Vec<String>,
    pub required_certifications: Vec<String>,
    pub preferred_caregiver_ids: Vec<Uuid>,
    pub blocked_caregiver_ids: Vec<Uuid>,
    pub client_id: Uuid,
    pub authorization_start_date: NaiveDate,
    pub authorization_end_date: NaiveDate,
    pub weekly_hour_cap: Option<i32>,
    pub weekly_visit_cap: Option<i32>,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
    pub status: String,
}

fn parse_pattern_type(s: &str) -> PatternType {
    match s {
        "ONE_TIME" => PatternType::OneTime,
        "AS_NEEDED" => PatternType::AsNeeded,
        "RESPITE" => PatternType::Respite,
        _ => PatternType::Recurring,
    }
}

fn parse_pattern_status(s: &str) -> PatternStatus {
    match s {
        "ACTIVE" => PatternStatus::Active,
        "SUSPENDED" => PatternStatus::Suspended,
        "COMPLETED" => PatternStatus::Completed,
        "CANCELLED" => PatternStatus::Cancelled,
        _ => PatternStatus::Draft,
    }
}

impl From<ServicePatternEntity> for ServicePattern {
    fn from(e: ServicePatternEntity) -> Self {
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
            pattern_type: parse_pattern_type(&e.pattern_type),
            recurrence: e.recurrence.0,
            service_type_code: e.service_type_code,
            duration_minutes: e.duration_minutes as u32,
            required_skills: e.required_skills.into_iter().collect::<BTreeSet<_>>(),
            required_certifications: e.required_certifications.into_iter().collect::<BTreeSet<_>>(),
            preferred_caregiver_ids: e.preferred_caregiver_ids,
            blocked_caregiver_ids: e.blocked_caregiver_ids.into_iter().collect::<BTreeSet<_>>(),
            client_id: e.client_id,
            authorization_start_date: e.authorization_start_date,
            authorization_end_date: e.authorization_end_date,
            weekly_hour_cap: e.weekly_hour_cap.map(|v| v as u32),
            weekly_visit_cap: e.weekly_visit_cap.map(|v| v as u32),
            effective_from: e.effective_from,
            effective_to: e.effective_to,
            status: parse_pattern_status(&e.status),
        }
    }
}
