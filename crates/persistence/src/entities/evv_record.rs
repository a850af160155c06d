//! EVV record entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::common::EntityMeta;
use domain::models::compliance::{ComplianceFlag, VerificationLevel};
use domain::models::evv_record::{
    Attestations, EvvRecord, EvvStatus, ExceptionEvent, ManualOverride, PauseEvent,
    PayorSubmissionStatus,
};
use domain::models::location_verification::LocationVerification;

/// Database row mapping for the `evv_records` table.
#[derive(Debug, Clone, FromRow)]
pub struct EvvRecordEntity {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub branch_id: Uuid,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub updated_by: Uuid,
    pub deleted_at: Option<DateTime<Utc>>,
    pub visit_id: Uuid,
    pub client_id: Uuid,
    pub caregiver_id: Uuid,
    pub service_type_code: String,
    pub service_address_line1: String,
    pub service_state: String,
    pub geofence_radius_meters: f64,
    pub clock_in_time: DateTime<Utc>,
    pub clock_out_time: Option<DateTime<Utc>>,
    pub total_duration_minutes: Option<i64>,
    pub clock_in_verification: Json<LocationVerification>,
    pub clock_out_verification: Option<Json<LocationVerification>>,
    pub mid_visit_checks: Json<Vec<LocationVerification>>,
    pub pause_events: Json<Vec<PauseEvent>>,
    pub exception_events: Json<Vec<ExceptionEvent>>,
    pub status: String,
    pub verification_level: String,
    pub compliance_flags: Vec<String>,
    pub integrity_hash: String,
    pub integrity_checksum: String,
    pub attestations: Json<Attestations>,
    pub manual_override: Option<Json<ManualOverride>>,
    pub payor_submission: Json<PayorSubmissionStatus>,
    pub amendment_vmur_id: Option<Uuid>,
}

fn parse_evv_status(s: &str) -> EvvStatus {
    match s {
        "COMPLETE" => EvvStatus::Complete,
        "AMENDED" => EvvStatus::Amended,
        "REJECTED" => EvvStatus::Rejected,
        _ => EvvStatus::Pending,
    }
}

fn parse_verification_level(s: &str) -> VerificationLevel {
    match s {
        "PARTIAL" => VerificationLevel::Partial,
        "EXCEPTION" => VerificationLevel::Exception,
        _ => VerificationLevel::Full,
    }
}

fn parse_compliance_flag(s: &str) -> Option<ComplianceFlag> {
    match s {
        "COMPLIANT" => Some(ComplianceFlag::Compliant),
        "GEOFENCE_VIOLATION" => Some(ComplianceFlag::GeofenceViolation),
        "TIME_GAP" => Some(ComplianceFlag::TimeGap),
        "LOCATION_SUSPICIOUS" => Some(ComplianceFlag::LocationSuspicious),
        "MANUAL_OVERRIDE" => Some(ComplianceFlag::ManualOverride),
        "MISSING_SIGNATURE" => Some(ComplianceFlag::MissingSignature),
        "LATE_SUBMISSION" => Some(ComplianceFlag::LateSubmission),
        "AMENDED" => Some(ComplianceFlag::Amended),
        _ => None,
    }
}

impl From<EvvRecordEntity> for EvvRecord {
    fn from(e: EvvRecordEntity) -> Self {
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
            visit_id: e.visit_id,
            client_id: e.client_id,
            caregiver_id: e.caregiver_id,
            service_type_code: e.service_type_code,
            service_address_line1: e.service_address_line1,
            service_state: e.service_state,
            geofence_radius_meters: e.geofence_radius_meters,
            clock_in_time: e.clock_in_time,
            clock_out_time: e.clock_out_time,
            total_duration_minutes: e.total_duration_minutes,
            clock_in_verification: e.clock_in_verification.0,
            clock_out_verification: e.clock_out_verification.map(|j| j.0),
            mid_visit_checks: e.mid_visit_checks.0,
            pause_events: e.pause_events.0,
            exception_events: e.exception_events.0,
            status: parse_evv_status(&e.status),
            verification_level: parse_verification_level(&e.verification_level),
            compliance_flags: e
                .compliance_flags
                .iter()
                .filter_map(|s| parse_compliance_flag(s))
                .collect(),
            integrity_hash: e.integrity_hash,
            integrity_checksum: e.integrity_checksum,
            attestations: e.attestations.0,
            manual_override: e.manual_override.map(|j| j.0),
            payor_submission: e.payor_submission.0,
            amendment_vmur_id: e.amendment_vmur_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_unknown_compliance_flags() {
        assert_eq!(parse_compliance_flag("COMPLIANT"), Some(ComplianceFlag::Compliant));
        assert_eq!(parse_compliance_flag("NOT_A_FLAG"), None);
    }

    #[test]
    fn maps_evv_status_defaults_to_pending() {
        assert_eq!(parse_evv_status("AMENDED"), EvvStatus::Amended);
        assert_eq!(parse_evv_status("GARBAGE"), EvvStatus::Pending);
    }
}
