//! Visit Maintenance Unlock Request entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::vmur::{Vmur, VmurApprovalStatus, VmurDataSnapshot, VmurReasonCode};

/// Database row mapping for the `vmurs` table.
#[derive(Debug, Clone, FromRow)]
pub struct VmurEntity {
    pub id: Uuid,
    pub evv_record_id: Uuid,
    pub requested_by: Uuid,
    pub requested_by_name: String,
    pub requested_at: DateTime<Utc>,
    pub reason_code: String,
    pub reason_details: String,
    pub approval_status: String,
    pub approver: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub denial_reason: Option<String>,
    pub original_data: Json<VmurDataSnapshot>,
    pub corrected_data: Json<VmurDataSnapshot>,
    pub changes_summary: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

fn parse_reason_code(s: &str) -> VmurReasonCode {
    match s {
        "DEVICE_MALFUNCTION" => VmurReasonCode::DeviceMalfunction,
        "GPS_UNAVAILABLE" => VmurReasonCode::GpsUnavailable,
        "NETWORK_OUTAGE" => VmurReasonCode::NetworkOutage,
        "APP_ERROR" => VmurReasonCode::AppError,
        "SYSTEM_DOWNTIME" => VmurReasonCode::SystemDowntime,
        "RURAL_POOR_SIGNAL" => VmurReasonCode::RuralPoorSignal,
        "SERVICE_LOCATION_CHANGE" => VmurReasonCode::ServiceLocationChange,
        "EMERGENCY_EVACUATION" => VmurReasonCode::EmergencyEvacuation,
        "HOSPITAL_TRANSPORT" => VmurReasonCode::HospitalTransport,
        "FORGOT_TO_CLOCK" => VmurReasonCode::ForgotToClock,
        "TRAINING_NEW_STAFF" => VmurReasonCode::TrainingNewStaff,
        "INCORRECT_CLOCK_TIME" => VmurReasonCode::IncorrectClockTime,
        "DUPLICATE_ENTRY" => VmurReasonCode::DuplicateEntry,
        _ => VmurReasonCode::OtherApproved,
    }
}

fn parse_approval_status(s: &str) -> VmurApprovalStatus {
    match s {
        "APPROVED" => VmurApprovalStatus::Approved,
        "DENIED" => VmurApprovalStatus::Denied,
        "EXPIRED" => VmurApprovalStatus::Expired,
        _ => VmurApprovalStatus::Pending,
    }
}

impl From<VmurEntity> for Vmur {
    fn from(e: VmurEntity) -> Self {
        Self {
            id: e.id,
            evv_record_id: e.evv_record_id,
            requested_by: e.requested_by,
            requested_by_name: e.requested_by_name,
            requested_at: e.requested_at,
            reason_code: parse_reason_code(&e.reason_code),
            reason_details: e.reason_details,
            approval_status: parse_approval_status(&e.approval_status),
            approver: e.approver,
            approved_at: e.approved_at,
            denial_reason: e.denial_reason,
            original_data: e.original_data.0,
            corrected_data: e.corrected_data.0,
            changes_summary: e.changes_summary,
            expires_at: e.expires_at,
        }
    }
}
