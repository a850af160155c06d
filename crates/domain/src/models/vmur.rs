//! Visit Maintenance Unlock Request aggregate (spec.md §3, §4.5). TX only.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{DomainError, DomainResult};

/// HHSC-approved reason codes, closed set (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VmurReasonCode {
    DeviceMalfunction,
    GpsUnavailable,
    NetworkOutage,
    AppError,
    SystemDowntime,
    RuralPoorSignal,
    ServiceLocationChange,
    EmergencyEvacuation,
    HospitalTransport,
    ForgotToClock,
    TrainingNewStaff,
    IncorrectClockTime,
    DuplicateEntry,
    OtherApproved,
}

impl VmurReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VmurReasonCode::DeviceMalfunction => "DEVICE_MALFUNCTION",
            VmurReasonCode::GpsUnavailable => "GPS_UNAVAILABLE",
            VmurReasonCode::NetworkOutage => "NETWORK_OUTAGE",
            VmurReasonCode::AppError => "APP_ERROR",
            VmurReasonCode::SystemDowntime => "SYSTEM_DOWNTIME",
            VmurReasonCode::RuralPoorSignal => "RURAL_POOR_SIGNAL",
            VmurReasonCode::ServiceLocationChange => "SERVICE_LOCATION_CHANGE",
            VmurReasonCode::EmergencyEvacuation => "EMERGENCY_EVACUATION",
            VmurReasonCode::HospitalTransport => "HOSPITAL_TRANSPORT",
            VmurReasonCode::ForgotToClock => "FORGOT_TO_CLOCK",
            VmurReasonCode::TrainingNewStaff => "TRAINING_NEW_STAFF",
            VmurReasonCode::IncorrectClockTime => "INCORRECT_CLOCK_TIME",
            VmurReasonCode::DuplicateEntry => "DUPLICATE_ENTRY",
            VmurReasonCode::OtherApproved => "OTHER_APPROVED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VmurApprovalStatus {
    Pending,
    Approved,
    Denied,
    Expired,
}

impl VmurApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VmurApprovalStatus::Pending => "PENDING",
            VmurApprovalStatus::Approved => "APPROVED",
            VmurApprovalStatus::Denied => "DENIED",
            VmurApprovalStatus::Expired => "EXPIRED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmurDataSnapshot {
    pub clock_in_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock_out_time: Option<DateTime<Utc>>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration_minutes: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vmur {
    pub id: Uuid,
    pub evv_record_id: Uuid,
    pub requested_by: Uuid,
    pub requested_by_name: String,
    pub requested_at: DateTime<Utc>,
    pub reason_code: VmurReasonCode,
    pub reason_details: String,
    pub approval_status: VmurApprovalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approver: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denial_reason: Option<String>,
    pub original_data: VmurDataSnapshot,
    pub corrected_data: VmurDataSnapshot,
    /// Human-readable list of field-level diffs.
    pub changes_summary: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

/// Records must be at least this old before an amendment requires a VMUR
/// (spec.md §4.5: "fails if record is <30 days old").
pub const VMUR_MIN_RECORD_AGE_DAYS: i64 = 30;
pub const VMUR_EXPIRY_DAYS: i64 = 30;

impl Vmur {
    pub fn new(
        evv_record_id: Uuid,
        requested_by: Uuid,
        requested_by_name: impl Into<String>,
        reason_code: VmurReasonCode,
        reason_details: impl Into<String>,
        original_data: VmurDataSnapshot,
        corrected_data: VmurDataSnapshot,
    ) -> Self {
        let now = Utc::now();
        let changes_summary = diff_summary(&original_data, &corrected_data);
        Self {
            id: Uuid::new_v4(),
            evv_record_id,
            requested_by,
            requested_by_name: requested_by_name.into(),
            requested_at: now,
            reason_code,
            reason_details: reason_details.into(),
            approval_status: VmurApprovalStatus::Pending,
            approver: None,
            approved_at: None,
            denial_reason: None,
            original_data,
            corrected_data,
            changes_summary,
            expires_at: now + Duration::days(VMUR_EXPIRY_DAYS),
        }
    }

    pub fn approve(&mut self, supervisor: Uuid) -> DomainResult<()> {
        if self.approval_status != VmurApprovalStatus::Pending {
            return Err(DomainError::conflict("VMUR is not in PENDING status"));
        }
        self.approval_status = VmurApprovalStatus::Approved;
        self.approver = Some(supervisor);
        self.approved_at = Some(Utc::now());
        Ok(())
    }

    pub fn deny(&mut self, supervisor: Uuid, reason: impl Into<String>) -> DomainResult<()> {
        if self.approval_status != VmurApprovalStatus::Pending {
            return Err(DomainError::conflict("VMUR is not in PENDING status"));
        }
        self.approval_status = VmurApprovalStatus::Denied;
        self.approver = Some(supervisor);
        self.approved_at = Some(Utc::now());
        self.denial_reason = Some(reason.into());
        Ok(())
    }

    pub fn expire_if_due(&mut self, now: DateTime<Utc>) -> bool {
        if self.approval_status == VmurApprovalStatus::Pending && now >= self.expires_at {
            self.approval_status = VmurApprovalStatus::Expired;
            true
        } else {
            false
        }
    }
}

fn diff_summary(original: &VmurDataSnapshot, corrected: &VmurDataSnapshot) -> Vec<String> {
    let mut diffs = Vec::new();
    if original.clock_in_time != corrected.clock_in_time {
        diffs.push(format!(
            "clockInTime: {} -> {}",
            original.clock_in_time, corrected.clock_in_time
        ));
    }
    if original.clock_out_time != corrected.clock_out_time {
        diffs.push(format!(
            "clockOutTime: {:?} -> {:?}",
            original.clock_out_time, corrected.clock_out_time
        ));
    }
    if (original.latitude - corrected.latitude).abs() > f64::EPSILON
        || (original.longitude - corrected.longitude).abs() > f64::EPSILON
    {
        diffs.push(format!(
            "location: ({}, {}) -> ({}, {})",
            original.latitude, original.longitude, corrected.latitude, corrected.longitude
        ));
    }
    if original.total_duration_minutes != corrected.total_duration_minutes {
        diffs.push(format!(
            "totalDurationMinutes: {:?} -> {:?}",
            original.total_duration_minutes, corrected.total_duration_minutes
        ));
    }
    diffs
}

/// `POST /api/v1/vmurs` request body.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateVmurRequest {
    pub evv_record_id: Uuid,
    pub reason_code: VmurReasonCode,
    #[validate(length(min = 1, max = 2000))]
    pub reason_details: String,
    pub corrected_data: VmurDataSnapshot,
}

/// `POST /api/v1/vmurs/:id/deny` request body.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DenyVmurRequest {
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}

/// `GET /api/v1/vmurs/pending` query string: per-org, with age filtering.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPendingVmursQuery {
    #[serde(default)]
    pub min_age_days: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(clock_in_offset_minutes: i64) -> VmurDataSnapshot {
        VmurDataSnapshot {
            clock_in_time: Utc::now() + Duration::minutes(clock_in_offset_minutes),
            clock_out_time: None,
            latitude: 30.2672,
            longitude: -97.7431,
            total_duration_minutes: Some(60),
        }
    }

    fn sample_vmur() -> Vmur {
        Vmur::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Jane Caregiver",
            VmurReasonCode::GpsUnavailable,
            "device lost signal",
            snapshot(0),
            snapshot(5),
        )
    }

    #[test]
    fn new_vmur_is_pending_with_30_day_expiry() {
        let vmur = sample_vmur();
        assert_eq!(vmur.approval_status, VmurApprovalStatus::Pending);
        let expected_expiry = vmur.requested_at + Duration::days(VMUR_EXPIRY_DAYS);
        assert_eq!(vmur.expires_at, expected_expiry);
        assert!(!vmur.changes_summary.is_empty());
    }

    #[test]
    fn approve_transitions_and_stamps_approver() {
        let mut vmur = sample_vmur();
        let supervisor = Uuid::new_v4();
        vmur.approve(supervisor).unwrap();
        assert_eq!(vmur.approval_status, VmurApprovalStatus::Approved);
        assert_eq!(vmur.approver, Some(supervisor));
    }

    #[test]
    fn approve_twice_conflicts() {
        let mut vmur = sample_vmur();
        vmur.approve(Uuid::new_v4()).unwrap();
        assert!(vmur.approve(Uuid::new_v4()).is_err());
    }

    #[test]
    fn deny_records_reason() {
        let mut vmur = sample_vmur();
        vmur.deny(Uuid::new_v4(), "insufficient evidence").unwrap();
        assert_eq!(vmur.approval_status, VmurApprovalStatus::Denied);
        assert_eq!(vmur.denial_reason.as_deref(), Some("insufficient evidence"));
    }

    #[test]
    fn expire_if_due_only_fires_past_expiry_and_while_pending() {
        let mut vmur = sample_vmur();
        assert!(!vmur.expire_if_due(vmur.requested_at));
        assert!(vmur.expire_if_due(vmur.expires_at));
        assert_eq!(vmur.approval_status, VmurApprovalStatus::Expired);

        let mut approved = sample_vmur();
        approved.approve(Uuid::new_v4()).unwrap();
        assert!(!approved.expire_if_due(approved.expires_at + Duration::days(1)));
    }
}
