//! EVV Record aggregate (spec.md §3, §4.4).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::common::EntityMeta;
use super::compliance::{ComplianceFlag, VerificationLevel};
use super::location_verification::{DeviceInfo, LocationEvent, LocationVerification};
use crate::error::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvvStatus {
    Pending,
    Complete,
    Amended,
    Rejected,
}

impl EvvStatus {
    /// PENDING→COMPLETE (normal), PENDING→REJECTED (abandoned),
    /// COMPLETE→AMENDED (see VMUR §4.5).
    pub fn can_transition_to(&self, next: EvvStatus) -> bool {
        use EvvStatus::*;
        matches!((self, next), (Pending, Complete) | (Pending, Rejected) | (Complete, Amended))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EvvStatus::Pending => "PENDING",
            EvvStatus::Complete => "COMPLETE",
            EvvStatus::Amended => "AMENDED",
            EvvStatus::Rejected => "REJECTED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttestationType {
    Signature,
    Checkbox,
    Verbal,
    Biometric,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attestation {
    pub signer: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub attestation_type: AttestationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_blob_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attestations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caregiver: Option<Attestation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<Attestation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervisor: Option<Attestation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseEvent {
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resumed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionEvent {
    pub occurred_at: DateTime<Utc>,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualOverride {
    pub override_by: Uuid,
    pub override_at: DateTime<Utc>,
    pub reason: String,
    pub reason_code: String,
    pub supervisor_name: String,
    pub supervisor_title: String,
    pub approval_authority: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayorSubmissionStatus {
    #[serde(default)]
    pub submitted_to_aggregator: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvvRecord {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub visit_id: Uuid,
    pub client_id: Uuid,
    pub caregiver_id: Uuid,
    pub service_type_code: String,
    pub service_address_line1: String,
    pub service_state: String,
    pub geofence_radius_meters: f64,
    pub clock_in_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock_out_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration_minutes: Option<i64>,
    pub clock_in_verification: LocationVerification,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock_out_verification: Option<LocationVerification>,
    #[serde(default)]
    pub mid_visit_checks: Vec<LocationVerification>,
    #[serde(default)]
    pub pause_events: Vec<PauseEvent>,
    #[serde(default)]
    pub exception_events: Vec<ExceptionEvent>,
    pub status: EvvStatus,
    pub verification_level: VerificationLevel,
    pub compliance_flags: Vec<ComplianceFlag>,
    /// SHA-256 over the core identifying + clock-in data, fixed at creation.
    pub integrity_hash: String,
    /// SHA-256 over the full current record, recomputed on every write.
    pub integrity_checksum: String,
    #[serde(default)]
    pub attestations: Attestations,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_override: Option<ManualOverride>,
    #[serde(default)]
    pub payor_submission: PayorSubmissionStatus,
    /// Set when an approved VMUR applies corrections; referenced by the
    /// amended-record VMUR requirement in the TX state rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amendment_vmur_id: Option<Uuid>,
}

impl EvvRecord {
    pub fn transition(&mut self, next: EvvStatus, actor: Uuid) -> DomainResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::validation(format!(
                "cannot transition EVV record from {:?} to {:?}",
                self.status, next
            )));
        }
        self.status = next;
        self.meta.touch(actor);
        Ok(())
    }

    /// `clockOutTime >= clockInTime`.
    pub fn validate_clock_times(&self) -> DomainResult<()> {
        if let Some(clock_out) = self.clock_out_time {
            if clock_out < self.clock_in_time {
                return Err(DomainError::validation(
                    "clockOutTime must be >= clockInTime",
                ));
            }
        }
        Ok(())
    }

    /// `round((clockOutTime - clockInTime) / 60s)`, per §4.4.
    pub fn compute_total_duration_minutes(&self) -> DomainResult<i64> {
        let clock_out = self
            .clock_out_time
            .ok_or_else(|| DomainError::validation("clockOutTime is required"))?;
        let seconds = (clock_out - self.clock_in_time).num_seconds();
        Ok(((seconds as f64) / 60.0).round() as i64)
    }

    pub fn is_amended(&self) -> bool {
        matches!(self.status, EvvStatus::Amended)
    }
}

/// `POST /evv/clock-in` request body. Not path-scoped by visit, so the
/// target visit travels in the body alongside the location fix.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClockInRequest {
    pub visit_id: Uuid,
    #[validate(nested)]
    pub location: LocationEvent,
    #[serde(default)]
    pub device_info: Option<DeviceInfo>,
}

/// `POST /evv/clock-out` request body.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClockOutRequest {
    pub visit_id: Uuid,
    #[validate(nested)]
    pub location: LocationEvent,
    #[serde(default)]
    pub device_info: Option<DeviceInfo>,
}

/// `POST /api/v1/evv-records/:id/override` request body: a supervisor
/// manually attesting to a visit the geofence/clock flow could not verify
/// (spec.md §4.4 manual override).
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ManualOverrideRequest {
    #[validate(length(min = 1, max = 2000))]
    pub reason: String,
    #[validate(length(min = 1, max = 40))]
    pub reason_code: String,
    #[validate(length(min = 1, max = 200))]
    pub supervisor_name: String,
    #[validate(length(min = 1, max = 200))]
    pub supervisor_title: String,
    #[validate(length(min = 1, max = 200))]
    pub approval_authority: String,
    #[serde(default)]
    pub notes: Option<String>,
}
