//! VMUR workflow (spec.md §4.5), TX only: post-deadline corrections to an
//! already-COMPLETE EVV record, gated by supervisor approval.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::models::evv_record::EvvRecord;
use crate::models::vmur::{Vmur, VmurDataSnapshot, VmurReasonCode, VMUR_MIN_RECORD_AGE_DAYS};

/// `createVMUR`: fails if the record is <30 days old (use a plain amendment
/// instead) or if the record isn't in TX.
pub fn create_vmur(
    record: &EvvRecord,
    requested_by: Uuid,
    requested_by_name: impl Into<String>,
    reason_code: VmurReasonCode,
    reason_details: impl Into<String>,
    corrected_data: VmurDataSnapshot,
    now: DateTime<Utc>,
) -> DomainResult<Vmur> {
    if record.service_state != "TX" {
        return Err(DomainError::validation(
            "VMUR workflow is only available for TX records",
        ));
    }
    let age_days = (now - record.clock_in_time).num_days();
    if age_days < VMUR_MIN_RECORD_AGE_DAYS {
        return Err(DomainError::validation(format!(
            "record is only {age_days} days old; use a plain amendment instead of a VMUR"
        )));
    }

    let original_data = VmurDataSnapshot {
        clock_in_time: record.clock_in_time,
        clock_out_time: record.clock_out_time,
        latitude: record.clock_in_verification.event.latitude,
        longitude: record.clock_in_verification.event.longitude,
        total_duration_minutes: record.total_duration_minutes,
    };

    Ok(Vmur::new(
        record.meta.id,
        requested_by,
        requested_by_name,
        reason_code,
        reason_details,
        original_data,
        corrected_data,
    ))
}

/// `approveVMUR` (supervisor only): applies the corrected snapshot to the
/// EVV record atomically, flips it to AMENDED, and marks it pending
/// resubmission.
pub fn approve_vmur(
    vmur: &mut Vmur,
    record: &mut EvvRecord,
    supervisor: Uuid,
    actor_is_supervisor: bool,
) -> DomainResult<()> {
    if !actor_is_supervisor {
        return Err(DomainError::permission("VMUR approval requires a supervisor role"));
    }
    vmur.approve(supervisor)?;

    record.clock_in_time = vmur.corrected_data.clock_in_time;
    record.clock_out_time = vmur.corrected_data.clock_out_time;
    record.clock_in_verification.event.latitude = vmur.corrected_data.latitude;
    record.clock_in_verification.event.longitude = vmur.corrected_data.longitude;
    record.total_duration_minutes = vmur.corrected_data.total_duration_minutes;
    record.amendment_vmur_id = Some(vmur.id);

    record.transition(crate::models::evv_record::EvvStatus::Amended, supervisor)?;

    record.payor_submission.submitted_to_aggregator = true;
    record.payor_submission.submitted_at = Some(Utc::now());

    let value = serde_json::to_value(&*record).expect("EvvRecord is serializable");
    record.integrity_checksum =
        crate::services::integrity::integrity_digest(&value, Some("integrityChecksum"));

    Ok(())
}

/// `denyVMUR` (supervisor only).
pub fn deny_vmur(
    vmur: &mut Vmur,
    supervisor: Uuid,
    reason: impl Into<String>,
    actor_is_supervisor: bool,
) -> DomainResult<()> {
    if !actor_is_supervisor {
        return Err(DomainError::permission("VMUR denial requires a supervisor role"));
    }
    vmur.deny(supervisor, reason)
}

/// `expireOldVMURs`: background sweep over PENDING VMURs past `expiresAt`.
/// Returns the ids of VMURs it expired.
pub fn expire_old_vmurs(vmurs: &mut [Vmur], now: DateTime<Utc>) -> Vec<Uuid> {
    vmurs
        .iter_mut()
        .filter(|v| v.expire_if_due(now))
        .map(|v| v.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::compliance::{ComplianceFlag, VerificationLevel};
    use crate::models::evv_record::{Attestations, EvvStatus, PayorSubmissionStatus};
    use crate::models::location_verification::{LocationEvent, LocationMethod, LocationVerification};
    use chrono::Duration;

    fn old_record() -> EvvRecord {
        let clock_in = Utc::now() - Duration::days(45);
        EvvRecord {
            meta: crate::models::common::EntityMeta::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()),
            visit_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            caregiver_id: Uuid::new_v4(),
            service_type_code: "PCA".into(),
            service_address_line1: "1 Main St".into(),
            service_state: "TX".into(),
            geofence_radius_meters: 100.0,
            clock_in_time: clock_in,
            clock_out_time: Some(clock_in + Duration::hours(1)),
            total_duration_minutes: Some(60),
            clock_in_verification: LocationVerification {
                event: LocationEvent {
                    latitude: 30.2672,
                    longitude: -97.7431,
                    accuracy_meters: 15.0,
                    timestamp: clock_in,
                    method: LocationMethod::Gps,
                    mock_location_detected: false,
                },
                within_geofence: true,
                distance_from_address_meters: 5.0,
                effective_radius_meters: 100.0,
                requires_manual_review: false,
                device_info: None,
            },
            clock_out_verification: None,
            mid_visit_checks: vec![],
            pause_events: vec![],
            exception_events: vec![],
            status: EvvStatus::Complete,
            verification_level: VerificationLevel::Full,
            compliance_flags: vec![ComplianceFlag::Compliant],
            integrity_hash: "deadbeef".into(),
            integrity_checksum: "deadbeef".into(),
            attestations: Attestations {
                caregiver: None,
                client: None,
                supervisor: None,
            },
            manual_override: None,
            payor_submission: PayorSubmissionStatus::default(),
            amendment_vmur_id: None,
        }
    }

    fn corrected(record: &EvvRecord) -> VmurDataSnapshot {
        VmurDataSnapshot {
            clock_in_time: record.clock_in_time + Duration::minutes(10),
            clock_out_time: record.clock_out_time,
            latitude: record.clock_in_verification.event.latitude,
            longitude: record.clock_in_verification.event.longitude,
            total_duration_minutes: Some(50),
        }
    }

    #[test]
    fn create_vmur_rejects_non_tx_state() {
        let mut record = old_record();
        record.service_state = "FL".into();
        let corrected_data = corrected(&record);
        let result = create_vmur(
            &record,
            Uuid::new_v4(),
            "Supervisor",
            VmurReasonCode::GpsUnavailable,
            "bad gps",
            corrected_data,
            Utc::now(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn create_vmur_rejects_record_younger_than_30_days() {
        let mut record = old_record();
        record.clock_in_time = Utc::now() - Duration::days(5);
        let corrected_data = corrected(&record);
        let result = create_vmur(
            &record,
            Uuid::new_v4(),
            "Supervisor",
            VmurReasonCode::GpsUnavailable,
            "bad gps",
            corrected_data,
            Utc::now(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn approve_vmur_applies_corrections_and_flips_to_amended() {
        let mut record = old_record();
        let corrected_data = corrected(&record);
        let mut vmur = create_vmur(
            &record,
            Uuid::new_v4(),
            "Supervisor",
            VmurReasonCode::IncorrectClockTime,
            "clock time was wrong",
            corrected_data,
            Utc::now(),
        )
        .unwrap();

        let supervisor = Uuid::new_v4();
        approve_vmur(&mut vmur, &mut record, supervisor, true).unwrap();

        assert_eq!(record.status, EvvStatus::Amended);
        assert_eq!(record.total_duration_minutes, Some(50));
        assert!(record.payor_submission.submitted_to_aggregator);
        assert_eq!(record.amendment_vmur_id, Some(vmur.id));
    }

    #[test]
    fn approve_vmur_requires_supervisor() {
        let mut record = old_record();
        let corrected_data = corrected(&record);
        let mut vmur = create_vmur(
            &record,
            Uuid::new_v4(),
            "Supervisor",
            VmurReasonCode::IncorrectClockTime,
            "clock time was wrong",
            corrected_data,
            Utc::now(),
        )
        .unwrap();
        let result = approve_vmur(&mut vmur, &mut record, Uuid::new_v4(), false);
        assert!(result.is_err());
        assert_eq!(vmur.approval_status, crate::models::vmur::VmurApprovalStatus::Pending);
    }

    #[test]
    fn deny_vmur_requires_supervisor() {
        let mut record = old_record();
        let corrected_data = corrected(&record);
        let mut vmur = create_vmur(
            &record,
            Uuid::new_v4(),
            "Supervisor",
            VmurReasonCode::IncorrectClockTime,
            "clock time was wrong",
            corrected_data,
            Utc::now(),
        )
        .unwrap();
        assert!(deny_vmur(&mut vmur, Uuid::new_v4(), "insufficient evidence", false).is_err());
        deny_vmur(&mut vmur, Uuid::new_v4(), "insufficient evidence", true).unwrap();
        assert_eq!(vmur.approval_status, crate::models::vmur::VmurApprovalStatus::Denied);
    }

    #[test]
    fn expire_old_vmurs_sweeps_past_deadline() {
        let record = old_record();
        let corrected_data = corrected(&record);
        let mut vmur = create_vmur(
            &record,
            Uuid::new_v4(),
            "Supervisor",
            VmurReasonCode::GpsUnavailable,
            "bad gps",
            corrected_data,
            Utc::now(),
        )
        .unwrap();
        vmur.expires_at = Utc::now() - Duration::days(1);
        let mut vmurs = vec![vmur];
        let expired = expire_old_vmurs(&mut vmurs, Utc::now());
        assert_eq!(expired.len(), 1);
        assert_eq!(
            vmurs[0].approval_status,
            crate::models::vmur::VmurApprovalStatus::Expired
        );
    }
}
