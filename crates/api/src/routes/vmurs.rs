//! VMUR (Visit Maintenance Unlock Request) endpoint handlers (spec.md §4.5). TX only.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use domain::models::care_staff::{CareRole, CareStaff};
use domain::models::evv_record::EvvRecord;
use domain::models::vmur::{CreateVmurRequest, DenyVmurRequest, Vmur};
use domain::services::vmur_workflow::{approve_vmur, create_vmur, deny_vmur};
use persistence::repositories::{EvvRecordRepository, VmurRepository};

/// `POST /api/v1/vmurs`: a caregiver or supervisor requests a post-deadline
/// correction to an already-COMPLETE TX record. Creating a VMUR never
/// touches the EVV record itself — only `approveVmur` does.
pub async fn create_vmur_handler(
    State(state): State<AppState>,
    Extension(care_staff): Extension<CareStaff>,
    Json(request): Json<CreateVmurRequest>,
) -> Result<(StatusCode, Json<Vmur>), ApiError> {
    request.validate()?;

    let record_repo = EvvRecordRepository::new(state.pool.clone());
    let entity = record_repo
        .find_by_id(request.evv_record_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("evv record not found".into()))?;
    let record: EvvRecord = entity.into();

    let vmur = create_vmur(
        &record,
        care_staff.user_id,
        requester_name(&care_staff),
        request.reason_code,
        request.reason_details,
        request.corrected_data,
        chrono::Utc::now(),
    )?;

    let vmur_repo = VmurRepository::new(state.pool.clone());
    let entity = vmur_repo
        .create(
            vmur.evv_record_id,
            vmur.requested_by,
            &vmur.requested_by_name,
            vmur.reason_code.as_str(),
            &vmur.reason_details,
            &vmur.original_data,
            &vmur.corrected_data,
            &vmur.changes_summary,
            vmur.expires_at,
        )
        .await?;

    let vmur: Vmur = entity.into();
    info!(vmur_id = %vmur.id, evv_record_id = %vmur.evv_record_id, "vmur created");
    Ok((StatusCode::CREATED, Json(vmur)))
}

/// `GET /api/v1/vmurs/:id`.
pub async fn get_vmur(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vmur>, ApiError> {
    let repo = VmurRepository::new(state.pool.clone());
    let entity = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("vmur not found".into()))?;
    Ok(Json(entity.into()))
}

/// `GET /api/v1/evv-records/:id/vmurs/pending`.
pub async fn list_pending_vmurs(
    State(state): State<AppState>,
    Path(evv_record_id): Path<Uuid>,
) -> Result<Json<Vec<Vmur>>, ApiError> {
    let repo = VmurRepository::new(state.pool.clone());
    let entities = repo.find_pending_for_record(evv_record_id).await?;
    Ok(Json(entities.into_iter().map(Into::into).collect()))
}

/// `POST /api/v1/vmurs/:id/approve` (supervisor only): applies the corrected
/// snapshot to the EVV record, flips it to AMENDED, and marks it pending
/// resubmission, all in one pass.
pub async fn approve_vmur_handler(
    State(state): State<AppState>,
    Extension(care_staff): Extension<CareStaff>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vmur>, ApiError> {
    let vmur_repo = VmurRepository::new(state.pool.clone());
    let entity = vmur_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("vmur not found".into()))?;
    let mut vmur: Vmur = entity.into();

    let record_repo = EvvRecordRepository::new(state.pool.clone());
    let record_entity = record_repo
        .find_by_id(vmur.evv_record_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("evv record not found".into()))?;
    let expected_version = record_entity.version;
    let mut record: EvvRecord = record_entity.into();

    approve_vmur(
        &mut vmur,
        &mut record,
        care_staff.user_id,
        care_staff.role.has_at_least(CareRole::BranchAdmin),
    )?;

    vmur_repo
        .apply_decision(vmur.id, vmur.approval_status.as_str(), care_staff.user_id, None)
        .await?;

    let compliance_flags: Vec<String> = record.compliance_flags.iter().map(|f| f.as_str().to_string()).collect();
    record_repo
        .apply_clock_out(
            record.meta.id,
            expected_version,
            record.clock_out_time.unwrap_or(record.clock_in_time),
            record.total_duration_minutes.unwrap_or(0),
            record
                .clock_out_verification
                .as_ref()
                .unwrap_or(&record.clock_in_verification),
            record.status.as_str(),
            record.verification_level.as_str(),
            &compliance_flags,
            &record.integrity_checksum,
            &record.attestations,
            care_staff.user_id,
        )
        .await?;

    info!(vmur_id = %vmur.id, evv_record_id = %record.meta.id, "vmur approved");
    Ok(Json(vmur))
}

/// `POST /api/v1/vmurs/:id/deny` (supervisor only).
pub async fn deny_vmur_handler(
    State(state): State<AppState>,
    Extension(care_staff): Extension<CareStaff>,
    Path(id): Path<Uuid>,
    Json(request): Json<DenyVmurRequest>,
) -> Result<Json<Vmur>, ApiError> {
    request.validate()?;

    let repo = VmurRepository::new(state.pool.clone());
    let entity = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("vmur not found".into()))?;
    let mut vmur: Vmur = entity.into();

    deny_vmur(
        &mut vmur,
        care_staff.user_id,
        request.reason.clone(),
        care_staff.role.has_at_least(CareRole::BranchAdmin),
    )?;

    repo.apply_decision(vmur.id, vmur.approval_status.as_str(), care_staff.user_id, Some(&request.reason))
        .await?;

    info!(vmur_id = %vmur.id, "vmur denied");
    Ok(Json(vmur))
}

fn requester_name(care_staff: &CareStaff) -> String {
    care_staff.user_id.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::vmur::VmurDataSnapshot;

    #[test]
    fn create_vmur_request_deserializes() {
        let json = r#"{
            "evvRecordId": "550e8400-e29b-41d4-a716-446655440000",
            "reasonCode": "GPS_UNAVAILABLE",
            "reasonDetails": "device lost signal for the whole visit",
            "correctedData": {
                "clockInTime": "2024-01-01T09:00:00Z",
                "latitude": 30.2672,
                "longitude": -97.7431
            }
        }"#;
        let request: CreateVmurRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.reason_details, "device lost signal for the whole visit");
    }

    #[test]
    fn deny_request_deserializes() {
        let json = r#"{"reason": "insufficient evidence"}"#;
        let request: DenyVmurRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.reason, "insufficient evidence");
    }

    #[test]
    fn corrected_data_omits_optional_fields() {
        let json = r#"{"clockInTime": "2024-01-01T09:00:00Z", "latitude": 30.0, "longitude": -97.0}"#;
        let snapshot: VmurDataSnapshot = serde_json::from_str(json).unwrap();
        assert!(snapshot.clock_out_time.is_none());
        assert!(snapshot.total_duration_minutes.is_none());
    }
}
