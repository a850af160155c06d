//! EVV clock-in/clock-out/override and geofence endpoint handlers (spec.md §4.4).

use axum::{extract::State, http::StatusCode, Extension, Json};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::care_ports::{PgCaregiverProvider, PgClientAddressProvider, PgClientProvider, PgVisitProvider};
use domain::models::care_staff::{CareRole, CareStaff};
use domain::models::evv_record::{ClockInRequest, ClockOutRequest, EvvRecord, ManualOverrideRequest};
use domain::models::geofence::{CreateEvvGeofenceRequest, Geofence};
use domain::ports::address_provider::{CachedClientAddressProvider, ClientAddressProvider};
use domain::ports::caregiver_provider::CaregiverProvider;
use domain::ports::client_provider::ClientProvider;
use domain::ports::visit_provider::VisitProvider;
use domain::services::evv_verification::{
    apply_manual_override, clock_in, clock_out, ClockInContext, ClockOutContext,
};
use persistence::repositories::{CaregiverRepository, ClientRepository, EvvGeofenceRepository, EvvRecordRepository, VisitRepository};

/// `POST /api/v1/evv/clock-in` (spec.md §4.4): the caregiver calling this
/// must already be the visit's assigned caregiver. Resolves the ordered
/// preconditions — gate, authorization, address, geofence lookup-or-create —
/// before handing off to the pure `clock_in` contract.
pub async fn clock_in_handler(
    State(state): State<AppState>,
    Extension(care_staff): Extension<CareStaff>,
    Json(request): Json<ClockInRequest>,
) -> Result<(StatusCode, Json<EvvRecord>), ApiError> {
    request.validate()?;

    let visit_provider = PgVisitProvider::new(VisitRepository::new(state.pool.clone()));
    let caregiver_provider = PgCaregiverProvider::new(CaregiverRepository::new(state.pool.clone()));
    let address_provider =
        CachedClientAddressProvider::new(PgClientAddressProvider::new(ClientRepository::new(state.pool.clone())));
    let geofence_repo = EvvGeofenceRepository::new(state.pool.clone());

    let visit = visit_provider.get_visit_for_evv(request.visit_id).await?;
    let gate = visit_provider
        .can_clock_in(request.visit_id, care_staff.user_id)
        .await?;
    let authorization = caregiver_provider
        .can_provide_service(care_staff.user_id, &visit.service_type_code, visit.client_id)
        .await?;
    let address = address_provider.get_client_address(visit.client_id).await?;

    let mut geofence_entity = geofence_repo
        .find_by_client_id(visit.client_id)
        .await?;
    if geofence_entity.is_none() {
        let created = geofence_repo
            .create(
                care_staff.organization_id,
                care_staff.branch_id,
                care_staff.user_id,
                visit.client_id,
                address.latitude,
                address.longitude,
                address.geofence_radius_meters.unwrap_or(100) as f64,
            )
            .await?;
        geofence_entity = Some(created);
    }
    let mut geofence: Geofence = geofence_entity.expect("just created if missing").into();

    let ctx = ClockInContext {
        visit: &visit,
        gate,
        authorization: &authorization,
        address: &address,
        geofence: &mut geofence,
        location: request.location.clone(),
        device_info: request.device_info.clone(),
        actor: care_staff.user_id,
        organization_id: care_staff.organization_id,
        branch_id: care_staff.branch_id,
    };
    let outcome = clock_in(ctx)?;

    let clock_in_success = outcome.record.clock_in_verification.within_geofence
        && !outcome.record.clock_in_verification.requires_manual_review;
    geofence_repo
        .record_verification(visit.client_id, request.location.accuracy_meters, clock_in_success)
        .await?;

    let record_repo = EvvRecordRepository::new(state.pool.clone());
    let compliance_flags: Vec<String> = outcome
        .record
        .compliance_flags
        .iter()
        .map(|f| f.as_str().to_string())
        .collect();
    let entity = record_repo
        .create(
            care_staff.organization_id,
            care_staff.branch_id,
            care_staff.user_id,
            outcome.record.visit_id,
            outcome.record.client_id,
            outcome.record.caregiver_id,
            &outcome.record.service_type_code,
            &outcome.record.service_address_line1,
            &outcome.record.service_state,
            outcome.record.geofence_radius_meters,
            outcome.record.clock_in_time,
            &outcome.record.clock_in_verification,
            outcome.record.verification_level.as_str(),
            &compliance_flags,
            &outcome.record.integrity_hash,
            &outcome.record.integrity_checksum,
        )
        .await?;

    let record: EvvRecord = entity.into();
    info!(visit_id = %record.visit_id, caregiver_id = %record.caregiver_id, phone_warning = outcome.phone_warning, "evv clock-in recorded");
    Ok((StatusCode::CREATED, Json(record)))
}

/// `POST /api/v1/evv/clock-out` (spec.md §4.4): the EVV record for the visit
/// must already be PENDING.
pub async fn clock_out_handler(
    State(state): State<AppState>,
    Extension(care_staff): Extension<CareStaff>,
    Json(request): Json<ClockOutRequest>,
) -> Result<Json<EvvRecord>, ApiError> {
    request.validate()?;

    let record_repo = EvvRecordRepository::new(state.pool.clone());
    let entity = record_repo
        .find_by_visit_id(request.visit_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("no pending evv record for this visit".into()))?;
    let expected_version = entity.version;
    let mut record: EvvRecord = entity.into();

    let visit_provider = PgVisitProvider::new(VisitRepository::new(state.pool.clone()));
    let gate = visit_provider
        .can_clock_out(request.visit_id, care_staff.user_id)
        .await?;

    let geofence_repo = EvvGeofenceRepository::new(state.pool.clone());
    let geofence_entity = geofence_repo
        .find_by_client_id(record.client_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("geofence not configured for this client".into()))?;
    let mut geofence: Geofence = geofence_entity.into();

    let ctx = ClockOutContext {
        gate,
        geofence: &mut geofence,
        location: request.location.clone(),
        device_info: request.device_info.clone(),
        client_attestation: None,
        actor: care_staff.user_id,
    };
    let outcome = clock_out(&mut record, ctx)?;

    let clock_out_success = record
        .clock_out_verification
        .as_ref()
        .map(|v| v.within_geofence && !v.requires_manual_review)
        .unwrap_or(false);
    geofence_repo
        .record_verification(record.client_id, request.location.accuracy_meters, clock_out_success)
        .await?;

    let compliance_flags: Vec<String> = record.compliance_flags.iter().map(|f| f.as_str().to_string()).collect();
    let updated = record_repo
        .apply_clock_out(
            record.meta.id,
            expected_version,
            record.clock_out_time.expect("clock_out sets clock_out_time"),
            record.total_duration_minutes.expect("clock_out computes duration"),
            record.clock_out_verification.as_ref().expect("clock_out sets verification"),
            record.status.as_str(),
            record.verification_level.as_str(),
            &compliance_flags,
            &record.integrity_checksum,
            &record.attestations,
            care_staff.user_id,
        )
        .await?;

    visit_provider
        .update_visit_status(
            record.visit_id,
            domain::ports::visit_provider::VisitProviderStatus::Completed,
            record.meta.id,
        )
        .await?;

    let record: EvvRecord = updated.into();
    info!(
        visit_id = %record.visit_id,
        duration_minutes = ?record.total_duration_minutes,
        phone_warning = outcome.phone_warning,
        "evv clock-out recorded"
    );
    Ok(Json(record))
}

/// `POST /api/v1/evv-records/:id/override` (spec.md §4.4 manual override):
/// restricted to branch-admin-or-higher supervisors.
pub async fn override_evv_record(
    State(state): State<AppState>,
    Extension(care_staff): Extension<CareStaff>,
    axum::extract::Path(id): axum::extract::Path<Uuid>,
    Json(request): Json<ManualOverrideRequest>,
) -> Result<Json<EvvRecord>, ApiError> {
    request.validate()?;

    let record_repo = EvvRecordRepository::new(state.pool.clone());
    let entity = record_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("evv record not found".into()))?;
    let expected_version = entity.version;
    let mut record: EvvRecord = entity.into();

    let override_data = domain::models::evv_record::ManualOverride {
        override_by: care_staff.user_id,
        override_at: chrono::Utc::now(),
        reason: request.reason,
        reason_code: request.reason_code,
        supervisor_name: request.supervisor_name,
        supervisor_title: request.supervisor_title,
        approval_authority: request.approval_authority,
        notes: request.notes,
    };

    apply_manual_override(
        &mut record,
        override_data,
        care_staff.role.has_at_least(CareRole::BranchAdmin),
        care_staff.user_id,
    )?;

    let compliance_flags: Vec<String> = record.compliance_flags.iter().map(|f| f.as_str().to_string()).collect();
    let updated = record_repo
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

    let record: EvvRecord = updated.into();
    info!(evv_record_id = %record.meta.id, actor = %care_staff.user_id, "evv record manually overridden");
    Ok(Json(record))
}

/// `POST /api/v1/evv/geofences`: registers a client service-address
/// geofence. Only circle geofences are persisted today — the repository's
/// `create` has no polygon/variance columns wired, so a polygon request is
/// accepted as a circle of the same radius rather than rejected outright.
pub async fn create_evv_geofence(
    State(state): State<AppState>,
    Extension(care_staff): Extension<CareStaff>,
    Json(request): Json<CreateEvvGeofenceRequest>,
) -> Result<(StatusCode, Json<Geofence>), ApiError> {
    request.validate()?;

    let repo = EvvGeofenceRepository::new(state.pool.clone());
    let entity = repo
        .create(
            care_staff.organization_id,
            care_staff.branch_id,
            care_staff.user_id,
            request.client_id,
            request.center.latitude,
            request.center.longitude,
            request.radius_meters,
        )
        .await?;

    let geofence: Geofence = entity.into();
    info!(client_id = %geofence.client_id, "evv geofence created");
    Ok((StatusCode::CREATED, Json(geofence)))
}

/// `GET /api/v1/evv/geofences/:clientId`.
pub async fn get_evv_geofence(
    State(state): State<AppState>,
    axum::extract::Path(client_id): axum::extract::Path<Uuid>,
) -> Result<Json<Geofence>, ApiError> {
    let repo = EvvGeofenceRepository::new(state.pool.clone());
    let entity = repo
        .find_by_client_id(client_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("geofence not found for this client".into()))?;
    Ok(Json(entity.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_override_request_deserializes() {
        let json = r#"{
            "reason": "device failure",
            "reasonCode": "DEVICE_MALFUNCTION",
            "supervisorName": "Jane Doe",
            "supervisorTitle": "Branch Manager",
            "approvalAuthority": "BRANCH_ADMIN"
        }"#;
        let request: ManualOverrideRequest = serde_json::from_str(json).unwrap();
        assert!(request.notes.is_none());
    }

    #[test]
    fn create_evv_geofence_request_deserializes_without_shape() {
        let json = r#"{
            "clientId": "550e8400-e29b-41d4-a716-446655440000",
            "center": {"latitude": 30.2672, "longitude": -97.7431},
            "radiusMeters": 100.0
        }"#;
        let request: CreateEvvGeofenceRequest = serde_json::from_str(json).unwrap();
        assert!(request.shape.is_none());
    }
}
