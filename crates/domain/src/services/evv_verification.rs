//! EVV Verification Engine (spec.md §4.4): clock-in/clock-out contracts,
//! state-specific compliance rules, and manual override.

use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::models::compliance::{ComplianceFlag, IssueSeverity, VerificationIssue, VerificationLevel};
use crate::models::evv_record::{Attestation, EvvRecord, EvvStatus, ManualOverride};
use crate::models::geofence::Geofence;
use crate::models::location_verification::{DeviceInfo, LocationEvent, LocationMethod, LocationVerification};
use crate::ports::address_provider::ClientAddress;
use crate::ports::caregiver_provider::ServiceAuthorization;
use crate::ports::visit_provider::{EvvVisitView, GateResult};
use crate::services::geofence_math::{check_geofence, geofence_issue, mock_location_issue};

/// State-specific compliance parameters (spec.md §4.4 table). `TX` and `FL`
/// are fully specified; other configured codes require dedicated rules and
/// are rejected rather than silently passed.
#[derive(Debug, Clone, Copy)]
pub struct StateRules {
    pub base_radius_meters: f64,
    pub max_state_tolerance_meters: f64,
    pub clock_in_grace_minutes: i64,
    pub allowed_methods: &'static [LocationMethod],
    pub phone_warns: bool,
    pub accuracy_threshold_meters: f64,
}

const TX_RULES: StateRules = StateRules {
    base_radius_meters: 100.0,
    max_state_tolerance_meters: 50.0,
    clock_in_grace_minutes: 10,
    allowed_methods: &[LocationMethod::Gps, LocationMethod::Biometric],
    phone_warns: false,
    accuracy_threshold_meters: 100.0,
};

const FL_RULES: StateRules = StateRules {
    base_radius_meters: 150.0,
    max_state_tolerance_meters: 100.0,
    clock_in_grace_minutes: 15,
    allowed_methods: &[LocationMethod::Gps, LocationMethod::Phone, LocationMethod::Biometric],
    phone_warns: true,
    accuracy_threshold_meters: 150.0,
};

/// Looks up the compliance rules for a service-address state code.
/// Unsupported codes — including the other configured-but-unspecified ones
/// named in the spec (OH, PA, GA, NC, AZ) — fail rather than silently pass.
pub fn state_rules(state_code: &str) -> DomainResult<StateRules> {
    match state_code {
        "TX" => Ok(TX_RULES),
        "FL" => Ok(FL_RULES),
        other => Err(DomainError::validation(format!(
            "unsupported state code for EVV verification: {other}"
        ))),
    }
}

/// `MANUAL` is never allowed by itself in either ruleset; method must be in
/// the state's allowed list.
pub fn validate_location_method(rules: &StateRules, method: LocationMethod) -> DomainResult<()> {
    if !rules.allowed_methods.contains(&method) {
        return Err(DomainError::validation(format!(
            "{method:?} is not an allowed verification method for this state"
        )));
    }
    Ok(())
}

/// True if this method/ruleset combination should surface a warning
/// (FL's telephony fallback) without failing verification.
pub fn is_phone_warning(rules: &StateRules, method: LocationMethod) -> bool {
    rules.phone_warns && method == LocationMethod::Phone
}

/// GPS accuracy worse than the state's threshold degrades verification
/// confidence; reported as a HIGH-severity issue under the geofence-violation
/// flag since the closed compliance-flag enumeration has no dedicated
/// low-accuracy flag.
pub fn accuracy_issue(rules: &StateRules, accuracy_meters: f64) -> Option<VerificationIssue> {
    if accuracy_meters <= rules.accuracy_threshold_meters {
        return None;
    }
    Some(VerificationIssue {
        flag: ComplianceFlag::GeofenceViolation,
        severity: IssueSeverity::High,
        message: format!(
            "GPS accuracy {accuracy_meters:.1}m exceeds the {:.1}m state threshold",
            rules.accuracy_threshold_meters
        ),
        requires_supervisor_review: true,
    })
}

fn verification_of(location: LocationEvent, geofence: &Geofence, device_info: Option<DeviceInfo>) -> LocationVerification {
    let check = check_geofence(&location, geofence);
    LocationVerification {
        event: location,
        within_geofence: check.within_geofence,
        distance_from_address_meters: check.distance_from_address_meters,
        effective_radius_meters: check.effective_radius_meters,
        requires_manual_review: check.requires_manual_review,
        device_info,
    }
}

fn collect_issues(location: &LocationEvent, geofence: &Geofence, rules: &StateRules) -> Vec<VerificationIssue> {
    let check = check_geofence(location, geofence);
    let mut issues = Vec::new();
    if let Some(issue) = geofence_issue(&check) {
        issues.push(issue);
    }
    if let Some(issue) = mock_location_issue(location) {
        issues.push(issue);
    }
    if let Some(issue) = accuracy_issue(rules, location.accuracy_meters) {
        issues.push(issue);
    }
    issues
}

fn flags_from_issues(issues: &[VerificationIssue]) -> Vec<ComplianceFlag> {
    if issues.is_empty() {
        return vec![ComplianceFlag::Compliant];
    }
    let mut flags: Vec<ComplianceFlag> = issues.iter().map(|i| i.flag).collect();
    flags.sort();
    flags.dedup();
    flags
}

/// Inputs to `clockIn`, already resolved by the caller per the ordered
/// preconditions (permission check, `canClockIn` gate, address lookup,
/// `canProvideService`, geofence lookup/auto-create — spec.md §4.4).
pub struct ClockInContext<'a> {
    pub visit: &'a EvvVisitView,
    pub gate: GateResult,
    pub authorization: &'a ServiceAuthorization,
    pub address: &'a ClientAddress,
    pub geofence: &'a mut Geofence,
    pub location: LocationEvent,
    pub device_info: Option<DeviceInfo>,
    pub actor: Uuid,
    pub organization_id: Uuid,
    pub branch_id: Uuid,
}

pub struct ClockInOutcome {
    pub record: EvvRecord,
    pub phone_warning: bool,
}

/// Runs the clock-in contract's verification and record-construction step.
/// The ordered precondition checks that require collaborator calls
/// (permission, `canClockIn`, `canProvideService`, address/geofence
/// resolution) are expected to have already run; this function enforces
/// the ones expressible as pure data checks and builds the resulting record.
pub fn clock_in(ctx: ClockInContext<'_>) -> DomainResult<ClockInOutcome> {
    if !ctx.gate.allowed {
        return Err(DomainError::validation(
            ctx.gate.reason.unwrap_or_else(|| "visit is not clock-in eligible".into()),
        ));
    }
    if ctx.visit.latitude.is_none() || ctx.visit.longitude.is_none() {
        return Err(DomainError::validation(
            "service address is missing latitude/longitude",
        ));
    }

    if !ctx.authorization.authorized {
        return Err(DomainError::permission(
            ctx.authorization
                .reason
                .clone()
                .unwrap_or_else(|| "caregiver is not authorized for this service".into()),
        ));
    }

    let rules = state_rules(&ctx.address.state)?;
    validate_location_method(&rules, ctx.location.method)?;
    let phone_warning = is_phone_warning(&rules, ctx.location.method);

    let issues = collect_issues(&ctx.location, ctx.geofence, &rules);
    let level = VerificationLevel::derive(&issues);
    let flags = flags_from_issues(&issues);

    let accuracy = ctx.location.accuracy_meters;
    let success = issues.is_empty();
    ctx.geofence.stats.record(accuracy, success);

    let clock_in_verification = verification_of(ctx.location.clone(), ctx.geofence, ctx.device_info.clone());

    let mut record = EvvRecord {
        meta: crate::models::common::EntityMeta::new(ctx.organization_id, ctx.branch_id, ctx.actor),
        visit_id: ctx.visit.visit_id,
        client_id: ctx.visit.client_id,
        caregiver_id: ctx.visit.caregiver_id.unwrap_or_default(),
        service_type_code: ctx.visit.service_type_code.clone(),
        service_address_line1: ctx.address.line1.clone(),
        service_state: ctx.address.state.clone(),
        geofence_radius_meters: ctx.geofence.radius_meters,
        clock_in_time: ctx.location.timestamp,
        clock_out_time: None,
        total_duration_minutes: None,
        clock_in_verification,
        clock_out_verification: None,
        mid_visit_checks: vec![],
        pause_events: vec![],
        exception_events: vec![],
        status: EvvStatus::Pending,
        verification_level: level,
        compliance_flags: flags,
        integrity_hash: String::new(),
        integrity_checksum: String::new(),
        attestations: crate::models::evv_record::Attestations {
            caregiver: None,
            client: None,
            supervisor: None,
        },
        manual_override: None,
        payor_submission: Default::default(),
        amendment_vmur_id: None,
    };

    // integrityHash covers only the core identifying + clock-in data captured
    // at creation (spec.md §4.4) and must never change afterward, unlike
    // integrityChecksum, which is recomputed over the full record on every
    // subsequent transition (clock-out, override, VMUR approval).
    let core_identity = serde_json::json!({
        "recordId": record.meta.id,
        "visitId": record.visit_id,
        "clientId": record.client_id,
        "caregiverId": record.caregiver_id,
        "clockInTime": record.clock_in_time,
        "clockInVerification": record.clock_in_verification,
    });
    record.integrity_hash = crate::services::integrity::integrity_digest(&core_identity, None);

    let full_value = serde_json::to_value(&record).expect("EvvRecord is serializable");
    record.integrity_checksum = crate::services::integrity::integrity_digest(&full_value, Some("integrityChecksum"));

    Ok(ClockInOutcome { record, phone_warning })
}

/// Clock-out context, mirroring `ClockInContext`.
pub struct ClockOutContext<'a> {
    pub gate: GateResult,
    pub geofence: &'a mut Geofence,
    pub location: LocationEvent,
    pub device_info: Option<DeviceInfo>,
    pub client_attestation: Option<Attestation>,
    pub actor: Uuid,
}

pub struct ClockOutOutcome {
    pub phone_warning: bool,
}

/// `clockOut`: record must already be PENDING. Repeats the geofence check,
/// computes duration, transitions to COMPLETE, and recomputes the integrity
/// checksum over the full record (spec.md §4.4).
pub fn clock_out(record: &mut EvvRecord, ctx: ClockOutContext<'_>) -> DomainResult<ClockOutOutcome> {
    if record.status != EvvStatus::Pending {
        return Err(DomainError::conflict("EVV record is not PENDING"));
    }
    if !ctx.gate.allowed {
        return Err(DomainError::validation(
            ctx.gate.reason.unwrap_or_else(|| "visit is not clock-out eligible".into()),
        ));
    }

    let rules = state_rules(&record.service_state)?;
    validate_location_method(&rules, ctx.location.method)?;
    let phone_warning = is_phone_warning(&rules, ctx.location.method);

    let issues = collect_issues(&ctx.location, ctx.geofence, &rules);
    let accuracy = ctx.location.accuracy_meters;
    ctx.geofence.stats.record(accuracy, issues.is_empty());

    let clock_out_verification = verification_of(ctx.location.clone(), ctx.geofence, ctx.device_info);
    record.clock_out_time = Some(ctx.location.timestamp);
    record.clock_out_verification = Some(clock_out_verification);
    record.validate_clock_times()?;
    record.total_duration_minutes = Some(record.compute_total_duration_minutes()?);

    let combined_level = VerificationLevel::derive(&issues);
    if combined_level > record.verification_level {
        record.verification_level = combined_level;
    }
    for issue in &issues {
        if !record.compliance_flags.contains(&issue.flag) {
            record.compliance_flags.push(issue.flag);
        }
    }
    if record.compliance_flags.len() > 1 {
        record.compliance_flags.retain(|f| *f != ComplianceFlag::Compliant);
    }

    if let Some(attestation) = ctx.client_attestation {
        record.attestations.client = Some(attestation);
    }

    record.transition(EvvStatus::Complete, ctx.actor)?;

    let value = serde_json::to_value(&*record).expect("EvvRecord is serializable");
    record.integrity_checksum = crate::services::integrity::integrity_digest(&value, Some("integrityChecksum"));

    Ok(ClockOutOutcome { phone_warning })
}

/// Applies a supervisor manual override (spec.md §4.4). Only supervisor
/// roles may call this; the role check itself is the caller's
/// responsibility (RBAC middleware), expressed here as `actor_is_supervisor`.
/// The closed EVV status enumeration has no dedicated `OVERRIDDEN` state, so
/// the override is recorded as metadata plus an appended `AMENDED` flag
/// without forcing a status transition.
pub fn apply_manual_override(
    record: &mut EvvRecord,
    override_data: ManualOverride,
    actor_is_supervisor: bool,
    actor: Uuid,
) -> DomainResult<()> {
    if !actor_is_supervisor {
        return Err(DomainError::permission(
            "manual override requires a supervisor role",
        ));
    }
    record.manual_override = Some(override_data);
    if !record.compliance_flags.contains(&ComplianceFlag::ManualOverride) {
        record.compliance_flags.push(ComplianceFlag::ManualOverride);
    }
    if !record.compliance_flags.contains(&ComplianceFlag::Amended) {
        record.compliance_flags.push(ComplianceFlag::Amended);
    }
    record.compliance_flags.retain(|f| *f != ComplianceFlag::Compliant);
    record.verification_level = VerificationLevel::Full;
    record.meta.touch(actor);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::geofence::{GeoPoint, GeofenceShape, GeofenceStats, GeofenceStatus};
    use chrono::Utc;

    fn sample_geofence() -> Geofence {
        Geofence {
            meta: crate::models::common::EntityMeta::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()),
            client_id: Uuid::new_v4(),
            center: GeoPoint {
                latitude: 30.2672,
                longitude: -97.7431,
            },
            radius_meters: 100.0,
            shape: GeofenceShape::Circle,
            polygon_vertices: None,
            allowed_variance_meters: 0.0,
            stats: GeofenceStats::default(),
            status: GeofenceStatus::Active,
            created_at: Utc::now(),
        }
    }

    fn sample_visit() -> EvvVisitView {
        EvvVisitView {
            visit_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            caregiver_id: Some(Uuid::new_v4()),
            service_date: chrono::Utc::now().date_naive(),
            status: "ASSIGNED".into(),
            service_type_code: "PCA".into(),
            latitude: Some(30.2672),
            longitude: Some(-97.7431),
            geofence_radius_meters: Some(100),
        }
    }

    fn sample_address() -> ClientAddress {
        ClientAddress {
            line1: "1 Main St".into(),
            line2: None,
            city: "Austin".into(),
            state: "TX".into(),
            postal_code: "78701".into(),
            latitude: 30.2672,
            longitude: -97.7431,
            geofence_radius_meters: Some(100),
        }
    }

    fn sample_location(method: LocationMethod, accuracy: f64) -> LocationEvent {
        LocationEvent {
            latitude: 30.2672,
            longitude: -97.7431,
            accuracy_meters: accuracy,
            timestamp: Utc::now(),
            method,
            mock_location_detected: false,
        }
    }

    #[test]
    fn tx_rejects_phone_method() {
        let rules = state_rules("TX").unwrap();
        assert!(validate_location_method(&rules, LocationMethod::Phone).is_err());
    }

    #[test]
    fn fl_allows_phone_with_warning() {
        let rules = state_rules("FL").unwrap();
        assert!(validate_location_method(&rules, LocationMethod::Phone).is_ok());
        assert!(is_phone_warning(&rules, LocationMethod::Phone));
    }

    #[test]
    fn unsupported_state_code_is_rejected() {
        assert!(state_rules("OH").is_err());
        assert!(state_rules("ZZ").is_err());
    }

    #[test]
    fn clock_in_within_geofence_is_full_and_compliant() {
        let mut geofence = sample_geofence();
        let visit = sample_visit();
        let address = sample_address();
        let ctx = ClockInContext {
            visit: &visit,
            gate: GateResult::allow(),
            authorization: &ServiceAuthorization::allow(),
            address: &address,
            geofence: &mut geofence,
            location: sample_location(LocationMethod::Gps, 15.0),
            device_info: None,
            actor: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
        };
        let outcome = clock_in(ctx).unwrap();
        assert_eq!(outcome.record.verification_level, VerificationLevel::Full);
        assert_eq!(outcome.record.compliance_flags, vec![ComplianceFlag::Compliant]);
        assert_eq!(outcome.record.status, EvvStatus::Pending);
        assert!(!outcome.record.integrity_hash.is_empty());
    }

    #[test]
    fn clock_in_denied_gate_fails() {
        let mut geofence = sample_geofence();
        let visit = sample_visit();
        let address = sample_address();
        let ctx = ClockInContext {
            visit: &visit,
            gate: GateResult::deny("visit not assigned to this caregiver"),
            authorization: &ServiceAuthorization::allow(),
            address: &address,
            geofence: &mut geofence,
            location: sample_location(LocationMethod::Gps, 15.0),
            device_info: None,
            actor: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
        };
        assert!(clock_in(ctx).is_err());
    }

    #[test]
    fn clock_in_unauthorized_caregiver_fails_with_permission() {
        let mut geofence = sample_geofence();
        let visit = sample_visit();
        let address = sample_address();
        let ctx = ClockInContext {
            visit: &visit,
            gate: GateResult::allow(),
            authorization: &ServiceAuthorization::deny("missing certification"),
            address: &address,
            geofence: &mut geofence,
            location: sample_location(LocationMethod::Gps, 15.0),
            device_info: None,
            actor: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
        };
        let err = clock_in(ctx).unwrap_err();
        assert!(matches!(err, DomainError::Permission(_)));
    }

    #[test]
    fn mock_location_forces_exception_level() {
        let mut geofence = sample_geofence();
        let visit = sample_visit();
        let address = sample_address();
        let mut location = sample_location(LocationMethod::Gps, 15.0);
        location.mock_location_detected = true;
        let ctx = ClockInContext {
            visit: &visit,
            gate: GateResult::allow(),
            authorization: &ServiceAuthorization::allow(),
            address: &address,
            geofence: &mut geofence,
            location,
            device_info: None,
            actor: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
        };
        let outcome = clock_in(ctx).unwrap();
        assert_eq!(outcome.record.verification_level, VerificationLevel::Exception);
    }

    #[test]
    fn clock_out_completes_record_and_computes_duration() {
        let mut geofence = sample_geofence();
        let visit = sample_visit();
        let address = sample_address();
        let ctx = ClockInContext {
            visit: &visit,
            gate: GateResult::allow(),
            authorization: &ServiceAuthorization::allow(),
            address: &address,
            geofence: &mut geofence,
            location: sample_location(LocationMethod::Gps, 15.0),
            device_info: None,
            actor: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
        };
        let mut record = clock_in(ctx).unwrap().record;

        let mut out_location = sample_location(LocationMethod::Gps, 15.0);
        out_location.timestamp = record.clock_in_time + chrono::Duration::minutes(45);
        let out_ctx = ClockOutContext {
            gate: GateResult::allow(),
            geofence: &mut geofence,
            location: out_location,
            device_info: None,
            client_attestation: None,
            actor: Uuid::new_v4(),
        };
        clock_out(&mut record, out_ctx).unwrap();
        assert_eq!(record.status, EvvStatus::Complete);
        assert_eq!(record.total_duration_minutes, Some(45));
    }

    #[test]
    fn integrity_hash_is_frozen_at_clock_in_while_checksum_evolves() {
        let mut geofence = sample_geofence();
        let visit = sample_visit();
        let address = sample_address();
        let ctx = ClockInContext {
            visit: &visit,
            gate: GateResult::allow(),
            authorization: &ServiceAuthorization::allow(),
            address: &address,
            geofence: &mut geofence,
            location: sample_location(LocationMethod::Gps, 15.0),
            device_info: None,
            actor: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
        };
        let mut record = clock_in(ctx).unwrap().record;
        let hash_at_clock_in = record.integrity_hash.clone();
        let checksum_at_clock_in = record.integrity_checksum.clone();
        assert_ne!(
            hash_at_clock_in, checksum_at_clock_in,
            "integrityHash must be the core-subset digest, not the full-record checksum"
        );

        let mut out_location = sample_location(LocationMethod::Gps, 15.0);
        out_location.timestamp = record.clock_in_time + chrono::Duration::minutes(45);
        let out_ctx = ClockOutContext {
            gate: GateResult::allow(),
            geofence: &mut geofence,
            location: out_location,
            device_info: None,
            client_attestation: None,
            actor: Uuid::new_v4(),
        };
        clock_out(&mut record, out_ctx).unwrap();

        assert_eq!(record.integrity_hash, hash_at_clock_in, "integrityHash does not change after creation");
        assert_ne!(record.integrity_checksum, checksum_at_clock_in, "integrityChecksum is recomputed on clock-out");
    }

    #[test]
    fn manual_override_requires_supervisor() {
        let mut geofence = sample_geofence();
        let visit = sample_visit();
        let address = sample_address();
        let ctx = ClockInContext {
            visit: &visit,
            gate: GateResult::allow(),
            authorization: &ServiceAuthorization::allow(),
            address: &address,
            geofence: &mut geofence,
            location: sample_location(LocationMethod::Gps, 15.0),
            device_info: None,
            actor: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
        };
        let mut record = clock_in(ctx).unwrap().record;
        let override_data = ManualOverride {
            override_by: Uuid::new_v4(),
            override_at: Utc::now(),
            reason: "device failure".into(),
            reason_code: "DEVICE_MALFUNCTION".into(),
            supervisor_name: "Jane Doe".into(),
            supervisor_title: "Branch Manager".into(),
            approval_authority: "BRANCH_ADMIN".into(),
            notes: None,
        };
        assert!(apply_manual_override(&mut record, override_data.clone(), false, Uuid::new_v4()).is_err());
        apply_manual_override(&mut record, override_data, true, Uuid::new_v4()).unwrap();
        assert!(record.compliance_flags.contains(&ComplianceFlag::Amended));
        assert!(record.compliance_flags.contains(&ComplianceFlag::ManualOverride));
    }
}
