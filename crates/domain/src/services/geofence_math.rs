//! Geofence distance and tolerance math (spec.md §4.4).

use crate::models::compliance::{ComplianceFlag, IssueSeverity, VerificationIssue};
use crate::models::geofence::{GeoPoint, Geofence};
use crate::models::location_verification::LocationEvent;

/// Mean Earth radius in meters, per spec.md §4.4.
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance between two points via the haversine formula.
pub fn haversine_distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().asin();
    EARTH_RADIUS_METERS * c
}

#[derive(Debug, Clone, Copy)]
pub struct GeofenceCheckResult {
    pub distance_from_address_meters: f64,
    pub effective_radius_meters: f64,
    pub within_geofence: bool,
    pub requires_manual_review: bool,
}

/// `effectiveRadius = radius + allowedVariance + accuracy`;
/// `withinGeofence = distance <= effectiveRadius` (spec.md §4.4).
pub fn check_geofence(event: &LocationEvent, geofence: &Geofence) -> GeofenceCheckResult {
    let distance = haversine_distance_meters(event.point(), geofence.center);
    let effective_radius =
        geofence.radius_meters + geofence.allowed_variance_meters + event.accuracy_meters;
    let within = distance <= effective_radius;
    GeofenceCheckResult {
        distance_from_address_meters: distance,
        effective_radius_meters: effective_radius,
        within_geofence: within,
        requires_manual_review: !within,
    }
}

/// Folds a geofence-check outcome into the issue list used to derive
/// verification level (spec.md §4.4 state-specific rules table).
pub fn geofence_issue(check: &GeofenceCheckResult) -> Option<VerificationIssue> {
    if check.within_geofence {
        return None;
    }
    Some(VerificationIssue {
        flag: ComplianceFlag::GeofenceViolation,
        severity: IssueSeverity::High,
        message: format!(
            "location {:.1}m outside effective radius {:.1}m",
            check.distance_from_address_meters, check.effective_radius_meters
        ),
        requires_supervisor_review: true,
    })
}

/// Mock-location detection always adds LOCATION_SUSPICIOUS at CRITICAL
/// severity and fails verification outright (spec.md §4.4).
pub fn mock_location_issue(event: &LocationEvent) -> Option<VerificationIssue> {
    if !event.mock_location_detected {
        return None;
    }
    Some(VerificationIssue {
        flag: ComplianceFlag::LocationSuspicious,
        severity: IssueSeverity::Critical,
        message: "mock location detected".into(),
        requires_supervisor_review: true,
    })
}
