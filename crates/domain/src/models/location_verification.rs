//! Location-verification value objects captured on clock-in/clock-out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::geofence::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LocationMethod {
    Gps,
    Phone,
    Biometric,
    Manual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub platform: String,
    pub os_version: String,
    pub app_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

/// Raw location event reported by a clock-in/clock-out call.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LocationEvent {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[validate(range(min = 0.0))]
    pub accuracy_meters: f64,
    pub timestamp: DateTime<Utc>,
    pub method: LocationMethod,
    #[serde(default)]
    pub mock_location_detected: bool,
}

impl LocationEvent {
    pub fn point(&self) -> GeoPoint {
        GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Outcome of a geofence check, stored alongside the EVV record
/// (spec.md §4.4 `clockInVerification`/`clockOutVerification`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationVerification {
    pub event: LocationEvent,
    pub within_geofence: bool,
    pub distance_from_address_meters: f64,
    pub effective_radius_meters: f64,
    pub requires_manual_review: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_info: Option<DeviceInfo>,
}
