//! Geofence aggregate used by the EVV verification engine (spec.md §3, §4.4).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::common::EntityMeta;
use crate::error::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GeofenceShape {
    Circle,
    Polygon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GeofenceStatus {
    Active,
    Inactive,
    Calibrating,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceStats {
    pub verification_count: u64,
    pub successful_count: u64,
    pub failed_count: u64,
    pub average_accuracy_meters: f64,
}

impl GeofenceStats {
    /// Atomically folds in one more verification outcome: `avg = (avg*n +
    /// new) / (n+1)` (spec.md §5 shared-resources note).
    pub fn record(&mut self, accuracy_meters: f64, success: bool) {
        let n = self.verification_count as f64;
        self.average_accuracy_meters = (self.average_accuracy_meters * n + accuracy_meters) / (n + 1.0);
        self.verification_count += 1;
        if success {
            self.successful_count += 1;
        } else {
            self.failed_count += 1;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geofence {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub client_id: Uuid,
    pub center: GeoPoint,
    /// Meters, default 100.
    pub radius_meters: f64,
    pub shape: GeofenceShape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polygon_vertices: Option<Vec<GeoPoint>>,
    /// Meters, added to `radius_meters` for this geofence only.
    pub allowed_variance_meters: f64,
    pub stats: GeofenceStats,
    pub status: GeofenceStatus,
    pub created_at: DateTime<Utc>,
}

impl Geofence {
    pub fn new(
        client_id: Uuid,
        organization_id: Uuid,
        branch_id: Uuid,
        actor: Uuid,
        center: GeoPoint,
        radius_meters: f64,
    ) -> Self {
        let meta = EntityMeta::new(organization_id, branch_id, actor);
        Self {
            created_at: meta.created_at,
            meta,
            client_id,
            center,
            radius_meters,
            shape: GeofenceShape::Circle,
            polygon_vertices: None,
            allowed_variance_meters: 0.0,
            stats: GeofenceStats::default(),
            status: GeofenceStatus::Active,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.shape == GeofenceShape::Polygon
            && self
                .polygon_vertices
                .as_ref()
                .map(|v| v.len() < 3)
                .unwrap_or(true)
        {
            return Err(DomainError::validation(
                "POLYGON geofences require at least 3 vertices",
            ));
        }
        if self.radius_meters <= 0.0 {
            return Err(DomainError::validation("radius must be positive"));
        }
        Ok(())
    }
}

/// `POST /evv/geofences` request body: registers the geofence for a
/// client's service address (spec.md §4.4). Distinct from the device
/// geofencing resource's own create request.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEvvGeofenceRequest {
    pub client_id: Uuid,
    pub center: GeoPoint,
    #[validate(range(min = 1.0))]
    pub radius_meters: f64,
    #[serde(default)]
    pub shape: Option<GeofenceShape>,
    #[serde(default)]
    pub polygon_vertices: Option<Vec<GeoPoint>>,
    #[serde(default)]
    pub allowed_variance_meters: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_running_average_tracks_accuracy() {
        let mut stats = GeofenceStats::default();
        stats.record(10.0, true);
        stats.record(20.0, true);
        assert_eq!(stats.verification_count, 2);
        assert_eq!(stats.successful_count, 2);
        assert_eq!(stats.failed_count, 0);
        assert!((stats.average_accuracy_meters - 15.0).abs() < 1e-9);
    }

    #[test]
    fn stats_tracks_failures_independently() {
        let mut stats = GeofenceStats::default();
        stats.record(5.0, false);
        assert_eq!(stats.failed_count, 1);
        assert_eq!(stats.successful_count, 0);
    }

    #[test]
    fn polygon_requires_three_vertices() {
        let mut fence = Geofence::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            GeoPoint {
                latitude: 30.2672,
                longitude: -97.7431,
            },
            100.0,
        );
        fence.shape = GeofenceShape::Polygon;
        fence.polygon_vertices = Some(vec![
            GeoPoint {
                latitude: 30.0,
                longitude: -97.0,
            },
            GeoPoint {
                latitude: 30.1,
                longitude: -97.1,
            },
        ]);
        assert!(fence.validate().is_err());

        fence.polygon_vertices.as_mut().unwrap().push(GeoPoint {
            latitude: 30.2,
            longitude: -97.2,
        });
        assert!(fence.validate().is_ok());
    }

    #[test]
    fn non_positive_radius_is_rejected() {
        let mut fence = Geofence::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            GeoPoint {
                latitude: 30.2672,
                longitude: -97.7431,
            },
            0.0,
        );
        fence.radius_meters = 0.0;
        assert!(fence.validate().is_err());
    }
}
