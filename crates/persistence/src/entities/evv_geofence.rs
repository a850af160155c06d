//! Client geofence entity (database row mapping) for the EVV verification engine.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::common::EntityMeta;
use domain::models::geofence::{GeoPoint, Geofence, GeofenceShape, GeofenceStats, GeofenceStatus};

/// Database row mapping for the `client_geofences` table.
#[derive(Debug, Clone, FromRow)]
pub struct EvvGeofenceEntity {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub branch_id: Uuid,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub updated_by: Uuid,
    pub deleted_at: Option<DateTime<Utc>>,
    pub client_id: Uuid,
    pub center_latitude: f64,
    pub center_longitude: f64,
    pub radius_meters: f64,
    pub shape: String,
    pub polygon_vertices: Option<sqlx::types::Json<Vec<GeoPoint>>>,
    pub allowed_variance_meters: f64,
    pub verification_count: i64,
    pub successful_count: i64,
    pub failed_count: i64,
    pub average_accuracy_meters: f64,
    pub status: String,
}

fn parse_shape(s: &str) -> GeofenceShape {
    match s {
        "POLYGON" => GeofenceShape::Polygon,
        _ => GeofenceShape::Circle,
    }
}

fn parse_status(s: &str) -> GeofenceStatus {
    match s {
        "INACTIVE" => GeofenceStatus::Inactive,
        "CALIBRATING" => GeofenceStatus::Calibrating,
        _ => GeofenceStatus::Active,
    }
}

impl From<EvvGeofenceEntity> for Geofence {
    fn from(e: EvvGeofenceEntity) -> Self {
        Self {
            meta: EntityMeta {
                id: e.id,
                organization_id: e.organization_id,
                branch_id: e.branch_id,
                version: e.version,
                created_at: e.created_at,
                updated_at: e.updated_at,
                created_by: e.created_by,
                updated_by: e.updated_by,
                deleted_at: e.deleted_at,
            },
            client_id: e.client_id,
            center: GeoPoint {
                latitude: e.center_latitude,
                longitude: e.center_longitude,
            },
            radius_meters: e.radius_meters,
            shape: parse_shape(&e.shape),
            polygon_vertices: e.polygon_vertices.map(|j| j.0),
            allowed_variance_meters: e.allowed_variance_meters,
            stats: GeofenceStats {
                verification_count: e.verification_count as u64,
                successful_count: e.successful_count as u64,
                failed_count: e.failed_count as u64,
                average_accuracy_meters: e.average_accuracy_meters,
            },
            status: parse_status(&e.status),
            created_at: e.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_shape_and_status_from_db_strings() {
        assert_eq!(parse_shape("POLYGON"), GeofenceShape::Polygon);
        assert_eq!(parse_shape("CIRCLE"), GeofenceShape::Circle);
        assert_eq!(parse_status("CALIBRATING"), GeofenceStatus::Calibrating);
    }
}
