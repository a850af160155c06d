//! Client geofence repository for database operations (EVV verification engine).

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::EvvGeofenceEntity;
use crate::metrics::QueryTimer;

/// Repository for client-geofence database operations.
#[derive(Clone)]
pub struct EvvGeofenceRepository {
    pool: PgPool,
}

impl EvvGeofenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        organization_id: Uuid,
        branch_id: Uuid,
        actor: Uuid,
        client_id: Uuid,
        center_latitude: f64,
        center_longitude: f64,
        radius_meters: f64,
    ) -> Result<EvvGeofenceEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_client_geofence");
        let result = sqlx::query_as::<_, EvvGeofenceEntity>(
            r#"
            INSERT INTO client_geofences (
                organization_id, branch_id, version, created_by, updated_by,
                client_id, center_latitude, center_longitude, radius_meters,
                shape, allowed_variance_meters, verification_count, successful_count,
                failed_count, average_accuracy_meters, status
            )
            VALUES ($1, $2, 1, $3, $3, $4, $5, $6, $7, 'CIRCLE', 0, 0, 0, 0, 0, 'ACTIVE')
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(branch_id)
        .bind(actor)
        .bind(client_id)
        .bind(center_latitude)
        .bind(center_longitude)
        .bind(radius_meters)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_client_id(
        &self,
        client_id: Uuid,
    ) -> Result<Option<EvvGeofenceEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_client_geofence_by_client");
        let result = sqlx::query_as::<_, EvvGeofenceEntity>(
            "SELECT * FROM client_geofences WHERE client_id = $1 AND deleted_at IS NULL AND status = 'ACTIVE'",
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Atomically folds a new verification outcome into the running average
    /// (spec.md §5 shared-resources note), mirroring `GeofenceStats::record`.
    /// Geofences whose running-average accuracy looks anomalous: worse than
    /// `threshold_meters` over at least `min_samples` verifications. Used by
    /// the periodic consistency sweep, not the hot clock-in/out path.
    pub async fn list_anomalous(
        &self,
        threshold_meters: f64,
        min_samples: i64,
    ) -> Result<Vec<EvvGeofenceEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_anomalous_client_geofences");
        let result = sqlx::query_as::<_, EvvGeofenceEntity>(
            r#"
            SELECT * FROM client_geofences
            WHERE status = 'ACTIVE'
              AND deleted_at IS NULL
              AND verification_count >= $2
              AND average_accuracy_meters > $1
            "#,
        )
        .bind(threshold_meters)
        .bind(min_samples)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn record_verification(
        &self,
        client_id: Uuid,
        accuracy_meters: f64,
        success: bool,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("record_client_geofence_verification");
        let result = sqlx::query(
            r#"
            UPDATE client_geofences SET
                average_accuracy_meters =
                    (average_accuracy_meters * verification_count + $2) / (verification_count + 1),
                verification_count = verification_count + 1,
                successful_count = successful_count + (CASE WHEN $3 THEN 1 ELSE 0 END),
                failed_count = failed_count + (CASE WHEN $3 THEN 0 ELSE 1 END),
                updated_at = NOW()
            WHERE client_id = $1
            "#,
        )
        .bind(client_id)
        .bind(accuracy_meters)
        .bind(success)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|_| ())
    }
}
