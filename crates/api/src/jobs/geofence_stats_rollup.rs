//! Geofence accuracy consistency sweep, paired with the hot-path running
//! average maintained by `EvvGeofenceRepository::record_verification`.

use sqlx::PgPool;
use tracing::warn;

use persistence::repositories::EvvGeofenceRepository;

use super::scheduler::{Job, JobFrequency};

/// Worse than both TX and FL's clock-in accuracy thresholds (100m/150m) is
/// never compliant, so a geofence averaging above this is worth a look.
const ANOMALOUS_ACCURACY_METERS: f64 = 150.0;
const MIN_SAMPLES: i64 = 5;

/// Logs every active geofence whose running-average accuracy has drifted
/// past [`ANOMALOUS_ACCURACY_METERS`] — most likely a client address with
/// a bad lat/lon or a radius set far too small for the location.
pub struct GeofenceStatsRollupJob {
    pool: PgPool,
}

impl GeofenceStatsRollupJob {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Job for GeofenceStatsRollupJob {
    fn name(&self) -> &'static str {
        "geofence_stats_rollup"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Hourly
    }

    async fn execute(&self) -> Result<(), String> {
        let repo = EvvGeofenceRepository::new(self.pool.clone());
        let anomalous = repo
            .list_anomalous(ANOMALOUS_ACCURACY_METERS, MIN_SAMPLES)
            .await
            .map_err(|e| format!("failed to list anomalous geofences: {e}"))?;

        for geofence in &anomalous {
            warn!(
                client_id = %geofence.client_id,
                average_accuracy_meters = geofence.average_accuracy_meters,
                verification_count = geofence.verification_count,
                "geofence accuracy running average exceeds threshold"
            );
        }

        Ok(())
    }
}
