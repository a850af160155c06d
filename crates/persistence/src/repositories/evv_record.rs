//! EVV record repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::EvvRecordEntity;
use crate::metrics::QueryTimer;
use domain::error::{DomainError, DomainResult};
use domain::models::evv_record::{Attestations, PayorSubmissionStatus};
use domain::models::location_verification::LocationVerification;

/// Repository for EVV-record-related database operations.
#[derive(Clone)]
pub struct EvvRecordRepository {
    pool: PgPool,
}

impl EvvRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        organization_id: Uuid,
        branch_id: Uuid,
        actor: Uuid,
        visit_id: Uuid,
        client_id: Uuid,
        caregiver_id: Uuid,
        service_type_code: &str,
        service_address_line1: &str,
        service_state: &str,
        geofence_radius_meters: f64,
        clock_in_time: DateTime<Utc>,
        clock_in_verification: &LocationVerification,
        verification_level: &str,
        compliance_flags: &[String],
        integrity_hash: &str,
        integrity_checksum: &str,
    ) -> Result<EvvRecordEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_evv_record");
        let result = sqlx::query_as::<_, EvvRecordEntity>(
            r#"
            INSERT INTO evv_records (
                organization_id, branch_id, version, created_by, updated_by,
                visit_id, client_id, caregiver_id, service_type_code,
                service_address_line1, service_state, geofence_radius_meters,
                clock_in_time, clock_in_verification, mid_visit_checks, pause_events,
                exception_events, status, verification_level, compliance_flags,
                integrity_hash, integrity_checksum, attestations, payor_submission
            )
            VALUES (
                $1, $2, 1, $3, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                '[]'::jsonb, '[]'::jsonb, '[]'::jsonb, 'PENDING', $13, $14, $15, $16,
                '{}'::jsonb, '{}'::jsonb
            )
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(branch_id)
        .bind(actor)
        .bind(visit_id)
        .bind(client_id)
        .bind(caregiver_id)
        .bind(service_type_code)
        .bind(service_address_line1)
        .bind(service_state)
        .bind(geofence_radius_meters)
        .bind(clock_in_time)
        .bind(Json(clock_in_verification))
        .bind(verification_level)
        .bind(compliance_flags)
        .bind(integrity_hash)
        .bind(integrity_checksum)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<EvvRecordEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_evv_record_by_id");
        let result = sqlx::query_as::<_, EvvRecordEntity>(
            "SELECT * FROM evv_records WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_visit_id(
        &self,
        visit_id: Uuid,
    ) -> Result<Option<EvvRecordEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_evv_record_by_visit_id");
        let result = sqlx::query_as::<_, EvvRecordEntity>(
            "SELECT * FROM evv_records WHERE visit_id = $1 AND deleted_at IS NULL",
        )
        .bind(visit_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn apply_clock_out(
        &self,
        id: Uuid,
        expected_version: i64,
        clock_out_time: DateTime<Utc>,
        total_duration_minutes: i64,
        clock_out_verification: &LocationVerification,
        status: &str,
        verification_level: &str,
        compliance_flags: &[String],
        integrity_checksum: &str,
        attestations: &Attestations,
        actor: Uuid,
    ) -> DomainResult<EvvRecordEntity> {
        let timer = QueryTimer::new("apply_evv_clock_out");
        let result = sqlx::query_as::<_, EvvRecordEntity>(
            r#"
            UPDATE evv_records SET
                clock_out_time = $3,
                total_duration_minutes = $4,
                clock_out_verification = $5,
                status = $6,
                verification_level = $7,
                compliance_flags = $8,
                integrity_checksum = $9,
                attestations = $10,
                version = version + 1,
                updated_at = NOW(),
                updated_by = $11
            WHERE id = $1 AND version = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected_version)
        .bind(clock_out_time)
        .bind(total_duration_minutes)
        .bind(Json(clock_out_verification))
        .bind(status)
        .bind(verification_level)
        .bind(compliance_flags)
        .bind(integrity_checksum)
        .bind(Json(attestations))
        .bind(actor)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::transport(e.to_string()))?;
        timer.record();
        result.ok_or_else(|| {
            DomainError::conflict("EVV record was modified concurrently; reload and retry")
        })
    }

    pub async fn mark_submitted(
        &self,
        id: Uuid,
        payor_submission: &PayorSubmissionStatus,
    ) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("mark_evv_record_submitted");
        let result = sqlx::query(
            "UPDATE evv_records SET payor_submission = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(Json(payor_submission))
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected())
    }

    /// Rows completed but not yet handed to `build_submission` (spec.md §4.5).
    pub async fn find_pending_submission(&self) -> Result<Vec<EvvRecordEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_evv_records_pending_submission");
        let result = sqlx::query_as::<_, EvvRecordEntity>(
            r#"
            SELECT * FROM evv_records
            WHERE status = 'COMPLETE'
              AND (payor_submission->>'submittedToAggregator')::boolean IS NOT TRUE
              AND deleted_at IS NULL
            ORDER BY clock_in_time
            "#,
        )
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_repository_creation() {
        // Actual database tests are integration tests.
    }
}
