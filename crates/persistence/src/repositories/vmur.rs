//! VMUR repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::VmurEntity;
use crate::metrics::QueryTimer;
use domain::models::vmur::VmurDataSnapshot;

/// Repository for Visit Maintenance Unlock Request database operations.
#[derive(Clone)]
pub struct VmurRepository {
    pool: PgPool,
}

impl VmurRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        evv_record_id: Uuid,
        requested_by: Uuid,
        requested_by_name: &str,
        reason_code: &str,
        reason_details: &str,
        original_data: &VmurDataSnapshot,
        corrected_data: &VmurDataSnapshot,
        changes_summary: &[String],
        expires_at: DateTime<Utc>,
    ) -> Result<VmurEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_vmur");
        let result = sqlx::query_as::<_, VmurEntity>(
            r#"
            INSERT INTO vmurs (
                id, evv_record_id, requested_by, requested_by_name, requested_at,
                reason_code, reason_details, approval_status, original_data,
                corrected_data, changes_summary, expires_at
            )
            VALUES (gen_random_uuid(), $1, $2, $3, NOW(), $4, $5, 'PENDING', $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(evv_record_id)
        .bind(requested_by)
        .bind(requested_by_name)
        .bind(reason_code)
        .bind(reason_details)
        .bind(Json(original_data))
        .bind(Json(corrected_data))
        .bind(changes_summary)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<VmurEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_vmur_by_id");
        let result = sqlx::query_as::<_, VmurEntity>("SELECT * FROM vmurs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    pub async fn find_pending_for_record(
        &self,
        evv_record_id: Uuid,
    ) -> Result<Vec<VmurEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_pending_vmurs_for_record");
        let result = sqlx::query_as::<_, VmurEntity>(
            "SELECT * FROM vmurs WHERE evv_record_id = $1 AND approval_status = 'PENDING'",
        )
        .bind(evv_record_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn apply_decision(
        &self,
        id: Uuid,
        approval_status: &str,
        approver: Uuid,
        denial_reason: Option<&str>,
    ) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("apply_vmur_decision");
        let result = sqlx::query(
            r#"
            UPDATE vmurs SET
                approval_status = $2,
                approver = $3,
                approved_at = NOW(),
                denial_reason = $4
            WHERE id = $1 AND approval_status = 'PENDING'
            "#,
        )
        .bind(id)
        .bind(approval_status)
        .bind(approver)
        .bind(denial_reason)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected())
    }

    /// Background sweep (spec.md §4.5 `expireOldVMURs`): flips every PENDING
    /// row past `expiresAt` to EXPIRED and returns how many were swept.
    pub async fn expire_due(&self, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("expire_due_vmurs");
        let result = sqlx::query(
            "UPDATE vmurs SET approval_status = 'EXPIRED' WHERE approval_status = 'PENDING' AND expires_at <= $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected())
    }
}
