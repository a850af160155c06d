//! Service pattern repository for database operations.

use chrono::NaiveDate;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::ServicePatternEntity;
use crate::metrics::QueryTimer;
use domain::error::{DomainError, DomainResult};
use domain::models::recurrence::RecurrenceRule;

/// Repository for service-pattern-related database operations.
#[derive(Clone)]
pub struct ServicePatternRepository {
    pool: PgPool,
}

impl ServicePatternRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        organization_id: Uuid,
        branch_id: Uuid,
        actor: Uuid,
        pattern_type: &str,
        recurrence: &RecurrenceRule,
        service_type_code: &str,
        duration_minutes: i32,
        required_skills: &[String],
        required_certifications: &[String],
        preferred_caregiver_ids: &[Uuid],
        blocked_caregiver_ids: &[Uuid],
        client_id: Uuid,
        authorization_start_date: NaiveDate,
        authorization_end_date: NaiveDate,
        weekly_hour_cap: Option<i32>,
        weekly_visit_cap: Option<i32>,
        effective_from: NaiveDate,
        effective_to: Option<NaiveDate>,
    ) -> Result<ServicePatternEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_service_pattern");
        let result = sqlx::query_as::<_, ServicePatternEntity>(
            r#"
            INSERT INTO service_patterns (
                organization_id, branch_id, version, created_by, updated_by,
                pattern_type, recurrence, service_type_code, duration_minutes,
                required_skills, required_certifications, preferred_caregiver_ids,
                blocked_caregiver_ids, client_id, authorization_start_date,
                authorization_end_date, weekly_hour_cap, weekly_visit_cap,
                effective_from, effective_to, status
            )
            VALUES (
                $1, $2, 1, $3, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, $16, $17, $18, 'DRAFT'
            )
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(branch_id)
        .bind(actor)
        .bind(pattern_type)
        .bind(Json(recurrence))
        .bind(service_type_code)
        .bind(duration_minutes)
        .bind(required_skills)
        .bind(required_certifications)
        .bind(preferred_caregiver_ids)
        .bind(blocked_caregiver_ids)
        .bind(client_id)
        .bind(authorization_start_date)
        .bind(authorization_end_date)
        .bind(weekly_hour_cap)
        .bind(weekly_visit_cap)
        .bind(effective_from)
        .bind(effective_to)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ServicePatternEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_service_pattern_by_id");
        let result = sqlx::query_as::<_, ServicePatternEntity>(
            "SELECT * FROM service_patterns WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn list_active_for_client(
        &self,
        client_id: Uuid,
    ) -> Result<Vec<ServicePatternEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_active_service_patterns_for_client");
        let result = sqlx::query_as::<_, ServicePatternEntity>(
            r#"
            SELECT * FROM service_patterns
            WHERE client_id = $1 AND status = 'ACTIVE' AND deleted_at IS NULL
            ORDER BY effective_from
            "#,
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Conditional UPDATE keyed on the optimistic-concurrency version the
    /// caller last read. Returns `Conflict` if the row moved on.
    pub async fn update_status(
        &self,
        id: Uuid,
        expected_version: i64,
        status: &str,
        actor: Uuid,
    ) -> DomainResult<ServicePatternEntity> {
        let timer = QueryTimer::new("update_service_pattern_status");
        let result = sqlx::query_as::<_, ServicePatternEntity>(
            r#"
            UPDATE service_patterns SET
                status = $3,
                version = version + 1,
                updated_at = NOW(),
                updated_by = $4
            WHERE id = $1 AND version = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected_version)
        .bind(status)
        .bind(actor)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::transport(e.to_string()))?;
        timer.record();
        result.ok_or_else(|| {
            DomainError::conflict("service pattern was modified concurrently; reload and retry")
        })
    }

    pub async fn soft_delete(&self, id: Uuid, actor: Uuid) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("soft_delete_service_pattern");
        let result = sqlx::query(
            r#"
            UPDATE service_patterns
            SET deleted_at = NOW(), updated_at = NOW(), updated_by = $2, version = version + 1
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(actor)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected())
    }
}
