//! Visit repository for database operations.

use chrono::NaiveDate;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::VisitEntity;
use crate::metrics::QueryTimer;
use domain::error::{DomainError, DomainResult};
use domain::models::visit::{AssignmentMeta, ServiceAddress, SortOrder, VisitSortField};

/// Repository for visit-related database operations.
#[derive(Clone)]
pub struct VisitRepository {
    pool: PgPool,
}

impl VisitRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        organization_id: Uuid,
        branch_id: Uuid,
        actor: Uuid,
        pattern_id: Option<Uuid>,
        client_id: Uuid,
        visit_number: &str,
        visit_type: &str,
        service_date: NaiveDate,
        scheduled_start_time: &str,
        scheduled_end_time: &str,
        scheduled_duration_minutes: i32,
        timezone: &str,
        service_address: &ServiceAddress,
        service_type_code: &str,
    ) -> Result<VisitEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_visit");
        let result = sqlx::query_as::<_, VisitEntity>(
            r#"
            INSERT INTO visits (
                organization_id, branch_id, version, created_by, updated_by,
                pattern_id, client_id, visit_number, visit_type, service_date,
                scheduled_start_time, scheduled_end_time, scheduled_duration_minutes,
                timezone, service_address, required_skills, required_certifications,
                service_type_code, status, flags, status_history, billing_status
            )
            VALUES (
                $1, $2, 1, $3, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                '{}', '{}', $14, 'DRAFT', '{}'::jsonb, '[]'::jsonb, 'UNBILLED'
            )
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(branch_id)
        .bind(actor)
        .bind(pattern_id)
        .bind(client_id)
        .bind(visit_number)
        .bind(visit_type)
        .bind(service_date)
        .bind(scheduled_start_time)
        .bind(scheduled_end_time)
        .bind(scheduled_duration_minutes)
        .bind(timezone)
        .bind(Json(service_address))
        .bind(service_type_code)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<VisitEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_visit_by_id");
        let result = sqlx::query_as::<_, VisitEntity>(
            "SELECT * FROM visits WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Candidate set for overlap checking (spec.md §4.2): every non-terminal
    /// visit for the same client on the same service date. The final
    /// interval-overlap test still runs in `lifecycle_manager::check_create_conflict`.
    pub async fn find_same_day_non_terminal(
        &self,
        client_id: Uuid,
        service_date: NaiveDate,
    ) -> Result<Vec<VisitEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_visits_same_day_non_terminal");
        let result = sqlx::query_as::<_, VisitEntity>(
            r#"
            SELECT * FROM visits
            WHERE client_id = $1 AND service_date = $2 AND deleted_at IS NULL
              AND status NOT IN ('COMPLETED', 'INCOMPLETE', 'CANCELLED', 'NO_SHOW_CLIENT')
            "#,
        )
        .bind(client_id)
        .bind(service_date)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_for_caregiver_on_date(
        &self,
        caregiver_id: Uuid,
        service_date: NaiveDate,
    ) -> Result<Vec<VisitEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_visits_for_caregiver_on_date");
        let result = sqlx::query_as::<_, VisitEntity>(
            r#"
            SELECT * FROM visits
            WHERE caregiver_id = $1 AND service_date = $2 AND deleted_at IS NULL
              AND status NOT IN ('CANCELLED', 'REJECTED')
            ORDER BY scheduled_start_time
            "#,
        )
        .bind(caregiver_id)
        .bind(service_date)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn assign_caregiver(
        &self,
        id: Uuid,
        expected_version: i64,
        caregiver_id: Uuid,
        status: &str,
        assignment: &AssignmentMeta,
        actor: Uuid,
    ) -> DomainResult<VisitEntity> {
        let timer = QueryTimer::new("assign_caregiver_to_visit");
        let result = sqlx::query_as::<_, VisitEntity>(
            r#"
            UPDATE visits SET
                caregiver_id = $3,
                status = $4,
                assignment = $5,
                version = version + 1,
                updated_at = NOW(),
                updated_by = $6
            WHERE id = $1 AND version = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected_version)
        .bind(caregiver_id)
        .bind(status)
        .bind(Json(assignment))
        .bind(actor)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::transport(e.to_string()))?;
        timer.record();
        result.ok_or_else(|| {
            DomainError::conflict("visit was modified concurrently; reload and retry")
        })
    }

    /// Paged, filtered, whitelist-sorted visit search scoped to an
    /// organization (spec.md §4.6 `visits` search).
    #[allow(clippy::too_many_arguments)]
    pub async fn search(
        &self,
        organization_id: Uuid,
        client_id: Option<Uuid>,
        caregiver_id: Option<Uuid>,
        status: Option<&str>,
        service_date_from: Option<NaiveDate>,
        service_date_to: Option<NaiveDate>,
        sort_field: VisitSortField,
        sort_order: SortOrder,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<VisitEntity>, sqlx::Error> {
        let timer = QueryTimer::new("search_visits");
        let mut query = String::from(
            "SELECT * FROM visits WHERE organization_id = $1 AND deleted_at IS NULL",
        );

        let mut param_idx = 2;
        if client_id.is_some() {
            query.push_str(&format!(" AND client_id = ${param_idx}"));
            param_idx += 1;
        }
        if caregiver_id.is_some() {
            query.push_str(&format!(" AND caregiver_id = ${param_idx}"));
            param_idx += 1;
        }
        if status.is_some() {
            query.push_str(&format!(" AND status = ${param_idx}"));
            param_idx += 1;
        }
        if service_date_from.is_some() {
            query.push_str(&format!(" AND service_date >= ${param_idx}"));
            param_idx += 1;
        }
        if service_date_to.is_some() {
            query.push_str(&format!(" AND service_date <= ${param_idx}"));
            param_idx += 1;
        }

        query.push_str(&format!(
            " ORDER BY {} {} NULLS LAST",
            sort_field.as_str(),
            sort_order.as_str()
        ));
        query.push_str(&format!(" LIMIT ${param_idx} OFFSET ${}", param_idx + 1));

        let mut q = sqlx::query_as::<_, VisitEntity>(&query).bind(organization_id);
        if let Some(client_id) = client_id {
            q = q.bind(client_id);
        }
        if let Some(caregiver_id) = caregiver_id {
            q = q.bind(caregiver_id);
        }
        if let Some(status) = status {
            q = q.bind(status);
        }
        if let Some(from) = service_date_from {
            q = q.bind(from);
        }
        if let Some(to) = service_date_to {
            q = q.bind(to);
        }
        q = q.bind(limit as i32).bind(offset as i32);

        let result = q.fetch_all(&self.pool).await;
        timer.record();
        result
    }

    /// Total row count matching the same filter set as `search`, for
    /// pagination totals.
    #[allow(clippy::too_many_arguments)]
    pub async fn count_search(
        &self,
        organization_id: Uuid,
        client_id: Option<Uuid>,
        caregiver_id: Option<Uuid>,
        status: Option<&str>,
        service_date_from: Option<NaiveDate>,
        service_date_to: Option<NaiveDate>,
    ) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_search_visits");
        let mut query = String::from(
            "SELECT COUNT(*) FROM visits WHERE organization_id = $1 AND deleted_at IS NULL",
        );

        let mut param_idx = 2;
        if client_id.is_some() {
            query.push_str(&format!(" AND client_id = ${param_idx}"));
            param_idx += 1;
        }
        if caregiver_id.is_some() {
            query.push_str(&format!(" AND caregiver_id = ${param_idx}"));
            param_idx += 1;
        }
        if status.is_some() {
            query.push_str(&format!(" AND status = ${param_idx}"));
            param_idx += 1;
        }
        if service_date_from.is_some() {
            query.push_str(&format!(" AND service_date >= ${param_idx}"));
            param_idx += 1;
        }
        if service_date_to.is_some() {
            query.push_str(&format!(" AND service_date <= ${param_idx}"));
        }

        let mut q = sqlx::query_scalar::<_, i64>(&query).bind(organization_id);
        if let Some(client_id) = client_id {
            q = q.bind(client_id);
        }
        if let Some(caregiver_id) = caregiver_id {
            q = q.bind(caregiver_id);
        }
        if let Some(status) = status {
            q = q.bind(status);
        }
        if let Some(from) = service_date_from {
            q = q.bind(from);
        }
        if let Some(to) = service_date_to {
            q = q.bind(to);
        }

        let result = q.fetch_one(&self.pool).await;
        timer.record();
        result
    }

    /// `GET /visits/unassigned`: visits past the UNASSIGNED gate with no
    /// caregiver, for the dispatch queue.
    pub async fn find_unassigned(
        &self,
        organization_id: Uuid,
        branch_id: Option<Uuid>,
    ) -> Result<Vec<VisitEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_unassigned_visits");
        let result = if let Some(branch_id) = branch_id {
            sqlx::query_as::<_, VisitEntity>(
                r#"
                SELECT * FROM visits
                WHERE organization_id = $1 AND branch_id = $2 AND caregiver_id IS NULL
                  AND deleted_at IS NULL AND status NOT IN ('CANCELLED', 'COMPLETED', 'INCOMPLETE', 'NO_SHOW_CLIENT')
                ORDER BY service_date, scheduled_start_time
                "#,
            )
            .bind(organization_id)
            .bind(branch_id)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, VisitEntity>(
                r#"
                SELECT * FROM visits
                WHERE organization_id = $1 AND caregiver_id IS NULL
                  AND deleted_at IS NULL AND status NOT IN ('CANCELLED', 'COMPLETED', 'INCOMPLETE', 'NO_SHOW_CLIENT')
                ORDER BY service_date, scheduled_start_time
                "#,
            )
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await
        };
        timer.record();
        result
    }

    pub async fn update_status(
        &self,
        id: Uuid,
        expected_version: i64,
        status: &str,
        status_history: &serde_json::Value,
        actor: Uuid,
    ) -> DomainResult<VisitEntity> {
        let timer = QueryTimer::new("update_visit_status");
        let result = sqlx::query_as::<_, VisitEntity>(
            r#"
            UPDATE visits SET
                status = $3,
                status_history = $4,
                version = version + 1,
                updated_at = NOW(),
                updated_by = $5
            WHERE id = $1 AND version = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected_version)
        .bind(status)
        .bind(status_history)
        .bind(actor)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::transport(e.to_string()))?;
        timer.record();
        result.ok_or_else(|| {
            DomainError::conflict("visit was modified concurrently; reload and retry")
        })
    }
}
