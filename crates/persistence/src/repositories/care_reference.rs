//! Repository for the thin client/caregiver/care-staff reference tables
//! the EVV/scheduling ports read from.

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{CaregiverAuthorizationEntity, CaregiverEntity, CareStaffEntity, ClientEntity};
use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct ClientRepository {
    pool: PgPool,
}

impl ClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ClientEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_client_by_id");
        let result = sqlx::query_as::<_, ClientEntity>("SELECT * FROM clients WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }
}

#[derive(Clone)]
pub struct CaregiverRepository {
    pool: PgPool,
}

impl CaregiverRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<CaregiverEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_caregiver_by_id");
        let result = sqlx::query_as::<_, CaregiverEntity>("SELECT * FROM caregivers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    pub async fn find_authorization(
        &self,
        caregiver_id: Uuid,
        client_id: Uuid,
        service_type_code: &str,
    ) -> Result<Option<CaregiverAuthorizationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_caregiver_authorization");
        let result = sqlx::query_as::<_, CaregiverAuthorizationEntity>(
            r#"
            SELECT * FROM caregiver_service_authorizations
            WHERE caregiver_id = $1 AND client_id = $2 AND service_type_code = $3
            "#,
        )
        .bind(caregiver_id)
        .bind(client_id)
        .bind(service_type_code)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }
}

#[derive(Clone)]
pub struct CareStaffRepository {
    pool: PgPool,
}

impl CareStaffRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Looks up the active role assignment for `user_id` within `organization_id`,
    /// used by the scheduling/EVV RBAC middleware (spec.md §4.6).
    pub async fn find_active_for_org(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<CareStaffEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_care_staff_for_org");
        let result = sqlx::query_as::<_, CareStaffEntity>(
            r#"
            SELECT * FROM care_staff
            WHERE user_id = $1 AND organization_id = $2 AND active = true
            "#,
        )
        .bind(user_id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Looks up the caller's most privileged active role assignment across
    /// every organization. Used by routes that are not organization-scoped
    /// in the URL (spec.md §4.6 scheduling/EVV surface); the returned row's
    /// `organization_id`/`branch_id` then scope the handler's own writes.
    pub async fn find_highest_active_role(
        &self,
        user_id: Uuid,
    ) -> Result<Option<CareStaffEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_highest_active_care_role");
        let result = sqlx::query_as::<_, CareStaffEntity>(
            r#"
            SELECT * FROM care_staff
            WHERE user_id = $1 AND active = true
            ORDER BY CASE role
                WHEN 'SUPER_ADMIN' THEN 5
                WHEN 'ORG_ADMIN' THEN 4
                WHEN 'BRANCH_ADMIN' THEN 3
                WHEN 'COORDINATOR' THEN 2
                ELSE 1
            END DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
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
