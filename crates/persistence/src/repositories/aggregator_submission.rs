//! Aggregator submission repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::entities::AggregatorSubmissionEntity;
use crate::metrics::QueryTimer;
use domain::models::submission::{AggregatorType, SubmissionDashboardRow, SubmissionStatus};

/// Repository for aggregator-submission database operations.
#[derive(Clone)]
pub struct AggregatorSubmissionRepository {
    pool: PgPool,
}

impl AggregatorSubmissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        state_code: &str,
        evv_record_id: Uuid,
        aggregator_type: &str,
        payload: &serde_json::Value,
        submission_format: &str,
    ) -> Result<AggregatorSubmissionEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_aggregator_submission");
        let result = sqlx::query_as::<_, AggregatorSubmissionEntity>(
            r#"
            INSERT INTO aggregator_submissions (
                id, state_code, evv_record_id, aggregator_type, payload,
                submission_format, submitted_at, status, retry_count, max_retries
            )
            VALUES (gen_random_uuid(), $1, $2, $3, $4, $5, NOW(), 'PENDING', 0, 3)
            RETURNING *
            "#,
        )
        .bind(state_code)
        .bind(evv_record_id)
        .bind(aggregator_type)
        .bind(Json(payload))
        .bind(submission_format)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<AggregatorSubmissionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_aggregator_submission_by_id");
        let result =
            sqlx::query_as::<_, AggregatorSubmissionEntity>(
                "SELECT * FROM aggregator_submissions WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Locks and returns the RETRY rows due for a retry attempt right now.
    /// `FOR UPDATE SKIP LOCKED` lets multiple scheduler replicas run the
    /// sweep concurrently without double-processing a row.
    pub async fn lock_due_for_retry(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<AggregatorSubmissionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("lock_aggregator_submissions_due_for_retry");
        let result = sqlx::query_as::<_, AggregatorSubmissionEntity>(
            r#"
            SELECT * FROM aggregator_submissions
            WHERE status = 'RETRY' AND next_retry_at <= $1
            ORDER BY next_retry_at
            LIMIT $2
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn apply_result(
        &self,
        id: Uuid,
        status: &str,
        error_code: Option<&str>,
        error_message: Option<&str>,
        retry_count: i32,
        next_retry_at: Option<DateTime<Utc>>,
        confirmation_id: Option<&str>,
        aggregator_received_at: Option<DateTime<Utc>>,
    ) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("apply_aggregator_submission_result");
        let result = sqlx::query(
            r#"
            UPDATE aggregator_submissions SET
                status = $2,
                error_code = $3,
                error_message = $4,
                retry_count = $5,
                next_retry_at = $6,
                confirmation_id = $7,
                aggregator_received_at = $8
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(error_code)
        .bind(error_message)
        .bind(retry_count)
        .bind(next_retry_at)
        .bind(confirmation_id)
        .bind(aggregator_received_at)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected())
    }

    /// Submission counts grouped by aggregator/status for the ops dashboard
    /// (spec.md §4.5/§4.6), optionally narrowed by state code/aggregator.
    pub async fn dashboard_counts(
        &self,
        state_code: Option<&str>,
        aggregator_type: Option<&str>,
    ) -> Result<Vec<SubmissionDashboardRow>, sqlx::Error> {
        let timer = QueryTimer::new("aggregator_submission_dashboard_counts");
        let rows = sqlx::query(
            r#"
            SELECT aggregator_type, status, COUNT(*) as count
            FROM aggregator_submissions
            WHERE ($1::text IS NULL OR state_code = $1)
              AND ($2::text IS NULL OR aggregator_type = $2)
            GROUP BY aggregator_type, status
            ORDER BY aggregator_type, status
            "#,
        )
        .bind(state_code)
        .bind(aggregator_type)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        rows.map(|rows| {
            rows.into_iter()
                .map(|row| SubmissionDashboardRow {
                    aggregator_type: parse_aggregator_type(row.get::<String, _>("aggregator_type").as_str()),
                    status: parse_submission_status(row.get::<String, _>("status").as_str()),
                    count: row.get("count"),
                })
                .collect()
        })
    }
}

fn parse_aggregator_type(s: &str) -> AggregatorType {
    match s {
        "SANDATA" => AggregatorType::Sandata,
        "TELLUS" => AggregatorType::Tellus,
        _ => AggregatorType::HhAeXchange,
    }
}

fn parse_submission_status(s: &str) -> SubmissionStatus {
    match s {
        "ACCEPTED" => SubmissionStatus::Accepted,
        "REJECTED" => SubmissionStatus::Rejected,
        "RETRY" => SubmissionStatus::Retry,
        "IN_FLIGHT" => SubmissionStatus::InFlight,
        _ => SubmissionStatus::Pending,
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_repository_creation() {
        // Actual database tests are integration tests.
    }
}
