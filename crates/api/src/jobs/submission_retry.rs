//! Aggregator submission retry sweep (spec.md §4.5 `retryPendingSubmissions`).

use chrono::Utc;
use sqlx::PgPool;
use tracing::info;

use crate::config::AggregatorConfig;
use crate::services::aggregator_adapters::HttpAggregatorAdapter;
use domain::models::submission::{AggregatorSubmission, AggregatorType};
use domain::services::aggregator_submission::retry_submission;
use persistence::repositories::AggregatorSubmissionRepository;

use super::scheduler::{Job, JobFrequency};

/// Re-attempts every RETRY submission whose `nextRetryAt` is due, one
/// locked batch at a time (`FOR UPDATE SKIP LOCKED` lets scheduler
/// replicas run this concurrently without double-processing a row). A
/// failure on one row never stops the sweep.
pub struct SubmissionRetryJob {
    pool: PgPool,
    aggregators: AggregatorConfig,
    batch_size: i64,
}

impl SubmissionRetryJob {
    pub fn new(pool: PgPool, aggregators: AggregatorConfig, batch_size: i64) -> Self {
        Self {
            pool,
            aggregators,
            batch_size,
        }
    }

    fn adapter_for(&self, aggregator_type: AggregatorType) -> HttpAggregatorAdapter {
        match aggregator_type {
            AggregatorType::HhAeXchange => {
                HttpAggregatorAdapter::hhaexchange(self.aggregators.hhaexchange.clone())
            }
            AggregatorType::Sandata => HttpAggregatorAdapter::sandata(self.aggregators.sandata.clone()),
            AggregatorType::Tellus => HttpAggregatorAdapter::tellus(self.aggregators.tellus.clone()),
        }
    }
}

#[async_trait::async_trait]
impl Job for SubmissionRetryJob {
    fn name(&self) -> &'static str {
        "submission_retry"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Minutes(1)
    }

    async fn execute(&self) -> Result<(), String> {
        let repo = AggregatorSubmissionRepository::new(self.pool.clone());
        let due = repo
            .lock_due_for_retry(Utc::now(), self.batch_size)
            .await
            .map_err(|e| format!("failed to lock due submissions: {e}"))?;

        let mut processed = 0usize;
        for entity in due {
            let mut submission: AggregatorSubmission = entity.into();
            let adapter = self.adapter_for(submission.aggregator_type);
            if let Err(e) = retry_submission(&adapter, &mut submission).await {
                tracing::warn!(submission_id = %submission.id, error = %e, "submission retry failed");
                continue;
            }
            repo.apply_result(
                submission.id,
                submission.status.as_str(),
                submission.error_code.as_deref(),
                submission.error_message.as_deref(),
                submission.retry_count as i32,
                submission.next_retry_at,
                submission.confirmation_id.as_deref(),
                submission.aggregator_received_at,
            )
            .await
            .map_err(|e| format!("failed to persist retry result: {e}"))?;
            processed += 1;
        }

        if processed > 0 {
            info!(processed, "processed aggregator submission retries");
        }
        Ok(())
    }
}
