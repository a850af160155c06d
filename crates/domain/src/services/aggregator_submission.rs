//! Aggregator Submission Engine (spec.md §4.5): routes completed EVV
//! records to state aggregators and drives the retry/backoff sweep.

use chrono::{DateTime, Utc};

use crate::error::{DomainError, DomainResult};
use crate::models::evv_record::EvvRecord;
use crate::models::submission::{route_aggregator, AggregatorSubmission, SubmissionStatus};
use crate::ports::aggregator_adapter::AggregatorAdapter;

/// All of: `clockOutTime` present, both verifications present, a client
/// identity, and `serviceTypeCode` present (spec.md §4.5).
pub fn validate_for_submission(record: &EvvRecord) -> DomainResult<()> {
    let mut missing = Vec::new();
    if record.clock_out_time.is_none() {
        missing.push("clockOutTime");
    }
    if record.clock_out_verification.is_none() {
        missing.push("clockOutVerification");
    }
    if record.client_id.is_nil() {
        missing.push("clientId");
    }
    if record.service_type_code.trim().is_empty() {
        missing.push("serviceTypeCode");
    }
    if !missing.is_empty() {
        return Err(DomainError::validation(format!(
            "EVV record incomplete for submission, missing: {}",
            missing.join(", ")
        )));
    }
    Ok(())
}

/// Builds a PENDING submission row for a record, routed by
/// `serviceAddress.state` (spec.md §4.5 routing table).
pub fn build_submission(record: &EvvRecord) -> DomainResult<AggregatorSubmission> {
    validate_for_submission(record)?;
    let aggregator_type = route_aggregator(&record.service_state).ok_or_else(|| {
        DomainError::validation(format!(
            "unsupported state for aggregator submission: {}",
            record.service_state
        ))
    })?;
    let payload = serde_json::to_value(record).expect("EvvRecord is serializable");
    let format = format!("{aggregator_type:?}_v1");
    Ok(AggregatorSubmission::new(
        record.service_state.clone(),
        record.meta.id,
        aggregator_type,
        payload,
        format,
    ))
}

/// `submitToAggregator`: builds the submission row, marks it in-flight for
/// the duration of the adapter call, then applies the adapter's structured
/// result. The adapter trait is infallible by contract — transport failures
/// are expected to already be folded into a retryable `AdapterResult`.
pub async fn submit_to_aggregator<A: AggregatorAdapter>(
    adapter: &A,
    record: &EvvRecord,
) -> DomainResult<AggregatorSubmission> {
    let mut submission = build_submission(record)?;
    submission.status = SubmissionStatus::InFlight;
    let result = adapter.submit(&submission.payload).await;
    submission.apply_adapter_result(result);
    Ok(submission)
}

/// `retrySubmission`: re-attempts one RETRY submission. Exhausted retries
/// move the submission straight to REJECTED without calling the adapter.
pub async fn retry_submission<A: AggregatorAdapter>(
    adapter: &A,
    submission: &mut AggregatorSubmission,
) -> DomainResult<()> {
    if submission.status != SubmissionStatus::Retry {
        return Err(DomainError::validation(
            "submission is not in RETRY status",
        ));
    }
    if submission.exhausted_retries() {
        submission.status = SubmissionStatus::Rejected;
        submission.error_code = Some("MAX_RETRIES_EXCEEDED".into());
        submission.error_message = Some("Max retries exceeded".into());
        return Ok(());
    }
    submission.status = SubmissionStatus::InFlight;
    let result = adapter.submit(&submission.payload).await;
    submission.apply_adapter_result(result);
    Ok(())
}

/// `retryPendingSubmissions` cron sweep: reattempts every RETRY submission
/// whose `nextRetryAt` is due. A failure on one row never stops the others
/// (spec.md §4.5).
pub async fn retry_pending_submissions<A: AggregatorAdapter>(
    adapter: &A,
    submissions: &mut [AggregatorSubmission],
    now: DateTime<Utc>,
) -> Vec<DomainResult<()>> {
    let mut results = Vec::new();
    for submission in submissions.iter_mut() {
        let due = submission.status == SubmissionStatus::Retry
            && submission.next_retry_at.map(|t| t <= now).unwrap_or(false);
        if !due {
            continue;
        }
        results.push(retry_submission(adapter, submission).await);
    }
    results
}
