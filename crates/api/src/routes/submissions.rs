//! Aggregator submission endpoint handlers (spec.md §4.5).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use persistence::repositories::{AggregatorSubmissionRepository, EvvRecordRepository};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::aggregator_adapters::HttpAggregatorAdapter;
use domain::models::evv_record::EvvRecord;
use domain::models::submission::{
    AggregatorSubmission, AggregatorType, SubmissionDashboardQuery, SubmissionDashboardResponse,
    SubmissionStatus,
};
use domain::ports::aggregator_adapter::AggregatorAdapter;
use domain::services::aggregator_submission::{retry_submission, submit_to_aggregator};

fn adapter_for(state: &AppState, aggregator_type: AggregatorType) -> HttpAggregatorAdapter {
    match aggregator_type {
        AggregatorType::HhAeXchange => HttpAggregatorAdapter::hhaexchange(state.config.aggregators.hhaexchange.clone()),
        AggregatorType::Sandata => HttpAggregatorAdapter::sandata(state.config.aggregators.sandata.clone()),
        AggregatorType::Tellus => HttpAggregatorAdapter::tellus(state.config.aggregators.tellus.clone()),
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitEvvRecordRequest {
    pub evv_record_id: Uuid,
}

/// `POST /api/v1/submissions`: builds and submits the aggregator payload for
/// a completed EVV record (spec.md §4.5), routed to the aggregator that
/// owns the record's service-address state.
pub async fn submit_evv_record(
    State(state): State<AppState>,
    Json(request): Json<SubmitEvvRecordRequest>,
) -> Result<(StatusCode, Json<AggregatorSubmission>), ApiError> {
    let record_repo = EvvRecordRepository::new(state.pool.clone());
    let entity = record_repo
        .find_by_id(request.evv_record_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("evv record not found".into()))?;
    let record: EvvRecord = entity.into();

    let aggregator_type = domain::models::submission::route_aggregator(&record.service_state)
        .ok_or_else(|| ApiError::Validation(format!("unsupported state for aggregator submission: {}", record.service_state)))?;
    let adapter = adapter_for(&state, aggregator_type);

    let submission = submit_to_aggregator(&adapter, &record).await?;

    let submission_repo = AggregatorSubmissionRepository::new(state.pool.clone());
    let entity = submission_repo
        .create(
            &submission.state_code,
            submission.evv_record_id,
            submission.aggregator_type.as_str(),
            &submission.payload,
            &submission.submission_format,
        )
        .await?;
    submission_repo
        .apply_result(
            entity.id,
            submission.status.as_str(),
            submission.error_code.as_deref(),
            submission.error_message.as_deref(),
            submission.retry_count as i32,
            submission.next_retry_at,
            submission.confirmation_id.as_deref(),
            submission.aggregator_received_at,
        )
        .await?;

    if submission.status == SubmissionStatus::Accepted {
        record_repo
            .mark_submitted(
                record.meta.id,
                &domain::models::evv_record::PayorSubmissionStatus {
                    submitted_to_aggregator: true,
                    submitted_at: submission.aggregator_received_at,
                },
            )
            .await?;
    }

    info!(
        evv_record_id = %submission.evv_record_id,
        aggregator = submission.aggregator_type.as_str(),
        status = submission.status.as_str(),
        "evv record submitted to aggregator"
    );
    Ok((StatusCode::CREATED, Json(submission)))
}

/// `GET /api/v1/submissions/:id`.
pub async fn get_submission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AggregatorSubmission>, ApiError> {
    let repo = AggregatorSubmissionRepository::new(state.pool.clone());
    let entity = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("submission not found".into()))?;
    Ok(Json(entity.into()))
}

/// `POST /api/v1/submissions/:id/retry`: re-attempts one RETRY submission
/// on demand, outside the scheduled sweep.
pub async fn retry_submission_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AggregatorSubmission>, ApiError> {
    let repo = AggregatorSubmissionRepository::new(state.pool.clone());
    let entity = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("submission not found".into()))?;
    let mut submission: AggregatorSubmission = entity.into();

    let adapter = adapter_for(&state, submission.aggregator_type);
    retry_submission(&adapter, &mut submission).await?;

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
    .await?;

    info!(submission_id = %submission.id, status = submission.status.as_str(), "submission retry attempted");
    Ok(Json(submission))
}

/// `GET /api/v1/submissions/dashboard` (spec.md §4.6 ops dashboard).
pub async fn submission_dashboard(
    State(state): State<AppState>,
    Query(query): Query<SubmissionDashboardQuery>,
) -> Result<Json<SubmissionDashboardResponse>, ApiError> {
    let repo = AggregatorSubmissionRepository::new(state.pool.clone());
    let rows = repo
        .dashboard_counts(
            query.state_code.as_deref(),
            query.aggregator_type.as_ref().map(|a| a.as_str()),
        )
        .await?;
    Ok(Json(SubmissionDashboardResponse { rows }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_request_deserializes() {
        let json = r#"{"evvRecordId": "550e8400-e29b-41d4-a716-446655440000"}"#;
        let request: SubmitEvvRecordRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.evv_record_id.to_string(), "550e8400-e29b-41d4-a716-446655440000");
    }

    #[test]
    fn dashboard_query_deserializes_without_filters() {
        let query: SubmissionDashboardQuery = serde_json::from_str("{}").unwrap();
        assert!(query.state_code.is_none());
        assert!(query.aggregator_type.is_none());
    }
}
