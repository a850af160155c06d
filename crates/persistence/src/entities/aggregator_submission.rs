//! Aggregator submission entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::submission::{AggregatorSubmission, AggregatorType, SubmissionStatus};

/// Database row mapping for the `aggregator_submissions` table.
#[derive(Debug, Clone, FromRow)]
pub struct AggregatorSubmissionEntity {
    pub id: Uuid,
    pub state_code: String,
    pub evv_record_id: Uuid,
    pub aggregator_type: String,
    pub payload: Json<serde_json::Value>,
    pub submission_format: String,
    pub submitted_at: DateTime<Utc>,
    pub status: String,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub raw_response: Option<Json<serde_json::Value>>,
    pub retry_count: i32,
    pub max_retries: i32,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub confirmation_id: Option<String>,
    pub aggregator_received_at: Option<DateTime<Utc>>,
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

impl From<AggregatorSubmissionEntity> for AggregatorSubmission {
    fn from(e: AggregatorSubmissionEntity) -> Self {
        Self {
            id: e.id,
            state_code: e.state_code,
            evv_record_id: e.evv_record_id,
            aggregator_type: parse_aggregator_type(&e.aggregator_type),
            payload: e.payload.0,
            submission_format: e.submission_format,
            submitted_at: e.submitted_at,
            status: parse_submission_status(&e.status),
            error_code: e.error_code,
            error_message: e.error_message,
            raw_response: e.raw_response.map(|j| j.0),
            retry_count: e.retry_count as u32,
            max_retries: e.max_retries as u32,
            next_retry_at: e.next_retry_at,
            confirmation_id: e.confirmation_id,
            aggregator_received_at: e.aggregator_received_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_aggregator_routing_strings() {
        assert_eq!(parse_aggregator_type("SANDATA"), AggregatorType::Sandata);
        assert_eq!(parse_aggregator_type("TELLUS"), AggregatorType::Tellus);
        assert_eq!(parse_aggregator_type("HH_AE_XCHANGE"), AggregatorType::HhAeXchange);
    }

    #[test]
    fn maps_submission_status_strings() {
        assert_eq!(parse_submission_status("RETRY"), SubmissionStatus::Retry);
        assert_eq!(parse_submission_status("UNKNOWN"), SubmissionStatus::Pending);
    }
}
