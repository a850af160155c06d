//! Aggregator submission aggregate (spec.md §3, §4.5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregatorType {
    HhAeXchange,
    Sandata,
    Tellus,
}

impl AggregatorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregatorType::HhAeXchange => "HH_AE_XCHANGE",
            AggregatorType::Sandata => "SANDATA",
            AggregatorType::Tellus => "TELLUS",
        }
    }
}

/// Retry delays in seconds, clamped by index to the last value (spec.md §4.5).
pub const RETRY_BACKOFF_SECONDS: [i64; 3] = [60, 300, 1800];
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    Pending,
    Accepted,
    Rejected,
    Retry,
    /// Transient state held only while the adapter call is in flight, so a
    /// concurrent sweep does not double-process the same row.
    InFlight,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "PENDING",
            SubmissionStatus::Accepted => "ACCEPTED",
            SubmissionStatus::Rejected => "REJECTED",
            SubmissionStatus::Retry => "RETRY",
            SubmissionStatus::InFlight => "IN_FLIGHT",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatorSubmission {
    pub id: Uuid,
    pub state_code: String,
    pub evv_record_id: Uuid,
    pub aggregator_type: AggregatorType,
    /// Serialized snapshot of the EVV record at submission time.
    pub payload: serde_json::Value,
    pub submission_format: String,
    pub submitted_at: DateTime<Utc>,
    pub status: SubmissionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<serde_json::Value>,
    pub retry_count: u32,
    pub max_retries: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_retry_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregator_received_at: Option<DateTime<Utc>>,
}

/// Structured outcome returned by an `AggregatorAdapter::submit` call.
#[derive(Debug, Clone)]
pub struct AdapterResult {
    pub success: bool,
    pub confirmation_id: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub requires_retry: bool,
    pub retry_after_seconds: Option<i64>,
}

impl AggregatorSubmission {
    pub fn new(
        state_code: impl Into<String>,
        evv_record_id: Uuid,
        aggregator_type: AggregatorType,
        payload: serde_json::Value,
        submission_format: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            state_code: state_code.into(),
            evv_record_id,
            aggregator_type,
            payload,
            submission_format: submission_format.into(),
            submitted_at: Utc::now(),
            status: SubmissionStatus::Pending,
            error_code: None,
            error_message: None,
            raw_response: None,
            retry_count: 0,
            max_retries: MAX_RETRY_ATTEMPTS,
            next_retry_at: None,
            confirmation_id: None,
            aggregator_received_at: None,
        }
    }

    /// Backoff delay for the given zero-based retry count, clamped to the
    /// last configured value by index.
    pub fn backoff_seconds_for(retry_count: u32) -> i64 {
        let idx = (retry_count as usize).min(RETRY_BACKOFF_SECONDS.len() - 1);
        RETRY_BACKOFF_SECONDS[idx]
    }

    /// Applies the adapter's structured result to this submission in place.
    pub fn apply_adapter_result(&mut self, result: AdapterResult) {
        if result.success {
            self.status = SubmissionStatus::Accepted;
            self.aggregator_received_at = Some(Utc::now());
            self.confirmation_id = result.confirmation_id;
            return;
        }
        if result.requires_retry {
            self.retry_count += 1;
            self.status = SubmissionStatus::Retry;
            let delay = result
                .retry_after_seconds
                .unwrap_or_else(|| Self::backoff_seconds_for(self.retry_count.saturating_sub(1)));
            self.next_retry_at = Some(Utc::now() + chrono::Duration::seconds(delay));
            self.error_code = result.error_code;
            self.error_message = result.error_message;
        } else {
            self.status = SubmissionStatus::Rejected;
            self.error_code = result.error_code;
            self.error_message = result.error_message;
        }
    }

    /// Applies a transport exception (adapter call failed entirely, not a
    /// structured rejection) as a retryable failure.
    pub fn apply_transport_failure(&mut self, message: impl Into<String>) {
        self.apply_adapter_result(AdapterResult {
            success: false,
            confirmation_id: None,
            error_code: Some("NETWORK_ERROR".into()),
            error_message: Some(message.into()),
            requires_retry: true,
            retry_after_seconds: None,
        });
    }

    /// True once `retryCount >= maxRetries`; the next cron sweep should
    /// reject this submission with "Max retries exceeded".
    pub fn exhausted_retries(&self) -> bool {
        self.retry_count >= self.max_retries
    }
}

/// `GET /api/v1/submissions/dashboard` query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionDashboardQuery {
    #[serde(default)]
    pub state_code: Option<String>,
    #[serde(default)]
    pub aggregator_type: Option<AggregatorType>,
}

/// Aggregated submission counts by aggregator/status, for the ops
/// dashboard (spec.md §4.5/§4.6).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionDashboardRow {
    pub aggregator_type: AggregatorType,
    pub status: SubmissionStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionDashboardResponse {
    pub rows: Vec<SubmissionDashboardRow>,
}

/// State code → aggregator routing table (spec.md §4.5).
pub fn route_aggregator(state_code: &str) -> Option<AggregatorType> {
    match state_code {
        "TX" | "FL" => Some(AggregatorType::HhAeXchange),
        "OH" | "PA" | "NC" | "AZ" => Some(AggregatorType::Sandata),
        "GA" => Some(AggregatorType::Tellus),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_submission() -> AggregatorSubmission {
        AggregatorSubmission::new(
            "TX",
            Uuid::new_v4(),
            AggregatorType::HhAeXchange,
            serde_json::json!({}),
            "HHAeXchange_v1",
        )
    }

    #[test]
    fn routing_table_matches_spec() {
        assert_eq!(route_aggregator("TX"), Some(AggregatorType::HhAeXchange));
        assert_eq!(route_aggregator("FL"), Some(AggregatorType::HhAeXchange));
        assert_eq!(route_aggregator("OH"), Some(AggregatorType::Sandata));
        assert_eq!(route_aggregator("GA"), Some(AggregatorType::Tellus));
        assert_eq!(route_aggregator("NY"), None);
    }

    #[test]
    fn backoff_clamps_to_last_value_beyond_array_length() {
        assert_eq!(AggregatorSubmission::backoff_seconds_for(0), 60);
        assert_eq!(AggregatorSubmission::backoff_seconds_for(1), 300);
        assert_eq!(AggregatorSubmission::backoff_seconds_for(2), 1800);
        assert_eq!(AggregatorSubmission::backoff_seconds_for(10), 1800);
    }

    #[test]
    fn success_result_marks_accepted() {
        let mut submission = sample_submission();
        submission.apply_adapter_result(AdapterResult {
            success: true,
            confirmation_id: Some("conf-1".into()),
            error_code: None,
            error_message: None,
            requires_retry: false,
            retry_after_seconds: None,
        });
        assert_eq!(submission.status, SubmissionStatus::Accepted);
        assert_eq!(submission.confirmation_id.as_deref(), Some("conf-1"));
        assert!(submission.aggregator_received_at.is_some());
    }

    #[test]
    fn retryable_failure_increments_count_and_schedules_retry() {
        let mut submission = sample_submission();
        submission.apply_adapter_result(AdapterResult {
            success: false,
            confirmation_id: None,
            error_code: Some("TIMEOUT".into()),
            error_message: Some("slow".into()),
            requires_retry: true,
            retry_after_seconds: None,
        });
        assert_eq!(submission.status, SubmissionStatus::Retry);
        assert_eq!(submission.retry_count, 1);
        assert!(submission.next_retry_at.is_some());
    }

    #[test]
    fn non_retryable_failure_is_rejected() {
        let mut submission = sample_submission();
        submission.apply_adapter_result(AdapterResult {
            success: false,
            confirmation_id: None,
            error_code: Some("INVALID_PAYLOAD".into()),
            error_message: Some("bad data".into()),
            requires_retry: false,
            retry_after_seconds: None,
        });
        assert_eq!(submission.status, SubmissionStatus::Rejected);
        assert_eq!(submission.retry_count, 0);
    }

    #[test]
    fn transport_failure_uses_network_error_code() {
        let mut submission = sample_submission();
        submission.apply_transport_failure("connection reset");
        assert_eq!(submission.error_code.as_deref(), Some("NETWORK_ERROR"));
        assert_eq!(submission.status, SubmissionStatus::Retry);
    }

    #[test]
    fn exhausted_retries_detected_at_max() {
        let mut submission = sample_submission();
        submission.retry_count = MAX_RETRY_ATTEMPTS;
        assert!(submission.exhausted_retries());
    }
}
