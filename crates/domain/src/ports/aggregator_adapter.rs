//! Injected collaborator: per-aggregator submission transport (spec.md §6).

use async_trait::async_trait;

use crate::models::submission::AdapterResult;

#[async_trait]
pub trait AggregatorAdapter: Send + Sync {
    async fn submit(&self, record: &serde_json::Value) -> AdapterResult;
}

/// Always-succeeds mock, useful for happy-path engine tests.
#[derive(Debug, Clone, Default)]
pub struct MockAggregatorAdapter {
    pub result: Option<AdapterResult>,
}

#[async_trait]
impl AggregatorAdapter for MockAggregatorAdapter {
    async fn submit(&self, _record: &serde_json::Value) -> AdapterResult {
        self.result.clone().unwrap_or(AdapterResult {
            success: true,
            confirmation_id: Some("mock-confirmation".into()),
            error_code: None,
            error_message: None,
            requires_retry: false,
            retry_after_seconds: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_defaults_to_success() {
        let adapter = MockAggregatorAdapter::default();
        let result = adapter.submit(&serde_json::json!({})).await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn mock_honors_configured_result() {
        let adapter = MockAggregatorAdapter {
            result: Some(AdapterResult {
                success: false,
                confirmation_id: None,
                error_code: Some("REJECTED".into()),
                error_message: Some("bad payload".into()),
                requires_retry: false,
                retry_after_seconds: None,
            }),
        };
        let result = adapter.submit(&serde_json::json!({})).await;
        assert!(!result.success);
        assert_eq!(result.error_code.as_deref(), Some("REJECTED"));
    }
}
