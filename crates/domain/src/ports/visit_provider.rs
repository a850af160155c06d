//! Injected collaborator: the EVV engine's view of visit state (spec.md §6).

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DomainResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitProviderStatus {
    Arrived,
    InProgress,
    Completed,
    Incomplete,
}

#[derive(Debug, Clone)]
pub struct EvvVisitView {
    pub visit_id: Uuid,
    pub client_id: Uuid,
    pub caregiver_id: Option<Uuid>,
    pub service_date: chrono::NaiveDate,
    pub status: String,
    pub service_type_code: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub geofence_radius_meters: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct GateResult {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl GateResult {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Collaborator consumed by the EVV verification engine to read and mutate
/// visit state without depending on the scheduling engine's internals.
#[async_trait]
pub trait VisitProvider: Send + Sync {
    async fn get_visit_for_evv(&self, visit_id: Uuid) -> DomainResult<EvvVisitView>;

    async fn can_clock_in(&self, visit_id: Uuid, caregiver_id: Uuid) -> DomainResult<GateResult>;

    async fn can_clock_out(&self, visit_id: Uuid, caregiver_id: Uuid) -> DomainResult<GateResult>;

    async fn update_visit_status(
        &self,
        visit_id: Uuid,
        status: VisitProviderStatus,
        evv_record_id: Uuid,
    ) -> DomainResult<()>;
}

/// In-memory mock for tests; returns whatever was configured at construction.
#[derive(Debug, Clone, Default)]
pub struct MockVisitProvider {
    pub view: Option<EvvVisitView>,
    pub clock_in_gate: bool,
    pub clock_out_gate: bool,
}

#[async_trait]
impl VisitProvider for MockVisitProvider {
    async fn get_visit_for_evv(&self, visit_id: Uuid) -> DomainResult<EvvVisitView> {
        self.view
            .clone()
            .ok_or_else(|| crate::error::DomainError::not_found("Visit", visit_id.to_string()))
    }

    async fn can_clock_in(&self, _visit_id: Uuid, _caregiver_id: Uuid) -> DomainResult<GateResult> {
        Ok(if self.clock_in_gate {
            GateResult::allow()
        } else {
            GateResult::deny("visit not in a clock-in eligible state")
        })
    }

    async fn can_clock_out(&self, _visit_id: Uuid, _caregiver_id: Uuid) -> DomainResult<GateResult> {
        Ok(if self.clock_out_gate {
            GateResult::allow()
        } else {
            GateResult::deny("visit not in a clock-out eligible state")
        })
    }

    async fn update_visit_status(
        &self,
        _visit_id: Uuid,
        _status: VisitProviderStatus,
        _evv_record_id: Uuid,
    ) -> DomainResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_returns_configured_gate_results() {
        let provider = MockVisitProvider {
            view: None,
            clock_in_gate: true,
            clock_out_gate: false,
        };
        let allowed = provider.can_clock_in(Uuid::new_v4(), Uuid::new_v4()).await.unwrap();
        assert!(allowed.allowed);
        let denied = provider.can_clock_out(Uuid::new_v4(), Uuid::new_v4()).await.unwrap();
        assert!(!denied.allowed);
    }

    #[tokio::test]
    async fn mock_without_view_returns_not_found() {
        let provider = MockVisitProvider::default();
        let err = provider.get_visit_for_evv(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, crate::error::DomainError::NotFound { .. }));
    }
}
