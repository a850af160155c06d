//! Injected collaborator: caregiver credentials and service authorization
//! (spec.md §6).

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DomainResult;

#[derive(Debug, Clone)]
pub struct EvvCaregiverView {
    pub id: Uuid,
    pub name: String,
    pub employee_id: String,
    pub npi: Option<String>,
    pub credentials: Vec<String>,
    pub certifications: Vec<String>,
    pub background_screening_status: String,
}

#[derive(Debug, Clone)]
pub struct ServiceAuthorization {
    pub authorized: bool,
    pub reason: Option<String>,
    pub missing_credentials: Vec<String>,
    pub blocked_reasons: Vec<String>,
}

impl ServiceAuthorization {
    pub fn allow() -> Self {
        Self {
            authorized: true,
            reason: None,
            missing_credentials: vec![],
            blocked_reasons: vec![],
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            authorized: false,
            reason: Some(reason.into()),
            missing_credentials: vec![],
            blocked_reasons: vec![],
        }
    }
}

#[async_trait]
pub trait CaregiverProvider: Send + Sync {
    async fn get_caregiver_for_evv(&self, caregiver_id: Uuid) -> DomainResult<EvvCaregiverView>;

    async fn can_provide_service(
        &self,
        caregiver_id: Uuid,
        service_type_code: &str,
        client_id: Uuid,
    ) -> DomainResult<ServiceAuthorization>;
}

#[derive(Debug, Clone, Default)]
pub struct MockCaregiverProvider {
    pub caregiver: Option<EvvCaregiverView>,
    pub authorization: Option<ServiceAuthorization>,
}

#[async_trait]
impl CaregiverProvider for MockCaregiverProvider {
    async fn get_caregiver_for_evv(&self, caregiver_id: Uuid) -> DomainResult<EvvCaregiverView> {
        self.caregiver
            .clone()
            .ok_or_else(|| crate::error::DomainError::not_found("Caregiver", caregiver_id.to_string()))
    }

    async fn can_provide_service(
        &self,
        _caregiver_id: Uuid,
        _service_type_code: &str,
        _client_id: Uuid,
    ) -> DomainResult<ServiceAuthorization> {
        Ok(self
            .authorization
            .clone()
            .unwrap_or_else(ServiceAuthorization::allow))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn defaults_to_authorized_when_unconfigured() {
        let provider = MockCaregiverProvider::default();
        let result = provider
            .can_provide_service(Uuid::new_v4(), "PCA", Uuid::new_v4())
            .await
            .unwrap();
        assert!(result.authorized);
    }

    #[tokio::test]
    async fn honors_configured_denial() {
        let provider = MockCaregiverProvider {
            caregiver: None,
            authorization: Some(ServiceAuthorization::deny("missing certification")),
        };
        let result = provider
            .can_provide_service(Uuid::new_v4(), "PCA", Uuid::new_v4())
            .await
            .unwrap();
        assert!(!result.authorized);
        assert_eq!(result.reason.as_deref(), Some("missing certification"));
    }
}
