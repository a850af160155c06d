//! Injected collaborator: client identity lookups for EVV (spec.md §6).

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::DomainResult;

#[derive(Debug, Clone)]
pub struct EvvClientView {
    pub id: Uuid,
    pub name: String,
    pub medicaid_id: Option<String>,
    pub dob: NaiveDate,
    pub state_code: String,
}

#[async_trait]
pub trait ClientProvider: Send + Sync {
    async fn get_client_for_evv(&self, client_id: Uuid) -> DomainResult<EvvClientView>;
}

#[derive(Debug, Clone, Default)]
pub struct MockClientProvider {
    pub client: Option<EvvClientView>,
}

#[async_trait]
impl ClientProvider for MockClientProvider {
    async fn get_client_for_evv(&self, client_id: Uuid) -> DomainResult<EvvClientView> {
        self.client
            .clone()
            .ok_or_else(|| crate::error::DomainError::not_found("Client", client_id.to_string()))
    }
}
