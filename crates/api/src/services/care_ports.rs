//! Pg-backed implementations of the scheduling/EVV engines' injected
//! collaborator ports (spec.md §6), wiring `domain`'s trait boundaries to
//! the concrete `persistence` repositories.

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use domain::error::{DomainError, DomainResult};
use domain::models::visit::VisitStatus;
use domain::ports::address_provider::{ClientAddress, ClientAddressProvider};
use domain::ports::caregiver_provider::{CaregiverProvider, EvvCaregiverView, ServiceAuthorization};
use domain::ports::client_provider::{ClientProvider, EvvClientView};
use domain::ports::visit_provider::{
    EvvVisitView, GateResult, VisitProvider, VisitProviderStatus,
};
use persistence::repositories::{CaregiverRepository, ClientRepository, VisitRepository};

/// Reads client identity for EVV from the `clients` reference table.
pub struct PgClientProvider {
    repo: ClientRepository,
}

impl PgClientProvider {
    pub fn new(repo: ClientRepository) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl ClientProvider for PgClientProvider {
    async fn get_client_for_evv(&self, client_id: Uuid) -> DomainResult<EvvClientView> {
        self.repo
            .find_by_id(client_id)
            .await
            .map_err(|e| DomainError::transport(e.to_string()))?
            .map(Into::into)
            .ok_or_else(|| DomainError::not_found("Client", client_id.to_string()))
    }
}

/// Reads client addresses for EVV/geofencing; wrap with
/// `CachedClientAddressProvider` at construction time.
pub struct PgClientAddressProvider {
    repo: ClientRepository,
}

impl PgClientAddressProvider {
    pub fn new(repo: ClientRepository) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl ClientAddressProvider for PgClientAddressProvider {
    async fn get_client_address(&self, client_id: Uuid) -> DomainResult<ClientAddress> {
        self.repo
            .find_by_id(client_id)
            .await
            .map_err(|e| DomainError::transport(e.to_string()))?
            .map(Into::into)
            .ok_or_else(|| DomainError::not_found("ClientAddress", client_id.to_string()))
    }
}

/// Reads caregiver credentials and service authorizations for EVV.
pub struct PgCaregiverProvider {
    repo: CaregiverRepository,
}

impl PgCaregiverProvider {
    pub fn new(repo: CaregiverRepository) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl CaregiverProvider for PgCaregiverProvider {
    async fn get_caregiver_for_evv(&self, caregiver_id: Uuid) -> DomainResult<EvvCaregiverView> {
        self.repo
            .find_by_id(caregiver_id)
            .await
            .map_err(|e| DomainError::transport(e.to_string()))?
            .map(Into::into)
            .ok_or_else(|| DomainError::not_found("Caregiver", caregiver_id.to_string()))
    }

    async fn can_provide_service(
        &self,
        caregiver_id: Uuid,
        service_type_code: &str,
        client_id: Uuid,
    ) -> DomainResult<ServiceAuthorization> {
        let row = self
            .repo
            .find_authorization(caregiver_id, client_id, service_type_code)
            .await
            .map_err(|e| DomainError::transport(e.to_string()))?;

        Ok(match row {
            Some(row) if row.authorized => ServiceAuthorization::allow(),
            Some(row) => {
                let mut authorization = ServiceAuthorization::deny(
                    row.reason.unwrap_or_else(|| "service authorization denied".into()),
                );
                authorization.missing_credentials = row.missing_credentials;
                authorization.blocked_reasons = row.blocked_reasons;
                authorization
            }
            // No explicit authorization row: the default stance is to allow,
            // since most agencies do not pre-enumerate every caregiver/client/
            // service-type triple (only the exceptions are written).
            None => ServiceAuthorization::allow(),
        })
    }
}

fn visit_status_for(status: VisitProviderStatus) -> VisitStatus {
    match status {
        VisitProviderStatus::Arrived => VisitStatus::Arrived,
        VisitProviderStatus::InProgress => VisitStatus::InProgress,
        VisitProviderStatus::Completed => VisitStatus::Completed,
        VisitProviderStatus::Incomplete => VisitStatus::Incomplete,
    }
}

/// Adapts `VisitRepository` to the EVV engine's narrow view of visit state,
/// translating status-string and JSON-column persistence into the
/// `VisitProvider` port's domain-typed calls.
pub struct PgVisitProvider {
    repo: VisitRepository,
}

impl PgVisitProvider {
    pub fn new(repo: VisitRepository) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl VisitProvider for PgVisitProvider {
    async fn get_visit_for_evv(&self, visit_id: Uuid) -> DomainResult<EvvVisitView> {
        let entity = self
            .repo
            .find_by_id(visit_id)
            .await
            .map_err(|e| DomainError::transport(e.to_string()))?
            .ok_or_else(|| DomainError::not_found("Visit", visit_id.to_string()))?;

        Ok(EvvVisitView {
            visit_id: entity.id,
            client_id: entity.client_id,
            caregiver_id: entity.caregiver_id,
            service_date: entity.service_date,
            status: entity.status.clone(),
            service_type_code: entity.service_type_code.clone(),
            latitude: entity.service_address.0.latitude,
            longitude: entity.service_address.0.longitude,
            geofence_radius_meters: entity.service_address.0.geofence_radius_meters,
        })
    }

    async fn can_clock_in(&self, visit_id: Uuid, caregiver_id: Uuid) -> DomainResult<GateResult> {
        let entity = self
            .repo
            .find_by_id(visit_id)
            .await
            .map_err(|e| DomainError::transport(e.to_string()))?
            .ok_or_else(|| DomainError::not_found("Visit", visit_id.to_string()))?;

        if entity.caregiver_id != Some(caregiver_id) {
            return Ok(GateResult::deny("caregiver is not assigned to this visit"));
        }
        let eligible = matches!(
            entity.status.as_str(),
            "CONFIRMED" | "EN_ROUTE" | "ASSIGNED"
        );
        Ok(if eligible {
            GateResult::allow()
        } else {
            GateResult::deny(format!(
                "visit in status {} cannot be clocked into",
                entity.status
            ))
        })
    }

    async fn can_clock_out(&self, visit_id: Uuid, caregiver_id: Uuid) -> DomainResult<GateResult> {
        let entity = self
            .repo
            .find_by_id(visit_id)
            .await
            .map_err(|e| DomainError::transport(e.to_string()))?
            .ok_or_else(|| DomainError::not_found("Visit", visit_id.to_string()))?;

        if entity.caregiver_id != Some(caregiver_id) {
            return Ok(GateResult::deny("caregiver is not assigned to this visit"));
        }
        let eligible = matches!(entity.status.as_str(), "IN_PROGRESS" | "PAUSED");
        Ok(if eligible {
            GateResult::allow()
        } else {
            GateResult::deny(format!(
                "visit in status {} cannot be clocked out of",
                entity.status
            ))
        })
    }

    async fn update_visit_status(
        &self,
        visit_id: Uuid,
        status: VisitProviderStatus,
        _evv_record_id: Uuid,
    ) -> DomainResult<()> {
        let entity = self
            .repo
            .find_by_id(visit_id)
            .await
            .map_err(|e| DomainError::transport(e.to_string()))?
            .ok_or_else(|| DomainError::not_found("Visit", visit_id.to_string()))?;

        let mut visit: domain::models::visit::Visit = entity.clone().into();
        let actor = visit.caregiver_id.unwrap_or(visit.meta.updated_by);
        visit.transition(visit_status_for(status), actor, None, true)?;

        let history = serde_json::to_value(&visit.status_history)
            .map_err(|e| DomainError::transport(e.to_string()))?;
        let status_str = serde_json::to_value(visit.status)
            .ok()
            .and_then(|v| v.as_str().map(str::to_owned))
            .ok_or_else(|| DomainError::transport("failed to serialize visit status"))?;

        self.repo
            .update_status(visit_id, entity.version, &status_str, &history, actor)
            .await
            .map(|_| ())
    }
}
