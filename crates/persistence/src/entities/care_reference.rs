//! Reference-data entities consumed by the EVV/scheduling ports: client,
//! caregiver, and care-staff role rows. These tables are intentionally thin
//! — lookup surfaces for the scheduling/EVV engines, not the full
//! client/caregiver record management system (out of scope, see Non-goals).

use chrono::NaiveDate;
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::care_staff::{CareRole, CareStaff};
use domain::ports::address_provider::ClientAddress;
use domain::ports::caregiver_provider::EvvCaregiverView;
use domain::ports::client_provider::EvvClientView;

/// Database row mapping for the `clients` table.
#[derive(Debug, Clone, FromRow)]
pub struct ClientEntity {
    pub id: Uuid,
    pub name: String,
    pub medicaid_id: Option<String>,
    pub dob: NaiveDate,
    pub state_code: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub address_state: String,
    pub postal_code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub geofence_radius_meters: Option<i32>,
}

impl From<ClientEntity> for EvvClientView {
    fn from(e: ClientEntity) -> Self {
        Self {
            id: e.id,
            name: e.name,
            medicaid_id: e.medicaid_id,
            dob: e.dob,
            state_code: e.state_code,
        }
    }
}

impl From<ClientEntity> for ClientAddress {
    fn from(e: ClientEntity) -> Self {
        Self {
            line1: e.address_line1,
            line2: e.address_line2,
            city: e.city,
            state: e.address_state,
            postal_code: e.postal_code,
            latitude: e.latitude,
            longitude: e.longitude,
            geofence_radius_meters: e.geofence_radius_meters.map(|v| v as u32),
        }
    }
}

/// Database row mapping for the `caregivers` table.
#[derive(Debug, Clone, FromRow)]
pub struct CaregiverEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub employee_id: String,
    pub npi: Option<String>,
    pub credentials: Vec<String>,
    pub certifications: Vec<String>,
    pub background_screening_status: String,
}

impl From<CaregiverEntity> for EvvCaregiverView {
    fn from(e: CaregiverEntity) -> Self {
        Self {
            id: e.id,
            name: e.name,
            employee_id: e.employee_id,
            npi: e.npi,
            credentials: e.credentials,
            certifications: e.certifications,
            background_screening_status: e.background_screening_status,
        }
    }
}

/// Database row mapping for the `caregiver_service_authorizations` table:
/// which service types a caregiver may deliver to which client.
#[derive(Debug, Clone, FromRow)]
pub struct CaregiverAuthorizationEntity {
    pub caregiver_id: Uuid,
    pub client_id: Uuid,
    pub service_type_code: String,
    pub authorized: bool,
    pub reason: Option<String>,
    pub missing_credentials: Vec<String>,
    pub blocked_reasons: Vec<String>,
}

/// Database row mapping for the `care_staff` table.
#[derive(Debug, Clone, FromRow)]
pub struct CareStaffEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub branch_id: Uuid,
    pub role: String,
    pub active: bool,
}

fn parse_role(s: &str) -> CareRole {
    match s {
        "COORDINATOR" => CareRole::Coordinator,
        "BRANCH_ADMIN" => CareRole::BranchAdmin,
        "ORG_ADMIN" => CareRole::OrgAdmin,
        "SUPER_ADMIN" => CareRole::SuperAdmin,
        _ => CareRole::Caregiver,
    }
}

impl From<CareStaffEntity> for CareStaff {
    fn from(e: CareStaffEntity) -> Self {
        Self {
            id: e.id,
            user_id: e.user_id,
            organization_id: e.organization_id,
            branch_id: e.branch_id,
            role: parse_role(&e.role),
            active: e.active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_role_string_defaults_to_caregiver() {
        assert_eq!(parse_role("BOGUS"), CareRole::Caregiver);
        assert_eq!(parse_role("SUPER_ADMIN"), CareRole::SuperAdmin);
    }
}
