//! Injected collaborator interfaces the core engines depend on (spec.md §6).
//! Keeping these as traits lets the scheduling/EVV engines stay ignorant of
//! how clients, caregivers, and aggregators are actually stored or reached.

pub mod address_provider;
pub mod aggregator_adapter;
pub mod caregiver_provider;
pub mod client_provider;
pub mod visit_provider;

pub use address_provider::{
    CachedClientAddressProvider, ClientAddress, ClientAddressProvider, MockClientAddressProvider,
};
pub use aggregator_adapter::{AggregatorAdapter, MockAggregatorAdapter};
pub use caregiver_provider::{
    CaregiverProvider, EvvCaregiverView, MockCaregiverProvider, ServiceAuthorization,
};
pub use client_provider::{ClientProvider, EvvClientView, MockClientProvider};
pub use visit_provider::{
    EvvVisitView, GateResult, MockVisitProvider, VisitProvider, VisitProviderStatus,
};
