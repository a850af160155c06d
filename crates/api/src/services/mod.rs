//! External service integrations.

pub mod aggregator_adapters;
pub mod care_ports;

#[allow(unused_imports)] // Used when wiring AppState's aggregator adapters
pub use aggregator_adapters::HttpAggregatorAdapter;
#[allow(unused_imports)] // Used when wiring AppState's client/caregiver/visit providers
pub use care_ports::{PgCaregiverProvider, PgClientAddressProvider, PgClientProvider, PgVisitProvider};
