//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod aggregator_submission;
pub mod care_reference;
pub mod evv_geofence;
pub mod evv_record;
pub mod service_pattern;
pub mod visit;
pub mod vmur;

pub use aggregator_submission::AggregatorSubmissionEntity;
pub use care_reference::{CaregiverAuthorizationEntity, CaregiverEntity, CareStaffEntity, ClientEntity};
pub use evv_geofence::EvvGeofenceEntity;
pub use evv_record::EvvRecordEntity;
pub use service_pattern::ServicePatternEntity;
pub use visit::VisitEntity;
pub use vmur::VmurEntity;
