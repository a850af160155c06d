//! Repository implementations for database operations.

pub mod aggregator_submission;
pub mod care_reference;
pub mod evv_geofence;
pub mod evv_record;
pub mod service_pattern;
pub mod visit;
pub mod vmur;

pub use aggregator_submission::AggregatorSubmissionRepository;
pub use care_reference::{CaregiverRepository, CareStaffRepository, ClientRepository};
pub use evv_geofence::EvvGeofenceRepository;
pub use evv_record::EvvRecordRepository;
pub use service_pattern::ServicePatternRepository;
pub use visit::VisitRepository;
pub use vmur::VmurRepository;
