//! Domain models for the care scheduling and EVV compliance backend.

pub mod care_staff;
pub mod common;
pub mod compliance;
pub mod evv_record;
pub mod geofence;
pub mod location_verification;
pub mod recurrence;
pub mod service_pattern;
pub mod submission;
pub mod visit;
pub mod vmur;

pub use care_staff::{CareRole, CareStaff};
pub use common::EntityMeta;
pub use compliance::{ComplianceFlag, IssueSeverity, VerificationIssue, VerificationLevel};
pub use evv_record::{
    Attestation, AttestationType, Attestations, ClockInRequest, ClockOutRequest, EvvRecord,
    EvvStatus, ExceptionEvent, ManualOverride, ManualOverrideRequest, PauseEvent,
    PayorSubmissionStatus,
};
pub use geofence::{GeoPoint, Geofence, GeofenceShape, GeofenceStats, GeofenceStatus};
pub use location_verification::{
    DeviceInfo as EvvDeviceInfo, LocationEvent, LocationMethod, LocationVerification,
};
pub use recurrence::{Frequency, RecurrenceRule, Weekday};
pub use service_pattern::{PatternStatus, PatternType, ServicePattern};
pub use submission::{
    route_aggregator, AdapterResult, AggregatorSubmission, AggregatorType,
    SubmissionDashboardQuery, SubmissionDashboardResponse, SubmissionDashboardRow,
    SubmissionStatus, MAX_RETRY_ATTEMPTS, RETRY_BACKOFF_SECONDS,
};
pub use visit::{
    AssignVisitRequest, AssignmentMeta, AssignmentMethod, BillingStatus, CreateVisitRequest,
    ServiceAddress, StatusChange, TransitionVisitRequest, Visit, VisitFlags, VisitStatus,
    VisitType,
};
pub use vmur::{
    CreateVmurRequest, DenyVmurRequest, ListPendingVmursQuery, Vmur, VmurApprovalStatus,
    VmurDataSnapshot, VmurReasonCode, VMUR_EXPIRY_DAYS, VMUR_MIN_RECORD_AGE_DAYS,
};
