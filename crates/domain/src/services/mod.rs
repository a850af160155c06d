//! Domain services for Phone Manager.
//!
//! Services contain business logic that operates on domain models.

pub mod aggregator_submission;
pub mod availability;
pub mod evv_verification;
pub mod geofence_math;
pub mod holiday_calendar;
pub mod integrity;
pub mod lifecycle_manager;
pub mod pattern_expander;
pub mod vmur_workflow;

pub use availability::{availability_slots, is_available, AvailabilitySlot};
pub use geofence_math::{
    check_geofence, geofence_issue, haversine_distance_meters, mock_location_issue,
    GeofenceCheckResult,
};
pub use evv_verification::{
    accuracy_issue, apply_manual_override, clock_in, clock_out, is_phone_warning, state_rules,
    ClockInContext, ClockInOutcome, ClockOutContext, ClockOutOutcome, StateRules,
    validate_location_method,
};
pub use holiday_calendar::HolidayCalendar;
pub use integrity::{canonical_string, canonicalize, integrity_digest};
pub use lifecycle_manager::{assign_caregiver, check_create_conflict, format_visit_number};
pub use pattern_expander::{expand, ExpansionOptions, MAX_WINDOW_DAYS};

pub use aggregator_submission::{
    build_submission, retry_pending_submissions, retry_submission, submit_to_aggregator,
    validate_for_submission,
};
pub use vmur_workflow::{approve_vmur, create_vmur, deny_vmur, expire_old_vmurs};
