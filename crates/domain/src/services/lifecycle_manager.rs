//! Visit Lifecycle Manager (spec.md §4.2). Store-agnostic: callers supply
//! the relevant existing visits; persistence lives in the `persistence` crate.

use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::models::visit::{AssignmentMeta, AssignmentMethod, Visit, VisitStatus};

/// Statuses considered live for same-day conflict detection.
const CONFLICT_STATUSES: [VisitStatus; 4] = [
    VisitStatus::Scheduled,
    VisitStatus::Assigned,
    VisitStatus::Confirmed,
    VisitStatus::InProgress,
];

/// Statuses a visit must be in before (re)assignment is attempted.
const ASSIGNABLE_STATUSES: [VisitStatus; 3] = [
    VisitStatus::Unassigned,
    VisitStatus::Scheduled,
    VisitStatus::Assigned,
];

/// On `createVisit`: fails with a conflict error (carrying the existing
/// visit id) if `candidate` overlaps any same-client same-date visit in
/// `existing` that is in a live status.
pub fn check_create_conflict(existing: &[Visit], candidate: &Visit) -> DomainResult<()> {
    for other in existing {
        if !CONFLICT_STATUSES.contains(&other.status) {
            continue;
        }
        if candidate.overlaps(other)? {
            return Err(DomainError::conflict(format!(
                "overlaps existing visit {}",
                other.meta.id
            )));
        }
    }
    Ok(())
}

/// `V{YYYY}-{NNNNNN}`, 1-based per-org-per-year sequence, zero-padded to 6
/// digits. The caller is responsible for obtaining `sequence` atomically
/// (advisory lock or counter-table `INSERT ... RETURNING`).
pub fn format_visit_number(year: i32, sequence: u32) -> String {
    format!("V{year}-{sequence:06}")
}

/// Caregiver assignment pre-checks and transition (spec.md §4.2
/// "Caregiver assignment"). `availability_ok` is the result of the
/// availability check (§4.3), evaluated by the caller.
pub fn assign_caregiver(
    visit: &mut Visit,
    caregiver_id: Uuid,
    method: AssignmentMethod,
    availability_ok: bool,
    actor: Uuid,
) -> DomainResult<()> {
    if !ASSIGNABLE_STATUSES.contains(&visit.status) {
        return Err(DomainError::validation(
            "visit is not in an assignable status",
        ));
    }
    if !availability_ok {
        return Err(DomainError::conflict(
            "caregiver is not available for the requested window",
        ));
    }
    if visit.status != VisitStatus::Assigned {
        visit.transition(VisitStatus::Assigned, actor, None, false)?;
    }
    visit.caregiver_id = Some(caregiver_id);
    visit.assignment = Some(AssignmentMeta {
        method,
        assigned_by: actor,
        assigned_at: chrono::Utc::now(),
    });
    Ok(())
}
