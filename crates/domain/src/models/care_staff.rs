//! Care-staff role assignment: which organization/branch a user acts in,
//! and at what privilege level, for the scheduling and EVV engines
//! (spec.md §4.6 "supervisor roles").

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Roles recognized by the scheduling/EVV HTTP surface, ordered least to
/// most privileged. `SUPER_ADMIN` acts across organizations; the others are
/// scoped to the org/branch on their `CareStaff` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CareRole {
    Caregiver,
    Coordinator,
    BranchAdmin,
    OrgAdmin,
    SuperAdmin,
}

impl CareRole {
    /// True if this role meets or exceeds `required`, mirroring
    /// `OrgUserRole::has_at_least`.
    pub fn has_at_least(&self, required: CareRole) -> bool {
        *self >= required
    }
}

/// A user's standing assignment within an organization/branch, used by the
/// scheduling/EVV RBAC middleware to authorize requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareStaff {
    pub id: Uuid,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub branch_id: Uuid,
    pub role: CareRole,
    pub active: bool,
}
