//! Fields shared by every persisted aggregate in this domain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata carried by every aggregate: identity, tenancy, optimistic
/// concurrency, audit timestamps, and soft delete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntityMeta {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub branch_id: Uuid,
    /// Monotonic, incremented on every write. Used for optimistic concurrency:
    /// writers condition their UPDATE on the version they last read.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub updated_by: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl EntityMeta {
    pub fn new(organization_id: Uuid, branch_id: Uuid, actor: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            organization_id,
            branch_id,
            version: 1,
            created_at: now,
            updated_at: now,
            created_by: actor,
            updated_by: actor,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Bumps `version` and `updated_at`/`updated_by` for a write. Callers
    /// condition their persistence write on the previously-read version.
    pub fn touch(&mut self, actor: Uuid) {
        self.version += 1;
        self.updated_at = Utc::now();
        self.updated_by = actor;
    }
}
