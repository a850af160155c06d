//! Service Pattern aggregate — the recurring-care template (spec.md §3).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;
use validator::Validate;

use super::common::EntityMeta;
use super::recurrence::RecurrenceRule;
use crate::error::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatternType {
    Recurring,
    OneTime,
    AsNeeded,
    Respite,
}

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::Recurring => "RECURRING",
            PatternType::OneTime => "ONE_TIME",
            PatternType::AsNeeded => "AS_NEEDED",
            PatternType::Respite => "RESPITE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PatternStatus {
    Draft,
    Active,
    Suspended,
    Completed,
    Cancelled,
}

impl PatternStatus {
    pub fn can_generate_visits(&self) -> bool {
        matches!(self, PatternStatus::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternStatus::Draft => "DRAFT",
            PatternStatus::Active => "ACTIVE",
            PatternStatus::Suspended => "SUSPENDED",
            PatternStatus::Completed => "COMPLETED",
            PatternStatus::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePattern {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub pattern_type: PatternType,
    pub recurrence: RecurrenceRule,
    pub service_type_code: String,
    /// Minutes, 15-1440.
    pub duration_minutes: u32,
    pub required_skills: BTreeSet<String>,
    pub required_certifications: BTreeSet<String>,
    pub preferred_caregiver_ids: Vec<Uuid>,
    pub blocked_caregiver_ids: BTreeSet<Uuid>,
    pub client_id: Uuid,
    pub authorization_start_date: NaiveDate,
    pub authorization_end_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_hour_cap: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_visit_cap: Option<u32>,
    pub effective_from: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_to: Option<NaiveDate>,
    pub status: PatternStatus,
}

impl ServicePattern {
    /// Validates the cross-field invariants listed in spec.md §3. Does not
    /// touch persistence; pure structural validation.
    pub fn validate(&self) -> DomainResult<()> {
        if !(15..=1440).contains(&self.duration_minutes) {
            return Err(DomainError::validation(
                "duration must be between 15 and 1440 minutes",
            ));
        }
        if self.authorization_start_date > self.authorization_end_date {
            return Err(DomainError::validation(
                "authorizationStartDate must be <= authorizationEndDate",
            ));
        }
        if let Some(effective_to) = self.effective_to {
            if self.effective_from > effective_to {
                return Err(DomainError::validation(
                    "effectiveFrom must be <= effectiveTo",
                ));
            }
        }
        self.recurrence
            .validate()
            .map_err(DomainError::validation)?;
        Ok(())
    }

    pub fn assert_can_generate(&self) -> DomainResult<()> {
        if !self.status.can_generate_visits() {
            return Err(DomainError::validation(
                "only ACTIVE patterns may generate visits",
            ));
        }
        Ok(())
    }
}

/// `POST /api/v1/patterns` request body.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateServicePatternRequest {
    pub pattern_type: PatternType,
    pub recurrence: RecurrenceRule,
    #[validate(length(min = 1, max = 20))]
    pub service_type_code: String,
    #[validate(range(min = 15, max = 1440))]
    pub duration_minutes: u32,
    #[serde(default)]
    pub required_skills: BTreeSet<String>,
    #[serde(default)]
    pub required_certifications: BTreeSet<String>,
    #[serde(default)]
    pub preferred_caregiver_ids: Vec<Uuid>,
    #[serde(default)]
    pub blocked_caregiver_ids: BTreeSet<Uuid>,
    pub client_id: Uuid,
    pub authorization_start_date: NaiveDate,
    pub authorization_end_date: NaiveDate,
    #[serde(default)]
    pub weekly_hour_cap: Option<u32>,
    #[serde(default)]
    pub weekly_visit_cap: Option<u32>,
    pub effective_from: NaiveDate,
    #[serde(default)]
    pub effective_to: Option<NaiveDate>,
}

/// `POST /api/v1/patterns/:id/generate-schedule` request body: the window
/// to expand into visits (spec.md §4.1).
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateScheduleRequest {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
}

/// Response envelope for a generated schedule: the visit-date/time
/// instances produced by the Pattern Expander, not yet persisted as visits
/// by the caller (the route handler persists each one).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateScheduleResponse {
    pub pattern_id: Uuid,
    pub instance_count: usize,
}
