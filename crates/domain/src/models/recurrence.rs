//! Recurrence rule types consumed by the pattern expander.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Recurrence frequency. `Custom` rules are never expanded (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Custom,
}

/// ISO weekday, Monday-first, matching `chrono::Weekday` ordinal semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<chrono::Weekday> for Weekday {
    fn from(w: chrono::Weekday) -> Self {
        match w {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }
}

/// A recurrence rule as defined in spec.md §3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    /// 1-365.
    pub interval: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_of_week: Option<BTreeSet<Weekday>>,
    /// Each entry in 1-31.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_of_month: Option<BTreeSet<u8>>,
    /// `HH:MM`, 24-hour.
    pub start_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    /// IANA timezone name, e.g. `America/Chicago`.
    pub timezone: String,
}

impl RecurrenceRule {
    /// Structural validation independent of the owning pattern's status.
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=365).contains(&self.interval) {
            return Err("interval must be between 1 and 365".into());
        }
        shared::validation::validate_hhmm(&self.start_time)
            .map_err(|_| "startTime must be HH:MM".to_string())?;
        if let Some(end) = &self.end_time {
            shared::validation::validate_hhmm(end)
                .map_err(|_| "endTime must be HH:MM".to_string())?;
        }
        match self.frequency {
            Frequency::Weekly | Frequency::Biweekly => {
                if self.days_of_week.as_ref().map(|d| d.is_empty()).unwrap_or(true) {
                    return Err("WEEKLY/BIWEEKLY patterns require a non-empty day-of-week set".into());
                }
            }
            Frequency::Monthly => {
                let ok = self
                    .days_of_month
                    .as_ref()
                    .map(|d| !d.is_empty() && d.iter().all(|day| (1..=31).contains(day)))
                    .unwrap_or(false);
                if !ok {
                    return Err("MONTHLY patterns require a non-empty, valid dates-of-month set".into());
                }
            }
            Frequency::Daily | Frequency::Custom => {}
        }
        Ok(())
    }
}
