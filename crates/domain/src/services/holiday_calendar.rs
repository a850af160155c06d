//! Org+branch holiday calendar support for the pattern expander's
//! `skipHolidays` option (spec.md §4.1).

use chrono::NaiveDate;
use std::collections::HashSet;
use uuid::Uuid;

/// A set of local dates for one org+branch. Membership check is O(1).
#[derive(Debug, Clone, Default)]
pub struct HolidayCalendar {
    pub organization_id: Uuid,
    pub branch_id: Uuid,
    dates: HashSet<NaiveDate>,
}

impl HolidayCalendar {
    pub fn new(organization_id: Uuid, branch_id: Uuid, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            organization_id,
            branch_id,
            dates: dates.into_iter().collect(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }

    /// Dates in `[start, end]` that are holidays, for reporting/auditing.
    pub fn holidays_in_range(&self, start: NaiveDate, end: NaiveDate) -> HashSet<NaiveDate> {
        self.dates
            .iter()
            .copied()
            .filter(|d| *d >= start && *d <= end)
            .collect()
    }

    pub fn as_set(&self) -> &HashSet<NaiveDate> {
        &self.dates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_checks_membership() {
        let calendar = HolidayCalendar::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            [NaiveDate::from_ymd_opt(2024, 12, 25).unwrap()],
        );
        assert!(calendar.contains(NaiveDate::from_ymd_opt(2024, 12, 25).unwrap()));
        assert!(!calendar.contains(NaiveDate::from_ymd_opt(2024, 12, 26).unwrap()));
    }

    #[test]
    fn holidays_in_range_filters_by_window() {
        let calendar = HolidayCalendar::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            [
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 12, 25).unwrap(),
            ],
        );
        let in_range = calendar.holidays_in_range(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        );
        assert_eq!(in_range.len(), 1);
    }
}
