//! Pattern Expander: turns a recurrence rule into concrete local dates
//! (spec.md §4.1). Pure function, no I/O.

use chrono::{Datelike, NaiveDate};
use std::collections::HashSet;

use crate::error::{DomainError, DomainResult};
use crate::models::recurrence::{Frequency, RecurrenceRule, Weekday};
use crate::models::service_pattern::ServicePattern;

pub const MAX_WINDOW_DAYS: i64 = 365;

#[derive(Debug, Clone, Default)]
pub struct ExpansionOptions {
    pub skip_holidays: bool,
}

/// `expand(pattern, startDate, endDate, options) -> ordered list of local dates`.
pub fn expand(
    pattern: &ServicePattern,
    start_date: NaiveDate,
    end_date: NaiveDate,
    options: &ExpansionOptions,
    holiday_calendar: &HashSet<NaiveDate>,
) -> DomainResult<Vec<NaiveDate>> {
    if start_date >= end_date {
        return Err(DomainError::validation("startDate must be < endDate"));
    }
    if (end_date - start_date).num_days() > MAX_WINDOW_DAYS {
        return Err(DomainError::validation("expansion window must be <= 365 days"));
    }
    pattern.assert_can_generate()?;

    let rule = &pattern.recurrence;
    let mut dates = expand_rule(rule, start_date, end_date)?;

    if options.skip_holidays {
        dates.retain(|d| !holiday_calendar.contains(d));
    }

    Ok(dates)
}

fn expand_rule(rule: &RecurrenceRule, start: NaiveDate, end: NaiveDate) -> DomainResult<Vec<NaiveDate>> {
    match rule.frequency {
        Frequency::Custom => Ok(vec![]),
        Frequency::Daily => Ok(expand_daily(start, end, rule.interval as i64)),
        Frequency::Weekly => {
            let days = require_days_of_week(rule)?;
            Ok(expand_weekly(start, end, rule.interval as i64, &days))
        }
        Frequency::Biweekly => {
            let days = require_days_of_week(rule)?;
            Ok(expand_weekly(start, end, 2 * rule.interval as i64, &days))
        }
        Frequency::Monthly => {
            let days = require_days_of_month(rule)?;
            Ok(expand_monthly(start, end, &days))
        }
    }
}

fn require_days_of_week(rule: &RecurrenceRule) -> DomainResult<HashSet<Weekday>> {
    rule.days_of_week
        .as_ref()
        .filter(|d| !d.is_empty())
        .map(|d| d.iter().copied().collect())
        .ok_or_else(|| DomainError::validation("WEEKLY/BIWEEKLY patterns require a day-of-week set"))
}

fn require_days_of_month(rule: &RecurrenceRule) -> DomainResult<HashSet<u8>> {
    rule.days_of_month
        .as_ref()
        .filter(|d| !d.is_empty())
        .map(|d| d.iter().copied().collect())
        .ok_or_else(|| DomainError::validation("MONTHLY patterns require a dates-of-month set"))
}

fn expand_daily(start: NaiveDate, end: NaiveDate, interval: i64) -> Vec<NaiveDate> {
    let mut out = Vec::new();
    let mut date = start;
    while date <= end {
        let offset = (date - start).num_days();
        if offset % interval == 0 {
            out.push(date);
        }
        date += chrono::Duration::days(1);
    }
    out
}

fn expand_weekly(
    start: NaiveDate,
    end: NaiveDate,
    interval_weeks: i64,
    days: &HashSet<Weekday>,
) -> Vec<NaiveDate> {
    let mut out = Vec::new();
    let mut date = start;
    while date <= end {
        let week_index = (date - start).num_days() / 7;
        if week_index % interval_weeks == 0 && days.contains(&Weekday::from(date.weekday())) {
            out.push(date);
        }
        date += chrono::Duration::days(1);
    }
    out
}

fn expand_monthly(start: NaiveDate, end: NaiveDate, days_of_month: &HashSet<u8>) -> Vec<NaiveDate> {
    let mut out = Vec::new();
    let mut date = start;
    while date <= end {
        if days_of_month.contains(&(date.day() as u8)) {
            out.push(date);
        }
        date += chrono::Duration::days(1);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::recurrence::Frequency;
    use crate::models::service_pattern::{PatternStatus, PatternType, ServicePattern};
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn pattern_with(rule: RecurrenceRule) -> ServicePattern {
        ServicePattern {
            meta: crate::models::common::EntityMeta::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()),
            pattern_type: PatternType::Recurring,
            recurrence: rule,
            service_type_code: "PCA".into(),
            duration_minutes: 60,
            required_skills: BTreeSet::new(),
            required_certifications: BTreeSet::new(),
            preferred_caregiver_ids: vec![],
            blocked_caregiver_ids: BTreeSet::new(),
            client_id: Uuid::new_v4(),
            authorization_start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            authorization_end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            weekly_hour_cap: None,
            weekly_visit_cap: None,
            effective_from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            effective_to: None,
            status: PatternStatus::Active,
        }
    }

    #[test]
    fn daily_pattern_generates_five_visits() {
        let rule = RecurrenceRule {
            frequency: Frequency::Daily,
            interval: 1,
            days_of_week: None,
            days_of_month: None,
            start_time: "09:00".into(),
            end_time: Some("10:00".into()),
            timezone: "America/Chicago".into(),
        };
        let pattern = pattern_with(rule);
        let dates = expand(
            &pattern,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            &ExpansionOptions::default(),
            &HashSet::new(),
        )
        .unwrap();
        assert_eq!(dates.len(), 5);
        assert_eq!(dates[0], NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(dates[4], NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
    }

    #[test]
    fn weekly_pattern_only_emits_selected_weekdays() {
        let rule = RecurrenceRule {
            frequency: Frequency::Weekly,
            interval: 1,
            days_of_week: Some(BTreeSet::from([Weekday::Monday, Weekday::Wednesday])),
            days_of_month: None,
            start_time: "09:00".into(),
            end_time: Some("10:00".into()),
            timezone: "America/Chicago".into(),
        };
        let pattern = pattern_with(rule);
        // 2024-01-01 is a Monday.
        let dates = expand(
            &pattern,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 14).unwrap(),
            &ExpansionOptions::default(),
            &HashSet::new(),
        )
        .unwrap();
        assert_eq!(dates.len(), 4);
        for d in &dates {
            assert!(matches!(d.weekday(), chrono::Weekday::Mon | chrono::Weekday::Wed));
        }
    }

    #[test]
    fn monthly_pattern_skips_days_that_dont_occur() {
        let rule = RecurrenceRule {
            frequency: Frequency::Monthly,
            interval: 1,
            days_of_week: None,
            days_of_month: Some(BTreeSet::from([31])),
            start_time: "09:00".into(),
            end_time: Some("10:00".into()),
            timezone: "America/Chicago".into(),
        };
        let pattern = pattern_with(rule);
        let dates = expand(
            &pattern,
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            &ExpansionOptions::default(),
            &HashSet::new(),
        )
        .unwrap();
        // Jan 31 occurs, Feb has no 31st, so only one date in range.
        assert_eq!(dates, vec![NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()]);
    }

    #[test]
    fn custom_frequency_returns_empty() {
        let rule = RecurrenceRule {
            frequency: Frequency::Custom,
            interval: 1,
            days_of_week: None,
            days_of_month: None,
            start_time: "09:00".into(),
            end_time: None,
            timezone: "UTC".into(),
        };
        let pattern = pattern_with(rule);
        let dates = expand(
            &pattern,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            &ExpansionOptions::default(),
            &HashSet::new(),
        )
        .unwrap();
        assert!(dates.is_empty());
    }

    #[test]
    fn skip_holidays_removes_matching_dates() {
        let rule = RecurrenceRule {
            frequency: Frequency::Daily,
            interval: 1,
            days_of_week: None,
            days_of_month: None,
            start_time: "09:00".into(),
            end_time: Some("10:00".into()),
            timezone: "America/Chicago".into(),
        };
        let pattern = pattern_with(rule);
        let mut holidays = HashSet::new();
        holidays.insert(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        let dates = expand(
            &pattern,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            &ExpansionOptions { skip_holidays: true },
            &holidays,
        )
        .unwrap();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()
            ]
        );
    }

    #[test]
    fn window_longer_than_365_days_is_rejected() {
        let rule = RecurrenceRule {
            frequency: Frequency::Daily,
            interval: 1,
            days_of_week: None,
            days_of_month: None,
            start_time: "09:00".into(),
            end_time: Some("10:00".into()),
            timezone: "UTC".into(),
        };
        let pattern = pattern_with(rule);
        let result = expand(
            &pattern,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            &ExpansionOptions::default(),
            &HashSet::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn inactive_pattern_is_rejected() {
        let rule = RecurrenceRule {
            frequency: Frequency::Daily,
            interval: 1,
            days_of_week: None,
            days_of_month: None,
            start_time: "09:00".into(),
            end_time: Some("10:00".into()),
            timezone: "UTC".into(),
        };
        let mut pattern = pattern_with(rule);
        pattern.status = PatternStatus::Draft;
        let result = expand(
            &pattern,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            &ExpansionOptions::default(),
            &HashSet::new(),
        );
        assert!(result.is_err());
    }
}
