//! Availability Engine (spec.md §4.3). Pure function over a caller-supplied
//! list of the caregiver's existing visits for the date.

use serde::Serialize;

use crate::models::visit::Visit;

const TRAVEL_BUFFER_MINUTES: u32 = 30;
const DEFAULT_WINDOW_START_MINUTES: u32 = 8 * 60;
const DEFAULT_WINDOW_END_MINUTES: u32 = 18 * 60;
const DEFAULT_SLOT_DURATION_MINUTES: u32 = 60;

fn busy_intervals(existing: &[Visit], include_travel: bool) -> Vec<(u32, u32)> {
    existing
        .iter()
        .filter_map(|v| v.minute_interval().ok())
        .map(|(start, end)| {
            if include_travel {
                (
                    start.saturating_sub(TRAVEL_BUFFER_MINUTES),
                    end + TRAVEL_BUFFER_MINUTES,
                )
            } else {
                (start, end)
            }
        })
        .collect()
}

fn overlaps_any(intervals: &[(u32, u32)], start: u32, end: u32) -> bool {
    intervals.iter().any(|&(s, e)| start < e && s < end)
}

/// `isAvailable(caregiverId, date, start, end, includeTravel)`. When
/// `start`/`end` are omitted, the result is "any visit exists on the date".
pub fn is_available(
    existing: &[Visit],
    start: Option<u32>,
    end: Option<u32>,
    include_travel: bool,
) -> bool {
    let intervals = busy_intervals(existing, include_travel);
    match (start, end) {
        (Some(s), Some(e)) => !overlaps_any(&intervals, s, e),
        _ => intervals.is_empty(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySlot {
    pub start_minutes: u32,
    pub end_minutes: u32,
    pub available: bool,
    pub reason: Option<String>,
}

/// `availabilitySlots(caregiverId, date, duration, includeTravel)` across
/// the default work window `08:00-18:00`, stepping by `duration`.
pub fn availability_slots(
    existing: &[Visit],
    duration_minutes: Option<u32>,
    include_travel: bool,
) -> Vec<AvailabilitySlot> {
    let step = duration_minutes.unwrap_or(DEFAULT_SLOT_DURATION_MINUTES).max(1);
    let intervals = busy_intervals(existing, include_travel);
    let mut slots = Vec::new();
    let mut cursor = DEFAULT_WINDOW_START_MINUTES;
    while cursor + step <= DEFAULT_WINDOW_END_MINUTES {
        let end = cursor + step;
        let available = !overlaps_any(&intervals, cursor, end);
        slots.push(AvailabilitySlot {
            start_minutes: cursor,
            end_minutes: end,
            available,
            reason: if available {
                None
            } else {
                Some("conflicts with an existing visit".into())
            },
        });
        cursor += step;
    }
    slots
}
