//! Opening hours formatting for the restaurant detail view.

use chrono::NaiveTime;

use crate::api::Hours;

const DAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// One formatted row of the weekly schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySchedule {
    pub day: &'static str,
    pub hours: String,
}

/// Format an upstream `HHMM` time as `9:00 PM`.
///
/// Values that are not a valid time of day are returned unchanged.
#[must_use]
pub fn format_time(raw: &str) -> String {
    NaiveTime::parse_from_str(raw, "%H%M")
        .map_or_else(|_| raw.to_string(), |t| t.format("%-I:%M %p").to_string())
}

/// Weekly schedule in Monday-first order, one row per day that has slots.
///
/// Only the first hours block is used; days with several slots list them
/// comma separated.
#[must_use]
pub fn weekly_schedule(hours: &[Hours]) -> Vec<DaySchedule> {
    let Some(block) = hours.first() else {
        return Vec::new();
    };

    DAY_NAMES
        .into_iter()
        .enumerate()
        .filter_map(|(index, day)| {
            let slots: Vec<String> = block
                .open
                .iter()
                .filter(|slot| usize::from(slot.day) == index)
                .map(|slot| format!("{} – {}", format_time(&slot.start), format_time(&slot.end)))
                .collect();
            (!slots.is_empty()).then(|| DaySchedule {
                day,
                hours: slots.join(", "),
            })
        })
        .collect()
}
