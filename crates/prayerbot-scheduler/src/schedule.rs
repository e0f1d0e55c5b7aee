//! Schedule definitions: one recurrence rule per prayer group.

use chrono::{DateTime, Utc, Weekday};
use prayerbot_core::error::{PrayerError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_RECURRENCE_WEEKS: u32 = 1;
pub const DEFAULT_TRIGGER_WEEKDAY: Weekday = Weekday::Wed;
pub const DEFAULT_TRIGGER_HOUR: u32 = 23;
/// Upper bound on `recurrence_weeks`; keeps due-time arithmetic in range.
pub const MAX_RECURRENCE_WEEKS: u32 = 52;

/// When a group gets paired up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Pair the group every N weeks (>= 1).
    pub recurrence_weeks: u32,
    pub trigger_weekday: Weekday,
    /// Hour of day (0-23) in the clock's reference timezone.
    pub trigger_hour: u32,
    /// Last trigger advance, or group creation time.
    pub last_triggered_at: DateTime<Utc>,
}

impl Schedule {
    /// Schedule given to a freshly created group: weekly, Wednesday 23:00.
    pub fn new_default(created_at: DateTime<Utc>) -> Self {
        Self {
            recurrence_weeks: DEFAULT_RECURRENCE_WEEKS,
            trigger_weekday: DEFAULT_TRIGGER_WEEKDAY,
            trigger_hour: DEFAULT_TRIGGER_HOUR,
            last_triggered_at: created_at,
        }
    }

    /// Reject recurrence or hour values the clock cannot honor.
    pub fn validate(recurrence_weeks: u32, trigger_hour: u32) -> Result<()> {
        if !(1..=MAX_RECURRENCE_WEEKS).contains(&recurrence_weeks) {
            return Err(PrayerError::Validation(format!(
                "recurrence must be between 1 and {MAX_RECURRENCE_WEEKS} weeks, got {recurrence_weeks}"
            )));
        }
        if trigger_hour > 23 {
            return Err(PrayerError::Validation(format!(
                "hour must be between 0 and 23, got {trigger_hour}"
            )));
        }
        Ok(())
    }
}

/// A group together with its members and schedule, read as one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupRecord {
    pub name: String,
    pub members: Vec<String>,
    pub schedule: Schedule,
}

/// Group names are case-insensitive: trim and lowercase.
pub fn canonical_group_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PrayerError::Validation("group name must not be empty".into()));
    }
    Ok(name.to_lowercase())
}

/// Monday=0 ... Sunday=6.
pub fn weekday_index(day: Weekday) -> u32 {
    day.num_days_from_monday()
}

pub fn weekday_from_index(index: u32) -> Result<Weekday> {
    match index {
        0 => Ok(Weekday::Mon),
        1 => Ok(Weekday::Tue),
        2 => Ok(Weekday::Wed),
        3 => Ok(Weekday::Thu),
        4 => Ok(Weekday::Fri),
        5 => Ok(Weekday::Sat),
        6 => Ok(Weekday::Sun),
        _ => Err(PrayerError::Validation(format!(
            "day must be between 0 (Monday) and 6 (Sunday), got {index}"
        ))),
    }
}

/// Accepts `friday`, `Fri` or `4` (Monday=0).
pub fn parse_weekday(input: &str) -> Result<Weekday> {
    let input = input.trim();
    if let Ok(index) = input.parse::<u32>() {
        return weekday_from_index(index);
    }
    input
        .parse::<Weekday>()
        .map_err(|_| PrayerError::Validation(format!("'{input}' is not a day of the week")))
}

/// Full English day name, for replies.
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
