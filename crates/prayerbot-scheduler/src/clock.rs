//! Schedule clock: pure due-time arithmetic.
//!
//! Trigger slots are `trigger_weekday` at `trigger_hour:00` in a fixed reference
//! offset (UTC by default). A weekly schedule is due at the first slot strictly
//! after `last_triggered_at`. A multi-week schedule measures its gap from the
//! slot the last trigger belongs to, or from `last_triggered_at` itself when the
//! trigger did not answer a slot (creation, a manual run).

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, Offset, Utc};
use prayerbot_core::error::{PrayerError, Result};

use crate::schedule::{Schedule, weekday_index};

/// A trigger recorded less than this long after a slot belongs to that slot.
pub const SLOT_WINDOW_HOURS: i64 = 24;

/// Computes due times for schedules in a fixed reference timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleClock {
    offset: FixedOffset,
}

impl ScheduleClock {
    /// Clock with trigger hours expressed in UTC.
    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    /// Clock with trigger hours expressed at a fixed offset from UTC.
    pub fn with_offset_minutes(minutes: i32) -> Result<Self> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(|offset| Self { offset })
            .ok_or_else(|| {
                PrayerError::Validation(format!("UTC offset of {minutes} minutes is out of range"))
            })
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Next time the schedule fires.
    pub fn next_due(&self, schedule: &Schedule) -> DateTime<Utc> {
        let last = schedule.last_triggered_at;
        let next_slot = self.first_slot_after(schedule, last);
        if schedule.recurrence_weeks <= 1 {
            return next_slot;
        }

        let gap = Duration::weeks(schedule.recurrence_weeks as i64);
        let previous_slot = next_slot - Duration::weeks(1);
        if last - previous_slot < Duration::hours(SLOT_WINDOW_HOURS) {
            return previous_slot + gap;
        }

        let mut candidate = next_slot;
        while candidate - last < gap {
            candidate += Duration::weeks(1);
        }
        candidate
    }

    /// First trigger slot strictly after `after`.
    fn first_slot_after(&self, schedule: &Schedule, after: DateTime<Utc>) -> DateTime<Utc> {
        let local = after.with_timezone(&self.offset);

        let target = weekday_index(schedule.trigger_weekday) as i64;
        let today = local.weekday().num_days_from_monday() as i64;
        let days_ahead = (target - today).rem_euclid(7);

        let hour = NaiveTime::from_hms_opt(schedule.trigger_hour.min(23), 0, 0)
            .unwrap_or(NaiveTime::MIN);
        let slot_local = (local.date_naive() + Duration::days(days_ahead)).and_time(hour);
        let offset_secs = Duration::seconds(self.offset.local_minus_utc() as i64);
        let slot = (slot_local - offset_secs).and_utc();

        if slot <= after { slot + Duration::weeks(1) } else { slot }
    }

    /// Whether the schedule should fire at `now`.
    pub fn is_due(&self, schedule: &Schedule, now: DateTime<Utc>) -> bool {
        now >= self.next_due(schedule)
    }
}

impl Default for ScheduleClock {
    fn default() -> Self {
        Self::utc()
    }
}
