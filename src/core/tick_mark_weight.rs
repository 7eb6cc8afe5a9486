use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{TickMarkWeight, UtcTimestamp};

pub const WEIGHT_YEAR: TickMarkWeight = 70;
pub const WEIGHT_MONTH: TickMarkWeight = 60;
pub const WEIGHT_DAY: TickMarkWeight = 50;
pub const WEIGHT_HOUR_12: TickMarkWeight = 33;
pub const WEIGHT_HOUR_6: TickMarkWeight = 32;
pub const WEIGHT_HOUR_3: TickMarkWeight = 31;
pub const WEIGHT_HOUR_1: TickMarkWeight = 30;
pub const WEIGHT_MINUTE_30: TickMarkWeight = 22;
pub const WEIGHT_MINUTE_5: TickMarkWeight = 21;
pub const WEIGHT_MINUTE_1: TickMarkWeight = 20;
pub const WEIGHT_SECOND: TickMarkWeight = 10;

/// Label style for a tick mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TickMarkType {
    Year,
    Month,
    DayOfMonth,
    Time,
    TimeWithSeconds,
}

impl TickMarkType {
    #[must_use]
    pub fn from_weight(weight: TickMarkWeight, time_visible: bool, seconds_visible: bool) -> Self {
        if weight >= WEIGHT_YEAR {
            Self::Year
        } else if weight >= WEIGHT_MONTH {
            Self::Month
        } else if weight >= WEIGHT_DAY {
            Self::DayOfMonth
        } else if !time_visible {
            Self::DayOfMonth
        } else if weight > WEIGHT_SECOND || !seconds_visible {
            Self::Time
        } else {
            Self::TimeWithSeconds
        }
    }
}

/// Importance of the boundary crossed between two consecutive axis points.
///
/// `previous` is `None` for the first point, which is compared against the
/// epoch and therefore always starts a year.
#[must_use]
pub fn tick_mark_weight(previous: Option<UtcTimestamp>, current: UtcTimestamp) -> TickMarkWeight {
    let Some(previous) = previous else {
        return WEIGHT_YEAR;
    };
    let (Some(prev), Some(cur)) = (to_datetime(previous), to_datetime(current)) else {
        return WEIGHT_SECOND;
    };

    if cur.year() != prev.year() {
        WEIGHT_YEAR
    } else if cur.month() != prev.month() {
        WEIGHT_MONTH
    } else if cur.day() != prev.day() {
        WEIGHT_DAY
    } else if crossed(&prev, &cur, 12 * 3600) {
        WEIGHT_HOUR_12
    } else if crossed(&prev, &cur, 6 * 3600) {
        WEIGHT_HOUR_6
    } else if crossed(&prev, &cur, 3 * 3600) {
        WEIGHT_HOUR_3
    } else if crossed(&prev, &cur, 3600) {
        WEIGHT_HOUR_1
    } else if crossed(&prev, &cur, 30 * 60) {
        WEIGHT_MINUTE_30
    } else if crossed(&prev, &cur, 5 * 60) {
        WEIGHT_MINUTE_5
    } else if crossed(&prev, &cur, 60) {
        WEIGHT_MINUTE_1
    } else {
        WEIGHT_SECOND
    }
}

fn to_datetime(timestamp: UtcTimestamp) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp, 0)
}

// Same calendar day is guaranteed by the caller.
fn crossed(previous: &DateTime<Utc>, current: &DateTime<Utc>, period_seconds: u32) -> bool {
    previous.num_seconds_from_midnight() / period_seconds
        != current.num_seconds_from_midnight() / period_seconds
}
