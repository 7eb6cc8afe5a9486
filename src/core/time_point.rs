use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

/// UTC timestamp in whole seconds.
pub type UtcTimestamp = i64;

/// Calendar day without intraday time, interpreted as UTC midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BusinessDay {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl BusinessDay {
    pub fn new(year: i32, month: u32, day: u32) -> ChartResult<Self> {
        let day = Self { year, month, day };
        day.to_naive_date()?;
        Ok(day)
    }

    /// Parses the `YYYY-MM-DD` form.
    pub fn parse(text: &str) -> ChartResult<Self> {
        let date = NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").map_err(|e| {
            ChartError::InvalidData(format!("business day `{text}` is not YYYY-MM-DD: {e}"))
        })?;
        Ok(Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        })
    }

    pub fn to_utc_timestamp(self) -> ChartResult<UtcTimestamp> {
        let midnight = self
            .to_naive_date()?
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| ChartError::InvalidData("business day midnight overflow".to_owned()))?;
        Ok(midnight.and_utc().timestamp())
    }

    fn to_naive_date(self) -> ChartResult<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day).ok_or_else(|| {
            ChartError::InvalidData(format!(
                "invalid business day {}-{:02}-{:02}",
                self.year, self.month, self.day
            ))
        })
    }
}

/// Time value exactly as the caller supplied it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Time {
    Timestamp(UtcTimestamp),
    BusinessDay(BusinessDay),
    /// `YYYY-MM-DD` business day string.
    Text(String),
}

impl From<UtcTimestamp> for Time {
    fn from(value: UtcTimestamp) -> Self {
        Self::Timestamp(value)
    }
}

impl From<i32> for Time {
    fn from(value: i32) -> Self {
        Self::Timestamp(UtcTimestamp::from(value))
    }
}

impl From<BusinessDay> for Time {
    fn from(value: BusinessDay) -> Self {
        Self::BusinessDay(value)
    }
}

impl From<&str> for Time {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

/// Authoritative part of a time point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeValue {
    Timestamp(UtcTimestamp),
    BusinessDay(BusinessDay),
}

/// Canonical point on the chart timeline.
///
/// Equality, hashing and ordering only look at the authoritative value
/// (`key`); a business day sits on the same numeric timeline as timestamps
/// at the UTC midnight it denotes. The original caller value rides along
/// untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimePoint {
    value: TimeValue,
    key: UtcTimestamp,
    original_time: Time,
}

impl TimePoint {
    pub fn from_time(time: Time) -> ChartResult<Self> {
        let value = match &time {
            Time::Timestamp(ts) => TimeValue::Timestamp(*ts),
            Time::BusinessDay(day) => TimeValue::BusinessDay(BusinessDay::new(
                day.year, day.month, day.day,
            )?),
            Time::Text(text) => TimeValue::BusinessDay(BusinessDay::parse(text)?),
        };
        let key = match value {
            TimeValue::Timestamp(ts) => ts,
            TimeValue::BusinessDay(day) => day.to_utc_timestamp()?,
        };
        Ok(Self {
            value,
            key,
            original_time: time,
        })
    }

    #[must_use]
    pub fn from_timestamp(timestamp: UtcTimestamp) -> Self {
        Self {
            value: TimeValue::Timestamp(timestamp),
            key: timestamp,
            original_time: Time::Timestamp(timestamp),
        }
    }

    #[must_use]
    pub fn value(&self) -> TimeValue {
        self.value
    }

    /// Seconds since the Unix epoch used for ordering.
    #[must_use]
    pub fn key(&self) -> UtcTimestamp {
        self.key
    }

    #[must_use]
    pub fn original_time(&self) -> &Time {
        &self.original_time
    }

    #[must_use]
    pub fn is_business_day(&self) -> bool {
        matches!(self.value, TimeValue::BusinessDay(_))
    }

    #[must_use]
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.key, 0)
    }
}

impl PartialEq for TimePoint {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for TimePoint {}

impl Hash for TimePoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for TimePoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimePoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}
