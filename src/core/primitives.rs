use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::core::UtcTimestamp;
use crate::error::{ChartError, ChartResult};

pub fn decimal_to_f64(value: Decimal, field_name: &str) -> ChartResult<f64> {
    value.to_f64().ok_or_else(|| {
        ChartError::InvalidData(format!("{field_name} cannot be represented as f64"))
    })
}

/// Truncates sub-second precision; the axis works in whole seconds.
#[must_use]
pub fn datetime_to_utc_timestamp(time: DateTime<Utc>) -> UtcTimestamp {
    time.timestamp()
}
