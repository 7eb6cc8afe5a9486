use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::primitives::{datetime_to_utc_timestamp, decimal_to_f64};
use crate::core::{BarValues, PlotRowValue, Time, TimePoint};
use crate::error::ChartResult;

/// One data item as submitted for a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeriesDataItem {
    Ohlc {
        time: Time,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },
    Value {
        time: Time,
        value: f64,
    },
    Whitespace {
        time: Time,
    },
}

impl SeriesDataItem {
    #[must_use]
    pub fn value(time: impl Into<Time>, value: f64) -> Self {
        Self::Value {
            time: time.into(),
            value,
        }
    }

    #[must_use]
    pub fn ohlc(time: impl Into<Time>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self::Ohlc {
            time: time.into(),
            open,
            high,
            low,
            close,
        }
    }

    #[must_use]
    pub fn whitespace(time: impl Into<Time>) -> Self {
        Self::Whitespace { time: time.into() }
    }

    /// Converts an exact decimal sample into a single-value item.
    pub fn from_decimal_value(time: DateTime<Utc>, value: Decimal) -> ChartResult<Self> {
        Ok(Self::value(
            datetime_to_utc_timestamp(time),
            decimal_to_f64(value, "value")?,
        ))
    }

    /// Converts exact decimal prices into an OHLC item.
    pub fn from_decimal_ohlc(
        time: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
    ) -> ChartResult<Self> {
        Ok(Self::ohlc(
            datetime_to_utc_timestamp(time),
            decimal_to_f64(open, "open")?,
            decimal_to_f64(high, "high")?,
            decimal_to_f64(low, "low")?,
            decimal_to_f64(close, "close")?,
        ))
    }

    #[must_use]
    pub fn time(&self) -> &Time {
        match self {
            Self::Ohlc { time, .. } | Self::Value { time, .. } | Self::Whitespace { time } => time,
        }
    }

    /// Validates the item and splits it into its time point and row payload.
    pub fn into_row_parts(self) -> ChartResult<(TimePoint, PlotRowValue)> {
        match self {
            Self::Ohlc {
                time,
                open,
                high,
                low,
                close,
            } => Ok((
                TimePoint::from_time(time)?,
                PlotRowValue::Data(BarValues::ohlc(open, high, low, close)?),
            )),
            Self::Value { time, value } => Ok((
                TimePoint::from_time(time)?,
                PlotRowValue::Data(BarValues::single(value)?),
            )),
            Self::Whitespace { time } => Ok((TimePoint::from_time(time)?, PlotRowValue::Whitespace)),
        }
    }
}
