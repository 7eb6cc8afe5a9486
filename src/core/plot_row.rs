use serde::{Deserialize, Serialize};

use crate::core::{TimePoint, TimePointIndex};
use crate::error::{ChartError, ChartResult};

/// Open/high/low/close tuple; single-value series repeat the value four times.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarValues {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl BarValues {
    /// Builds a validated OHLC tuple.
    ///
    /// Invariants:
    /// - all values are finite
    /// - `low <= high`
    /// - `open` and `close` are within `[low, high]`
    pub fn ohlc(open: f64, high: f64, low: f64, close: f64) -> ChartResult<Self> {
        if !open.is_finite() || !high.is_finite() || !low.is_finite() || !close.is_finite() {
            return Err(ChartError::NonFiniteValue {
                field: "ohlc value",
            });
        }
        if low > high {
            return Err(ChartError::InvalidData(
                "ohlc low must be <= high".to_owned(),
            ));
        }
        if open < low || open > high || close < low || close > high {
            return Err(ChartError::InvalidData(
                "ohlc open/close must be within low/high range".to_owned(),
            ));
        }
        Ok(Self {
            open,
            high,
            low,
            close,
        })
    }

    pub fn single(value: f64) -> ChartResult<Self> {
        if !value.is_finite() {
            return Err(ChartError::NonFiniteValue {
                field: "series value",
            });
        }
        Ok(Self {
            open: value,
            high: value,
            low: value,
            close: value,
        })
    }
}

/// Row payload: either values or a placeholder that only occupies the axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PlotRowValue {
    Data(BarValues),
    Whitespace,
}

impl PlotRowValue {
    #[must_use]
    pub fn is_whitespace(self) -> bool {
        matches!(self, Self::Whitespace)
    }

    #[must_use]
    pub fn values(self) -> Option<BarValues> {
        match self {
            Self::Data(values) => Some(values),
            Self::Whitespace => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotRow {
    pub index: TimePointIndex,
    pub time: TimePoint,
    pub value: PlotRowValue,
}

impl PlotRow {
    #[must_use]
    pub fn new(index: TimePointIndex, time: TimePoint, value: PlotRowValue) -> Self {
        Self { index, time, value }
    }

    #[must_use]
    pub fn whitespace(index: TimePointIndex, time: TimePoint) -> Self {
        Self::new(index, time, PlotRowValue::Whitespace)
    }

    #[must_use]
    pub fn is_whitespace(&self) -> bool {
        self.value.is_whitespace()
    }

    #[must_use]
    pub fn values(&self) -> Option<BarValues> {
        self.value.values()
    }
}
