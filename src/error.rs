use thiserror::Error;

use crate::core::SeriesId;

pub type ChartResult<T> = Result<T, ChartError>;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("invalid dimension: {name}={value}")]
    InvalidDimension { name: &'static str, value: f64 },

    #[error("{field} must be finite")]
    NonFiniteValue { field: &'static str },

    #[error("logarithmic price scale requires values > 0, got {value}")]
    NonPositiveLogValue { value: f64 },

    #[error("series data must be sorted by time; item {position} goes back in time")]
    UnsortedSeriesData { position: usize },

    #[error("update time {time} is older than the series' last time {last}")]
    OutOfOrderUpdate { last: i64, time: i64 },

    #[error("unknown series: {0}")]
    UnknownSeries(SeriesId),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("invalid data: {0}")]
    InvalidData(String),
}

pub(crate) fn ensure_finite(value: f64, field: &'static str) -> ChartResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ChartError::NonFiniteValue { field })
    }
}
