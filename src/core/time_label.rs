use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{TickMarkType, TimePoint, UtcTimestamp};
use crate::error::{ChartError, ChartResult};

pub type TimeLabelFormatterFn =
    Arc<dyn Fn(&TimePoint, TickMarkType) -> String + Send + Sync + 'static>;

/// Time-axis label behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeAxisLabelOptions {
    #[serde(default = "default_true")]
    pub time_visible: bool,
    #[serde(default)]
    pub seconds_visible: bool,
    /// Widest label expected on the axis, in pixels.
    #[serde(default = "default_max_label_width")]
    pub max_label_width: f64,
}

impl Default for TimeAxisLabelOptions {
    fn default() -> Self {
        Self {
            time_visible: true,
            seconds_visible: false,
            max_label_width: default_max_label_width(),
        }
    }
}

impl TimeAxisLabelOptions {
    pub fn validate(&self) -> ChartResult<()> {
        if !self.max_label_width.is_finite() || self.max_label_width < 0.0 {
            return Err(ChartError::InvalidDimension {
                name: "max_label_width",
                value: self.max_label_width,
            });
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_max_label_width() -> f64 {
    60.0
}

/// Formats a tick label in UTC.
#[must_use]
pub fn default_time_label(time: &TimePoint, mark_type: TickMarkType) -> String {
    let Some(datetime) = time.to_datetime() else {
        return time.key().to_string();
    };
    let pattern = match mark_type {
        TickMarkType::Year => "%Y",
        TickMarkType::Month => "%b",
        TickMarkType::DayOfMonth => "%-d",
        TickMarkType::Time => "%H:%M",
        TickMarkType::TimeWithSeconds => "%H:%M:%S",
    };
    datetime.format(pattern).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeLabelCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

/// Memoized tick-label formatting; installing a formatter drops every entry.
#[derive(Default)]
pub struct TimeLabelCache {
    formatter: Option<TimeLabelFormatterFn>,
    entries: HashMap<(UtcTimestamp, TickMarkType), String>,
    hits: u64,
    misses: u64,
}

impl fmt::Debug for TimeLabelCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeLabelCache")
            .field("custom_formatter", &self.formatter.is_some())
            .field("size", &self.entries.len())
            .field("hits", &self.hits)
            .field("misses", &self.misses)
            .finish()
    }
}

impl TimeLabelCache {
    const MAX_ENTRIES: usize = 8192;

    pub fn set_formatter(&mut self, formatter: Option<TimeLabelFormatterFn>) {
        self.formatter = formatter;
        self.entries.clear();
    }

    #[must_use]
    pub fn has_custom_formatter(&self) -> bool {
        self.formatter.is_some()
    }

    pub fn label(&mut self, time: &TimePoint, mark_type: TickMarkType) -> String {
        let key = (time.key(), mark_type);
        if let Some(label) = self.entries.get(&key) {
            self.hits = self.hits.saturating_add(1);
            return label.clone();
        }

        self.misses = self.misses.saturating_add(1);
        let label = match &self.formatter {
            Some(formatter) => formatter(time, mark_type),
            None => default_time_label(time, mark_type),
        };
        if self.entries.len() >= Self::MAX_ENTRIES {
            self.entries.clear();
        }
        self.entries.insert(key, label.clone());
        label
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn stats(&self) -> TimeLabelCacheStats {
        TimeLabelCacheStats {
            hits: self.hits,
            misses: self.misses,
            size: self.entries.len(),
        }
    }
}
