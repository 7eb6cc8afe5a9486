use serde::{Deserialize, Serialize};

use crate::core::{
    LogicalRange, PlotList, PlotRow, PlotRowSearchMode, PriceRange, SeriesId, StrictRange,
    TimePoint,
};
use crate::error::{ChartError, ChartResult};
use crate::model::{AutoScaleSource, SeriesRowsUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    Line,
    Area,
    Baseline,
    Histogram,
    Bar,
    Candlestick,
}

impl SeriesKind {
    /// Bar-like kinds autoscale on the high/low envelope, the rest on close.
    #[must_use]
    pub fn uses_ohlc(self) -> bool {
        matches!(self, Self::Bar | Self::Candlestick)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesOptions {
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default = "default_price_scale_id")]
    pub price_scale_id: String,
    #[serde(default = "default_min_move")]
    pub min_move: f64,
}

impl Default for SeriesOptions {
    fn default() -> Self {
        Self {
            visible: default_visible(),
            price_scale_id: default_price_scale_id(),
            min_move: default_min_move(),
        }
    }
}

impl SeriesOptions {
    pub fn validate(&self) -> ChartResult<()> {
        if self.price_scale_id.trim().is_empty() {
            return Err(ChartError::InvalidData(
                "series price scale id must not be empty".to_owned(),
            ));
        }
        if !self.min_move.is_finite() || self.min_move <= 0.0 {
            return Err(ChartError::InvalidDimension {
                name: "min_move",
                value: self.min_move,
            });
        }
        Ok(())
    }
}

fn default_visible() -> bool {
    true
}

fn default_price_scale_id() -> String {
    "right".to_owned()
}

fn default_min_move() -> f64 {
    0.01
}

/// Data coverage of a logical range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarsInfo {
    pub from: TimePoint,
    pub to: TimePoint,
    /// Bars available left of the range; negative when the range starts
    /// before the data.
    pub bars_before: f64,
    pub bars_after: f64,
}

#[derive(Debug, Clone)]
pub struct Series {
    id: SeriesId,
    kind: SeriesKind,
    options: SeriesOptions,
    data: PlotList,
}

impl Series {
    #[must_use]
    pub fn new(id: SeriesId, kind: SeriesKind, options: SeriesOptions) -> Self {
        Self {
            id,
            kind,
            options,
            data: PlotList::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> SeriesId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> SeriesKind {
        self.kind
    }

    #[must_use]
    pub fn options(&self) -> &SeriesOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: SeriesOptions) -> ChartResult<()> {
        options.validate()?;
        self.options = options;
        Ok(())
    }

    #[must_use]
    pub fn data(&self) -> &PlotList {
        &self.data
    }

    pub fn apply_rows(&mut self, rows: SeriesRowsUpdate) {
        match rows {
            SeriesRowsUpdate::Replace(rows) => self.data.set_rows(rows),
            SeriesRowsUpdate::Extend(rows) => {
                for row in rows {
                    self.data.insert(row);
                }
            }
            SeriesRowsUpdate::UpdateLast(row) => {
                self.data.insert(row);
            }
        }
    }

    /// First data row whose index is within `visible_bars`.
    #[must_use]
    pub fn first_data_row(&self, visible_bars: StrictRange) -> Option<&PlotRow> {
        self.data
            .rows_in_range(visible_bars.left(), visible_bars.right())
            .iter()
            .find(|row| !row.is_whitespace())
    }

    #[must_use]
    pub fn bars_in_logical_range(&self, range: LogicalRange) -> Option<BarsInfo> {
        let strict = range.to_strict();
        let first = self
            .data
            .search(strict.left(), PlotRowSearchMode::NearestRight)?;
        let last = self
            .data
            .search(strict.right(), PlotRowSearchMode::NearestLeft)?;
        if last.index < first.index {
            return None;
        }
        let data_first = self.data.first_index()?;
        let data_last = self.data.last_index()?;

        let bars_before = if first.index == data_first {
            range.from - data_first as f64
        } else {
            (first.index - data_first) as f64
        };
        let bars_after = if last.index == data_last {
            data_last as f64 - range.to
        } else {
            (data_last - last.index) as f64
        };
        Some(BarsInfo {
            from: first.time.clone(),
            to: last.time.clone(),
            bars_before,
            bars_after,
        })
    }
}

impl AutoScaleSource for Series {
    fn visible(&self) -> bool {
        self.options.visible && !self.data.is_empty()
    }

    fn first_value(&self, visible_bars: StrictRange) -> Option<f64> {
        self.first_data_row(visible_bars)
            .and_then(PlotRow::values)
            .map(|values| values.close)
    }

    fn autoscale_range(&self, visible_bars: StrictRange) -> Option<PriceRange> {
        if self.kind.uses_ohlc() {
            return self
                .data
                .min_max_on_range(visible_bars.left(), visible_bars.right());
        }
        self.data
            .rows_in_range(visible_bars.left(), visible_bars.right())
            .iter()
            .filter_map(PlotRow::values)
            .map(|values| PriceRange::new(values.close, values.close))
            .reduce(PriceRange::merge)
    }

    fn min_move(&self) -> f64 {
        self.options.min_move
    }
}
