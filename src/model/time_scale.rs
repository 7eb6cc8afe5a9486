use std::cell::Cell;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::{
    LogicalRange, StrictRange, TickMarkType, TickMarkWeight, TickMarks, TimeAxisLabelOptions,
    TimeLabelCache, TimeLabelCacheStats, TimeLabelFormatterFn, TimePoint, TimePointIndex,
};
use crate::error::{ChartError, ChartResult, ensure_finite};
use crate::model::{TimeScalePoint, TimeScaleUpdate};

const MIN_VISIBLE_BARS_COUNT: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeScaleOptions {
    #[serde(default)]
    pub right_offset: f64,
    #[serde(default = "default_bar_spacing")]
    pub bar_spacing: f64,
    #[serde(default = "default_min_bar_spacing")]
    pub min_bar_spacing: f64,
    /// `0` means half of the width.
    #[serde(default)]
    pub max_bar_spacing: f64,
}

impl Default for TimeScaleOptions {
    fn default() -> Self {
        Self {
            right_offset: 0.0,
            bar_spacing: default_bar_spacing(),
            min_bar_spacing: default_min_bar_spacing(),
            max_bar_spacing: 0.0,
        }
    }
}

impl TimeScaleOptions {
    pub fn validate(&self) -> ChartResult<()> {
        ensure_finite(self.right_offset, "right_offset")?;
        for (name, value) in [
            ("bar_spacing", self.bar_spacing),
            ("min_bar_spacing", self.min_bar_spacing),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ChartError::InvalidDimension { name, value });
            }
        }
        if !self.max_bar_spacing.is_finite() || self.max_bar_spacing < 0.0 {
            return Err(ChartError::InvalidDimension {
                name: "max_bar_spacing",
                value: self.max_bar_spacing,
            });
        }
        Ok(())
    }
}

fn default_bar_spacing() -> f64 {
    6.0
}

fn default_min_bar_spacing() -> f64 {
    0.5
}

/// One visible, labelled time-axis mark.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeMark {
    pub index: TimePointIndex,
    pub coordinate: f64,
    pub label: String,
    pub weight: TickMarkWeight,
}

#[derive(Debug, Clone, Copy)]
struct Geometry {
    width: f64,
    base_index: f64,
    right_offset: f64,
    bar_spacing: f64,
}

impl Geometry {
    fn index_to_coordinate(self, index: TimePointIndex) -> f64 {
        let delta_from_right = self.base_index + self.right_offset - index as f64;
        self.width - (delta_from_right + 0.5) * self.bar_spacing - 1.0
    }
}

/// Horizontal index <-> pixel mapping over the merged axis.
///
/// Points only change through [`TimeScale::apply_update`].
#[derive(Debug)]
pub struct TimeScale {
    options: TimeScaleOptions,
    label_options: TimeAxisLabelOptions,
    width: f64,
    base_index_or_null: Option<TimePointIndex>,
    right_offset: f64,
    points: Vec<TimeScalePoint>,
    bar_spacing: f64,
    tick_marks: TickMarks,
    labels: TimeLabelCache,
    // Recomputed lazily on read.
    visible_range: Cell<Option<LogicalRange>>,
    visible_range_invalidated: Cell<bool>,
}

impl Default for TimeScale {
    fn default() -> Self {
        Self::new(TimeScaleOptions::default(), TimeAxisLabelOptions::default())
    }
}

impl TimeScale {
    #[must_use]
    pub fn new(options: TimeScaleOptions, label_options: TimeAxisLabelOptions) -> Self {
        Self {
            width: 0.0,
            base_index_or_null: None,
            right_offset: options.right_offset,
            points: Vec::new(),
            bar_spacing: options.bar_spacing,
            tick_marks: TickMarks::new(),
            labels: TimeLabelCache::default(),
            visible_range: Cell::new(None),
            visible_range_invalidated: Cell::new(true),
            options,
            label_options,
        }
    }

    #[must_use]
    pub fn options(&self) -> TimeScaleOptions {
        self.options
    }

    pub fn apply_options(&mut self, options: TimeScaleOptions) -> ChartResult<()> {
        options.validate()?;
        self.options = options;
        self.set_bar_spacing(options.bar_spacing)?;
        self.set_right_offset(options.right_offset)?;
        Ok(())
    }

    #[must_use]
    pub fn label_options(&self) -> TimeAxisLabelOptions {
        self.label_options
    }

    pub fn set_label_options(&mut self, options: TimeAxisLabelOptions) -> ChartResult<()> {
        options.validate()?;
        self.label_options = options;
        Ok(())
    }

    pub fn set_label_formatter(&mut self, formatter: Option<TimeLabelFormatterFn>) {
        self.labels.set_formatter(formatter);
    }

    #[must_use]
    pub fn label_cache_stats(&self) -> TimeLabelCacheStats {
        self.labels.stats()
    }

    /// Applies an axis delta: drops points from the first changed index and
    /// appends the new tail.
    pub fn apply_update(&mut self, update: &TimeScaleUpdate) {
        if let (Some(points), Some(first_changed)) = (&update.points, update.first_changed_index)
        {
            let keep = usize::try_from(first_changed)
                .unwrap_or(0)
                .min(self.points.len());
            self.points.truncate(keep);
            self.points.extend(points.iter().cloned());
            self.tick_marks.truncate_from(first_changed);
            self.tick_marks.merge(update.marks.iter().cloned());
            trace!(
                first_changed,
                appended = points.len(),
                len = self.points.len(),
                "time scale points updated"
            );
        }
        self.base_index_or_null = update.base_index;
        self.invalidate_visible_range();
        self.correct_offset();
    }

    #[must_use]
    pub fn points(&self) -> &[TimeScalePoint] {
        &self.points
    }

    #[must_use]
    pub fn time_at(&self, index: TimePointIndex) -> Option<&TimePoint> {
        usize::try_from(index)
            .ok()
            .and_then(|position| self.points.get(position))
            .map(|point| &point.time)
    }

    pub fn set_width(&mut self, new_width: f64) -> ChartResult<()> {
        if !new_width.is_finite() || new_width <= 0.0 {
            return Err(ChartError::InvalidDimension {
                name: "time_scale_width",
                value: new_width,
            });
        }
        if (self.width - new_width).abs() <= f64::EPSILON {
            return Ok(());
        }

        self.width = new_width;
        self.invalidate_visible_range();
        self.correct_bar_spacing();
        self.correct_offset();
        Ok(())
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0.0 || self.points.is_empty() || self.base_index_or_null.is_none()
    }

    #[must_use]
    pub fn base_index(&self) -> TimePointIndex {
        self.base_index_or_null.unwrap_or(0)
    }

    #[must_use]
    pub fn right_offset(&self) -> f64 {
        self.right_offset
    }

    pub fn set_right_offset(&mut self, offset: f64) -> ChartResult<()> {
        ensure_finite(offset, "right_offset")?;
        self.right_offset = offset;
        self.invalidate_visible_range();
        self.correct_offset();
        Ok(())
    }

    #[must_use]
    pub fn bar_spacing(&self) -> f64 {
        self.bar_spacing
    }

    /// Sets the bar spacing, clamped to the configured bounds.
    pub fn set_bar_spacing(&mut self, new_bar_spacing: f64) -> ChartResult<()> {
        if !new_bar_spacing.is_finite() || new_bar_spacing <= 0.0 {
            return Err(ChartError::InvalidDimension {
                name: "bar_spacing",
                value: new_bar_spacing,
            });
        }
        self.bar_spacing = new_bar_spacing;
        self.correct_bar_spacing();
        self.correct_offset();
        self.invalidate_visible_range();
        Ok(())
    }

    /// Shows `[left, right]` across the full width.
    pub fn set_visible_range(&mut self, strict_range: StrictRange) -> ChartResult<()> {
        if self.width <= 0.0 {
            return Err(ChartError::InvalidData(
                "cannot set visible range before width".to_owned(),
            ));
        }
        self.set_bar_spacing(self.width / strict_range.count() as f64)?;
        self.right_offset = (strict_range.right() - self.base_index()) as f64;
        self.correct_offset();
        self.invalidate_visible_range();
        Ok(())
    }

    pub fn set_visible_logical_range(&mut self, range: LogicalRange) -> ChartResult<()> {
        ensure_finite(range.from, "logical_range.from")?;
        ensure_finite(range.to, "logical_range.to")?;
        if range.to < range.from {
            return Err(ChartError::InvalidData(
                "logical range must satisfy from <= to".to_owned(),
            ));
        }
        if self.width <= 0.0 {
            return Err(ChartError::InvalidData(
                "cannot set visible range before width".to_owned(),
            ));
        }
        self.set_bar_spacing(self.width / (range.to - range.from + 1.0))?;
        self.right_offset = range.to - self.base_index() as f64;
        self.correct_offset();
        self.invalidate_visible_range();
        Ok(())
    }

    /// Fits every axis point into the width, keeping the configured right offset.
    pub fn fit_content(&mut self) -> ChartResult<()> {
        let (Some(first), Some(last)) = (self.first_index(), self.last_index()) else {
            return Ok(());
        };
        let right_offset_bars = self.options.right_offset as TimePointIndex;
        self.set_visible_range(StrictRange::new(first, last + right_offset_bars))?;
        self.right_offset = self.options.right_offset;
        self.correct_offset();
        self.invalidate_visible_range();
        Ok(())
    }

    /// `None` while the scale has no width or no points.
    #[must_use]
    pub fn index_to_coordinate(&self, index: TimePointIndex) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(self.geometry().index_to_coordinate(index))
    }

    pub fn coordinate_to_index(&self, x: f64) -> ChartResult<TimePointIndex> {
        Ok(self.coordinate_to_float_index(x)?.ceil() as TimePointIndex)
    }

    pub fn coordinate_to_float_index(&self, x: f64) -> ChartResult<f64> {
        ensure_finite(x, "coordinate")?;
        let delta_from_right = (self.width - 1.0 - x) / self.bar_spacing;
        let index = self.base_index() as f64 + self.right_offset - delta_from_right;
        Ok((index * 1_000_000.0).round() / 1_000_000.0)
    }

    pub fn visible_logical_range(&self) -> Option<LogicalRange> {
        if self.visible_range_invalidated.replace(false) {
            self.visible_range.set(self.compute_visible_range());
        }
        self.visible_range.get()
    }

    pub fn visible_strict_range(&self) -> Option<StrictRange> {
        self.visible_logical_range().map(LogicalRange::to_strict)
    }

    #[must_use]
    pub fn first_index(&self) -> Option<TimePointIndex> {
        if self.points.is_empty() { None } else { Some(0) }
    }

    #[must_use]
    pub fn last_index(&self) -> Option<TimePointIndex> {
        self.points
            .len()
            .checked_sub(1)
            .map(|last| last as TimePointIndex)
    }

    /// Thinned, labelled marks inside the visible range.
    pub fn marks(&mut self) -> Vec<TimeMark> {
        let max_label_width = self.label_options.max_label_width;
        self.marks_for_label_width(max_label_width)
    }

    pub fn marks_for_label_width(&mut self, max_label_width: f64) -> Vec<TimeMark> {
        let Some(visible) = self.visible_strict_range() else {
            return Vec::new();
        };
        let geometry = self.geometry();
        let TimeAxisLabelOptions {
            time_visible,
            seconds_visible,
            ..
        } = self.label_options;

        let selected = self
            .tick_marks
            .build_for_spacing(self.bar_spacing, max_label_width);
        let mut marks = Vec::new();
        for mark in selected.iter().filter(|mark| visible.contains(mark.index)) {
            let mark_type = TickMarkType::from_weight(mark.weight, time_visible, seconds_visible);
            marks.push(TimeMark {
                index: mark.index,
                coordinate: geometry.index_to_coordinate(mark.index),
                label: self.labels.label(&mark.time, mark_type),
                weight: mark.weight,
            });
        }
        marks
    }

    fn geometry(&self) -> Geometry {
        Geometry {
            width: self.width,
            base_index: self.base_index() as f64,
            right_offset: self.right_offset,
            bar_spacing: self.bar_spacing,
        }
    }

    fn invalidate_visible_range(&self) {
        self.visible_range_invalidated.set(true);
    }

    fn compute_visible_range(&self) -> Option<LogicalRange> {
        if self.is_empty() {
            return None;
        }
        let new_bars_length = self.width / self.bar_spacing;
        let right_border = self.right_offset + self.base_index() as f64;
        let left_border = right_border - new_bars_length + 1.0;
        Some(LogicalRange::new(left_border, right_border))
    }

    fn correct_bar_spacing(&mut self) {
        let min = self.min_bar_spacing();
        let max = self.max_bar_spacing().max(min);
        let clamped = self.bar_spacing.clamp(min, max);
        if (clamped - self.bar_spacing).abs() > f64::EPSILON {
            self.bar_spacing = clamped;
            self.invalidate_visible_range();
        }
    }

    fn min_bar_spacing(&self) -> f64 {
        self.options.min_bar_spacing
    }

    fn max_bar_spacing(&self) -> f64 {
        if self.options.max_bar_spacing > 0.0 {
            self.options.max_bar_spacing
        } else if self.width > 0.0 {
            self.width * 0.5
        } else {
            f64::INFINITY
        }
    }

    fn min_right_offset(&self) -> Option<f64> {
        let first = self.first_index()?;
        let base = self.base_index_or_null?;
        let bars_estimation = MIN_VISIBLE_BARS_COUNT.min(self.points.len() as f64);
        Some(first as f64 - base as f64 - 1.0 + bars_estimation)
    }

    fn max_right_offset(&self) -> f64 {
        self.width / self.bar_spacing - MIN_VISIBLE_BARS_COUNT.min(self.points.len() as f64)
    }

    fn correct_offset(&mut self) {
        if self.width <= 0.0 {
            return;
        }
        if let Some(min_right_offset) = self.min_right_offset()
            && self.right_offset < min_right_offset
        {
            self.right_offset = min_right_offset;
            self.invalidate_visible_range();
        }
        let max_right_offset = self.max_right_offset();
        if self.right_offset > max_right_offset {
            self.right_offset = max_right_offset;
            self.invalidate_visible_range();
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::{TimeScale, TimeScaleOptions};
    use crate::core::{LogicalRange, SeriesDataItem, SeriesId, TimeAxisLabelOptions};
    use crate::model::DataLayer;

    const DAY: i64 = 86_400;
    const JAN_1_2024: i64 = 1_704_067_200;

    fn daily_scale(days: i64, width: f64) -> TimeScale {
        let mut layer = DataLayer::new();
        let items = (0..days)
            .map(|day| SeriesDataItem::value(JAN_1_2024 + day * DAY, day as f64))
            .collect();
        let response = layer
            .set_series_data(SeriesId::new(1), items)
            .expect("set data");
        let mut scale = TimeScale::new(TimeScaleOptions::default(), TimeAxisLabelOptions::default());
        scale.set_width(width).expect("width");
        scale.apply_update(&response.time_scale);
        scale
    }

    #[test]
    fn index_coordinate_round_trip_matches_right_anchored_layout() {
        let mut scale = daily_scale(200, 1000.0);
        scale.set_bar_spacing(6.0).expect("spacing");
        scale.set_right_offset(0.0).expect("offset");

        let x = scale.index_to_coordinate(199).expect("coordinate");
        assert_relative_eq!(x, 1000.0 - 0.5 * 6.0 - 1.0, epsilon = 1e-9);
        let logical = scale.coordinate_to_float_index(x).expect("index");
        assert_relative_eq!(logical, 198.5, epsilon = 1e-9);
    }

    #[test]
    fn bar_spacing_is_clamped_to_bounds() {
        let mut scale = daily_scale(10, 100.0);
        scale.set_bar_spacing(0.01).expect("spacing");
        assert_relative_eq!(scale.bar_spacing(), 0.5);
        scale.set_bar_spacing(500.0).expect("spacing");
        assert_relative_eq!(scale.bar_spacing(), 50.0);
        assert!(scale.set_bar_spacing(f64::NAN).is_err());
    }

    #[test]
    fn visible_logical_range_round_trips() {
        let mut scale = daily_scale(100, 500.0);
        scale
            .set_visible_logical_range(LogicalRange::new(40.0, 89.0))
            .expect("range");
        let range = scale.visible_logical_range().expect("visible");
        assert_relative_eq!(range.from, 40.0, epsilon = 1e-9);
        assert_relative_eq!(range.to, 89.0, epsilon = 1e-9);
    }

    #[test]
    fn fit_content_shows_every_point() {
        let mut scale = daily_scale(50, 500.0);
        scale.fit_content().expect("fit");
        let strict = scale.visible_strict_range().expect("visible");
        assert!(strict.left() <= 0);
        assert!(strict.right() >= 49);
        assert_relative_eq!(scale.bar_spacing(), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn marks_are_thinned_and_labelled() {
        let mut scale = daily_scale(90, 900.0);
        scale.fit_content().expect("fit");
        let marks = scale.marks_for_label_width(50.0);
        assert!(!marks.is_empty());
        assert_eq!(marks[0].label, "2024");
        for pair in marks.windows(2) {
            assert!(pair[1].index - pair[0].index >= 5);
            assert!(pair[1].coordinate > pair[0].coordinate);
        }
        assert!(marks.iter().any(|mark| mark.label == "Feb"));
    }

    #[test]
    fn empty_scale_has_no_coordinates_or_marks() {
        let mut scale = TimeScale::default();
        assert!(scale.index_to_coordinate(0).is_none());
        assert!(scale.visible_logical_range().is_none());
        assert!(scale.marks().is_empty());
    }
}
