use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::config::ChartModelConfig;
use crate::core::{
    LogicalRange, PriceRange, SeriesDataItem, SeriesId, TimeAxisLabelOptions, TimeLabelFormatterFn,
};
use crate::error::{ChartError, ChartResult};
use crate::model::{
    AutoScaleSource, BarsInfo, ChartEvent, DataLayer, DataUpdateResponse, EventHub, PriceScale,
    PriceScaleOptions, PriceScaleStateChange, Series, SeriesKind, SeriesOptions, SubscriptionId,
    TimeMark, TimeScale, TimeScaleOptions, TimeScalePoint,
};

pub const RIGHT_PRICE_SCALE_ID: &str = "right";
pub const LEFT_PRICE_SCALE_ID: &str = "left";

/// Axis manager and single mutator of the merged time axis.
///
/// Every data call runs merge, then applies the axis to the time scale, then
/// the rows to the series, then autoscales the touched price scales, and
/// only then notifies subscribers.
#[derive(Debug)]
pub struct ChartModel {
    data_layer: DataLayer,
    time_scale: TimeScale,
    series: IndexMap<SeriesId, Series>,
    price_scales: BTreeMap<String, PriceScale>,
    price_scale_height: f64,
    events: EventHub,
    next_series_id: u32,
}

impl Default for ChartModel {
    fn default() -> Self {
        Self::from_valid_config(ChartModelConfig::default())
    }
}

impl ChartModel {
    pub fn new(config: ChartModelConfig) -> ChartResult<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: ChartModelConfig) -> Self {
        let mut price_scales = BTreeMap::new();
        price_scales.insert(
            RIGHT_PRICE_SCALE_ID.to_owned(),
            PriceScale::new(RIGHT_PRICE_SCALE_ID, config.right_price_scale),
        );
        price_scales.insert(
            LEFT_PRICE_SCALE_ID.to_owned(),
            PriceScale::new(LEFT_PRICE_SCALE_ID, config.left_price_scale),
        );
        Self {
            data_layer: DataLayer::new(),
            time_scale: TimeScale::new(config.time_scale, config.time_axis),
            series: IndexMap::new(),
            price_scales,
            price_scale_height: 0.0,
            events: EventHub::new(),
            next_series_id: 0,
        }
    }

    #[must_use]
    pub fn time_scale(&self) -> &TimeScale {
        &self.time_scale
    }

    #[must_use]
    pub fn price_scale(&self, scale_id: &str) -> Option<&PriceScale> {
        self.price_scales.get(scale_id)
    }

    #[must_use]
    pub fn series(&self, series_id: SeriesId) -> Option<&Series> {
        self.series.get(&series_id)
    }

    pub fn series_ids(&self) -> impl Iterator<Item = SeriesId> + '_ {
        self.series.keys().copied()
    }

    /// Merged axis as an ordered index -> time table.
    #[must_use]
    pub fn axis(&self) -> &[TimeScalePoint] {
        self.data_layer.axis()
    }

    pub fn subscribe(
        &mut self,
        subscriber: impl FnMut(&ChartEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.events.subscribe(subscriber)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn add_series(&mut self, kind: SeriesKind, options: SeriesOptions) -> ChartResult<SeriesId> {
        options.validate()?;
        let id = SeriesId::new(self.next_series_id);
        self.next_series_id += 1;
        self.ensure_price_scale(&options.price_scale_id);
        debug!(series = %id, ?kind, scale = %options.price_scale_id, "series added");
        self.series.insert(id, Series::new(id, kind, options));
        Ok(id)
    }

    pub fn remove_series(&mut self, series_id: SeriesId) -> ChartResult<()> {
        let removed = self
            .series
            .shift_remove(&series_id)
            .ok_or(ChartError::UnknownSeries(series_id))?;
        let response = self.data_layer.remove_series(series_id);
        let mut scales = BTreeSet::new();
        scales.insert(removed.options().price_scale_id.clone());
        let mut events = self.apply_response(&response, scales);
        events.push(ChartEvent::SeriesRemoved { series_id });
        self.emit_all(&events);
        Ok(())
    }

    pub fn set_series_data(
        &mut self,
        series_id: SeriesId,
        items: Vec<SeriesDataItem>,
    ) -> ChartResult<DataUpdateResponse> {
        self.ensure_series(series_id)?;
        let response = self.data_layer.set_series_data(series_id, items)?;
        let events = self.apply_response(&response, BTreeSet::new());
        self.emit_all(&events);
        Ok(response)
    }

    pub fn update_series_data(
        &mut self,
        series_id: SeriesId,
        item: SeriesDataItem,
    ) -> ChartResult<DataUpdateResponse> {
        self.ensure_series(series_id)?;
        let response = self.data_layer.update_series_data(series_id, item)?;
        let events = self.apply_response(&response, BTreeSet::new());
        self.emit_all(&events);
        Ok(response)
    }

    pub fn set_series_options(
        &mut self,
        series_id: SeriesId,
        options: SeriesOptions,
    ) -> ChartResult<()> {
        let series = self
            .series
            .get_mut(&series_id)
            .ok_or(ChartError::UnknownSeries(series_id))?;
        let previous_scale = series.options().price_scale_id.clone();
        series.set_options(options)?;
        let current_scale = series.options().price_scale_id.clone();
        self.ensure_price_scale(&current_scale);

        let mut events = Vec::new();
        for scale_id in BTreeSet::from([previous_scale, current_scale]) {
            self.recalculate_price_scale(&scale_id, &mut events);
        }
        self.emit_all(&events);
        Ok(())
    }

    pub fn set_width(&mut self, width: f64) -> ChartResult<()> {
        let before = self.time_scale.visible_logical_range();
        self.time_scale.set_width(width)?;
        self.after_view_change(before);
        Ok(())
    }

    pub fn set_price_scale_height(&mut self, height: f64) -> ChartResult<()> {
        if !height.is_finite() || height < 0.0 {
            return Err(ChartError::InvalidDimension {
                name: "price_scale_height",
                value: height,
            });
        }
        self.price_scale_height = height;
        for scale in self.price_scales.values_mut() {
            scale.set_height(height)?;
        }
        Ok(())
    }

    pub fn set_bar_spacing(&mut self, bar_spacing: f64) -> ChartResult<()> {
        let before = self.time_scale.visible_logical_range();
        self.time_scale.set_bar_spacing(bar_spacing)?;
        self.after_view_change(before);
        Ok(())
    }

    pub fn set_right_offset(&mut self, right_offset: f64) -> ChartResult<()> {
        let before = self.time_scale.visible_logical_range();
        self.time_scale.set_right_offset(right_offset)?;
        self.after_view_change(before);
        Ok(())
    }

    pub fn set_visible_logical_range(&mut self, range: LogicalRange) -> ChartResult<()> {
        let before = self.time_scale.visible_logical_range();
        self.time_scale.set_visible_logical_range(range)?;
        self.after_view_change(before);
        Ok(())
    }

    pub fn fit_content(&mut self) -> ChartResult<()> {
        let before = self.time_scale.visible_logical_range();
        self.time_scale.fit_content()?;
        self.after_view_change(before);
        Ok(())
    }

    /// Replaces spacing, offset and their clamps in one step.
    pub fn set_time_scale_options(&mut self, options: TimeScaleOptions) -> ChartResult<()> {
        let before = self.time_scale.visible_logical_range();
        self.time_scale.apply_options(options)?;
        self.after_view_change(before);
        Ok(())
    }

    pub fn set_time_axis_label_options(
        &mut self,
        options: TimeAxisLabelOptions,
    ) -> ChartResult<()> {
        self.time_scale.set_label_options(options)?;
        self.events.emit(&ChartEvent::TickMarksChanged);
        Ok(())
    }

    #[must_use]
    pub fn visible_logical_range(&self) -> Option<LogicalRange> {
        self.time_scale.visible_logical_range()
    }

    pub fn set_price_scale_mode(
        &mut self,
        scale_id: &str,
        change: PriceScaleStateChange,
    ) -> ChartResult<()> {
        self.price_scale_mut(scale_id)?.set_mode(change);
        self.recalculate_and_emit(scale_id);
        Ok(())
    }

    pub fn set_price_scale_options(
        &mut self,
        scale_id: &str,
        options: PriceScaleOptions,
    ) -> ChartResult<()> {
        self.price_scale_mut(scale_id)?.apply_options(options)?;
        self.recalculate_and_emit(scale_id);
        Ok(())
    }

    /// Pins a manual range on a scale; `None` returns it to auto-scale.
    pub fn set_custom_price_range(
        &mut self,
        scale_id: &str,
        range: Option<PriceRange>,
    ) -> ChartResult<()> {
        self.price_scale_mut(scale_id)?.set_custom_price_range(range)?;
        self.recalculate_and_emit(scale_id);
        Ok(())
    }

    #[must_use]
    pub fn price_range(&self, scale_id: &str) -> Option<PriceRange> {
        self.price_scales
            .get(scale_id)
            .and_then(PriceScale::price_range)
    }

    /// Vertical coordinate of `price` on the series' price scale.
    pub fn price_to_coordinate(
        &self,
        series_id: SeriesId,
        price: f64,
    ) -> ChartResult<Option<f64>> {
        let (scale, base) = self.series_scale_and_base(series_id)?;
        scale.price_to_coordinate(price, base)
    }

    pub fn coordinate_to_price(
        &self,
        series_id: SeriesId,
        coordinate: f64,
    ) -> ChartResult<Option<f64>> {
        let (scale, base) = self.series_scale_and_base(series_id)?;
        scale.coordinate_to_price(coordinate, base)
    }

    pub fn bars_in_logical_range(
        &self,
        series_id: SeriesId,
        range: LogicalRange,
    ) -> ChartResult<Option<BarsInfo>> {
        let series = self
            .series
            .get(&series_id)
            .ok_or(ChartError::UnknownSeries(series_id))?;
        Ok(series.bars_in_logical_range(range))
    }

    /// Thinned, labelled time-axis marks for the visible range.
    pub fn time_marks(&mut self) -> Vec<TimeMark> {
        self.time_scale.marks()
    }

    pub fn set_time_label_formatter(&mut self, formatter: Option<TimeLabelFormatterFn>) {
        self.time_scale.set_label_formatter(formatter);
        self.events.emit(&ChartEvent::TickMarksChanged);
    }

    fn ensure_series(&self, series_id: SeriesId) -> ChartResult<()> {
        if self.series.contains_key(&series_id) {
            Ok(())
        } else {
            Err(ChartError::UnknownSeries(series_id))
        }
    }

    fn ensure_price_scale(&mut self, scale_id: &str) {
        if self.price_scales.contains_key(scale_id) {
            return;
        }
        let mut scale = PriceScale::new(scale_id, PriceScaleOptions::default());
        if let Err(err) = scale.set_height(self.price_scale_height) {
            warn!(scale = %scale_id, error = %err, "overlay price scale height not applied");
        }
        debug!(scale = %scale_id, "overlay price scale created");
        self.price_scales.insert(scale_id.to_owned(), scale);
    }

    fn price_scale_mut(&mut self, scale_id: &str) -> ChartResult<&mut PriceScale> {
        self.price_scales
            .get_mut(scale_id)
            .ok_or_else(|| ChartError::InvalidData(format!("unknown price scale `{scale_id}`")))
    }

    fn series_scale_and_base(&self, series_id: SeriesId) -> ChartResult<(&PriceScale, f64)> {
        let visible = self.time_scale.visible_strict_range();
        let series = self
            .series
            .get(&series_id)
            .ok_or(ChartError::UnknownSeries(series_id))?;
        // Percentage modes read this as their base; zero means "no base".
        let base = visible
            .and_then(|visible| series.first_value(visible))
            .unwrap_or(0.0);
        let scale_id = series.options().price_scale_id.as_str();
        let scale = self
            .price_scales
            .get(scale_id)
            .ok_or_else(|| ChartError::InvalidData(format!("unknown price scale `{scale_id}`")))?;
        Ok((scale, base))
    }

    fn apply_response(
        &mut self,
        response: &DataUpdateResponse,
        mut touched_scales: BTreeSet<String>,
    ) -> Vec<ChartEvent> {
        let mut events = Vec::new();
        let visible_before = self.time_scale.visible_logical_range();

        self.time_scale.apply_update(&response.time_scale);

        for update in &response.series {
            let Some(series) = self.series.get_mut(&update.series_id) else {
                warn!(series = %update.series_id, "rows for unregistered series skipped");
                continue;
            };
            series.apply_rows(update.rows.clone());
            touched_scales.insert(series.options().price_scale_id.clone());
        }

        let visible_after = self.time_scale.visible_logical_range();
        let visible_changed = visible_before != visible_after;
        if visible_changed {
            touched_scales.extend(self.price_scales.keys().cloned());
        }
        for scale_id in &touched_scales {
            self.recalculate_price_scale(scale_id, &mut events);
        }

        let mut notifications = Vec::new();
        if let Some(first_changed_index) = response.time_scale.first_changed_index {
            notifications.push(ChartEvent::TimeAxisChanged {
                first_changed_index,
                len: self.data_layer.len(),
            });
            notifications.push(ChartEvent::TickMarksChanged);
        }
        notifications.extend(
            response
                .series
                .iter()
                .filter(|update| self.series.contains_key(&update.series_id))
                .map(|update| ChartEvent::SeriesDataChanged {
                    series_id: update.series_id,
                    changes: update.changes.clone(),
                }),
        );
        if visible_changed {
            notifications.push(ChartEvent::VisibleRangeChanged {
                range: visible_after,
            });
        }
        notifications.extend(events);
        notifications
    }

    fn after_view_change(&mut self, before: Option<LogicalRange>) {
        let after = self.time_scale.visible_logical_range();
        if before == after {
            return;
        }
        let mut events = vec![ChartEvent::VisibleRangeChanged { range: after }];
        let scale_ids: Vec<String> = self.price_scales.keys().cloned().collect();
        for scale_id in &scale_ids {
            self.recalculate_price_scale(scale_id, &mut events);
        }
        self.emit_all(&events);
    }

    fn recalculate_and_emit(&mut self, scale_id: &str) {
        let mut events = Vec::new();
        self.recalculate_price_scale(scale_id, &mut events);
        self.emit_all(&events);
    }

    fn recalculate_price_scale(&mut self, scale_id: &str, events: &mut Vec<ChartEvent>) {
        let visible = self.time_scale.visible_strict_range();
        let Some(scale) = self.price_scales.get_mut(scale_id) else {
            return;
        };
        let before = scale.price_range();
        let after = match visible {
            Some(visible) => {
                let sources: Vec<&dyn AutoScaleSource> = self
                    .series
                    .values()
                    .filter(|series| series.options().price_scale_id == scale_id)
                    .map(|series| series as &dyn AutoScaleSource)
                    .collect();
                scale.recalculate_price_range(visible, &sources)
            }
            None => scale.clear_autoscaled_range(),
        };
        if before != after {
            events.push(ChartEvent::PriceRangeChanged {
                scale_id: scale_id.to_owned(),
                range: after,
            });
        }
    }

    fn emit_all(&mut self, events: &[ChartEvent]) {
        for event in events {
            self.events.emit(event);
        }
    }
}
