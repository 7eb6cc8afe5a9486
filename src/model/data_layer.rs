use std::cmp::Ordering;
use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Serialize;
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::core::{
    PlotRow, PlotRowValue, SeriesDataItem, SeriesId, TickMark, TickMarkWeight, TimePoint,
    TimePointIndex, UtcTimestamp, tick_mark_weight,
};
use crate::error::{ChartError, ChartResult};

/// One distinct time on the merged axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeScalePoint {
    pub time: TimePoint,
    pub weight: TickMarkWeight,
}

/// Axis delta produced by one merge.
///
/// `points` holds the axis tail starting at `first_changed_index`; it is
/// `None` when the axis did not change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeScaleUpdate {
    pub points: Option<Vec<TimeScalePoint>>,
    pub first_changed_index: Option<TimePointIndex>,
    pub marks: Vec<TickMark>,
    pub base_index: Option<TimePointIndex>,
}

impl TimeScaleUpdate {
    #[must_use]
    pub fn axis_changed(&self) -> bool {
        self.points.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeriesChanges {
    pub inserted: Vec<TimePointIndex>,
    pub changed: Vec<TimePointIndex>,
    pub removed: Vec<TimePointIndex>,
}

impl SeriesChanges {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SeriesRowsUpdate {
    /// Complete row set of the series.
    Replace(Vec<PlotRow>),
    /// Rows to append after the current last row.
    Extend(Vec<PlotRow>),
    /// New content of the current last row.
    UpdateLast(PlotRow),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesUpdate {
    pub series_id: SeriesId,
    pub rows: SeriesRowsUpdate,
    pub changes: SeriesChanges,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataUpdateResponse {
    pub time_scale: TimeScaleUpdate,
    pub series: Vec<SeriesUpdate>,
}

type OwnRows = Vec<(TimePoint, PlotRowValue)>;

#[derive(Debug, Clone)]
struct PointRefs {
    time: TimePoint,
    series: SmallVec<[SeriesId; 4]>,
}

/// Owner of the merged time axis.
///
/// Every series keeps its own submitted rows; the axis is the sorted union of
/// their times, and index `i` is position `i` of that union. Of the series
/// still referencing a time, the one that referenced it first decides which
/// original time value the axis carries.
#[derive(Debug, Clone, Default)]
pub struct DataLayer {
    series: IndexMap<SeriesId, OwnRows>,
    points: HashMap<UtcTimestamp, PointRefs>,
    axis: Vec<TimeScalePoint>,
}

impl DataLayer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn axis(&self) -> &[TimeScalePoint] {
        &self.axis
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.axis.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.axis.is_empty()
    }

    #[must_use]
    pub fn base_index(&self) -> Option<TimePointIndex> {
        self.axis
            .len()
            .checked_sub(1)
            .map(|last| last as TimePointIndex)
    }

    #[must_use]
    pub fn index_of(&self, key: UtcTimestamp) -> Option<TimePointIndex> {
        self.axis
            .binary_search_by_key(&key, |point| point.time.key())
            .ok()
            .map(|position| position as TimePointIndex)
    }

    #[must_use]
    pub fn contains_series(&self, series_id: SeriesId) -> bool {
        self.series.contains_key(&series_id)
    }

    /// Current merged rows of a series, whitespace padding included.
    #[must_use]
    pub fn series_rows(&self, series_id: SeriesId) -> Vec<PlotRow> {
        self.series
            .get(&series_id)
            .map(|own| build_rows(own, &self.axis))
            .unwrap_or_default()
    }

    /// Replaces every row of a series and rebuilds the axis.
    ///
    /// Items must be sorted by time. An item repeating the previous item's
    /// time replaces it.
    pub fn set_series_data(
        &mut self,
        series_id: SeriesId,
        items: Vec<SeriesDataItem>,
    ) -> ChartResult<DataUpdateResponse> {
        let rows = normalize_items(items)?;
        debug!(series = %series_id, rows = rows.len(), "set series data");
        Ok(self.replace_series(series_id, Some(rows)))
    }

    /// Applies one item at or after the series' last time.
    pub fn update_series_data(
        &mut self,
        series_id: SeriesId,
        item: SeriesDataItem,
    ) -> ChartResult<DataUpdateResponse> {
        let (time, value) = item.into_row_parts()?;
        let key = time.key();
        let last_key = self
            .series
            .get(&series_id)
            .and_then(|own| own.last())
            .map(|(last, _)| last.key());

        if let Some(last) = last_key {
            match key.cmp(&last) {
                Ordering::Less => {
                    return Err(ChartError::OutOfOrderUpdate { last, time: key });
                }
                Ordering::Equal => return Ok(self.update_last(series_id, time, value)),
                Ordering::Greater => {}
            }
        }

        let axis_max = self.axis.last().map(|point| point.time.key());
        if axis_max.is_none_or(|max| max < key) {
            return Ok(self.append_point(series_id, time, value));
        }
        if self.index_of(key).is_some() {
            return Ok(self.extend_on_axis(series_id, time, value));
        }

        trace!(series = %series_id, time = key, "update falls between axis points, rebuilding");
        let mut rows = self.series.get(&series_id).cloned().unwrap_or_default();
        rows.push((time, value));
        Ok(self.replace_series(series_id, Some(rows)))
    }

    /// Drops a series and every axis point only it referenced.
    pub fn remove_series(&mut self, series_id: SeriesId) -> DataUpdateResponse {
        if !self.series.contains_key(&series_id) {
            return self.unchanged_response(Vec::new());
        }
        debug!(series = %series_id, "remove series data");
        self.replace_series(series_id, None)
    }

    fn update_last(
        &mut self,
        series_id: SeriesId,
        time: TimePoint,
        value: PlotRowValue,
    ) -> DataUpdateResponse {
        // An owner switching the time form must re-emit the axis tail.
        let owner_time_changes = self.points.get(&time.key()).is_some_and(|refs| {
            refs.series.first() == Some(&series_id)
                && refs.time.original_time() != time.original_time()
        });
        let index = self.index_of(time.key());
        let Some(index) = index.filter(|_| !owner_time_changes) else {
            if index.is_none() {
                warn!(
                    series = %series_id,
                    time = time.key(),
                    "last row missing from axis, rebuilding"
                );
            }
            let mut rows = self.series.get(&series_id).cloned().unwrap_or_default();
            rows.pop();
            rows.push((time, value));
            return self.replace_series(series_id, Some(rows));
        };

        if let Some(last) = self
            .series
            .get_mut(&series_id)
            .and_then(|own| own.last_mut())
        {
            *last = (time.clone(), value);
        }
        trace!(series = %series_id, index, "last row updated in place");
        let changes = SeriesChanges {
            changed: vec![index],
            ..SeriesChanges::default()
        };
        self.unchanged_response(vec![SeriesUpdate {
            series_id,
            rows: SeriesRowsUpdate::UpdateLast(PlotRow::new(index, time, value)),
            changes,
        }])
    }

    fn append_point(
        &mut self,
        series_id: SeriesId,
        time: TimePoint,
        value: PlotRowValue,
    ) -> DataUpdateResponse {
        let key = time.key();
        let weight = tick_mark_weight(self.axis.last().map(|point| point.time.key()), key);
        reference_point(&mut self.points, &time, series_id);
        let point = TimeScalePoint {
            time: time.clone(),
            weight,
        };
        self.axis.push(point.clone());
        let index = (self.axis.len() - 1) as TimePointIndex;
        trace!(series = %series_id, index, time = key, "axis extended by trailing point");

        let update = self.push_series_row(series_id, index, time.clone(), value);
        DataUpdateResponse {
            time_scale: TimeScaleUpdate {
                points: Some(vec![point]),
                first_changed_index: Some(index),
                marks: vec![TickMark {
                    index,
                    time,
                    weight,
                }],
                base_index: Some(index),
            },
            series: vec![update],
        }
    }

    fn extend_on_axis(
        &mut self,
        series_id: SeriesId,
        time: TimePoint,
        value: PlotRowValue,
    ) -> DataUpdateResponse {
        reference_point(&mut self.points, &time, series_id);
        let Some(index) = self.index_of(time.key()) else {
            return self.unchanged_response(Vec::new());
        };
        trace!(series = %series_id, index, "series extended onto existing axis point");
        let update = self.push_series_row(series_id, index, time, value);
        self.unchanged_response(vec![update])
    }

    // Appends the row at `index` plus whitespace for axis points skipped since
    // the series' previous last row.
    fn push_series_row(
        &mut self,
        series_id: SeriesId,
        index: TimePointIndex,
        time: TimePoint,
        value: PlotRowValue,
    ) -> SeriesUpdate {
        let start = self
            .series
            .get(&series_id)
            .and_then(|own| own.last())
            .and_then(|(last, _)| self.index_of(last.key()))
            .map_or(index, |last_index| last_index + 1);

        let mut rows: Vec<PlotRow> = (start..index)
            .filter_map(|gap| {
                self.axis
                    .get(gap as usize)
                    .map(|point| PlotRow::whitespace(gap, point.time.clone()))
            })
            .collect();
        rows.push(PlotRow::new(index, time.clone(), value));
        self.series.entry(series_id).or_default().push((time, value));

        let changes = SeriesChanges {
            inserted: rows.iter().map(|row| row.index).collect(),
            ..SeriesChanges::default()
        };
        SeriesUpdate {
            series_id,
            rows: SeriesRowsUpdate::Extend(rows),
            changes,
        }
    }

    // `None` removes the series.
    fn replace_series(&mut self, series_id: SeriesId, rows: Option<OwnRows>) -> DataUpdateResponse {
        let old_axis = std::mem::take(&mut self.axis);
        let old_rows = match rows {
            Some(rows) => {
                for (time, _) in &rows {
                    reference_point(&mut self.points, time, series_id);
                }
                self.series.insert(series_id, rows)
            }
            None => self.series.shift_remove(&series_id),
        }
        .unwrap_or_default();

        let retained = self.series.get(&series_id);
        for (time, _) in &old_rows {
            let still_used = retained.is_some_and(|own| {
                own.binary_search_by_key(&time.key(), |(t, _)| t.key())
                    .is_ok()
            });
            if !still_used {
                unreference_point(&mut self.points, time.key(), series_id);
            }
        }
        for (time, _) in old_rows.iter().chain(retained.into_iter().flatten()) {
            refresh_point_time(&mut self.points, &self.series, time.key());
        }

        self.axis = rebuild_axis(&self.points);
        let first_changed = first_difference(&old_axis, &self.axis);
        let threshold = first_changed.and_then(|position| {
            let old_key = old_axis.get(position).map(|point| point.time.key());
            let new_key = self.axis.get(position).map(|point| point.time.key());
            match (old_key, new_key) {
                (Some(old), Some(new)) => Some(old.min(new)),
                (old, new) => old.or(new),
            }
        });

        let mut updates = Vec::new();
        for (id, own) in &self.series {
            let is_target = *id == series_id;
            let shifted = threshold.is_some_and(|threshold| {
                own.last().is_some_and(|(last, _)| last.key() >= threshold)
            });
            if !is_target && !shifted {
                continue;
            }
            let before = build_rows(if is_target { &old_rows } else { own }, &old_axis);
            let after = build_rows(own, &self.axis);
            let changes = diff_rows(&before, &after);
            updates.push(SeriesUpdate {
                series_id: *id,
                rows: SeriesRowsUpdate::Replace(after),
                changes,
            });
        }

        debug!(
            series = %series_id,
            axis_len = self.axis.len(),
            first_changed = ?first_changed,
            affected_series = updates.len(),
            "axis rebuilt"
        );

        let time_scale = match first_changed {
            Some(position) => {
                let tail = &self.axis[position.min(self.axis.len())..];
                TimeScaleUpdate {
                    points: Some(tail.to_vec()),
                    first_changed_index: Some(position as TimePointIndex),
                    marks: tail
                        .iter()
                        .enumerate()
                        .map(|(offset, point)| TickMark {
                            index: (position + offset) as TimePointIndex,
                            time: point.time.clone(),
                            weight: point.weight,
                        })
                        .collect(),
                    base_index: self.base_index(),
                }
            }
            None => self.unchanged_time_scale(),
        };
        DataUpdateResponse {
            time_scale,
            series: updates,
        }
    }

    fn unchanged_time_scale(&self) -> TimeScaleUpdate {
        TimeScaleUpdate {
            points: None,
            first_changed_index: None,
            marks: Vec::new(),
            base_index: self.base_index(),
        }
    }

    fn unchanged_response(&self, series: Vec<SeriesUpdate>) -> DataUpdateResponse {
        DataUpdateResponse {
            time_scale: self.unchanged_time_scale(),
            series,
        }
    }
}

fn normalize_items(items: Vec<SeriesDataItem>) -> ChartResult<OwnRows> {
    let mut rows: OwnRows = Vec::with_capacity(items.len());
    for (position, item) in items.into_iter().enumerate() {
        let (time, value) = item.into_row_parts()?;
        let last_key = rows.last().map(|(last, _)| last.key());
        match last_key.map(|last| time.key().cmp(&last)) {
            Some(Ordering::Less) => return Err(ChartError::UnsortedSeriesData { position }),
            Some(Ordering::Equal) => {
                rows.pop();
                rows.push((time, value));
            }
            Some(Ordering::Greater) | None => rows.push((time, value)),
        }
    }
    Ok(rows)
}

fn reference_point(
    points: &mut HashMap<UtcTimestamp, PointRefs>,
    time: &TimePoint,
    series_id: SeriesId,
) {
    let refs = points.entry(time.key()).or_insert_with(|| PointRefs {
        time: time.clone(),
        series: SmallVec::new(),
    });
    if !refs.series.contains(&series_id) {
        refs.series.push(series_id);
    }
}

fn unreference_point(
    points: &mut HashMap<UtcTimestamp, PointRefs>,
    key: UtcTimestamp,
    series_id: SeriesId,
) {
    if let Some(refs) = points.get_mut(&key) {
        refs.series.retain(|id| *id != series_id);
        if refs.series.is_empty() {
            points.remove(&key);
        }
    }
}

// Points carry the time form of their oldest remaining referrer.
fn refresh_point_time(
    points: &mut HashMap<UtcTimestamp, PointRefs>,
    series: &IndexMap<SeriesId, OwnRows>,
    key: UtcTimestamp,
) {
    let Some(refs) = points.get_mut(&key) else {
        return;
    };
    let owner_time = refs
        .series
        .first()
        .and_then(|owner| series.get(owner))
        .and_then(|own| {
            own.binary_search_by_key(&key, |(time, _)| time.key())
                .ok()
                .map(|position| &own[position].0)
        });
    if let Some(time) = owner_time
        && time.original_time() != refs.time.original_time()
    {
        refs.time = time.clone();
    }
}

fn rebuild_axis(points: &HashMap<UtcTimestamp, PointRefs>) -> Vec<TimeScalePoint> {
    let mut ordered: Vec<&TimePoint> = points.values().map(|refs| &refs.time).collect();
    ordered.sort_unstable_by_key(|time| time.key());

    let mut previous = None;
    ordered
        .into_iter()
        .map(|time| {
            let weight = tick_mark_weight(previous, time.key());
            previous = Some(time.key());
            TimeScalePoint {
                time: time.clone(),
                weight,
            }
        })
        .collect()
}

fn first_difference(old: &[TimeScalePoint], new: &[TimeScalePoint]) -> Option<usize> {
    let common = old
        .iter()
        .zip(new)
        .position(|(a, b)| {
            a.time.key() != b.time.key() || a.time.original_time() != b.time.original_time()
        });
    match common {
        Some(position) => Some(position),
        None if old.len() == new.len() => None,
        None => Some(old.len().min(new.len())),
    }
}

fn build_rows(own: &[(TimePoint, PlotRowValue)], axis: &[TimeScalePoint]) -> Vec<PlotRow> {
    let (Some((first, _)), Some((last, _))) = (own.first(), own.last()) else {
        return Vec::new();
    };
    let start = axis.partition_point(|point| point.time.key() < first.key());
    let end = axis
        .partition_point(|point| point.time.key() <= last.key())
        .max(start);

    let mut own_rows = own.iter().peekable();
    axis[start..end]
        .iter()
        .enumerate()
        .map(|(offset, point)| {
            let index = (start + offset) as TimePointIndex;
            match own_rows.next_if(|(time, _)| time.key() == point.time.key()) {
                Some((time, value)) => PlotRow::new(index, time.clone(), *value),
                None => PlotRow::whitespace(index, point.time.clone()),
            }
        })
        .collect()
}

fn diff_rows(before: &[PlotRow], after: &[PlotRow]) -> SeriesChanges {
    let mut changes = SeriesChanges::default();
    let mut before = before.iter().peekable();
    let mut after = after.iter().peekable();
    loop {
        match (before.peek(), after.peek()) {
            (Some(old), Some(new)) => match old.index.cmp(&new.index) {
                Ordering::Less => {
                    changes.removed.push(old.index);
                    before.next();
                }
                Ordering::Greater => {
                    changes.inserted.push(new.index);
                    after.next();
                }
                Ordering::Equal => {
                    if old != new {
                        changes.changed.push(new.index);
                    }
                    before.next();
                    after.next();
                }
            },
            (Some(old), None) => {
                changes.removed.push(old.index);
                before.next();
            }
            (None, Some(new)) => {
                changes.inserted.push(new.index);
                after.next();
            }
            (None, None) => break,
        }
    }
    changes
}
