use std::cell::RefCell;
use std::collections::HashMap;

use tracing::trace;

use crate::core::{PlotRow, PriceRange, TimePointIndex};

/// Direction used by [`PlotList::search`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotRowSearchMode {
    Exact,
    /// Greatest index `<=` the requested one.
    NearestLeft,
    /// Smallest index `>=` the requested one.
    NearestRight,
}

/// Result of [`PlotList::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotRowInsertion {
    Appended,
    Inserted,
    Replaced,
}

const MIN_MAX_CACHE_LIMIT: usize = 64;

/// Rows of one series, strictly ordered by index.
///
/// Search relies on the strict ordering and binary-searches the row vector
/// directly. Range envelopes are memoized until the next mutation.
#[derive(Debug, Clone, Default)]
pub struct PlotList {
    rows: Vec<PlotRow>,
    min_max_cache: RefCell<HashMap<(TimePointIndex, TimePointIndex), Option<PriceRange>>>,
}

impl PlotList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a list from rows already sorted by strictly increasing index.
    #[must_use]
    pub fn from_rows(rows: Vec<PlotRow>) -> Self {
        let mut list = Self::new();
        list.set_rows(rows);
        list
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn rows(&self) -> &[PlotRow] {
        &self.rows
    }

    #[must_use]
    pub fn first_index(&self) -> Option<TimePointIndex> {
        self.rows.first().map(|row| row.index)
    }

    #[must_use]
    pub fn last_index(&self) -> Option<TimePointIndex> {
        self.rows.last().map(|row| row.index)
    }

    #[must_use]
    pub fn first(&self) -> Option<&PlotRow> {
        self.rows.first()
    }

    #[must_use]
    pub fn last(&self) -> Option<&PlotRow> {
        self.rows.last()
    }

    #[must_use]
    pub fn contains(&self, index: TimePointIndex) -> bool {
        self.search(index, PlotRowSearchMode::Exact).is_some()
    }

    #[must_use]
    pub fn search(&self, index: TimePointIndex, mode: PlotRowSearchMode) -> Option<&PlotRow> {
        let position = self.lower_bound(index);
        let at_position = self.rows.get(position);
        let exact = at_position.filter(|row| row.index == index);
        match mode {
            PlotRowSearchMode::Exact => exact,
            PlotRowSearchMode::NearestRight => at_position,
            PlotRowSearchMode::NearestLeft => exact.or_else(|| {
                position
                    .checked_sub(1)
                    .and_then(|previous| self.rows.get(previous))
            }),
        }
    }

    /// Rows whose index lies in `[from, to]`.
    #[must_use]
    pub fn rows_in_range(&self, from: TimePointIndex, to: TimePointIndex) -> &[PlotRow] {
        if from > to {
            return &[];
        }
        let start = self.lower_bound(from);
        let end = self.rows.partition_point(|row| row.index <= to);
        &self.rows[start..end.max(start)]
    }

    /// Inserts a row, overwriting any row already stored at the same index.
    pub fn insert(&mut self, row: PlotRow) -> PlotRowInsertion {
        self.invalidate_cache();
        if self.rows.last().is_none_or(|last| last.index < row.index) {
            self.rows.push(row);
            return PlotRowInsertion::Appended;
        }
        let position = self.lower_bound(row.index);
        if self.rows[position].index == row.index {
            self.rows[position] = row;
            PlotRowInsertion::Replaced
        } else {
            self.rows.insert(position, row);
            PlotRowInsertion::Inserted
        }
    }

    pub fn remove(&mut self, index: TimePointIndex) -> Option<PlotRow> {
        let position = self.lower_bound(index);
        if self.rows.get(position)?.index != index {
            return None;
        }
        self.invalidate_cache();
        Some(self.rows.remove(position))
    }

    pub fn set_rows(&mut self, rows: Vec<PlotRow>) {
        debug_assert!(
            rows.windows(2).all(|pair| pair[0].index < pair[1].index),
            "plot rows must be strictly ordered by index"
        );
        self.invalidate_cache();
        self.rows = rows;
    }

    pub fn clear(&mut self) {
        self.set_rows(Vec::new());
    }

    /// Low/high envelope of data rows in `[from, to]`; whitespace is ignored.
    #[must_use]
    pub fn min_max_on_range(&self, from: TimePointIndex, to: TimePointIndex) -> Option<PriceRange> {
        let key = (from, to);
        if let Some(cached) = self.min_max_cache.borrow().get(&key) {
            trace!(from, to, "plot list min/max cache hit");
            return *cached;
        }

        let range = self
            .rows_in_range(from, to)
            .iter()
            .filter_map(PlotRow::values)
            .fold(None, |acc: Option<PriceRange>, values| {
                let row_range = PriceRange::new(values.low, values.high);
                Some(acc.map_or(row_range, |acc| acc.merge(row_range)))
            });

        let mut cache = self.min_max_cache.borrow_mut();
        if cache.len() >= MIN_MAX_CACHE_LIMIT {
            cache.clear();
        }
        cache.insert(key, range);
        range
    }

    fn lower_bound(&self, index: TimePointIndex) -> usize {
        self.rows.partition_point(|row| row.index < index)
    }

    fn invalidate_cache(&mut self) {
        self.min_max_cache.get_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{PlotList, PlotRowInsertion, PlotRowSearchMode};
    use crate::core::{BarValues, PlotRow, PlotRowValue, TimePoint};

    fn row(index: i64, value: f64) -> PlotRow {
        PlotRow::new(
            index,
            TimePoint::from_timestamp(index * 60),
            PlotRowValue::Data(BarValues::single(value).expect("finite")),
        )
    }

    fn sparse_list() -> PlotList {
        PlotList::from_rows(vec![row(2, 1.0), row(5, 2.0), row(9, 3.0)])
    }

    #[test]
    fn search_modes_pick_nearest_rows() {
        let list = sparse_list();
        assert_eq!(list.search(5, PlotRowSearchMode::Exact).map(|r| r.index), Some(5));
        assert!(list.search(6, PlotRowSearchMode::Exact).is_none());
        assert_eq!(list.search(6, PlotRowSearchMode::NearestLeft).map(|r| r.index), Some(5));
        assert_eq!(list.search(6, PlotRowSearchMode::NearestRight).map(|r| r.index), Some(9));
        assert!(list.search(1, PlotRowSearchMode::NearestLeft).is_none());
        assert!(list.search(10, PlotRowSearchMode::NearestRight).is_none());
    }

    #[test]
    fn empty_list_never_matches() {
        let list = PlotList::new();
        assert!(list.search(0, PlotRowSearchMode::NearestLeft).is_none());
        assert!(list.first_index().is_none());
        assert!(list.last_index().is_none());
    }

    #[test]
    fn insert_keeps_strict_order_and_replaces_in_place() {
        let mut list = sparse_list();
        assert_eq!(list.insert(row(12, 4.0)), PlotRowInsertion::Appended);
        assert_eq!(list.insert(row(3, 5.0)), PlotRowInsertion::Inserted);
        assert_eq!(list.insert(row(5, 6.0)), PlotRowInsertion::Replaced);
        let indices: Vec<i64> = list.rows().iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![2, 3, 5, 9, 12]);
        assert_eq!(
            list.search(5, PlotRowSearchMode::Exact)
                .and_then(PlotRow::values)
                .map(|v| v.close),
            Some(6.0)
        );
        assert_eq!(list.first_index(), Some(2));
        assert_eq!(list.last_index(), Some(12));
    }

    #[test]
    fn min_max_ignores_whitespace_and_refreshes_after_mutation() {
        let mut list = sparse_list();
        list.insert(PlotRow::whitespace(7, TimePoint::from_timestamp(420)));
        let range = list.min_max_on_range(0, 8).expect("range");
        assert_eq!((range.min(), range.max()), (1.0, 2.0));

        list.insert(row(6, 10.0));
        let range = list.min_max_on_range(0, 8).expect("range");
        assert_eq!((range.min(), range.max()), (1.0, 10.0));
        assert!(list.min_max_on_range(10, 11).is_none());
    }

    #[test]
    fn remove_drops_only_existing_rows() {
        let mut list = sparse_list();
        assert!(list.remove(4).is_none());
        assert_eq!(list.remove(5).map(|r| r.index), Some(5));
        assert_eq!(list.len(), 2);
    }
}
