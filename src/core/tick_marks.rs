use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::{TimePoint, TimePointIndex};

/// Importance of an axis boundary; larger values win when labels collide.
pub type TickMarkWeight = u8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickMark {
    pub index: TimePointIndex,
    pub time: TimePoint,
    pub weight: TickMarkWeight,
}

#[derive(Debug, Clone)]
struct ThinnedMarks {
    min_spacing_bars: i64,
    marks: Vec<TickMark>,
}

/// Candidate label positions grouped by weight, with memoized thinning.
#[derive(Debug, Clone, Default)]
pub struct TickMarks {
    weight_by_index: HashMap<TimePointIndex, TickMarkWeight>,
    marks_by_weight: BTreeMap<TickMarkWeight, Vec<TickMark>>,
    max_index: Option<TimePointIndex>,
    cache: Option<ThinnedMarks>,
}

impl TickMarks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.weight_by_index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weight_by_index.is_empty()
    }

    pub fn reset(&mut self) {
        self.weight_by_index.clear();
        self.marks_by_weight.clear();
        self.max_index = None;
        self.cache = None;
    }

    /// Upserts marks by index; an identical index/weight pair is a no-op.
    ///
    /// Marks arriving in index order are appended without re-sorting.
    pub fn merge(&mut self, marks: impl IntoIterator<Item = TickMark>) {
        let mut unsorted = Vec::new();
        for mark in marks {
            if let Some(existing) = self.weight_by_index.get(&mark.index).copied() {
                if existing == mark.weight {
                    if let Some(slot) = self
                        .marks_by_weight
                        .get_mut(&existing)
                        .and_then(|group| group.iter_mut().find(|m| m.index == mark.index))
                    {
                        slot.time = mark.time;
                    }
                    continue;
                }
                self.remove_mark(mark.index, existing);
            }
            self.weight_by_index.insert(mark.index, mark.weight);
            self.max_index = Some(self.max_index.map_or(mark.index, |max| max.max(mark.index)));
            let group = self.marks_by_weight.entry(mark.weight).or_default();
            if group.last().is_some_and(|last| last.index > mark.index) {
                unsorted.push(mark.weight);
            }
            group.push(mark);
        }

        unsorted.sort_unstable();
        unsorted.dedup();
        for weight in unsorted {
            if let Some(group) = self.marks_by_weight.get_mut(&weight) {
                group.sort_by_key(|mark| mark.index);
            }
        }
        self.marks_by_weight.retain(|_, group| !group.is_empty());
        self.cache = None;
    }

    /// Drops every mark at or after `index`.
    pub fn truncate_from(&mut self, index: TimePointIndex) {
        if self.max_index.is_none_or(|max| index > max) {
            return;
        }
        for group in self.marks_by_weight.values_mut() {
            let keep = group.partition_point(|mark| mark.index < index);
            for dropped in group.drain(keep..) {
                self.weight_by_index.remove(&dropped.index);
            }
        }
        self.marks_by_weight.retain(|_, group| !group.is_empty());
        self.max_index = self
            .marks_by_weight
            .values()
            .filter_map(|group| group.last())
            .map(|mark| mark.index)
            .max();
        self.cache = None;
    }

    /// Thins marks for a bar spacing and the widest label expected on the axis.
    pub fn build_for_spacing(&mut self, bar_spacing: f64, max_label_width: f64) -> &[TickMark] {
        let min_spacing_bars = if bar_spacing.is_finite() && bar_spacing > 0.0 {
            (max_label_width / bar_spacing).ceil() as i64
        } else {
            0
        };
        self.build(min_spacing_bars)
    }

    /// Selects the largest label set with pairwise index distance of at least
    /// `min_spacing_bars`.
    ///
    /// Weight groups are visited from highest to lowest. A candidate is
    /// accepted when both its nearest accepted neighbours are far enough;
    /// inside one group candidates are tried left to right, so on ties the
    /// leftmost survives. A value `<= 0` keeps every mark.
    pub fn build(&mut self, min_spacing_bars: i64) -> &[TickMark] {
        let cache_hit = self
            .cache
            .as_ref()
            .is_some_and(|cache| cache.min_spacing_bars == min_spacing_bars);
        if cache_hit {
            trace!(min_spacing_bars, "tick marks cache hit");
        } else {
            let marks = thin_by_weight(&self.marks_by_weight, min_spacing_bars);
            trace!(
                min_spacing_bars,
                candidates = self.weight_by_index.len(),
                selected = marks.len(),
                "tick marks rebuilt"
            );
            self.cache = Some(ThinnedMarks {
                min_spacing_bars,
                marks,
            });
        }
        self.cache.as_ref().map_or(&[], |cache| cache.marks.as_slice())
    }

    fn remove_mark(&mut self, index: TimePointIndex, weight: TickMarkWeight) {
        self.weight_by_index.remove(&index);
        if let Some(group) = self.marks_by_weight.get_mut(&weight)
            && let Ok(position) = group.binary_search_by_key(&index, |mark| mark.index)
        {
            group.remove(position);
        }
    }
}

fn thin_by_weight(
    marks_by_weight: &BTreeMap<TickMarkWeight, Vec<TickMark>>,
    min_spacing_bars: i64,
) -> Vec<TickMark> {
    if min_spacing_bars <= 0 {
        let mut all: Vec<TickMark> = marks_by_weight.values().flatten().cloned().collect();
        all.sort_by_key(|mark| mark.index);
        return all;
    }

    let mut selected: Vec<TickMark> = Vec::new();
    for group in marks_by_weight.values().rev() {
        let previous = std::mem::take(&mut selected);
        selected.reserve(previous.len() + group.len());
        let mut previous = previous.into_iter().peekable();
        let mut left_index = TimePointIndex::MIN;

        for mark in group {
            while let Some(accepted) = previous.next_if(|accepted| accepted.index < mark.index) {
                left_index = accepted.index;
                selected.push(accepted);
            }
            let right_gap_ok = previous
                .peek()
                .is_none_or(|right| right.index - mark.index >= min_spacing_bars);
            let left_gap_ok = left_index == TimePointIndex::MIN
                || mark.index - left_index >= min_spacing_bars;
            if right_gap_ok && left_gap_ok {
                left_index = mark.index;
                selected.push(mark.clone());
            }
        }
        selected.extend(previous);
    }
    selected
}
