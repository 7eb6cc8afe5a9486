use std::collections::BTreeSet;

use chart_axis::core::{
    BarValues, PlotList, PlotRow, PlotRowSearchMode, PlotRowValue, TimePoint,
};
use proptest::prelude::*;

fn list(indices: &BTreeSet<i64>) -> PlotList {
    PlotList::from_rows(
        indices
            .iter()
            .map(|&index| {
                PlotRow::new(
                    index,
                    TimePoint::from_timestamp(index * 60),
                    PlotRowValue::Data(BarValues::single(index as f64).expect("finite")),
                )
            })
            .collect(),
    )
}

proptest! {
    #[test]
    fn search_modes_agree_with_linear_scan(
        indices in prop::collection::btree_set(-200i64..200, 0..60),
        target in -250i64..250,
    ) {
        let plot = list(&indices);

        let exact = plot.search(target, PlotRowSearchMode::Exact).map(|row| row.index);
        prop_assert_eq!(exact, indices.contains(&target).then_some(target));

        let left = plot.search(target, PlotRowSearchMode::NearestLeft).map(|row| row.index);
        prop_assert_eq!(left, indices.range(..=target).next_back().copied());

        let right = plot.search(target, PlotRowSearchMode::NearestRight).map(|row| row.index);
        prop_assert_eq!(right, indices.range(target..).next().copied());
    }

    #[test]
    fn min_max_matches_values_in_range(
        indices in prop::collection::btree_set(0i64..100, 1..40),
        from in 0i64..100,
        len in 0i64..50,
    ) {
        let plot = list(&indices);
        let to = from + len;
        let expected = indices.range(from..=to).fold(None, |acc: Option<(f64, f64)>, &i| {
            let v = i as f64;
            Some(acc.map_or((v, v), |(lo, hi)| (lo.min(v), hi.max(v))))
        });
        let actual = plot.min_max_on_range(from, to).map(|range| (range.min(), range.max()));
        prop_assert_eq!(actual, expected);
        // A second call is served from the memo and must agree.
        let cached = plot.min_max_on_range(from, to).map(|range| (range.min(), range.max()));
        prop_assert_eq!(cached, expected);
    }
}
