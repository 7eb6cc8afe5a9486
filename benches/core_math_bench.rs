use chart_axis::core::{
    BarValues, PlotList, PlotRow, PlotRowSearchMode, PlotRowValue, SeriesDataItem, SeriesId,
    TickMark, TickMarks, TimePoint, tick_mark_weight,
};
use chart_axis::model::DataLayer;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

const MINUTE: i64 = 60;

fn minute_items(count: i64, offset: i64) -> Vec<SeriesDataItem> {
    (0..count)
        .map(|i| SeriesDataItem::value((i * 2 + offset) * MINUTE, 100.0 + i as f64 * 0.01))
        .collect()
}

fn bench_merge_two_series_10k(c: &mut Criterion) {
    let a = minute_items(10_000, 0);
    let b = minute_items(10_000, 1);

    c.bench_function("merge_two_series_10k", |bench| {
        bench.iter(|| {
            let mut layer = DataLayer::new();
            layer
                .set_series_data(SeriesId::new(1), black_box(a.clone()))
                .expect("set a");
            layer
                .set_series_data(SeriesId::new(2), black_box(b.clone()))
                .expect("set b");
        })
    });
}

fn bench_trailing_append(c: &mut Criterion) {
    let mut layer = DataLayer::new();
    layer
        .set_series_data(SeriesId::new(1), minute_items(10_000, 0))
        .expect("seed");
    let mut next = 20_000 * MINUTE;

    c.bench_function("trailing_append_on_10k_axis", |bench| {
        bench.iter(|| {
            next += MINUTE;
            layer
                .update_series_data(SeriesId::new(1), SeriesDataItem::value(next, 1.0))
                .expect("append");
        })
    });
}

fn bench_plot_list_search_100k(c: &mut Criterion) {
    let rows: Vec<PlotRow> = (0..100_000)
        .map(|i| {
            PlotRow::new(
                i * 2,
                TimePoint::from_timestamp(i * MINUTE),
                PlotRowValue::Data(BarValues::single(i as f64).expect("finite")),
            )
        })
        .collect();
    let list = PlotList::from_rows(rows);

    c.bench_function("plot_list_nearest_left_100k", |bench| {
        bench.iter(|| {
            let _ = list.search(black_box(123_457), PlotRowSearchMode::NearestLeft);
        })
    });
}

fn bench_tick_mark_thinning_10k(c: &mut Criterion) {
    let mut previous = None;
    let marks: Vec<TickMark> = (0..10_000)
        .map(|i| {
            let time = i * 5 * MINUTE;
            let weight = tick_mark_weight(previous, time);
            previous = Some(time);
            TickMark {
                index: i,
                time: TimePoint::from_timestamp(time),
                weight,
            }
        })
        .collect();

    c.bench_function("tick_mark_thinning_10k", |bench| {
        bench.iter(|| {
            let mut tick_marks = TickMarks::new();
            tick_marks.merge(marks.iter().cloned());
            let _ = tick_marks.build(black_box(8)).len();
        })
    });
}

criterion_group!(
    benches,
    bench_merge_two_series_10k,
    bench_trailing_append,
    bench_plot_list_search_100k,
    bench_tick_mark_thinning_10k
);
criterion_main!(benches);
