use std::sync::{Arc, Mutex};

use approx::assert_relative_eq;
use chart_axis::ChartModel;
use chart_axis::core::{
    LogicalRange, PriceRange, SeriesDataItem, TickMarkType, TimeAxisLabelOptions, TimePoint,
};
use chart_axis::error::ChartError;
use chart_axis::model::{
    ChartEvent, PriceScaleMode, PriceScaleStateChange, RIGHT_PRICE_SCALE_ID, SeriesKind,
    SeriesOptions, TimeScaleOptions,
};

const DAY: i64 = 86_400;
// 2024-01-01T00:00:00Z
const JAN_1: i64 = 1_704_067_200;

fn daily(count: i64, value: impl Fn(i64) -> f64) -> Vec<SeriesDataItem> {
    (0..count)
        .map(|day| SeriesDataItem::value(JAN_1 + day * DAY, value(day)))
        .collect()
}

fn sized_model() -> ChartModel {
    let mut model = ChartModel::default();
    model.set_width(600.0).expect("width");
    model.set_price_scale_height(400.0).expect("height");
    model
}

fn record_events(model: &mut ChartModel) -> Arc<Mutex<Vec<ChartEvent>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    model.subscribe(move |event| sink.lock().expect("lock").push(event.clone()));
    log
}

#[test]
fn two_series_share_one_axis() {
    let mut model = sized_model();
    let line = model
        .add_series(SeriesKind::Line, SeriesOptions::default())
        .expect("line");
    let candles = model
        .add_series(SeriesKind::Candlestick, SeriesOptions::default())
        .expect("candles");

    model
        .set_series_data(line, vec![SeriesDataItem::value(100, 1.0), SeriesDataItem::value(300, 3.0)])
        .expect("line data");
    model
        .set_series_data(candles, vec![SeriesDataItem::ohlc(200, 2.0, 4.0, 1.0, 3.0)])
        .expect("candle data");

    assert_eq!(model.axis().len(), 3);
    assert_eq!(model.time_scale().base_index(), 2);
    let line_rows = model.series(line).expect("line").data();
    assert_eq!(line_rows.len(), 3);
    assert!(line_rows.rows()[1].is_whitespace());
    let candle_rows = model.series(candles).expect("candles").data();
    assert_eq!(candle_rows.first_index(), Some(1));
}

#[test]
fn autoscale_follows_visible_data() {
    let mut model = sized_model();
    let id = model
        .add_series(SeriesKind::Line, SeriesOptions::default())
        .expect("series");
    model.set_series_data(id, daily(10, |day| day as f64)).expect("data");
    model.fit_content().expect("fit");

    let range = model.price_range(RIGHT_PRICE_SCALE_ID).expect("range");
    assert!(range.min() < 0.0 && range.max() > 9.0);

    let top = model.price_to_coordinate(id, 9.0).expect("coord").expect("some");
    let bottom = model.price_to_coordinate(id, 0.0).expect("coord").expect("some");
    assert!(top < bottom);
    let back = model.coordinate_to_price(id, top).expect("price").expect("some");
    assert_relative_eq!(back, 9.0, epsilon = 1e-9);
}

#[test]
fn appending_a_bar_emits_axis_then_series_events() {
    let mut model = sized_model();
    let id = model
        .add_series(SeriesKind::Line, SeriesOptions::default())
        .expect("series");
    model.set_series_data(id, daily(3, |_| 1.0)).expect("data");
    let log = record_events(&mut model);

    model
        .update_series_data(id, SeriesDataItem::value(JAN_1 + 3 * DAY, 2.0))
        .expect("append");

    let events = log.lock().expect("lock").clone();
    assert!(matches!(
        events[0],
        ChartEvent::TimeAxisChanged { first_changed_index: 3, len: 4 }
    ));
    assert!(matches!(events[1], ChartEvent::TickMarksChanged));
    match &events[2] {
        ChartEvent::SeriesDataChanged { series_id, changes } => {
            assert_eq!(*series_id, id);
            assert_eq!(changes.inserted, vec![3]);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn updating_last_bar_does_not_touch_axis() {
    let mut model = sized_model();
    let id = model
        .add_series(SeriesKind::Line, SeriesOptions::default())
        .expect("series");
    model.set_series_data(id, daily(3, |_| 1.0)).expect("data");
    let log = record_events(&mut model);

    let response = model
        .update_series_data(id, SeriesDataItem::value(JAN_1 + 2 * DAY, 5.0))
        .expect("update");
    assert!(!response.time_scale.axis_changed());

    let events = log.lock().expect("lock").clone();
    assert!(!events
        .iter()
        .any(|event| matches!(event, ChartEvent::TimeAxisChanged { .. })));
    let last = model.series(id).expect("series").data().last().expect("row");
    assert_eq!(last.values().map(|values| values.close), Some(5.0));
}

#[test]
fn out_of_order_update_is_rejected_and_state_kept() {
    let mut model = sized_model();
    let id = model
        .add_series(SeriesKind::Line, SeriesOptions::default())
        .expect("series");
    model.set_series_data(id, daily(3, |_| 1.0)).expect("data");

    let err = model
        .update_series_data(id, SeriesDataItem::value(JAN_1 - DAY, 1.0))
        .expect_err("older time");
    assert!(matches!(err, ChartError::OutOfOrderUpdate { .. }));
    assert_eq!(model.axis().len(), 3);
}

#[test]
fn removing_series_emits_removal_last() {
    let mut model = sized_model();
    let id = model
        .add_series(SeriesKind::Line, SeriesOptions::default())
        .expect("series");
    model.set_series_data(id, daily(2, |_| 1.0)).expect("data");
    let log = record_events(&mut model);

    model.remove_series(id).expect("remove");
    assert!(model.axis().is_empty());
    assert!(model.series(id).is_none());
    let events = log.lock().expect("lock").clone();
    assert!(matches!(events.last(), Some(ChartEvent::SeriesRemoved { series_id }) if *series_id == id));
    assert!(matches!(
        model.remove_series(id),
        Err(ChartError::UnknownSeries(_))
    ));
}

#[test]
fn unsubscribed_listener_stops_receiving() {
    let mut model = sized_model();
    let id = model
        .add_series(SeriesKind::Line, SeriesOptions::default())
        .expect("series");
    let log = Arc::new(Mutex::new(0usize));
    let sink = Arc::clone(&log);
    let subscription = model.subscribe(move |_| *sink.lock().expect("lock") += 1);

    model.set_series_data(id, daily(2, |_| 1.0)).expect("data");
    let seen = *log.lock().expect("lock");
    assert!(seen > 0);

    assert!(model.unsubscribe(subscription));
    model.set_series_data(id, daily(3, |_| 1.0)).expect("data");
    assert_eq!(*log.lock().expect("lock"), seen);
}

#[test]
fn visible_range_round_trips_through_model() {
    let mut model = sized_model();
    let id = model
        .add_series(SeriesKind::Line, SeriesOptions::default())
        .expect("series");
    model.set_series_data(id, daily(100, |day| day as f64)).expect("data");

    model
        .set_visible_logical_range(LogicalRange::new(10.0, 39.0))
        .expect("range");
    let range = model.visible_logical_range().expect("visible");
    assert_relative_eq!(range.from, 10.0, epsilon = 1e-6);
    assert_relative_eq!(range.to, 39.0, epsilon = 1e-6);

    let info = model
        .bars_in_logical_range(id, range)
        .expect("known series")
        .expect("bars");
    assert_eq!(info.from.key(), JAN_1 + 10 * DAY);
    assert_eq!(info.to.key(), JAN_1 + 39 * DAY);
    assert_relative_eq!(info.bars_before, 10.0, epsilon = 1e-6);
    assert_relative_eq!(info.bars_after, 60.0, epsilon = 1e-6);
}

#[test]
fn custom_formatter_drives_time_marks() {
    let mut model = sized_model();
    let id = model
        .add_series(SeriesKind::Line, SeriesOptions::default())
        .expect("series");
    model.set_series_data(id, daily(5, |_| 1.0)).expect("data");
    model.fit_content().expect("fit");

    let default_marks = model.time_marks();
    assert_eq!(default_marks.first().map(|mark| mark.label.as_str()), Some("2024"));

    model.set_time_label_formatter(Some(Arc::new(|time: &TimePoint, mark_type: TickMarkType| {
        format!("{mark_type:?}@{}", time.key())
    })));
    let custom = model.time_marks();
    assert_eq!(
        custom.first().map(|mark| mark.label.clone()),
        Some(format!("{:?}@{JAN_1}", TickMarkType::Year))
    );
}

#[test]
fn time_scale_options_rescale_the_visible_range() {
    let mut model = sized_model();
    let id = model
        .add_series(SeriesKind::Line, SeriesOptions::default())
        .expect("series");
    model.set_series_data(id, daily(100, |day| day as f64)).expect("data");
    let log = record_events(&mut model);

    model
        .set_time_scale_options(TimeScaleOptions {
            bar_spacing: 12.0,
            right_offset: 0.0,
            ..TimeScaleOptions::default()
        })
        .expect("options");

    let range = model.visible_logical_range().expect("visible");
    assert_relative_eq!(range.from, 50.0, epsilon = 1e-6);
    assert_relative_eq!(range.to, 99.0, epsilon = 1e-6);
    assert_relative_eq!(model.time_scale().bar_spacing(), 12.0, epsilon = 1e-9);
    let events = log.lock().expect("lock").clone();
    assert!(matches!(events[0], ChartEvent::VisibleRangeChanged { range: Some(_) }));

    let err = model
        .set_time_scale_options(TimeScaleOptions {
            bar_spacing: -1.0,
            ..TimeScaleOptions::default()
        })
        .expect_err("negative spacing");
    assert!(matches!(err, ChartError::InvalidDimension { name: "bar_spacing", .. }));
    assert_relative_eq!(model.time_scale().bar_spacing(), 12.0, epsilon = 1e-9);
}

#[test]
fn wider_axis_labels_thin_the_marks() {
    let mut model = sized_model();
    let id = model
        .add_series(SeriesKind::Line, SeriesOptions::default())
        .expect("series");
    model.set_series_data(id, daily(5, |_| 1.0)).expect("data");
    model.fit_content().expect("fit");
    let default_count = model.time_marks().len();
    let log = record_events(&mut model);

    model
        .set_time_axis_label_options(TimeAxisLabelOptions {
            max_label_width: 1_000.0,
            ..TimeAxisLabelOptions::default()
        })
        .expect("label options");

    assert!(matches!(
        log.lock().expect("lock").as_slice(),
        [ChartEvent::TickMarksChanged]
    ));
    let wide = model.time_marks();
    assert_eq!(wide.len(), 1);
    assert!(default_count > wide.len());
    assert_eq!(wide[0].label, "2024");

    let err = model
        .set_time_axis_label_options(TimeAxisLabelOptions {
            max_label_width: f64::NAN,
            ..TimeAxisLabelOptions::default()
        })
        .expect_err("nan width");
    assert!(matches!(err, ChartError::InvalidDimension { .. }));
}

#[test]
fn percentage_mode_on_model_uses_first_visible_value() {
    let mut model = sized_model();
    let id = model
        .add_series(SeriesKind::Line, SeriesOptions::default())
        .expect("series");
    model
        .set_series_data(id, daily(5, |day| 100.0 + 10.0 * day as f64))
        .expect("data");
    model.fit_content().expect("fit");
    model
        .set_price_scale_mode(
            RIGHT_PRICE_SCALE_ID,
            PriceScaleStateChange {
                mode: Some(PriceScaleMode::Percentage),
                ..PriceScaleStateChange::default()
            },
        )
        .expect("mode");

    let range = model.price_range(RIGHT_PRICE_SCALE_ID).expect("range");
    // 100..140 in percent of the first value, before margins.
    assert!(range.min() <= 0.0 && range.max() >= 40.0);
    // Read paths only need a shared borrow.
    let view: &ChartModel = &model;
    assert!(view.visible_logical_range().is_some());
    let y = view.price_to_coordinate(id, 120.0).expect("coord").expect("some");
    let back = view.coordinate_to_price(id, y).expect("price").expect("some");
    assert_relative_eq!(back, 120.0, epsilon = 1e-9);
}

#[test]
fn manual_price_range_pins_scale() {
    let mut model = sized_model();
    let id = model
        .add_series(SeriesKind::Line, SeriesOptions::default())
        .expect("series");
    model
        .set_custom_price_range(RIGHT_PRICE_SCALE_ID, Some(PriceRange::new(0.0, 100.0)))
        .expect("manual");
    model.set_series_data(id, daily(5, |_| 500.0)).expect("data");
    model.fit_content().expect("fit");

    assert_eq!(
        model.price_range(RIGHT_PRICE_SCALE_ID),
        Some(PriceRange::new(0.0, 100.0))
    );
    let y = model.price_to_coordinate(id, 50.0).expect("coord").expect("some");
    assert_relative_eq!(y, 200.0, epsilon = 1e-9);
}
