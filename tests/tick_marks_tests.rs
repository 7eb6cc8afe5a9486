use chart_axis::core::{TickMark, TickMarkType, TickMarks, TimePoint, tick_mark_weight};
use chart_axis::core::tick_mark_weight::{WEIGHT_DAY, WEIGHT_HOUR_1, WEIGHT_MONTH, WEIGHT_YEAR};

const DAY: i64 = 86_400;
// 2024-01-30T00:00:00Z
const JAN_30: i64 = 1_706_572_800;

fn marks_for(times: &[i64]) -> Vec<TickMark> {
    let mut previous = None;
    times
        .iter()
        .enumerate()
        .map(|(index, &time)| {
            let weight = tick_mark_weight(previous, time);
            previous = Some(time);
            TickMark {
                index: index as i64,
                time: TimePoint::from_timestamp(time),
                weight,
            }
        })
        .collect()
}

#[test]
fn month_boundary_outranks_days() {
    let times: Vec<i64> = (0..5).map(|day| JAN_30 + day * DAY).collect();
    let marks = marks_for(&times);
    let weights: Vec<u8> = marks.iter().map(|mark| mark.weight).collect();
    assert_eq!(
        weights,
        vec![WEIGHT_YEAR, WEIGHT_DAY, WEIGHT_MONTH, WEIGHT_DAY, WEIGHT_DAY]
    );

    let mut tick_marks = TickMarks::new();
    tick_marks.merge(marks);
    let selected: Vec<i64> = tick_marks.build(2).iter().map(|mark| mark.index).collect();
    assert_eq!(selected, vec![0, 2, 4]);
}

#[test]
fn hourly_axis_marks_only_hours() {
    let times: Vec<i64> = (0..4).map(|hour| JAN_30 + 3_600 * (hour + 1)).collect();
    let marks = marks_for(&times);
    assert!(marks[1..].iter().all(|mark| mark.weight >= WEIGHT_HOUR_1));
    assert_eq!(marks[1].weight, WEIGHT_HOUR_1);
    assert_eq!(
        TickMarkType::from_weight(marks[1].weight, true, false),
        TickMarkType::Time
    );
}

#[test]
fn memo_reuses_result_until_marks_change() {
    let mut tick_marks = TickMarks::new();
    tick_marks.merge(marks_for(&[0, DAY, 2 * DAY, 3 * DAY]));

    let first = tick_marks.build(2).to_vec();
    let again = tick_marks.build(2).to_vec();
    assert_eq!(first, again);

    tick_marks.truncate_from(2);
    let after_truncate: Vec<i64> = tick_marks.build(2).iter().map(|mark| mark.index).collect();
    assert_eq!(after_truncate, vec![0]);
    assert_eq!(tick_marks.len(), 2);
}

#[test]
fn reset_drops_every_mark() {
    let mut tick_marks = TickMarks::new();
    tick_marks.merge(marks_for(&[0, DAY]));
    tick_marks.reset();
    assert!(tick_marks.is_empty());
    assert!(tick_marks.build(1).is_empty());
}
