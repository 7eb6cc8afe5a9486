pub mod data_item;
pub mod plot_list;
pub mod plot_row;
pub mod price_range;
pub mod primitives;
pub mod tick_mark_weight;
pub mod tick_marks;
pub mod time_label;
pub mod time_point;
pub mod types;

pub use data_item::SeriesDataItem;
pub use plot_list::{PlotList, PlotRowInsertion, PlotRowSearchMode};
pub use plot_row::{BarValues, PlotRow, PlotRowValue};
pub use price_range::PriceRange;
pub use tick_mark_weight::{TickMarkType, tick_mark_weight};
pub use tick_marks::{TickMark, TickMarkWeight, TickMarks};
pub use time_label::{
    TimeAxisLabelOptions, TimeLabelCache, TimeLabelCacheStats, TimeLabelFormatterFn,
    default_time_label,
};
pub use time_point::{BusinessDay, Time, TimePoint, TimeValue, UtcTimestamp};
pub use types::{LogicalRange, SeriesId, StrictRange, TimePointIndex};
