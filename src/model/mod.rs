pub mod chart_model;
pub mod data_layer;
pub mod events;
pub mod price_scale;
pub mod series;
pub mod time_scale;

pub use chart_model::{ChartModel, LEFT_PRICE_SCALE_ID, RIGHT_PRICE_SCALE_ID};
pub use data_layer::{
    DataLayer, DataUpdateResponse, SeriesChanges, SeriesRowsUpdate, SeriesUpdate, TimeScalePoint,
    TimeScaleUpdate,
};
pub use events::{ChartEvent, EventHub, SubscriptionId};
pub use price_scale::{
    AutoScaleSource, PriceScale, PriceScaleMargins, PriceScaleMode, PriceScaleOptions,
    PriceScaleState, PriceScaleStateChange,
};
pub use series::{BarsInfo, Series, SeriesKind, SeriesOptions};
pub use time_scale::{TimeMark, TimeScale, TimeScaleOptions};
