use std::fmt;

use serde::Serialize;
use tracing::trace;

use crate::core::{LogicalRange, PriceRange, SeriesId, TimePointIndex};
use crate::model::SeriesChanges;

/// Notifications emitted by [`crate::model::ChartModel`] after each update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ChartEvent {
    TimeAxisChanged {
        first_changed_index: TimePointIndex,
        len: usize,
    },
    SeriesDataChanged {
        series_id: SeriesId,
        changes: SeriesChanges,
    },
    TickMarksChanged,
    VisibleRangeChanged {
        range: Option<LogicalRange>,
    },
    PriceRangeChanged {
        scale_id: String,
        range: Option<PriceRange>,
    },
    SeriesRemoved {
        series_id: SeriesId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&ChartEvent) + Send + 'static>;

/// Ordered subscriber list; delivery is synchronous, in subscription order.
#[derive(Default)]
pub struct EventHub {
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_id: u64,
}

impl fmt::Debug for EventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub")
            .field("subscribers", &self.subscribers.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl EventHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        subscriber: impl FnMut(&ChartEvent) + Send + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    /// Returns `false` when the id was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(subscribed, _)| *subscribed != id);
        self.subscribers.len() != before
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn emit(&mut self, event: &ChartEvent) {
        trace!(?event, subscribers = self.subscribers.len(), "chart event");
        for (_, subscriber) in &mut self.subscribers {
            subscriber(event);
        }
    }
}
