use serde::{Deserialize, Serialize};

/// Closed value interval `[min, max]` with `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    min: f64,
    max: f64,
}

impl PriceRange {
    #[must_use]
    pub fn new(a: f64, b: f64) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    #[must_use]
    pub fn min(self) -> f64 {
        self.min
    }

    #[must_use]
    pub fn max(self) -> f64 {
        self.max
    }

    #[must_use]
    pub fn length(self) -> f64 {
        self.max - self.min
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.min == self.max
    }

    #[must_use]
    pub fn contains(self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    #[must_use]
    pub fn contains_range(self, other: PriceRange) -> bool {
        self.min <= other.min && other.max <= self.max
    }

    #[must_use]
    pub fn merge(self, other: PriceRange) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    #[must_use]
    pub fn merge_optional(left: Option<PriceRange>, right: Option<PriceRange>) -> Option<Self> {
        match (left, right) {
            (Some(l), Some(r)) => Some(l.merge(r)),
            (l, r) => l.or(r),
        }
    }

    /// Grows the range by fractions of its own length.
    #[must_use]
    pub fn expand_by_margins(self, top: f64, bottom: f64) -> Self {
        let length = self.length();
        Self {
            min: self.min - length * bottom,
            max: self.max + length * top,
        }
    }

    #[must_use]
    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self::new(f(self.min), f(self.max))
    }
}
