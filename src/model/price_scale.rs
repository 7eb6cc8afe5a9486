use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core::{PriceRange, StrictRange};
use crate::error::{ChartError, ChartResult, ensure_finite};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceScaleMode {
    #[default]
    Normal,
    Logarithmic,
    Percentage,
    IndexedTo100,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceScaleState {
    pub auto_scale: bool,
    pub is_inverted: bool,
    pub mode: PriceScaleMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PriceScaleStateChange {
    pub auto_scale: Option<bool>,
    pub is_inverted: Option<bool>,
    pub mode: Option<PriceScaleMode>,
}

/// Fractions of the autoscaled span added above and below the data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceScaleMargins {
    pub top: f64,
    pub bottom: f64,
}

impl Default for PriceScaleMargins {
    fn default() -> Self {
        Self {
            top: 0.2,
            bottom: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceScaleOptions {
    #[serde(default = "default_auto_scale")]
    pub auto_scale: bool,
    #[serde(default)]
    pub mode: PriceScaleMode,
    #[serde(default)]
    pub invert_scale: bool,
    #[serde(default)]
    pub scale_margins: PriceScaleMargins,
}

impl Default for PriceScaleOptions {
    fn default() -> Self {
        Self {
            auto_scale: true,
            mode: PriceScaleMode::Normal,
            invert_scale: false,
            scale_margins: PriceScaleMargins::default(),
        }
    }
}

impl PriceScaleOptions {
    pub fn validate(&self) -> ChartResult<()> {
        let margins = self.scale_margins;
        if !(0.0..=1.0).contains(&margins.top) {
            return Err(ChartError::InvalidData(
                "price scale top margin must be in [0,1]".to_owned(),
            ));
        }
        if !(0.0..=1.0).contains(&margins.bottom) {
            return Err(ChartError::InvalidData(
                "price scale bottom margin must be in [0,1]".to_owned(),
            ));
        }
        if margins.top + margins.bottom > 1.0 {
            return Err(ChartError::InvalidData(
                "sum of price scale margins must be <= 1".to_owned(),
            ));
        }
        Ok(())
    }
}

fn default_auto_scale() -> bool {
    true
}

/// Data attached to a price scale that takes part in autoscale.
pub trait AutoScaleSource {
    fn visible(&self) -> bool;
    /// Base value for percentage modes: first value at or after the range start.
    fn first_value(&self, visible_bars: StrictRange) -> Option<f64>;
    /// Value envelope over the visible bars, in raw prices.
    fn autoscale_range(&self, visible_bars: StrictRange) -> Option<PriceRange>;
    fn min_move(&self) -> f64 {
        1.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct LogFormula {
    logical_offset: f64,
    coord_offset: f64,
}

impl Default for LogFormula {
    fn default() -> Self {
        Self {
            logical_offset: 4.0,
            coord_offset: 0.0001,
        }
    }
}

/// Vertical value <-> pixel mapping.
///
/// The stored range lives in the mode's logical domain: log10-space for
/// [`PriceScaleMode::Logarithmic`], percent for the percentage modes and raw
/// prices otherwise. Coordinate 0 is the top edge.
#[derive(Debug, Clone)]
pub struct PriceScale {
    id: String,
    options: PriceScaleOptions,
    height: f64,
    price_range: Option<PriceRange>,
    is_custom_price_range: bool,
    log_formula: LogFormula,
}

impl PriceScale {
    #[must_use]
    pub fn new(id: impl Into<String>, options: PriceScaleOptions) -> Self {
        Self {
            id: id.into(),
            options,
            height: 0.0,
            price_range: None,
            is_custom_price_range: false,
            log_formula: LogFormula::default(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn options(&self) -> PriceScaleOptions {
        self.options
    }

    pub fn apply_options(&mut self, options: PriceScaleOptions) -> ChartResult<()> {
        options.validate()?;
        let mode_change = PriceScaleStateChange {
            auto_scale: Some(options.auto_scale),
            is_inverted: Some(options.invert_scale),
            mode: Some(options.mode),
        };
        self.options.scale_margins = options.scale_margins;
        self.set_mode(mode_change);
        Ok(())
    }

    #[must_use]
    pub fn mode(&self) -> PriceScaleState {
        PriceScaleState {
            auto_scale: self.options.auto_scale,
            is_inverted: self.options.invert_scale,
            mode: self.options.mode,
        }
    }

    /// Switches mode flags; a manual range is carried into or out of log space.
    pub fn set_mode(&mut self, change: PriceScaleStateChange) {
        let old_mode = self.options.mode;
        if let Some(auto_scale) = change.auto_scale {
            self.options.auto_scale = auto_scale;
            if auto_scale {
                self.is_custom_price_range = false;
            }
        }
        if let Some(inverted) = change.is_inverted {
            self.options.invert_scale = inverted;
        }
        let Some(mode) = change.mode else {
            return;
        };
        self.options.mode = mode;
        if matches!(
            mode,
            PriceScaleMode::Percentage | PriceScaleMode::IndexedTo100
        ) {
            self.options.auto_scale = true;
        }
        if mode == old_mode {
            return;
        }
        debug!(scale = %self.id, from = ?old_mode, to = ?mode, "price scale mode changed");

        if old_mode == PriceScaleMode::Logarithmic {
            self.price_range = self
                .price_range
                .map(|range| convert_range_from_log(range, self.log_formula));
        }
        if mode == PriceScaleMode::Logarithmic {
            match self.price_range {
                Some(range) if range.min() > 0.0 => {
                    self.log_formula = log_formula_for_price_range(Some(range));
                    self.price_range = Some(convert_range_to_log(range, self.log_formula));
                }
                Some(_) => {
                    self.price_range = None;
                    self.options.auto_scale = true;
                }
                None => {}
            }
        }
        if self.options.auto_scale {
            self.is_custom_price_range = false;
        }
    }

    #[must_use]
    pub fn is_auto_scale(&self) -> bool {
        self.options.auto_scale
    }

    #[must_use]
    pub fn is_custom_price_range(&self) -> bool {
        self.is_custom_price_range
    }

    #[must_use]
    pub fn is_log(&self) -> bool {
        self.options.mode == PriceScaleMode::Logarithmic
    }

    #[must_use]
    pub fn is_percentage(&self) -> bool {
        self.options.mode == PriceScaleMode::Percentage
    }

    #[must_use]
    pub fn is_indexed_to_100(&self) -> bool {
        self.options.mode == PriceScaleMode::IndexedTo100
    }

    #[must_use]
    pub fn is_inverted(&self) -> bool {
        self.options.invert_scale
    }

    pub fn set_height(&mut self, height: f64) -> ChartResult<()> {
        if !height.is_finite() || height < 0.0 {
            return Err(ChartError::InvalidDimension {
                name: "price_scale_height",
                value: height,
            });
        }
        self.height = height;
        Ok(())
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Current range in the mode's logical domain; `None` when nothing is visible.
    #[must_use]
    pub fn price_range(&self) -> Option<PriceRange> {
        self.price_range
    }

    /// Pins a manual range and turns auto-scale off.
    ///
    /// In logarithmic mode the range is given in raw prices and must be
    /// positive; otherwise it is taken in the mode's logical domain.
    pub fn set_custom_price_range(&mut self, range: Option<PriceRange>) -> ChartResult<()> {
        let Some(range) = range else {
            self.is_custom_price_range = false;
            self.options.auto_scale = true;
            return Ok(());
        };
        ensure_finite(range.min(), "price_range.min")?;
        ensure_finite(range.max(), "price_range.max")?;
        let range = if self.is_log() {
            if range.min() <= 0.0 {
                return Err(ChartError::NonPositiveLogValue { value: range.min() });
            }
            self.log_formula = log_formula_for_price_range(Some(range));
            convert_range_to_log(range, self.log_formula)
        } else {
            range
        };
        self.price_range = Some(range);
        self.is_custom_price_range = true;
        self.options.auto_scale = false;
        Ok(())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.height == 0.0 || self.price_range.is_none()
    }

    /// Re-runs autoscale over `visible_bars` and returns the new range.
    ///
    /// A manual range survives while auto-scale is off. The zero-span case
    /// is widened by five minimum moves of the first contributing source on
    /// each side before margins are applied.
    pub fn recalculate_price_range(
        &mut self,
        visible_bars: StrictRange,
        sources: &[&dyn AutoScaleSource],
    ) -> Option<PriceRange> {
        if self.is_custom_price_range && !self.options.auto_scale {
            return self.price_range;
        }

        let mut merged: Option<PriceRange> = None;
        let mut min_move = None;
        for source in sources.iter().filter(|source| source.visible()) {
            let Some(range) = source.autoscale_range(visible_bars) else {
                continue;
            };
            let range = match self.options.mode {
                PriceScaleMode::Normal | PriceScaleMode::Logarithmic => range,
                PriceScaleMode::Percentage | PriceScaleMode::IndexedTo100 => {
                    let Some(base) = source
                        .first_value(visible_bars)
                        .filter(|base| *base != 0.0)
                    else {
                        continue;
                    };
                    if self.is_percentage() {
                        range.map(|value| to_percent(value, base))
                    } else {
                        range.map(|value| to_indexed_to_100(value, base))
                    }
                }
            };
            if self.is_log() && range.min() <= 0.0 {
                trace!(scale = %self.id, min = range.min(), "non-positive source skipped in log mode");
                continue;
            }
            min_move.get_or_insert_with(|| source.min_move());
            merged = PriceRange::merge_optional(merged, Some(range));
        }

        let Some(mut range) = merged else {
            trace!(scale = %self.id, "no visible data, price range cleared");
            self.price_range = None;
            return None;
        };

        if range.is_empty() {
            let extend = 5.0 * min_move.unwrap_or(1.0);
            let lower = range.min() - extend;
            // Log mode keeps the synthetic span positive.
            let lower = if self.is_log() && lower <= 0.0 {
                range.min() * 0.5
            } else {
                lower
            };
            range = PriceRange::new(lower, range.max() + extend);
        }

        if self.is_log() {
            self.log_formula = log_formula_for_price_range(Some(range));
            range = convert_range_to_log(range, self.log_formula);
        }
        let margins = self.options.scale_margins;
        range = range.expand_by_margins(margins.top, margins.bottom);

        trace!(
            scale = %self.id,
            left = visible_bars.left(),
            right = visible_bars.right(),
            min = range.min(),
            max = range.max(),
            "price range recalculated"
        );
        self.price_range = Some(range);
        self.price_range
    }

    /// Drops an auto-scaled range while no bars are visible.
    pub fn clear_autoscaled_range(&mut self) -> Option<PriceRange> {
        if !self.is_custom_price_range || self.options.auto_scale {
            self.price_range = None;
        }
        self.price_range
    }

    /// Maps a price to a vertical coordinate.
    ///
    /// `base_value` is only read by the percentage modes. Returns `Ok(None)`
    /// while the scale has no height or no range.
    pub fn price_to_coordinate(&self, price: f64, base_value: f64) -> ChartResult<Option<f64>> {
        ensure_finite(price, "price")?;
        let Some(logical) = self.price_to_logical(price, base_value)? else {
            return Ok(None);
        };
        Ok(self.logical_to_coordinate(logical))
    }

    pub fn coordinate_to_price(
        &self,
        coordinate: f64,
        base_value: f64,
    ) -> ChartResult<Option<f64>> {
        ensure_finite(coordinate, "coordinate")?;
        let Some(logical) = self.coordinate_to_logical(coordinate) else {
            return Ok(None);
        };
        Ok(self.logical_to_price(logical, base_value))
    }

    /// Price expressed in the mode's logical domain.
    pub fn price_to_logical(&self, price: f64, base_value: f64) -> ChartResult<Option<f64>> {
        match self.options.mode {
            PriceScaleMode::Normal => Ok(Some(price)),
            PriceScaleMode::Logarithmic => {
                if price <= 0.0 {
                    return Err(ChartError::NonPositiveLogValue { value: price });
                }
                Ok(Some(to_log(price, self.log_formula)))
            }
            PriceScaleMode::Percentage | PriceScaleMode::IndexedTo100 => {
                ensure_finite(base_value, "base_value")?;
                if base_value == 0.0 {
                    return Ok(None);
                }
                Ok(Some(if self.is_percentage() {
                    to_percent(price, base_value)
                } else {
                    to_indexed_to_100(price, base_value)
                }))
            }
        }
    }

    #[must_use]
    pub fn logical_to_price(&self, logical: f64, base_value: f64) -> Option<f64> {
        match self.options.mode {
            PriceScaleMode::Normal => Some(logical),
            PriceScaleMode::Logarithmic => Some(from_log(logical, self.log_formula)),
            PriceScaleMode::Percentage | PriceScaleMode::IndexedTo100 => {
                if !base_value.is_finite() || base_value == 0.0 {
                    return None;
                }
                Some(if self.is_percentage() {
                    from_percent(logical, base_value)
                } else {
                    from_indexed_to_100(logical, base_value)
                })
            }
        }
    }

    #[must_use]
    pub fn logical_to_coordinate(&self, logical: f64) -> Option<f64> {
        let range = self.price_range.filter(|_| self.height > 0.0)?;
        if range.is_empty() {
            return Some(self.height * 0.5);
        }
        let fraction = (logical - range.min()) / range.length();
        let coordinate = if self.is_inverted() {
            self.height * fraction
        } else {
            self.height * (1.0 - fraction)
        };
        coordinate.is_finite().then_some(coordinate)
    }

    #[must_use]
    pub fn coordinate_to_logical(&self, coordinate: f64) -> Option<f64> {
        let range = self.price_range.filter(|_| self.height > 0.0)?;
        if range.is_empty() {
            return Some(range.min());
        }
        let fraction = if self.is_inverted() {
            coordinate / self.height
        } else {
            1.0 - coordinate / self.height
        };
        Some(range.min() + range.length() * fraction)
    }
}

fn from_percent(value: f64, base_value: f64) -> f64 {
    let value = if base_value < 0.0 { -value } else { value };
    (value / 100.0) * base_value + base_value
}

fn to_percent(value: f64, base_value: f64) -> f64 {
    let result = 100.0 * (value - base_value) / base_value;
    if base_value < 0.0 { -result } else { result }
}

fn from_indexed_to_100(value: f64, base_value: f64) -> f64 {
    let value = if base_value < 0.0 { -value } else { value };
    (value / 100.0) * base_value
}

fn to_indexed_to_100(value: f64, base_value: f64) -> f64 {
    let result = 100.0 * value / base_value;
    if base_value < 0.0 { -result } else { result }
}

fn to_log(price: f64, formula: LogFormula) -> f64 {
    let magnitude = price.abs();
    if magnitude < 1e-15 {
        return 0.0;
    }
    let value = (magnitude + formula.coord_offset).log10() + formula.logical_offset;
    if price < 0.0 { -value } else { value }
}

fn from_log(logical: f64, formula: LogFormula) -> f64 {
    let magnitude = logical.abs();
    if magnitude < 1e-15 {
        return 0.0;
    }
    let value = 10f64.powf(magnitude - formula.logical_offset) - formula.coord_offset;
    if logical < 0.0 { -value } else { value }
}

fn convert_range_to_log(range: PriceRange, formula: LogFormula) -> PriceRange {
    range.map(|value| to_log(value, formula))
}

fn convert_range_from_log(range: PriceRange, formula: LogFormula) -> PriceRange {
    range.map(|value| from_log(value, formula))
}

// Tiny spans get extra decimal digits so that log space keeps them apart.
fn log_formula_for_price_range(range: Option<PriceRange>) -> LogFormula {
    let default = LogFormula::default();
    let Some(range) = range else {
        return default;
    };
    let diff = range.length().abs();
    if !(1e-15..1.0).contains(&diff) {
        return default;
    }
    let digits = diff.log10().abs().ceil();
    let logical_offset = default.logical_offset + digits;
    LogFormula {
        logical_offset,
        coord_offset: 1.0 / 10f64.powf(logical_offset),
    }
}
