//! Cycle indicators.
//!
//! The Hilbert-transform family (dominant cycle period and phase, trend
//! mode, the instantaneous trendline, and the MESA adaptive average pair)
//! has no implementation here yet, so the category registers empty.
//! Downstream code must tolerate a category with no indicators; the engine
//! simply produces no columns for it.

use super::indicator::Indicator;

/// The cycle category. Currently empty.
pub fn default_indicators() -> Vec<Box<dyn Indicator>> {
    Vec::new()
}
