//! Feature layer — technical indicators and cross-sectional normalization.
//!
//! Indicators are grouped into the nine classic TA categories. Each category
//! module exposes `default_indicators()` with the fixed default parameter
//! set; the registry assembles them and the engine runs every registered
//! indicator against one extracted OHLCV series. Availability is a registry
//! lookup, never attempt-and-catch: a category or pattern with no registered
//! implementation simply contributes no columns.

pub mod cross_section;
pub mod cycle;
pub mod engine;
pub mod indicator;
pub mod math_transform;
pub mod momentum;
pub mod overlap;
pub mod pattern;
pub mod price_transform;
pub mod registry;
pub mod statistics;
pub mod volatility;
pub mod volume;

pub use cross_section::cross_section_features;
pub use engine::{FeatureEngine, FeatureError, RAW_COLUMNS};
pub use indicator::{Indicator, OhlcvSeries};
pub use registry::{Category, FeatureRegistry};

/// Create a synthetic OHLCV series from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_series(closes: &[f64]) -> OhlcvSeries {
    let n = closes.len();
    let mut series = OhlcvSeries::with_capacity(n);
    for (i, &close) in closes.iter().enumerate() {
        let open = if i == 0 { close } else { closes[i - 1] };
        series.open.push(open);
        series.high.push(open.max(close) + 1.0);
        series.low.push(open.min(close) - 1.0);
        series.close.push(close);
        series.volume.push(1000.0);
    }
    series
}

/// Create an OHLCV series from explicit (open, high, low, close) tuples.
#[cfg(test)]
pub fn make_ohlc_series(bars: &[(f64, f64, f64, f64)]) -> OhlcvSeries {
    let mut series = OhlcvSeries::with_capacity(bars.len());
    for &(open, high, low, close) in bars {
        series.open.push(open);
        series.high.push(high);
        series.low.push(low);
        series.close.push(close);
        series.volume.push(1000.0);
    }
    series
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
