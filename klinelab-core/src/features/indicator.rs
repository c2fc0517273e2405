//! Indicator trait and the column-oriented OHLCV input series.
//!
//! Indicators are pure functions: price/volume series in, numeric series out.
//! Every output has the same length as the input, with `f64::NAN` in the
//! leading warm-up region where the lookback window exceeds available history.

/// Column-oriented OHLCV data, the input to every indicator.
///
/// All five vectors have the same length. Missing values are `f64::NAN`
/// (the engine coerces nulls and non-numeric input to NaN during extraction).
#[derive(Debug, Clone, Default)]
pub struct OhlcvSeries {
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
}

impl OhlcvSeries {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            open: Vec::with_capacity(n),
            high: Vec::with_capacity(n),
            low: Vec::with_capacity(n),
            close: Vec::with_capacity(n),
            volume: Vec::with_capacity(n),
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }
}

/// Trait for indicators.
///
/// Indicators take the full OHLCV series and produce a numeric output series
/// of the same length. The first `lookback()` values should be `f64::NAN`.
///
/// No indicator value at row t may depend on data from row t+1 or later;
/// the one sanctioned exception is the max-scaled math transforms, which
/// normalize by the full-series maximum.
pub trait Indicator: Send + Sync {
    /// Output column name (e.g. "sma_20", "rsi_14").
    fn name(&self) -> &str;

    /// Number of rows needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire series.
    fn compute(&self, series: &OhlcvSeries) -> Vec<f64>;
}
