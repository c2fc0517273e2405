//! Candle — the fundamental market data unit.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// One minute-bar of OHLCV data for a single trading pair.
///
/// `timestamp` is the bar's open time in milliseconds since the Unix epoch.
/// Candles are immutable once written to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub symbol: String,
    pub exchange: String,
    pub interval: String,
}

impl Candle {
    /// UTC calendar day this candle belongs to.
    pub fn trading_day(&self) -> Option<NaiveDate> {
        DateTime::<Utc>::from_timestamp_millis(self.timestamp).map(|dt| dt.date_naive())
    }

    /// Minute of the UTC day in [0, 1439].
    pub fn minute_of_day(&self) -> Option<i32> {
        DateTime::<Utc>::from_timestamp_millis(self.timestamp)
            .map(|dt| (dt.hour() * 60 + dt.minute()) as i32)
    }

    /// Basic OHLCV sanity check: high is the max, low is the min, prices positive.
    pub fn is_sane(&self) -> bool {
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
            && self.volume >= 0.0
    }
}
