//! Volume indicators — cumulative flow lines driven by where price closed.

use super::indicator::{Indicator, OhlcvSeries};
use super::overlap::ema_of_series;

fn ad_line(series: &OhlcvSeries) -> Vec<f64> {
    let n = series.len();
    let mut result = Vec::with_capacity(n);
    let mut acc = 0.0;
    for i in 0..n {
        let high = series.high[i];
        let low = series.low[i];
        let close = series.close[i];
        let range = high - low;
        // Zero-range bars contribute no flow
        let mfm = if range == 0.0 {
            0.0
        } else {
            ((close - low) - (high - close)) / range
        };
        acc += mfm * series.volume[i];
        result.push(acc);
    }
    result
}

/// On-Balance Volume: running volume total signed by close direction.
#[derive(Debug, Clone)]
pub struct Obv;

impl Indicator for Obv {
    fn name(&self) -> &str {
        "obv"
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        let n = series.len();
        let mut result = Vec::with_capacity(n);
        if n == 0 {
            return result;
        }
        let mut acc = series.volume[0];
        result.push(acc);
        for i in 1..n {
            if series.close[i] > series.close[i - 1] {
                acc += series.volume[i];
            } else if series.close[i] < series.close[i - 1] {
                acc -= series.volume[i];
            }
            result.push(acc);
        }
        result
    }
}

/// Chaikin Accumulation/Distribution line.
#[derive(Debug, Clone)]
pub struct Ad;

impl Indicator for Ad {
    fn name(&self) -> &str {
        "ad"
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        ad_line(series)
    }
}

/// Chaikin A/D Oscillator: fast EMA minus slow EMA of the A/D line.
#[derive(Debug, Clone)]
pub struct Adosc {
    fast: usize,
    slow: usize,
}

impl Adosc {
    pub fn new(fast: usize, slow: usize) -> Self {
        assert!(fast >= 1 && slow > fast, "ADOSC needs 1 <= fast < slow");
        Self { fast, slow }
    }
}

impl Indicator for Adosc {
    fn name(&self) -> &str {
        "adosc"
    }

    fn lookback(&self) -> usize {
        self.slow - 1
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        let ad = ad_line(series);
        let fast = ema_of_series(&ad, self.fast);
        let slow = ema_of_series(&ad, self.slow);
        fast.iter().zip(&slow).map(|(f, s)| f - s).collect()
    }
}

/// The volume category with its default parameter table.
pub fn default_indicators() -> Vec<Box<dyn Indicator>> {
    vec![Box::new(Obv), Box::new(Ad), Box::new(Adosc::new(3, 10))]
}
