//! Volatility indicators — true range and its Wilder-smoothed forms.

use super::indicator::{Indicator, OhlcvSeries};

/// Per-bar true range: max(high - low, |high - prev close|, |low - prev close|).
///
/// The first bar has no previous close and is NaN.
pub fn true_range(series: &OhlcvSeries) -> Vec<f64> {
    let n = series.len();
    let mut result = vec![f64::NAN; n];
    for i in 1..n {
        let high = series.high[i];
        let low = series.low[i];
        let prev_close = series.close[i - 1];
        result[i] = (high - low)
            .max((high - prev_close).abs())
            .max((low - prev_close).abs());
    }
    result
}

/// Wilder smoothing: seed with the SMA of the first full window, then
/// `prev + (value - prev) / period`.
///
/// Scans past a leading NaN region for the seed window. NaN after the seed
/// taints the rest of the series.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }

    let mut seed_start = None;
    let mut run = 0usize;
    for (i, v) in values.iter().enumerate() {
        if v.is_nan() {
            run = 0;
        } else {
            run += 1;
            if run == period {
                seed_start = Some(i + 1 - period);
                break;
            }
        }
    }
    let seed_start = match seed_start {
        Some(s) => s,
        None => return result,
    };
    let seed_end = seed_start + period;

    let seed: f64 = values[seed_start..seed_end].iter().sum::<f64>() / period as f64;
    result[seed_end - 1] = seed;

    let mut prev = seed;
    for i in seed_end..n {
        if values[i].is_nan() {
            for val in result.iter_mut().skip(i) {
                *val = f64::NAN;
            }
            return result;
        }
        let next = prev + (values[i] - prev) / period as f64;
        result[i] = next;
        prev = next;
    }

    result
}

/// Raw per-bar true range.
#[derive(Debug, Clone)]
pub struct Trange;

impl Indicator for Trange {
    fn name(&self) -> &str {
        "trange"
    }

    fn lookback(&self) -> usize {
        1
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        true_range(series)
    }
}

/// Average True Range — Wilder-smoothed true range.
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        wilder_smooth(&true_range(series), self.period)
    }
}

/// Normalized ATR: 100 * ATR / close. Comparable across price levels.
#[derive(Debug, Clone)]
pub struct Natr {
    period: usize,
    name: String,
}

impl Natr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "NATR period must be >= 1");
        Self {
            period,
            name: format!("natr_{period}"),
        }
    }
}

impl Indicator for Natr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        let atr = wilder_smooth(&true_range(series), self.period);
        atr.iter()
            .zip(&series.close)
            .map(|(a, c)| if *c == 0.0 { f64::NAN } else { 100.0 * a / c })
            .collect()
    }
}

/// The volatility category with its default parameter table.
pub fn default_indicators() -> Vec<Box<dyn Indicator>> {
    vec![
        Box::new(Trange),
        Box::new(Atr::new(14)),
        Box::new(Natr::new(14)),
    ]
}
