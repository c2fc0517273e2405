//! Overlap studies — moving averages and bands that overlay the price chart.
//!
//! SMA/EMA/WMA over the standard period ladder, the smoothed family
//! (DEMA/TEMA/TRIMA/KAMA), midpoint prices, time-series forecast, and
//! Bollinger Bands. All are computed from close except MIDPRICE (high/low).

use super::indicator::{Indicator, OhlcvSeries};
use super::statistics::{rolling_linreg, LinRegPart};

/// Moving-average period ladder shared by SMA, EMA, and WMA.
pub const MA_PERIODS: [usize; 7] = [5, 10, 20, 30, 50, 100, 200];

/// Apply a window function over a rolling window.
///
/// Output is NaN until a full window is available and for any window
/// containing NaN.
pub fn rolling_apply(values: &[f64], period: usize, f: impl Fn(&[f64]) -> f64) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }
    for i in (period - 1)..n {
        let window = &values[(i + 1 - period)..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[i] = f(window);
    }
    result
}

/// Rolling mean.
pub fn sma_of_series(values: &[f64], period: usize) -> Vec<f64> {
    rolling_apply(values, period, |w| {
        w.iter().sum::<f64>() / period as f64
    })
}

/// Recursive EMA with SMA seed. Alpha = 2 / (period + 1).
///
/// Tolerates a leading NaN region (as produced by chained smoothing): the
/// seed window starts at the first run of `period` consecutive non-NaN
/// values. NaN after the seed taints the rest of the series.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n < period {
        return result;
    }

    // Find the first window of `period` consecutive non-NaN values
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

    let alpha = 2.0 / (period as f64 + 1.0);
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
        let ema = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = ema;
        prev = ema;
    }

    result
}

macro_rules! period_indicator {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $name {
            period: usize,
            name: String,
        }

        impl $name {
            pub fn new(period: usize) -> Self {
                assert!(period >= 1, concat!(stringify!($name), " period must be >= 1"));
                Self {
                    period,
                    name: format!(concat!($prefix, "_{}"), period),
                }
            }
        }
    };
}

period_indicator!(
    /// Simple Moving Average — rolling mean of close.
    Sma, "sma"
);

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        sma_of_series(&series.close, self.period)
    }
}

period_indicator!(
    /// Exponential Moving Average with SMA seed.
    Ema, "ema"
);

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        ema_of_series(&series.close, self.period)
    }
}

period_indicator!(
    /// Weighted Moving Average — linearly weighted toward the newest value.
    Wma, "wma"
);

impl Indicator for Wma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        let denom = (self.period * (self.period + 1)) as f64 / 2.0;
        rolling_apply(&series.close, self.period, |w| {
            w.iter()
                .enumerate()
                .map(|(j, v)| (j + 1) as f64 * v)
                .sum::<f64>()
                / denom
        })
    }
}

period_indicator!(
    /// Double EMA: 2*EMA - EMA(EMA). Halves the lag of a plain EMA.
    Dema, "dema"
);

impl Indicator for Dema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        2 * (self.period - 1)
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        let e1 = ema_of_series(&series.close, self.period);
        let e2 = ema_of_series(&e1, self.period);
        e1.iter().zip(&e2).map(|(a, b)| 2.0 * a - b).collect()
    }
}

period_indicator!(
    /// Triple EMA: 3*EMA - 3*EMA(EMA) + EMA(EMA(EMA)).
    Tema, "tema"
);

impl Indicator for Tema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        3 * (self.period - 1)
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        let e1 = ema_of_series(&series.close, self.period);
        let e2 = ema_of_series(&e1, self.period);
        let e3 = ema_of_series(&e2, self.period);
        e1.iter()
            .zip(&e2)
            .zip(&e3)
            .map(|((a, b), c)| 3.0 * a - 3.0 * b + c)
            .collect()
    }
}

period_indicator!(
    /// Triangular Moving Average — SMA of an SMA, center-weighted.
    Trima, "trima"
);

impl Indicator for Trima {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        // Even period p: SMA(SMA(close, p/2 + 1), p/2); odd: both (p+1)/2.
        let (first, second) = if self.period % 2 == 0 {
            (self.period / 2 + 1, self.period / 2)
        } else {
            ((self.period + 1) / 2, (self.period + 1) / 2)
        };
        sma_of_series(&sma_of_series(&series.close, first), second)
    }
}

period_indicator!(
    /// Midpoint of close over the window: (max + min) / 2.
    Midpoint, "midpoint"
);

impl Indicator for Midpoint {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        rolling_apply(&series.close, self.period, |w| {
            let max = w.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let min = w.iter().cloned().fold(f64::INFINITY, f64::min);
            (max + min) / 2.0
        })
    }
}

period_indicator!(
    /// Midprice over the window: (highest high + lowest low) / 2.
    Midprice, "midprice"
);

impl Indicator for Midprice {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        let n = series.len();
        let mut result = vec![f64::NAN; n];
        if n < self.period {
            return result;
        }
        for i in (self.period - 1)..n {
            let start = i + 1 - self.period;
            let highs = &series.high[start..=i];
            let lows = &series.low[start..=i];
            if highs.iter().chain(lows).any(|v| v.is_nan()) {
                continue;
            }
            let hh = highs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let ll = lows.iter().cloned().fold(f64::INFINITY, f64::min);
            result[i] = (hh + ll) / 2.0;
        }
        result
    }
}

period_indicator!(
    /// Kaufman Adaptive Moving Average — a recursive average whose smoothing
    /// tracks trend efficiency: fast in a clean trend, slow in chop.
    Kama, "kama"
);

impl Indicator for Kama {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        let close = &series.close;
        let n = close.len();
        let p = self.period;
        let mut result = vec![f64::NAN; n];
        if n <= p {
            return result;
        }

        // First output where the efficiency window is fully usable
        let mut first = None;
        'scan: for i in p..n {
            for v in &close[(i - p)..=i] {
                if v.is_nan() {
                    continue 'scan;
                }
            }
            first = Some(i);
            break;
        }
        let first = match first {
            Some(f) => f,
            None => return result,
        };

        // The smoothing bounds are fixed at 2 and 30 bars; the period only
        // sets the efficiency window.
        let fast = 2.0 / 3.0;
        let slow = 2.0 / 31.0;

        let mut prev = close[first - 1];
        for i in first..n {
            if close[i].is_nan() {
                for val in result.iter_mut().skip(i) {
                    *val = f64::NAN;
                }
                return result;
            }
            let change = (close[i] - close[i - p]).abs();
            let volatility: f64 = ((i - p + 1)..=i)
                .map(|j| (close[j] - close[j - 1]).abs())
                .sum();
            let er = if volatility == 0.0 {
                0.0
            } else {
                change / volatility
            };
            let sc = (er * (fast - slow) + slow).powi(2);
            prev += sc * (close[i] - prev);
            result[i] = prev;
        }
        result
    }
}

period_indicator!(
    /// Time Series Forecast — linear regression projected one step ahead.
    Tsf, "tsf"
);

impl Indicator for Tsf {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        rolling_linreg(&series.close, self.period, LinRegPart::Forecast)
    }
}

/// Which band of the Bollinger Bands to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    Upper,
    Middle,
    Lower,
}

/// Bollinger Bands — SMA +/- a population-stddev multiple.
#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    multiplier: f64,
    band: BollingerBand,
    name: String,
}

impl Bollinger {
    pub fn new(period: usize, multiplier: f64, band: BollingerBand) -> Self {
        assert!(period >= 1, "Bollinger period must be >= 1");
        let suffix = match band {
            BollingerBand::Upper => "upper",
            BollingerBand::Middle => "middle",
            BollingerBand::Lower => "lower",
        };
        Self {
            period,
            multiplier,
            band,
            name: format!("bb_{suffix}_{period}"),
        }
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        let period = self.period;
        let mult = self.multiplier;
        let band = self.band;
        rolling_apply(&series.close, period, move |w| {
            let mean = w.iter().sum::<f64>() / period as f64;
            match band {
                BollingerBand::Middle => mean,
                _ => {
                    let var =
                        w.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / period as f64;
                    let dev = mult * var.sqrt();
                    match band {
                        BollingerBand::Upper => mean + dev,
                        BollingerBand::Lower => mean - dev,
                        BollingerBand::Middle => unreachable!(),
                    }
                }
            }
        })
    }
}

/// The overlap category with its default parameter table.
///
/// Parabolic SAR and the MESA adaptive average pair are not implemented;
/// MAMA/FAMA sit with the missing Hilbert machinery in [`super::cycle`].
pub fn default_indicators() -> Vec<Box<dyn Indicator>> {
    let mut out: Vec<Box<dyn Indicator>> = Vec::new();
    for p in MA_PERIODS {
        out.push(Box::new(Sma::new(p)));
        out.push(Box::new(Ema::new(p)));
        out.push(Box::new(Wma::new(p)));
    }
    out.push(Box::new(Dema::new(30)));
    out.push(Box::new(Tema::new(30)));
    out.push(Box::new(Trima::new(30)));
    out.push(Box::new(Kama::new(30)));
    out.push(Box::new(Midpoint::new(14)));
    out.push(Box::new(Midprice::new(14)));
    out.push(Box::new(Tsf::new(14)));
    out.push(Box::new(Bollinger::new(20, 2.0, BollingerBand::Upper)));
    out.push(Box::new(Bollinger::new(20, 2.0, BollingerBand::Middle)));
    out.push(Box::new(Bollinger::new(20, 2.0, BollingerBand::Lower)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{assert_approx, make_series, DEFAULT_EPSILON};

    #[test]
    fn sma_5_basic() {
        let s = make_series(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0]);
        let result = Sma::new(5).compute(&s);

        assert_eq!(result.len(), 7);
        for i in 0..4 {
            assert!(result[i].is_nan(), "expected NaN at index {i}");
        }
        assert_approx(result[4], 12.0, DEFAULT_EPSILON);
        assert_approx(result[5], 13.0, DEFAULT_EPSILON);
        assert_approx(result[6], 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_nan_window_is_nan() {
        let mut s = make_series(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        s.close[2] = f64::NAN;
        let result = Sma::new(3).compute(&s);
        assert!(result[2].is_nan());
        assert!(result[3].is_nan());
        assert!(result[4].is_nan());
        assert_approx(result[5], 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_3_known_values() {
        // alpha = 0.5; seed at index 2: SMA(10,11,12) = 11.0
        // EMA[3] = 0.5*13 + 0.5*11 = 12.0; EMA[4] = 0.5*14 + 0.5*12 = 13.0
        let s = make_series(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let result = Ema::new(3).compute(&s);
        assert!(result[1].is_nan());
        assert_approx(result[2], 11.0, DEFAULT_EPSILON);
        assert_approx(result[3], 12.0, DEFAULT_EPSILON);
        assert_approx(result[4], 13.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_of_series_skips_leading_nan() {
        let values = [f64::NAN, f64::NAN, 10.0, 11.0, 12.0, 13.0];
        let result = ema_of_series(&values, 3);
        assert!(result[3].is_nan());
        // Seed at index 4: SMA(10,11,12) = 11.0; EMA[5] = 0.5*13 + 0.5*11 = 12.0
        assert_approx(result[4], 11.0, DEFAULT_EPSILON);
        assert_approx(result[5], 12.0, DEFAULT_EPSILON);
    }

    #[test]
    fn wma_weights_toward_recent() {
        let s = make_series(&[1.0, 2.0, 3.0]);
        let result = Wma::new(3).compute(&s);
        // (1*1 + 2*2 + 3*3) / 6 = 14/6
        assert_approx(result[2], 14.0 / 6.0, DEFAULT_EPSILON);
    }

    #[test]
    fn dema_of_constant_is_constant() {
        let s = make_series(&[50.0; 20]);
        let result = Dema::new(5).compute(&s);
        assert_approx(result[19], 50.0, DEFAULT_EPSILON);
    }

    #[test]
    fn tema_of_constant_is_constant() {
        let s = make_series(&[50.0; 30]);
        let result = Tema::new(5).compute(&s);
        assert_approx(result[29], 50.0, DEFAULT_EPSILON);
    }

    #[test]
    fn trima_3_is_weighted_center() {
        // TRIMA(3): SMA(SMA(x,2),2). Closes 1,2,3,4:
        // inner: NaN, 1.5, 2.5, 3.5; outer: NaN, NaN, 2.0, 3.0
        let s = make_series(&[1.0, 2.0, 3.0, 4.0]);
        let result = Trima::new(3).compute(&s);
        assert!(result[1].is_nan());
        assert_approx(result[2], 2.0, DEFAULT_EPSILON);
        assert_approx(result[3], 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn kama_of_constant_is_constant() {
        let s = make_series(&[50.0; 20]);
        let result = Kama::new(10).compute(&s);
        assert!(result[9].is_nan());
        for v in &result[10..] {
            assert_approx(*v, 50.0, DEFAULT_EPSILON);
        }
    }

    #[test]
    fn kama_trails_a_clean_trend() {
        let closes: Vec<f64> = (1..=40).map(|i| i as f64).collect();
        let s = make_series(&closes);
        let result = Kama::new(10).compute(&s);
        assert!(result[9].is_nan());
        // Perfect efficiency keeps the average moving, but always behind price
        for i in 11..40 {
            assert!(result[i] > result[i - 1], "kama must rise at {i}");
            assert!(result[i] < closes[i], "kama must trail the close at {i}");
        }
    }

    #[test]
    fn midpoint_is_half_range() {
        let s = make_series(&[1.0, 5.0, 3.0]);
        let result = Midpoint::new(3).compute(&s);
        assert_approx(result[2], 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn midprice_uses_high_low() {
        let s = crate::features::make_ohlc_series(&[
            (1.0, 10.0, 1.0, 5.0),
            (5.0, 8.0, 2.0, 6.0),
            (6.0, 7.0, 4.0, 5.0),
        ]);
        let result = Midprice::new(3).compute(&s);
        // highest high 10, lowest low 1 → 5.5
        assert_approx(result[2], 5.5, DEFAULT_EPSILON);
    }

    #[test]
    fn tsf_extrapolates_linear_trend() {
        // Perfectly linear closes: forecast lands on the next value
        let s = make_series(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let result = Tsf::new(3).compute(&s);
        assert_approx(result[2], 4.0, 1e-9);
        assert_approx(result[4], 6.0, 1e-9);
    }

    #[test]
    fn bollinger_bands_bracket_the_mean() {
        let s = make_series(&[2.0, 4.0, 6.0]);
        let mid = Bollinger::new(3, 2.0, BollingerBand::Middle).compute(&s);
        let upper = Bollinger::new(3, 2.0, BollingerBand::Upper).compute(&s);
        let lower = Bollinger::new(3, 2.0, BollingerBand::Lower).compute(&s);

        assert_approx(mid[2], 4.0, DEFAULT_EPSILON);
        // Population stddev of [2,4,6] = sqrt(8/3)
        let dev = 2.0 * (8.0f64 / 3.0).sqrt();
        assert_approx(upper[2], 4.0 + dev, DEFAULT_EPSILON);
        assert_approx(lower[2], 4.0 - dev, DEFAULT_EPSILON);
    }

    #[test]
    fn default_set_has_expected_columns() {
        let set = default_indicators();
        let names: Vec<&str> = set.iter().map(|i| i.name()).collect();
        assert!(names.contains(&"sma_200"));
        assert!(names.contains(&"ema_5"));
        assert!(names.contains(&"wma_50"));
        assert!(names.contains(&"bb_upper_20"));
        assert!(names.contains(&"tsf_14"));
        assert!(names.contains(&"kama_30"));
        // 7 periods * 3 MAs + 7 singles + 3 bands
        assert_eq!(set.len(), 31);
    }
}
