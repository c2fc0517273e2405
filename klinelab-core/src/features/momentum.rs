//! Momentum indicators — oscillators and rate-of-change measures built on
//! bar-to-bar price movement.

use super::indicator::{Indicator, OhlcvSeries};
use super::overlap::{ema_of_series, rolling_apply, sma_of_series};
use super::volatility::{true_range, wilder_smooth};

/// Split close changes into gain and loss magnitudes. First bar is NaN.
fn gains_and_losses(close: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let n = close.len();
    let mut gains = vec![f64::NAN; n];
    let mut losses = vec![f64::NAN; n];
    for i in 1..n {
        let change = close[i] - close[i - 1];
        gains[i] = change.max(0.0);
        losses[i] = (-change).max(0.0);
    }
    (gains, losses)
}

fn typical_price(series: &OhlcvSeries) -> Vec<f64> {
    series
        .high
        .iter()
        .zip(&series.low)
        .zip(&series.close)
        .map(|((h, l), c)| (h + l + c) / 3.0)
        .collect()
}

/// Raw %K: where `closes` sits in the rolling extreme range of `highs` and
/// `lows`, 0 to 100. A flat range reads 50.
fn percent_k(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }
    for i in (period - 1)..n {
        let start = i + 1 - period;
        let window_highs = &highs[start..=i];
        let window_lows = &lows[start..=i];
        if window_highs.iter().chain(window_lows).any(|v| v.is_nan()) {
            continue;
        }
        let hh = window_highs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let ll = window_lows.iter().cloned().fold(f64::INFINITY, f64::min);
        result[i] = if hh == ll {
            50.0
        } else {
            100.0 * (closes[i] - ll) / (hh - ll)
        };
    }
    result
}

/// Relative Strength Index on Wilder-smoothed gains and losses.
///
/// A window with no movement at all reads 50.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        let (gains, losses) = gains_and_losses(&series.close);
        let avg_gain = wilder_smooth(&gains, self.period);
        let avg_loss = wilder_smooth(&losses, self.period);
        avg_gain
            .iter()
            .zip(&avg_loss)
            .map(|(g, l)| {
                if g.is_nan() || l.is_nan() {
                    f64::NAN
                } else if g + l == 0.0 {
                    50.0
                } else {
                    100.0 * g / (g + l)
                }
            })
            .collect()
    }
}

/// How to express the close-over-lagged-close ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RocKind {
    /// Percent change: 100 * (close / lag - 1).
    Roc,
    /// Fractional change: close / lag - 1.
    Rocp,
    /// Plain ratio: close / lag.
    Rocr,
    /// Ratio scaled to 100.
    Rocr100,
}

/// Rate of change against the close `period` bars back.
#[derive(Debug, Clone)]
pub struct Roc {
    period: usize,
    kind: RocKind,
    name: String,
}

impl Roc {
    pub fn new(period: usize, kind: RocKind) -> Self {
        assert!(period >= 1, "ROC period must be >= 1");
        let prefix = match kind {
            RocKind::Roc => "roc",
            RocKind::Rocp => "rocp",
            RocKind::Rocr => "rocr",
            RocKind::Rocr100 => "rocr100",
        };
        Self {
            period,
            kind,
            name: format!("{prefix}_{period}"),
        }
    }
}

impl Indicator for Roc {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        let n = series.len();
        let mut result = vec![f64::NAN; n];
        for i in self.period..n {
            let lag = series.close[i - self.period];
            if lag == 0.0 {
                continue;
            }
            let ratio = series.close[i] / lag;
            result[i] = match self.kind {
                RocKind::Roc => 100.0 * (ratio - 1.0),
                RocKind::Rocp => ratio - 1.0,
                RocKind::Rocr => ratio,
                RocKind::Rocr100 => 100.0 * ratio,
            };
        }
        result
    }
}

/// Momentum: close minus the close `period` bars back.
#[derive(Debug, Clone)]
pub struct Mom {
    period: usize,
    name: String,
}

impl Mom {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "MOM period must be >= 1");
        Self {
            period,
            name: format!("mom_{period}"),
        }
    }
}

impl Indicator for Mom {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        let n = series.len();
        let mut result = vec![f64::NAN; n];
        for i in self.period..n {
            result[i] = series.close[i] - series.close[i - self.period];
        }
        result
    }
}

/// Commodity Channel Index on typical price with the 0.015 scaling constant.
#[derive(Debug, Clone)]
pub struct Cci {
    period: usize,
    name: String,
}

impl Cci {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "CCI period must be >= 1");
        Self {
            period,
            name: format!("cci_{period}"),
        }
    }
}

impl Indicator for Cci {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        let tp = typical_price(series);
        let p = self.period as f64;
        rolling_apply(&tp, self.period, move |w| {
            let mean = w.iter().sum::<f64>() / p;
            let mad = w.iter().map(|v| (v - mean).abs()).sum::<f64>() / p;
            if mad == 0.0 {
                0.0
            } else {
                (w[w.len() - 1] - mean) / (0.015 * mad)
            }
        })
    }
}

/// Chande Momentum Oscillator over rolling gain and loss sums.
#[derive(Debug, Clone)]
pub struct Cmo {
    period: usize,
    name: String,
}

impl Cmo {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "CMO period must be >= 1");
        Self {
            period,
            name: format!("cmo_{period}"),
        }
    }
}

impl Indicator for Cmo {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        let (gains, losses) = gains_and_losses(&series.close);
        let sum_gain = rolling_apply(&gains, self.period, |w| w.iter().sum());
        let sum_loss = rolling_apply(&losses, self.period, |w| w.iter().sum());
        sum_gain
            .iter()
            .zip(&sum_loss)
            .map(|(g, l)| {
                if g.is_nan() || l.is_nan() {
                    f64::NAN
                } else if g + l == 0.0 {
                    0.0
                } else {
                    100.0 * (g - l) / (g + l)
                }
            })
            .collect()
    }
}

/// Williams %R: where close sits in the window's high-low range, 0 to -100.
#[derive(Debug, Clone)]
pub struct Willr {
    period: usize,
    name: String,
}

impl Willr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "WILLR period must be >= 1");
        Self {
            period,
            name: format!("willr_{period}"),
        }
    }
}

impl Indicator for Willr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        let n = series.len();
        let p = self.period;
        let mut result = vec![f64::NAN; n];
        if n < p {
            return result;
        }
        for i in (p - 1)..n {
            let start = i + 1 - p;
            let highs = &series.high[start..=i];
            let lows = &series.low[start..=i];
            if highs.iter().chain(lows).any(|v| v.is_nan()) {
                continue;
            }
            let hh = highs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let ll = lows.iter().cloned().fold(f64::INFINITY, f64::min);
            result[i] = if hh == ll {
                0.0
            } else {
                -100.0 * (hh - series.close[i]) / (hh - ll)
            };
        }
        result
    }
}

/// Balance of Power: (close - open) / (high - low) per bar.
#[derive(Debug, Clone)]
pub struct Bop;

impl Indicator for Bop {
    fn name(&self) -> &str {
        "bop"
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        series
            .open
            .iter()
            .zip(&series.high)
            .zip(&series.low)
            .zip(&series.close)
            .map(|(((o, h), l), c)| {
                let range = h - l;
                if range == 0.0 {
                    0.0
                } else {
                    (c - o) / range
                }
            })
            .collect()
    }
}

/// Absolute Price Oscillator: fast SMA minus slow SMA.
#[derive(Debug, Clone)]
pub struct Apo {
    fast: usize,
    slow: usize,
}

impl Apo {
    pub fn new(fast: usize, slow: usize) -> Self {
        assert!(fast >= 1 && slow > fast, "APO needs 1 <= fast < slow");
        Self { fast, slow }
    }
}

impl Indicator for Apo {
    fn name(&self) -> &str {
        "apo"
    }

    fn lookback(&self) -> usize {
        self.slow - 1
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        let fast = sma_of_series(&series.close, self.fast);
        let slow = sma_of_series(&series.close, self.slow);
        fast.iter().zip(&slow).map(|(f, s)| f - s).collect()
    }
}

/// Percentage Price Oscillator: APO as a percent of the slow SMA.
#[derive(Debug, Clone)]
pub struct Ppo {
    fast: usize,
    slow: usize,
}

impl Ppo {
    pub fn new(fast: usize, slow: usize) -> Self {
        assert!(fast >= 1 && slow > fast, "PPO needs 1 <= fast < slow");
        Self { fast, slow }
    }
}

impl Indicator for Ppo {
    fn name(&self) -> &str {
        "ppo"
    }

    fn lookback(&self) -> usize {
        self.slow - 1
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        let fast = sma_of_series(&series.close, self.fast);
        let slow = sma_of_series(&series.close, self.slow);
        fast.iter()
            .zip(&slow)
            .map(|(f, s)| if *s == 0.0 { f64::NAN } else { 100.0 * (f - s) / s })
            .collect()
    }
}

/// Which output of the MACD stack to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdPart {
    Line,
    Signal,
    Hist,
}

/// MACD: fast EMA minus slow EMA, with a signal EMA over the difference.
#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
    part: MacdPart,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize, part: MacdPart) -> Self {
        assert!(fast >= 1 && slow > fast && signal >= 1, "bad MACD periods");
        Self {
            fast,
            slow,
            signal,
            part,
        }
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        match self.part {
            MacdPart::Line => "macd",
            MacdPart::Signal => "macd_signal",
            MacdPart::Hist => "macd_hist",
        }
    }

    fn lookback(&self) -> usize {
        self.slow - 1 + self.signal - 1
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        let fast = ema_of_series(&series.close, self.fast);
        let slow = ema_of_series(&series.close, self.slow);
        let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        match self.part {
            MacdPart::Line => line,
            MacdPart::Signal => ema_of_series(&line, self.signal),
            MacdPart::Hist => {
                let signal = ema_of_series(&line, self.signal);
                line.iter().zip(&signal).map(|(l, s)| l - s).collect()
            }
        }
    }
}

/// Which line of the slow stochastic to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StochPart {
    SlowK,
    SlowD,
}

/// Slow Stochastic: raw %K over the high-low range, SMA-smoothed twice.
#[derive(Debug, Clone)]
pub struct Stoch {
    k_period: usize,
    slow_k: usize,
    slow_d: usize,
    part: StochPart,
}

impl Stoch {
    pub fn new(k_period: usize, slow_k: usize, slow_d: usize, part: StochPart) -> Self {
        assert!(
            k_period >= 1 && slow_k >= 1 && slow_d >= 1,
            "Stoch periods must be >= 1"
        );
        Self {
            k_period,
            slow_k,
            slow_d,
            part,
        }
    }

    fn raw_k(&self, series: &OhlcvSeries) -> Vec<f64> {
        percent_k(&series.high, &series.low, &series.close, self.k_period)
    }
}

impl Indicator for Stoch {
    fn name(&self) -> &str {
        match self.part {
            StochPart::SlowK => "stoch_k",
            StochPart::SlowD => "stoch_d",
        }
    }

    fn lookback(&self) -> usize {
        let base = self.k_period - 1 + self.slow_k - 1;
        match self.part {
            StochPart::SlowK => base,
            StochPart::SlowD => base + self.slow_d - 1,
        }
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        let slow_k = sma_of_series(&self.raw_k(series), self.slow_k);
        match self.part {
            StochPart::SlowK => slow_k,
            StochPart::SlowD => sma_of_series(&slow_k, self.slow_d),
        }
    }
}

/// Which line of a fast stochastic to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FastPart {
    K,
    D,
}

/// Fast Stochastic: the raw %K with a single SMA over it for %D.
#[derive(Debug, Clone)]
pub struct StochF {
    k_period: usize,
    d_period: usize,
    part: FastPart,
}

impl StochF {
    pub fn new(k_period: usize, d_period: usize, part: FastPart) -> Self {
        assert!(
            k_period >= 1 && d_period >= 1,
            "StochF periods must be >= 1"
        );
        Self {
            k_period,
            d_period,
            part,
        }
    }
}

impl Indicator for StochF {
    fn name(&self) -> &str {
        match self.part {
            FastPart::K => "stochf_k",
            FastPart::D => "stochf_d",
        }
    }

    fn lookback(&self) -> usize {
        match self.part {
            FastPart::K => self.k_period - 1,
            FastPart::D => self.k_period - 1 + self.d_period - 1,
        }
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        let k = percent_k(&series.high, &series.low, &series.close, self.k_period);
        match self.part {
            FastPart::K => k,
            FastPart::D => sma_of_series(&k, self.d_period),
        }
    }
}

/// Stochastic RSI: fast stochastic applied to the RSI series itself.
#[derive(Debug, Clone)]
pub struct StochRsi {
    rsi_period: usize,
    fastk: usize,
    fastd: usize,
    part: FastPart,
}

impl StochRsi {
    pub fn new(rsi_period: usize, fastk: usize, fastd: usize, part: FastPart) -> Self {
        assert!(
            rsi_period >= 1 && fastk >= 1 && fastd >= 1,
            "StochRSI periods must be >= 1"
        );
        Self {
            rsi_period,
            fastk,
            fastd,
            part,
        }
    }
}

impl Indicator for StochRsi {
    fn name(&self) -> &str {
        match self.part {
            FastPart::K => "stochrsi_k",
            FastPart::D => "stochrsi_d",
        }
    }

    fn lookback(&self) -> usize {
        let base = self.rsi_period + self.fastk - 1;
        match self.part {
            FastPart::K => base,
            FastPart::D => base + self.fastd - 1,
        }
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        let rsi = Rsi::new(self.rsi_period).compute(series);
        let k = percent_k(&rsi, &rsi, &rsi, self.fastk);
        match self.part {
            FastPart::K => k,
            FastPart::D => sma_of_series(&k, self.fastd),
        }
    }
}

/// TRIX: one-bar percent change of a triple-smoothed EMA of close.
#[derive(Debug, Clone)]
pub struct Trix {
    period: usize,
    name: String,
}

impl Trix {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "TRIX period must be >= 1");
        Self {
            period,
            name: format!("trix_{period}"),
        }
    }
}

impl Indicator for Trix {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        3 * (self.period - 1) + 1
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        let e1 = ema_of_series(&series.close, self.period);
        let e2 = ema_of_series(&e1, self.period);
        let e3 = ema_of_series(&e2, self.period);
        let n = e3.len();
        let mut result = vec![f64::NAN; n];
        for i in 1..n {
            let prev = e3[i - 1];
            if prev.is_nan() || e3[i].is_nan() || prev == 0.0 {
                continue;
            }
            result[i] = 100.0 * (e3[i] - prev) / prev;
        }
        result
    }
}

/// Ultimate Oscillator: buying pressure over true range, blended across
/// three window lengths weighted 4/2/1.
#[derive(Debug, Clone)]
pub struct Ultosc {
    short: usize,
    medium: usize,
    long: usize,
}

impl Ultosc {
    pub fn new(short: usize, medium: usize, long: usize) -> Self {
        assert!(
            short >= 1 && medium > short && long > medium,
            "ULTOSC needs 1 <= short < medium < long"
        );
        Self {
            short,
            medium,
            long,
        }
    }
}

impl Indicator for Ultosc {
    fn name(&self) -> &str {
        "ultosc"
    }

    fn lookback(&self) -> usize {
        self.long
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        let n = series.len();
        let tr = true_range(series);
        let mut bp = vec![f64::NAN; n];
        for i in 1..n {
            bp[i] = series.close[i] - series.low[i].min(series.close[i - 1]);
        }

        let pressure = |period: usize| -> Vec<f64> {
            let bp_sum = rolling_apply(&bp, period, |w| w.iter().sum());
            let tr_sum = rolling_apply(&tr, period, |w| w.iter().sum());
            bp_sum
                .iter()
                .zip(&tr_sum)
                .map(|(b, t)| {
                    if b.is_nan() || t.is_nan() {
                        f64::NAN
                    } else if *t == 0.0 {
                        0.0
                    } else {
                        b / t
                    }
                })
                .collect()
        };

        let a = pressure(self.short);
        let b = pressure(self.medium);
        let c = pressure(self.long);
        (0..n)
            .map(|i| 100.0 * (4.0 * a[i] + 2.0 * b[i] + c[i]) / 7.0)
            .collect()
    }
}

/// Money Flow Index: volume-weighted RSI on typical price.
#[derive(Debug, Clone)]
pub struct Mfi {
    period: usize,
    name: String,
}

impl Mfi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "MFI period must be >= 1");
        Self {
            period,
            name: format!("mfi_{period}"),
        }
    }
}

impl Indicator for Mfi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        let n = series.len();
        let tp = typical_price(series);
        let mut pos = vec![f64::NAN; n];
        let mut neg = vec![f64::NAN; n];
        for i in 1..n {
            let flow = tp[i] * series.volume[i];
            if tp[i] > tp[i - 1] {
                pos[i] = flow;
                neg[i] = 0.0;
            } else if tp[i] < tp[i - 1] {
                pos[i] = 0.0;
                neg[i] = flow;
            } else {
                pos[i] = 0.0;
                neg[i] = 0.0;
            }
        }
        let pos_sum = rolling_apply(&pos, self.period, |w| w.iter().sum());
        let neg_sum = rolling_apply(&neg, self.period, |w| w.iter().sum());
        pos_sum
            .iter()
            .zip(&neg_sum)
            .map(|(p, m)| {
                if p.is_nan() || m.is_nan() {
                    f64::NAN
                } else if p + m == 0.0 {
                    50.0
                } else {
                    100.0 * p / (p + m)
                }
            })
            .collect()
    }
}

/// Which Aroon output to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AroonPart {
    Up,
    Down,
    Osc,
}

/// Aroon: bars since the window extreme, scaled to 0..100.
///
/// Ties go to the most recent bar, matching the usual convention.
#[derive(Debug, Clone)]
pub struct Aroon {
    period: usize,
    part: AroonPart,
    name: String,
}

impl Aroon {
    pub fn new(period: usize, part: AroonPart) -> Self {
        assert!(period >= 1, "Aroon period must be >= 1");
        let prefix = match part {
            AroonPart::Up => "aroon_up",
            AroonPart::Down => "aroon_down",
            AroonPart::Osc => "aroonosc",
        };
        Self {
            period,
            part,
            name: format!("{prefix}_{period}"),
        }
    }
}

impl Indicator for Aroon {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        let n = series.len();
        let p = self.period;
        let window = p + 1;
        let mut result = vec![f64::NAN; n];
        if n < window {
            return result;
        }
        for i in (window - 1)..n {
            let start = i + 1 - window;
            let highs = &series.high[start..=i];
            let lows = &series.low[start..=i];
            if highs.iter().chain(lows).any(|v| v.is_nan()) {
                continue;
            }
            let mut hi_idx = 0;
            let mut lo_idx = 0;
            for j in 0..window {
                if highs[j] >= highs[hi_idx] {
                    hi_idx = j;
                }
                if lows[j] <= lows[lo_idx] {
                    lo_idx = j;
                }
            }
            let up = 100.0 * hi_idx as f64 / p as f64;
            let down = 100.0 * lo_idx as f64 / p as f64;
            result[i] = match self.part {
                AroonPart::Up => up,
                AroonPart::Down => down,
                AroonPart::Osc => up - down,
            };
        }
        result
    }
}

/// Which output of the directional movement stack to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmPart {
    PlusDm,
    MinusDm,
    PlusDi,
    MinusDi,
    Dx,
    Adx,
    Adxr,
}

/// Wilder's directional movement system: +DI, -DI, DX, and ADX.
#[derive(Debug, Clone)]
pub struct DirectionalMovement {
    period: usize,
    part: DmPart,
    name: String,
}

impl DirectionalMovement {
    pub fn new(period: usize, part: DmPart) -> Self {
        assert!(period >= 1, "DM period must be >= 1");
        let prefix = match part {
            DmPart::PlusDm => "plus_dm",
            DmPart::MinusDm => "minus_dm",
            DmPart::PlusDi => "plus_di",
            DmPart::MinusDi => "minus_di",
            DmPart::Dx => "dx",
            DmPart::Adx => "adx",
            DmPart::Adxr => "adxr",
        };
        Self {
            period,
            part,
            name: format!("{prefix}_{period}"),
        }
    }

    /// Raw +DM and -DM per bar. First bar is NaN.
    fn raw_dm(series: &OhlcvSeries) -> (Vec<f64>, Vec<f64>) {
        let n = series.len();
        let mut plus_dm = vec![f64::NAN; n];
        let mut minus_dm = vec![f64::NAN; n];
        for i in 1..n {
            let up = series.high[i] - series.high[i - 1];
            let down = series.low[i - 1] - series.low[i];
            plus_dm[i] = if up > down && up > 0.0 { up } else { 0.0 };
            minus_dm[i] = if down > up && down > 0.0 { down } else { 0.0 };
        }
        (plus_dm, minus_dm)
    }

    fn directional_indices(&self, series: &OhlcvSeries) -> (Vec<f64>, Vec<f64>) {
        let (plus_dm, minus_dm) = Self::raw_dm(series);
        let smooth_tr = wilder_smooth(&true_range(series), self.period);
        let smooth_plus = wilder_smooth(&plus_dm, self.period);
        let smooth_minus = wilder_smooth(&minus_dm, self.period);

        let di = |dm: &[f64]| -> Vec<f64> {
            dm.iter()
                .zip(&smooth_tr)
                .map(|(d, tr)| {
                    if d.is_nan() || tr.is_nan() || *tr == 0.0 {
                        f64::NAN
                    } else {
                        100.0 * d / tr
                    }
                })
                .collect()
        };
        (di(&smooth_plus), di(&smooth_minus))
    }
}

impl Indicator for DirectionalMovement {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        match self.part {
            DmPart::PlusDm | DmPart::MinusDm => self.period,
            DmPart::PlusDi | DmPart::MinusDi | DmPart::Dx => self.period,
            DmPart::Adx => 2 * self.period,
            DmPart::Adxr => 3 * self.period - 1,
        }
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        if matches!(self.part, DmPart::PlusDm | DmPart::MinusDm) {
            let (plus_dm, minus_dm) = Self::raw_dm(series);
            let dm = match self.part {
                DmPart::PlusDm => plus_dm,
                _ => minus_dm,
            };
            // Wilder's running sum rather than the averaged form the DI
            // ratios use, so the raw movement totals stay visible.
            return wilder_smooth(&dm, self.period)
                .iter()
                .map(|v| v * self.period as f64)
                .collect();
        }

        let (plus_di, minus_di) = self.directional_indices(series);
        match self.part {
            DmPart::PlusDi => plus_di,
            DmPart::MinusDi => minus_di,
            _ => {
                let dx: Vec<f64> = plus_di
                    .iter()
                    .zip(&minus_di)
                    .map(|(p, m)| {
                        if p.is_nan() || m.is_nan() {
                            f64::NAN
                        } else if p + m == 0.0 {
                            0.0
                        } else {
                            100.0 * (p - m).abs() / (p + m)
                        }
                    })
                    .collect();
                match self.part {
                    DmPart::Dx => dx,
                    DmPart::Adx => wilder_smooth(&dx, self.period),
                    DmPart::Adxr => {
                        let adx = wilder_smooth(&dx, self.period);
                        let n = adx.len();
                        let shift = self.period - 1;
                        let mut result = vec![f64::NAN; n];
                        for i in shift..n {
                            let newer = adx[i];
                            let older = adx[i - shift];
                            if !newer.is_nan() && !older.is_nan() {
                                result[i] = 0.5 * (newer + older);
                            }
                        }
                        result
                    }
                    _ => unreachable!(),
                }
            }
        }
    }
}

/// The momentum category with its default parameter table.
pub fn default_indicators() -> Vec<Box<dyn Indicator>> {
    vec![
        Box::new(Rsi::new(14)),
        Box::new(Roc::new(10, RocKind::Roc)),
        Box::new(Roc::new(10, RocKind::Rocp)),
        Box::new(Roc::new(10, RocKind::Rocr)),
        Box::new(Roc::new(10, RocKind::Rocr100)),
        Box::new(Mom::new(10)),
        Box::new(Cci::new(14)),
        Box::new(Cmo::new(14)),
        Box::new(Willr::new(14)),
        Box::new(Bop),
        Box::new(Apo::new(12, 26)),
        Box::new(Ppo::new(12, 26)),
        Box::new(Macd::new(12, 26, 9, MacdPart::Line)),
        Box::new(Macd::new(12, 26, 9, MacdPart::Signal)),
        Box::new(Macd::new(12, 26, 9, MacdPart::Hist)),
        Box::new(Stoch::new(5, 3, 3, StochPart::SlowK)),
        Box::new(Stoch::new(5, 3, 3, StochPart::SlowD)),
        Box::new(StochF::new(5, 3, FastPart::K)),
        Box::new(StochF::new(5, 3, FastPart::D)),
        Box::new(StochRsi::new(14, 5, 3, FastPart::K)),
        Box::new(StochRsi::new(14, 5, 3, FastPart::D)),
        Box::new(Trix::new(30)),
        Box::new(Ultosc::new(7, 14, 28)),
        Box::new(Mfi::new(14)),
        Box::new(Aroon::new(14, AroonPart::Up)),
        Box::new(Aroon::new(14, AroonPart::Down)),
        Box::new(Aroon::new(14, AroonPart::Osc)),
        Box::new(DirectionalMovement::new(14, DmPart::PlusDm)),
        Box::new(DirectionalMovement::new(14, DmPart::MinusDm)),
        Box::new(DirectionalMovement::new(14, DmPart::PlusDi)),
        Box::new(DirectionalMovement::new(14, DmPart::MinusDi)),
        Box::new(DirectionalMovement::new(14, DmPart::Dx)),
        Box::new(DirectionalMovement::new(14, DmPart::Adx)),
        Box::new(DirectionalMovement::new(14, DmPart::Adxr)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{assert_approx, make_ohlc_series, make_series, DEFAULT_EPSILON};

    #[test]
    fn rsi_all_gains_is_100() {
        let closes: Vec<f64> = (1..=20).map(|i| i as f64).collect();
        let s = make_series(&closes);
        let rsi = Rsi::new(14).compute(&s);
        assert!(rsi[13].is_nan());
        assert_approx(rsi[19], 100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rsi_flat_is_50() {
        let s = make_series(&[5.0; 20]);
        let rsi = Rsi::new(14).compute(&s);
        assert_approx(rsi[19], 50.0, DEFAULT_EPSILON);
    }

    #[test]
    fn roc_variants_agree() {
        let s = make_series(&[100.0, 100.0, 100.0, 100.0, 100.0, 110.0]);
        let roc = Roc::new(5, RocKind::Roc).compute(&s);
        let rocp = Roc::new(5, RocKind::Rocp).compute(&s);
        let rocr = Roc::new(5, RocKind::Rocr).compute(&s);
        let rocr100 = Roc::new(5, RocKind::Rocr100).compute(&s);
        assert!(roc[4].is_nan());
        assert_approx(roc[5], 10.0, DEFAULT_EPSILON);
        assert_approx(rocp[5], 0.1, DEFAULT_EPSILON);
        assert_approx(rocr[5], 1.1, DEFAULT_EPSILON);
        assert_approx(rocr100[5], 110.0, DEFAULT_EPSILON);
    }

    #[test]
    fn mom_is_simple_difference() {
        let s = make_series(&[10.0, 12.0, 9.0, 15.0]);
        let mom = Mom::new(2).compute(&s);
        assert!(mom[1].is_nan());
        assert_approx(mom[2], -1.0, DEFAULT_EPSILON);
        assert_approx(mom[3], 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn cci_flat_window_is_zero() {
        let bars: Vec<(f64, f64, f64, f64)> =
            (0..20).map(|_| (10.0, 10.0, 10.0, 10.0)).collect();
        let s = make_ohlc_series(&bars);
        let cci = Cci::new(14).compute(&s);
        assert_approx(cci[19], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn cmo_all_gains_is_100() {
        let closes: Vec<f64> = (1..=20).map(|i| i as f64).collect();
        let s = make_series(&closes);
        let cmo = Cmo::new(14).compute(&s);
        assert_approx(cmo[19], 100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn willr_at_window_high_is_zero() {
        let bars: Vec<(f64, f64, f64, f64)> =
            (0..5).map(|i| (i as f64, i as f64 + 1.0, i as f64, i as f64 + 1.0)).collect();
        let s = make_ohlc_series(&bars);
        let willr = Willr::new(5).compute(&s);
        // Close equals the highest high of the window
        assert_approx(willr[4], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn bop_measures_body_over_range() {
        let s = make_ohlc_series(&[(10.0, 12.0, 8.0, 11.0)]);
        let bop = Bop.compute(&s);
        assert_approx(bop[0], 0.25, DEFAULT_EPSILON);
    }

    #[test]
    fn bop_zero_range_is_zero() {
        let s = make_ohlc_series(&[(10.0, 10.0, 10.0, 10.0)]);
        assert_approx(Bop.compute(&s)[0], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn apo_and_ppo_flat_series_are_zero() {
        let s = make_series(&[42.0; 40]);
        let apo = Apo::new(12, 26).compute(&s);
        let ppo = Ppo::new(12, 26).compute(&s);
        assert!(apo[24].is_nan());
        assert_approx(apo[39], 0.0, DEFAULT_EPSILON);
        assert_approx(ppo[39], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn macd_hist_is_line_minus_signal() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.7).sin()).collect();
        let s = make_series(&closes);
        let line = Macd::new(12, 26, 9, MacdPart::Line).compute(&s);
        let signal = Macd::new(12, 26, 9, MacdPart::Signal).compute(&s);
        let hist = Macd::new(12, 26, 9, MacdPart::Hist).compute(&s);
        for i in 0..60 {
            if hist[i].is_nan() {
                continue;
            }
            assert_approx(hist[i], line[i] - signal[i], 1e-9);
        }
        // Signal needs its own warm-up past the line's
        assert!(!line[25].is_nan());
        assert!(signal[25].is_nan());
    }

    #[test]
    fn stoch_close_at_high_reads_100() {
        let bars: Vec<(f64, f64, f64, f64)> =
            (0..12).map(|i| (i as f64, i as f64 + 1.0, i as f64, i as f64 + 1.0)).collect();
        let s = make_ohlc_series(&bars);
        let k = Stoch::new(5, 3, 3, StochPart::SlowK).compute(&s);
        let d = Stoch::new(5, 3, 3, StochPart::SlowD).compute(&s);
        assert_approx(k[11], 100.0, DEFAULT_EPSILON);
        assert_approx(d[11], 100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn stochf_close_at_high_reads_100() {
        let bars: Vec<(f64, f64, f64, f64)> =
            (0..12).map(|i| (i as f64, i as f64 + 1.0, i as f64, i as f64 + 1.0)).collect();
        let s = make_ohlc_series(&bars);
        let k = StochF::new(5, 3, FastPart::K).compute(&s);
        let d = StochF::new(5, 3, FastPart::D).compute(&s);
        assert!(k[3].is_nan());
        assert_approx(k[4], 100.0, DEFAULT_EPSILON);
        assert!(d[5].is_nan());
        assert_approx(d[6], 100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn stochrsi_flat_rsi_reads_50() {
        // Steady gains pin RSI at 100, so its rolling range collapses
        let closes: Vec<f64> = (1..=30).map(|i| i as f64).collect();
        let s = make_series(&closes);
        let k = StochRsi::new(14, 5, 3, FastPart::K).compute(&s);
        assert!(k[17].is_nan());
        assert_approx(k[18], 50.0, DEFAULT_EPSILON);
        assert_approx(k[29], 50.0, DEFAULT_EPSILON);
    }

    #[test]
    fn trix_of_constant_is_zero() {
        let s = make_series(&[50.0; 20]);
        let trix = Trix::new(3).compute(&s);
        // e1 seeds at 2, e2 at 4, e3 at 6; the percent change starts at 7
        assert!(trix[6].is_nan());
        assert_approx(trix[7], 0.0, DEFAULT_EPSILON);
        assert_approx(trix[19], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ultosc_balanced_bars_read_50() {
        // Every bar: bp = 10 - min(9, 10) = 1, tr = max(11, 10) - 9 = 2
        let bars: Vec<(f64, f64, f64, f64)> =
            (0..35).map(|_| (10.0, 11.0, 9.0, 10.0)).collect();
        let s = make_ohlc_series(&bars);
        let ult = Ultosc::new(7, 14, 28).compute(&s);
        assert!(ult[27].is_nan());
        assert_approx(ult[28], 50.0, DEFAULT_EPSILON);
    }

    #[test]
    fn mfi_flat_is_50() {
        let bars: Vec<(f64, f64, f64, f64)> =
            (0..20).map(|_| (10.0, 11.0, 9.0, 10.0)).collect();
        let s = make_ohlc_series(&bars);
        let mfi = Mfi::new(14).compute(&s);
        assert_approx(mfi[19], 50.0, DEFAULT_EPSILON);
    }

    #[test]
    fn aroon_up_100_on_fresh_high() {
        let bars: Vec<(f64, f64, f64, f64)> =
            (0..20).map(|i| (i as f64, i as f64 + 1.0, i as f64, i as f64 + 1.0)).collect();
        let s = make_ohlc_series(&bars);
        let up = Aroon::new(14, AroonPart::Up).compute(&s);
        let osc = Aroon::new(14, AroonPart::Osc).compute(&s);
        assert!(up[13].is_nan());
        assert_approx(up[19], 100.0, DEFAULT_EPSILON);
        // Monotonic rise: the low extreme is also the oldest bar
        assert_approx(osc[19], 100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn adx_strong_uptrend_reads_high() {
        let bars: Vec<(f64, f64, f64, f64)> = (0..60)
            .map(|i| {
                let base = 100.0 + i as f64;
                (base, base + 1.0, base - 1.0, base + 0.5)
            })
            .collect();
        let s = make_ohlc_series(&bars);
        let plus = DirectionalMovement::new(14, DmPart::PlusDi).compute(&s);
        let minus = DirectionalMovement::new(14, DmPart::MinusDi).compute(&s);
        let adx = DirectionalMovement::new(14, DmPart::Adx).compute(&s);
        assert!(plus[59] > minus[59]);
        assert!(adx[59] > 50.0);
        assert!(adx[20].is_nan());
    }

    #[test]
    fn raw_dm_totals_in_a_steady_uptrend() {
        // Highs and lows each rise by exactly 1 per bar: +DM = 1, -DM = 0
        let bars: Vec<(f64, f64, f64, f64)> = (0..60)
            .map(|i| {
                let base = 100.0 + i as f64;
                (base, base + 1.0, base - 1.0, base + 0.5)
            })
            .collect();
        let s = make_ohlc_series(&bars);
        let plus = DirectionalMovement::new(14, DmPart::PlusDm).compute(&s);
        let minus = DirectionalMovement::new(14, DmPart::MinusDm).compute(&s);
        assert!(plus[13].is_nan());
        // Wilder running sum of a constant 1 settles at the period
        assert_approx(plus[59], 14.0, 1e-9);
        assert_approx(minus[59], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn adxr_averages_current_and_lagged_adx() {
        let bars: Vec<(f64, f64, f64, f64)> = (0..80)
            .map(|i| {
                let base = 100.0 + i as f64 + (i as f64 * 0.9).sin();
                (base, base + 1.0, base - 1.0, base + 0.5)
            })
            .collect();
        let s = make_ohlc_series(&bars);
        let adx = DirectionalMovement::new(14, DmPart::Adx).compute(&s);
        let adxr = DirectionalMovement::new(14, DmPart::Adxr).compute(&s);
        for i in 60..80 {
            assert_approx(adxr[i], 0.5 * (adx[i] + adx[i - 13]), 1e-9);
        }
    }

    #[test]
    fn default_set_has_all_outputs() {
        let set = default_indicators();
        let names: Vec<&str> = set.iter().map(|i| i.name()).collect();
        for expected in [
            "rsi_14",
            "rocr100_10",
            "macd_hist",
            "stoch_d",
            "stochf_k",
            "stochrsi_d",
            "trix_30",
            "ultosc",
            "aroonosc_14",
            "plus_dm_14",
            "adx_14",
            "adxr_14",
        ] {
            assert!(names.contains(&expected), "missing {expected}");
        }
        assert_eq!(set.len(), 34);
    }
}
