//! Candlestick pattern recognition.
//!
//! Each pattern emits a signal series: +100 for a bullish occurrence, -100
//! for a bearish one, 0 for no match. Patterns are judged from candle
//! anatomy alone; no trend filter is applied.

use super::indicator::{Indicator, OhlcvSeries};

/// Pattern column names this module knows about. The default set registers
/// the subset that is implemented; consumers can probe the rest by name and
/// skip what is absent.
pub const KNOWN_PATTERN_NAMES: &[&str] = &[
    "cdl_doji",
    "cdl_dragonfly_doji",
    "cdl_gravestone_doji",
    "cdl_hammer",
    "cdl_inverted_hammer",
    "cdl_marubozu",
    "cdl_spinning_top",
    "cdl_engulfing",
    "cdl_harami",
    "cdl_3whitesoldiers",
    "cdl_3blackcrows",
    "cdl_hanging_man",
    "cdl_shooting_star",
    "cdl_morning_star",
    "cdl_evening_star",
    "cdl_piercing",
    "cdl_dark_cloud_cover",
    "cdl_3inside",
    "cdl_3outside",
    "cdl_tasuki_gap",
];

/// Single-bar anatomy used by the recognizers.
#[derive(Debug, Clone, Copy)]
struct Anatomy {
    body: f64,
    upper: f64,
    lower: f64,
    range: f64,
    bullish: bool,
}

impl Anatomy {
    fn of(series: &OhlcvSeries, i: usize) -> Self {
        let open = series.open[i];
        let high = series.high[i];
        let low = series.low[i];
        let close = series.close[i];
        Self {
            body: (close - open).abs(),
            upper: high - open.max(close),
            lower: open.min(close) - low,
            range: high - low,
            bullish: close > open,
        }
    }

    fn is_doji(&self) -> bool {
        self.range > 0.0 && self.body <= 0.1 * self.range
    }
}

/// Which candlestick pattern to recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Doji,
    DragonflyDoji,
    GravestoneDoji,
    Hammer,
    InvertedHammer,
    Marubozu,
    SpinningTop,
    Engulfing,
    Harami,
    ThreeWhiteSoldiers,
    ThreeBlackCrows,
}

impl PatternKind {
    fn column_name(self) -> &'static str {
        match self {
            PatternKind::Doji => "cdl_doji",
            PatternKind::DragonflyDoji => "cdl_dragonfly_doji",
            PatternKind::GravestoneDoji => "cdl_gravestone_doji",
            PatternKind::Hammer => "cdl_hammer",
            PatternKind::InvertedHammer => "cdl_inverted_hammer",
            PatternKind::Marubozu => "cdl_marubozu",
            PatternKind::SpinningTop => "cdl_spinning_top",
            PatternKind::Engulfing => "cdl_engulfing",
            PatternKind::Harami => "cdl_harami",
            PatternKind::ThreeWhiteSoldiers => "cdl_3whitesoldiers",
            PatternKind::ThreeBlackCrows => "cdl_3blackcrows",
        }
    }

    fn bars_needed(self) -> usize {
        match self {
            PatternKind::Engulfing | PatternKind::Harami => 2,
            PatternKind::ThreeWhiteSoldiers | PatternKind::ThreeBlackCrows => 3,
            _ => 1,
        }
    }
}

/// One candlestick pattern as a +100/0/-100 signal series.
#[derive(Debug, Clone)]
pub struct Pattern {
    kind: PatternKind,
}

impl Pattern {
    pub fn new(kind: PatternKind) -> Self {
        Self { kind }
    }

    fn signal(&self, series: &OhlcvSeries, i: usize) -> f64 {
        let a = Anatomy::of(series, i);
        match self.kind {
            PatternKind::Doji => {
                if a.is_doji() {
                    100.0
                } else {
                    0.0
                }
            }
            PatternKind::DragonflyDoji => {
                if a.is_doji() && a.upper <= 0.1 * a.range && a.lower > 0.5 * a.range {
                    100.0
                } else {
                    0.0
                }
            }
            PatternKind::GravestoneDoji => {
                if a.is_doji() && a.lower <= 0.1 * a.range && a.upper > 0.5 * a.range {
                    100.0
                } else {
                    0.0
                }
            }
            PatternKind::Hammer => {
                if a.body > 0.0 && a.lower >= 2.0 * a.body && a.upper <= a.body {
                    100.0
                } else {
                    0.0
                }
            }
            PatternKind::InvertedHammer => {
                if a.body > 0.0 && a.upper >= 2.0 * a.body && a.lower <= a.body {
                    100.0
                } else {
                    0.0
                }
            }
            PatternKind::Marubozu => {
                if a.range > 0.0 && a.body >= 0.95 * a.range {
                    if a.bullish {
                        100.0
                    } else {
                        -100.0
                    }
                } else {
                    0.0
                }
            }
            PatternKind::SpinningTop => {
                let small_body = a.range > 0.0 && a.body < 0.4 * a.range && !a.is_doji();
                if small_body && a.upper > a.body && a.lower > a.body {
                    if a.bullish {
                        100.0
                    } else {
                        -100.0
                    }
                } else {
                    0.0
                }
            }
            PatternKind::Engulfing => {
                let prev = Anatomy::of(series, i - 1);
                let (po, pc) = (series.open[i - 1], series.close[i - 1]);
                let (o, c) = (series.open[i], series.close[i]);
                if a.bullish && !prev.bullish && o <= pc && c >= po && a.body > prev.body {
                    100.0
                } else if !a.bullish && prev.bullish && o >= pc && c <= po && a.body > prev.body {
                    -100.0
                } else {
                    0.0
                }
            }
            PatternKind::Harami => {
                let prev = Anatomy::of(series, i - 1);
                let (po, pc) = (series.open[i - 1], series.close[i - 1]);
                let (o, c) = (series.open[i], series.close[i]);
                let prev_top = po.max(pc);
                let prev_bot = po.min(pc);
                let inside = o > prev_bot && o < prev_top && c > prev_bot && c < prev_top;
                if inside && a.bullish && !prev.bullish {
                    100.0
                } else if inside && !a.bullish && prev.bullish {
                    -100.0
                } else {
                    0.0
                }
            }
            PatternKind::ThreeWhiteSoldiers => {
                if (0..3).all(|k| {
                    let j = i - 2 + k;
                    Anatomy::of(series, j).bullish
                }) && series.close[i - 1] > series.close[i - 2]
                    && series.close[i] > series.close[i - 1]
                    && series.open[i - 1] > series.open[i - 2]
                    && series.open[i] > series.open[i - 1]
                {
                    100.0
                } else {
                    0.0
                }
            }
            PatternKind::ThreeBlackCrows => {
                if (0..3).all(|k| {
                    let j = i - 2 + k;
                    !Anatomy::of(series, j).bullish && series.close[j] != series.open[j]
                }) && series.close[i - 1] < series.close[i - 2]
                    && series.close[i] < series.close[i - 1]
                    && series.open[i - 1] < series.open[i - 2]
                    && series.open[i] < series.open[i - 1]
                {
                    -100.0
                } else {
                    0.0
                }
            }
        }
    }
}

impl Indicator for Pattern {
    fn name(&self) -> &str {
        self.kind.column_name()
    }

    fn lookback(&self) -> usize {
        self.kind.bars_needed() - 1
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        let n = series.len();
        let start = self.kind.bars_needed() - 1;
        let mut result = vec![f64::NAN; n];
        for i in start..n {
            result[i] = self.signal(series, i);
        }
        result
    }
}

/// The pattern category: every implemented recognizer.
pub fn default_indicators() -> Vec<Box<dyn Indicator>> {
    [
        PatternKind::Doji,
        PatternKind::DragonflyDoji,
        PatternKind::GravestoneDoji,
        PatternKind::Hammer,
        PatternKind::InvertedHammer,
        PatternKind::Marubozu,
        PatternKind::SpinningTop,
        PatternKind::Engulfing,
        PatternKind::Harami,
        PatternKind::ThreeWhiteSoldiers,
        PatternKind::ThreeBlackCrows,
    ]
    .into_iter()
    .map(|k| Box::new(Pattern::new(k)) as Box<dyn Indicator>)
    .collect()
}
