//! Statistic functions — rolling dispersion, correlation, and linear
//! regression over price windows.

use super::indicator::{Indicator, OhlcvSeries};
use super::overlap::rolling_apply;

/// Which quantity of the rolling least-squares fit to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinRegPart {
    /// Fitted value at the last bar of the window.
    Value,
    /// Slope per bar.
    Slope,
    /// Slope expressed in degrees.
    Angle,
    /// Intercept at the first bar of the window.
    Intercept,
    /// Fitted line projected one bar past the window.
    Forecast,
}

/// Rolling least-squares fit of `values` against bar index 0..period.
///
/// The x axis is the window-local index, so `Value` evaluates the line at
/// x = period - 1 and `Forecast` at x = period.
pub(crate) fn rolling_linreg(values: &[f64], period: usize, part: LinRegPart) -> Vec<f64> {
    let p = period as f64;
    // Constant per window: sum(x), sum(x^2) for x = 0..period
    let sum_x = p * (p - 1.0) / 2.0;
    let sum_x2 = p * (p - 1.0) * (2.0 * p - 1.0) / 6.0;
    let denom = p * sum_x2 - sum_x * sum_x;

    rolling_apply(values, period, move |w| {
        let sum_y: f64 = w.iter().sum();
        let sum_xy: f64 = w.iter().enumerate().map(|(x, y)| x as f64 * y).sum();
        let slope = if denom == 0.0 {
            0.0
        } else {
            (p * sum_xy - sum_x * sum_y) / denom
        };
        let intercept = (sum_y - slope * sum_x) / p;
        match part {
            LinRegPart::Value => intercept + slope * (p - 1.0),
            LinRegPart::Slope => slope,
            LinRegPart::Angle => slope.atan().to_degrees(),
            LinRegPart::Intercept => intercept,
            LinRegPart::Forecast => intercept + slope * p,
        }
    })
}

/// Rolling population standard deviation of close.
#[derive(Debug, Clone)]
pub struct Stddev {
    period: usize,
    name: String,
}

impl Stddev {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "Stddev period must be >= 1");
        Self {
            period,
            name: format!("stddev_{period}"),
        }
    }
}

impl Indicator for Stddev {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        let p = self.period as f64;
        rolling_apply(&series.close, self.period, move |w| {
            let mean = w.iter().sum::<f64>() / p;
            (w.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / p).sqrt()
        })
    }
}

/// Rolling population variance of close.
#[derive(Debug, Clone)]
pub struct Var {
    period: usize,
    name: String,
}

impl Var {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "Var period must be >= 1");
        Self {
            period,
            name: format!("var_{period}"),
        }
    }
}

impl Indicator for Var {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        let p = self.period as f64;
        rolling_apply(&series.close, self.period, move |w| {
            let mean = w.iter().sum::<f64>() / p;
            w.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / p
        })
    }
}

/// Rolling Pearson correlation between high and low.
#[derive(Debug, Clone)]
pub struct Correl {
    period: usize,
    name: String,
}

impl Correl {
    pub fn new(period: usize) -> Self {
        assert!(period >= 2, "Correl period must be >= 2");
        Self {
            period,
            name: format!("correl_{period}"),
        }
    }
}

impl Indicator for Correl {
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
        let pf = p as f64;
        for i in (p - 1)..n {
            let start = i + 1 - p;
            let xs = &series.high[start..=i];
            let ys = &series.low[start..=i];
            if xs.iter().chain(ys).any(|v| v.is_nan()) {
                continue;
            }
            let mx = xs.iter().sum::<f64>() / pf;
            let my = ys.iter().sum::<f64>() / pf;
            let mut cov = 0.0;
            let mut vx = 0.0;
            let mut vy = 0.0;
            for (x, y) in xs.iter().zip(ys) {
                cov += (x - mx) * (y - my);
                vx += (x - mx).powi(2);
                vy += (y - my).powi(2);
            }
            // Zero variance in either leg leaves correlation undefined
            result[i] = if vx == 0.0 || vy == 0.0 {
                f64::NAN
            } else {
                cov / (vx.sqrt() * vy.sqrt())
            };
        }
        result
    }
}

/// Rolling linear regression of close against bar index.
#[derive(Debug, Clone)]
pub struct LinearReg {
    period: usize,
    part: LinRegPart,
    name: String,
}

impl LinearReg {
    pub fn new(period: usize, part: LinRegPart) -> Self {
        assert!(period >= 2, "LinearReg period must be >= 2");
        let suffix = match part {
            LinRegPart::Value => "linearreg",
            LinRegPart::Slope => "linearreg_slope",
            LinRegPart::Angle => "linearreg_angle",
            LinRegPart::Intercept => "linearreg_intercept",
            LinRegPart::Forecast => "linearreg_forecast",
        };
        Self {
            period,
            part,
            name: format!("{suffix}_{period}"),
        }
    }
}

impl Indicator for LinearReg {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        rolling_linreg(&series.close, self.period, self.part)
    }
}

/// The statistics category with its default parameter table.
pub fn default_indicators() -> Vec<Box<dyn Indicator>> {
    vec![
        Box::new(Stddev::new(5)),
        Box::new(Var::new(5)),
        Box::new(Correl::new(30)),
        Box::new(LinearReg::new(14, LinRegPart::Value)),
        Box::new(LinearReg::new(14, LinRegPart::Slope)),
        Box::new(LinearReg::new(14, LinRegPart::Angle)),
        Box::new(LinearReg::new(14, LinRegPart::Intercept)),
    ]
}
