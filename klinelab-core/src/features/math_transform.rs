//! Math transforms — elementwise functions of close.
//!
//! Functions whose natural domain is bounded (asin, tanh, exp and friends)
//! operate on close divided by the series maximum so crypto prices in the
//! tens of thousands stay inside the useful range. That scaling factor uses
//! the full series, which is the one documented exception to the
//! no-lookahead rule.

use super::indicator::{Indicator, OhlcvSeries};

/// Which elementwise function to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathFunc {
    Ln,
    Log10,
    Sqrt,
    Ceil,
    Floor,
    Atan,
    Sin,
    Cos,
    // Applied to max-scaled close
    Asin,
    Acos,
    Exp,
    Sinh,
    Cosh,
    Tanh,
    Tan,
}

impl MathFunc {
    fn needs_scaling(self) -> bool {
        matches!(
            self,
            MathFunc::Asin
                | MathFunc::Acos
                | MathFunc::Exp
                | MathFunc::Sinh
                | MathFunc::Cosh
                | MathFunc::Tanh
                | MathFunc::Tan
        )
    }

    fn apply(self, v: f64) -> f64 {
        match self {
            MathFunc::Ln => v.ln(),
            MathFunc::Log10 => v.log10(),
            MathFunc::Sqrt => v.sqrt(),
            MathFunc::Ceil => v.ceil(),
            MathFunc::Floor => v.floor(),
            MathFunc::Atan => v.atan(),
            MathFunc::Sin => v.sin(),
            MathFunc::Cos => v.cos(),
            MathFunc::Asin => v.asin(),
            MathFunc::Acos => v.acos(),
            MathFunc::Exp => v.exp(),
            MathFunc::Sinh => v.sinh(),
            MathFunc::Cosh => v.cosh(),
            MathFunc::Tanh => v.tanh(),
            MathFunc::Tan => v.tan(),
        }
    }
}

/// An elementwise math function of close.
#[derive(Debug, Clone)]
pub struct MathTransform {
    func: MathFunc,
}

impl MathTransform {
    pub fn new(func: MathFunc) -> Self {
        Self { func }
    }
}

impl Indicator for MathTransform {
    fn name(&self) -> &str {
        match self.func {
            MathFunc::Ln => "ln",
            MathFunc::Log10 => "log10",
            MathFunc::Sqrt => "sqrt",
            MathFunc::Ceil => "ceil",
            MathFunc::Floor => "floor",
            MathFunc::Atan => "atan",
            MathFunc::Sin => "sin",
            MathFunc::Cos => "cos",
            MathFunc::Asin => "asin",
            MathFunc::Acos => "acos",
            MathFunc::Exp => "exp",
            MathFunc::Sinh => "sinh",
            MathFunc::Cosh => "cosh",
            MathFunc::Tanh => "tanh",
            MathFunc::Tan => "tan",
        }
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        let func = self.func;
        if func.needs_scaling() {
            let max = series
                .close
                .iter()
                .cloned()
                .filter(|v| !v.is_nan())
                .fold(f64::NEG_INFINITY, f64::max);
            if !max.is_finite() || max == 0.0 {
                return vec![f64::NAN; series.len()];
            }
            series.close.iter().map(|v| func.apply(v / max)).collect()
        } else {
            series.close.iter().map(|v| func.apply(*v)).collect()
        }
    }
}

/// The math-transform category, all fifteen functions.
pub fn default_indicators() -> Vec<Box<dyn Indicator>> {
    [
        MathFunc::Ln,
        MathFunc::Log10,
        MathFunc::Sqrt,
        MathFunc::Ceil,
        MathFunc::Floor,
        MathFunc::Atan,
        MathFunc::Sin,
        MathFunc::Cos,
        MathFunc::Asin,
        MathFunc::Acos,
        MathFunc::Exp,
        MathFunc::Sinh,
        MathFunc::Cosh,
        MathFunc::Tanh,
        MathFunc::Tan,
    ]
    .into_iter()
    .map(|f| Box::new(MathTransform::new(f)) as Box<dyn Indicator>)
    .collect()
}
