//! Price transforms — per-bar blends of the OHLC components.

use super::indicator::{Indicator, OhlcvSeries};

/// Which blend of OHLC to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceBlend {
    /// (open + high + low + close) / 4
    Avg,
    /// (high + low) / 2
    Med,
    /// (high + low + close) / 3
    Typ,
    /// (high + low + 2 * close) / 4
    Wcl,
}

/// One of the standard OHLC blends as a per-bar series.
#[derive(Debug, Clone)]
pub struct PriceTransform {
    blend: PriceBlend,
}

impl PriceTransform {
    pub fn new(blend: PriceBlend) -> Self {
        Self { blend }
    }
}

impl Indicator for PriceTransform {
    fn name(&self) -> &str {
        match self.blend {
            PriceBlend::Avg => "avgprice",
            PriceBlend::Med => "medprice",
            PriceBlend::Typ => "typprice",
            PriceBlend::Wcl => "wclprice",
        }
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, series: &OhlcvSeries) -> Vec<f64> {
        let blend = self.blend;
        series
            .open
            .iter()
            .zip(&series.high)
            .zip(&series.low)
            .zip(&series.close)
            .map(|(((o, h), l), c)| match blend {
                PriceBlend::Avg => (o + h + l + c) / 4.0,
                PriceBlend::Med => (h + l) / 2.0,
                PriceBlend::Typ => (h + l + c) / 3.0,
                PriceBlend::Wcl => (h + l + 2.0 * c) / 4.0,
            })
            .collect()
    }
}

/// The price-transform category.
pub fn default_indicators() -> Vec<Box<dyn Indicator>> {
    vec![
        Box::new(PriceTransform::new(PriceBlend::Avg)),
        Box::new(PriceTransform::new(PriceBlend::Med)),
        Box::new(PriceTransform::new(PriceBlend::Typ)),
        Box::new(PriceTransform::new(PriceBlend::Wcl)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{assert_approx, make_ohlc_series, DEFAULT_EPSILON};

    #[test]
    fn blends_on_a_known_bar() {
        let s = make_ohlc_series(&[(10.0, 14.0, 6.0, 12.0)]);
        let avg = PriceTransform::new(PriceBlend::Avg).compute(&s);
        let med = PriceTransform::new(PriceBlend::Med).compute(&s);
        let typ = PriceTransform::new(PriceBlend::Typ).compute(&s);
        let wcl = PriceTransform::new(PriceBlend::Wcl).compute(&s);

        assert_approx(avg[0], 10.5, DEFAULT_EPSILON);
        assert_approx(med[0], 10.0, DEFAULT_EPSILON);
        assert_approx(typ[0], 32.0 / 3.0, DEFAULT_EPSILON);
        assert_approx(wcl[0], 11.0, DEFAULT_EPSILON);
    }

    #[test]
    fn no_warm_up_region() {
        let s = make_ohlc_series(&[(1.0, 2.0, 0.5, 1.5), (1.5, 3.0, 1.0, 2.0)]);
        for ind in default_indicators() {
            assert_eq!(ind.lookback(), 0);
            assert!(ind.compute(&s).iter().all(|v| !v.is_nan()));
        }
    }
}
