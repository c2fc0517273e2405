//! Feature engine — runs every registered indicator over a candle frame and
//! appends the outputs as columns.

use polars::prelude::*;
use std::collections::BTreeMap;
use thiserror::Error;

use super::indicator::OhlcvSeries;
use super::registry::FeatureRegistry;

/// Raw OHLCV inputs the engine reads. These stay untouched in the output and
/// are never treated as features downstream.
pub const RAW_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

#[derive(Debug, Error)]
pub enum FeatureError {
    /// The only hard failure: the input frame lacks required OHLCV columns.
    #[error("input frame is missing required columns: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("dataframe operation failed: {0}")]
    Polars(#[from] PolarsError),
}

/// Computes the full feature matrix over candle frames. `compute` expects a
/// single symbol's rows; `compute_grouped` handles mixed-symbol frames.
pub struct FeatureEngine {
    registry: FeatureRegistry,
}

impl FeatureEngine {
    pub fn new(registry: FeatureRegistry) -> Self {
        Self { registry }
    }

    /// Engine over the default indicator set.
    pub fn default_set() -> Self {
        Self::new(FeatureRegistry::default_set())
    }

    pub fn registry(&self) -> &FeatureRegistry {
        &self.registry
    }

    /// Append one column per registered indicator to a copy of `df`.
    ///
    /// Rows must belong to a single symbol in ascending timestamp order.
    /// Non-float OHLCV columns are coerced; values that cannot be read as
    /// numbers become NaN rather than failing the run.
    pub fn compute(&self, df: &DataFrame) -> Result<DataFrame, FeatureError> {
        let series = extract_series(df)?;

        let mut out = df.clone();
        for (_, indicator) in self.registry.iter() {
            let values = indicator.compute(&series);
            debug_assert_eq!(values.len(), df.height());
            out.with_column(Column::new(indicator.name().into(), values))?;
        }
        Ok(out)
    }

    /// Compute the feature matrix for a frame holding several symbols.
    ///
    /// Rows are partitioned by `symbol_col` and each partition is computed on
    /// its own, so rolling windows never cross from one symbol into another.
    /// The partitions are restacked and sorted by timestamp.
    pub fn compute_grouped(
        &self,
        df: &DataFrame,
        symbol_col: &str,
    ) -> Result<DataFrame, FeatureError> {
        let Ok(col) = df.column(symbol_col) else {
            return Err(FeatureError::MissingColumns(vec![symbol_col.to_string()]));
        };

        let mut groups: BTreeMap<&str, Vec<IdxSize>> = BTreeMap::new();
        for (idx, symbol) in col.str()?.iter().enumerate() {
            groups
                .entry(symbol.unwrap_or(""))
                .or_default()
                .push(idx as IdxSize);
        }

        let mut out: Option<DataFrame> = None;
        for indices in groups.values() {
            let part = df.take(&IdxCa::from_vec("".into(), indices.clone()))?;
            let fdf = self.compute(&part)?;
            match out.as_mut() {
                None => out = Some(fdf),
                Some(acc) => {
                    acc.vstack_mut(&fdf)?;
                }
            }
        }

        let mut out = match out {
            Some(df) => df,
            None => self.compute(df)?,
        };
        out.sort_in_place(["timestamp"], SortMultipleOptions::default())?;
        Ok(out)
    }
}

/// Pull OHLCV out of the frame as NaN-padded f64 vectors.
fn extract_series(df: &DataFrame) -> Result<OhlcvSeries, FeatureError> {
    let missing: Vec<String> = RAW_COLUMNS
        .iter()
        .filter(|name| df.column(name).is_err())
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(FeatureError::MissingColumns(missing));
    }

    let mut series = OhlcvSeries::with_capacity(df.height());
    for (name, target) in RAW_COLUMNS.iter().zip([
        &mut series.open,
        &mut series.high,
        &mut series.low,
        &mut series.close,
        &mut series.volume,
    ]) {
        let col = df.column(name)?.cast(&DataType::Float64)?;
        for value in col.f64()? {
            target.push(value.unwrap_or(f64::NAN));
        }
    }
    Ok(series)
}
