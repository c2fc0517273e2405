//! Cross-sectional normalization.
//!
//! For every feature column, each timestamp's values across symbols gain a
//! percentile rank and a z-score column alongside, so a model sees
//! where a symbol sits relative to the rest of the universe at that minute
//! rather than its absolute level.

use std::collections::BTreeMap;

use polars::prelude::*;

use super::engine::{FeatureError, RAW_COLUMNS};

/// Append `<name>_rank` and `<name>_zscore` columns for every Float64
/// feature column, normalized within each timestamp group.
///
/// Rank is the average-tie percentile in (0, 1]; a lone symbol ranks 1.0.
/// Z-score uses the sample standard deviation and reads 0.0 when the group
/// has no spread or only one member. NaN inputs stay NaN in both outputs.
/// A frame without the timestamp column passes through unchanged.
pub fn cross_section_features(
    df: &DataFrame,
    timestamp_col: &str,
) -> Result<DataFrame, FeatureError> {
    let ts = match df.column(timestamp_col) {
        Ok(col) => col,
        Err(_) => return Ok(df.clone()),
    };
    let ts = ts.cast(&DataType::Int64)?;
    let ts = ts.i64()?;

    let mut groups: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, t) in ts.into_iter().enumerate() {
        if let Some(t) = t {
            groups.entry(t).or_default().push(i);
        }
    }

    let feature_names: Vec<String> = df
        .get_columns()
        .iter()
        .filter(|col| {
            let name = col.name().as_str();
            col.dtype() == &DataType::Float64
                && name != timestamp_col
                && !RAW_COLUMNS.contains(&name)
        })
        .map(|col| col.name().to_string())
        .collect();

    let n = df.height();
    let mut out = df.clone();
    for name in feature_names {
        let values: Vec<f64> = df
            .column(&name)?
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();

        let mut ranks = vec![f64::NAN; n];
        let mut zscores = vec![f64::NAN; n];
        for rows in groups.values() {
            rank_group(&values, rows, &mut ranks);
            zscore_group(&values, rows, &mut zscores);
        }

        out.with_column(Column::new(format!("{name}_rank").into(), ranks))?;
        out.with_column(Column::new(format!("{name}_zscore").into(), zscores))?;
    }
    Ok(out)
}

/// Average-tie percentile ranks over the valid members of one group.
fn rank_group(values: &[f64], rows: &[usize], out: &mut [f64]) {
    let mut valid: Vec<usize> = rows
        .iter()
        .copied()
        .filter(|&i| !values[i].is_nan())
        .collect();
    let m = valid.len();
    if m == 0 {
        return;
    }
    valid.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap());

    let mut start = 0;
    while start < m {
        let mut end = start;
        while end + 1 < m && values[valid[end + 1]] == values[valid[start]] {
            end += 1;
        }
        // 1-based ranks averaged over the tie run
        let avg_rank = (start + end + 2) as f64 / 2.0;
        for &i in &valid[start..=end] {
            out[i] = avg_rank / m as f64;
        }
        start = end + 1;
    }
}

/// Sample-stddev z-scores over the valid members of one group.
fn zscore_group(values: &[f64], rows: &[usize], out: &mut [f64]) {
    let valid: Vec<usize> = rows
        .iter()
        .copied()
        .filter(|&i| !values[i].is_nan())
        .collect();
    let m = valid.len();
    if m == 0 {
        return;
    }
    if m == 1 {
        out[valid[0]] = 0.0;
        return;
    }

    let mean = valid.iter().map(|&i| values[i]).sum::<f64>() / m as f64;
    let var = valid
        .iter()
        .map(|&i| (values[i] - mean).powi(2))
        .sum::<f64>()
        / (m - 1) as f64;
    let sd = var.sqrt();
    for &i in &valid {
        out[i] = if sd == 0.0 { 0.0 } else { (values[i] - mean) / sd };
    }
}
