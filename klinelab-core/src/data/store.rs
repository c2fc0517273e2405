//! Per-day parquet candle store.
//!
//! Layout: `{root}/{exchange}/{interval}/{symbol with '/' → '-'}/{day}.parquet`
//!
//! Features:
//! - Atomic writes (write to .tmp, rename into place)
//! - Empty day sets produce a warning and no file, never an error
//! - Metadata sidecar per symbol (per-day row counts and blake3 file hashes)
//! - Glob-and-concatenate loading into one timestamp-sorted table with
//!   derived `trading_day` and `minute_of_day` columns
//! - Quarantine for corrupt files ({filename}.quarantined)

use super::provider::DataError;
use crate::domain::Candle;
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Columns every stored day file must carry, in schema order.
pub const STORED_COLUMNS: [&str; 9] = [
    "timestamp",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "symbol",
    "exchange",
    "interval",
];

/// Per-day entry in the metadata sidecar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayMeta {
    pub rows: usize,
    pub file_hash: String,
}

/// Metadata sidecar for one stored symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMeta {
    pub symbol: String,
    pub exchange: String,
    pub interval: String,
    pub days: BTreeMap<NaiveDate, DayMeta>,
    pub updated_at: chrono::NaiveDateTime,
}

impl StoreMeta {
    pub fn first_day(&self) -> Option<NaiveDate> {
        self.days.keys().next().copied()
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        self.days.keys().next_back().copied()
    }

    pub fn total_rows(&self) -> usize {
        self.days.values().map(|d| d.rows).sum()
    }
}

/// Store status for a single symbol.
#[derive(Debug, Clone)]
pub struct StoreStatus {
    pub symbol: String,
    pub stored: bool,
    pub first_day: Option<NaiveDate>,
    pub last_day: Option<NaiveDate>,
    pub day_count: usize,
    pub row_count: usize,
}

/// The candle store.
pub struct CandleStore {
    root: PathBuf,
    exchange: String,
    interval: String,
}

impl CandleStore {
    pub fn new(root: impl Into<PathBuf>, exchange: impl Into<String>, interval: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            exchange: exchange.into(),
            interval: interval.into(),
        }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Slashes in pair symbols would nest directories: BTC/USDT → BTC-USDT.
    pub fn normalize_symbol(symbol: &str) -> String {
        symbol.replace('/', "-")
    }

    /// Directory for a symbol: `{root}/{exchange}/{interval}/{normalized}/`
    pub fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.root
            .join(&self.exchange)
            .join(&self.interval)
            .join(Self::normalize_symbol(symbol))
    }

    /// Path of one day file: `{symbol_dir}/{day}.parquet`
    pub fn day_path(&self, symbol: &str, day: NaiveDate) -> PathBuf {
        self.symbol_dir(symbol).join(format!("{day}.parquet"))
    }

    fn meta_path(&self, symbol: &str) -> PathBuf {
        self.symbol_dir(symbol).join("meta.json")
    }

    /// Whether a day file already exists for the symbol.
    pub fn has_day(&self, symbol: &str, day: NaiveDate) -> bool {
        self.day_path(symbol, day).exists()
    }

    /// Write one day of candles as a parquet file.
    ///
    /// Returns `Ok(true)` if a file was written, `Ok(false)` for an empty
    /// candle set (logged as a warning, nothing written).
    pub fn write_day(
        &self,
        symbol: &str,
        day: NaiveDate,
        candles: &[Candle],
    ) -> Result<bool, DataError> {
        if candles.is_empty() {
            warn!(symbol, %day, "no candles for day, skipping file");
            return Ok(false);
        }

        let sym_dir = self.symbol_dir(symbol);
        fs::create_dir_all(&sym_dir)
            .map_err(|e| DataError::StoreError(format!("failed to create dir: {e}")))?;

        let df = candles_to_dataframe(candles)?;
        let path = self.day_path(symbol, day);
        let tmp_path = path.with_extension("parquet.tmp");

        write_parquet(&df, &tmp_path)?;

        // Atomic rename
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::StoreError(format!("atomic rename failed: {e}"))
        })?;

        let bytes = fs::read(&path)
            .map_err(|e| DataError::StoreError(format!("read back day file: {e}")))?;
        self.update_meta(symbol, day, candles.len(), blake3::hash(&bytes).to_hex().to_string())?;

        Ok(true)
    }

    fn update_meta(
        &self,
        symbol: &str,
        day: NaiveDate,
        rows: usize,
        file_hash: String,
    ) -> Result<(), DataError> {
        let mut meta = self.get_meta(symbol).unwrap_or_else(|| StoreMeta {
            symbol: symbol.to_string(),
            exchange: self.exchange.clone(),
            interval: self.interval.clone(),
            days: BTreeMap::new(),
            updated_at: Utc::now().naive_utc(),
        });

        meta.days.insert(day, DayMeta { rows, file_hash });
        meta.updated_at = Utc::now().naive_utc();

        let json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::StoreError(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(symbol), json)
            .map_err(|e| DataError::StoreError(format!("meta write: {e}")))?;
        Ok(())
    }

    /// Read a symbol's metadata sidecar, if present and parseable.
    pub fn get_meta(&self, symbol: &str) -> Option<StoreMeta> {
        let content = fs::read_to_string(self.meta_path(symbol)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Status summary per symbol, from the metadata sidecars.
    pub fn status(&self, symbols: &[&str]) -> Vec<StoreStatus> {
        symbols
            .iter()
            .map(|sym| {
                let meta = self.get_meta(sym);
                StoreStatus {
                    symbol: sym.to_string(),
                    stored: meta.is_some(),
                    first_day: meta.as_ref().and_then(|m| m.first_day()),
                    last_day: meta.as_ref().and_then(|m| m.last_day()),
                    day_count: meta.as_ref().map(|m| m.days.len()).unwrap_or(0),
                    row_count: meta.as_ref().map(|m| m.total_rows()).unwrap_or(0),
                }
            })
            .collect()
    }

    /// Load every stored day for a symbol into one table.
    ///
    /// Day files are concatenated, sorted by timestamp, and extended with the
    /// derived `trading_day` (UTC date string) and `minute_of_day` columns.
    pub fn load_symbol(&self, symbol: &str) -> Result<DataFrame, DataError> {
        load_dir(&self.symbol_dir(symbol))
    }

    /// Load every stored day for several symbols into one table.
    pub fn load_symbols(&self, symbols: &[&str]) -> Result<DataFrame, DataError> {
        let mut combined: Option<DataFrame> = None;
        for sym in symbols {
            let df = self.load_symbol(sym)?;
            combined = Some(match combined {
                None => df,
                Some(acc) => acc
                    .vstack(&df)
                    .map_err(|e| DataError::ParquetError(format!("vstack: {e}")))?,
            });
        }
        let df = combined.ok_or_else(|| DataError::StoreError("no symbols requested".into()))?;
        sort_by_timestamp(df)
    }
}

/// Glob `*.parquet` under a directory and concatenate into one sorted table
/// with derived columns. Corrupt files are quarantined and skipped.
pub fn load_dir(dir: &Path) -> Result<DataFrame, DataError> {
    if !dir.exists() {
        return Err(DataError::StoreError(format!(
            "no stored data at {}",
            dir.display()
        )));
    }

    let entries =
        fs::read_dir(dir).map_err(|e| DataError::StoreError(format!("read dir: {e}")))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("parquet"))
        .collect();
    paths.sort();

    let mut combined: Option<DataFrame> = None;
    for path in &paths {
        match load_and_validate_parquet(path) {
            Ok(df) => {
                combined = Some(match combined {
                    None => df,
                    Some(acc) => acc
                        .vstack(&df)
                        .map_err(|e| DataError::ParquetError(format!("vstack: {e}")))?,
                });
            }
            Err(e) => {
                // Quarantine the corrupt file, keep loading the rest
                let quarantine = path.with_extension("parquet.quarantined");
                warn!(path = %path.display(), error = %e, "quarantining corrupt store file");
                let _ = fs::rename(path, &quarantine);
            }
        }
    }

    let df = combined.ok_or_else(|| {
        DataError::StoreError(format!("no readable parquet files in {}", dir.display()))
    })?;

    sort_by_timestamp(df)
}

fn sort_by_timestamp(df: DataFrame) -> Result<DataFrame, DataError> {
    let sorted = df
        .sort(["timestamp"], SortMultipleOptions::default())
        .map_err(|e| DataError::ParquetError(format!("sort by timestamp: {e}")))?;
    with_derived_columns(sorted)
}

/// Append `trading_day` (string "YYYY-MM-DD") and `minute_of_day` (i32)
/// derived from the timestamp column.
fn with_derived_columns(mut df: DataFrame) -> Result<DataFrame, DataError> {
    let ts = df
        .column("timestamp")
        .map_err(|e| DataError::ParquetError(format!("timestamp column: {e}")))?
        .i64()
        .map_err(|e| DataError::ParquetError(format!("timestamp column type: {e}")))?;

    let n = df.height();
    let mut trading_days = Vec::with_capacity(n);
    let mut minutes = Vec::with_capacity(n);

    for i in 0..n {
        let ms = ts
            .get(i)
            .ok_or_else(|| DataError::ParquetError(format!("null timestamp at row {i}")))?;
        let dt = DateTime::<Utc>::from_timestamp_millis(ms)
            .ok_or_else(|| DataError::ParquetError(format!("invalid timestamp: {ms}")))?;
        trading_days.push(dt.date_naive().to_string());
        minutes.push((dt.hour() * 60 + dt.minute()) as i32);
    }

    df.with_column(Column::new("trading_day".into(), trading_days))
        .map_err(|e| DataError::ParquetError(format!("trading_day column: {e}")))?;
    df.with_column(Column::new("minute_of_day".into(), minutes))
        .map_err(|e| DataError::ParquetError(format!("minute_of_day column: {e}")))?;

    Ok(df)
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

/// Convert candles to the stored DataFrame schema.
fn candles_to_dataframe(candles: &[Candle]) -> Result<DataFrame, DataError> {
    let timestamps: Vec<i64> = candles.iter().map(|c| c.timestamp).collect();
    let opens: Vec<f64> = candles.iter().map(|c| c.open).collect();
    let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
    let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();
    let symbols: Vec<&str> = candles.iter().map(|c| c.symbol.as_str()).collect();
    let exchanges: Vec<&str> = candles.iter().map(|c| c.exchange.as_str()).collect();
    let intervals: Vec<&str> = candles.iter().map(|c| c.interval.as_str()).collect();

    DataFrame::new(vec![
        Column::new("timestamp".into(), timestamps),
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
        Column::new("symbol".into(), symbols),
        Column::new("exchange".into(), exchanges),
        Column::new("interval".into(), intervals),
    ])
    .map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))
}

/// Write a DataFrame to a parquet file.
fn write_parquet(df: &DataFrame, path: &Path) -> Result<(), DataError> {
    let file =
        fs::File::create(path).map_err(|e| DataError::ParquetError(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(&mut df.clone())
        .map_err(|e| DataError::ParquetError(format!("write parquet: {e}")))?;
    Ok(())
}

/// Load a parquet file and validate its schema.
fn load_and_validate_parquet(path: &Path) -> Result<DataFrame, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::ParquetError(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::ParquetError(format!("read: {e}")))?;

    if df.height() == 0 {
        return Err(DataError::ValidationError("empty parquet file".into()));
    }

    for col_name in &STORED_COLUMNS {
        if df.column(col_name).is_err() {
            return Err(DataError::ValidationError(format!(
                "missing column '{col_name}'"
            )));
        }
    }

    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_store_root() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = env::temp_dir().join(format!("klinelab_test_{}_{id}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sample_candles(day: NaiveDate, count: usize) -> Vec<Candle> {
        let t0 = day.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp_millis();
        (0..count)
            .map(|i| Candle {
                timestamp: t0 + i as i64 * 60_000,
                open: 100.0 + i as f64,
                high: 101.0 + i as f64,
                low: 99.0 + i as f64,
                close: 100.5 + i as f64,
                volume: 2.0,
                symbol: "BTC/USDT".into(),
                exchange: "binance".into(),
                interval: "1m".into(),
            })
            .collect()
    }

    fn jan2() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
    }

    fn jan3() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()
    }

    #[test]
    fn write_and_load_roundtrip() {
        let root = temp_store_root();
        let store = CandleStore::new(&root, "binance", "1m");

        let written = store.write_day("BTC/USDT", jan2(), &sample_candles(jan2(), 3)).unwrap();
        assert!(written);

        let df = store.load_symbol("BTC/USDT").unwrap();
        assert_eq!(df.height(), 3);
        let closes = df.column("close").unwrap().f64().unwrap();
        assert_eq!(closes.get(0), Some(100.5));
        assert_eq!(closes.get(2), Some(102.5));

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn path_layout_matches_scheme() {
        let store = CandleStore::new("/data", "binance", "1m");
        assert_eq!(
            store.day_path("BTC/USDT", jan2()),
            PathBuf::from("/data/binance/1m/BTC-USDT/2024-01-02.parquet")
        );
    }

    #[test]
    fn empty_day_writes_nothing() {
        let root = temp_store_root();
        let store = CandleStore::new(&root, "binance", "1m");

        let written = store.write_day("BTC/USDT", jan2(), &[]).unwrap();
        assert!(!written);
        assert!(!store.has_day("BTC/USDT", jan2()));

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn multi_day_load_is_sorted_with_derived_columns() {
        let root = temp_store_root();
        let store = CandleStore::new(&root, "binance", "1m");

        // Write the later day first; load must come back timestamp-sorted
        store.write_day("BTC/USDT", jan3(), &sample_candles(jan3(), 2)).unwrap();
        store.write_day("BTC/USDT", jan2(), &sample_candles(jan2(), 2)).unwrap();

        let df = store.load_symbol("BTC/USDT").unwrap();
        assert_eq!(df.height(), 4);

        let ts = df.column("timestamp").unwrap().i64().unwrap();
        for i in 1..4 {
            assert!(ts.get(i).unwrap() > ts.get(i - 1).unwrap());
        }

        let days = df.column("trading_day").unwrap().str().unwrap();
        assert_eq!(days.get(0), Some("2024-01-02"));
        assert_eq!(days.get(3), Some("2024-01-03"));

        let minutes = df.column("minute_of_day").unwrap().i32().unwrap();
        assert_eq!(minutes.get(0), Some(0));
        assert_eq!(minutes.get(1), Some(1));

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn meta_sidecar_tracks_days() {
        let root = temp_store_root();
        let store = CandleStore::new(&root, "binance", "1m");

        store.write_day("BTC/USDT", jan2(), &sample_candles(jan2(), 5)).unwrap();
        store.write_day("BTC/USDT", jan3(), &sample_candles(jan3(), 7)).unwrap();

        let meta = store.get_meta("BTC/USDT").unwrap();
        assert_eq!(meta.days.len(), 2);
        assert_eq!(meta.first_day(), Some(jan2()));
        assert_eq!(meta.last_day(), Some(jan3()));
        assert_eq!(meta.total_rows(), 12);
        assert!(!meta.days[&jan2()].file_hash.is_empty());

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn status_reports_unstored_symbols() {
        let root = temp_store_root();
        let store = CandleStore::new(&root, "binance", "1m");

        store.write_day("BTC/USDT", jan2(), &sample_candles(jan2(), 5)).unwrap();
        let statuses = store.status(&["BTC/USDT", "ETH/USDT"]);

        assert_eq!(statuses.len(), 2);
        assert!(statuses[0].stored);
        assert_eq!(statuses[0].day_count, 1);
        assert_eq!(statuses[0].row_count, 5);
        assert!(!statuses[1].stored);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn load_missing_symbol_is_error() {
        let root = temp_store_root();
        let store = CandleStore::new(&root, "binance", "1m");
        assert!(store.load_symbol("NOPE/USDT").is_err());
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn corrupt_file_is_quarantined_not_fatal() {
        let root = temp_store_root();
        let store = CandleStore::new(&root, "binance", "1m");

        store.write_day("BTC/USDT", jan2(), &sample_candles(jan2(), 3)).unwrap();
        let bad = store.day_path("BTC/USDT", jan3());
        fs::write(&bad, b"not a parquet file").unwrap();

        let df = store.load_symbol("BTC/USDT").unwrap();
        assert_eq!(df.height(), 3);
        assert!(!bad.exists());
        assert!(bad.with_extension("parquet.quarantined").exists());

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn load_symbols_combines_pairs() {
        let root = temp_store_root();
        let store = CandleStore::new(&root, "binance", "1m");

        let mut eth = sample_candles(jan2(), 2);
        for c in &mut eth {
            c.symbol = "ETH/USDT".into();
        }
        store.write_day("BTC/USDT", jan2(), &sample_candles(jan2(), 2)).unwrap();
        store.write_day("ETH/USDT", jan2(), &eth).unwrap();

        let df = store.load_symbols(&["BTC/USDT", "ETH/USDT"]).unwrap();
        assert_eq!(df.height(), 4);

        let _ = fs::remove_dir_all(&root);
    }
}
