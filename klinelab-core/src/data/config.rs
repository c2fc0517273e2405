//! Serializable scrape configuration.
//!
//! Defaults: 1-minute candles from Binance back to 2020-01-01, pages of
//! 1000, a 250ms courtesy delay between pages. Loadable from a TOML file;
//! every field has a default so partial configs work.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Exchange identifier, used in store paths.
    pub exchange: String,

    /// Candle interval. Only "1m" is exercised; the store partitions by it.
    pub interval: String,

    /// Earliest calendar day to fetch (inclusive). The driver walks backward
    /// from today to this date.
    pub start_date: NaiveDate,

    /// Root directory for parquet output.
    pub out_dir: PathBuf,

    /// Maximum rows per kline request.
    pub page_limit: u32,

    /// Courtesy delay between successful page fetches, milliseconds.
    pub page_delay_ms: u64,

    /// Retry attempts per page request before surfacing a terminal error.
    pub max_retries: u32,

    /// Base delay for exponential backoff between retries, milliseconds.
    pub retry_base_delay_ms: u64,

    /// Refetch days that already have a stored file.
    pub force: bool,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            exchange: "binance".into(),
            interval: "1m".into(),
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            out_dir: PathBuf::from("data"),
            page_limit: 1000,
            page_delay_ms: 250,
            max_retries: 5,
            retry_base_delay_ms: 500,
            force: false,
        }
    }
}

impl ScrapeConfig {
    /// Load a config from a TOML file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("read config file: {e}"))?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("parse config TOML: {e}"))
    }
}
