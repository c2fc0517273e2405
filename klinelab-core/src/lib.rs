//! KlineLab Core — minute-candle ingestion and cross-sectional feature engineering.
//!
//! Two independent pipelines:
//! - Data layer: paged Binance kline scraping with bounded retries, per-day
//!   parquet partitions, glob-and-concatenate loading
//! - Feature layer: technical indicators over OHLCV tables organized into
//!   nine categories behind an explicit registry, plus a per-timestamp
//!   rank/z-score normalization pass

pub mod data;
pub mod domain;
pub mod features;
