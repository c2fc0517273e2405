//! Candle provider trait and structured error types.
//!
//! The CandleProvider trait abstracts over the exchange REST API so the
//! paging loop and the scrape driver can be exercised against a scripted
//! mock in tests. Providers own their retry policy; callers see either a
//! page of klines or a terminal error.

use chrono::NaiveDate;
use thiserror::Error;

/// One raw kline page row as returned by the exchange, before it is stamped
/// with symbol/exchange/interval and becomes a `Candle`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kline {
    /// Bar open time, milliseconds since epoch.
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by exchange (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: exchange has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("store error: {0}")]
    StoreError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("parquet I/O error: {0}")]
    ParquetError(String),

    #[error("data error: {0}")]
    Other(String),
}

/// Trait for exchange kline sources.
///
/// `fetch_klines` returns at most `limit` bars with open time >= `since_ms`,
/// in ascending timestamp order. An empty page means no data at or after the
/// cursor. Implementations perform their own bounded retries; an `Err` from
/// this call is terminal for the current position.
pub trait CandleProvider: Send + Sync {
    /// Exchange identifier used in store paths (e.g. "binance").
    fn exchange_id(&self) -> &str;

    /// Fetch one page of klines for a symbol starting at `since_ms`.
    fn fetch_klines(
        &self,
        symbol: &str,
        since_ms: i64,
        limit: u32,
    ) -> Result<Vec<Kline>, DataError>;

    /// Check if the provider is currently available (circuit breaker closed).
    fn is_available(&self) -> bool;
}

/// Progress callback for multi-symbol scrape runs.
pub trait ScrapeProgress: Send {
    /// Called when starting a symbol.
    fn on_symbol_start(&self, symbol: &str, index: usize, total: usize);

    /// Called after each day is fetched (or skipped).
    fn on_day_complete(&self, symbol: &str, day: NaiveDate, rows: usize, skipped: bool);

    /// Called when a symbol finishes, with its terminal error if any.
    fn on_symbol_complete(&self, symbol: &str, result: &Result<(), DataError>);

    /// Called when the entire run is done.
    fn on_run_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Simple progress reporter that prints to stdout.
pub struct StdoutProgress;

impl ScrapeProgress for StdoutProgress {
    fn on_symbol_start(&self, symbol: &str, index: usize, total: usize) {
        println!("[{}/{}] Scraping {symbol}...", index + 1, total);
    }

    fn on_day_complete(&self, symbol: &str, day: NaiveDate, rows: usize, skipped: bool) {
        if skipped {
            println!("  {symbol} {day}: already stored, skipped");
        } else {
            println!("  {symbol} {day}: {rows} rows");
        }
    }

    fn on_symbol_complete(&self, symbol: &str, result: &Result<(), DataError>) {
        match result {
            Ok(()) => println!("  OK: {symbol}"),
            Err(e) => println!("  FAIL: {symbol}: {e}"),
        }
    }

    fn on_run_complete(&self, succeeded: usize, failed: usize, total: usize) {
        println!("\nScrape complete: {succeeded}/{total} succeeded, {failed} failed");
    }
}

/// Progress reporter that discards everything. Used by tests and library callers.
pub struct SilentProgress;

impl ScrapeProgress for SilentProgress {
    fn on_symbol_start(&self, _symbol: &str, _index: usize, _total: usize) {}
    fn on_day_complete(&self, _symbol: &str, _day: NaiveDate, _rows: usize, _skipped: bool) {}
    fn on_symbol_complete(&self, _symbol: &str, _result: &Result<(), DataError>) {}
    fn on_run_complete(&self, _succeeded: usize, _failed: usize, _total: usize) {}
}
