//! Scrape driver — walks each symbol backward one calendar day at a time.
//!
//! For every symbol, days run from today (UTC) down to the configured start
//! date. A day that already has a stored file is skipped unless `force` is
//! set. Fetch errors end that symbol and are collected in the summary; a
//! tripped circuit breaker aborts the remaining symbols. Single-threaded,
//! one blocking request at a time.

use super::config::ScrapeConfig;
use super::paging::{fetch_day, PageOptions};
use super::provider::{CandleProvider, DataError, Kline, ScrapeProgress};
use super::store::CandleStore;
use crate::domain::Candle;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use std::time::Duration;
use tracing::{error, info, warn};

/// Summary of a scrape run.
#[derive(Debug)]
pub struct ScrapeSummary {
    pub total_symbols: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub days_written: usize,
    pub days_skipped: usize,
    pub errors: Vec<(String, DataError)>,
}

impl ScrapeSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Scrape every symbol from today back to `config.start_date`.
pub fn scrape_symbols(
    provider: &dyn CandleProvider,
    store: &CandleStore,
    symbols: &[&str],
    config: &ScrapeConfig,
    progress: &dyn ScrapeProgress,
) -> ScrapeSummary {
    let end_date = Utc::now().date_naive();
    scrape_symbols_until(provider, store, symbols, config, end_date, progress)
}

/// Same as [`scrape_symbols`] with an explicit newest day (tests pin this).
pub fn scrape_symbols_until(
    provider: &dyn CandleProvider,
    store: &CandleStore,
    symbols: &[&str],
    config: &ScrapeConfig,
    end_date: NaiveDate,
    progress: &dyn ScrapeProgress,
) -> ScrapeSummary {
    let total = symbols.len();
    let mut summary = ScrapeSummary {
        total_symbols: total,
        succeeded: 0,
        failed: 0,
        days_written: 0,
        days_skipped: 0,
        errors: Vec::new(),
    };

    let options = PageOptions {
        page_limit: config.page_limit,
        page_delay: Duration::from_millis(config.page_delay_ms),
    };

    for (i, symbol) in symbols.iter().enumerate() {
        progress.on_symbol_start(symbol, i, total);
        info!(symbol, start = %config.start_date, end = %end_date, "scraping symbol");

        let result = scrape_one_symbol(
            provider, store, symbol, config, end_date, &options, &mut summary, progress,
        );
        progress.on_symbol_complete(symbol, &result);

        match result {
            Ok(()) => summary.succeeded += 1,
            Err(e) => {
                error!(symbol, error = %e, "symbol scrape failed");
                summary.errors.push((symbol.to_string(), e));
                summary.failed += 1;
            }
        }

        // Bail out early if the exchange has blocked us
        if !provider.is_available() {
            warn!("circuit breaker open, aborting remaining symbols");
            for sym in &symbols[(i + 1)..total] {
                summary
                    .errors
                    .push((sym.to_string(), DataError::CircuitBreakerTripped));
                summary.failed += 1;
            }
            break;
        }
    }

    progress.on_run_complete(summary.succeeded, summary.failed, total);
    summary
}

#[allow(clippy::too_many_arguments)]
fn scrape_one_symbol(
    provider: &dyn CandleProvider,
    store: &CandleStore,
    symbol: &str,
    config: &ScrapeConfig,
    end_date: NaiveDate,
    options: &PageOptions,
    summary: &mut ScrapeSummary,
    progress: &dyn ScrapeProgress,
) -> Result<(), DataError> {
    let mut day = end_date;
    while day >= config.start_date {
        if !config.force && store.has_day(symbol, day) {
            summary.days_skipped += 1;
            progress.on_day_complete(symbol, day, 0, true);
            day -= ChronoDuration::days(1);
            continue;
        }

        let klines = fetch_day(provider, symbol, day, options)?;
        let candles = stamp_candles(&klines, symbol, provider.exchange_id(), &config.interval);

        if store.write_day(symbol, day, &candles)? {
            summary.days_written += 1;
        }
        progress.on_day_complete(symbol, day, candles.len(), false);

        day -= ChronoDuration::days(1);
    }
    Ok(())
}

/// Attach symbol/exchange/interval to raw klines.
fn stamp_candles(klines: &[Kline], symbol: &str, exchange: &str, interval: &str) -> Vec<Candle> {
    klines
        .iter()
        .map(|k| Candle {
            timestamp: k.timestamp,
            open: k.open,
            high: k.high,
            low: k.low,
            close: k.close,
            volume: k.volume,
            symbol: symbol.to_string(),
            exchange: exchange.to_string(),
            interval: interval.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::paging::day_start_ms;
    use crate::data::provider::SilentProgress;
    use std::collections::HashMap;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Mutex;

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_store_root() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir =
            std::env::temp_dir().join(format!("klinelab_scrape_{}_{id}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Mock exchange serving a fixed number of minutes per (symbol, day).
    struct FakeExchange {
        minutes_per_day: HashMap<String, usize>,
        fail_symbols: Vec<String>,
        available: AtomicBool,
        calls: Mutex<u32>,
    }

    impl FakeExchange {
        fn new(minutes: &[(&str, usize)]) -> Self {
            Self {
                minutes_per_day: minutes
                    .iter()
                    .map(|(s, n)| (s.to_string(), *n))
                    .collect(),
                fail_symbols: Vec::new(),
                available: AtomicBool::new(true),
                calls: Mutex::new(0),
            }
        }

        fn failing(mut self, symbol: &str) -> Self {
            self.fail_symbols.push(symbol.to_string());
            self
        }
    }

    impl CandleProvider for FakeExchange {
        fn exchange_id(&self) -> &str {
            "binance"
        }

        fn fetch_klines(
            &self,
            symbol: &str,
            since_ms: i64,
            limit: u32,
        ) -> Result<Vec<Kline>, DataError> {
            *self.calls.lock().unwrap() += 1;
            if self.fail_symbols.iter().any(|s| s == symbol) {
                self.available.store(false, Ordering::SeqCst);
                return Err(DataError::CircuitBreakerTripped);
            }
            let count = *self.minutes_per_day.get(symbol).unwrap_or(&0);
            // Serve `count` minutes from the start of whichever day the cursor is in
            let day_start = since_ms - since_ms.rem_euclid(86_400_000);
            Ok((0..count)
                .map(|i| Kline {
                    timestamp: day_start + i as i64 * 60_000,
                    open: 1.0,
                    high: 2.0,
                    low: 0.5,
                    close: 1.5,
                    volume: 10.0,
                })
                .filter(|k| k.timestamp >= since_ms)
                .take(limit as usize)
                .collect())
        }

        fn is_available(&self) -> bool {
            self.available.load(Ordering::SeqCst)
        }
    }

    fn two_day_config(root: &PathBuf, end: NaiveDate) -> (ScrapeConfig, NaiveDate) {
        let cfg = ScrapeConfig {
            start_date: end - ChronoDuration::days(1),
            out_dir: root.clone(),
            page_delay_ms: 0,
            ..ScrapeConfig::default()
        };
        (cfg, end)
    }

    fn jan2() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
    }

    #[test]
    fn walks_backward_writing_each_day() {
        let root = temp_store_root();
        let store = CandleStore::new(&root, "binance", "1m");
        let exchange = FakeExchange::new(&[("BTC/USDT", 120)]);
        let (cfg, end) = two_day_config(&root, jan2());

        let summary = scrape_symbols_until(
            &exchange, &store, &["BTC/USDT"], &cfg, end, &SilentProgress,
        );

        assert!(summary.all_succeeded());
        assert_eq!(summary.days_written, 2);
        assert!(store.has_day("BTC/USDT", jan2()));
        assert!(store.has_day("BTC/USDT", jan2() - ChronoDuration::days(1)));

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn existing_days_are_skipped_without_force() {
        let root = temp_store_root();
        let store = CandleStore::new(&root, "binance", "1m");
        let exchange = FakeExchange::new(&[("BTC/USDT", 60)]);
        let (cfg, end) = two_day_config(&root, jan2());

        let first = scrape_symbols_until(
            &exchange, &store, &["BTC/USDT"], &cfg, end, &SilentProgress,
        );
        assert_eq!(first.days_written, 2);

        let second = scrape_symbols_until(
            &exchange, &store, &["BTC/USDT"], &cfg, end, &SilentProgress,
        );
        assert_eq!(second.days_written, 0);
        assert_eq!(second.days_skipped, 2);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn force_refetches_existing_days() {
        let root = temp_store_root();
        let store = CandleStore::new(&root, "binance", "1m");
        let exchange = FakeExchange::new(&[("BTC/USDT", 60)]);
        let (mut cfg, end) = two_day_config(&root, jan2());

        scrape_symbols_until(&exchange, &store, &["BTC/USDT"], &cfg, end, &SilentProgress);

        cfg.force = true;
        let again = scrape_symbols_until(
            &exchange, &store, &["BTC/USDT"], &cfg, end, &SilentProgress,
        );
        assert_eq!(again.days_written, 2);
        assert_eq!(again.days_skipped, 0);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn empty_days_produce_no_files_but_succeed() {
        let root = temp_store_root();
        let store = CandleStore::new(&root, "binance", "1m");
        let exchange = FakeExchange::new(&[("DOGE/USDT", 0)]);
        let (cfg, end) = two_day_config(&root, jan2());

        let summary = scrape_symbols_until(
            &exchange, &store, &["DOGE/USDT"], &cfg, end, &SilentProgress,
        );

        assert!(summary.all_succeeded());
        assert_eq!(summary.days_written, 0);
        assert!(!store.has_day("DOGE/USDT", jan2()));

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn breaker_trip_aborts_remaining_symbols() {
        let root = temp_store_root();
        let store = CandleStore::new(&root, "binance", "1m");
        let exchange =
            FakeExchange::new(&[("BTC/USDT", 60), ("ETH/USDT", 60)]).failing("BTC/USDT");
        let (cfg, end) = two_day_config(&root, jan2());

        let summary = scrape_symbols_until(
            &exchange,
            &store,
            &["BTC/USDT", "ETH/USDT"],
            &cfg,
            end,
            &SilentProgress,
        );

        assert_eq!(summary.failed, 2);
        assert_eq!(summary.succeeded, 0);
        // ETH was never attempted against the exchange
        assert!(summary
            .errors
            .iter()
            .any(|(s, e)| s == "ETH/USDT" && matches!(e, DataError::CircuitBreakerTripped)));

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn failed_symbol_does_not_stop_healthy_ones() {
        let root = temp_store_root();
        let store = CandleStore::new(&root, "binance", "1m");
        // Unknown symbol yields empty days (success); use a per-symbol error instead
        struct OneBadApple {
            inner: FakeExchange,
        }
        impl CandleProvider for OneBadApple {
            fn exchange_id(&self) -> &str {
                "binance"
            }
            fn fetch_klines(
                &self,
                symbol: &str,
                since_ms: i64,
                limit: u32,
            ) -> Result<Vec<Kline>, DataError> {
                if symbol == "BAD/USDT" {
                    return Err(DataError::SymbolNotFound {
                        symbol: symbol.into(),
                    });
                }
                self.inner.fetch_klines(symbol, since_ms, limit)
            }
            fn is_available(&self) -> bool {
                true
            }
        }

        let exchange = OneBadApple {
            inner: FakeExchange::new(&[("BTC/USDT", 60)]),
        };
        let (cfg, end) = two_day_config(&root, jan2());

        let summary = scrape_symbols_until(
            &exchange,
            &store,
            &["BAD/USDT", "BTC/USDT"],
            &cfg,
            end,
            &SilentProgress,
        );

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.days_written, 2);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn stamped_candles_carry_identity() {
        let klines = vec![Kline {
            timestamp: day_start_ms(jan2()),
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            volume: 3.0,
        }];
        let candles = stamp_candles(&klines, "BTC/USDT", "binance", "1m");
        assert_eq!(candles[0].symbol, "BTC/USDT");
        assert_eq!(candles[0].exchange, "binance");
        assert_eq!(candles[0].interval, "1m");
        assert_eq!(candles[0].close, 1.5);
    }
}
