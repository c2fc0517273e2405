//! One-day paged kline fetch.
//!
//! Walks a single UTC calendar day in pages of up to `page_limit` rows,
//! starting at the day's first millisecond. The cursor advances to the last
//! returned row's open time plus one minute; rows at or past the day's
//! exclusive upper bound are discarded and end the walk. Rows older than the
//! cursor are dropped, and a page that fails to advance the cursor is an
//! error rather than an infinite re-fetch. A courtesy delay is slept between
//! successful pages.
//!
//! Retry policy lives in the provider — an error here is already terminal
//! for the current cursor position and is propagated to the driver.

use super::provider::{CandleProvider, DataError, Kline};
use chrono::NaiveDate;
use std::time::Duration;
use tracing::debug;

const MINUTE_MS: i64 = 60_000;
const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Paging parameters for a day walk.
#[derive(Debug, Clone, Copy)]
pub struct PageOptions {
    /// Maximum rows per request.
    pub page_limit: u32,
    /// Delay between successful page fetches. Tests pass `Duration::ZERO`.
    pub page_delay: Duration,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            page_limit: 1000,
            page_delay: Duration::from_millis(250),
        }
    }
}

/// First millisecond of a UTC calendar day.
pub fn day_start_ms(day: NaiveDate) -> i64 {
    day.and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
        .and_utc()
        .timestamp_millis()
}

/// Fetch every kline of one UTC calendar day for a symbol.
///
/// Returns rows in ascending timestamp order, all within
/// `[day_start, day_start + 24h)`. An empty result is not an error — the
/// exchange simply has no data for that day.
pub fn fetch_day(
    provider: &dyn CandleProvider,
    symbol: &str,
    day: NaiveDate,
    options: &PageOptions,
) -> Result<Vec<Kline>, DataError> {
    let since = day_start_ms(day);
    let until = since + DAY_MS;

    let mut rows: Vec<Kline> = Vec::new();
    let mut cursor = since;

    while cursor < until {
        let page = provider.fetch_klines(symbol, cursor, options.page_limit)?;
        if page.is_empty() {
            break;
        }

        let mut hit_boundary = false;
        for kline in &page {
            // A row older than the cursor was already fetched; keeping it
            // would duplicate data.
            if kline.timestamp < cursor {
                continue;
            }
            if kline.timestamp >= until {
                hit_boundary = true;
                break;
            }
            rows.push(*kline);
        }

        debug!(
            symbol,
            %day,
            cursor,
            page_rows = page.len(),
            kept = rows.len(),
            "fetched kline page"
        );

        if hit_boundary {
            break;
        }

        // Next page starts one minute after the newest row the exchange
        // returned, whether or not we kept it. A page of nothing but stale
        // rows would loop forever.
        let page_max = page
            .iter()
            .map(|k| k.timestamp)
            .max()
            .expect("page is non-empty");
        let next = page_max + MINUTE_MS;
        if next <= cursor {
            return Err(DataError::ResponseFormatChanged(format!(
                "{symbol}: kline page did not advance past cursor {cursor}"
            )));
        }
        cursor = next;

        if !options.page_delay.is_zero() {
            std::thread::sleep(options.page_delay);
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Scripted provider: serves a fixed set of minute klines, slicing pages
    /// the way the exchange does.
    struct FakeExchange {
        klines: Vec<Kline>,
        /// Errors to inject, consumed one per call before any data is served.
        errors: Mutex<Vec<DataError>>,
        calls: Mutex<u32>,
    }

    fn minute_rows(start_ms: i64, count: usize) -> Vec<Kline> {
        (0..count)
            .map(|i| Kline {
                timestamp: start_ms + i as i64 * MINUTE_MS,
                open: 100.0 + i as f64,
                high: 101.0 + i as f64,
                low: 99.0 + i as f64,
                close: 100.5 + i as f64,
                volume: 1.0,
            })
            .collect()
    }

    impl FakeExchange {
        fn minutes(start_ms: i64, count: usize) -> Self {
            Self {
                klines: minute_rows(start_ms, count),
                errors: Mutex::new(Vec::new()),
                calls: Mutex::new(0),
            }
        }

        fn with_error(self, err: DataError) -> Self {
            self.errors.lock().unwrap().push(err);
            self
        }

        fn call_count(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    impl CandleProvider for FakeExchange {
        fn exchange_id(&self) -> &str {
            "fake"
        }

        fn fetch_klines(
            &self,
            _symbol: &str,
            since_ms: i64,
            limit: u32,
        ) -> Result<Vec<Kline>, DataError> {
            *self.calls.lock().unwrap() += 1;
            if let Some(err) = self.errors.lock().unwrap().pop() {
                return Err(err);
            }
            Ok(self
                .klines
                .iter()
                .filter(|k| k.timestamp >= since_ms)
                .take(limit as usize)
                .copied()
                .collect())
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn test_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
    }

    fn zero_delay(limit: u32) -> PageOptions {
        PageOptions {
            page_limit: limit,
            page_delay: Duration::ZERO,
        }
    }

    #[test]
    fn full_day_accumulates_1440_rows() {
        let t0 = day_start_ms(test_day());
        // Exchange has the full day plus the next day's first hour
        let exchange = FakeExchange::minutes(t0, 1440 + 60);

        let rows = fetch_day(&exchange, "BTC/USDT", test_day(), &zero_delay(1000)).unwrap();

        assert_eq!(rows.len(), 1440);
        // No duplicates, no out-of-range timestamps, strictly ascending
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.timestamp, t0 + i as i64 * MINUTE_MS);
        }
        assert!(rows.last().unwrap().timestamp < t0 + DAY_MS);
        // 1440 rows at 1000/page: two data pages, then the boundary row stops page 2
        assert_eq!(exchange.call_count(), 2);
    }

    #[test]
    fn boundary_rows_are_truncated() {
        let t0 = day_start_ms(test_day());
        // Last page straddles midnight: 10 rows before, 5 after
        let exchange = FakeExchange::minutes(t0 + (1440 - 10) * MINUTE_MS, 15);

        let rows = fetch_day(&exchange, "BTC/USDT", test_day(), &zero_delay(1000)).unwrap();

        assert_eq!(rows.len(), 10);
        assert!(rows.iter().all(|r| r.timestamp < t0 + DAY_MS));
    }

    #[test]
    fn empty_page_stops_the_walk() {
        let t0 = day_start_ms(test_day());
        // Only the first 30 minutes exist
        let exchange = FakeExchange::minutes(t0, 30);

        let rows = fetch_day(&exchange, "BTC/USDT", test_day(), &zero_delay(1000)).unwrap();

        assert_eq!(rows.len(), 30);
        // One data page, one empty page
        assert_eq!(exchange.call_count(), 2);
    }

    #[test]
    fn day_with_no_data_is_empty_not_error() {
        let t0 = day_start_ms(test_day());
        let exchange = FakeExchange::minutes(t0 + DAY_MS, 0);
        let rows = fetch_day(&exchange, "BTC/USDT", test_day(), &zero_delay(1000)).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn small_pages_advance_by_last_timestamp() {
        let t0 = day_start_ms(test_day());
        let exchange = FakeExchange::minutes(t0, 25);

        let rows = fetch_day(&exchange, "BTC/USDT", test_day(), &zero_delay(10)).unwrap();

        assert_eq!(rows.len(), 25);
        // 10 + 10 + 5, then one empty page
        assert_eq!(exchange.call_count(), 4);
    }

    /// Serves pre-scripted pages verbatim, ignoring the request cursor. Lets
    /// tests model an exchange that repeats or rewinds rows.
    struct ScriptedPages {
        pages: Mutex<Vec<Vec<Kline>>>,
    }

    impl ScriptedPages {
        fn new(pages: Vec<Vec<Kline>>) -> Self {
            Self {
                pages: Mutex::new(pages),
            }
        }
    }

    impl CandleProvider for ScriptedPages {
        fn exchange_id(&self) -> &str {
            "scripted"
        }

        fn fetch_klines(
            &self,
            _symbol: &str,
            _since_ms: i64,
            _limit: u32,
        ) -> Result<Vec<Kline>, DataError> {
            let mut pages = self.pages.lock().unwrap();
            if pages.is_empty() {
                Ok(Vec::new())
            } else {
                Ok(pages.remove(0))
            }
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    #[test]
    fn overlapping_pages_do_not_duplicate_rows() {
        let t0 = day_start_ms(test_day());
        // Second page rewinds five minutes before continuing
        let exchange = ScriptedPages::new(vec![
            minute_rows(t0, 10),
            minute_rows(t0 + 5 * MINUTE_MS, 10),
        ]);

        let rows = fetch_day(&exchange, "BTC/USDT", test_day(), &zero_delay(10)).unwrap();

        assert_eq!(rows.len(), 15);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.timestamp, t0 + i as i64 * MINUTE_MS);
        }
    }

    #[test]
    fn page_that_rewinds_the_cursor_is_an_error() {
        let t0 = day_start_ms(test_day());
        // The same ten rows forever would otherwise re-fetch without end
        let exchange = ScriptedPages::new(vec![
            minute_rows(t0, 10),
            minute_rows(t0, 10),
        ]);

        let err = fetch_day(&exchange, "BTC/USDT", test_day(), &zero_delay(10)).unwrap_err();
        assert!(matches!(err, DataError::ResponseFormatChanged(_)));
    }

    #[test]
    fn provider_error_propagates() {
        let t0 = day_start_ms(test_day());
        let exchange = FakeExchange::minutes(t0, 60).with_error(DataError::RetriesExhausted {
            attempts: 6,
            last_error: "connection reset".into(),
        });

        let err = fetch_day(&exchange, "BTC/USDT", test_day(), &zero_delay(1000)).unwrap_err();
        assert!(matches!(err, DataError::RetriesExhausted { .. }));
    }

    #[test]
    fn day_start_is_utc_midnight() {
        assert_eq!(day_start_ms(test_day()) % DAY_MS, 0);
        assert_eq!(
            day_start_ms(NaiveDate::from_ymd_opt(1970, 1, 2).unwrap()),
            DAY_MS
        );
    }
}
