//! Binance spot kline provider.
//!
//! Fetches minute klines from the `/api/v3/klines` REST endpoint. Handles
//! bounded retries with exponential backoff, rate-limit responses, and the
//! circuit breaker. The client is a plain value constructed by the caller —
//! there is no process-wide exchange singleton.
//!
//! Binance serves klines as JSON arrays of mixed types (open time as a
//! number, prices and volume as decimal strings), so parsing goes through
//! `serde_json::Value` rather than a typed struct.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{CandleProvider, DataError, Kline};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.binance.com";

/// Binance error body, e.g. `{"code":-1121,"msg":"Invalid symbol."}`.
#[derive(Debug, Deserialize)]
struct ApiError {
    code: i64,
    msg: String,
}

/// Binance spot market data provider.
pub struct BinanceProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    interval: String,
    circuit_breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
}

impl BinanceProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, circuit_breaker)
    }

    /// Construct against an explicit base URL (tests point this at a stub).
    pub fn with_base_url(base_url: impl Into<String>, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into(),
            interval: "1m".into(),
            circuit_breaker,
            max_retries: 5,
            base_delay: Duration::from_millis(500),
        }
    }

    /// Override the retry policy (attempts, base backoff delay).
    pub fn with_retry_policy(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    /// Candle interval requested from the exchange.
    pub fn interval(&self) -> &str {
        &self.interval
    }

    /// Binance spells pairs without the slash: BTC/USDT → BTCUSDT.
    fn api_symbol(symbol: &str) -> String {
        symbol.replace('/', "")
    }

    fn klines_url(&self, symbol: &str, since_ms: i64, limit: u32) -> String {
        format!(
            "{}/api/v3/klines?symbol={}&interval={}&startTime={since_ms}&limit={limit}",
            self.base_url,
            Self::api_symbol(symbol),
            self.interval,
        )
    }

    /// Exponential backoff for a retry attempt. The exponent is capped so a
    /// large `max_retries` cannot overflow the multiplier.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Parse a kline response body into Klines.
    ///
    /// Each row is `[open_time, open, high, low, close, volume, close_time, ...]`
    /// with prices as decimal strings.
    fn parse_klines(symbol: &str, body: &serde_json::Value) -> Result<Vec<Kline>, DataError> {
        let rows = body.as_array().ok_or_else(|| {
            DataError::ResponseFormatChanged(format!("{symbol}: kline response is not an array"))
        })?;

        let mut klines = Vec::with_capacity(rows.len());
        for row in rows {
            let fields = row.as_array().ok_or_else(|| {
                DataError::ResponseFormatChanged(format!("{symbol}: kline row is not an array"))
            })?;
            if fields.len() < 6 {
                return Err(DataError::ResponseFormatChanged(format!(
                    "{symbol}: kline row has {} fields, expected at least 6",
                    fields.len()
                )));
            }

            let timestamp = fields[0].as_i64().ok_or_else(|| {
                DataError::ResponseFormatChanged(format!("{symbol}: open time is not an integer"))
            })?;

            let price = |idx: usize, name: &str| -> Result<f64, DataError> {
                fields[idx]
                    .as_str()
                    .and_then(|s| s.parse::<f64>().ok())
                    .ok_or_else(|| {
                        DataError::ResponseFormatChanged(format!(
                            "{symbol}: {name} is not a decimal string"
                        ))
                    })
            };

            klines.push(Kline {
                timestamp,
                open: price(1, "open")?,
                high: price(2, "high")?,
                low: price(3, "low")?,
                close: price(4, "close")?,
                volume: price(5, "volume")?,
            });
        }

        Ok(klines)
    }

    /// Execute a single page request with retry and circuit breaker logic.
    fn fetch_with_retry(
        &self,
        symbol: &str,
        since_ms: i64,
        limit: u32,
    ) -> Result<Vec<Kline>, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let url = self.klines_url(symbol, since_ms, limit);
        let mut last_error: Option<DataError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.backoff_delay(attempt);
                debug!(symbol, since_ms, attempt, ?delay, "retrying kline page");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            match self.client.get(&url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::FORBIDDEN
                        || status == reqwest::StatusCode::IM_A_TEAPOT
                    {
                        // 418 is Binance's temporary IP ban for ignoring 429s
                        self.circuit_breaker.trip();
                        return Err(DataError::CircuitBreakerTripped);
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        self.circuit_breaker.record_failure();
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        warn!(symbol, retry_after, "rate limited by exchange");
                        last_error = Some(DataError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    if status.is_client_error() {
                        // Surface the exchange's error message; -1121 is "Invalid symbol"
                        let err = resp
                            .json::<ApiError>()
                            .map_err(|e| {
                                DataError::ResponseFormatChanged(format!(
                                    "{symbol}: unreadable error body: {e}"
                                ))
                            })?;
                        if err.code == -1121 {
                            return Err(DataError::SymbolNotFound {
                                symbol: symbol.to_string(),
                            });
                        }
                        return Err(DataError::Other(format!(
                            "{symbol}: exchange error {}: {}",
                            err.code, err.msg
                        )));
                    }

                    if !status.is_success() {
                        self.circuit_breaker.record_failure();
                        last_error = Some(DataError::Other(format!("HTTP {status} for {symbol}")));
                        continue;
                    }

                    let body: serde_json::Value = resp.json().map_err(|e| {
                        DataError::ResponseFormatChanged(format!(
                            "failed to parse response for {symbol}: {e}"
                        ))
                    })?;

                    let klines = Self::parse_klines(symbol, &body)?;
                    self.circuit_breaker.record_success();
                    return Ok(klines);
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        warn!(symbol, error = %e, "transient network error");
                        last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(DataError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(DataError::RetriesExhausted {
            attempts: self.max_retries + 1,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown".into()),
        })
    }
}

impl CandleProvider for BinanceProvider {
    fn exchange_id(&self) -> &str {
        "binance"
    }

    fn fetch_klines(
        &self,
        symbol: &str,
        since_ms: i64,
        limit: u32,
    ) -> Result<Vec<Kline>, DataError> {
        self.fetch_with_retry(symbol, since_ms, limit)
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}
