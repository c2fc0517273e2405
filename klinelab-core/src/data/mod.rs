//! Data layer — exchange kline fetching and per-day parquet persistence.

pub mod binance;
pub mod circuit_breaker;
pub mod config;
pub mod paging;
pub mod provider;
pub mod scrape;
pub mod store;
pub mod universe;

pub use binance::BinanceProvider;
pub use circuit_breaker::CircuitBreaker;
pub use config::ScrapeConfig;
pub use paging::{fetch_day, PageOptions};
pub use provider::{CandleProvider, DataError, Kline, ScrapeProgress, StdoutProgress};
pub use scrape::{scrape_symbols, ScrapeSummary};
pub use store::{CandleStore, StoreMeta, StoreStatus};
pub use universe::Universe;
