//! Domain types for KlineLab

pub mod candle;

pub use candle::Candle;

/// Trading-pair symbol type alias (e.g. "BTC/USDT").
pub type Symbol = String;
