//! Candle provider trait and structured error types.
//!
//! The CandleProvider trait abstracts over the exchange so the scheduler can be
//! driven by a fake in tests. Providers do not retry; a failed fetch is retried
//! on the next cycle.

use thiserror::Error;

use crate::domain::{Candle, Timeframe};

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to fetch {symbol}: {message}")]
    RetrievalFailure { symbol: String, message: String },

    #[error("failed to parse candle data: {0}")]
    ParseFailure(String),

    #[error("invalid candle series: {0}")]
    InvalidSeries(#[from] crate::domain::SeriesError),

    #[error("cache persistence error: {0}")]
    Persistence(String),
}

impl DataError {
    pub fn retrieval(symbol: &str, message: impl Into<String>) -> Self {
        DataError::RetrievalFailure {
            symbol: symbol.to_string(),
            message: message.into(),
        }
    }
}

/// Source of candle series, one symbol at a time.
pub trait CandleProvider: Send {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch the most recent `count` candles of `timeframe`, oldest first.
    fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Candle>, DataError>;
}

impl<P: CandleProvider + ?Sized> CandleProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Candle>, DataError> {
        (**self).fetch(symbol, timeframe, count)
    }
}
