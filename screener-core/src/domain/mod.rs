//! Domain types for the screener

pub mod candle;
pub mod timeframe;

pub use candle::{Candle, CandleSeries, SeriesError};
pub use timeframe::Timeframe;
