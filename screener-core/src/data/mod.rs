//! Candle retrieval, parsing, the per-session series cache and its persistence.

pub mod cache;
pub mod mexc;
pub mod parse;
pub mod provider;
pub mod store;

pub use cache::{CacheEntry, SeriesCache};
pub use mexc::MexcProvider;
pub use parse::parse_ohlc;
pub use provider::{CandleProvider, DataError};
pub use store::{CacheStore, JsonFileStore, NullStore};
