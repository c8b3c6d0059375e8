//! Screener Core: candle series, indicators, trend classification, alerts, series cache.
//!
//! This crate contains everything a refresh cycle computes:
//! - Domain types (candles, series, timeframes)
//! - Indicator library (RSI, EMA, ATR, Stochastic) returning `None` on short history
//! - Regression-based trend, volatility regime and confidence
//! - Alert composition under the two stochastic/EMA interaction methods
//! - Per-symbol analysis producing the report both run modes emit
//! - Configuration, candle retrieval and the timeframe-tagged series cache

pub mod alerts;
pub mod analysis;
pub mod config;
pub mod data;
pub mod domain;
pub mod indicators;
pub mod trend;
