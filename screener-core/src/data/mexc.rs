//! MEXC contract kline provider.
//!
//! Requests `count` candles by asking for the window
//! `[now - count * interval, now]`; the exchange returns whatever exists in
//! that range, so young listings come back short.

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::parse::parse_ohlc;
use super::provider::{CandleProvider, DataError};
use crate::domain::{Candle, Timeframe};

const BASE_URL: &str = "https://contract.mexc.com";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

/// Response envelope: `{"success": true, "code": 0, "data": ...}`.
#[derive(Debug, Deserialize)]
struct KlineResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    code: Option<i64>,
    data: Option<Value>,
}

pub struct MexcProvider {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl MexcProvider {
    pub fn new() -> Result<Self, DataError> {
        Self::with_base_url(BASE_URL)
    }

    /// Point the provider at another host (a proxy or a local mock).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DataError::retrieval("*", format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Build the kline URL for a symbol, interval and candle count ending at `end_ts`.
    fn kline_url(&self, symbol: &str, timeframe: Timeframe, count: usize, end_ts: i64) -> String {
        let window = (count as u64).saturating_mul(timeframe.label_secs());
        let start_ts = end_ts - i64::try_from(window).unwrap_or(i64::MAX).min(end_ts);
        format!(
            "{}/api/v1/contract/kline/{symbol}?interval={}&start={start_ts}&end={end_ts}",
            self.base_url,
            timeframe.label()
        )
    }
}

impl CandleProvider for MexcProvider {
    fn name(&self) -> &str {
        "mexc"
    }

    fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Candle>, DataError> {
        let url = self.kline_url(symbol, timeframe, count, Utc::now().timestamp());
        debug!(%symbol, %url, "fetching klines");

        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| DataError::retrieval(symbol, e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DataError::retrieval(symbol, format!("HTTP {status}")));
        }

        let body: KlineResponse = resp
            .json()
            .map_err(|e| DataError::ParseFailure(format!("invalid response for {symbol}: {e}")))?;

        match body {
            KlineResponse {
                success: true,
                data: Some(data),
                ..
            } => parse_ohlc(&data),
            KlineResponse { code, .. } => Err(DataError::retrieval(
                symbol,
                format!("exchange returned an error (code {code:?})"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kline_url_window_uses_interval_seconds() {
        let provider = MexcProvider::with_base_url("http://localhost").unwrap();
        let url = provider.kline_url("BTC_USDT", Timeframe(15), 250, 1_000_000);
        assert_eq!(
            url,
            "http://localhost/api/v1/contract/kline/BTC_USDT?interval=Min15&start=775000&end=1000000"
        );
    }

    #[test]
    fn unknown_timeframe_requests_min15() {
        let provider = MexcProvider::with_base_url("http://localhost").unwrap();
        let url = provider.kline_url("ETH_USDT", Timeframe(7), 10, 100_000);
        assert!(url.contains("interval=Min15"));
        assert!(url.contains("start=91000"));
    }

    #[test]
    fn envelope_without_success_is_an_error() {
        let body: KlineResponse =
            serde_json::from_str(r#"{"success": false, "code": 600}"#).unwrap();
        assert!(!body.success);
        assert_eq!(body.code, Some(600));
        assert!(body.data.is_none());
    }
}
