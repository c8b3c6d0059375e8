//! Candle and CandleSeries: the market data unit the engine reads.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One interval's high/low/close. Open and volume are not retained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    pub fn new(high: f64, low: f64, close: f64) -> Self {
        Self { high, low, close }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("series length mismatch: highs={highs}, lows={lows}, closes={closes}")]
    LengthMismatch {
        highs: usize,
        lows: usize,
        closes: usize,
    },
}

/// Three same-length sequences, ascending by time, oldest first.
///
/// The length invariant is checked on construction and on deserialization,
/// so every `CandleSeries` in the process is well-formed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSeries")]
pub struct CandleSeries {
    highs: Vec<f64>,
    lows: Vec<f64>,
    closes: Vec<f64>,
}

#[derive(Deserialize)]
struct RawSeries {
    highs: Vec<f64>,
    lows: Vec<f64>,
    closes: Vec<f64>,
}

impl TryFrom<RawSeries> for CandleSeries {
    type Error = SeriesError;

    fn try_from(raw: RawSeries) -> Result<Self, Self::Error> {
        CandleSeries::new(raw.highs, raw.lows, raw.closes)
    }
}

impl CandleSeries {
    pub fn new(highs: Vec<f64>, lows: Vec<f64>, closes: Vec<f64>) -> Result<Self, SeriesError> {
        if highs.len() != closes.len() || lows.len() != closes.len() {
            return Err(SeriesError::LengthMismatch {
                highs: highs.len(),
                lows: lows.len(),
                closes: closes.len(),
            });
        }
        Ok(Self {
            highs,
            lows,
            closes,
        })
    }

    pub fn from_candles(candles: &[Candle]) -> Self {
        Self {
            highs: candles.iter().map(|c| c.high).collect(),
            lows: candles.iter().map(|c| c.low).collect(),
            closes: candles.iter().map(|c| c.close).collect(),
        }
    }

    pub fn highs(&self) -> &[f64] {
        &self.highs
    }

    pub fn lows(&self) -> &[f64] {
        &self.lows
    }

    pub fn closes(&self) -> &[f64] {
        &self.closes
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    /// Most recent close, if any.
    pub fn last_close(&self) -> Option<f64> {
        self.closes.last().copied()
    }

    pub fn candles(&self) -> impl Iterator<Item = Candle> + '_ {
        self.highs
            .iter()
            .zip(&self.lows)
            .zip(&self.closes)
            .map(|((&high, &low), &close)| Candle::new(high, low, close))
    }
}
