//! Kline payload parsing.
//!
//! The exchange has returned two shapes over time:
//! - column-oriented: `{"high": [...], "low": [...], "close": [...], ...}`
//! - row-oriented: `[{"high": .., "low": .., "close": ..}, ...]`, optionally
//!   with the short keys `h`/`l`/`c`.
//!
//! Numbers may arrive as JSON numbers or numeric strings.

use serde_json::Value;

use super::provider::DataError;
use crate::domain::{Candle, CandleSeries};

/// Extract candles from a kline `data` payload. An empty result is a failure.
pub fn parse_ohlc(data: &Value) -> Result<Vec<Candle>, DataError> {
    let candles = match data {
        Value::Object(map) => {
            let column = |key: &str| -> Result<Vec<f64>, DataError> {
                match map.get(key) {
                    Some(Value::Array(values)) => values.iter().map(number).collect(),
                    _ => Err(DataError::ParseFailure(format!("missing '{key}' column"))),
                }
            };
            let series = CandleSeries::new(column("high")?, column("low")?, column("close")?)?;
            series.candles().collect()
        }
        Value::Array(rows) => parse_rows(rows)?,
        other => {
            return Err(DataError::ParseFailure(format!(
                "unexpected payload type: {}",
                type_name(other)
            )))
        }
    };

    if candles.is_empty() {
        return Err(DataError::ParseFailure("no candles in payload".into()));
    }
    Ok(candles)
}

fn parse_rows(rows: &[Value]) -> Result<Vec<Candle>, DataError> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    let keys = if has_keys(first, ["high", "low", "close"]) {
        ["high", "low", "close"]
    } else if has_keys(first, ["h", "l", "c"]) {
        ["h", "l", "c"]
    } else {
        return Err(DataError::ParseFailure("unrecognised row format".into()));
    };

    rows.iter()
        .map(|row| {
            let field = |key: &str| {
                row.get(key)
                    .ok_or_else(|| DataError::ParseFailure(format!("row missing '{key}'")))
                    .and_then(number)
            };
            Ok(Candle::new(field(keys[0])?, field(keys[1])?, field(keys[2])?))
        })
        .collect()
}

fn has_keys(row: &Value, keys: [&str; 3]) -> bool {
    row.as_object()
        .is_some_and(|obj| keys.iter().all(|k| obj.contains_key(*k)))
}

fn number(value: &Value) -> Result<f64, DataError> {
    let v = match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| DataError::ParseFailure(format!("not a finite number: {n}"))),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| DataError::ParseFailure(format!("not a number: {s:?}"))),
        other => Err(DataError::ParseFailure(format!(
            "expected number, got {}",
            type_name(other)
        ))),
    }?;
    // NaN and infinities serialize as null and would poison the persisted cache.
    if !v.is_finite() {
        return Err(DataError::ParseFailure(format!("not a finite number: {value}")));
    }
    Ok(v)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn column_payload() {
        let data = json!({
            "time": [1, 2],
            "open": [1.0, 2.0],
            "high": [11.0, 12.5],
            "low": [9.0, "10.5"],
            "close": [10.0, 12.0]
        });
        let candles = parse_ohlc(&data).unwrap();
        assert_eq!(candles, vec![Candle::new(11.0, 9.0, 10.0), Candle::new(12.5, 10.5, 12.0)]);
    }

    #[test]
    fn row_payload_long_and_short_keys() {
        let long = json!([{"high": "3", "low": 1, "close": 2}]);
        assert_eq!(parse_ohlc(&long).unwrap(), vec![Candle::new(3.0, 1.0, 2.0)]);

        let short = json!([{"h": 5, "l": 3, "c": 4}, {"h": 6, "l": 4, "c": 5}]);
        let candles = parse_ohlc(&short).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[1].close, 5.0);
    }

    #[test]
    fn non_finite_strings_are_rejected() {
        let data = json!({"high": ["NaN", "2"], "low": ["1", "1"], "close": ["1.5", "1.5"]});
        assert!(matches!(parse_ohlc(&data), Err(DataError::ParseFailure(_))));

        let rows = json!([{"h": "5", "l": "inf", "c": "4"}]);
        assert!(matches!(parse_ohlc(&rows), Err(DataError::ParseFailure(_))));

        let rows = json!([{"h": "5", "l": "-Infinity", "c": "4"}]);
        assert!(matches!(parse_ohlc(&rows), Err(DataError::ParseFailure(_))));
    }

    #[test]
    fn mismatched_columns_are_rejected() {
        let data = json!({"high": [1.0, 2.0], "low": [0.5], "close": [1.0, 1.5]});
        assert!(matches!(parse_ohlc(&data), Err(DataError::InvalidSeries(_))));
    }

    #[test]
    fn empty_and_garbage_payloads_fail() {
        assert!(matches!(parse_ohlc(&json!([])), Err(DataError::ParseFailure(_))));
        assert!(matches!(
            parse_ohlc(&json!({"high": [], "low": [], "close": []})),
            Err(DataError::ParseFailure(_))
        ));
        assert!(parse_ohlc(&json!({"open": [1]})).is_err());
        assert!(parse_ohlc(&json!([{"open": 1}])).is_err());
        assert!(parse_ohlc(&json!([{"h": "abc", "l": 1, "c": 1}])).is_err());
        assert!(parse_ohlc(&json!("nope")).is_err());
    }
}
