//! Wire types for the BloFin public market API.

use serde::Deserialize;

use crate::error::CoreError;
use crate::models::Bar;

/// Success code in the response envelope.
pub const CODE_OK: &str = "0";

/// Envelope returned by `/api/v1/market/candles`.
///
/// Each row is `[ts, open, high, low, close, vol, volCurrency, volCurrencyQuote, confirm]`,
/// all strings, newest row first.
#[derive(Debug, Clone, Deserialize)]
pub struct CandlesResponse {
    pub code: String,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub data: Vec<Vec<String>>,
}

impl CandlesResponse {
    pub fn is_ok(&self) -> bool {
        self.code == CODE_OK
    }

    /// Parse every row into a [`Bar`], oldest first.
    pub fn into_bars(self) -> Result<Vec<Bar>, CoreError> {
        let mut bars = self
            .data
            .iter()
            .map(|row| parse_candle_row(row))
            .collect::<Result<Vec<_>, _>>()?;
        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }
}

/// Parse one candle row. Trailing volume-currency and confirm columns are ignored.
pub fn parse_candle_row(row: &[String]) -> Result<Bar, CoreError> {
    if row.len() < 6 {
        return Err(CoreError::InvalidBarSchema(format!(
            "expected at least 6 columns, got {}",
            row.len()
        )));
    }

    let timestamp = row[0]
        .parse::<i64>()
        .map_err(|_| CoreError::InvalidBarSchema(format!("bad timestamp '{}'", row[0])))?;

    let field = |idx: usize, name: &str| -> Result<f64, CoreError> {
        row[idx]
            .parse::<f64>()
            .map_err(|_| CoreError::InvalidBarSchema(format!("bad {} '{}'", name, row[idx])))
    };

    let bar = Bar::new(
        timestamp,
        field(1, "open")?,
        field(2, "high")?,
        field(3, "low")?,
        field(4, "close")?,
        field(5, "volume")?,
    );
    bar.check()?;
    Ok(bar)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_row() {
        let bar = parse_candle_row(&row(&[
            "1700000000000", "0.61", "0.62", "0.60", "0.615", "12345", "7500", "7500", "1",
        ]))
        .unwrap();

        assert_eq!(bar.timestamp, 1_700_000_000_000);
        assert_eq!(bar.high, 0.62);
        assert_eq!(bar.close, 0.615);
        assert_eq!(bar.volume, 12345.0);
    }

    #[test]
    fn test_parse_row_rejects_garbage() {
        let err = parse_candle_row(&row(&["1700000000000", "0.61", "x", "0.60", "0.615", "1"]))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidBarSchema(_)));

        let short = parse_candle_row(&row(&["1700000000000", "0.61"])).unwrap_err();
        assert!(matches!(short, CoreError::InvalidBarSchema(_)));

        let nan = parse_candle_row(&row(&["1", "NaN", "1", "1", "1", "1"])).unwrap_err();
        assert!(matches!(nan, CoreError::InvalidBarSchema(_)));
    }

    #[test]
    fn test_envelope_sorted_ascending() {
        let json = r#"{
            "code": "0",
            "msg": "success",
            "data": [
                ["3000", "1", "1", "1", "1.3", "1", "1", "1", "0"],
                ["2000", "1", "1", "1", "1.2", "1", "1", "1", "1"],
                ["1000", "1", "1", "1", "1.1", "1", "1", "1", "1"]
            ]
        }"#;

        let resp: CandlesResponse = serde_json::from_str(json).unwrap();
        assert!(resp.is_ok());

        let bars = resp.into_bars().unwrap();
        let stamps: Vec<i64> = bars.iter().map(|b| b.timestamp).collect();
        assert_eq!(stamps, vec![1000, 2000, 3000]);
        assert_eq!(bars[2].close, 1.3);
    }

    #[test]
    fn test_error_envelope() {
        let resp: CandlesResponse =
            serde_json::from_str(r#"{"code":"152001","msg":"Parameter error"}"#).unwrap();
        assert!(!resp.is_ok());
        assert!(resp.data.is_empty());
    }
}
