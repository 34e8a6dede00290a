use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One raw kline row as returned by the exchange
///
/// Position indexed: `[open_time, open, high, low, close, volume, ...]`
/// with the price/volume fields string-encoded.
pub type RawKline = Vec<Value>;

/// OHLCV candlestick data
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    /// Open time in epoch milliseconds
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Open time as a UTC datetime, None if the millis are out of range
    pub fn open_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    /// Parse a raw kline row
    ///
    /// Extra trailing fields are ignored. Numeric fields must be JSON strings,
    /// the timestamp must be a JSON number (fractional millis are truncated).
    pub fn from_kline(row: &[Value]) -> std::result::Result<Self, String> {
        if row.len() < 6 {
            return Err(format!("expected at least 6 fields, got {}", row.len()));
        }

        let timestamp = row[0]
            .as_f64()
            .ok_or_else(|| format!("open time is not a number: {}", row[0]))?
            .trunc();
        if !timestamp.is_finite() || timestamp.abs() > i64::MAX as f64 {
            return Err(format!("open time out of range: {}", timestamp));
        }
        let timestamp = timestamp as i64;
        if DateTime::from_timestamp_millis(timestamp).is_none() {
            return Err(format!("open time out of range: {}", timestamp));
        }

        Ok(Self {
            timestamp,
            open: parse_decimal(&row[1], "open")?,
            high: parse_decimal(&row[2], "high")?,
            low: parse_decimal(&row[3], "low")?,
            close: parse_decimal(&row[4], "close")?,
            volume: parse_decimal(&row[5], "volume")?,
        })
    }

    /// Encode back into the exchange's kline row layout
    pub fn to_kline(&self) -> RawKline {
        vec![
            Value::from(self.timestamp),
            Value::from(self.open.to_string()),
            Value::from(self.high.to_string()),
            Value::from(self.low.to_string()),
            Value::from(self.close.to_string()),
            Value::from(self.volume.to_string()),
        ]
    }
}

fn parse_decimal(value: &Value, field: &str) -> std::result::Result<f64, String> {
    let text = value
        .as_str()
        .ok_or_else(|| format!("{} is not a string: {}", field, value))?;
    text.trim()
        .parse::<f64>()
        .map_err(|e| format!("{} '{}' is not a decimal: {}", field, text, e))
}

/// 24-hour rolling ticker snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ticker24h {
    pub symbol: String,
    /// Absolute change over 24h, string decimal (e.g. "-94.91000000")
    pub price_change: String,
    /// Percent change over 24h without the % sign (e.g. "-0.095")
    pub price_change_percent: String,
    pub last_price: String,
}

impl Ticker24h {
    pub fn last_price(&self) -> std::result::Result<f64, std::num::ParseFloatError> {
        self.last_price.parse()
    }

    pub fn price_change(&self) -> std::result::Result<f64, std::num::ParseFloatError> {
        self.price_change.parse()
    }

    pub fn price_change_percent(&self) -> std::result::Result<f64, std::num::ParseFloatError> {
        self.price_change_percent.parse()
    }
}

/// One currency row from the KEXIM daily exchange-rate feed
///
/// Error rows carry only `result`; their text fields may be null.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeximRate {
    /// 1 = success, 2 = bad data code, 3 = bad auth key, 4 = daily limit reached
    pub result: i32,
    #[serde(rename = "cur_unit", default, deserialize_with = "null_as_empty")]
    pub currency_unit: String,
    #[serde(rename = "cur_nm", default, deserialize_with = "null_as_empty")]
    pub currency_name: String,
    /// Deal base rate, thousands separated (e.g. "1,370.5")
    #[serde(rename = "deal_bas_r", default, deserialize_with = "null_as_empty")]
    pub deal_base_rate: String,
    #[serde(rename = "ttb", default, deserialize_with = "null_as_empty")]
    pub transfer_rate_buy: String,
    #[serde(rename = "tts", default, deserialize_with = "null_as_empty")]
    pub transfer_rate_sell: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl KeximRate {
    pub fn deal_base_rate(&self) -> Option<f64> {
        self.deal_base_rate.replace(',', "").trim().parse().ok()
    }
}
