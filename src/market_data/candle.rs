use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single OHLCV candle as returned by the history provider.
///
/// The provider may leave `open`, `high`, `low` and `volume` empty for a
/// bucket. A missing close is carried as NaN so it propagates through the
/// indicator instead of being silently replaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    #[serde(rename = "time")]
    pub timestamp: String,
    #[serde(default)]
    pub open: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default = "missing_close", deserialize_with = "nan_if_null")]
    pub close: f64,
    #[serde(default)]
    pub volume: Option<u64>,
}

impl Candle {
    /// Fully-populated candle.
    #[cfg(test)]
    pub fn new(
        timestamp: impl Into<String>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close,
            volume: Some(volume),
        }
    }

    /// Parse the provider timestamp (`YYYY-MM-DD HH:MM`, with RFC 3339 as a
    /// fallback). Returns `None` when neither format matches.
    pub fn parsed_time(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.timestamp)
    }
}

/// One live-price observation taken on a poll tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSample {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

impl PointSample {
    pub fn new(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self { timestamp, price }
    }
}

/// Common view over anything that carries a price and (optionally) a volume,
/// so session statistics can run over candles and point samples alike.
pub trait PricePoint {
    fn price(&self) -> f64;

    fn volume(&self) -> Option<u64> {
        None
    }
}

impl PricePoint for Candle {
    fn price(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> Option<u64> {
        self.volume
    }
}

impl PricePoint for PointSample {
    fn price(&self) -> f64 {
        self.price
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const PROVIDER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, PROVIDER_TIME_FORMAT)
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.naive_utc())
        })
}

/// First and last calendar dates covered by `candles`, using the first and
/// last elements as given (no re-sorting).
pub fn date_range(candles: &[Candle]) -> Option<(NaiveDate, NaiveDate)> {
    let first = candles.first()?.parsed_time()?;
    let last = candles.last()?.parsed_time()?;
    Some((first.date(), last.date()))
}

fn missing_close() -> f64 {
    f64::NAN
}

fn nan_if_null<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn deserialise_provider_row() {
        let json = r#"{
            "time": "2024-03-01 14:30",
            "price": 180.25,
            "volume": 12000,
            "open": 180.0,
            "high": 180.5,
            "low": 179.9,
            "close": 180.25
        }"#;
        let c: Candle = serde_json::from_str(json).unwrap();
        assert_eq!(c.timestamp, "2024-03-01 14:30");
        assert_eq!(c.open, Some(180.0));
        assert_eq!(c.volume, Some(12_000));
        assert!((c.close - 180.25).abs() < f64::EPSILON);
    }

    #[test]
    fn null_fields_stay_absent() {
        let json = r#"{ "time": "2024-03-01 14:31", "volume": null, "open": null,
                        "high": null, "low": null, "close": 181.0 }"#;
        let c: Candle = serde_json::from_str(json).unwrap();
        assert_eq!(c.volume, None);
        assert_eq!(c.open, None);
        assert_eq!(c.high, None);
        assert_eq!(c.low, None);
    }

    #[test]
    fn missing_close_becomes_nan() {
        let c: Candle = serde_json::from_str(r#"{ "time": "2024-03-01 14:32" }"#).unwrap();
        assert!(c.close.is_nan());

        let c: Candle =
            serde_json::from_str(r#"{ "time": "2024-03-01 14:32", "close": null }"#).unwrap();
        assert!(c.close.is_nan());
    }

    #[test]
    fn parses_provider_and_rfc3339_timestamps() {
        let c = Candle::new("2024-03-01 14:30", 1.0, 1.0, 1.0, 1.0, 0);
        let t = c.parsed_time().unwrap();
        assert_eq!((t.hour(), t.minute()), (14, 30));

        let t = parse_timestamp("2024-03-01T09:15:00Z").unwrap();
        assert_eq!(t.day(), 1);
        assert_eq!(t.hour(), 9);

        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn date_range_uses_first_and_last() {
        let candles = vec![
            Candle::new("2024-03-01 09:30", 1.0, 1.0, 1.0, 1.0, 0),
            Candle::new("2024-03-04 16:00", 1.0, 1.0, 1.0, 1.0, 0),
        ];
        let (from, to) = date_range(&candles).unwrap();
        assert_eq!(from.to_string(), "2024-03-01");
        assert_eq!(to.to_string(), "2024-03-04");
        assert!(date_range(&[]).is_none());
    }
}
