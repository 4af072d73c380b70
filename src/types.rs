// =============================================================================
// Shared types used across the Ticker Pulse engine
// =============================================================================

use serde::{Deserialize, Serialize};

/// Look-back window requested from the history provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[default]
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
}

impl Period {
    /// Query-string code understood by the provider.
    pub fn code(&self) -> &'static str {
        match self {
            Self::OneDay => "1d",
            Self::FiveDays => "5d",
            Self::OneMonth => "1mo",
            Self::ThreeMonths => "3mo",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::OneDay => "1 Day",
            Self::FiveDays => "5 Days",
            Self::OneMonth => "1 Month",
            Self::ThreeMonths => "3 Months",
        }
    }

    /// Bar size used when the interval is left on `Auto`.
    pub fn auto_interval(&self) -> Interval {
        match self {
            Self::OneDay => Interval::OneMinute,
            Self::FiveDays => Interval::FiveMinutes,
            Self::OneMonth => Interval::ThirtyMinutes,
            Self::ThreeMonths => Interval::OneHour,
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Candle bar size. `Auto` resolves against the selected [`Period`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[default]
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
}

impl Interval {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
            Self::ThirtyMinutes => "30m",
            Self::OneHour => "1h",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Auto => "Auto",
            Self::OneMinute => "1 Min",
            Self::FiveMinutes => "5 Min",
            Self::ThirtyMinutes => "30 Min",
            Self::OneHour => "1 Hour",
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// The symbol / period / interval triple the chart is currently showing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub symbol: String,
    #[serde(default)]
    pub period: Period,
    #[serde(default)]
    pub interval: Interval,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            symbol: "AAPL".to_string(),
            period: Period::default(),
            interval: Interval::default(),
        }
    }
}

impl Selection {
    /// The interval actually sent to the provider (never `Auto`).
    pub fn effective_interval(&self) -> Interval {
        match self.interval {
            Interval::Auto => self.period.auto_interval(),
            other => other,
        }
    }
}

impl std::fmt::Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}/{}", self.symbol, self.period, self.effective_interval())
    }
}

/// Annotation raised when the latest price sits close to a session extreme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProximityNote {
    #[default]
    None,
    NearHigh,
    NearLow,
}

impl std::fmt::Display for ProximityNote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, ""),
            Self::NearHigh => write!(f, "Near Session High"),
            Self::NearLow => write!(f, "Near Session Low"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_interval_follows_period() {
        let mut sel = Selection::default();
        assert_eq!(sel.effective_interval(), Interval::OneMinute);

        sel.period = Period::FiveDays;
        assert_eq!(sel.effective_interval(), Interval::FiveMinutes);
        sel.period = Period::OneMonth;
        assert_eq!(sel.effective_interval(), Interval::ThirtyMinutes);
        sel.period = Period::ThreeMonths;
        assert_eq!(sel.effective_interval(), Interval::OneHour);
    }

    #[test]
    fn explicit_interval_wins_over_auto() {
        let sel = Selection {
            symbol: "TSLA".into(),
            period: Period::ThreeMonths,
            interval: Interval::FiveMinutes,
        };
        assert_eq!(sel.effective_interval(), Interval::FiveMinutes);
        assert_eq!(sel.to_string(), "TSLA@3mo/5m");
    }

    #[test]
    fn selection_deserialises_provider_codes() {
        let json = r#"{ "symbol": "AMZN", "period": "1mo", "interval": "1h" }"#;
        let sel: Selection = serde_json::from_str(json).unwrap();
        assert_eq!(sel.period, Period::OneMonth);
        assert_eq!(sel.interval, Interval::OneHour);
        assert_eq!(sel.period.label(), "1 Month");
        assert_eq!(sel.interval.label(), "1 Hour");
    }

    #[test]
    fn selection_missing_fields_default_to_auto() {
        let sel: Selection = serde_json::from_str(r#"{ "symbol": "AAPL" }"#).unwrap();
        assert_eq!(sel.period, Period::OneDay);
        assert_eq!(sel.interval, Interval::Auto);
    }

    #[test]
    fn proximity_note_serialises_screaming() {
        let json = serde_json::to_string(&ProximityNote::NearHigh).unwrap();
        assert_eq!(json, "\"NEAR_HIGH\"");
    }

    #[test]
    fn proximity_note_display_text() {
        assert_eq!(ProximityNote::NearHigh.to_string(), "Near Session High");
        assert_eq!(ProximityNote::NearLow.to_string(), "Near Session Low");
        assert_eq!(ProximityNote::default().to_string(), "");
    }
}
