// =============================================================================
// Chart Pipeline: candles -> RSI -> per-candle records -> session stats
// =============================================================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::analytics::session_stats::SessionStats;
use crate::indicators::compute_rsi;
use crate::indicators::rsi::zone_label;
use crate::market_data::{date_range, Candle, PricePoint};
use crate::types::Selection;

/// A candle with its index-aligned RSI value merged in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandleRecord {
    #[serde(flatten)]
    pub candle: Candle,
    /// Mirror of `close`, kept for consumers that read a `price` column.
    pub price: f64,
    pub rsi: Option<f64>,
}

impl PricePoint for CandleRecord {
    fn price(&self) -> f64 {
        self.candle.close
    }

    fn volume(&self) -> Option<u64> {
        self.candle.volume
    }
}

/// Run the indicator over `candles` and zip the result back onto them.
pub fn annotate_rsi(candles: Vec<Candle>, period: usize) -> Vec<CandleRecord> {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let rsi = compute_rsi(&closes, period);

    candles
        .into_iter()
        .zip(rsi)
        .map(|(candle, rsi)| CandleRecord {
            price: candle.close,
            candle,
            rsi,
        })
        .collect()
}

/// Everything the presentation layer needs to draw the selected chart.
#[derive(Debug, Clone, Serialize)]
pub struct ChartView {
    pub selection: Selection,
    pub period_label: &'static str,
    pub interval_label: &'static str,
    pub rsi_period: usize,
    pub records: Vec<CandleRecord>,
    pub stats: SessionStats<CandleRecord>,
    pub volume_label: String,
    /// Human-readable proximity note, empty when there is none.
    pub proximity_label: String,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub rsi_zone: Option<&'static str>,
    pub computed_at: DateTime<Utc>,
}

impl ChartView {
    /// Full recomputation from a freshly fetched candle sequence.
    pub fn build(selection: Selection, candles: Vec<Candle>, rsi_period: usize) -> Self {
        let date_range = date_range(&candles);
        let records = annotate_rsi(candles, rsi_period);
        let stats = SessionStats::compute(&records);
        let volume_label = stats.formatted_volume();
        let proximity_label = stats.proximity_note.to_string();
        let rsi_zone = records
            .last()
            .and_then(|r| r.rsi)
            .filter(|v| !v.is_nan())
            .map(zone_label);

        Self {
            period_label: selection.period.label(),
            interval_label: selection.effective_interval().label(),
            selection,
            rsi_period,
            records,
            stats,
            volume_label,
            proximity_label,
            date_range,
            rsi_zone,
            computed_at: Utc::now(),
        }
    }
}
