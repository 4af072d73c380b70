// =============================================================================
// Central Application State: Ticker Pulse
// =============================================================================
//
// The single state-holding layer. The analytics core is stateless; scheduled
// tasks call it and hand the results here, and the dashboard API reads
// snapshots from here.
//
// Thread safety:
//   - Atomic counters for the state version and the chart request generation.
//   - parking_lot::RwLock for all mutable shared collections.
//
// Chart requests are tagged with a generation number. Changing the selection
// bumps the generation, so any fetch still in flight for an older selection
// is discarded when it completes (last request wins).
// =============================================================================

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::Notify;
use tracing::{debug, trace};

use crate::analytics::{ChartView, SessionStats};
use crate::market_data::{Candle, HistoryWindow, PointSample};
use crate::provider::TickerStats;
use crate::runtime_config::RuntimeConfig;
use crate::types::Selection;

// =============================================================================
// Error Record
// =============================================================================

/// A recorded error event for the dashboard error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    /// Which task produced it (e.g. "price_poll", "chart_refresh").
    pub source: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

/// A chart fetch tagged with the generation it was issued under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartRequest {
    pub generation: u64,
    pub selection: Selection,
}

// =============================================================================
// AppState
// =============================================================================

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

pub struct AppState {
    // ── Version tracking ────────────────────────────────────────────────
    /// Incremented on every meaningful mutation; the WebSocket feed pushes a
    /// new snapshot whenever it changes.
    pub state_version: AtomicU64,

    // ── Configuration ───────────────────────────────────────────────────
    pub runtime_config: Arc<RwLock<RuntimeConfig>>,

    // ── Live prices (poll path) ─────────────────────────────────────────
    pub prices: RwLock<BTreeMap<String, f64>>,
    pub provider_stats: RwLock<BTreeMap<String, TickerStats>>,
    pub history: RwLock<HistoryWindow>,
    pub last_poll_ok: RwLock<Option<DateTime<Utc>>>,

    // ── Chart (selection path) ──────────────────────────────────────────
    selection: RwLock<Selection>,
    chart_generation: AtomicU64,
    pub chart: RwLock<Option<ChartView>>,
    /// Woken whenever a new chart request is issued.
    pub chart_refresh: Notify,

    // ── Error Log ───────────────────────────────────────────────────────
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(config: RuntimeConfig) -> Self {
        let history = HistoryWindow::new(config.history_capacity);
        let selection = config.selection.clone();

        Self {
            state_version: AtomicU64::new(1),
            runtime_config: Arc::new(RwLock::new(config)),

            prices: RwLock::new(BTreeMap::new()),
            provider_stats: RwLock::new(BTreeMap::new()),
            history: RwLock::new(history),
            last_poll_ok: RwLock::new(None),

            selection: RwLock::new(selection),
            chart_generation: AtomicU64::new(0),
            chart: RwLock::new(None),
            chart_refresh: Notify::new(),

            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    // ── Version Management ──────────────────────────────────────────────

    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Error Logging ───────────────────────────────────────────────────

    /// Record an error. Capped at [`MAX_RECENT_ERRORS`], oldest evicted.
    pub fn push_error(&self, source: &str, msg: String) {
        let record = ErrorRecord {
            message: msg,
            source: source.to_string(),
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }
        drop(errors);

        self.increment_version();
    }

    // ── Poll path ───────────────────────────────────────────────────────

    /// Store a fresh price map and append one sample per symbol to the
    /// sparkline window. `stats` is `None` when the stats fetch failed; the
    /// previous stats are kept in that case.
    pub fn record_prices(
        &self,
        prices: BTreeMap<String, f64>,
        stats: Option<BTreeMap<String, TickerStats>>,
        at: DateTime<Utc>,
    ) {
        {
            let mut history = self.history.write();
            for (symbol, &price) in &prices {
                history.append(symbol, PointSample::new(at, price));
                trace!(symbol = %symbol, price, window = history.len(symbol), "sample appended");
            }
            debug!(symbols = ?history.symbols(), "sparkline windows updated");
        }

        *self.prices.write() = prices;
        if let Some(stats) = stats {
            *self.provider_stats.write() = stats;
        }
        *self.last_poll_ok.write() = Some(at);

        self.increment_version();
    }

    pub fn sparkline(&self, symbol: &str) -> Vec<PointSample> {
        self.history.read().get(symbol)
    }

    // ── Selection path ──────────────────────────────────────────────────

    pub fn is_tracked(&self, symbol: &str) -> bool {
        self.runtime_config.read().symbols.iter().any(|s| s == symbol)
    }

    pub fn selection(&self) -> Selection {
        self.selection.read().clone()
    }

    /// Switch the chart to `selection` and issue a new request for it. Any
    /// result for an earlier generation will be discarded.
    pub fn select(&self, selection: Selection) -> ChartRequest {
        let request = {
            let mut current = self.selection.write();
            *current = selection.clone();
            let generation = self.chart_generation.fetch_add(1, Ordering::SeqCst) + 1;
            ChartRequest {
                generation,
                selection,
            }
        };

        self.runtime_config.write().selection = request.selection.clone();
        self.chart_refresh.notify_one();
        self.increment_version();
        request
    }

    /// Re-issue a request for the current selection.
    pub fn refresh_chart(&self) -> ChartRequest {
        self.select(self.selection())
    }

    /// The newest request, i.e. the one a refresher should fetch next.
    pub fn pending_request(&self) -> ChartRequest {
        let selection = self.selection.read();
        ChartRequest {
            generation: self.chart_generation.load(Ordering::SeqCst),
            selection: selection.clone(),
        }
    }

    /// Recompute the chart from `candles` if `request` is still current.
    /// Returns `false` (and leaves the chart untouched) for stale results.
    pub fn apply_chart(&self, request: &ChartRequest, candles: Vec<Candle>) -> bool {
        let rsi_period = self.runtime_config.read().rsi_period;

        let mut chart = self.chart.write();
        let current = self.chart_generation.load(Ordering::SeqCst);
        if request.generation != current {
            debug!(
                selection = %request.selection,
                generation = request.generation,
                current,
                "discarding stale chart result"
            );
            return false;
        }

        *chart = Some(ChartView::build(request.selection.clone(), candles, rsi_period));
        drop(chart);

        self.increment_version();
        true
    }

    // ── Snapshot Builder ────────────────────────────────────────────────

    /// Build a complete, serialisable snapshot for the dashboard.
    pub fn build_snapshot(&self) -> StateSnapshot {
        let now = Utc::now();
        let symbols = self.runtime_config.read().symbols.clone();

        let sparklines = {
            let history = self.history.read();
            symbols
                .iter()
                .map(|symbol| {
                    let samples = history.get(symbol);
                    let stats = SessionStats::compute(&samples);
                    let volume_label = stats.formatted_volume();
                    let proximity_label = stats.proximity_note.to_string();
                    (
                        symbol.clone(),
                        SparklineSnapshot {
                            samples,
                            stats,
                            volume_label,
                            proximity_label,
                        },
                    )
                })
                .collect()
        };

        StateSnapshot {
            state_version: self.current_state_version(),
            server_time: now.timestamp_millis(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            symbols,
            selection: self.selection(),
            prices: self.prices.read().clone(),
            provider_stats: self.provider_stats.read().clone(),
            sparklines,
            chart: self.chart.read().clone(),
            last_poll_ok: *self.last_poll_ok.read(),
            recent_errors: self.recent_errors.read().clone(),
        }
    }
}

// =============================================================================
// Serialisable snapshot types
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub state_version: u64,
    pub server_time: i64,
    pub uptime_secs: u64,
    pub symbols: Vec<String>,
    pub selection: Selection,
    pub prices: BTreeMap<String, f64>,
    pub provider_stats: BTreeMap<String, TickerStats>,
    pub sparklines: BTreeMap<String, SparklineSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartView>,
    pub last_poll_ok: Option<DateTime<Utc>>,
    pub recent_errors: Vec<ErrorRecord>,
}

/// Live-sample window for one symbol plus its session statistics.
#[derive(Debug, Clone, Serialize)]
pub struct SparklineSnapshot {
    pub samples: Vec<PointSample>,
    pub stats: SessionStats<PointSample>,
    pub volume_label: String,
    pub proximity_label: String,
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Interval, Period};

    fn state() -> AppState {
        AppState::new(RuntimeConfig::default())
    }

    fn candles(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let c = 100.0 + i as f64;
                Candle::new(format!("2024-03-01 10:{i:02}"), c, c, c, c, 10)
            })
            .collect()
    }

    fn tsla() -> Selection {
        Selection {
            symbol: "TSLA".into(),
            period: Period::FiveDays,
            interval: Interval::Auto,
        }
    }

    #[test]
    fn record_prices_feeds_history_window() {
        let st = state();
        for i in 0..25 {
            let mut prices = BTreeMap::new();
            prices.insert("AAPL".to_string(), 100.0 + i as f64);
            st.record_prices(prices, None, Utc::now());
        }
        let spark = st.sparkline("AAPL");
        assert_eq!(spark.len(), 20);
        assert_eq!(spark[0].price, 105.0);
        assert_eq!(spark[19].price, 124.0);
        assert!(st.sparkline("TSLA").is_empty());
        assert!(st.last_poll_ok.read().is_some());
    }

    #[test]
    fn failed_stats_fetch_keeps_previous_stats() {
        let st = state();
        let mut stats = BTreeMap::new();
        stats.insert("AAPL".to_string(), TickerStats { high: 110.0, low: 90.0 });
        st.record_prices(BTreeMap::new(), Some(stats), Utc::now());
        st.record_prices(BTreeMap::new(), None, Utc::now());
        assert_eq!(st.provider_stats.read()["AAPL"].high, 110.0);
    }

    #[test]
    fn current_request_is_applied() {
        let st = state();
        let req = st.refresh_chart();
        assert!(st.apply_chart(&req, candles(20)));
        let chart = st.chart.read();
        let chart = chart.as_ref().unwrap();
        assert_eq!(chart.records.len(), 20);
        assert!(chart.records[14].rsi.is_some());
    }

    #[test]
    fn stale_request_is_discarded() {
        let st = state();
        let old = st.refresh_chart();
        let new = st.select(tsla());
        assert!(new.generation > old.generation);

        assert!(!st.apply_chart(&old, candles(5)));
        assert!(st.chart.read().is_none());

        assert!(st.apply_chart(&new, candles(3)));
        assert_eq!(st.chart.read().as_ref().unwrap().selection.symbol, "TSLA");
    }

    #[test]
    fn pending_request_tracks_latest_selection() {
        let st = state();
        let issued = st.select(tsla());
        assert_eq!(st.pending_request(), issued);
        assert_eq!(st.runtime_config.read().selection, tsla());
    }

    #[test]
    fn error_log_is_capped() {
        let st = state();
        for i in 0..60 {
            st.push_error("price_poll", format!("boom {i}"));
        }
        let errors = st.recent_errors.read();
        assert_eq!(errors.len(), MAX_RECENT_ERRORS);
        assert_eq!(errors[0].message, "boom 10");
    }

    #[test]
    fn snapshot_includes_sparkline_stats() {
        let st = state();
        for p in [100.0, 102.0] {
            let mut prices = BTreeMap::new();
            prices.insert("AAPL".to_string(), p);
            st.record_prices(prices, None, Utc::now());
        }
        let snap = st.build_snapshot();
        let spark = &snap.sparklines["AAPL"];
        assert_eq!(spark.samples.len(), 2);
        assert_eq!(spark.stats.change, Some(2.0));
        assert_eq!(spark.proximity_label, "Near Session High");
        assert_eq!(spark.volume_label, "0");
        assert!(snap.sparklines["TSLA"].stats.high.is_none());
        assert!(snap.chart.is_none());
        assert_eq!(snap.prices["AAPL"], 102.0);
    }
}
