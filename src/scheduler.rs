// =============================================================================
// Scheduler: the two refresh triggers
// =============================================================================
//
//   1. Price poll: fixed interval, all tracked symbols. Refreshes latest prices,
//      provider stats and the sparkline window.
//   2. Chart refresh: woken on every selection change. Fetches candles for the
//      newest request and hands them to `AppState::apply_chart`, which drops
//      results superseded by a later request.
//
// Fetch failures are logged and recorded; the previous snapshot stays in place.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::app_state::{AppState, ChartRequest};
use crate::provider::ProviderClient;

/// Poll prices every `every`, starting immediately.
pub async fn run_price_poller(state: Arc<AppState>, client: ProviderClient, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        poll_prices_once(&state, &client).await;
    }
}

/// One poll tick. Returns `true` when fresh prices were recorded.
pub async fn poll_prices_once(state: &AppState, client: &ProviderClient) -> bool {
    let (prices, stats) = tokio::join!(client.get_prices(), client.get_stats());

    let prices = match prices {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "price poll failed: keeping previous snapshot");
            state.push_error("price_poll", format!("{e:#}"));
            return false;
        }
    };

    let stats = match stats {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(error = %e, "stats fetch failed: keeping previous stats");
            state.push_error("stats_poll", format!("{e:#}"));
            None
        }
    };

    debug!(count = prices.len(), "recording price tick");
    state.record_prices(prices, stats, Utc::now());
    true
}

/// Wait for selection changes and fetch the newest chart request each time.
/// Fetches run concurrently; stale ones are discarded on completion.
pub async fn run_chart_refresher(state: Arc<AppState>, client: ProviderClient) {
    loop {
        state.chart_refresh.notified().await;
        let request = state.pending_request();
        let state = state.clone();
        let client = client.clone();
        tokio::spawn(async move {
            fetch_chart(&state, &client, request).await;
        });
    }
}

/// Fetch and apply one chart request. Returns `true` when the chart was
/// replaced.
pub async fn fetch_chart(state: &AppState, client: &ProviderClient, request: ChartRequest) -> bool {
    match client.get_history(&request.selection).await {
        Ok(candles) => {
            let count = candles.len();
            let applied = state.apply_chart(&request, candles);
            if applied {
                info!(
                    selection = %request.selection,
                    generation = request.generation,
                    candles = count,
                    "chart refreshed"
                );
            }
            applied
        }
        Err(e) => {
            if state.pending_request().generation == request.generation {
                warn!(selection = %request.selection, error = %e, "chart fetch failed");
                state.push_error("chart_refresh", format!("{e:#}"));
            } else {
                debug!(selection = %request.selection, error = %e, "stale chart fetch failed");
            }
            false
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime_config::RuntimeConfig;
    use crate::types::{Period, Selection};
    use axum::{extract::Query, routing::get, Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    async fn history(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
        let ticker = q.get("ticker").cloned().unwrap_or_default();
        let base = if ticker == "TSLA" { 200.0 } else { 100.0 };
        let rows: Vec<Value> = (0..20)
            .map(|i| {
                let c = base + i as f64;
                json!({
                    "time": format!("2024-03-01 10:{i:02}"),
                    "price": c, "volume": 1000, "open": c, "high": c, "low": c, "close": c,
                    "interval": q.get("interval"),
                })
            })
            .collect();
        Json(Value::Array(rows))
    }

    /// Serve a fake provider on an ephemeral port and return its base URL.
    async fn spawn_provider() -> String {
        let app = Router::new()
            .route("/api/prices", get(|| async { Json(json!({ "AAPL": 123.45, "TSLA": 678.9 })) }))
            .route(
                "/api/stats",
                get(|| async { Json(json!({ "AAPL": { "high": 125.0, "low": 120.0 } })) }),
            )
            .route("/api/history", get(history));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// A base URL that refuses connections.
    async fn dead_provider() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}")
    }

    fn client(url: &str) -> ProviderClient {
        ProviderClient::new(url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn poll_records_prices_and_stats() {
        let url = spawn_provider().await;
        let state = AppState::new(RuntimeConfig::default());

        assert!(poll_prices_once(&state, &client(&url)).await);
        assert_eq!(state.prices.read()["AAPL"], 123.45);
        assert_eq!(state.provider_stats.read()["AAPL"].low, 120.0);
        assert_eq!(state.sparkline("TSLA").len(), 1);
    }

    #[tokio::test]
    async fn poll_failure_keeps_previous_snapshot() {
        let state = AppState::new(RuntimeConfig::default());
        let mut prices = std::collections::BTreeMap::new();
        prices.insert("AAPL".to_string(), 99.0);
        state.record_prices(prices, None, Utc::now());

        let url = dead_provider().await;
        assert!(!poll_prices_once(&state, &client(&url)).await);
        assert_eq!(state.prices.read()["AAPL"], 99.0);
        assert_eq!(state.sparkline("AAPL").len(), 1);
        assert_eq!(state.recent_errors.read()[0].source, "price_poll");
    }

    #[tokio::test]
    async fn chart_fetch_applies_current_request() {
        let url = spawn_provider().await;
        let state = AppState::new(RuntimeConfig::default());
        let request = state.refresh_chart();

        assert!(fetch_chart(&state, &client(&url), request).await);
        let chart = state.chart.read();
        let chart = chart.as_ref().unwrap();
        assert_eq!(chart.records.len(), 20);
        assert_eq!(chart.stats.high, Some(119.0));
        assert!(chart.records[14].rsi.is_some());
    }

    #[tokio::test]
    async fn superseded_fetch_is_ignored() {
        let url = spawn_provider().await;
        let state = AppState::new(RuntimeConfig::default());
        let old = state.refresh_chart();
        let new = state.select(Selection {
            symbol: "TSLA".into(),
            period: Period::FiveDays,
            ..Selection::default()
        });

        assert!(fetch_chart(&state, &client(&url), new).await);
        assert!(!fetch_chart(&state, &client(&url), old).await);

        let chart = state.chart.read();
        assert_eq!(chart.as_ref().unwrap().selection.symbol, "TSLA");
        assert_eq!(chart.as_ref().unwrap().stats.low, Some(200.0));
    }

    #[tokio::test]
    async fn chart_fetch_failure_is_recorded() {
        let url = dead_provider().await;
        let state = AppState::new(RuntimeConfig::default());
        let request = state.refresh_chart();

        assert!(!fetch_chart(&state, &client(&url), request).await);
        assert!(state.chart.read().is_none());
        assert_eq!(state.recent_errors.read()[0].source, "chart_refresh");
    }

    #[tokio::test]
    async fn refresher_picks_up_selection_changes() {
        let url = spawn_provider().await;
        let state = Arc::new(AppState::new(RuntimeConfig::default()));
        tokio::spawn(run_chart_refresher(state.clone(), client(&url)));

        state.select(Selection {
            symbol: "TSLA".into(),
            ..Selection::default()
        });

        for _ in 0..100 {
            if state.chart.read().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let chart = state.chart.read();
        assert_eq!(chart.as_ref().unwrap().selection.symbol, "TSLA");
    }
}
