// =============================================================================
// Market Data Provider Client: plain JSON over HTTP
// =============================================================================
//
// Endpoints:
//   GET /api/prices                               {"AAPL": 189.3, ...}
//   GET /api/stats                                {"AAPL": {"high": .., "low": ..}}
//   GET /api/history?ticker=&period=&interval=    [ {time, price, volume,
//                                                    open, high, low, close} ]
//
// Every call returns `anyhow::Result`; callers log and keep their previous
// snapshot on failure.
// =============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::market_data::Candle;
use crate::types::Selection;

/// Provider-side session extremes for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickerStats {
    pub high: f64,
    pub low: f64,
}

#[derive(Clone)]
pub struct ProviderClient {
    base_url: String,
    client: reqwest::Client,
}

impl ProviderClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client")?;

        debug!(base_url = %base_url, "ProviderClient initialised");

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -------------------------------------------------------------------------
    // Endpoints
    // -------------------------------------------------------------------------

    /// GET /api/prices
    #[instrument(skip(self), name = "provider::get_prices")]
    pub async fn get_prices(&self) -> Result<BTreeMap<String, f64>> {
        let body = self.get_json("/api/prices", &[]).await?;
        let prices = parse_prices(&body)?;
        debug!(count = prices.len(), "prices fetched");
        Ok(prices)
    }

    /// GET /api/stats
    #[instrument(skip(self), name = "provider::get_stats")]
    pub async fn get_stats(&self) -> Result<BTreeMap<String, TickerStats>> {
        let body = self.get_json("/api/stats", &[]).await?;
        serde_json::from_value(body).context("failed to decode stats response")
    }

    /// GET /api/history for the given selection (interval already resolved).
    #[instrument(skip(self, selection), fields(selection = %selection), name = "provider::get_history")]
    pub async fn get_history(&self, selection: &Selection) -> Result<Vec<Candle>> {
        let query = [
            ("ticker", selection.symbol.as_str()),
            ("period", selection.period.code()),
            ("interval", selection.effective_interval().code()),
        ];
        let body = self.get_json("/api/history", &query).await?;
        let candles = parse_history(&body)?;
        debug!(count = candles.len(), "history fetched");
        Ok(candles)
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, path);

        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {path} request failed"))?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .with_context(|| format!("failed to parse {path} response"))?;

        if !status.is_success() {
            anyhow::bail!("provider GET {} returned {}: {}", path, status, body);
        }

        Ok(body)
    }
}

// =============================================================================
// Response parsing
// =============================================================================

/// Decode the `{symbol: price}` map. Entries whose value is not a number are
/// skipped with a warning.
pub fn parse_prices(body: &serde_json::Value) -> Result<BTreeMap<String, f64>> {
    let obj = body.as_object().context("prices response is not an object")?;

    let mut prices = BTreeMap::new();
    for (symbol, value) in obj {
        match value.as_f64() {
            Some(p) => {
                prices.insert(symbol.clone(), p);
            }
            None => warn!(symbol = %symbol, value = %value, "skipping non-numeric price"),
        }
    }
    Ok(prices)
}

/// Decode the history array. Rows whose close is absent or non-numeric are
/// dropped, as the provider itself does.
pub fn parse_history(body: &serde_json::Value) -> Result<Vec<Candle>> {
    if let Some(err) = body.get("error").and_then(|e| e.as_str()) {
        anyhow::bail!("provider reported history error: {err}");
    }

    let raw = body.as_array().context("history response is not an array")?;

    let mut candles = Vec::with_capacity(raw.len());
    for (i, entry) in raw.iter().enumerate() {
        let candle: Candle = serde_json::from_value(entry.clone())
            .with_context(|| format!("malformed history row {i}"))?;
        if !candle.close.is_finite() {
            warn!(row = i, time = %candle.timestamp, "skipping history row without close");
            continue;
        }
        candles.push(candle);
    }
    Ok(candles)
}
