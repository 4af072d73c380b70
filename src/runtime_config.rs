// =============================================================================
// Runtime Configuration: JSON settings with atomic save
// =============================================================================
//
// Every tunable parameter of the dashboard engine lives here. All fields carry
// `#[serde(default)]` so that adding new fields never breaks loading an older
// config file. Persistence uses an atomic tmp + rename write.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::indicators::DEFAULT_RSI_PERIOD;
use crate::market_data::DEFAULT_HISTORY_CAPACITY;
use crate::types::Selection;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbols() -> Vec<String> {
    vec!["AAPL".to_string(), "TSLA".to_string(), "AMZN".to_string()]
}

fn default_provider_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_rsi_period() -> usize {
    DEFAULT_RSI_PERIOD
}

fn default_request_timeout_secs() -> u64 {
    10
}

// =============================================================================
// RuntimeConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Symbols polled for live prices and offered for charting.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    /// Base URL of the market data provider (prices / stats / history).
    #[serde(default = "default_provider_base_url")]
    pub provider_base_url: String,

    /// Seconds between live price polls.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Point samples retained per symbol for the sparkline.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// RSI look-back.
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,

    /// HTTP timeout for provider requests.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Chart selection restored on startup.
    #[serde(default)]
    pub selection: Selection,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            provider_base_url: default_provider_base_url(),
            poll_interval_secs: default_poll_interval_secs(),
            history_capacity: default_history_capacity(),
            rsi_period: default_rsi_period(),
            request_timeout_secs: default_request_timeout_secs(),
            selection: Selection::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbols = ?config.symbols,
            selection = %config.selection,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the configuration to `path` (write `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }

    /// Apply `PULSE_*` environment overrides on top of the loaded file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(syms) = std::env::var("PULSE_SYMBOLS") {
            self.symbols = parse_symbol_list(&syms);
        }
        if let Ok(url) = std::env::var("PULSE_PROVIDER_URL") {
            if !url.trim().is_empty() {
                self.provider_base_url = url.trim().trim_end_matches('/').to_string();
            }
        }
        if self.symbols.is_empty() {
            self.symbols = default_symbols();
        }
    }

    /// Make sure the restored selection points at a tracked symbol.
    pub fn normalise_selection(&mut self) {
        if !self.symbols.contains(&self.selection.symbol) {
            if let Some(first) = self.symbols.first() {
                self.selection.symbol = first.clone();
            }
        }
    }
}

/// Split a comma-separated symbol list, upper-casing and dropping blanks.
pub fn parse_symbol_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}
