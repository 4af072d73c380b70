// =============================================================================
// Session Statistics: extremes, volume, last-step change, proximity note
// =============================================================================
//
// Recomputed from scratch for every new sequence. Works over any element type
// implementing `PricePoint`, so the same pass serves the candle chart and the
// live sparkline.
//
//   high / low        max / min price across all elements
//   total_volume      sum of volumes (missing volume counts as zero)
//   change            last - previous          (needs >= 2 elements)
//   change_percent    change / previous * 100  (needs >= 2 elements)
//   proximity_note    NEAR_HIGH if within 0.5% of high, else NEAR_LOW if
//                     within 0.5% of low, else NONE
// =============================================================================

use serde::Serialize;

use crate::market_data::PricePoint;
use crate::types::ProximityNote;

/// Relative distance from an extreme under which the latest price is
/// flagged as "near" it.
pub const NEAR_EXTREME_THRESHOLD: f64 = 0.005;

/// Placeholder rendered for any absent value.
pub const PLACEHOLDER: &str = "--";

/// Derived snapshot over one sequence. All fields are `None` when the input
/// was empty; `high` / `low` are also `None` when no price is a number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStats<T> {
    pub latest: Option<T>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub total_volume: Option<u64>,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
    pub proximity_note: ProximityNote,
}

impl<T> Default for SessionStats<T> {
    fn default() -> Self {
        Self {
            latest: None,
            high: None,
            low: None,
            total_volume: None,
            change: None,
            change_percent: None,
            proximity_note: ProximityNote::None,
        }
    }
}

impl<T: PricePoint + Clone> SessionStats<T> {
    /// Compute the snapshot for `items` (assumed oldest-first).
    pub fn compute(items: &[T]) -> Self {
        let Some(latest) = items.last() else {
            return Self::default();
        };

        let extremes = extremes(items.iter().map(PricePoint::price));
        let total_volume = items
            .iter()
            .map(|item| item.volume().unwrap_or(0))
            .fold(0_u64, u64::saturating_add);

        let (change, change_percent) = match items {
            [.., prev, curr] => last_step_change(prev.price(), curr.price()),
            _ => (None, None),
        };

        Self {
            latest: Some(latest.clone()),
            high: extremes.map(|(hi, _)| hi),
            low: extremes.map(|(_, lo)| lo),
            total_volume: Some(total_volume),
            change,
            change_percent,
            proximity_note: extremes
                .map(|(hi, lo)| proximity_note(latest.price(), hi, lo))
                .unwrap_or_default(),
        }
    }
}

impl<T> SessionStats<T> {
    /// Volume rendered through [`format_volume`], or the placeholder.
    pub fn formatted_volume(&self) -> String {
        self.total_volume
            .map(format_volume)
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    }
}

/// Classify `latest` against the session extremes. The high check runs first,
/// so a price within range of both is reported as `NearHigh`. Zero extremes
/// never match.
pub fn proximity_note(latest: f64, high: f64, low: f64) -> ProximityNote {
    if high != 0.0 && ((high - latest) / high).abs() < NEAR_EXTREME_THRESHOLD {
        ProximityNote::NearHigh
    } else if low != 0.0 && ((latest - low) / low).abs() < NEAR_EXTREME_THRESHOLD {
        ProximityNote::NearLow
    } else {
        ProximityNote::None
    }
}

/// Magnitude-classed volume: `2.5M`, `1.5K`, or the plain integer.
pub fn format_volume(volume: u64) -> String {
    if volume >= 1_000_000 {
        format!("{:.1}M", volume as f64 / 1_000_000.0)
    } else if volume >= 1_000 {
        format!("{:.1}K", volume as f64 / 1_000.0)
    } else {
        volume.to_string()
    }
}

// =============================================================================
// Internal helpers
// =============================================================================

/// `(high, low)` over the non-NaN prices, `None` when there are none.
fn extremes(prices: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    prices
        .filter(|p| !p.is_nan())
        .fold(None, |acc, p| match acc {
            None => Some((p, p)),
            Some((hi, lo)) => Some((f64::max(hi, p), f64::min(lo, p))),
        })
}

fn last_step_change(prev: f64, curr: f64) -> (Option<f64>, Option<f64>) {
    let change = curr - prev;
    let pct = if prev == 0.0 {
        None
    } else {
        Some(change / prev * 100.0)
    };
    (Some(change), pct)
}
