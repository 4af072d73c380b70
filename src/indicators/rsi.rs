// =============================================================================
// Relative Strength Index (RSI): Wilder's Smoothing, index-aligned
// =============================================================================
//
// Step 1: Deltas from consecutive closes: delta_i = close_i - close_{i-1}.
// Step 2: Warm-up (1 <= i < period): sum gains and loss magnitudes.
// Step 3: i == period: seed averages with sum / period.
// Step 4: i > period: Wilder's smoothing
//            avg_gain = (prev_avg_gain * (period - 1) + gain_i) / period
//            avg_loss = (prev_avg_loss * (period - 1) + loss_i) / period
// Step 5: RS = avg_gain / avg_loss,  RSI = 100 - 100 / (1 + RS)
//
// Zero average loss is replaced by 1.0 when forming RS (the running average
// itself stays at zero). An all-gain run therefore reports
// 100 - 100 / (1 + avg_gain), not a flat 100.
//
// Output is aligned with the input: one slot per close, `None` until warm-up
// completes.
// =============================================================================

/// Default look-back used by the chart pipeline.
pub const DEFAULT_RSI_PERIOD: usize = 14;

/// Compute the index-aligned RSI series for `closes`.
///
/// # Edge cases
/// - fewer than 2 closes => all `None`
/// - `period == 0` => all `None`
/// - `period >= closes.len()` => all `None`
/// - A non-finite delta (NaN close on either side) yields `Some(NaN)` at that
///   index once past warm-up and is left out of the running averages.
pub fn compute_rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() < 2 {
        return out;
    }

    let period_f = period as f64;
    let mut sum_gain = 0.0_f64;
    let mut sum_loss = 0.0_f64;
    let mut avg_gain = 0.0_f64;
    let mut avg_loss = 0.0_f64;

    for i in 1..closes.len() {
        let delta = closes[i] - closes[i - 1];
        let finite = delta.is_finite();
        let gain = if delta > 0.0 { delta } else { 0.0 };
        let loss = if delta < 0.0 { -delta } else { 0.0 };

        if i < period {
            if finite {
                sum_gain += gain;
                sum_loss += loss;
            }
            continue;
        }

        if i == period {
            if finite {
                sum_gain += gain;
                sum_loss += loss;
            }
            avg_gain = sum_gain / period_f;
            avg_loss = sum_loss / period_f;
        } else if finite {
            avg_gain = (avg_gain * (period_f - 1.0) + gain) / period_f;
            avg_loss = (avg_loss * (period_f - 1.0) + loss) / period_f;
        }

        out[i] = Some(if finite {
            rsi_from_averages(avg_gain, avg_loss)
        } else {
            f64::NAN
        });
    }

    out
}

/// OVERBOUGHT at or above 70, OVERSOLD at or below 30.
pub fn zone_label(value: f64) -> &'static str {
    if value >= 70.0 {
        "OVERBOUGHT"
    } else if value <= 30.0 {
        "OVERSOLD"
    } else {
        "NEUTRAL"
    }
}

// =============================================================================
// Internal helpers
// =============================================================================

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    let denom = if avg_loss == 0.0 { 1.0 } else { avg_loss };
    let rs = avg_gain / denom;
    100.0 - 100.0 / (1.0 + rs)
}
