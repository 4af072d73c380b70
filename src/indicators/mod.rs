// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free indicator implementations. Series are index-aligned
// with their input and use `Option` for slots that cannot be computed yet.

pub mod rsi;

pub use rsi::{compute_rsi, DEFAULT_RSI_PERIOD};
