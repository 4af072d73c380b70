// =============================================================================
// Analytics Module
// =============================================================================
//
// Stateless transforms from a fetched sequence to presentation-ready values:
// the RSI-annotated candle records and the session statistics snapshot.

pub mod chart;
pub mod session_stats;

pub use chart::{CandleRecord, ChartView};
pub use session_stats::{SessionStats, PLACEHOLDER};
