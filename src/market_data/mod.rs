pub mod candle;
pub mod history_window;

// Re-export the core types for convenient access (e.g. `use crate::market_data::Candle`).
pub use candle::{date_range, Candle, PointSample, PricePoint};
pub use history_window::{HistoryWindow, DEFAULT_HISTORY_CAPACITY};
