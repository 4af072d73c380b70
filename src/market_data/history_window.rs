use std::collections::HashMap;

use super::candle::PointSample;

/// Default number of live samples retained per symbol.
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

// ---------------------------------------------------------------------------
// SampleRing -- fixed-capacity FIFO for one symbol
// ---------------------------------------------------------------------------

/// Bounded queue over a slot arena. Slots fill up to `capacity`; after that
/// every push overwrites the oldest slot and advances `head`.
#[derive(Debug, Clone)]
struct SampleRing {
    slots: Vec<PointSample>,
    /// Index of the oldest sample once the arena is full.
    head: usize,
    capacity: usize,
}

impl SampleRing {
    fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            head: 0,
            capacity,
        }
    }

    fn push(&mut self, sample: PointSample) {
        if self.capacity == 0 {
            return;
        }
        if self.slots.len() < self.capacity {
            self.slots.push(sample);
        } else {
            self.slots[self.head] = sample;
            self.head = (self.head + 1) % self.capacity;
        }
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    /// Oldest-first iteration.
    fn iter(&self) -> impl Iterator<Item = &PointSample> {
        let (newer, older) = self.slots.split_at(self.head);
        older.iter().chain(newer.iter())
    }
}

// ---------------------------------------------------------------------------
// HistoryWindow -- sliding window of live samples per symbol
// ---------------------------------------------------------------------------

/// Keeps the most recent `capacity` point samples for every symbol that has
/// been appended to. Appends never fail and never validate ordering.
#[derive(Debug, Clone)]
pub struct HistoryWindow {
    rings: HashMap<String, SampleRing>,
    capacity: usize,
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            rings: HashMap::new(),
            capacity,
        }
    }

    /// Append `sample` to the end of `symbol`'s window, evicting the oldest
    /// sample once the window is full.
    pub fn append(&mut self, symbol: &str, sample: PointSample) {
        let capacity = self.capacity;
        self.rings
            .entry(symbol.to_string())
            .or_insert_with(|| SampleRing::new(capacity))
            .push(sample);
    }

    /// Current window for `symbol`, oldest first. Unknown symbols yield an
    /// empty vec.
    pub fn get(&self, symbol: &str) -> Vec<PointSample> {
        self.rings
            .get(symbol)
            .map(|ring| ring.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, symbol: &str) -> usize {
        self.rings.get(symbol).map_or(0, SampleRing::len)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Symbols with at least one recorded sample, sorted.
    pub fn symbols(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .rings
            .iter()
            .filter(|(_, ring)| ring.len() > 0)
            .map(|(sym, _)| sym.clone())
            .collect();
        out.sort();
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn sample(i: i64) -> PointSample {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap();
        PointSample::new(base + Duration::minutes(i), 100.0 + i as f64)
    }

    fn prices(samples: &[PointSample]) -> Vec<f64> {
        samples.iter().map(|s| s.price).collect()
    }

    #[test]
    fn unknown_symbol_is_empty() {
        let window = HistoryWindow::default();
        assert!(window.get("AAPL").is_empty());
        assert_eq!(window.len("AAPL"), 0);
    }

    #[test]
    fn keeps_last_twenty_of_twenty_five() {
        let mut window = HistoryWindow::new(20);
        for i in 0..25 {
            window.append("AAPL", sample(i));
        }
        let got = window.get("AAPL");
        assert_eq!(got.len(), 20);
        let expected: Vec<f64> = (5..25).map(|i| 100.0 + i as f64).collect();
        assert_eq!(prices(&got), expected);
    }

    #[test]
    fn below_capacity_keeps_everything_in_order() {
        let mut window = HistoryWindow::new(5);
        for i in 0..3 {
            window.append("TSLA", sample(i));
        }
        assert_eq!(prices(&window.get("TSLA")), vec![100.0, 101.0, 102.0]);
    }

    #[test]
    fn wraps_repeatedly() {
        let mut window = HistoryWindow::new(3);
        for i in 0..11 {
            window.append("AMZN", sample(i));
            assert!(window.len("AMZN") <= 3);
        }
        assert_eq!(prices(&window.get("AMZN")), vec![108.0, 109.0, 110.0]);
    }

    #[test]
    fn symbols_are_independent() {
        let mut window = HistoryWindow::new(2);
        window.append("AAPL", sample(0));
        window.append("TSLA", sample(1));
        window.append("TSLA", sample(2));
        window.append("TSLA", sample(3));

        assert_eq!(prices(&window.get("AAPL")), vec![100.0]);
        assert_eq!(prices(&window.get("TSLA")), vec![102.0, 103.0]);
        assert_eq!(window.symbols(), vec!["AAPL".to_string(), "TSLA".to_string()]);
    }

    #[test]
    fn out_of_order_samples_are_accepted() {
        let mut window = HistoryWindow::new(4);
        window.append("AAPL", sample(5));
        window.append("AAPL", sample(1));
        assert_eq!(prices(&window.get("AAPL")), vec![105.0, 101.0]);
    }

    #[test]
    fn zero_capacity_holds_nothing() {
        let mut window = HistoryWindow::new(0);
        window.append("AAPL", sample(0));
        assert!(window.get("AAPL").is_empty());
        assert!(window.symbols().is_empty());
    }
}
