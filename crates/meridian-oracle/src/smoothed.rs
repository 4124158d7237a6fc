//! Exponentially smoothed price tracking.
//!
//! Once per block, every market with a valid index price gets a new
//! smoothed sample:
//!
//! ```text
//! smoothed' = smoothed + (index - smoothed) * smoothing_ppm / 1_000_000
//! ```
//!
//! seeded with the index price itself the first time. The last
//! `capacity` samples are kept per market in a fixed-size ring so the
//! proposal logic can look at recent history, not just the latest value.

use std::collections::HashMap;

use meridian_types::{DEFAULT_SMOOTHED_HISTORY_LEN, ONE_MILLION};
use parking_lot::RwLock;

/// One smoothing step. `smoothing_ppm` is capped at one million.
///
/// The result always lies between `previous` and `index_price` inclusive;
/// the fractional part of the step is truncated toward `previous`.
pub fn smooth(previous: u64, index_price: u64, smoothing_ppm: u32) -> u64 {
    let ppm = i128::from(u64::from(smoothing_ppm).min(ONE_MILLION));
    let previous = i128::from(previous);
    let step = (i128::from(index_price) - previous) * ppm / i128::from(ONE_MILLION);
    (previous + step) as u64
}

/// Fixed-capacity circular buffer; zero marks an unwritten slot.
#[derive(Debug, Clone)]
struct PriceRing {
    slots: Vec<u64>,
    next: usize,
}

impl PriceRing {
    fn new(capacity: usize) -> Self {
        Self {
            slots: vec![0; capacity],
            next: 0,
        }
    }

    fn push(&mut self, price: u64) {
        self.slots[self.next] = price;
        self.next = (self.next + 1) % self.slots.len();
    }

    fn newest_first(&self) -> impl Iterator<Item = u64> + '_ {
        let len = self.slots.len();
        (1..=len).map(move |back| self.slots[(self.next + len - back) % len])
    }
}

/// Per-market smoothed price history.
///
/// Rings are created lazily on first push and live for the whole process.
#[derive(Debug)]
pub struct SmoothedPriceTracker {
    capacity: usize,
    rings: RwLock<HashMap<u32, PriceRing>>,
}

impl SmoothedPriceTracker {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SMOOTHED_HISTORY_LEN)
    }

    /// A tracker keeping `capacity` samples per market (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            rings: RwLock::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a sample, overwriting the oldest once the ring is full.
    pub fn push(&self, market_id: u32, price: u64) {
        self.rings
            .write()
            .entry(market_id)
            .or_insert_with(|| PriceRing::new(self.capacity))
            .push(price);
    }

    /// The most recent sample, or `None` if unset or zero.
    pub fn latest(&self, market_id: u32) -> Option<u64> {
        self.rings
            .read()
            .get(&market_id)
            .and_then(|ring| ring.newest_first().next())
            .filter(|price| *price != 0)
    }

    /// Up to `capacity` most recent nonzero samples, newest first.
    pub fn history(&self, market_id: u32) -> Vec<u64> {
        self.rings
            .read()
            .get(&market_id)
            .map(|ring| ring.newest_first().filter(|p| *p != 0).collect())
            .unwrap_or_default()
    }

    /// [`latest`](Self::latest) and [`history`](Self::history) read under
    /// one guard, so a concurrent push cannot land between them.
    pub fn snapshot(&self, market_id: u32) -> (Option<u64>, Vec<u64>) {
        let rings = self.rings.read();
        let Some(ring) = rings.get(&market_id) else {
            return (None, Vec::new());
        };
        let latest = ring.newest_first().next().filter(|price| *price != 0);
        (latest, ring.newest_first().filter(|p| *p != 0).collect())
    }
}

impl Default for SmoothedPriceTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_types::DEFAULT_SMOOTHING_PPM;

    #[test]
    fn test_smooth_upwards() {
        assert_eq!(
            smooth(9_000_000_000, 9_010_000_000, DEFAULT_SMOOTHING_PPM),
            9_003_000_000
        );
    }

    #[test]
    fn test_smooth_downwards_truncates_toward_previous() {
        // -7 * 0.3 = -2.1 -> -2
        assert_eq!(smooth(100, 93, DEFAULT_SMOOTHING_PPM), 98);
        // 7 * 0.3 = 2.1 -> 2
        assert_eq!(smooth(93, 100, DEFAULT_SMOOTHING_PPM), 95);
    }

    #[test]
    fn test_smooth_edges() {
        assert_eq!(smooth(500, 500, DEFAULT_SMOOTHING_PPM), 500);
        assert_eq!(smooth(500, 900, 0), 500);
        assert_eq!(smooth(500, 900, 1_000_000), 900);
        assert_eq!(smooth(500, 900, u32::MAX), 900);
        assert_eq!(smooth(0, u64::MAX, 1_000_000), u64::MAX);
        assert_eq!(smooth(u64::MAX, 1, DEFAULT_SMOOTHING_PPM), 12_912_720_851_596_686_131);
    }

    #[test]
    fn test_unset_market() {
        let tracker = SmoothedPriceTracker::new();
        assert_eq!(tracker.latest(0), None);
        assert!(tracker.history(0).is_empty());
    }

    #[test]
    fn test_latest_and_partial_history() {
        let tracker = SmoothedPriceTracker::new();
        tracker.push(0, 10);
        tracker.push(0, 11);
        assert_eq!(tracker.latest(0), Some(11));
        assert_eq!(tracker.history(0), vec![11, 10]);
    }

    #[test]
    fn test_ring_keeps_last_capacity_samples() {
        let tracker = SmoothedPriceTracker::with_capacity(5);
        for price in 1..=12 {
            tracker.push(3, price);
        }
        assert_eq!(tracker.history(3), vec![12, 11, 10, 9, 8]);
        assert_eq!(tracker.latest(3), Some(12));
    }

    #[test]
    fn test_zero_latest_reads_as_none() {
        let tracker = SmoothedPriceTracker::with_capacity(3);
        tracker.push(0, 10);
        tracker.push(0, 0);
        assert_eq!(tracker.latest(0), None);
        assert_eq!(tracker.history(0), vec![10]);
    }

    #[test]
    fn test_snapshot_matches_separate_reads() {
        let tracker = SmoothedPriceTracker::with_capacity(3);
        assert_eq!(tracker.snapshot(0), (None, Vec::new()));
        for price in [7, 8, 9, 10] {
            tracker.push(0, price);
            assert_eq!(tracker.snapshot(0), (tracker.latest(0), tracker.history(0)));
        }
        assert_eq!(tracker.snapshot(0), (Some(10), vec![10, 9, 8]));

        tracker.push(0, 0);
        assert_eq!(tracker.snapshot(0), (None, vec![10, 9]));
    }

    #[test]
    fn test_markets_are_independent() {
        let tracker = SmoothedPriceTracker::with_capacity(2);
        tracker.push(0, 1);
        tracker.push(1, 100);
        tracker.push(0, 2);
        tracker.push(0, 3);
        assert_eq!(tracker.history(0), vec![3, 2]);
        assert_eq!(tracker.history(1), vec![100]);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let tracker = SmoothedPriceTracker::with_capacity(0);
        assert_eq!(tracker.capacity(), 1);
        tracker.push(0, 4);
        tracker.push(0, 5);
        assert_eq!(tracker.history(0), vec![5]);
    }
}
