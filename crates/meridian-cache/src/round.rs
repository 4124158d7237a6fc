//! Price updates memoised for a single consensus round.
//!
//! Computing the proposal price set is expensive, and several call paths in
//! the same round ask for it. The cache holds exactly one entry; a write for
//! a new `(height, round)` replaces it.

use meridian_types::MarketPriceUpdates;
use parking_lot::RwLock;

#[derive(Debug, Clone)]
struct RoundEntry {
    height: i64,
    round: i32,
    updates: MarketPriceUpdates,
}

/// Single-entry cache keyed by `(height, round)`.
#[derive(Debug, Default)]
pub struct RoundScopedPriceCache {
    entry: RwLock<Option<RoundEntry>>,
}

impl RoundScopedPriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `updates` as the valid set for `(height, round)`.
    pub fn set_price_updates(&self, height: i64, round: i32, updates: MarketPriceUpdates) {
        tracing::debug!(height, round, updates = updates.len(), "caching round price updates");
        *self.entry.write() = Some(RoundEntry {
            height,
            round,
            updates,
        });
    }

    /// `true` iff the last write was for exactly this `(height, round)`.
    pub fn has_valid_prices(&self, height: i64, round: i32) -> bool {
        self.entry
            .read()
            .as_ref()
            .is_some_and(|e| e.height == height && e.round == round)
    }

    /// The cached updates, regardless of which round wrote them.
    pub fn price_updates(&self) -> Option<MarketPriceUpdates> {
        self.entry.read().as_ref().map(|e| e.updates.clone())
    }

    /// The cached updates if they belong to `(height, round)`.
    ///
    /// Checks and reads under one lock acquisition.
    pub fn valid_price_updates(&self, height: i64, round: i32) -> Option<MarketPriceUpdates> {
        self.entry
            .read()
            .as_ref()
            .filter(|e| e.height == height && e.round == round)
            .map(|e| e.updates.clone())
    }
}
