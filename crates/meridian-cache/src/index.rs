//! Index price cache.
//!
//! Holds the most recent observation per `(market, exchange)` as written by
//! the price-fetching side, and derives an index price per market as the
//! median of the fresh, nonzero observations when at least the market's
//! `min_exchanges` of them exist.

use std::collections::{BTreeMap, HashMap};

use meridian_types::{ExchangePrice, Market, MarketObservations, DEFAULT_MAX_PRICE_AGE_SECS};
use parking_lot::RwLock;

/// Latest exchange observations, keyed by market then exchange.
#[derive(Debug)]
pub struct IndexPriceCache {
    max_price_age_secs: u64,
    prices: RwLock<HashMap<u32, HashMap<u32, ExchangePrice>>>,
}

impl IndexPriceCache {
    /// Create an empty cache with the default maximum observation age.
    pub fn new() -> Self {
        Self::with_max_age(DEFAULT_MAX_PRICE_AGE_SECS)
    }

    /// Create an empty cache with a custom maximum observation age.
    pub fn with_max_age(max_price_age_secs: u64) -> Self {
        Self {
            max_price_age_secs,
            prices: RwLock::new(HashMap::new()),
        }
    }

    /// Record a batch of observations.
    ///
    /// An observation replaces the stored one for the same exchange only if
    /// it is strictly newer.
    pub fn update_prices(&self, updates: &[MarketObservations]) {
        let mut prices = self.prices.write();
        for update in updates {
            let market = prices.entry(update.market_id).or_default();
            for observation in &update.exchange_prices {
                match market.get(&observation.exchange_id) {
                    Some(existing) if existing.last_update_time >= observation.last_update_time => {}
                    _ => {
                        market.insert(observation.exchange_id, *observation);
                    }
                }
            }
        }
    }

    /// Median index price for every market with a quorum of fresh, nonzero
    /// observations at `now`.
    ///
    /// Markets without a quorum are omitted; a returned price is never zero.
    pub fn get_valid_median_prices(&self, markets: &[Market], now: u64) -> BTreeMap<u32, u64> {
        let prices = self.prices.read();
        let mut medians = BTreeMap::new();

        for market in markets {
            let Some(observations) = prices.get(&market.id) else {
                continue;
            };

            let mut valid: Vec<u64> = observations
                .values()
                .filter(|o| o.price != 0 && now.saturating_sub(o.last_update_time) <= self.max_price_age_secs)
                .map(|o| o.price)
                .collect();

            if valid.len() < market.min_exchanges as usize {
                continue;
            }
            if let Some(median) = median(&mut valid) {
                medians.insert(market.id, median);
            }
        }
        medians
    }

    /// Stored observations for a market, ordered by exchange id.
    pub fn exchange_prices(&self, market_id: u32) -> Vec<ExchangePrice> {
        let prices = self.prices.read();
        let mut out: Vec<ExchangePrice> = prices
            .get(&market_id)
            .map(|m| m.values().copied().collect())
            .unwrap_or_default();
        out.sort_by_key(|o| o.exchange_id);
        out
    }

    pub fn max_price_age_secs(&self) -> u64 {
        self.max_price_age_secs
    }
}

impl Default for IndexPriceCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Median of `values`, sorting them in place.
///
/// For an even count the result is the floor of the mean of the two middle
/// values, computed without overflow.
pub fn median(values: &mut [u64]) -> Option<u64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        return Some(values[mid]);
    }
    let (a, b) = (values[mid - 1], values[mid]);
    Some(a / 2 + b / 2 + (a % 2 + b % 2) / 2)
}
