//! [`PriceKeeper`]: the entry point the block lifecycle talks to.
//!
//! The keeper owns no state of its own. It holds shared handles to the
//! process-wide caches and a clock, and takes the SQLite connection (or an
//! open transaction) per call, so the caller decides the transaction scope.

use std::collections::BTreeMap;
use std::sync::Arc;

use meridian_cache::{CurrencyPairIdCache, IndexPriceCache};
use meridian_db::queries::{currency_pairs, exchange_feeds, markets};
use meridian_types::{ExchangeFeed, Market, MarketParams, MarketPriceUpdate, MarketPriceUpdates};
use rusqlite::Connection;

use crate::smoothed::{smooth, SmoothedPriceTracker};
use crate::time::TimeProvider;
use crate::validation::{self, ValidationError};
use crate::{proposal, store, OracleError, Result};

/// Facade over the price engine.
pub struct PriceKeeper {
    index_prices: Arc<IndexPriceCache>,
    smoothed_prices: Arc<SmoothedPriceTracker>,
    pair_ids: Arc<CurrencyPairIdCache>,
    time: Arc<dyn TimeProvider>,
    smoothing_ppm: u32,
}

impl PriceKeeper {
    pub fn new(
        index_prices: Arc<IndexPriceCache>,
        smoothed_prices: Arc<SmoothedPriceTracker>,
        pair_ids: Arc<CurrencyPairIdCache>,
        time: Arc<dyn TimeProvider>,
        smoothing_ppm: u32,
    ) -> Self {
        Self {
            index_prices,
            smoothed_prices,
            pair_ids,
            time,
            smoothing_ppm,
        }
    }

    pub fn index_price_cache(&self) -> &Arc<IndexPriceCache> {
        &self.index_prices
    }

    pub fn smoothed_prices(&self) -> &Arc<SmoothedPriceTracker> {
        &self.smoothed_prices
    }

    pub fn pair_ids(&self) -> &Arc<CurrencyPairIdCache> {
        &self.pair_ids
    }

    pub fn smoothing_ppm(&self) -> u32 {
        self.smoothing_ppm
    }

    // ---- exchange feeds ----

    pub fn create_exchange_feed(&self, conn: &Connection, name: &str, memo: &str) -> Result<ExchangeFeed> {
        store::create_exchange_feed(conn, name, memo)
    }

    pub fn get_exchange_feed(&self, conn: &Connection, id: u32) -> Result<ExchangeFeed> {
        exchange_feeds::get(conn, id)?.ok_or(OracleError::ExchangeFeedNotFound(id))
    }

    pub fn get_all_exchange_feeds(&self, conn: &Connection) -> Result<Vec<ExchangeFeed>> {
        Ok(exchange_feeds::all(conn)?)
    }

    // ---- markets ----

    /// Create a market and register its pair in the id cache.
    pub fn create_market(&self, conn: &mut Connection, params: &MarketParams, price: u64) -> Result<Market> {
        let market = store::create_market(conn, params, price)?;
        self.pair_ids.add(u64::from(market.id), &market.pair);
        Ok(market)
    }

    /// Modify a market; a pair rename replaces the cached mapping.
    pub fn modify_market(&self, conn: &mut Connection, id: u32, params: &MarketParams) -> Result<Market> {
        let market = store::modify_market(conn, id, params)?;
        self.pair_ids.add(u64::from(market.id), &market.pair);
        Ok(market)
    }

    pub fn get_market(&self, conn: &Connection, id: u32) -> Result<Market> {
        markets::get(conn, id)?.ok_or(OracleError::MarketNotFound(id))
    }

    pub fn get_all_markets(&self, conn: &Connection) -> Result<Vec<Market>> {
        store::all_markets(conn)
    }

    pub fn num_markets(&self, conn: &Connection) -> Result<u32> {
        Ok(markets::count(conn)?)
    }

    // ---- prices ----

    /// Median index prices for every market with a fresh quorum right now.
    pub fn index_prices(&self, conn: &Connection) -> Result<BTreeMap<u32, u64>> {
        let all = self.get_all_markets(conn)?;
        Ok(self
            .index_prices
            .get_valid_median_prices(&all, self.time.now()))
    }

    /// Push one smoothed sample for every market with a valid index price.
    ///
    /// Called exactly once per block, before proposal selection.
    pub fn update_smoothed_prices(&self, conn: &Connection) -> Result<()> {
        for (market_id, index_price) in self.index_prices(conn)? {
            let previous = self.smoothed_prices.latest(market_id).unwrap_or(index_price);
            let smoothed = smooth(previous, index_price, self.smoothing_ppm);
            self.smoothed_prices.push(market_id, smoothed);
            tracing::debug!(market_id, index_price, previous, smoothed, "smoothed price updated");
        }
        Ok(())
    }

    /// The updates a proposer should include, ascending by market id.
    pub fn get_valid_market_price_updates(&self, conn: &Connection) -> Result<MarketPriceUpdates> {
        let all = self.get_all_markets(conn)?;
        let index = self
            .index_prices
            .get_valid_median_prices(&all, self.time.now());
        Ok(proposal::select_price_updates(&all, &index, &self.smoothed_prices))
    }

    /// Basic and stateful validation of a proposed update list.
    ///
    /// Index prices are only read when the non-deterministic checks run.
    pub fn perform_stateful_validation(
        &self,
        conn: &Connection,
        updates: &MarketPriceUpdates,
        skip_non_deterministic: bool,
    ) -> std::result::Result<(), ValidationError> {
        updates.validate_basic()?;
        let index = if skip_non_deterministic {
            BTreeMap::new()
        } else {
            let all = markets::all(conn)?;
            self.index_prices
                .get_valid_median_prices(&all, self.time.now())
        };
        validation::perform_stateful_validation(conn, updates, &index, skip_non_deterministic)
    }

    /// Apply accepted updates atomically. Ids must be strictly ascending.
    pub fn update_market_prices(&self, conn: &mut Connection, updates: &MarketPriceUpdates) -> Result<()> {
        store::apply_updates(conn, updates.as_slice())
    }

    // ---- currency pairs ----

    /// Translate a pair-keyed price map into sorted market updates.
    ///
    /// # Errors
    ///
    /// [`OracleError::UnknownPair`] if a pair is not mapped to a market.
    pub fn price_updates_from_pair_prices(&self, prices: &BTreeMap<String, u64>) -> Result<MarketPriceUpdates> {
        let mut updates = Vec::with_capacity(prices.len());
        for (pair, price) in prices {
            let market_id = self
                .pair_ids
                .id_for_pair(pair)
                .and_then(|id| u32::try_from(id).ok())
                .ok_or_else(|| OracleError::UnknownPair(pair.clone()))?;
            updates.push(MarketPriceUpdate::new(market_id, *price));
        }
        Ok(MarketPriceUpdates::sorted(updates))
    }

    /// Load persisted pair mappings into the id cache. Returns how many
    /// were loaded.
    pub fn warm_pair_cache(&self, conn: &Connection) -> Result<usize> {
        let mappings = currency_pairs::all(conn)?;
        for (id, pair) in &mappings {
            self.pair_ids.add(*id, pair);
        }
        tracing::info!(pairs = mappings.len(), "currency pair cache warmed");
        Ok(mappings.len())
    }
}
