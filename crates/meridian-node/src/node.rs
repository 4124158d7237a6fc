//! Block lifecycle hooks.
//!
//! [`PriceNode`] owns the database connection and the process-wide caches
//! and exposes one method per consensus phase:
//!
//! 1. [`PriceNode::begin_block`] pushes this block's smoothed prices.
//! 2. [`PriceNode::prepare_proposal`] selects the updates to propose,
//!    memoised per `(height, round)`.
//! 3. [`PriceNode::process_proposal`] validates a received proposal,
//!    including the index-price checks.
//! 4. [`PriceNode::finalize_block`] re-validates deterministically and
//!    applies the updates.

use std::sync::Arc;

use anyhow::Context;
use meridian_cache::{CurrencyPairIdCache, IndexPriceCache, RoundScopedPriceCache};
use meridian_oracle::{PriceKeeper, SmoothedPriceTracker, SystemClock, TimeProvider, ValidationError};
use meridian_types::{
    ExchangeFeed, Market, MarketObservations, MarketParams, MarketPriceUpdates,
};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::config::{NodeConfig, OracleConfig};

/// A validator's price engine.
pub struct PriceNode {
    db: Mutex<Connection>,
    keeper: PriceKeeper,
    round_cache: RoundScopedPriceCache,
}

impl PriceNode {
    /// Open the node's database under the configured data directory.
    pub fn open(config: &NodeConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let data_dir = config.data_dir();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("creating data directory {}", data_dir.display()))?;
        let conn = meridian_db::open(&config.db_path())?;
        Self::with_connection(conn, &config.oracle, Arc::new(SystemClock))
    }

    /// Build a node around an already open connection.
    ///
    /// The currency pair cache is warmed from the persisted mappings.
    pub fn with_connection(
        conn: Connection,
        oracle: &OracleConfig,
        time: Arc<dyn TimeProvider>,
    ) -> anyhow::Result<Self> {
        let keeper = PriceKeeper::new(
            Arc::new(IndexPriceCache::with_max_age(oracle.max_price_age_secs)),
            Arc::new(SmoothedPriceTracker::with_capacity(oracle.smoothed_history_len)),
            Arc::new(CurrencyPairIdCache::new()),
            time,
            oracle.smoothing_ppm,
        );
        keeper.warm_pair_cache(&conn)?;
        let markets = keeper.num_markets(&conn)?;
        info!(markets, smoothing_ppm = oracle.smoothing_ppm, "price node ready");

        Ok(Self {
            db: Mutex::new(conn),
            keeper,
            round_cache: RoundScopedPriceCache::new(),
        })
    }

    pub fn keeper(&self) -> &PriceKeeper {
        &self.keeper
    }

    /// Exclusive access to the database connection.
    pub fn db(&self) -> MutexGuard<'_, Connection> {
        self.db.lock()
    }

    // ---- administration ----

    pub fn create_exchange_feed(&self, name: &str, memo: &str) -> meridian_oracle::Result<ExchangeFeed> {
        self.keeper.create_exchange_feed(&self.db(), name, memo)
    }

    pub fn create_market(&self, params: &MarketParams, price: u64) -> meridian_oracle::Result<Market> {
        self.keeper.create_market(&mut self.db(), params, price)
    }

    pub fn modify_market(&self, id: u32, params: &MarketParams) -> meridian_oracle::Result<Market> {
        self.keeper.modify_market(&mut self.db(), id, params)
    }

    pub fn get_market(&self, id: u32) -> meridian_oracle::Result<Market> {
        self.keeper.get_market(&self.db(), id)
    }

    pub fn get_all_markets(&self) -> meridian_oracle::Result<Vec<Market>> {
        self.keeper.get_all_markets(&self.db())
    }

    /// Record fresh exchange observations from the price-fetching side.
    pub fn update_index_prices(&self, observations: &[MarketObservations]) {
        self.keeper.index_price_cache().update_prices(observations);
    }

    // ---- block lifecycle ----

    /// Push one smoothed sample per market with a valid index price.
    pub fn begin_block(&self) -> meridian_oracle::Result<()> {
        self.keeper.update_smoothed_prices(&self.db())
    }

    /// The updates to propose at `(height, round)`.
    ///
    /// A repeated call for the same round returns the memoised set.
    pub fn prepare_proposal(&self, height: i64, round: i32) -> meridian_oracle::Result<MarketPriceUpdates> {
        if let Some(updates) = self.round_cache.valid_price_updates(height, round) {
            return Ok(updates);
        }
        let updates = self.keeper.get_valid_market_price_updates(&self.db())?;
        self.round_cache
            .set_price_updates(height, round, updates.clone());
        info!(height, round, updates = updates.len(), "prepared price updates");
        Ok(updates)
    }

    /// Validate a received proposal against state and the local index
    /// prices. An error means the proposal is rejected.
    pub fn process_proposal(&self, updates: &MarketPriceUpdates) -> Result<(), ValidationError> {
        let result = self
            .keeper
            .perform_stateful_validation(&self.db(), updates, false);
        if let Err(err) = &result {
            warn!(
                error = %err,
                deterministic = err.is_deterministic(),
                "rejecting proposed price updates"
            );
        }
        result
    }

    /// Apply a committed block's price updates.
    ///
    /// # Panics
    ///
    /// If the updates fail deterministic validation or cannot be applied.
    /// They were accepted at proposal time, so a failure here means the
    /// node has diverged and must halt.
    #[allow(clippy::panic)]
    pub fn finalize_block(&self, updates: &MarketPriceUpdates) {
        let mut conn = self.db();
        if let Err(err) = self.keeper.perform_stateful_validation(&conn, updates, true) {
            panic!("finalize_block: committed price updates failed validation: {err}");
        }
        if let Err(err) = self.keeper.update_market_prices(&mut conn, updates) {
            panic!("finalize_block: failed to apply committed price updates: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_oracle::ManualClock;
    use meridian_types::{ExchangePrice, MarketPriceUpdate};

    const NOW: u64 = 1_700_000_000;

    fn node() -> (PriceNode, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(NOW));
        let conn = meridian_db::open_memory().expect("open");
        let node = PriceNode::with_connection(conn, &OracleConfig::default(), clock.clone())
            .expect("node");
        node.create_exchange_feed("coinbase", "").expect("feed");
        node.create_market(
            &MarketParams {
                pair: "BTC-USD".to_string(),
                exponent: -5,
                exchanges: vec![0],
                min_exchanges: 1,
                min_price_change_ppm: 50,
            },
            5_000_000_000,
        )
        .expect("market");
        (node, clock)
    }

    fn observe(node: &PriceNode, price: u64) {
        node.update_index_prices(&[MarketObservations {
            market_id: 0,
            exchange_prices: vec![ExchangePrice {
                exchange_id: 0,
                price,
                last_update_time: NOW,
            }],
        }]);
    }

    #[test]
    fn test_full_block() {
        let (node, _clock) = node();
        observe(&node, 5_010_000_000);

        node.begin_block().expect("begin");
        let updates = node.prepare_proposal(1, 0).expect("prepare");
        assert_eq!(
            updates.as_slice(),
            &[MarketPriceUpdate::new(0, 5_010_000_000)]
        );
        node.process_proposal(&updates).expect("valid proposal");
        node.finalize_block(&updates);
        assert_eq!(node.get_market(0).expect("market").price, 5_010_000_000);
    }

    #[test]
    fn test_prepare_proposal_memoised_per_round() {
        let (node, _clock) = node();
        observe(&node, 5_010_000_000);
        node.begin_block().expect("begin");
        let first = node.prepare_proposal(1, 0).expect("prepare");

        // New observations do not change the set already chosen this round.
        node.update_index_prices(&[MarketObservations {
            market_id: 0,
            exchange_prices: vec![ExchangePrice {
                exchange_id: 0,
                price: 4_000_000_000,
                last_update_time: NOW + 1,
            }],
        }]);
        assert_eq!(node.prepare_proposal(1, 0).expect("again"), first);
        assert_ne!(node.prepare_proposal(1, 1).expect("next round"), first);
    }

    #[test]
    fn test_process_proposal_rejects_overshoot() {
        let (node, _clock) = node();
        observe(&node, 5_010_000_000);
        let updates = MarketPriceUpdates::new(vec![MarketPriceUpdate::new(0, 5_015_000_000)]);
        let err = node.process_proposal(&updates).expect_err("overshoot");
        assert!(!err.is_deterministic());
    }

    #[test]
    fn test_finalize_skips_index_price_checks() {
        let (node, clock) = node();
        clock.advance(3_600);
        let updates = MarketPriceUpdates::new(vec![MarketPriceUpdate::new(0, 5_015_000_000)]);
        node.finalize_block(&updates);
        assert_eq!(node.get_market(0).expect("market").price, 5_015_000_000);
    }

    #[test]
    #[should_panic(expected = "committed price updates failed validation")]
    fn test_finalize_panics_on_deterministic_failure() {
        let (node, _clock) = node();
        let updates = MarketPriceUpdates::new(vec![MarketPriceUpdate::new(0, 5_000_000_001)]);
        node.finalize_block(&updates);
    }

    #[test]
    fn test_open_creates_data_dir() {
        let dir = std::env::temp_dir().join(format!("meridian-node-test-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let mut config = NodeConfig::default();
        config.storage.data_dir = dir.to_string_lossy().into_owned();

        let node = PriceNode::open(&config).expect("open");
        assert!(config.db_path().exists());
        assert!(node.get_all_markets().expect("markets").is_empty());

        drop(node);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
