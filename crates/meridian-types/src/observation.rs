//! Raw exchange observations as written by the price-fetching side.

use serde::{Deserialize, Serialize};

/// The latest price one exchange reported for one market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangePrice {
    pub exchange_id: u32,
    pub price: u64,
    /// Unix seconds at which the exchange reported `price`.
    pub last_update_time: u64,
}

/// A batch of observations for a single market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketObservations {
    pub market_id: u32,
    pub exchange_prices: Vec<ExchangePrice>,
}
