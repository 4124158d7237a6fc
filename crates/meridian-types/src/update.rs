//! Market price updates as proposed in a block.

use serde::{Deserialize, Serialize};

use crate::{Result, TypesError};

/// A proposed new canonical price for one market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarketPriceUpdate {
    pub market_id: u32,
    pub price: u64,
}

impl MarketPriceUpdate {
    pub fn new(market_id: u32, price: u64) -> Self {
        Self { market_id, price }
    }
}

/// An ordered set of market price updates.
///
/// Every consumer relies on ascending `market_id` order, so values built
/// through [`MarketPriceUpdates::sorted`] are always in canonical order.
/// Values received from elsewhere must pass
/// [`validate_basic`](MarketPriceUpdates::validate_basic).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketPriceUpdates(Vec<MarketPriceUpdate>);

impl MarketPriceUpdates {
    /// Wrap updates exactly as received.
    pub fn new(updates: Vec<MarketPriceUpdate>) -> Self {
        Self(updates)
    }

    /// Wrap updates after sorting them by market id.
    pub fn sorted(mut updates: Vec<MarketPriceUpdate>) -> Self {
        updates.sort_by_key(|u| u.market_id);
        Self(updates)
    }

    /// Stateless checks: nonzero prices and strictly ascending ids.
    ///
    /// # Errors
    ///
    /// - [`TypesError::ZeroPrice`] if any price is zero
    /// - [`TypesError::UnsortedUpdates`] if ids are out of order or repeat
    pub fn validate_basic(&self) -> Result<()> {
        for update in &self.0 {
            if update.price == 0 {
                return Err(TypesError::ZeroPrice {
                    market_id: update.market_id,
                });
            }
        }
        for pair in self.0.windows(2) {
            if pair[1].market_id <= pair[0].market_id {
                return Err(TypesError::UnsortedUpdates {
                    previous: pair[0].market_id,
                    next: pair[1].market_id,
                });
            }
        }
        Ok(())
    }

    pub fn as_slice(&self) -> &[MarketPriceUpdate] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MarketPriceUpdate> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<MarketPriceUpdate> {
        self.0
    }
}

impl<'a> IntoIterator for &'a MarketPriceUpdates {
    type Item = &'a MarketPriceUpdate;
    type IntoIter = std::slice::Iter<'a, MarketPriceUpdate>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
