//! Markets and the exchange feeds that price them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{Result, TypesError, ONE_MILLION};

/// Message used when `min_price_change_ppm` is out of range.
pub const ERR_INVALID_MIN_PRICE_CHANGE: &str =
    "min price change in parts-per-million must be greater than 0 and less than 1000000";

/// A price source referenced by markets and by index price observations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeFeed {
    /// Dense, sequential identifier.
    pub id: u32,
    /// Human readable exchange name.
    pub name: String,
    /// Free-form operator note.
    pub memo: String,
}

/// A market tracked by the oracle.
///
/// `id` and `exponent` never change once assigned. After the first accepted
/// price update `price` is never zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    /// Dense, sequential identifier.
    pub id: u32,
    /// Unique canonical pair string, e.g. `BTC-USD`.
    pub pair: String,
    /// Display exponent: `display = price * 10^exponent`.
    pub exponent: i32,
    /// Exchange feeds expected to price this market.
    pub exchanges: Vec<u32>,
    /// Quorum of distinct fresh sources required for an index price.
    pub min_exchanges: u32,
    /// Minimum relative price movement accepted, in ppm.
    pub min_price_change_ppm: u32,
    /// Current canonical on-chain price.
    pub price: u64,
}

impl Market {
    /// The governance-controlled parameters of this market.
    pub fn params(&self) -> MarketParams {
        MarketParams {
            pair: self.pair.clone(),
            exponent: self.exponent,
            exchanges: self.exchanges.clone(),
            min_exchanges: self.min_exchanges,
            min_price_change_ppm: self.min_price_change_ppm,
        }
    }
}

/// Parameters supplied when creating or modifying a market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketParams {
    pub pair: String,
    pub exponent: i32,
    pub exchanges: Vec<u32>,
    pub min_exchanges: u32,
    pub min_price_change_ppm: u32,
}

impl MarketParams {
    /// Stateless checks on the parameters.
    ///
    /// Exchange existence is a stateful check and is left to the caller.
    ///
    /// # Errors
    ///
    /// - [`TypesError::InvalidInput`] for an empty pair or an out of range
    ///   `min_price_change_ppm`
    /// - [`TypesError::ZeroMinExchanges`] if `min_exchanges` is zero
    /// - [`TypesError::DuplicateExchanges`] if an exchange id repeats
    /// - [`TypesError::TooFewExchanges`] if fewer exchanges than the quorum
    pub fn validate(&self) -> Result<()> {
        if self.pair.is_empty() {
            return Err(TypesError::InvalidInput("Pair cannot be empty".to_string()));
        }
        if self.min_price_change_ppm == 0 || u64::from(self.min_price_change_ppm) >= ONE_MILLION {
            return Err(TypesError::InvalidInput(
                ERR_INVALID_MIN_PRICE_CHANGE.to_string(),
            ));
        }
        if self.min_exchanges == 0 {
            return Err(TypesError::ZeroMinExchanges);
        }

        let mut seen = HashSet::with_capacity(self.exchanges.len());
        for id in &self.exchanges {
            if !seen.insert(*id) {
                return Err(TypesError::DuplicateExchanges(*id));
            }
        }

        if self.exchanges.len() < self.min_exchanges as usize {
            return Err(TypesError::TooFewExchanges {
                required: self.min_exchanges,
                available: self.exchanges.len(),
            });
        }
        Ok(())
    }
}
