//! Stateful validation of proposed market price updates.
//!
//! Deterministic checks (market exists, minimum change) depend only on
//! committed state and always run. Non-deterministic checks depend on the
//! node-local index price and only run at proposal time; at final commit
//! they are skipped, since validators with different index price views
//! would otherwise disagree on an already accepted block.
//!
//! Non-deterministic checks, in order:
//!
//! 1. An index price must be available.
//! 2. The update must not move away from the index price. Moving away is
//!    exactly the case where the old price lies strictly between the index
//!    price and the new price ("crossing the old price").
//! 3. If the update moves past the index price, the overshoot is bounded:
//!    when the old price was more than one tick from the index price the new
//!    distance in ticks may be at most the square root of the old distance,
//!    otherwise it may be at most one tick.

use std::collections::BTreeMap;

use meridian_db::{queries::markets, DbError};
use meridian_types::{Market, MarketPriceUpdate, MarketPriceUpdates, TypesError};
use num_bigint::BigUint;
use rusqlite::Connection;

use crate::tick::{
    compute_tick_size_ppm, is_above_required_min_price_change, is_crossing_index_price,
    is_crossing_old_price, maximum_allowed_price_delta, min_price_change_amount,
    new_price_meets_sqrt_condition, price_delta_is_within_one_tick, to_u64, PriceTuple,
};

/// Rule violations that every node evaluates identically.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeterministicViolation {
    #[error("market param price ({market_id}) does not exist")]
    MarketNotFound { market_id: u32 },

    #[error(
        "update price ({price}) for market ({market_id}) does not meet min price change requirement ({min_price_change_ppm} ppm) based on the current market price ({old_price})"
    )]
    BelowMinPriceChange {
        market_id: u32,
        price: u64,
        min_price_change_ppm: u32,
        old_price: u64,
    },
}

/// Rule violations that depend on the node-local index price.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NonDeterministicViolation {
    #[error("index price for market ({market_id}) is not available")]
    IndexPriceUnavailable { market_id: u32 },

    #[error(
        "update price ({price}) for market ({market_id}) crosses old price ({old_price}) with index price ({index_price})"
    )]
    CrossesOldPrice {
        market_id: u32,
        price: u64,
        old_price: u64,
        index_price: u64,
    },

    #[error(
        "update price ({price}) for market ({market_id}) crosses index price ({index_price}) and deviates more than minimum allowed ({max_allowed_delta})"
    )]
    DeviatesMoreThanAllowed {
        market_id: u32,
        price: u64,
        index_price: u64,
        max_allowed_delta: u64,
    },

    #[error(
        "update price ({price}) for market ({market_id}) crosses index price ({index_price}) by more than one tick ({tick})"
    )]
    ExceedsOneTick {
        market_id: u32,
        price: u64,
        index_price: u64,
        tick: u64,
    },
}

/// Why a set of price updates was rejected.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// The update list itself is malformed.
    #[error("malformed market price updates: {0}")]
    Malformed(#[from] TypesError),

    #[error("invalid market price update (deterministic): {0}")]
    Deterministic(DeterministicViolation),

    #[error("invalid market price update (non-deterministic): {0}")]
    NonDeterministic(NonDeterministicViolation),

    #[error("database error: {0}")]
    Db(#[from] DbError),
}

impl ValidationError {
    /// Whether every node would reach this same rejection.
    pub fn is_deterministic(&self) -> bool {
        matches!(self, Self::Malformed(_) | Self::Deterministic(_))
    }
}

impl From<DeterministicViolation> for ValidationError {
    fn from(v: DeterministicViolation) -> Self {
        Self::Deterministic(v)
    }
}

impl From<NonDeterministicViolation> for ValidationError {
    fn from(v: NonDeterministicViolation) -> Self {
        Self::NonDeterministic(v)
    }
}

/// Validate one update against its market.
///
/// Pure: the outcome depends only on the arguments. `index_price` is
/// ignored when `skip_non_deterministic` is set.
pub fn validate_price_update(
    market: &Market,
    new_price: u64,
    index_price: Option<u64>,
    skip_non_deterministic: bool,
) -> Result<(), ValidationError> {
    if !is_above_required_min_price_change(market, new_price) {
        return Err(DeterministicViolation::BelowMinPriceChange {
            market_id: market.id,
            price: new_price,
            min_price_change_ppm: market.min_price_change_ppm,
            old_price: market.price,
        }
        .into());
    }

    if skip_non_deterministic {
        return Ok(());
    }

    let index_price = index_price.ok_or(NonDeterministicViolation::IndexPriceUnavailable {
        market_id: market.id,
    })?;
    check_index_price_rules(market, new_price, index_price)?;
    Ok(())
}

fn check_index_price_rules(
    market: &Market,
    new_price: u64,
    index_price: u64,
) -> Result<(), NonDeterministicViolation> {
    let prices = PriceTuple {
        old_price: market.price,
        index_price,
        new_price,
    };

    if is_crossing_old_price(prices) {
        return Err(NonDeterministicViolation::CrossesOldPrice {
            market_id: market.id,
            price: new_price,
            old_price: market.price,
            index_price,
        });
    }

    if !is_crossing_index_price(prices) {
        return Ok(());
    }

    let tick_size_ppm = compute_tick_size_ppm(market.price, market.min_price_change_ppm);
    let old_delta = BigUint::from(market.price.abs_diff(index_price));
    let new_delta = BigUint::from(new_price.abs_diff(index_price));

    if price_delta_is_within_one_tick(&old_delta, &tick_size_ppm) {
        if !price_delta_is_within_one_tick(&new_delta, &tick_size_ppm) {
            return Err(NonDeterministicViolation::ExceedsOneTick {
                market_id: market.id,
                price: new_price,
                index_price,
                tick: min_price_change_amount(market.price, market.min_price_change_ppm),
            });
        }
    } else if !new_price_meets_sqrt_condition(&old_delta, &new_delta, &tick_size_ppm) {
        let max_allowed = maximum_allowed_price_delta(&old_delta, &tick_size_ppm);
        return Err(NonDeterministicViolation::DeviatesMoreThanAllowed {
            market_id: market.id,
            price: new_price,
            index_price,
            max_allowed_delta: to_u64(&max_allowed, "maximum allowed price delta"),
        });
    }
    Ok(())
}

/// Validate every update against committed state and, unless skipped, the
/// supplied index prices.
///
/// Stops at the first failing update.
pub fn perform_stateful_validation(
    conn: &Connection,
    updates: &MarketPriceUpdates,
    index_prices: &BTreeMap<u32, u64>,
    skip_non_deterministic: bool,
) -> Result<(), ValidationError> {
    for MarketPriceUpdate { market_id, price } in updates {
        let market = markets::get(conn, *market_id)?.ok_or(DeterministicViolation::MarketNotFound {
            market_id: *market_id,
        })?;

        if let Err(err) = validate_price_update(
            &market,
            *price,
            index_prices.get(market_id).copied(),
            skip_non_deterministic,
        ) {
            tracing::info!(
                market_id,
                price,
                old_price = market.price,
                skip_non_deterministic,
                error = %err,
                "price update rejected"
            );
            return Err(err);
        }
    }
    Ok(())
}
