//! Price movement math shared by proposal selection and validation.
//!
//! A *tick* is the minimum price movement a market accepts:
//!
//! ```text
//! tick = old_price * min_price_change_ppm / 1_000_000
//! ```
//!
//! To stay in integers the tick is carried scaled by one million
//! (`tick_size_ppm = old_price * min_price_change_ppm`) and every comparison
//! multiplies the other side by one million instead. Products of two
//! `u64`-range values are formed in [`BigUint`] so that no input can
//! overflow.

use meridian_types::{Market, ONE_MILLION};
use num_bigint::BigUint;

/// The three prices involved in judging an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceTuple {
    /// Current on-chain price.
    pub old_price: u64,
    /// Aggregated reference price.
    pub index_price: u64,
    /// Proposed price.
    pub new_price: u64,
}

/// `floor(old_price * min_price_change_ppm / 1_000_000)`.
///
/// # Panics
///
/// If the amount does not fit in a `u64`, which only happens when
/// `min_price_change_ppm` exceeds one million (a misconfigured market).
#[allow(clippy::panic)]
pub fn min_price_change_amount(old_price: u64, min_price_change_ppm: u32) -> u64 {
    let amount = u128::from(old_price) * u128::from(min_price_change_ppm) / u128::from(ONE_MILLION);
    match u64::try_from(amount) {
        Ok(amount) => amount,
        Err(_) => panic!(
            "min_price_change_amount: min price change amount is greater than max uint64 value"
        ),
    }
}

/// Whether moving `market` to `new_price` meets its minimum change.
pub fn is_above_required_min_price_change(market: &Market, new_price: u64) -> bool {
    market.price.abs_diff(new_price) >= min_price_change_amount(market.price, market.min_price_change_ppm)
}

/// `true` iff `reference` lies strictly between `base` and `test`.
pub fn is_crossing_reference_price(base: u64, reference: u64, test: u64) -> bool {
    (base < reference && reference < test) || (test < reference && reference < base)
}

/// The update moved past the index price.
pub fn is_crossing_index_price(prices: PriceTuple) -> bool {
    is_crossing_reference_price(prices.old_price, prices.index_price, prices.new_price)
}

/// The update moved away from the index price: the old price lies strictly
/// between the index price and the new price.
pub fn is_crossing_old_price(prices: PriceTuple) -> bool {
    is_crossing_reference_price(prices.index_price, prices.old_price, prices.new_price)
}

/// `old_price * min_price_change_ppm`, i.e. one tick scaled by one million.
pub fn compute_tick_size_ppm(old_price: u64, min_price_change_ppm: u32) -> BigUint {
    BigUint::from(old_price) * BigUint::from(min_price_change_ppm)
}

/// `price_delta * 1_000_000 <= tick_size_ppm`. The boundary counts as
/// within one tick.
pub fn price_delta_is_within_one_tick(price_delta: &BigUint, tick_size_ppm: &BigUint) -> bool {
    price_delta * BigUint::from(ONE_MILLION) <= *tick_size_ppm
}

/// `new_ticks <= sqrt(old_ticks)`, evaluated without division as
/// `new_delta^2 * 1_000_000 <= old_delta * tick_size_ppm`.
pub fn new_price_meets_sqrt_condition(
    old_delta: &BigUint,
    new_delta: &BigUint,
    tick_size_ppm: &BigUint,
) -> bool {
    new_delta * new_delta * BigUint::from(ONE_MILLION) <= old_delta * tick_size_ppm
}

/// Largest `new_delta` satisfying the sqrt condition:
/// `floor(sqrt(old_delta * tick_size_ppm / 1_000_000))`.
pub fn maximum_allowed_price_delta(old_delta: &BigUint, tick_size_ppm: &BigUint) -> BigUint {
    (old_delta * tick_size_ppm / BigUint::from(ONE_MILLION)).sqrt()
}

/// Narrow a [`BigUint`] known to be in `u64` range.
///
/// # Panics
///
/// If `value` does not fit; callers only pass values bounded by a `u64`
/// input.
#[allow(clippy::panic)]
pub(crate) fn to_u64(value: &BigUint, what: &str) -> u64 {
    match u64::try_from(value) {
        Ok(v) => v,
        Err(_) => panic!("{what} ({value}) is greater than max uint64 value"),
    }
}
