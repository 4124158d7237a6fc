//! Selection of the price updates a proposer puts in a block.
//!
//! For each market with a valid index price the candidate is the latest
//! smoothed price, or the index price when no smoothed price exists yet. The
//! candidate is proposed only if it, and every smoothed price still in the
//! market's history window, meets the minimum change from the current
//! on-chain price without crossing it. Checking the whole window keeps an
//! erratic market from flickering between updates.

use std::collections::BTreeMap;

use meridian_types::{Market, MarketPriceUpdate, MarketPriceUpdates};

use crate::smoothed::SmoothedPriceTracker;
use crate::tick::{is_above_required_min_price_change, is_crossing_old_price, PriceTuple};

/// Why a market produced no update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ProposalPriceBelowMinPriceChange,
    ProposalPriceCrossesOldPrice,
    RecentSmoothedPriceBelowMinPriceChange,
    RecentSmoothedPriceCrossesOldPrice,
}

/// Reasons `price` may not be proposed for `market`, empty if acceptable.
fn check_price(market: &Market, price: u64, index_price: u64, historical: bool) -> Vec<SkipReason> {
    let mut reasons = Vec::new();
    if !is_above_required_min_price_change(market, price) {
        reasons.push(if historical {
            SkipReason::RecentSmoothedPriceBelowMinPriceChange
        } else {
            SkipReason::ProposalPriceBelowMinPriceChange
        });
    }
    let prices = PriceTuple {
        old_price: market.price,
        index_price,
        new_price: price,
    };
    if is_crossing_old_price(prices) {
        reasons.push(if historical {
            SkipReason::RecentSmoothedPriceCrossesOldPrice
        } else {
            SkipReason::ProposalPriceCrossesOldPrice
        });
    }
    reasons
}

/// Decide the update, if any, to propose for one market.
pub fn select_market_price(
    market: &Market,
    index_price: u64,
    smoothed: &SmoothedPriceTracker,
) -> Result<u64, Vec<SkipReason>> {
    let (latest, history) = smoothed.snapshot(market.id);
    let candidate = latest.unwrap_or(index_price);

    let mut reasons = check_price(market, candidate, index_price, false);
    for historical in history {
        for reason in check_price(market, historical, index_price, true) {
            if !reasons.contains(&reason) {
                reasons.push(reason);
            }
        }
    }

    if reasons.is_empty() {
        Ok(candidate)
    } else {
        Err(reasons)
    }
}

/// The updates to propose, in ascending market id order.
///
/// Markets missing from `index_prices` are skipped silently; they have no
/// quorum of fresh observations this block.
pub fn select_price_updates(
    markets: &[Market],
    index_prices: &BTreeMap<u32, u64>,
    smoothed: &SmoothedPriceTracker,
) -> MarketPriceUpdates {
    let mut updates = Vec::new();
    for market in markets {
        let Some(&index_price) = index_prices.get(&market.id) else {
            continue;
        };
        match select_market_price(market, index_price, smoothed) {
            Ok(price) => updates.push(MarketPriceUpdate::new(market.id, price)),
            Err(reasons) => {
                tracing::debug!(
                    market_id = market.id,
                    index_price,
                    market_price = market.price,
                    ?reasons,
                    "not proposing price update"
                );
            }
        }
    }
    MarketPriceUpdates::sorted(updates)
}
