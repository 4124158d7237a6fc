//! Market price store.
//!
//! All writes for one call happen inside a single SQLite transaction: if
//! any update in a batch fails, the transaction is dropped and rolled back,
//! leaving state exactly as it was.

use meridian_db::queries::{currency_pairs, exchange_feeds, markets};
use meridian_types::{
    ExchangeFeed, Market, MarketParams, MarketPriceUpdate, TypesError, ONE_MILLION,
};
use rusqlite::Connection;

use crate::{OracleError, Result};

/// Relative price change in ppm, saturating; `None` for a market that was
/// never priced.
fn rate_of_change_ppm(old_price: u64, new_price: u64) -> Option<u64> {
    if old_price == 0 {
        return None;
    }
    let ppm = u128::from(old_price.abs_diff(new_price)) * u128::from(ONE_MILLION) / u128::from(old_price);
    Some(u64::try_from(ppm).unwrap_or(u64::MAX))
}

/// Apply a batch of price updates atomically.
///
/// Each update is checked against the current record before anything is
/// committed.
///
/// # Errors
///
/// - [`TypesError::UnsortedUpdates`] (as [`OracleError::Invalid`]) if ids
///   are not strictly ascending, which includes a repeated market
/// - [`OracleError::ZeroPrice`] if an update carries a zero price
/// - [`OracleError::MarketNotFound`] if an update targets a missing market
pub fn apply_updates(conn: &mut Connection, updates: &[MarketPriceUpdate]) -> Result<()> {
    for pair in updates.windows(2) {
        if pair[1].market_id <= pair[0].market_id {
            return Err(TypesError::UnsortedUpdates {
                previous: pair[0].market_id,
                next: pair[1].market_id,
            }
            .into());
        }
    }

    let tx = conn.transaction()?;
    for update in updates {
        if update.price == 0 {
            return Err(OracleError::ZeroPrice(update.market_id));
        }
        let market = markets::get(&tx, update.market_id)?
            .ok_or(OracleError::MarketNotFound(update.market_id))?;

        tracing::info!(
            market_id = market.id,
            pair = %market.pair,
            old_price = market.price,
            new_price = update.price,
            rate_of_change_ppm = rate_of_change_ppm(market.price, update.price),
            "market price updated"
        );
        markets::update_price(&tx, update.market_id, update.price)?;
    }
    tx.commit()?;
    Ok(())
}

/// Register a new exchange feed with the next sequential id.
pub fn create_exchange_feed(conn: &Connection, name: &str, memo: &str) -> Result<ExchangeFeed> {
    if name.is_empty() {
        return Err(OracleError::EmptyExchangeName);
    }
    let feed = exchange_feeds::insert(conn, name, memo)?;
    tracing::info!(exchange_id = feed.id, name, "exchange feed created");
    Ok(feed)
}

fn check_exchanges_exist(conn: &Connection, exchanges: &[u32]) -> Result<()> {
    for id in exchanges {
        if exchange_feeds::get(conn, *id)?.is_none() {
            return Err(OracleError::ExchangeFeedNotFound(*id));
        }
    }
    Ok(())
}

fn check_pair_available(conn: &Connection, pair: &str, market_id: Option<u32>) -> Result<()> {
    match markets::get_by_pair(conn, pair)? {
        Some(existing) if Some(existing.id) != market_id => {
            Err(OracleError::DuplicatePair(pair.to_string()))
        }
        _ => Ok(()),
    }
}

/// Create a market with the next sequential id and persist its pair mapping.
pub fn create_market(conn: &mut Connection, params: &MarketParams, price: u64) -> Result<Market> {
    params.validate()?;

    let tx = conn.transaction()?;
    check_exchanges_exist(&tx, &params.exchanges)?;
    check_pair_available(&tx, &params.pair, None)?;

    let market = Market {
        id: markets::count(&tx)?,
        pair: params.pair.clone(),
        exponent: params.exponent,
        exchanges: params.exchanges.clone(),
        min_exchanges: params.min_exchanges,
        min_price_change_ppm: params.min_price_change_ppm,
        price,
    };
    markets::insert(&tx, &market)?;
    currency_pairs::set(&tx, u64::from(market.id), &market.pair)?;
    tx.commit()?;

    tracing::info!(market_id = market.id, pair = %market.pair, "market created");
    Ok(market)
}

/// Change the governance parameters of an existing market.
///
/// `params.exponent` is ignored: the exponent is fixed at creation.
pub fn modify_market(conn: &mut Connection, id: u32, params: &MarketParams) -> Result<Market> {
    params.validate()?;

    let tx = conn.transaction()?;
    let existing = markets::get(&tx, id)?.ok_or(OracleError::MarketNotFound(id))?;
    check_exchanges_exist(&tx, &params.exchanges)?;
    check_pair_available(&tx, &params.pair, Some(id))?;

    markets::update_params(&tx, id, params)?;
    if existing.pair != params.pair {
        currency_pairs::set(&tx, u64::from(id), &params.pair)?;
    }
    let market = markets::get(&tx, id)?.ok_or(OracleError::MarketNotFound(id))?;
    tx.commit()?;

    tracing::info!(market_id = id, pair = %market.pair, "market modified");
    Ok(market)
}

/// All markets in ascending id order.
///
/// Ids are dense, so a gap means state is corrupt and is reported as the
/// first missing id.
pub fn all_markets(conn: &Connection) -> Result<Vec<Market>> {
    let all = markets::all(conn)?;
    for (expected, market) in all.iter().enumerate() {
        let expected = expected as u32;
        if market.id != expected {
            return Err(OracleError::MarketNotFound(expected));
        }
    }
    Ok(all)
}
