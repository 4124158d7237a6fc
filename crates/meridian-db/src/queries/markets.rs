//! Market queries.

use meridian_types::{Market, MarketParams};
use rusqlite::{types::Type, Connection, OptionalExtension, Row};

use crate::{constraint_or, DbError, Result};

const MARKET_COLUMNS: &str =
    "id, pair, exponent, exchanges, min_exchanges, min_price_change_ppm, price";

fn encode_exchanges(exchanges: &[u32]) -> Result<String> {
    serde_json::to_string(exchanges).map_err(|e| DbError::Serialization(e.to_string()))
}

fn market_from_row(row: &Row<'_>) -> rusqlite::Result<Market> {
    let exchanges: String = row.get(3)?;
    let exchanges = serde_json::from_str(&exchanges)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    Ok(Market {
        id: row.get(0)?,
        pair: row.get(1)?,
        exponent: row.get(2)?,
        exchanges,
        min_exchanges: row.get(4)?,
        min_price_change_ppm: row.get(5)?,
        price: row.get::<_, i64>(6)? as u64,
    })
}

/// Insert a new market.
///
/// # Errors
///
/// [`DbError::Constraint`] if the id or the pair is already taken.
pub fn insert(conn: &Connection, market: &Market) -> Result<()> {
    conn.execute(
        "INSERT INTO markets (id, pair, exponent, exchanges, min_exchanges, min_price_change_ppm, price)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            market.id,
            market.pair,
            market.exponent,
            encode_exchanges(&market.exchanges)?,
            market.min_exchanges,
            market.min_price_change_ppm,
            market.price as i64,
        ],
    )
    .map_err(|e| constraint_or(e, &format!("market {} or pair {} already exists", market.id, market.pair)))?;
    Ok(())
}

/// Fetch a market by id.
pub fn get(conn: &Connection, id: u32) -> Result<Option<Market>> {
    let market = conn
        .query_row(
            &format!("SELECT {MARKET_COLUMNS} FROM markets WHERE id = ?1"),
            [id],
            market_from_row,
        )
        .optional()?;
    Ok(market)
}

/// Fetch a market by pair.
pub fn get_by_pair(conn: &Connection, pair: &str) -> Result<Option<Market>> {
    let market = conn
        .query_row(
            &format!("SELECT {MARKET_COLUMNS} FROM markets WHERE pair = ?1"),
            [pair],
            market_from_row,
        )
        .optional()?;
    Ok(market)
}

/// All markets in ascending id order.
pub fn all(conn: &Connection) -> Result<Vec<Market>> {
    let mut stmt = conn.prepare(&format!("SELECT {MARKET_COLUMNS} FROM markets ORDER BY id"))?;
    let rows = stmt
        .query_map([], market_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Number of markets.
pub fn count(conn: &Connection) -> Result<u32> {
    let n: u32 = conn.query_row("SELECT COUNT(*) FROM markets", [], |row| row.get(0))?;
    Ok(n)
}

/// Overwrite the governance parameters of a market.
///
/// `id`, `exponent` and `price` are not touched.
pub fn update_params(conn: &Connection, id: u32, params: &MarketParams) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE markets SET pair = ?1, exchanges = ?2, min_exchanges = ?3, min_price_change_ppm = ?4
             WHERE id = ?5",
            rusqlite::params![
                params.pair,
                encode_exchanges(&params.exchanges)?,
                params.min_exchanges,
                params.min_price_change_ppm,
                id,
            ],
        )
        .map_err(|e| constraint_or(e, &format!("pair {} already exists", params.pair)))?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("market {id}")));
    }
    Ok(())
}

/// Set the canonical price of a market.
pub fn update_price(conn: &Connection, id: u32, price: u64) -> Result<()> {
    let updated = conn.execute(
        "UPDATE markets SET price = ?1 WHERE id = ?2",
        rusqlite::params![price as i64, id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("market {id}")));
    }
    Ok(())
}
