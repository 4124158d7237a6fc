//! Persisted `market id <-> currency pair` mapping.

use rusqlite::{Connection, OptionalExtension};

use crate::Result;

/// Map `market_id` to `pair`, replacing any row that holds either value.
pub fn set(conn: &Connection, market_id: u64, pair: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO currency_pair_ids (market_id, pair) VALUES (?1, ?2)",
        rusqlite::params![market_id as i64, pair],
    )?;
    Ok(())
}

pub fn id_for_pair(conn: &Connection, pair: &str) -> Result<Option<u64>> {
    let id = conn
        .query_row(
            "SELECT market_id FROM currency_pair_ids WHERE pair = ?1",
            [pair],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(id.map(|id| id as u64))
}

pub fn pair_for_id(conn: &Connection, market_id: u64) -> Result<Option<String>> {
    let pair = conn
        .query_row(
            "SELECT pair FROM currency_pair_ids WHERE market_id = ?1",
            [market_id as i64],
            |row| row.get(0),
        )
        .optional()?;
    Ok(pair)
}

/// Remove the mapping for `market_id`. Returns whether a row existed.
pub fn remove(conn: &Connection, market_id: u64) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM currency_pair_ids WHERE market_id = ?1",
        [market_id as i64],
    )?;
    Ok(removed > 0)
}

/// All mappings in ascending id order.
pub fn all(conn: &Connection) -> Result<Vec<(u64, String)>> {
    let mut stmt = conn.prepare("SELECT market_id, pair FROM currency_pair_ids ORDER BY market_id")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, i64>(0)? as u64, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
