//! Exchange feed catalog queries.

use meridian_types::ExchangeFeed;
use rusqlite::{Connection, OptionalExtension};

use crate::Result;

/// Insert a feed with the next dense id and return it.
pub fn insert(conn: &Connection, name: &str, memo: &str) -> Result<ExchangeFeed> {
    let id = count(conn)?;
    conn.execute(
        "INSERT INTO exchange_feeds (id, name, memo) VALUES (?1, ?2, ?3)",
        rusqlite::params![id, name, memo],
    )?;
    Ok(ExchangeFeed {
        id,
        name: name.to_string(),
        memo: memo.to_string(),
    })
}

pub fn get(conn: &Connection, id: u32) -> Result<Option<ExchangeFeed>> {
    let feed = conn
        .query_row(
            "SELECT id, name, memo FROM exchange_feeds WHERE id = ?1",
            [id],
            |row| {
                Ok(ExchangeFeed {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    memo: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(feed)
}

pub fn all(conn: &Connection) -> Result<Vec<ExchangeFeed>> {
    let mut stmt = conn.prepare("SELECT id, name, memo FROM exchange_feeds ORDER BY id")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(ExchangeFeed {
                id: row.get(0)?,
                name: row.get(1)?,
                memo: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count(conn: &Connection) -> Result<u32> {
    let n: u32 = conn.query_row("SELECT COUNT(*) FROM exchange_feeds", [], |row| row.get(0))?;
    Ok(n)
}
