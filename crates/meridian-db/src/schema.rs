//! SQL schema definitions.

/// Complete schema for the v1 database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Exchange feed catalog
-- ============================================================

CREATE TABLE IF NOT EXISTS exchange_feeds (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    memo TEXT NOT NULL
);

-- ============================================================
-- Markets
-- ============================================================

-- exchanges: JSON array of exchange feed ids.
CREATE TABLE IF NOT EXISTS markets (
    id INTEGER PRIMARY KEY,
    pair TEXT NOT NULL UNIQUE,
    exponent INTEGER NOT NULL,
    exchanges TEXT NOT NULL,
    min_exchanges INTEGER NOT NULL,
    min_price_change_ppm INTEGER NOT NULL,
    price INTEGER NOT NULL
);

-- ============================================================
-- Currency pair ids (both columns unique: the mapping is bijective)
-- ============================================================

CREATE TABLE IF NOT EXISTS currency_pair_ids (
    market_id INTEGER PRIMARY KEY,
    pair TEXT NOT NULL UNIQUE
);
"#;
