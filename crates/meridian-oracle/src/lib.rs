//! # meridian-oracle
//!
//! Oracle price determination and validation.
//!
//! Turns the index prices held in [`meridian_cache::IndexPriceCache`] into
//! at most one price update per market per block, and decides whether a
//! proposed update is acceptable. Every validating node must reach the same
//! decision for the same inputs, so all arithmetic here is integer-only and
//! overflow-free.
//!
//! ## Modules
//!
//! - [`smoothed`] — per-market ring of exponentially smoothed prices
//! - [`tick`] — minimum-change, crossing and tick/sqrt price math
//! - [`proposal`] — picks the updates a proposer puts in a block
//! - [`validation`] — deterministic and non-deterministic update checks
//! - [`store`] — atomic application of updates and market bookkeeping
//! - [`keeper`] — [`PriceKeeper`] facade wiring caches, store and clock
//! - [`time`] — injectable wall clock

pub mod keeper;
pub mod proposal;
pub mod smoothed;
pub mod store;
pub mod tick;
pub mod time;
pub mod validation;

pub use keeper::PriceKeeper;
pub use smoothed::SmoothedPriceTracker;
pub use time::{ManualClock, SystemClock, TimeProvider};
pub use validation::{DeterministicViolation, NonDeterministicViolation, ValidationError};

use meridian_db::DbError;
use meridian_types::TypesError;

/// Error types for oracle operations.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// The referenced market does not exist.
    #[error("{0}: Market does not exist")]
    MarketNotFound(u32),

    /// The referenced exchange feed does not exist.
    #[error("{0}: ExchangeFeed does not exist")]
    ExchangeFeedNotFound(u32),

    /// Another market already uses this pair.
    #[error("pair already exists: {0}")]
    DuplicatePair(String),

    /// No market is mapped to this currency pair.
    #[error("unknown currency pair: {0}")]
    UnknownPair(String),

    /// Exchange feeds need a name.
    #[error("exchange feed name cannot be empty")]
    EmptyExchangeName,

    /// Applying a zero price would break the nonzero price invariant.
    #[error("price for market ({0}) must be greater than zero")]
    ZeroPrice(u32),

    /// Stateless validation failed.
    #[error(transparent)]
    Invalid(#[from] TypesError),

    /// Stateful price update validation failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("database error: {0}")]
    Db(#[from] DbError),
}

impl From<rusqlite::Error> for OracleError {
    fn from(err: rusqlite::Error) -> Self {
        OracleError::Db(DbError::Sqlite(err))
    }
}

/// Convenience result type for oracle operations.
pub type Result<T> = std::result::Result<T, OracleError>;
