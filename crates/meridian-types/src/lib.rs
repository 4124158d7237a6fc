//! # meridian-types
//!
//! Shared domain types for the Meridian oracle price engine: markets,
//! exchange feeds, per-exchange price observations and market price
//! updates, together with the stateless checks that every consumer
//! applies before touching state.

pub mod market;
pub mod observation;
pub mod update;

pub use market::{ExchangeFeed, Market, MarketParams};
pub use observation::{ExchangePrice, MarketObservations};
pub use update::{MarketPriceUpdate, MarketPriceUpdates};

/// Denominator for all parts-per-million quantities.
pub const ONE_MILLION: u64 = 1_000_000;

/// Weight given to a new index price sample when smoothing (30%).
pub const DEFAULT_SMOOTHING_PPM: u32 = 300_000;

/// Number of smoothed prices retained per market.
pub const DEFAULT_SMOOTHED_HISTORY_LEN: usize = 5;

/// Maximum age of an exchange observation, in seconds, for it to count
/// towards an index price.
pub const DEFAULT_MAX_PRICE_AGE_SECS: u64 = 30;

/// Errors raised by stateless validation of domain values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypesError {
    /// A market price update carries a zero price.
    #[error("price for market ({market_id}) must be greater than zero")]
    ZeroPrice {
        /// Market the update targets.
        market_id: u32,
    },

    /// Update ids are not strictly ascending (mis-ordered or duplicated).
    #[error(
        "market price updates must be sorted by market id in ascending order and cannot contain duplicates: {previous} followed by {next}"
    )]
    UnsortedUpdates {
        /// Id of the earlier update.
        previous: u32,
        /// Id of the update that broke the ordering.
        next: u32,
    },

    /// Generic invalid market parameter.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A market must require at least one exchange.
    #[error("min exchanges must be greater than zero")]
    ZeroMinExchanges,

    /// The exchange list repeats an id.
    #[error("duplicate exchanges: {0}")]
    DuplicateExchanges(u32),

    /// Fewer exchanges than the quorum requires.
    #[error("too few exchanges: have {available}, need {required}")]
    TooFewExchanges {
        /// Quorum size.
        required: u32,
        /// Exchanges configured.
        available: usize,
    },
}

/// Convenience result type for stateless validation.
pub type Result<T> = std::result::Result<T, TypesError>;
