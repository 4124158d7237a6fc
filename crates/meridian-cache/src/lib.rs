//! # meridian-cache
//!
//! Process-wide in-memory caches shared by every call path of the price
//! engine (proposal construction, proposal validation, vote handling and
//! block commit).
//!
//! Each cache wraps its state in a single reader/writer lock. Writers hold
//! the lock only for the mutation itself and no lock is held across a call
//! out of this crate. None of the caches is persisted; all of them are safe
//! to lose on restart.
//!
//! ## Modules
//!
//! - [`index`] — latest per-exchange observations and median index prices
//! - [`pair_id`] — bidirectional market id / currency pair mapping
//! - [`round`] — price updates memoised for one `(height, round)`

pub mod index;
pub mod pair_id;
pub mod round;

pub use index::IndexPriceCache;
pub use pair_id::CurrencyPairIdCache;
pub use round::RoundScopedPriceCache;
