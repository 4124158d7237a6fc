//! Database query functions organized by domain.

pub mod currency_pairs;
pub mod exchange_feeds;
pub mod markets;
