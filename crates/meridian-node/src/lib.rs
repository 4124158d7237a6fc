//! # meridian-node
//!
//! Process-level wiring for the price engine: configuration, logging and
//! the block lifecycle hooks a consensus engine drives once per block.
//!
//! The caches are built once in [`PriceNode::with_connection`] and shared
//! by reference for the life of the process.

pub mod config;
pub mod logging;
pub mod node;

pub use config::NodeConfig;
pub use node::PriceNode;
