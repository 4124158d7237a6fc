//! Bidirectional mapping between market ids and currency pair strings.
//!
//! External vote formats key prices by pair string while state is keyed by
//! numeric market id. The mapping is kept bijective: inserting an id or a
//! pair that is already mapped evicts the stale counterpart.

use std::collections::HashMap;

use parking_lot::RwLock;

#[derive(Debug, Default)]
struct PairIds {
    id_to_pair: HashMap<u64, String>,
    pair_to_id: HashMap<String, u64>,
}

/// Thread-safe `market id <-> pair` mapping.
#[derive(Debug, Default)]
pub struct CurrencyPairIdCache {
    inner: RwLock<PairIds>,
}

impl CurrencyPairIdCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `id` to `pair`, replacing any previous mapping of either side.
    pub fn add(&self, id: u64, pair: &str) {
        let mut inner = self.inner.write();
        if let Some(old_pair) = inner.id_to_pair.remove(&id) {
            inner.pair_to_id.remove(&old_pair);
        }
        if let Some(old_id) = inner.pair_to_id.remove(pair) {
            inner.id_to_pair.remove(&old_id);
        }
        inner.id_to_pair.insert(id, pair.to_string());
        inner.pair_to_id.insert(pair.to_string(), id);
    }

    pub fn id_for_pair(&self, pair: &str) -> Option<u64> {
        self.inner.read().pair_to_id.get(pair).copied()
    }

    pub fn pair_for_id(&self, id: u64) -> Option<String> {
        self.inner.read().id_to_pair.get(&id).cloned()
    }

    /// Remove the mapping for `id`, returning its pair if one existed.
    pub fn remove(&self, id: u64) -> Option<String> {
        let mut inner = self.inner.write();
        let pair = inner.id_to_pair.remove(&id)?;
        inner.pair_to_id.remove(&pair);
        Some(pair)
    }

    pub fn len(&self) -> usize {
        self.inner.read().id_to_pair.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
