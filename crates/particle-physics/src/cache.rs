//! Memoization of symmetric pair parameters
//!
//! Particles usually share a handful of distinct epsilon values, so the
//! geometric mean needed by every pair interaction is computed once per
//! ordered pair of values and looked up afterwards.

use parking_lot::RwLock;
use std::collections::HashMap;

/// Cache mapping an ordered pair of `f64` keys to a memoized `f64` value.
///
/// Keys are compared by their bit patterns. Entries are never evicted or
/// overwritten. `(a, b)` and `(b, a)` are stored independently.
#[derive(Debug, Default)]
pub struct PairParamCache {
    entries: RwLock<HashMap<(u64, u64), f64>>,
}

impl PairParamCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Geometric mean `sqrt(a * b)`, computed on first request for `(a, b)`
    pub fn combine(&self, a: f64, b: f64) -> f64 {
        self.store_if_absent(a, b, || (a * b).sqrt())
    }

    /// Return the cached value for `(a, b)` or generate, store and return it.
    ///
    /// Two threads missing on the same key at once may both run `generator`;
    /// whichever value lands first is kept and returned to both.
    pub fn store_if_absent(&self, a: f64, b: f64, generator: impl FnOnce() -> f64) -> f64 {
        let key = (a.to_bits(), b.to_bits());
        if let Some(value) = self.entries.read().get(&key) {
            return *value;
        }

        let value = generator();
        *self.entries.write().entry(key).or_insert(value)
    }

    /// Number of memoized pairs
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
