//! Various utility structs.
use std::hash::BuildHasherDefault;

use indexmap::IndexMap;
use rustc_hash::FxHasher;

/// A simple incrementing counter used to assign ordinal ids.
#[derive(Clone, Default)]
pub struct Counter {
    value: usize,
}

impl Counter {
    /// Returns current counter value, i.e. the number of ids issued so far.
    pub fn curr(&self) -> usize {
        self.value
    }

    /// Post-increments the counter.
    pub fn increment(&mut self) -> usize {
        let curr = self.value;
        self.value += 1;
        curr
    }
}

/// IndexMap with faster hash function.
pub type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;
