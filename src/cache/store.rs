//! Key Store Module
//!
//! Maintains the bounded, ordered cache entry list as two parallel
//! sequences: one of keys, one of values.
//!
//! Invariant: `keys[i]` pairs with `values[i]` for every i, and the two
//! sequences are always mutated together. Front = most recently used,
//! back = next eviction candidate.

use tracing::trace;

use crate::cache::CachedValue;
use crate::key::{Arg, CacheKey, KeyComparator};

// == Key Store ==
/// Ordered, bounded storage for cache entries.
///
/// Lookup is a linear scan from the front using the supplied comparator;
/// see [`KeyComparator`] for why no hashing is involved.
#[derive(Debug)]
pub struct KeyStore<V> {
    /// Cache keys, most recently used first
    keys: Vec<CacheKey>,
    /// Stored values, parallel to `keys`
    values: Vec<CachedValue<V>>,
    /// Maximum number of entries allowed
    max_size: usize,
}

impl<V: Clone> KeyStore<V> {
    // == Constructor ==
    /// Creates a new empty store bounded to `max_size` entries.
    pub fn new(max_size: usize) -> Self {
        Self {
            keys: Vec::new(),
            values: Vec::new(),
            max_size,
        }
    }

    // == Find Index ==
    /// Returns the position of the first key equal to `key` under the
    /// supplied comparator, scanning from the front.
    pub fn find_index(&self, comparator: KeyComparator, key: &[Arg]) -> Option<usize> {
        self.keys
            .iter()
            .position(|stored| comparator.keys_equal(stored, key))
    }

    // == Insert Front ==
    /// Prepends a new entry. If the store would exceed its bound, the
    /// least-recently-used tail entry is removed from both sequences and
    /// its key is returned so the caller can cancel any pending expiration.
    ///
    /// Inserting a key equal to one already present is a caller-checked
    /// precondition violation; the store does not dedupe.
    pub fn insert_front(&mut self, key: CacheKey, value: CachedValue<V>) -> Option<CacheKey> {
        self.keys.insert(0, key);
        self.values.insert(0, value);

        if self.keys.len() > self.max_size {
            let evicted_key = self.keys.pop();
            self.values.pop();
            trace!("evicted least-recently-used entry (size={})", self.keys.len());
            evicted_key
        } else {
            None
        }
    }

    // == Move To Front ==
    /// Relocates the entry at `index` to position 0, preserving the
    /// relative order of all other entries.
    pub fn move_to_front(&mut self, index: usize) {
        if index == 0 || index >= self.keys.len() {
            return;
        }

        let key = self.keys.remove(index);
        let value = self.values.remove(index);
        self.keys.insert(0, key);
        self.values.insert(0, value);
    }

    // == Remove At ==
    /// Removes and returns the entry at `index` from both sequences.
    pub fn remove_at(&mut self, index: usize) -> (CacheKey, CachedValue<V>) {
        let key = self.keys.remove(index);
        let value = self.values.remove(index);
        (key, value)
    }

    // == Replace Value ==
    /// Replaces the value at `index` in place, leaving the key untouched.
    pub fn replace_value_at(&mut self, index: usize, value: CachedValue<V>) {
        self.values[index] = value;
    }

    /// Returns the value at `index`.
    pub fn value_at(&self, index: usize) -> &CachedValue<V> {
        &self.values[index]
    }

    // == Clear ==
    /// Removes every entry.
    pub fn clear(&mut self) {
        self.keys.clear();
        self.values.clear();
    }

    // == Length ==
    /// Returns the current number of entries.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true when no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    // == Snapshots ==
    /// Returns a copy of the key sequence, most recently used first.
    pub fn keys(&self) -> Vec<CacheKey> {
        self.keys.clone()
    }

    /// Returns a copy of the value sequence, parallel to [`KeyStore::keys`].
    pub fn values(&self) -> Vec<CachedValue<V>> {
        self.values.clone()
    }
}
