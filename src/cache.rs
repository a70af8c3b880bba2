//! Computed table: a direct-mapped cache with generation-based O(1) clearing.
//!
//! Each key hashes to exactly one slot. Entries are stamped with the current
//! generation on insert; on lookup, entries from older generations count as
//! empty. Clearing after garbage collection or reordering therefore only
//! bumps the generation.
//!
//! The table keeps the counters reported by
//! [`Statistics`](crate::stats::Statistics): lookups, hits, insertions,
//! collisions (an insert evicting a live entry with a different key) and
//! deletions (live entries invalidated by a clear or a resize).

use std::cell::Cell;

use crate::utils::MyHash;

/// Default cache size in bits. 2^12 = 4K entries.
pub const DEFAULT_CACHE_BITS: usize = 12;

#[derive(Clone)]
struct Entry<K, V> {
    key: K,
    value: V,
    generation: u64,
}

impl<K: Default, V: Default> Default for Entry<K, V> {
    fn default() -> Self {
        Self {
            key: K::default(),
            value: V::default(),
            generation: 0, // Invalid
        }
    }
}

/// Snapshot of the cache counters.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CacheCounters {
    pub slots: usize,
    pub lookups: usize,
    pub hits: usize,
    pub inserts: usize,
    pub collisions: usize,
    pub deletions: usize,
}

pub struct ComputedTable<K, V> {
    entries: Vec<Entry<K, V>>,
    bitmask: u64,
    generation: u64,
    /// Number of entries valid in the current generation.
    live: usize,
    lookups: Cell<usize>,
    hits: Cell<usize>,
    inserts: usize,
    collisions: usize,
    deletions: usize,
    /// Lookups seen since the last resize, used to judge the hit ratio.
    window_lookups: Cell<usize>,
    window_hits: Cell<usize>,
}

impl<K: Default + Clone, V: Default + Clone> Default for ComputedTable<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_BITS)
    }
}

impl<K, V> ComputedTable<K, V>
where
    K: Default + Clone,
    V: Default + Clone,
{
    /// Creates a new cache with `2^bits` slots.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Cache bits must be in range 0..=31, got {}", bits);

        let size = 1usize << bits;
        Self {
            entries: vec![Entry::default(); size],
            bitmask: (size - 1) as u64,
            generation: 1, // Start at 1 so default entries are invalid
            live: 0,
            lookups: Cell::new(0),
            hits: Cell::new(0),
            inserts: 0,
            collisions: 0,
            deletions: 0,
            window_lookups: Cell::new(0),
            window_hits: Cell::new(0),
        }
    }

    /// Returns the number of slots in the cache.
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Number of entries valid right now.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Bytes held by the slot array.
    pub fn memory_bytes(&self) -> usize {
        self.entries.capacity() * std::mem::size_of::<Entry<K, V>>()
    }

    pub fn counters(&self) -> CacheCounters {
        CacheCounters {
            slots: self.capacity(),
            lookups: self.lookups.get(),
            hits: self.hits.get(),
            inserts: self.inserts,
            collisions: self.collisions,
            deletions: self.deletions,
        }
    }

    /// Invalidates every entry in O(1).
    pub fn clear(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.deletions += self.live;
        self.live = 0;
    }

    /// Whether the observed hit ratio justifies doubling the table.
    ///
    /// `min_hit` is a percentage. The table only grows after it has seen at
    /// least as many lookups as it has slots, and never beyond `max_slots`.
    pub fn should_grow(&self, min_hit: u32, max_slots: usize) -> bool {
        let lookups = self.window_lookups.get();
        if lookups < self.capacity() || self.capacity() * 2 > max_slots {
            return false;
        }
        self.window_hits.get() * 100 > lookups * min_hit as usize
    }

    /// Doubles the table. Existing entries are dropped.
    pub fn grow(&mut self) {
        let bits = self.capacity().trailing_zeros() as usize + 1;
        log::debug!("Growing computed table: {} -> {} slots", self.capacity(), 1usize << bits);
        self.resize(bits);
    }

    /// Resizes to `2^bits` slots, dropping existing entries.
    pub fn resize(&mut self, bits: usize) {
        assert!(bits <= 31, "Cache bits must be in range 0..=31, got {}", bits);
        let size = 1usize << bits;
        self.entries = vec![Entry::default(); size];
        self.bitmask = (size - 1) as u64;
        self.generation = 1;
        self.deletions += self.live;
        self.live = 0;
        self.window_lookups.set(0);
        self.window_hits.set(0);
    }
}

impl<K, V> ComputedTable<K, V>
where
    K: MyHash + Eq,
{
    #[inline]
    fn index(&self, key: &K) -> usize {
        (key.hash() & self.bitmask) as usize
    }

    /// Looks up a key in the cache.
    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.lookups.set(self.lookups.get() + 1);
        self.window_lookups.set(self.window_lookups.get() + 1);

        let entry = &self.entries[self.index(key)];
        if entry.generation == self.generation && entry.key == *key {
            self.hits.set(self.hits.get() + 1);
            self.window_hits.set(self.window_hits.get() + 1);
            Some(&entry.value)
        } else {
            None
        }
    }

    #[inline]
    pub fn insert(&mut self, key: K, value: V) {
        let idx = self.index(&key);
        let entry = &mut self.entries[idx];

        if entry.generation == self.generation {
            if entry.key != key {
                self.collisions += 1;
            }
        } else {
            self.live += 1;
        }
        self.inserts += 1;

        *entry = Entry {
            key,
            value,
            generation: self.generation,
        };
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::utils::MyHash;

    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    struct Key(u64, u64);

    impl MyHash for Key {
        fn hash(&self) -> u64 {
            MyHash::hash(&(self.0, self.1))
        }
    }

    #[test]
    fn test_insert_get() {
        let mut cache = ComputedTable::<Key, i32>::new(4);

        cache.insert(Key(1, 2), 42);
        cache.insert(Key(3, 4), 99);

        // Two keys may collide in 16 slots; whichever survives must be correct.
        assert!(matches!(cache.get(&Key(3, 4)), Some(&99)));
        assert_eq!(cache.get(&Key(5, 6)), None);
    }

    #[test]
    fn test_clear_counts_deletions() {
        let mut cache = ComputedTable::<Key, i32>::new(4);

        cache.insert(Key(1, 2), 42);
        assert_eq!(cache.get(&Key(1, 2)), Some(&42));
        assert_eq!(cache.len(), 1);

        cache.clear();

        assert_eq!(cache.get(&Key(1, 2)), None);
        assert!(cache.is_empty());
        assert_eq!(cache.counters().deletions, 1);
    }

    #[test]
    fn test_collision_counter() {
        let mut cache = ComputedTable::<Key, i32>::new(0); // a single slot

        cache.insert(Key(1, 1), 1);
        cache.insert(Key(2, 2), 2);
        cache.insert(Key(2, 2), 3);

        let c = cache.counters();
        assert_eq!(c.inserts, 3);
        assert_eq!(c.collisions, 1);
        assert_eq!(cache.get(&Key(1, 1)), None);
        assert_eq!(cache.get(&Key(2, 2)), Some(&3));
    }

    #[test]
    fn test_lookup_and_hit_counters() {
        let mut cache = ComputedTable::<Key, i32>::new(4);

        cache.get(&Key(1, 2));
        cache.insert(Key(1, 2), 42);
        cache.get(&Key(1, 2));

        let c = cache.counters();
        assert_eq!(c.lookups, 2);
        assert_eq!(c.hits, 1);
    }

    #[test]
    fn test_grow_on_high_hit_ratio() {
        let mut cache = ComputedTable::<Key, i32>::new(1);
        cache.insert(Key(0, 0), 0);
        for _ in 0..4 {
            cache.get(&Key(0, 0));
        }
        assert!(cache.should_grow(30, 1024));
        assert!(!cache.should_grow(30, 2));

        cache.grow();
        assert_eq!(cache.capacity(), 4);
        assert!(cache.is_empty());
        assert!(!cache.should_grow(30, 1024));
    }
}
