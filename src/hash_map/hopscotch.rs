//! Hopscotch hash table over flat entries
//!
//! Every entry lives within `neighborhood_size` slots (circularly) of its
//! home bucket `hash % usable_capacity`. Each slot carries a 32-bit hop-info
//! word: bit 31 marks the slot occupied, and the low bits form a bitmap of
//! which neighborhood offsets hold entries homed at that slot. Lookups only
//! visit offsets set in the home's bitmap, so they stay O(1) regardless of
//! load.
//!
//! When an insert finds no free slot in its neighborhood the table doubles
//! and rehashes every entry. Doubling is bounded by a retry budget shared by
//! the insert and every rehash it triggers.

use super::hash_functions::{Fnv1a, HashStrategy};
use crate::config::{Config, HashTableConfig};
use crate::containers::{DynArray, View};
use crate::error::{FatBufError, Result};
use crate::memory::{Tag, Tagged};
use bytemuck::Pod;
use std::fmt;
use std::mem;

/// Hop-info bit marking a live slot
pub const OCCUPIED_BIT: u32 = 1 << 31;

const NEIGHBORHOOD_BITS: u32 = OCCUPIED_BIT - 1;

/// Two distinct mutable elements of one slice
fn pair_mut<T>(slice: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    assert_ne!(a, b, "cannot borrow slot {} twice", a);
    if a < b {
        let (lo, hi) = slice.split_at_mut(b);
        (&mut lo[a], &mut hi[0])
    } else {
        let (lo, hi) = slice.split_at_mut(a);
        (&mut hi[0], &mut lo[b])
    }
}

/// Open-addressing hash table with bounded neighborhoods
///
/// Entries are flat values compared and hashed as raw bytes through the
/// table's [`HashStrategy`]. The table starts without storage; the first
/// insert allocates `neighborhood_size` slots.
///
/// [`insert`](Self::insert) does not look for an existing equal entry; use
/// [`insert_or_replace`](Self::insert_or_replace) for map semantics.
///
/// # Examples
///
/// ```rust
/// use fatbuf::HopscotchTable;
///
/// let mut table = HopscotchTable::new();
/// table.insert(5u32).unwrap();
/// table.insert(6u32).unwrap();
/// assert_eq!(table.find(&5), Some(&5));
/// assert!(table.find(&4).is_none());
/// ```
pub struct HopscotchTable<T, S = Fnv1a> {
    slots: DynArray<T>,
    hop_info: DynArray<u32>,
    hash_cache: Option<DynArray<usize>>,
    strategy: S,
    config: HashTableConfig,
}

impl<T: Pod> HopscotchTable<T> {
    /// Create an empty table with the default configuration and FNV-1a
    pub fn new() -> Self {
        Self::build(HashTableConfig::default(), Fnv1a)
    }

    /// Create an empty table with a custom configuration
    pub fn with_config(config: HashTableConfig) -> Result<Self> {
        Self::with_config_and_strategy(config, Fnv1a)
    }

    /// Create a table with at least `capacity` usable slots
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut table = Self::new();
        table.reserve(capacity)?;
        Ok(table)
    }

    /// Build a table holding every element of `values`, inserted one by one
    pub fn from_slice(values: &[T]) -> Result<Self> {
        let mut table = Self::with_capacity(values.len())?;
        table.extend_from_slice(values)?;
        Ok(table)
    }

    /// Build a table from `array`, releasing the array afterwards
    pub fn from_array(array: DynArray<T>) -> Result<Self> {
        Self::from_slice(array.as_slice())
    }
}

impl<T: Pod, S: HashStrategy> HopscotchTable<T, S> {
    fn build(config: HashTableConfig, strategy: S) -> Self {
        let mut slots = DynArray::new();
        slots.retag(Tag::HashTable);
        Self {
            slots,
            hop_info: DynArray::new(),
            hash_cache: config.store_hashes.then(DynArray::new),
            strategy,
            config,
        }
    }

    /// Create an empty table using `strategy`
    pub fn with_strategy(strategy: S) -> Self {
        Self::build(HashTableConfig::default(), strategy)
    }

    /// Create an empty table with a custom configuration and strategy
    pub fn with_config_and_strategy(config: HashTableConfig, strategy: S) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, strategy))
    }

    /// Insert every element of `array` into `table`, releasing the array
    pub fn from_array_with_existing(mut table: Self, array: DynArray<T>) -> Result<Self> {
        table.reserve(table.len() + array.len())?;
        table.extend_from_slice(array.as_slice())?;
        Ok(table)
    }

    /// Configuration of this table
    #[inline]
    pub fn config(&self) -> &HashTableConfig {
        &self.config
    }

    /// Hash strategy of this table
    #[inline]
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Allocation class of the slot array, `None` before the first insert
    #[inline]
    pub fn tag(&self) -> Option<Tag> {
        self.slots.tag()
    }

    #[inline]
    fn neighborhood(&self) -> usize {
        self.config.neighborhood_size
    }

    /// Number of slots entries can occupy
    #[inline]
    pub fn usable_capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live entries; scans every slot
    pub fn len(&self) -> usize {
        self.hop_info
            .iter()
            .filter(|&&info| info & OCCUPIED_BIT != 0)
            .count()
    }

    /// Whether no slot is live
    pub fn is_empty(&self) -> bool {
        !self.hop_info.iter().any(|&info| info & OCCUPIED_BIT != 0)
    }

    /// Ratio of live entries to usable slots
    pub fn load_factor(&self) -> f64 {
        match self.usable_capacity() {
            0 => 0.0,
            capacity => self.len() as f64 / capacity as f64,
        }
    }

    /// Hash of an entry under this table's strategy
    #[inline]
    pub fn hash_of(&self, entry: &T) -> usize {
        self.strategy.hash(View::from_ref(entry).as_bytes())
    }

    /// Home slot of `hash`
    ///
    /// # Panics
    ///
    /// Panics if the table has no storage yet.
    #[inline]
    pub fn home_bucket(&self, hash: usize) -> usize {
        let capacity = self.usable_capacity();
        assert!(capacity > 0, "table has no storage");
        hash % capacity
    }

    /// Whether slot `index` holds a live entry
    #[inline]
    pub fn is_occupied(&self, index: usize) -> bool {
        self.hop_info[index] & OCCUPIED_BIT != 0
    }

    /// Raw hop-info word of slot `index`
    #[inline]
    pub fn hop_info(&self, index: usize) -> u32 {
        self.hop_info[index]
    }

    /// Entry in slot `index`, if live
    #[inline]
    pub fn slot(&self, index: usize) -> Option<&T> {
        self.is_occupied(index).then(|| &self.slots[index])
    }

    /// Iterate over live entries in slot order
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            slots: self.slots.as_slice(),
            hop_info: self.hop_info.as_slice(),
            index: 0,
        }
    }

    /// Mark every slot free, keeping the storage
    pub fn clear(&mut self) {
        self.hop_info.as_mut_slice().fill(0);
    }

    /// Release the storage; the table returns to its initial empty state
    pub fn free(&mut self) {
        self.slots.free();
        self.hop_info.free();
        if let Some(cache) = self.hash_cache.as_mut() {
            cache.free();
        }
    }

    /// Circular offset of `index` from `home`
    #[inline]
    fn distance(&self, home: usize, index: usize) -> usize {
        let capacity = self.usable_capacity();
        (index + capacity - home) % capacity
    }

    fn find_empty_spot(&self, home: usize) -> Option<usize> {
        let capacity = self.usable_capacity();
        (0..self.neighborhood().min(capacity))
            .map(|offset| (home + offset) % capacity)
            .find(|&index| !self.is_occupied(index))
    }

    /// Slot holding an entry equal to `key`
    pub fn find_position(&self, key: &T) -> Option<usize> {
        let capacity = self.usable_capacity();
        if capacity == 0 {
            return None;
        }

        let hash = self.hash_of(key);
        let home = hash % capacity;
        let bits = self.hop_info[home] & NEIGHBORHOOD_BITS;
        let key = View::from_ref(key);

        (0..self.neighborhood().min(capacity))
            .filter(|&offset| bits & (1 << offset) != 0)
            .map(|offset| (home + offset) % capacity)
            .find(|&index| {
                self.is_occupied(index)
                    && self
                        .hash_cache
                        .as_ref()
                        .is_none_or(|cache| cache[index] == hash)
                    && self
                        .strategy
                        .equal(key.as_bytes(), View::from_ref(&self.slots[index]).as_bytes())
            })
    }

    /// Entry equal to `key`
    pub fn find(&self, key: &T) -> Option<&T> {
        self.find_position(key).map(|index| &self.slots[index])
    }

    /// Mutable entry equal to `key`
    ///
    /// Changing the bytes the strategy hashes leaves the entry in the wrong
    /// neighborhood until the next [`rehash`](Self::rehash).
    pub fn find_mut(&mut self, key: &T) -> Option<&mut T> {
        let index = self.find_position(key)?;
        Some(&mut self.slots[index])
    }

    /// Whether an entry equal to `key` is present
    pub fn contains(&self, key: &T) -> bool {
        self.find_position(key).is_some()
    }

    fn place(&mut self, index: usize, home: usize, hash: usize, entry: &T) {
        self.strategy.copy(
            bytemuck::bytes_of_mut(&mut self.slots[index]),
            View::from_ref(entry).as_bytes(),
        );
        self.hop_info[index] |= OCCUPIED_BIT;
        if let Some(cache) = self.hash_cache.as_mut() {
            cache[index] = hash;
        }
        let offset = self.distance(home, index);
        self.hop_info[home] |= 1 << offset;
    }

    /// Insert `entry`, growing the table when its neighborhood is full.
    ///
    /// Returns the slot the entry landed in. Fails with
    /// [`FatBufError::InsertFailed`] or [`FatBufError::RehashFailed`] once
    /// `max_fail_retries` doublings did not make room. After `RehashFailed`
    /// lookups may miss entries until a later rehash succeeds.
    pub fn insert(&mut self, entry: T) -> Result<usize> {
        if self.usable_capacity() == 0 {
            self.resize_storage(self.neighborhood())?;
        }

        let hash = self.hash_of(&entry);
        let mut retries = 0;
        loop {
            let home = hash % self.usable_capacity();
            if let Some(index) = self.find_empty_spot(home) {
                self.place(index, home, hash, &entry);
                return Ok(index);
            }
            if retries >= self.config.max_fail_retries {
                log::warn!(
                    "hopscotch insert gave up after {} resize attempts at {} slots",
                    retries,
                    self.usable_capacity()
                );
                return Err(FatBufError::insert_failed(retries));
            }
            self.grow_and_rehash(&mut retries)?;
        }
    }

    /// Overwrite the entry equal to `entry`, or insert it.
    ///
    /// The whole entry is copied even when found, so strategies comparing
    /// only part of an entry update the remaining bytes.
    pub fn insert_or_replace(&mut self, entry: T) -> Result<usize> {
        match self.find_position(&entry) {
            Some(index) => {
                self.strategy.copy(
                    bytemuck::bytes_of_mut(&mut self.slots[index]),
                    View::from_ref(&entry).as_bytes(),
                );
                Ok(index)
            }
            None => self.insert(entry),
        }
    }

    /// Insert every element of `values`
    pub fn extend_from_slice(&mut self, values: &[T]) -> Result<()> {
        for value in values {
            self.insert(*value)?;
        }
        Ok(())
    }

    /// Remove and return the entry equal to `key`
    pub fn remove(&mut self, key: &T) -> Option<T> {
        let index = self.find_position(key)?;
        let home = self.home_bucket(self.hash_of(key));
        let removed = self.slots[index];
        let offset = self.distance(home, index);
        self.hop_info[index] &= !OCCUPIED_BIT;
        self.hop_info[home] &= !(1 << offset);
        Some(removed)
    }

    /// Ensure at least `capacity` usable slots, rehashing if storage grows
    pub fn reserve(&mut self, capacity: usize) -> Result<()> {
        let current = self.usable_capacity();
        if capacity <= current {
            return Ok(());
        }
        self.resize_storage(capacity.max(self.neighborhood()))?;
        if current == 0 || self.rehash_pass(false) {
            return Ok(());
        }
        let mut retries = 0;
        self.grow_and_rehash(&mut retries)
    }

    /// Recompute every entry's position at the current capacity.
    ///
    /// Doubles the table (within the retry budget) when an entry no longer
    /// fits its neighborhood.
    pub fn rehash(&mut self) -> Result<()> {
        if self.usable_capacity() == 0 {
            return Ok(());
        }
        log::debug!("rehashing hopscotch table of {} slots", self.usable_capacity());
        if self.rehash_pass(false) {
            return Ok(());
        }
        let mut retries = 0;
        self.grow_and_rehash(&mut retries)
    }

    /// Double the usable capacity (at least `neighborhood_size`) and rehash
    pub fn double_size_and_rehash(&mut self) -> Result<()> {
        self.double_size()?;
        if self.rehash_pass(true) {
            return Ok(());
        }
        let mut retries = 0;
        self.grow_and_rehash(&mut retries)
    }

    /// Rehash in place, then look up `key`
    pub fn rehash_and_find(&mut self, key: &T) -> Result<Option<usize>> {
        self.rehash()?;
        Ok(self.find_position(key))
    }

    /// Resize all slot arrays to exactly `capacity`, zero-filling new slots
    fn resize_storage(&mut self, capacity: usize) -> Result<()> {
        let old = self.usable_capacity();

        // Reserve everything first so a failed allocation leaves equal lengths
        self.slots.reserve(capacity)?;
        self.hop_info.reserve(capacity)?;
        if let Some(cache) = self.hash_cache.as_mut() {
            cache.reserve(capacity)?;
        }

        self.slots.grow_to_size(capacity)?;
        self.hop_info.grow_to_size(capacity)?;
        if let Some(cache) = self.hash_cache.as_mut() {
            cache.grow_to_size(capacity)?;
        }

        if old == 0 {
            log::debug!(
                "created hopscotch table: {} slots, neighborhood {}, hash cache {}",
                capacity,
                self.neighborhood(),
                self.hash_cache.is_some()
            );
        }
        Ok(())
    }

    fn double_size(&mut self) -> Result<()> {
        let old = self.usable_capacity();
        let new = old
            .checked_mul(2)
            .ok_or_else(|| FatBufError::capacity_overflow(old, mem::size_of::<T>()))?
            .max(self.neighborhood());
        self.resize_storage(new)?;
        log::debug!("hopscotch table grew: {} -> {} slots", old, new);
        Ok(())
    }

    /// Double and rehash until every entry fits, spending from `retries`.
    fn grow_and_rehash(&mut self, retries: &mut usize) -> Result<()> {
        loop {
            if *retries >= self.config.max_fail_retries {
                log::warn!(
                    "hopscotch rehash gave up after {} resize attempts at {} slots",
                    retries,
                    self.usable_capacity()
                );
                return Err(FatBufError::rehash_failed(*retries));
            }
            *retries += 1;
            self.double_size()?;
            if self.rehash_pass(true) {
                return Ok(());
            }
        }
    }

    /// Recompute the hash of slot `index`, refreshing the cache if present
    fn refresh_hash(&mut self, index: usize) -> usize {
        let hash = self.hash_of(&self.slots[index]);
        if let Some(cache) = self.hash_cache.as_mut() {
            cache[index] = hash;
        }
        hash
    }

    /// Move the live entry at `from` into the free slot `to`
    fn move_entry(&mut self, from: usize, to: usize) {
        let (src, dst) = pair_mut(self.slots.as_mut_slice(), from, to);
        self.strategy
            .swap(bytemuck::bytes_of_mut(src), bytemuck::bytes_of_mut(dst));
        self.hop_info[from] &= !OCCUPIED_BIT;
        self.hop_info[to] |= OCCUPIED_BIT;
        if let Some(cache) = self.hash_cache.as_mut() {
            cache.swap(from, to);
        }
    }

    /// One rehash sweep; false when some entry found no free slot.
    ///
    /// After a doubling (`growing`), odd live slots of the first half move to
    /// their mirror in the second half to break up clusters.
    fn rehash_pass(&mut self, growing: bool) -> bool {
        let capacity = self.usable_capacity();
        for info in self.hop_info.iter_mut() {
            *info &= OCCUPIED_BIT;
        }

        if growing {
            for index in (1..capacity / 2).step_by(2) {
                let mirror = capacity - 1 - index;
                if self.is_occupied(index) && !self.is_occupied(mirror) {
                    self.move_entry(index, mirror);
                }
            }
        }

        for index in 0..capacity {
            if !self.is_occupied(index) {
                continue;
            }
            let home = self.refresh_hash(index) % capacity;
            let placed = if self.distance(home, index) < self.neighborhood() {
                index
            } else {
                match self.find_empty_spot(home) {
                    Some(empty) => {
                        self.move_entry(index, empty);
                        empty
                    }
                    None => return false,
                }
            };
            let offset = self.distance(home, placed);
            self.hop_info[home] |= 1 << offset;
        }
        true
    }

    /// Verify the occupancy and neighborhood invariants of every slot
    pub fn check_invariants(&self) -> Result<()> {
        let capacity = self.usable_capacity();
        let neighborhood = self.neighborhood().min(capacity);

        for index in 0..capacity {
            if self.is_occupied(index) {
                let hash = self.hash_of(&self.slots[index]);
                if let Some(cache) = &self.hash_cache {
                    if cache[index] != hash {
                        return Err(FatBufError::invalid_data(format!(
                            "slot {} caches a stale hash",
                            index
                        )));
                    }
                }
                let home = hash % capacity;
                let offset = self.distance(home, index);
                if offset >= neighborhood {
                    return Err(FatBufError::invalid_data(format!(
                        "slot {} lies {} slots past its home {}",
                        index, offset, home
                    )));
                }
                if self.hop_info[home] & (1 << offset) == 0 {
                    return Err(FatBufError::invalid_data(format!(
                        "home {} does not record offset {}",
                        home, offset
                    )));
                }
            }

            let bits = self.hop_info[index] & NEIGHBORHOOD_BITS;
            if bits >> neighborhood != 0 {
                return Err(FatBufError::invalid_data(format!(
                    "home {} records offsets outside its neighborhood",
                    index
                )));
            }
            for offset in (0..neighborhood).filter(|&o| bits & (1 << o) != 0) {
                let slot = (index + offset) % capacity;
                let homed_here = self.is_occupied(slot)
                    && self.hash_of(&self.slots[slot]) % capacity == index;
                if !homed_here {
                    return Err(FatBufError::invalid_data(format!(
                        "home {} records offset {} without an entry",
                        index, offset
                    )));
                }
            }
        }
        Ok(())
    }
}

impl<T: Pod, S: HashStrategy> Tagged for HopscotchTable<T, S> {
    fn tag(&self) -> Option<Tag> {
        self.slots.tag()
    }

    /// Live entries, not slots
    fn length(&self) -> usize {
        self.len()
    }
}

impl<T: Pod> Default for HopscotchTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Pod + fmt::Debug, S: HashStrategy> fmt::Debug for HopscotchTable<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Iterator over the live entries of a [`HopscotchTable`]
pub struct Iter<'a, T> {
    slots: &'a [T],
    hop_info: &'a [u32],
    index: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.slots.len() {
            let index = self.index;
            self.index += 1;
            if self.hop_info[index] & OCCUPIED_BIT != 0 {
                return Some(&self.slots[index]);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.slots.len() - self.index))
    }
}

impl<'a, T: Pod, S: HashStrategy> IntoIterator for &'a HopscotchTable<T, S> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{length_of, tag_of};
    use bytemuck::Zeroable;
    use std::cell::Cell;

    #[repr(C)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
    struct Pair {
        key: u32,
        value: u32,
    }

    /// Hashes and compares only the key half of a `Pair`
    struct KeyOnly;

    impl HashStrategy for KeyOnly {
        fn hash(&self, bytes: &[u8]) -> usize {
            Fnv1a.hash(&bytes[..4])
        }

        fn equal(&self, a: &[u8], b: &[u8]) -> bool {
            a[..4] == b[..4]
        }
    }

    /// Returns whatever hash the test sets
    struct Fixed(Cell<usize>);

    impl HashStrategy for Fixed {
        fn hash(&self, _bytes: &[u8]) -> usize {
            self.0.get()
        }
    }

    fn small_config(neighborhood: usize, retries: usize) -> HashTableConfig {
        HashTableConfig::builder()
            .neighborhood_size(neighborhood)
            .max_fail_retries(retries)
            .build()
            .unwrap()
    }

    #[test]
    fn test_new_table_is_empty() {
        let table: HopscotchTable<u32> = HopscotchTable::new();
        assert_eq!(table.usable_capacity(), 0);
        assert_eq!(table.len(), 0);
        assert!(table.is_empty());
        assert_eq!(table.tag(), None);
        assert_eq!(table.load_factor(), 0.0);
        assert!(table.find(&1).is_none());
        assert!(table.check_invariants().is_ok());
    }

    #[test]
    fn test_insert_and_find() {
        let mut table = HopscotchTable::new();
        table.insert(5i32).unwrap();
        table.insert(6i32).unwrap();

        assert_eq!(table.usable_capacity(), 8);
        assert_eq!(table.tag(), Some(Tag::HashTable));
        assert_eq!(table.find(&5), Some(&5));
        assert_eq!(table.find(&6), Some(&6));
        assert!(table.find(&4).is_none());
        assert!(table.contains(&5));
        assert_eq!(table.len(), 2);
        assert!(table.check_invariants().is_ok());
    }

    #[test]
    fn test_insert_returns_slot() {
        let mut table = HopscotchTable::new();
        let index = table.insert(42u64).unwrap();
        assert!(table.is_occupied(index));
        assert_eq!(table.slot(index), Some(&42));
        assert_eq!(table.find_position(&42), Some(index));

        let home = table.home_bucket(table.hash_of(&42));
        let offset = (index + table.usable_capacity() - home) % table.usable_capacity();
        assert_ne!(table.hop_info(home) & (1 << offset), 0);
    }

    #[test]
    fn test_growth_keeps_entries() {
        let mut table = HopscotchTable::with_config(small_config(4, 8)).unwrap();
        for i in 0..200u64 {
            table.insert(i).unwrap();
        }
        assert!(table.usable_capacity() >= 200);
        assert!(table.usable_capacity().is_power_of_two());
        for i in 0..200u64 {
            assert_eq!(table.find(&i), Some(&i), "lost {}", i);
        }
        assert_eq!(table.len(), 200);
        table.check_invariants().unwrap();
    }

    #[test]
    fn test_hash_cache() {
        let config = HashTableConfig::builder().store_hashes(true).build().unwrap();
        let mut table = HopscotchTable::with_config(config).unwrap();
        for i in 0..64u32 {
            table.insert(i * 7).unwrap();
        }
        table.check_invariants().unwrap();
        for i in 0..64u32 {
            assert!(table.contains(&(i * 7)));
        }
        assert!(!table.contains(&1));

        table.rehash().unwrap();
        table.check_invariants().unwrap();
        assert_eq!(table.len(), 64);
    }

    #[test]
    fn test_rehash_refreshes_cached_hashes() {
        let cached = HashTableConfig::builder().store_hashes(true).build().unwrap();
        for config in [HashTableConfig::default(), cached] {
            let mut table = HopscotchTable::with_config(config).unwrap();
            table.insert(5u32).unwrap();
            *table.find_mut(&5).unwrap() = 77;

            table.rehash().unwrap();
            assert!(table.contains(&77), "store_hashes = {}", config.store_hashes);
            assert!(!table.contains(&5));
            table.check_invariants().unwrap();
        }
    }

    #[test]
    fn test_tagged_introspection() {
        let mut table = HopscotchTable::new();
        assert_eq!(tag_of(&table), None);
        assert_eq!(length_of(&table), 0);

        for key in 0..20u16 {
            table.insert(key).unwrap();
        }
        table.remove(&3);
        assert_eq!(tag_of(&table), Some(Tag::HashTable));
        assert_eq!(length_of(&table), 19);
        assert!(!Tagged::is_empty(&table));
    }

    #[test]
    fn test_insert_or_replace_on_key_subset() {
        let mut table = HopscotchTable::with_strategy(KeyOnly);
        let first = table.insert_or_replace(Pair { key: 1, value: 10 }).unwrap();
        let second = table.insert_or_replace(Pair { key: 1, value: 20 }).unwrap();
        table.insert_or_replace(Pair { key: 2, value: 30 }).unwrap();

        assert_eq!(first, second);
        assert_eq!(table.len(), 2);
        let found = table.find(&Pair { key: 1, value: 0 }).unwrap();
        assert_eq!(found.value, 20);

        table.find_mut(&Pair { key: 2, value: 0 }).unwrap().value = 31;
        assert_eq!(table.find(&Pair { key: 2, value: 0 }).unwrap().value, 31);
        table.check_invariants().unwrap();
    }

    #[test]
    fn test_remove() {
        let mut table = HopscotchTable::from_slice(&[1u32, 2, 3, 4, 5]).unwrap();
        assert_eq!(table.remove(&3), Some(3));
        assert_eq!(table.remove(&3), None);
        assert!(!table.contains(&3));
        assert_eq!(table.len(), 4);
        table.check_invariants().unwrap();

        table.insert(3).unwrap();
        assert!(table.contains(&3));
        table.check_invariants().unwrap();
    }

    #[test]
    fn test_from_array() {
        let array = DynArray::from_slice(&[1i32, 3, 5, 2, 7]).unwrap();
        let table = HopscotchTable::from_array(array).unwrap();
        for value in [1, 3, 5, 2, 7] {
            assert!(table.contains(&value));
        }
        assert!(!table.contains(&4));

        let more = DynArray::from_slice(&[4i32, 6]).unwrap();
        let table = HopscotchTable::from_array_with_existing(table, more).unwrap();
        assert!(table.contains(&4));
        assert!(table.contains(&7));
        assert_eq!(table.len(), 7);
    }

    #[test]
    fn test_insert_failure_is_recoverable() {
        let mut table = HopscotchTable::with_config(small_config(1, 0)).unwrap();
        table.insert(1u8).unwrap();
        assert_eq!(table.usable_capacity(), 1);

        let err = table.insert(2u8).unwrap_err();
        assert!(matches!(err, FatBufError::InsertFailed { retries: 0 }));
        assert!(err.is_recoverable());
        assert!(table.contains(&1));
    }

    #[test]
    fn test_retry_budget_caps_growth() {
        let strategy = Fixed(Cell::new(0));
        let mut table =
            HopscotchTable::with_config_and_strategy(small_config(2, 2), strategy).unwrap();
        table.insert(1u16).unwrap();
        table.insert(2u16).unwrap();

        // Every entry shares home 0, so a third never fits
        let err = table.insert(3u16).unwrap_err();
        assert!(matches!(err, FatBufError::InsertFailed { retries: 2 }));
        assert_eq!(table.usable_capacity(), 8);
        assert!(table.contains(&1));
        assert!(table.contains(&2));
    }

    #[test]
    fn test_rehash_failure() {
        let mut table =
            HopscotchTable::with_config_and_strategy(small_config(1, 0), Fixed(Cell::new(0)))
                .unwrap();
        table.reserve(2).unwrap();
        assert_eq!(table.insert(10u8).unwrap(), 0);
        table.strategy().0.set(1);
        assert_eq!(table.insert(20u8).unwrap(), 1);

        // Both entries now claim home 0 with a one-slot neighborhood
        table.strategy().0.set(0);
        let err = table.rehash().unwrap_err();
        assert!(matches!(err, FatBufError::RehashFailed { retries: 0 }));
        assert_eq!(err.category(), "hash_table");
    }

    #[test]
    fn test_double_size_and_rehash() {
        let mut table = HopscotchTable::from_slice(&[10u32, 20, 30]).unwrap();
        let before = table.usable_capacity();
        table.double_size_and_rehash().unwrap();
        assert_eq!(table.usable_capacity(), before * 2);
        assert_eq!(table.rehash_and_find(&20).unwrap(), table.find_position(&20));
        assert!(table.contains(&10));
        table.check_invariants().unwrap();

        let mut empty: HopscotchTable<u32> = HopscotchTable::new();
        empty.double_size_and_rehash().unwrap();
        assert_eq!(empty.usable_capacity(), 8);
    }

    #[test]
    fn test_with_capacity() {
        let table: HopscotchTable<u64> = HopscotchTable::with_capacity(100).unwrap();
        assert_eq!(table.usable_capacity(), 100);

        let tiny: HopscotchTable<u64> = HopscotchTable::with_capacity(2).unwrap();
        assert_eq!(tiny.usable_capacity(), 8);
    }

    #[test]
    fn test_clear_free_and_iter() {
        let mut table = HopscotchTable::from_slice(&[3u8, 1, 2]).unwrap();
        let mut seen: Vec<u8> = table.iter().copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2, 3]);

        let capacity = table.usable_capacity();
        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.usable_capacity(), capacity);
        assert!(!table.contains(&1));

        table.insert(9).unwrap();
        assert_eq!((&table).into_iter().count(), 1);

        table.free();
        assert_eq!(table.usable_capacity(), 0);
        table.insert(4).unwrap();
        assert!(table.contains(&4));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = HashTableConfig {
            neighborhood_size: 40,
            ..HashTableConfig::default()
        };
        assert!(HopscotchTable::<u32>::with_config(config).is_err());
    }

    #[test]
    fn test_ahash_strategy() {
        let mut table = HopscotchTable::with_strategy(crate::hash_map::AHashStrategy::new());
        for i in 0..100u32 {
            table.insert(i).unwrap();
        }
        for i in 0..100u32 {
            assert!(table.contains(&i));
        }
        table.check_invariants().unwrap();
    }
}
