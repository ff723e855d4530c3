//! BinHashMap: power-of-2 hash table with chain and tree bins
//!
//! Each bucket is an explicit state machine: `Empty`, a `Chain` of entries
//! scanned linearly, or a red-black tree bin once a single bucket
//! degenerates. A chain reaching [`TREEIFY_THRESHOLD`] entries
//! converts to a tree only when the table already holds
//! [`MIN_TREEIFY_CAPACITY`] bins; below that the table resizes instead,
//! since growth usually disperses the collisions for free. A tree bin whose
//! count falls to [`UNTREEIFY_THRESHOLD`] demotes back to a chain.
//!
//! Hashing runs through the build-hasher (ahash by default) and then
//! `spread`, which folds high bits down so the power-of-2 mask sees them.

mod tree_bin;

use crate::cursor::Revision;
use crate::error::{CofferError, Result};
use crate::io::{DataInput, DataOutput, Persist};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::mem;
use tree_bin::{TreeBin, NIL};

/// Chain length at which a bucket becomes a tree (if the table is large)
pub const TREEIFY_THRESHOLD: usize = 8;
/// Tree count at or below which a tree bin demotes to a chain
pub const UNTREEIFY_THRESHOLD: usize = 6;
/// Minimum table capacity for treeification; smaller tables resize instead
pub const MIN_TREEIFY_CAPACITY: usize = 64;
/// Hard cap on the number of bins
pub const MAX_CAPACITY: usize = 1 << 30;

const DEFAULT_CAPACITY: usize = 16;
const DEFAULT_LOAD_FACTOR: f64 = 0.75;

/// Fold the high hash bits into the low ones the bin mask actually uses
#[inline]
fn spread(h: u64) -> u64 {
    h ^ (h >> 16)
}

/// Construction parameters for [`BinHashMap`]
#[derive(Debug, Clone, Copy)]
pub struct BinHashMapConfig {
    /// Rounded up to a power of two, at least 1, capped at [`MAX_CAPACITY`]
    pub initial_capacity: usize,
    /// Resize when `len > capacity * load_factor`; must be finite and > 0
    pub load_factor: f64,
}

impl Default for BinHashMapConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_CAPACITY,
            load_factor: DEFAULT_LOAD_FACTOR,
        }
    }
}

pub(crate) struct Entry<K, V> {
    pub(crate) hash: u64,
    pub(crate) key: K,
    pub(crate) value: V,
}

impl<K: Clone, V: Clone> Clone for Entry<K, V> {
    fn clone(&self) -> Self {
        Self {
            hash: self.hash,
            key: self.key.clone(),
            value: self.value.clone(),
        }
    }
}

enum Bin<K, V> {
    Empty,
    Chain(Vec<Entry<K, V>>),
    Tree(TreeBin<K, V>),
}

impl<K: Clone, V: Clone> Clone for Bin<K, V> {
    fn clone(&self) -> Self {
        match self {
            Bin::Empty => Bin::Empty,
            Bin::Chain(entries) => Bin::Chain(entries.clone()),
            Bin::Tree(tree) => Bin::Tree(tree.clone()),
        }
    }
}

/// Hash table with chain bins that escalate to red-black tree bins.
///
/// # Examples
///
/// ```rust
/// use coffer::BinHashMap;
///
/// let mut map = BinHashMap::new();
/// map.put("one", 1);
/// map.put("two", 2);
///
/// assert_eq!(map.get(&"one"), Some(&1));
/// assert_eq!(map.put("one", 10), Some(1));
/// assert_eq!(map.remove(&"two"), Some(2));
/// ```
pub struct BinHashMap<K, V, S = ahash::RandomState> {
    bins: Vec<Bin<K, V>>,
    len: usize,
    threshold: usize,
    load_factor: f64,
    rev: Revision,
    hasher: S,
}

impl<K, V> BinHashMap<K, V, ahash::RandomState> {
    /// Create an empty map with the default capacity and load factor
    pub fn new() -> Self {
        Self::from_parts(
            DEFAULT_CAPACITY,
            DEFAULT_LOAD_FACTOR,
            ahash::RandomState::default(),
        )
    }

    /// Create an empty map sized for `capacity` entries before resizing
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::with_config(BinHashMapConfig {
            initial_capacity: capacity,
            ..BinHashMapConfig::default()
        })
    }
}

impl<K, V, S: BuildHasher + Default> BinHashMap<K, V, S> {
    /// Create an empty map from a validated configuration
    pub fn with_config(config: BinHashMapConfig) -> Result<Self> {
        Self::with_config_and_hasher(config, S::default())
    }
}

impl<K, V, S: BuildHasher> BinHashMap<K, V, S> {
    /// Create an empty map from a validated configuration and a hasher
    pub fn with_config_and_hasher(config: BinHashMapConfig, hasher: S) -> Result<Self> {
        if !config.load_factor.is_finite() || config.load_factor <= 0.0 {
            return Err(CofferError::invalid_argument(format!(
                "load factor must be finite and positive, got {}",
                config.load_factor
            )));
        }
        let capacity = config
            .initial_capacity
            .max(1)
            .next_power_of_two()
            .min(MAX_CAPACITY);
        Ok(Self::from_parts(capacity, config.load_factor, hasher))
    }

    fn from_parts(capacity: usize, load_factor: f64, hasher: S) -> Self {
        debug_assert!(capacity.is_power_of_two());
        Self {
            bins: (0..capacity).map(|_| Bin::Empty).collect(),
            len: 0,
            threshold: threshold_for(capacity, load_factor),
            load_factor,
            rev: Revision::new(),
            hasher,
        }
    }
}

fn threshold_for(capacity: usize, load_factor: f64) -> usize {
    if capacity >= MAX_CAPACITY {
        usize::MAX
    } else {
        (capacity as f64 * load_factor) as usize
    }
}

impl<K, V, S> BinHashMap<K, V, S> {
    /// Number of entries
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the map is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current number of bins
    #[inline]
    pub fn capacity(&self) -> usize {
        self.bins.len()
    }

    /// Live structural revision
    #[inline]
    pub fn revision(&self) -> u64 {
        self.rev.get()
    }

    /// Iterate all entries; order is arbitrary but stable between
    /// structural mutations
    pub fn iter(&self) -> MapIter<'_, K, V> {
        MapIter {
            bins: &self.bins,
            bin: 0,
            offset: 0,
            tree_at: None,
        }
    }

    /// Iterate all keys
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(k, _)| k)
    }

    /// Iterate all values
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }

    /// Detached fail-fast cursor over the entries
    pub fn cursor(&self) -> MapCursor {
        MapCursor {
            bin: 0,
            offset: 0,
            last: None,
            rev: self.rev.get(),
        }
    }

    /// Drop all entries, keeping the bin array
    pub fn clear(&mut self) {
        if self.len == 0 {
            return;
        }
        for bin in &mut self.bins {
            *bin = Bin::Empty;
        }
        self.len = 0;
        self.rev.bump();
    }

    fn bin_count(&self, idx: usize) -> usize {
        match &self.bins[idx] {
            Bin::Empty => 0,
            Bin::Chain(entries) => entries.len(),
            Bin::Tree(tree) => tree.len(),
        }
    }

    fn pair_at(&self, idx: usize, offset: usize) -> (&K, &V) {
        match &self.bins[idx] {
            Bin::Chain(entries) => {
                let e = &entries[offset];
                (&e.key, &e.value)
            }
            Bin::Tree(tree) => {
                let mut at = tree.head();
                for _ in 0..offset {
                    at = tree.next_of(at);
                }
                tree.key_value(at)
            }
            Bin::Empty => unreachable!("cursor offset into an empty bin"),
        }
    }

    /// Remove the `offset`-th entry of bin `idx` (cursor removal)
    fn remove_at_position(&mut self, idx: usize, offset: usize) -> V {
        let bin = &mut self.bins[idx];
        let value = match bin {
            Bin::Chain(entries) => {
                let e = entries.remove(offset);
                if entries.is_empty() {
                    *bin = Bin::Empty;
                }
                e.value
            }
            Bin::Tree(tree) => {
                let mut at = tree.head();
                for _ in 0..offset {
                    at = tree.next_of(at);
                }
                let (_, value) = tree.remove_at(at);
                if tree.len() <= UNTREEIFY_THRESHOLD {
                    untreeify(bin);
                }
                value
            }
            Bin::Empty => unreachable!("cursor offset into an empty bin"),
        };
        self.len -= 1;
        self.rev.bump();
        value
    }

    /// Overwrite the `offset`-th entry of bin `idx`; not structural
    fn set_value_at(&mut self, idx: usize, offset: usize, value: V) -> V {
        match &mut self.bins[idx] {
            Bin::Chain(entries) => mem::replace(&mut entries[offset].value, value),
            Bin::Tree(tree) => {
                let mut at = tree.head();
                for _ in 0..offset {
                    at = tree.next_of(at);
                }
                mem::replace(tree.value_mut(at), value)
            }
            Bin::Empty => unreachable!("cursor offset into an empty bin"),
        }
    }

    #[cfg(test)]
    fn bin_kind(&self, idx: usize) -> &'static str {
        match &self.bins[idx] {
            Bin::Empty => "empty",
            Bin::Chain(_) => "chain",
            Bin::Tree(_) => "tree",
        }
    }
}

/// Demote a tree bin to a chain (or to empty), preserving arrival order
fn untreeify<K, V>(bin: &mut Bin<K, V>) {
    if let Bin::Tree(tree) = mem::replace(bin, Bin::Empty) {
        let entries = tree.into_entries();
        if !entries.is_empty() {
            *bin = Bin::Chain(entries);
        }
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> BinHashMap<K, V, S> {
    fn hash_of<Q>(&self, key: &Q) -> u64
    where
        Q: Hash + ?Sized,
    {
        spread(self.hasher.hash_one(key))
    }

    #[inline]
    fn bin_index(&self, hash: u64) -> usize {
        (hash as usize) & (self.bins.len() - 1)
    }

    /// Insert or overwrite, returning the previous value for the key.
    ///
    /// Overwriting is not structural: live cursors survive it. A fresh
    /// insertion bumps the revision and may resize or treeify.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.hash_of(&key);
        let idx = self.bin_index(hash);
        let mut chain_len = 0;
        let bin = &mut self.bins[idx];
        match bin {
            Bin::Empty => {
                *bin = Bin::Chain(vec![Entry { hash, key, value }]);
            }
            Bin::Chain(entries) => {
                for e in entries.iter_mut() {
                    if e.hash == hash && e.key == key {
                        return Some(mem::replace(&mut e.value, value));
                    }
                }
                entries.push(Entry { hash, key, value });
                chain_len = entries.len();
            }
            Bin::Tree(tree) => {
                if let Some(old) = tree.insert(hash, key, value) {
                    return Some(old);
                }
            }
        }
        self.len += 1;
        self.rev.bump();

        if chain_len >= TREEIFY_THRESHOLD {
            if self.bins.len() < MIN_TREEIFY_CAPACITY {
                self.resize();
            } else {
                self.treeify(idx);
            }
        }
        if self.len > self.threshold {
            self.resize();
        }
        None
    }

    /// Look up a value by key
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_of(key);
        match &self.bins[self.bin_index(hash)] {
            Bin::Empty => None,
            Bin::Chain(entries) => entries
                .iter()
                .find(|e| e.hash == hash && e.key.borrow() == key)
                .map(|e| &e.value),
            Bin::Tree(tree) => tree.find(hash, key).map(|at| tree.key_value(at).1),
        }
    }

    /// Look up a value mutably by key; in-place edits are not structural
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_of(key);
        let idx = self.bin_index(hash);
        match &mut self.bins[idx] {
            Bin::Empty => None,
            Bin::Chain(entries) => entries
                .iter_mut()
                .find(|e| e.hash == hash && e.key.borrow() == key)
                .map(|e| &mut e.value),
            Bin::Tree(tree) => tree
                .find(hash, key)
                .map(move |at| tree.value_mut(at)),
        }
    }

    /// True if the key is present
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Remove a key, returning its value if it was present
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_of(key);
        let idx = self.bin_index(hash);
        let bin = &mut self.bins[idx];
        let removed = match bin {
            Bin::Empty => None,
            Bin::Chain(entries) => {
                let pos = entries
                    .iter()
                    .position(|e| e.hash == hash && e.key.borrow() == key)?;
                let e = entries.remove(pos);
                if entries.is_empty() {
                    *bin = Bin::Empty;
                }
                Some(e.value)
            }
            Bin::Tree(tree) => {
                let at = tree.find(hash, key)?;
                let (_, value) = tree.remove_at(at);
                if tree.len() <= UNTREEIFY_THRESHOLD {
                    untreeify(bin);
                }
                Some(value)
            }
        };
        if removed.is_some() {
            self.len -= 1;
            self.rev.bump();
        }
        removed
    }

    /// Insert every pair from an iterator
    pub fn put_all<I: IntoIterator<Item = (K, V)>>(&mut self, pairs: I) {
        for (k, v) in pairs {
            self.put(k, v);
        }
    }

    /// Convert the chain at `idx` into a tree bin, preserving arrival order
    fn treeify(&mut self, idx: usize) {
        let bin = &mut self.bins[idx];
        if let Bin::Chain(entries) = mem::replace(bin, Bin::Empty) {
            let mut tree = TreeBin::new();
            for e in entries {
                tree.insert(e.hash, e.key, e.value);
            }
            *bin = Bin::Tree(tree);
        }
    }

    /// Double the table, splitting each bin by the new high bit.
    ///
    /// Entry order within each split half is preserved; tree bins whose
    /// halves fall to [`UNTREEIFY_THRESHOLD`] or fewer entries come back
    /// as chains. Does not bump the revision: the triggering mutation
    /// already did.
    fn resize(&mut self) {
        let old_cap = self.bins.len();
        if old_cap >= MAX_CAPACITY {
            self.threshold = usize::MAX;
            return;
        }
        let new_cap = old_cap * 2;
        let old_bins = mem::replace(
            &mut self.bins,
            (0..new_cap).map(|_| Bin::Empty).collect(),
        );
        for (i, bin) in old_bins.into_iter().enumerate() {
            match bin {
                Bin::Empty => {}
                Bin::Chain(entries) => {
                    let (lo, hi) = split_entries(entries, old_cap);
                    if !lo.is_empty() {
                        self.bins[i] = Bin::Chain(lo);
                    }
                    if !hi.is_empty() {
                        self.bins[i + old_cap] = Bin::Chain(hi);
                    }
                }
                Bin::Tree(tree) => {
                    let (lo, hi) = split_entries(tree.into_entries(), old_cap);
                    self.bins[i] = rebin(lo);
                    self.bins[i + old_cap] = rebin(hi);
                }
            }
        }
        self.threshold = threshold_for(new_cap, self.load_factor);
    }
}

/// Partition by the bit the doubled mask exposes, keeping relative order
fn split_entries<K, V>(
    entries: Vec<Entry<K, V>>,
    old_cap: usize,
) -> (Vec<Entry<K, V>>, Vec<Entry<K, V>>) {
    let mut lo = Vec::new();
    let mut hi = Vec::new();
    for e in entries {
        if (e.hash as usize) & old_cap == 0 {
            lo.push(e);
        } else {
            hi.push(e);
        }
    }
    (lo, hi)
}

/// Rebuild a split tree half at the right representation for its size
fn rebin<K: Hash + Eq, V>(entries: Vec<Entry<K, V>>) -> Bin<K, V> {
    if entries.is_empty() {
        Bin::Empty
    } else if entries.len() <= UNTREEIFY_THRESHOLD {
        Bin::Chain(entries)
    } else {
        let mut tree = TreeBin::new();
        for e in entries {
            tree.insert(e.hash, e.key, e.value);
        }
        Bin::Tree(tree)
    }
}

impl<K: Hash + Eq + Persist, V: Persist, S: BuildHasher> BinHashMap<K, V, S> {
    /// Canonical dump: `[varint capacity][varint len][key value]*`
    pub fn dump<O: DataOutput + ?Sized>(&self, out: &mut O) -> Result<()> {
        out.write_var_int(self.bins.len() as u64)?;
        out.write_var_int(self.len as u64)?;
        for (k, v) in self.iter() {
            k.write_to(out)?;
            v.write_to(out)?;
        }
        Ok(())
    }
}

impl<K: Hash + Eq + Persist, V: Persist, S: BuildHasher + Default> BinHashMap<K, V, S> {
    /// Restore from a canonical dump, re-inserting every pair rather than
    /// trusting the stored bin layout
    pub fn restore<I: DataInput>(input: &mut I) -> Result<Self> {
        let capacity = input.read_var_int()?;
        if capacity == 0 || capacity > MAX_CAPACITY as u64 || !capacity.is_power_of_two() {
            return Err(CofferError::invalid_data(format!(
                "invalid table capacity {}",
                capacity
            )));
        }
        // pairs take at least two bytes each, so the count check holds
        let len = crate::containers::read_checked_len(input)?;
        let mut map = Self::with_config(BinHashMapConfig {
            initial_capacity: capacity as usize,
            ..BinHashMapConfig::default()
        })?;
        for _ in 0..len {
            let key = K::read_from(input)?;
            let value = V::read_from(input)?;
            map.put(key, value);
        }
        Ok(map)
    }
}

impl<K: Hash, V: Hash, S> BinHashMap<K, V, S> {
    /// Order-insensitive content hash: the wrapping sum of per-entry
    /// `key_hash ^ value_hash`
    pub fn content_hash(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::Hasher;
        let mut total: u64 = 0;
        for (k, v) in self.iter() {
            let mut hk = DefaultHasher::new();
            k.hash(&mut hk);
            let mut hv = DefaultHasher::new();
            v.hash(&mut hv);
            total = total.wrapping_add(hk.finish() ^ hv.finish());
        }
        total
    }
}

impl<K: Hash + Eq, V, S: BuildHasher + Default> Default for BinHashMap<K, V, S> {
    fn default() -> Self {
        Self::from_parts(DEFAULT_CAPACITY, DEFAULT_LOAD_FACTOR, S::default())
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for BinHashMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S> PartialEq for BinHashMap<K, V, S>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K, V, S> Eq for BinHashMap<K, V, S>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
{
}

impl<K: Clone, V: Clone, S: Clone> Clone for BinHashMap<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            bins: self.bins.clone(),
            len: self.len,
            threshold: self.threshold,
            load_factor: self.load_factor,
            rev: self.rev,
            hasher: self.hasher.clone(),
        }
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> Extend<(K, V)> for BinHashMap<K, V, S> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, pairs: I) {
        self.put_all(pairs);
    }
}

impl<K: Hash + Eq, V, S: BuildHasher + Default> FromIterator<(K, V)> for BinHashMap<K, V, S> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(pairs: I) -> Self {
        let mut map = Self::default();
        map.put_all(pairs);
        map
    }
}

impl<'a, K, V, S> IntoIterator for &'a BinHashMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = MapIter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Borrowing iterator over a [`BinHashMap`] in bin order
pub struct MapIter<'a, K, V> {
    bins: &'a [Bin<K, V>],
    bin: usize,
    offset: usize,
    /// `None` until the current tree bin is entered
    tree_at: Option<u32>,
}

impl<'a, K, V> Iterator for MapIter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        loop {
            let bin: &'a Bin<K, V> = self.bins.get(self.bin)?;
            match bin {
                Bin::Empty => {
                    self.bin += 1;
                }
                Bin::Chain(entries) => {
                    if self.offset < entries.len() {
                        let e = &entries[self.offset];
                        self.offset += 1;
                        return Some((&e.key, &e.value));
                    }
                    self.bin += 1;
                    self.offset = 0;
                }
                Bin::Tree(tree) => {
                    let at = *self.tree_at.get_or_insert_with(|| tree.head());
                    if at != NIL {
                        self.tree_at = Some(tree.next_of(at));
                        return Some(tree.key_value(at));
                    }
                    self.bin += 1;
                    self.tree_at = None;
                }
            }
        }
    }
}

/// Detached fail-fast cursor over a [`BinHashMap`].
///
/// Positions are (bin, offset-within-bin) pairs, valid exactly as long as
/// the captured revision matches; any structural mutation not made through
/// this cursor invalidates it.
#[derive(Debug, Clone)]
pub struct MapCursor {
    bin: usize,
    offset: usize,
    last: Option<(usize, usize)>,
    rev: u64,
}

impl MapCursor {
    fn check<K, V, S>(&self, map: &BinHashMap<K, V, S>) -> Result<()> {
        let live = map.rev.get();
        if live != self.rev {
            return Err(CofferError::concurrent_modification(self.rev, live));
        }
        Ok(())
    }

    /// Step to the next entry, or `None` past the last one
    pub fn advance<'a, K, V, S>(
        &mut self,
        map: &'a BinHashMap<K, V, S>,
    ) -> Result<Option<(&'a K, &'a V)>> {
        self.check(map)?;
        while self.bin < map.bins.len() {
            if self.offset < map.bin_count(self.bin) {
                self.last = Some((self.bin, self.offset));
                let pair = map.pair_at(self.bin, self.offset);
                self.offset += 1;
                return Ok(Some(pair));
            }
            self.bin += 1;
            self.offset = 0;
        }
        Ok(None)
    }

    /// Remove the entry last returned, refreshing the captured revision
    pub fn remove_current<K, V, S>(&mut self, map: &mut BinHashMap<K, V, S>) -> Result<V> {
        self.check(map)?;
        let (bin, offset) = self.last.take().ok_or_else(|| {
            CofferError::invalid_argument("remove_current without a current entry")
        })?;
        let value = map.remove_at_position(bin, offset);
        // the successor entry slides into the removed slot
        self.bin = bin;
        self.offset = offset;
        self.rev = map.rev.get();
        Ok(value)
    }

    /// Overwrite the value of the entry last returned; not structural
    pub fn set_current<K, V, S>(&mut self, map: &mut BinHashMap<K, V, S>, value: V) -> Result<V> {
        self.check(map)?;
        let (bin, offset) = self.last.ok_or_else(|| {
            CofferError::invalid_argument("set_current without a current entry")
        })?;
        Ok(map.set_value_at(bin, offset, value))
    }
}
