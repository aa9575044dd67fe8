//! Linear-probing hash map with backward-shift deletion.

use alloc::boxed::Box;
use core::cell::Cell;
use core::fmt::Debug;
use core::marker::PhantomData;
use core::mem;

use crate::capacity;
use crate::capacity::CapacityError;
use crate::capacity::DEFAULT_EXPECTED_ELEMENTS;
use crate::capacity::DEFAULT_LOAD_FACTOR;
use crate::key::IdentityHash;
use crate::key::KeyContainer;
use crate::key::KeyHash;
use crate::key::ScatterHash;
use crate::key::SlotKey;
use crate::key::ValueHash;
use crate::mix::Mixing;
use crate::mix::iteration_increment;
use crate::mix::mix_phi64;
use crate::mix::next_random_seed;

/// A hash map using open addressing with linear probing and tombstone-free
/// (backward-shift) deletion.
///
/// Keys live directly in a flat slot array; a free slot is marked by the
/// key domain's sentinel ([`SlotKey::EMPTY`], zero for numeric keys). The
/// sentinel itself is still a valid key: it is routed to one dedicated
/// side-slot kept outside the probe array.
///
/// The hash/equality hook `H` and the [`Mixing`] strategy are injected at
/// construction; see [`IdentityMap`] and [`ScatterMap`] for the stock
/// variants.
///
/// # Examples
///
/// ```rust
/// use worm_hash::HashMap;
///
/// let mut map: HashMap<u64, &str> = HashMap::new();
/// assert_eq!(map.insert(1, "one"), None);
/// assert_eq!(map.insert(1, "uno"), Some("one"));
/// assert_eq!(map.get(1), Some(&"uno"));
/// assert_eq!(map.remove(1), Some("uno"));
/// assert!(map.is_empty());
/// ```
pub struct HashMap<K, V, H = ValueHash> {
    /// Slot array plus one trailing cell for the sentinel key.
    keys: Box<[K]>,
    /// Values colocated with `keys`, same length.
    values: Box<[V]>,
    /// Occupied slots in the probe array (the side-slot is not counted).
    assigned: usize,
    /// `buffer_size - 1`; buffer sizes are powers of two.
    mask: usize,
    /// Grow once `assigned` reaches this. Always below `buffer_size`, so
    /// at least one slot stays free and probe scans terminate.
    resize_at: usize,
    /// Whether the sentinel key is present (stored in the side-slot).
    has_empty_key: bool,
    /// Per-instance seed folded into every hash; refreshed by `mixing` on
    /// every buffer (re)allocation.
    key_mixer: u64,
    load_factor: f64,
    mixing: Mixing,
    /// Evolving seed for randomized cursor iteration.
    iteration_seed: Cell<u64>,
    _hash: PhantomData<H>,
}

/// Scatter-style map: cheap seedless hashing via [`ScatterHash`].
///
/// **Warning**: scatter containers share one global hash order. Bulk
/// copying keys from one scatter container into another re-inserts them in
/// correlated order and degrades probing toward its quadratic worst case.
/// Only use scatter maps as leaf containers whose keys are never fed from
/// another scatter container, and construct them with [`Mixing::None`] via
/// [`HashMap::with_mixing`].
pub type ScatterMap<K, V> = HashMap<K, V, ScatterHash>;

/// Map over reference keys hashed and compared by identity (address).
pub type IdentityMap<'a, T, V> = HashMap<Option<&'a T>, V, IdentityHash>;

impl<K, V, H> HashMap<K, V, H>
where
    K: SlotKey,
    V: Default,
    H: KeyHash<K>,
{
    /// Creates an empty map sized for a handful of elements.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EXPECTED_ELEMENTS)
    }

    /// Creates an empty map that can hold `expected` elements without
    /// reallocating.
    pub fn with_capacity(expected: usize) -> Self {
        Self::with_options(expected, DEFAULT_LOAD_FACTOR, Mixing::default())
    }

    /// Creates an empty map with an explicit hash-order [`Mixing`]
    /// strategy.
    pub fn with_mixing(mixing: Mixing) -> Self {
        Self::with_options(DEFAULT_EXPECTED_ELEMENTS, DEFAULT_LOAD_FACTOR, mixing)
    }

    /// Creates an empty map with full control over the capacity hint, the
    /// load factor, and the mixing strategy.
    ///
    /// # Panics
    ///
    /// Panics if `load_factor` is outside `[0.01, 0.99]`, or if `expected`
    /// needs a buffer beyond [`capacity::MAX_BUFFER_SIZE`].
    pub fn with_options(expected: usize, load_factor: f64, mixing: Mixing) -> Self {
        let load_factor = capacity::check_load_factor(load_factor);
        let buffer_size = match capacity::min_buffer_size(expected, load_factor) {
            Ok(size) => size,
            Err(err) => panic!("{err}"),
        };
        let (keys, values) = Self::allocate(buffer_size);
        Self {
            keys,
            values,
            assigned: 0,
            mask: buffer_size - 1,
            resize_at: capacity::expand_at(buffer_size, load_factor),
            has_empty_key: false,
            key_mixer: mixing.new_key_mixer(buffer_size),
            load_factor,
            mixing,
            iteration_seed: Cell::new(next_random_seed()),
            _hash: PhantomData,
        }
    }

    /// Allocates key/value buffers of `buffer_size + 1` cells; the extra
    /// cell is the sentinel-key side-slot.
    fn allocate(buffer_size: usize) -> (Box<[K]>, Box<[V]>) {
        let keys = alloc::vec![K::EMPTY; buffer_size + 1].into_boxed_slice();
        let values = (0..=buffer_size).map(|_| V::default()).collect();
        (keys, values)
    }

    /// Number of entries in the map.
    pub fn len(&self) -> usize {
        self.assigned + usize::from(self.has_empty_key)
    }

    /// Returns `true` if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries the map can hold before its next growth.
    pub fn capacity(&self) -> usize {
        self.resize_at
    }

    #[inline(always)]
    fn hash_slot(&self, key: K) -> usize {
        (H::mix(key, self.key_mixer) as usize) & self.mask
    }

    #[inline(always)]
    fn empty_cell(&self) -> usize {
        self.mask + 1
    }

    /// Probes for a non-sentinel key, returning its slot.
    fn find_slot(&self, key: K) -> Option<usize> {
        debug_assert!(!key.is_empty());
        let mut slot = self.hash_slot(key);
        loop {
            let existing = self.keys[slot];
            if existing.is_empty() {
                return None;
            }
            if H::eq(existing, key) {
                return Some(slot);
            }
            slot = (slot + 1) & self.mask;
        }
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key(&self, key: K) -> bool {
        if key.is_empty() {
            self.has_empty_key
        } else {
            self.find_slot(key).is_some()
        }
    }

    /// Returns a reference to the value stored for `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use worm_hash::HashMap;
    ///
    /// let mut map: HashMap<u32, u32> = HashMap::new();
    /// map.insert(7, 70);
    /// assert_eq!(map.get(7), Some(&70));
    /// assert_eq!(map.get(8), None);
    /// ```
    pub fn get(&self, key: K) -> Option<&V> {
        if key.is_empty() {
            self.has_empty_key.then(|| &self.values[self.empty_cell()])
        } else {
            self.find_slot(key).map(|slot| &self.values[slot])
        }
    }

    /// Returns a mutable reference to the value stored for `key`.
    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        if key.is_empty() {
            if self.has_empty_key {
                let cell = self.empty_cell();
                Some(&mut self.values[cell])
            } else {
                None
            }
        } else {
            match self.find_slot(key) {
                Some(slot) => Some(&mut self.values[slot]),
                None => None,
            }
        }
    }

    /// Returns a copy of the value stored for `key`, or `default` if the
    /// key is absent.
    pub fn get_or_default(&self, key: K, default: V) -> V
    where
        V: Clone,
    {
        self.get(key).cloned().unwrap_or(default)
    }

    /// Inserts `key → value`, returning the previous value if the key was
    /// already present.
    ///
    /// # Panics
    ///
    /// Panics if growth would exceed the maximum representable buffer
    /// size; see [`try_ensure_capacity`](Self::try_ensure_capacity) for a
    /// fallible way to pre-size the map.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if key.is_empty() {
            let cell = self.empty_cell();
            let previous = mem::replace(&mut self.values[cell], value);
            if self.has_empty_key {
                return Some(previous);
            }
            self.has_empty_key = true;
            return None;
        }

        let mut slot = self.hash_slot(key);
        loop {
            let existing = self.keys[slot];
            if existing.is_empty() {
                break;
            }
            if H::eq(existing, key) {
                return Some(mem::replace(&mut self.values[slot], value));
            }
            slot = (slot + 1) & self.mask;
        }

        if self.assigned == self.resize_at {
            if let Err(err) = self.allocate_then_insert_then_rehash(slot, key, value) {
                panic!("{err}");
            }
        } else {
            self.keys[slot] = key;
            self.values[slot] = value;
        }
        self.assigned += 1;
        None
    }

    /// Removes `key`, returning its value if it was present.
    pub fn remove(&mut self, key: K) -> Option<V> {
        if key.is_empty() {
            if !self.has_empty_key {
                return None;
            }
            self.has_empty_key = false;
            let cell = self.empty_cell();
            Some(mem::take(&mut self.values[cell]))
        } else {
            self.find_slot(key)
                .map(|slot| self.shift_conflicting_keys(slot))
        }
    }

    /// Backward-shift deletion: closes the gap at `gap_slot` by pulling
    /// back every later probe-chain entry that is at least as far from its
    /// home slot as the gap, so no tombstones are ever needed.
    fn shift_conflicting_keys(&mut self, mut gap_slot: usize) -> V {
        let mask = self.mask;
        let removed = mem::take(&mut self.values[gap_slot]);
        let mut distance = 0;
        loop {
            distance += 1;
            let slot = (gap_slot + distance) & mask;
            let existing = self.keys[slot];
            if existing.is_empty() {
                break;
            }
            let home = self.hash_slot(existing);
            if slot.wrapping_sub(home) & mask >= distance {
                self.keys[gap_slot] = existing;
                self.values[gap_slot] = mem::take(&mut self.values[slot]);
                gap_slot = slot;
                distance = 0;
            }
        }
        self.keys[gap_slot] = K::EMPTY;
        self.assigned -= 1;
        removed
    }

    /// Grows the buffers, writing the pending entry into the *old* buffer
    /// before rehashing. If allocation of the doubled buffer fails the map
    /// has not been touched; once it succeeds the pending entry cannot be
    /// lost, because only infallible work remains.
    fn allocate_then_insert_then_rehash(
        &mut self,
        slot: usize,
        key: K,
        value: V,
    ) -> Result<(), CapacityError> {
        let new_size = capacity::next_buffer_size(self.mask + 1)?;
        let (new_keys, new_values) = Self::allocate(new_size);
        let mut old_keys = mem::replace(&mut self.keys, new_keys);
        let mut old_values = mem::replace(&mut self.values, new_values);
        self.mask = new_size - 1;
        self.resize_at = capacity::expand_at(new_size, self.load_factor);
        self.key_mixer = self.mixing.new_key_mixer(new_size);

        old_keys[slot] = key;
        old_values[slot] = value;
        self.rehash(&old_keys, &mut old_values);
        Ok(())
    }

    /// Re-homes every entry of the old buffers into the already swapped-in
    /// new buffers.
    fn rehash(&mut self, from_keys: &[K], from_values: &mut [V]) {
        if self.has_empty_key {
            let cell = self.empty_cell();
            self.values[cell] = mem::take(&mut from_values[from_values.len() - 1]);
        }
        for index in 0..from_keys.len() - 1 {
            let key = from_keys[index];
            if key.is_empty() {
                continue;
            }
            let mut slot = self.hash_slot(key);
            while !self.keys[slot].is_empty() {
                slot = (slot + 1) & self.mask;
            }
            self.keys[slot] = key;
            self.values[slot] = mem::take(&mut from_values[index]);
        }
    }

    fn rehash_to(&mut self, new_size: usize) {
        let (new_keys, new_values) = Self::allocate(new_size);
        let old_keys = mem::replace(&mut self.keys, new_keys);
        let mut old_values = mem::replace(&mut self.values, new_values);
        self.mask = new_size - 1;
        self.resize_at = capacity::expand_at(new_size, self.load_factor);
        self.key_mixer = self.mixing.new_key_mixer(new_size);
        self.rehash(&old_keys, &mut old_values);
    }

    /// Makes room for at least `expected` total entries.
    ///
    /// # Panics
    ///
    /// Panics on capacity exhaustion; see
    /// [`try_ensure_capacity`](Self::try_ensure_capacity).
    pub fn ensure_capacity(&mut self, expected: usize) {
        if let Err(err) = self.try_ensure_capacity(expected) {
            panic!("{err}");
        }
    }

    /// Fallible [`ensure_capacity`](Self::ensure_capacity). On error the
    /// map is left exactly as it was.
    pub fn try_ensure_capacity(&mut self, expected: usize) -> Result<(), CapacityError> {
        if expected <= self.resize_at {
            return Ok(());
        }
        let buffer_size = capacity::min_buffer_size(expected, self.load_factor)?;
        if buffer_size > self.mask + 1 {
            self.rehash_to(buffer_size);
        }
        Ok(())
    }

    /// Removes all entries, keeping the allocated buffers.
    pub fn clear(&mut self) {
        self.assigned = 0;
        self.has_empty_key = false;
        self.keys.fill(K::EMPTY);
        for value in &mut self.values {
            *value = V::default();
        }
    }

    /// Removes all entries and shrinks the map back to its smallest
    /// footprint.
    pub fn release(&mut self) {
        self.assigned = 0;
        self.has_empty_key = false;
        let buffer_size = capacity::min_buffer_size(DEFAULT_EXPECTED_ELEMENTS, self.load_factor)
            .unwrap_or(capacity::MIN_BUFFER_SIZE);
        let (keys, values) = Self::allocate(buffer_size);
        self.keys = keys;
        self.values = values;
        self.mask = buffer_size - 1;
        self.resize_at = capacity::expand_at(buffer_size, self.load_factor);
        self.key_mixer = self.mixing.new_key_mixer(buffer_size);
    }

    /// Removes every entry whose key matches `predicate`, returning how
    /// many were removed.
    pub fn remove_all(&mut self, mut predicate: impl FnMut(K) -> bool) -> usize {
        let before = self.len();
        if self.has_empty_key && predicate(K::EMPTY) {
            self.has_empty_key = false;
            let cell = self.empty_cell();
            self.values[cell] = V::default();
        }
        let mut slot = 0;
        while slot <= self.mask {
            let key = self.keys[slot];
            if !key.is_empty() && predicate(key) {
                // The backward shift refills this slot; re-examine it.
                self.shift_conflicting_keys(slot);
            } else {
                slot += 1;
            }
        }
        before - self.len()
    }

    /// Keeps only the entries for which `f` returns `true`.
    pub fn retain(&mut self, mut f: impl FnMut(K, &V) -> bool) {
        if self.has_empty_key {
            let cell = self.empty_cell();
            if !f(K::EMPTY, &self.values[cell]) {
                self.has_empty_key = false;
                self.values[cell] = V::default();
            }
        }
        let mut slot = 0;
        while slot <= self.mask {
            let key = self.keys[slot];
            if !key.is_empty() && !f(key, &self.values[slot]) {
                self.shift_conflicting_keys(slot);
            } else {
                slot += 1;
            }
        }
    }

    /// Removes every key that is present in `other`, returning how many
    /// entries were removed.
    pub fn remove_all_in<C>(&mut self, other: &C) -> usize
    where
        C: KeyContainer<K>,
    {
        self.remove_all(|key| other.has_key(key))
    }

    fn next_iteration_seed(&self) -> u64 {
        let seed = mix_phi64(self.iteration_seed.get().wrapping_add(1));
        self.iteration_seed.set(seed);
        seed
    }

    /// Iterates over `(key, &value)` pairs in a randomized order.
    ///
    /// Each call draws a fresh seed, so two consecutive iterations over
    /// the same map generally visit entries in different orders. Neither
    /// slot order nor insertion order is ever exposed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use worm_hash::HashMap;
    ///
    /// let mut map: HashMap<u32, u32> = HashMap::new();
    /// map.insert(1, 10);
    /// map.insert(2, 20);
    ///
    /// let mut keys: Vec<u32> = map.iter().map(|(k, _)| k).collect();
    /// keys.sort_unstable();
    /// assert_eq!(keys, vec![1, 2]);
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        let seed = self.next_iteration_seed();
        Iter {
            keys: &self.keys,
            values: &self.values,
            mask: self.mask,
            slot: (seed as usize) & self.mask,
            increment: iteration_increment(seed),
            remaining_slots: self.mask + 1,
            emit_empty_key: self.has_empty_key,
        }
    }

    /// Iterates over keys in a randomized order.
    pub fn keys(&self) -> KeysIter<'_, K, V> {
        KeysIter { inner: self.iter() }
    }

    /// Iterates over values in a randomized order.
    pub fn values(&self) -> ValuesIter<'_, K, V> {
        ValuesIter { inner: self.iter() }
    }

    /// Probes for `key` once and returns a view of its slot for further
    /// inspection or mutation, so check-then-update call sites do not hash
    /// the key twice.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use worm_hash::HashMap;
    /// use worm_hash::hash_map::Entry;
    ///
    /// let mut map: HashMap<u32, u32> = HashMap::new();
    /// *map.entry(1).or_insert(0) += 5;
    /// *map.entry(1).or_insert(0) += 5;
    /// assert_eq!(map.get(1), Some(&10));
    ///
    /// if let Entry::Occupied(entry) = map.entry(1) {
    ///     assert_eq!(entry.remove(), 10);
    /// }
    /// assert!(map.is_empty());
    /// ```
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, H> {
        if key.is_empty() {
            let cell = self.empty_cell();
            return if self.has_empty_key {
                Entry::Occupied(OccupiedEntry {
                    map: self,
                    key,
                    slot: cell,
                })
            } else {
                Entry::Vacant(VacantEntry {
                    map: self,
                    key,
                    slot: cell,
                })
            };
        }
        let mut slot = self.hash_slot(key);
        loop {
            let existing = self.keys[slot];
            if existing.is_empty() {
                return Entry::Vacant(VacantEntry {
                    map: self,
                    key,
                    slot,
                });
            }
            if H::eq(existing, key) {
                return Entry::Occupied(OccupiedEntry {
                    map: self,
                    key,
                    slot,
                });
            }
            slot = (slot + 1) & self.mask;
        }
    }
}

impl<K, V, H> Default for HashMap<K, V, H>
where
    K: SlotKey,
    V: Default,
    H: KeyHash<K>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, H> Clone for HashMap<K, V, H>
where
    K: SlotKey,
    V: Clone,
{
    /// Structural clone: buffers and the key-mixer seed are copied (the
    /// slot layout depends on the seed), the iteration seed is re-drawn.
    fn clone(&self) -> Self {
        Self {
            keys: self.keys.clone(),
            values: self.values.clone(),
            assigned: self.assigned,
            mask: self.mask,
            resize_at: self.resize_at,
            has_empty_key: self.has_empty_key,
            key_mixer: self.key_mixer,
            load_factor: self.load_factor,
            mixing: self.mixing,
            iteration_seed: Cell::new(next_random_seed()),
            _hash: PhantomData,
        }
    }
}

impl<K, V, H> Debug for HashMap<K, V, H>
where
    K: SlotKey + Debug,
    V: Default + Debug,
    H: KeyHash<K>,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, H> KeyContainer<K> for HashMap<K, V, H>
where
    K: SlotKey,
    V: Default,
    H: KeyHash<K>,
{
    fn has_key(&self, key: K) -> bool {
        self.contains_key(key)
    }
}

impl<K, V, H> Extend<(K, V)> for HashMap<K, V, H>
where
    K: SlotKey,
    V: Default,
    H: KeyHash<K>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.ensure_capacity(self.len() + iter.size_hint().0);
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, V, H> FromIterator<(K, V)> for HashMap<K, V, H>
where
    K: SlotKey,
    V: Default,
    H: KeyHash<K>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<'a, K, V, H> IntoIterator for &'a HashMap<K, V, H>
where
    K: SlotKey,
    V: Default,
    H: KeyHash<K>,
{
    type Item = (K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Randomized-order iterator over `(key, &value)` pairs.
pub struct Iter<'a, K, V> {
    keys: &'a [K],
    values: &'a [V],
    mask: usize,
    slot: usize,
    increment: usize,
    remaining_slots: usize,
    emit_empty_key: bool,
}

impl<'a, K, V> Iterator for Iter<'a, K, V>
where
    K: SlotKey,
{
    type Item = (K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining_slots > 0 {
            let slot = self.slot;
            self.slot = (slot + self.increment) & self.mask;
            self.remaining_slots -= 1;
            let key = self.keys[slot];
            if !key.is_empty() {
                return Some((key, &self.values[slot]));
            }
        }
        if self.emit_empty_key {
            self.emit_empty_key = false;
            return Some((K::EMPTY, &self.values[self.mask + 1]));
        }
        None
    }
}

/// Randomized-order iterator over keys.
pub struct KeysIter<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<K, V> Iterator for KeysIter<'_, K, V>
where
    K: SlotKey,
{
    type Item = K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, _)| key)
    }
}

/// Randomized-order iterator over values.
pub struct ValuesIter<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesIter<'a, K, V>
where
    K: SlotKey,
{
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, value)| value)
    }
}

/// A view into a single map slot, obtained from [`HashMap::entry`].
pub enum Entry<'a, K, V, H> {
    /// The key is present.
    Occupied(OccupiedEntry<'a, K, V, H>),
    /// The key is absent; the probe already found its insertion slot.
    Vacant(VacantEntry<'a, K, V, H>),
}

impl<'a, K, V, H> Entry<'a, K, V, H>
where
    K: SlotKey,
    V: Default,
    H: KeyHash<K>,
{
    /// The key this entry was probed with.
    pub fn key(&self) -> K {
        match self {
            Entry::Occupied(entry) => entry.key,
            Entry::Vacant(entry) => entry.key,
        }
    }

    /// Inserts `default` if vacant; returns a mutable reference to the
    /// value either way.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Like [`or_insert`](Self::or_insert) with a lazily computed value.
    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Inserts `V::default()` if vacant.
    pub fn or_default(self) -> &'a mut V {
        self.or_insert_with(V::default)
    }

    /// Mutates the value in place if occupied.
    pub fn and_modify(mut self, f: impl FnOnce(&mut V)) -> Self {
        if let Entry::Occupied(entry) = &mut self {
            f(entry.get_mut());
        }
        self
    }
}

/// An occupied slot view; see [`HashMap::entry`].
pub struct OccupiedEntry<'a, K, V, H> {
    map: &'a mut HashMap<K, V, H>,
    key: K,
    /// Probe-array slot, or the side-slot index for the sentinel key.
    slot: usize,
}

impl<'a, K, V, H> OccupiedEntry<'a, K, V, H>
where
    K: SlotKey,
    V: Default,
    H: KeyHash<K>,
{
    /// The entry's key.
    pub fn key(&self) -> K {
        self.key
    }

    /// The entry's value.
    pub fn get(&self) -> &V {
        &self.map.values[self.slot]
    }

    /// The entry's value, mutably.
    pub fn get_mut(&mut self) -> &mut V {
        &mut self.map.values[self.slot]
    }

    /// Converts into a mutable reference tied to the map's lifetime.
    pub fn into_mut(self) -> &'a mut V {
        &mut self.map.values[self.slot]
    }

    /// Replaces the value, returning the previous one.
    pub fn insert(&mut self, value: V) -> V {
        mem::replace(&mut self.map.values[self.slot], value)
    }

    /// Removes the entry, returning its value.
    pub fn remove(self) -> V {
        if self.slot == self.map.empty_cell() {
            self.map.has_empty_key = false;
            mem::take(&mut self.map.values[self.slot])
        } else {
            self.map.shift_conflicting_keys(self.slot)
        }
    }
}

/// A vacant slot view; see [`HashMap::entry`].
pub struct VacantEntry<'a, K, V, H> {
    map: &'a mut HashMap<K, V, H>,
    key: K,
    /// Free probe-array slot found for this key, or the side-slot index
    /// for the sentinel key.
    slot: usize,
}

impl<'a, K, V, H> VacantEntry<'a, K, V, H>
where
    K: SlotKey,
    V: Default,
    H: KeyHash<K>,
{
    /// The key this entry will insert.
    pub fn key(&self) -> K {
        self.key
    }

    /// Inserts `value`, returning a mutable reference to it.
    ///
    /// # Panics
    ///
    /// Panics on capacity exhaustion, like [`HashMap::insert`].
    pub fn insert(self, value: V) -> &'a mut V {
        let map = self.map;
        if self.slot == map.mask + 1 {
            map.has_empty_key = true;
            map.values[self.slot] = value;
            return &mut map.values[self.slot];
        }
        if map.assigned == map.resize_at {
            if let Err(err) = map.allocate_then_insert_then_rehash(self.slot, self.key, value) {
                panic!("{err}");
            }
            map.assigned += 1;
            // Buffers were swapped; locate the freshly rehashed key.
            let mut slot = map.hash_slot(self.key);
            loop {
                if H::eq(map.keys[slot], self.key) {
                    break;
                }
                debug_assert!(!map.keys[slot].is_empty(), "rehash lost the pending key");
                slot = (slot + 1) & map.mask;
            }
            &mut map.values[slot]
        } else {
            map.keys[self.slot] = self.key;
            map.values[self.slot] = value;
            map.assigned += 1;
            &mut map.values[self.slot]
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    /// Clusters keys into collision groups so backward-shift deletion and
    /// probe chains are exercised deterministically.
    struct ClusterHash;

    impl KeyHash<u32> for ClusterHash {
        fn mix(key: u32, _seed: u64) -> u64 {
            (key / 8) as u64
        }

        fn eq(a: u32, b: u32) -> bool {
            a == b
        }
    }

    #[test]
    fn test_insert_get_remove_round_trip() {
        let mut map: HashMap<u64, u64> = HashMap::new();
        assert_eq!(map.insert(1, 100), None);
        assert_eq!(map.insert(2, 200), None);
        assert_eq!(map.len(), 2);

        assert_eq!(map.get(1), Some(&100));
        assert_eq!(map.get(2), Some(&200));
        assert_eq!(map.get(3), None);

        assert_eq!(map.remove(2), Some(200));
        assert_eq!(map.len(), 1);
        assert!(!map.contains_key(2));
        assert_eq!(map.remove(2), None);
    }

    #[test]
    fn test_overwrite_after_removal_does_not_duplicate() {
        let mut map: HashMap<i32, i32> = HashMap::new();
        map.insert(0, 1);
        map.insert(99, 2);
        map.insert(198, 3);
        assert_eq!(map.len(), 3);

        assert_eq!(map.remove(99), Some(2));
        assert_eq!(map.len(), 2);

        assert_eq!(map.insert(198, 4), Some(3));
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(198), Some(&4));
    }

    #[test]
    fn test_zero_key_uses_side_slot() {
        let mut map: HashMap<u64, &str> = HashMap::new();
        assert_eq!(map.insert(0, "zero"), None);
        assert!(map.contains_key(0));
        assert_eq!(map.len(), 1);
        assert_eq!(map.insert(0, "still zero"), Some("zero"));
        assert_eq!(map.len(), 1);
        assert_eq!(map.remove(0), Some("still zero"));
        assert!(map.is_empty());
        assert_eq!(map.remove(0), None);
    }

    #[test]
    fn test_resize_preserves_entries() {
        let mut map: HashMap<u32, u32> = HashMap::with_capacity(2);
        for key in 0..2_000u32 {
            map.insert(key, key.wrapping_mul(31));
            if key % 257 == 0 {
                for probe in 0..=key {
                    assert_eq!(map.get(probe), Some(&probe.wrapping_mul(31)));
                }
            }
        }
        assert_eq!(map.len(), 2_000);
    }

    #[test]
    fn test_no_duplicates_under_traversal() {
        let mut map: HashMap<u32, u32> = HashMap::new();
        for round in 0..3 {
            for key in 0..100u32 {
                map.insert(key, round);
            }
        }
        assert_eq!(map.len(), 100);
        for key in 0..100u32 {
            let matches = map.iter().filter(|(k, _)| *k == key).count();
            assert_eq!(matches, 1, "key {key} appears {matches} times");
        }
    }

    #[test]
    fn test_backward_shift_with_clustered_keys() {
        let mut map: HashMap<u32, u32, ClusterHash> = HashMap::with_mixing(Mixing::None);
        // Three full collision groups.
        for key in 1..=24u32 {
            map.insert(key, key * 10);
        }
        // Remove from the middle of each cluster.
        for key in [3u32, 4, 11, 12, 19, 20] {
            assert_eq!(map.remove(key), Some(key * 10));
        }
        for key in 1..=24u32 {
            let removed = [3u32, 4, 11, 12, 19, 20].contains(&key);
            assert_eq!(map.get(key).is_none(), removed, "key {key}");
        }
        assert_eq!(map.len(), 18);
    }

    #[test]
    fn test_clear_keeps_buffers_release_shrinks() {
        let mut map: HashMap<u32, u32> = HashMap::with_capacity(1_000);
        for key in 1..500u32 {
            map.insert(key, key);
        }
        let capacity = map.capacity();
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.capacity(), capacity);
        assert_eq!(map.get(42), None);

        map.insert(7, 7);
        map.release();
        assert!(map.is_empty());
        assert!(map.capacity() < capacity);
        map.insert(7, 7);
        assert_eq!(map.get(7), Some(&7));
    }

    #[test]
    fn test_ensure_capacity() {
        let mut map: HashMap<u32, u32> = HashMap::new();
        map.ensure_capacity(10_000);
        assert!(map.capacity() >= 10_000);
        assert!(map.try_ensure_capacity(5).is_ok());
    }

    #[test]
    fn test_get_or_default() {
        let mut map: HashMap<u32, u32> = HashMap::new();
        map.insert(1, 11);
        assert_eq!(map.get_or_default(1, 0), 11);
        assert_eq!(map.get_or_default(2, 99), 99);
    }

    #[test]
    fn test_entry_api() {
        let mut map: HashMap<u32, u32> = HashMap::new();

        *map.entry(5).or_insert(1) += 10;
        assert_eq!(map.get(5), Some(&11));

        map.entry(5).and_modify(|v| *v *= 2).or_insert(0);
        assert_eq!(map.get(5), Some(&22));

        map.entry(6).or_insert_with(|| 66);
        assert_eq!(map.get(6), Some(&66));

        match map.entry(5) {
            Entry::Occupied(mut entry) => {
                assert_eq!(entry.key(), 5);
                assert_eq!(entry.insert(50), 22);
                assert_eq!(entry.remove(), 50);
            }
            Entry::Vacant(_) => panic!("expected occupied entry"),
        }
        assert!(!map.contains_key(5));

        // The sentinel key routes through the side-slot.
        *map.entry(0).or_default() += 3;
        assert_eq!(map.get(0), Some(&3));
        match map.entry(0) {
            Entry::Occupied(entry) => assert_eq!(entry.remove(), 3),
            Entry::Vacant(_) => panic!("expected occupied entry"),
        }
        assert!(!map.contains_key(0));
    }

    #[test]
    fn test_entry_insert_at_growth_threshold() {
        let mut map: HashMap<u32, u32> = HashMap::with_capacity(2);
        // Drive the map through every threshold via the entry API alone.
        for key in 1..=200u32 {
            map.entry(key).or_insert(key);
        }
        for probe in 1..=200u32 {
            assert_eq!(map.get(probe), Some(&probe));
        }
    }

    #[test]
    fn test_randomized_iteration_visits_everything_once() {
        let mut map: HashMap<u32, u32> = HashMap::new();
        for key in 0..300u32 {
            map.insert(key, key + 1);
        }
        let mut first: Vec<u32> = map.keys().collect();
        let mut second: Vec<u32> = map.keys().collect();
        assert_eq!(first.len(), 300);
        assert_eq!(second.len(), 300);
        first.sort_unstable();
        second.sort_unstable();
        assert_eq!(first, second);
        assert_eq!(first, (0..300).collect::<Vec<_>>());

        let total: u64 = map.values().map(|v| *v as u64).sum();
        assert_eq!(total, (1..=300).sum::<u64>());
    }

    #[test]
    fn test_remove_all_and_retain() {
        let mut map: HashMap<u32, u32> = HashMap::new();
        for key in 0..100u32 {
            map.insert(key, key);
        }
        let removed = map.remove_all(|key| key % 2 == 0);
        assert_eq!(removed, 50);
        assert_eq!(map.len(), 50);
        assert!(!map.contains_key(0));

        map.retain(|_, value| *value < 51);
        assert_eq!(map.len(), 25);
        for key in map.keys() {
            assert!(key % 2 == 1 && key < 51);
        }
    }

    #[test]
    fn test_remove_all_in_container() {
        let mut map: HashMap<u32, u32> = HashMap::new();
        for key in 0..20u32 {
            map.insert(key, key);
        }
        let mut doomed: crate::HashSet<u32> = crate::HashSet::new();
        for key in [0u32, 3, 5, 19] {
            doomed.insert(key);
        }
        assert_eq!(map.remove_all_in(&doomed), 4);
        assert_eq!(map.len(), 16);
        assert!(!map.contains_key(3));
        assert!(map.contains_key(4));
    }

    #[test]
    fn test_extend_and_from_iterator() {
        let map: HashMap<u32, u32> = (0..50u32).map(|k| (k, k * 2)).collect();
        assert_eq!(map.len(), 50);
        assert_eq!(map.get(49), Some(&98));

        let mut copy: HashMap<u32, u32> = HashMap::new();
        copy.extend(map.iter().map(|(k, v)| (k, *v)));
        assert_eq!(copy.len(), 50);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut map: HashMap<u32, u32> = HashMap::new();
        for key in 0..64u32 {
            map.insert(key, key);
        }
        let mut copy = map.clone();
        copy.insert(1_000, 1);
        copy.remove(5);
        assert_eq!(map.len(), 64);
        assert!(map.contains_key(5));
        assert!(!map.contains_key(1_000));
        for (key, value) in map.iter() {
            if key != 5 {
                assert_eq!(copy.get(key), Some(value));
            }
        }
    }

    #[test]
    fn test_float_keys() {
        let mut map: HashMap<f64, u32> = HashMap::new();
        map.insert(1.5, 1);
        map.insert(-0.0, 2);
        map.insert(f64::NAN, 3);
        map.insert(0.0, 4); // sentinel key, side-slot

        assert_eq!(map.len(), 4);
        assert_eq!(map.get(1.5), Some(&1));
        assert_eq!(map.get(-0.0), Some(&2));
        assert_eq!(map.get(f64::NAN), Some(&3));
        assert_eq!(map.get(0.0), Some(&4));
    }

    #[test]
    fn test_identity_map_distinguishes_equal_values() {
        let a = String::from("same");
        let b = String::from("same");

        let mut map: IdentityMap<'_, String, u32> = HashMap::new();
        map.insert(Some(&a), 1);
        map.insert(Some(&b), 2);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(Some(&a)), Some(&1));
        assert_eq!(map.get(Some(&b)), Some(&2));

        // `None` is the sentinel key and still usable.
        map.insert(None, 3);
        assert_eq!(map.get(None), Some(&3));
    }

    #[cfg(feature = "foldhash")]
    #[test]
    fn test_reference_keys_compare_by_value() {
        let one = String::from("one");
        let one_again = String::from("one");

        let mut map: HashMap<Option<&String>, u32> = HashMap::new();
        map.insert(Some(&one), 1);
        assert_eq!(map.insert(Some(&one_again), 2), Some(1));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_scatter_map_basics() {
        let mut map: ScatterMap<u32, u32> = HashMap::with_mixing(Mixing::None);
        for key in 1..200u32 {
            map.insert(key, key);
        }
        assert_eq!(map.len(), 199);
        for key in 1..200u32 {
            assert_eq!(map.get(key), Some(&key));
        }
    }

    #[test]
    fn test_deterministic_mixing_is_reproducible() {
        let mut a: HashMap<u64, u64> = HashMap::with_mixing(Mixing::Deterministic);
        let mut b: HashMap<u64, u64> = HashMap::with_mixing(Mixing::Deterministic);
        for key in 1..100u64 {
            a.insert(key, key);
            b.insert(key, key);
        }
        assert_eq!(a.len(), b.len());
        for key in 1..100u64 {
            assert_eq!(a.get(key), b.get(key));
        }
    }

    #[test]
    fn test_differential_fuzz_against_reference() {
        let mut rng = SmallRng::seed_from_u64(0x0ddc0ffee);
        for _ in 0..8 {
            let mut map: HashMap<u32, u32> = HashMap::new();
            let mut reference: hashbrown::HashMap<u32, u32> = hashbrown::HashMap::new();
            for _ in 0..4_000 {
                // Narrow key range so inserts, overwrites, and removals
                // collide; zero exercises the side-slot.
                let key = rng.random_range(0..512u32);
                match rng.random_range(0..8u32) {
                    0..=3 => {
                        let value: u32 = rng.random();
                        assert_eq!(map.insert(key, value), reference.insert(key, value));
                    }
                    4..=5 => {
                        assert_eq!(map.remove(key), reference.remove(&key));
                    }
                    6 => {
                        assert_eq!(map.get(key), reference.get(&key));
                    }
                    _ => {
                        if rng.random_range(0..200u32) == 0 {
                            map.clear();
                            reference.clear();
                        } else {
                            assert_eq!(map.contains_key(key), reference.contains_key(&key));
                        }
                    }
                }
            }
            assert_eq!(map.len(), reference.len());
            for (key, value) in reference.iter() {
                assert_eq!(map.get(*key), Some(value));
            }
        }
    }

    #[cfg(feature = "foldhash")]
    #[test]
    fn test_differential_fuzz_with_reference_keys() {
        let universe: Vec<String> = (0..64).map(|n| format!("key-{n}")).collect();
        let mut rng = SmallRng::seed_from_u64(0x5ef5);
        let mut map: HashMap<Option<&String>, u32> = HashMap::new();
        let mut reference: hashbrown::HashMap<Option<&String>, u32> = hashbrown::HashMap::new();
        for _ in 0..15_000 {
            // One index past the universe stands in for the `None` key,
            // which doubles as this table's sentinel.
            let key = universe.get(rng.random_range(0..=universe.len()));
            match rng.random_range(0..8u32) {
                0..=3 => {
                    let value: u32 = rng.random();
                    assert_eq!(map.insert(key, value), reference.insert(key, value));
                }
                4..=5 => {
                    assert_eq!(map.remove(key), reference.remove(&key));
                }
                6 => {
                    assert_eq!(map.get(key), reference.get(&key));
                }
                _ => {
                    if rng.random_range(0..200u32) == 0 {
                        map.clear();
                        reference.clear();
                    } else {
                        assert_eq!(map.contains_key(key), reference.contains_key(&key));
                    }
                }
            }
        }
        assert_eq!(map.len(), reference.len());
        for (key, value) in reference.iter() {
            assert_eq!(map.get(*key), Some(value));
        }
    }
}
