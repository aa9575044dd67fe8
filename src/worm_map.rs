//! Displacement-chain ("worm") hash map.
//!
//! Keys colliding on a home bucket form a chain threaded through the
//! buffer with byte-packed forward offsets (see `chain.rs` for the
//! encoding).
//! Lookups walk at most one chain; inserts may relocate movable tails of
//! *other* chains (with a bounded recursion budget) to keep every chain
//! member within 126 slots of its predecessor; removals substitute the
//! chain's last member into the vacated bucket so chains never develop
//! interior holes. There is no growth threshold: the table doubles only
//! when a placement genuinely fails, which lets it run at much higher
//! load factors than the linear-probing family.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::cell::Cell;
use core::fmt::Debug;
use core::marker::PhantomData;
use core::mem;

use crate::capacity;
use crate::capacity::CapacityError;
use crate::capacity::DEFAULT_EXPECTED_ELEMENTS;
use crate::capacity::WORM_LOAD_FACTOR;
use crate::chain;
use crate::chain::Excluded;
use crate::key::IdentityHash;
use crate::key::KeyContainer;
use crate::key::KeyHash;
use crate::key::SlotKey;
use crate::key::ValueHash;
use crate::mix::Mixing;
use crate::mix::iteration_increment;
use crate::mix::mix_phi64;
use crate::mix::next_random_seed;

/// A hash map using byte-packed displacement chains.
///
/// Compared to [`HashMap`](crate::HashMap) this trades slightly more
/// expensive inserts for one byte of per-slot overhead, no growth
/// threshold, and lookups that touch only the colliding keys of one
/// chain. Occupancy is tracked by the chain byte, so the key sentinel
/// needs no side-slot here and every [`SlotKey`] bit pattern is an
/// ordinary key.
///
/// # Examples
///
/// ```rust
/// use worm_hash::WormMap;
///
/// let mut map: WormMap<u64, &str> = WormMap::new();
/// assert_eq!(map.insert(1, "one"), None);
/// assert_eq!(map.insert(1, "uno"), Some("one"));
/// assert_eq!(map.get(1), Some(&"uno"));
/// assert_eq!(map.remove(1), Some("uno"));
/// assert!(map.is_empty());
/// ```
pub struct WormMap<K, V, H = ValueHash> {
    keys: Box<[K]>,
    values: Box<[V]>,
    /// Chain bytes; see `chain.rs` for the encoding.
    next: Box<[i8]>,
    size: usize,
    /// `buffer_size - 1`; buffer sizes are powers of two.
    mask: usize,
    /// Per-instance seed folded into every hash; refreshed by `mixing` on
    /// every buffer (re)allocation.
    key_mixer: u64,
    mixing: Mixing,
    /// Evolving seed for randomized cursor iteration.
    iteration_seed: Cell<u64>,
    _hash: PhantomData<H>,
}

/// Worm map over reference keys hashed and compared by identity.
pub type IdentityWormMap<'a, T, V> = WormMap<Option<&'a T>, V, IdentityHash>;

impl<K, V, H> WormMap<K, V, H>
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
    /// reallocating (barring pathological collision patterns).
    ///
    /// # Panics
    ///
    /// Panics if `expected` needs a buffer beyond
    /// [`capacity::MAX_BUFFER_SIZE`].
    pub fn with_capacity(expected: usize) -> Self {
        Self::with_capacity_and_mixing(expected, Mixing::default())
    }

    /// Creates an empty map with an explicit hash-order [`Mixing`]
    /// strategy.
    pub fn with_mixing(mixing: Mixing) -> Self {
        Self::with_capacity_and_mixing(DEFAULT_EXPECTED_ELEMENTS, mixing)
    }

    /// Creates an empty map with a capacity hint and a mixing strategy.
    ///
    /// The worm table has no configurable load factor: it runs until a
    /// placement fails, and is planned at 90% occupancy.
    pub fn with_capacity_and_mixing(expected: usize, mixing: Mixing) -> Self {
        let buffer_size = match capacity::min_buffer_size(expected, WORM_LOAD_FACTOR) {
            Ok(size) => size,
            Err(err) => panic!("{err}"),
        };
        Self::with_buffer(buffer_size, mixing)
    }

    fn with_buffer(buffer_size: usize, mixing: Mixing) -> Self {
        let (keys, values, next) = Self::allocate(buffer_size);
        Self {
            keys,
            values,
            next,
            size: 0,
            mask: buffer_size - 1,
            key_mixer: mixing.new_key_mixer(buffer_size),
            mixing,
            iteration_seed: Cell::new(next_random_seed()),
            _hash: PhantomData,
        }
    }

    fn allocate(buffer_size: usize) -> (Box<[K]>, Box<[V]>, Box<[i8]>) {
        let keys = alloc::vec![K::EMPTY; buffer_size].into_boxed_slice();
        let values = (0..buffer_size).map(|_| V::default()).collect();
        let next = alloc::vec![0i8; buffer_size].into_boxed_slice();
        (keys, values, next)
    }

    /// Number of entries in the map.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of entries the map is planned to hold without reallocating.
    /// The table only grows when a placement actually fails, so it may
    /// exceed this before doubling.
    pub fn capacity(&self) -> usize {
        capacity::expand_at(self.mask + 1, WORM_LOAD_FACTOR)
    }

    #[inline(always)]
    fn hash_slot(&self, key: K) -> usize {
        (H::mix(key, self.key_mixer) as usize) & self.mask
    }

    /// Walks the chain rooted at `key`'s home bucket.
    fn find_slot(&self, key: K) -> Option<usize> {
        let mut slot = self.hash_slot(key);
        let mut next = self.next[slot];
        // Free, or squatted by a member of a chain rooted elsewhere.
        if next <= 0 {
            return None;
        }
        loop {
            if H::eq(self.keys[slot], key) {
                return Some(slot);
            }
            let offset = next.unsigned_abs() as usize;
            if offset == chain::END_OF_CHAIN.unsigned_abs() as usize {
                return None;
            }
            slot = chain::add_offset(slot, offset, self.mask);
            next = self.next[slot];
        }
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key(&self, key: K) -> bool {
        self.find_slot(key).is_some()
    }

    /// Returns a reference to the value stored for `key`.
    pub fn get(&self, key: K) -> Option<&V> {
        self.find_slot(key).map(|slot| &self.values[slot])
    }

    /// Returns a mutable reference to the value stored for `key`.
    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        match self.find_slot(key) {
            Some(slot) => Some(&mut self.values[slot]),
            None => None,
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
    /// size.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(slot) = self.find_slot(key) {
            return Some(mem::replace(&mut self.values[slot], value));
        }
        let slot = loop {
            if let Some(slot) = self.place_new(key) {
                break slot;
            }
            if let Err(err) = self.enlarge() {
                panic!("{err}");
            }
        };
        self.values[slot] = value;
        self.size += 1;
        None
    }

    /// Threads `key` into the chain structure (keys and chain bytes
    /// only), returning the slot it landed in, or `None` if every
    /// placement strategy failed and the table must grow.
    ///
    /// `None` is returned with the structure untouched: relocations only
    /// commit on success at every recursion depth.
    fn place_new(&mut self, key: K) -> Option<usize> {
        let home = self.hash_slot(key);
        let head = self.next[home];
        if head == 0 {
            // Free home bucket: the key starts a new single-member chain.
            self.keys[home] = key;
            self.next[home] = chain::END_OF_CHAIN;
            return Some(home);
        }
        if head > 0 {
            // The home bucket heads this key's own chain: append a tail.
            let (tail, excluded) = self.chain_slots(home);
            return self.append_tail_slot(tail, key, &excluded);
        }
        if head == -chain::END_OF_CHAIN {
            // The home bucket is squatted by the movable tail of a chain
            // rooted elsewhere: evict it and become a head.
            if !self.move_tail_of_chain(home, &Excluded::None, 0) {
                return None;
            }
            self.keys[home] = key;
            self.next[home] = chain::END_OF_CHAIN;
            return Some(home);
        }
        // Squatted by an interior member of a foreign chain. Moving it
        // would break that chain's relative offsets, so grow instead.
        None
    }

    /// Collects the chain rooted at `head`, returning its tail slot and
    /// the exclusion set of all its members.
    fn chain_slots(&self, head: usize) -> (usize, Excluded<'static>) {
        let mut slots = Vec::new();
        let mut slot = head;
        let mut wrapped = false;
        loop {
            slots.push(slot);
            let next = self.next[slot];
            debug_assert!(next != 0);
            let offset = next.unsigned_abs() as usize;
            if offset == chain::END_OF_CHAIN.unsigned_abs() as usize {
                break;
            }
            let following = chain::add_offset(slot, offset, self.mask);
            if following < slot {
                wrapped = true;
            }
            slot = following;
        }
        (slot, Excluded::from_chain(slots, wrapped))
    }

    /// Appends `key` after `tail` into a free bucket within the encodable
    /// forward window, relocating a movable foreign tail if the window is
    /// full.
    fn append_tail_slot(&mut self, tail: usize, key: K, excluded: &Excluded<'_>) -> Option<usize> {
        let range = chain::search_range(self.mask);
        let free = match self.search_free_bucket(tail, range, excluded) {
            Some(free) => free,
            None => self.search_and_move_bucket(tail, range, excluded, 0)?,
        };
        self.keys[free] = key;
        self.next[free] = -chain::END_OF_CHAIN;
        let offset = chain::offset_between(tail, free, self.mask) as i8;
        self.next[tail] = if self.next[tail] > 0 { offset } else { -offset };
        Some(free)
    }

    /// Nearest free bucket in the `range` slots after `from`.
    fn search_free_bucket(&self, from: usize, range: usize, excluded: &Excluded<'_>) -> Option<usize> {
        for offset in 1..=range {
            let slot = chain::add_offset(from, offset, self.mask);
            if self.next[slot] == 0 && !excluded.contains(slot) {
                return Some(slot);
            }
        }
        None
    }

    /// No free bucket in the window: find a movable foreign tail inside
    /// it, re-home that tail elsewhere, and hand back the freed bucket.
    /// The scan starts at the far end of the window so the freed bucket
    /// stays encodable from `from`; the attempts budget per recursion
    /// depth bounds the worst case.
    fn search_and_move_bucket(
        &mut self,
        from: usize,
        range: usize,
        excluded: &Excluded<'_>,
        level: usize,
    ) -> Option<usize> {
        let mut attempts = *chain::RECURSIVE_MOVE_ATTEMPTS.get(level)?;
        for offset in (1..=range).rev() {
            if attempts == 0 {
                break;
            }
            let slot = chain::add_offset(from, offset, self.mask);
            if self.next[slot] == -chain::END_OF_CHAIN && !excluded.contains(slot) {
                attempts -= 1;
                if self.move_tail_of_chain(slot, excluded, level) {
                    return Some(slot);
                }
            }
        }
        None
    }

    /// Locates the unique chain member pointing at `slot`. Only called
    /// for non-head members, whose predecessor is at most
    /// `chain::MAX_OFFSET` slots behind.
    fn find_previous_in_chain(&self, slot: usize) -> usize {
        let range = chain::search_range(self.mask);
        for distance in 1..=range {
            let candidate = slot.wrapping_sub(distance) & self.mask;
            let next = self.next[candidate];
            if next != 0 && next.unsigned_abs() as usize == distance {
                return candidate;
            }
        }
        debug_assert!(false, "chain member without a predecessor");
        slot
    }

    /// Moves the chain tail occupying `tail` into another bucket, fixing
    /// its predecessor's link, and frees `tail`. Returns `false` (with
    /// nothing modified) if no destination could be found within the
    /// remaining recursion budget.
    fn move_tail_of_chain(&mut self, tail: usize, excluded: &Excluded<'_>, level: usize) -> bool {
        debug_assert!(self.next[tail] == -chain::END_OF_CHAIN);
        let prev = self.find_previous_in_chain(tail);
        let moving = Excluded::Single(tail);
        let merged = excluded.union(&moving);
        let range = chain::search_range(self.mask);
        let free = match self.search_free_bucket(prev, range, &merged) {
            Some(free) => free,
            None => match self.search_and_move_bucket(prev, range, &merged, level + 1) {
                Some(free) => free,
                None => return false,
            },
        };
        self.keys[free] = self.keys[tail];
        self.values[free] = mem::take(&mut self.values[tail]);
        self.next[free] = -chain::END_OF_CHAIN;
        let offset = chain::offset_between(prev, free, self.mask) as i8;
        self.next[prev] = if self.next[prev] > 0 { offset } else { -offset };
        self.next[tail] = 0;
        true
    }

    /// Removes `key`, returning its value if it was present.
    pub fn remove(&mut self, key: K) -> Option<V> {
        let home = self.hash_slot(key);
        if self.next[home] <= 0 {
            return None;
        }
        let mut prev = None;
        let mut slot = home;
        loop {
            if H::eq(self.keys[slot], key) {
                return Some(self.remove_at(prev, slot));
            }
            let offset = self.next[slot].unsigned_abs() as usize;
            if offset == chain::END_OF_CHAIN.unsigned_abs() as usize {
                return None;
            }
            prev = Some(slot);
            slot = chain::add_offset(slot, offset, self.mask);
        }
    }

    /// Unlinks the entry at `slot` (whose chain predecessor is `prev`,
    /// `None` for a head) by tail substitution: the chain's last member
    /// overwrites the victim and its own bucket is freed, so interior
    /// offsets never need rewriting.
    fn remove_at(&mut self, prev: Option<usize>, slot: usize) -> V {
        self.size -= 1;
        let terminal = chain::END_OF_CHAIN.unsigned_abs() as usize;
        if self.next[slot].unsigned_abs() as usize == terminal {
            // The victim is the chain's last member: detach it.
            if let Some(prev) = prev {
                self.next[prev] = if self.next[prev] > 0 {
                    chain::END_OF_CHAIN
                } else {
                    -chain::END_OF_CHAIN
                };
            }
            self.next[slot] = 0;
            return mem::take(&mut self.values[slot]);
        }
        let mut last_prev = slot;
        let mut last = chain::add_offset(slot, self.next[slot].unsigned_abs() as usize, self.mask);
        while self.next[last].unsigned_abs() as usize != terminal {
            last_prev = last;
            last = chain::add_offset(last, self.next[last].unsigned_abs() as usize, self.mask);
        }
        let moved = mem::take(&mut self.values[last]);
        let removed = mem::replace(&mut self.values[slot], moved);
        self.keys[slot] = self.keys[last];
        self.next[last_prev] = if self.next[last_prev] > 0 {
            chain::END_OF_CHAIN
        } else {
            -chain::END_OF_CHAIN
        };
        self.next[last] = 0;
        removed
    }

    fn enlarge(&mut self) -> Result<(), CapacityError> {
        let new_size = capacity::next_buffer_size(self.mask + 1)?;
        self.grow_to(new_size)
    }

    /// Rebuilds the table into a buffer of at least `new_size` slots.
    /// The chain structure is rebuilt first into a fresh table (values
    /// untouched), then values migrate; a placement failure during the
    /// rebuild doubles again and restarts. The old table stays fully
    /// valid until the final commit, so an error leaves it unchanged.
    fn grow_to(&mut self, mut new_size: usize) -> Result<(), CapacityError> {
        'rebuild: loop {
            let mut fresh = Self::with_buffer(new_size, self.mixing);
            for slot in 0..=self.mask {
                if self.next[slot] == 0 {
                    continue;
                }
                if fresh.place_new(self.keys[slot]).is_none() {
                    new_size = capacity::next_buffer_size(new_size)?;
                    continue 'rebuild;
                }
            }
            for new_slot in 0..=fresh.mask {
                if fresh.next[new_slot] == 0 {
                    continue;
                }
                match self.find_slot(fresh.keys[new_slot]) {
                    Some(old_slot) => {
                        fresh.values[new_slot] = mem::take(&mut self.values[old_slot]);
                    }
                    None => debug_assert!(false, "rebuild lost a key"),
                }
            }
            fresh.size = self.size;
            *self = fresh;
            return Ok(());
        }
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
        let buffer_size = capacity::min_buffer_size(expected, WORM_LOAD_FACTOR)?;
        if buffer_size > self.mask + 1 {
            self.grow_to(buffer_size)?;
        }
        Ok(())
    }

    /// Removes all entries, keeping the allocated buffers.
    pub fn clear(&mut self) {
        self.size = 0;
        self.next.fill(0);
        self.keys.fill(K::EMPTY);
        for value in &mut self.values {
            *value = V::default();
        }
    }

    /// Removes all entries and shrinks the map back to its smallest
    /// footprint.
    pub fn release(&mut self) {
        let buffer_size = capacity::min_buffer_size(DEFAULT_EXPECTED_ELEMENTS, WORM_LOAD_FACTOR)
            .unwrap_or(capacity::MIN_BUFFER_SIZE);
        *self = Self::with_buffer(buffer_size, self.mixing);
    }

    /// Removes every entry whose key matches `predicate`, returning how
    /// many were removed.
    pub fn remove_all(&mut self, mut predicate: impl FnMut(K) -> bool) -> usize {
        let before = self.size;
        let mut slot = 0;
        while slot <= self.mask {
            if self.next[slot] != 0 && predicate(self.keys[slot]) {
                // Tail substitution may pull another entry into this
                // slot; re-examine it before advancing.
                let prev = self.predecessor(slot);
                self.remove_at(prev, slot);
            } else {
                slot += 1;
            }
        }
        before - self.size
    }

    /// Keeps only the entries for which `f` returns `true`.
    pub fn retain(&mut self, mut f: impl FnMut(K, &V) -> bool) {
        let mut slot = 0;
        while slot <= self.mask {
            if self.next[slot] != 0 && !f(self.keys[slot], &self.values[slot]) {
                let prev = self.predecessor(slot);
                self.remove_at(prev, slot);
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

    fn predecessor(&self, slot: usize) -> Option<usize> {
        if self.next[slot] > 0 {
            None
        } else {
            Some(self.find_previous_in_chain(slot))
        }
    }

    fn next_iteration_seed(&self) -> u64 {
        let seed = mix_phi64(self.iteration_seed.get().wrapping_add(1));
        self.iteration_seed.set(seed);
        seed
    }

    /// Iterates over `(key, &value)` pairs in a randomized order; same
    /// ordering contract as [`HashMap::iter`](crate::HashMap::iter).
    pub fn iter(&self) -> Iter<'_, K, V> {
        let seed = self.next_iteration_seed();
        Iter {
            keys: &self.keys,
            values: &self.values,
            next: &self.next,
            mask: self.mask,
            slot: (seed as usize) & self.mask,
            increment: iteration_increment(seed),
            remaining_slots: self.mask + 1,
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

    /// Walks `key`'s chain once and returns a view of its slot; see
    /// [`HashMap::entry`](crate::HashMap::entry).
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, H> {
        let home = self.hash_slot(key);
        if self.next[home] > 0 {
            let mut prev = None;
            let mut slot = home;
            loop {
                if H::eq(self.keys[slot], key) {
                    return Entry::Occupied(OccupiedEntry {
                        map: self,
                        key,
                        prev,
                        slot,
                    });
                }
                let offset = self.next[slot].unsigned_abs() as usize;
                if offset == chain::END_OF_CHAIN.unsigned_abs() as usize {
                    break;
                }
                prev = Some(slot);
                slot = chain::add_offset(slot, offset, self.mask);
            }
        }
        Entry::Vacant(VacantEntry { map: self, key })
    }
}

impl<K, V, H> Default for WormMap<K, V, H>
where
    K: SlotKey,
    V: Default,
    H: KeyHash<K>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, H> Clone for WormMap<K, V, H>
where
    K: SlotKey,
    V: Clone,
{
    /// Structural clone: buffers, chain bytes, and the key-mixer seed are
    /// copied; the iteration seed is re-drawn.
    fn clone(&self) -> Self {
        Self {
            keys: self.keys.clone(),
            values: self.values.clone(),
            next: self.next.clone(),
            size: self.size,
            mask: self.mask,
            key_mixer: self.key_mixer,
            mixing: self.mixing,
            iteration_seed: Cell::new(next_random_seed()),
            _hash: PhantomData,
        }
    }
}

impl<K, V, H> Debug for WormMap<K, V, H>
where
    K: SlotKey + Debug,
    V: Default + Debug,
    H: KeyHash<K>,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, H> KeyContainer<K> for WormMap<K, V, H>
where
    K: SlotKey,
    V: Default,
    H: KeyHash<K>,
{
    fn has_key(&self, key: K) -> bool {
        self.contains_key(key)
    }
}

impl<K, V, H> Extend<(K, V)> for WormMap<K, V, H>
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

impl<K, V, H> FromIterator<(K, V)> for WormMap<K, V, H>
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

impl<'a, K, V, H> IntoIterator for &'a WormMap<K, V, H>
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
    next: &'a [i8],
    mask: usize,
    slot: usize,
    increment: usize,
    remaining_slots: usize,
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
            if self.next[slot] != 0 {
                return Some((self.keys[slot], &self.values[slot]));
            }
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

/// A view into a single map slot, obtained from [`WormMap::entry`].
pub enum Entry<'a, K, V, H> {
    /// The key is present.
    Occupied(OccupiedEntry<'a, K, V, H>),
    /// The key is absent.
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

/// An occupied slot view; see [`WormMap::entry`].
pub struct OccupiedEntry<'a, K, V, H> {
    map: &'a mut WormMap<K, V, H>,
    key: K,
    /// The chain predecessor of `slot`, captured during the probe so
    /// removal needs no second walk.
    prev: Option<usize>,
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
        self.map.remove_at(self.prev, self.slot)
    }
}

/// A vacant slot view; see [`WormMap::entry`].
pub struct VacantEntry<'a, K, V, H> {
    map: &'a mut WormMap<K, V, H>,
    key: K,
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
    /// Panics on capacity exhaustion, like [`WormMap::insert`].
    pub fn insert(self, value: V) -> &'a mut V {
        let map = self.map;
        let slot = loop {
            if let Some(slot) = map.place_new(self.key) {
                break slot;
            }
            if let Err(err) = map.enlarge() {
                panic!("{err}");
            }
        };
        map.values[slot] = value;
        map.size += 1;
        &mut map.values[slot]
    }
}
