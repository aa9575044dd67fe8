//! Displacement-chain hash set, a thin wrapper over [`WormMap`] with `()`
//! values.

use core::fmt::Debug;

use crate::capacity::CapacityError;
use crate::key::IdentityHash;
use crate::key::KeyContainer;
use crate::key::KeyHash;
use crate::key::SlotKey;
use crate::key::ValueHash;
use crate::mix::Mixing;
use crate::worm_map::KeysIter;
use crate::worm_map::WormMap;

/// A hash set over [`SlotKey`] key domains, backed by the
/// displacement-chain [`WormMap`] with zero-sized values.
///
/// # Examples
///
/// ```rust
/// use worm_hash::WormSet;
///
/// let mut set: WormSet<u32> = WormSet::new();
/// assert!(set.insert(3));
/// assert!(!set.insert(3));
/// assert!(set.contains(3));
/// assert!(set.remove(3));
/// assert!(set.is_empty());
/// ```
pub struct WormSet<K, H = ValueHash> {
    map: WormMap<K, (), H>,
}

/// Worm set of reference keys compared by identity (address).
pub type IdentityWormSet<'a, T> = WormSet<Option<&'a T>, IdentityHash>;

impl<K, H> WormSet<K, H>
where
    K: SlotKey,
    H: KeyHash<K>,
{
    /// Creates an empty set sized for a handful of elements.
    pub fn new() -> Self {
        Self {
            map: WormMap::new(),
        }
    }

    /// Creates an empty set that can hold `expected` elements without
    /// reallocating (barring pathological collision patterns).
    pub fn with_capacity(expected: usize) -> Self {
        Self {
            map: WormMap::with_capacity(expected),
        }
    }

    /// Creates an empty set with an explicit hash-order [`Mixing`]
    /// strategy.
    pub fn with_mixing(mixing: Mixing) -> Self {
        Self {
            map: WormMap::with_mixing(mixing),
        }
    }

    /// Creates an empty set with a capacity hint and a mixing strategy.
    pub fn with_capacity_and_mixing(expected: usize, mixing: Mixing) -> Self {
        Self {
            map: WormMap::with_capacity_and_mixing(expected, mixing),
        }
    }

    /// Number of elements in the set.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the set holds no elements.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Number of elements the set is planned to hold without
    /// reallocating.
    pub fn capacity(&self) -> usize {
        self.map.capacity()
    }

    /// Adds `key`, returning `true` if it was not already present.
    pub fn insert(&mut self, key: K) -> bool {
        self.map.insert(key, ()).is_none()
    }

    /// Returns `true` if `key` is present.
    pub fn contains(&self, key: K) -> bool {
        self.map.contains_key(key)
    }

    /// Removes `key`, returning `true` if it was present.
    pub fn remove(&mut self, key: K) -> bool {
        self.map.remove(key).is_some()
    }

    /// Removes all elements, keeping the allocated buffers.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Removes all elements and shrinks the set back to its smallest
    /// footprint.
    pub fn release(&mut self) {
        self.map.release();
    }

    /// Makes room for at least `expected` total elements.
    ///
    /// # Panics
    ///
    /// Panics on capacity exhaustion; see
    /// [`try_ensure_capacity`](Self::try_ensure_capacity).
    pub fn ensure_capacity(&mut self, expected: usize) {
        self.map.ensure_capacity(expected);
    }

    /// Fallible [`ensure_capacity`](Self::ensure_capacity).
    pub fn try_ensure_capacity(&mut self, expected: usize) -> Result<(), CapacityError> {
        self.map.try_ensure_capacity(expected)
    }

    /// Removes every element matching `predicate`, returning how many
    /// were removed.
    pub fn remove_all(&mut self, predicate: impl FnMut(K) -> bool) -> usize {
        self.map.remove_all(predicate)
    }

    /// Keeps only the elements for which `f` returns `true`.
    pub fn retain(&mut self, mut f: impl FnMut(K) -> bool) {
        self.map.retain(|key, _| f(key));
    }

    /// Removes every element present in `other`, returning how many were
    /// removed.
    pub fn remove_all_in<C>(&mut self, other: &C) -> usize
    where
        C: KeyContainer<K>,
    {
        self.map.remove_all_in(other)
    }

    /// Iterates over elements in a randomized order; see
    /// [`WormMap::iter`] for the ordering contract.
    pub fn iter(&self) -> Iter<'_, K> {
        Iter {
            inner: self.map.keys(),
        }
    }
}

impl<K, H> Default for WormSet<K, H>
where
    K: SlotKey,
    H: KeyHash<K>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, H> Clone for WormSet<K, H>
where
    K: SlotKey,
{
    fn clone(&self) -> Self {
        Self {
            map: self.map.clone(),
        }
    }
}

impl<K, H> Debug for WormSet<K, H>
where
    K: SlotKey + Debug,
    H: KeyHash<K>,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K, H> PartialEq for WormSet<K, H>
where
    K: SlotKey,
    H: KeyHash<K>,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|key| other.contains(key))
    }
}

impl<K, H> Eq for WormSet<K, H>
where
    K: SlotKey,
    H: KeyHash<K>,
{
}

impl<K, H> KeyContainer<K> for WormSet<K, H>
where
    K: SlotKey,
    H: KeyHash<K>,
{
    fn has_key(&self, key: K) -> bool {
        self.contains(key)
    }
}

impl<K, H> Extend<K> for WormSet<K, H>
where
    K: SlotKey,
    H: KeyHash<K>,
{
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        self.map.extend(iter.into_iter().map(|key| (key, ())));
    }
}

impl<K, H> FromIterator<K> for WormSet<K, H>
where
    K: SlotKey,
    H: KeyHash<K>,
{
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<'a, K, H> IntoIterator for &'a WormSet<K, H>
where
    K: SlotKey,
    H: KeyHash<K>,
{
    type Item = K;
    type IntoIter = Iter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Randomized-order iterator over set elements.
pub struct Iter<'a, K> {
    inner: KeysIter<'a, K, ()>,
}

impl<K> Iterator for Iter<'_, K>
where
    K: SlotKey,
{
    type Item = K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_contains_remove() {
        let mut set: WormSet<u64> = WormSet::new();
        assert!(set.insert(10));
        assert!(set.insert(0));
        assert!(!set.insert(10));
        assert_eq!(set.len(), 2);

        assert!(set.contains(10));
        assert!(set.contains(0));
        assert!(!set.contains(11));

        assert!(set.remove(10));
        assert!(!set.remove(10));
        assert!(set.remove(0));
        assert!(set.is_empty());
    }

    #[test]
    fn test_dense_fill_and_drain() {
        let mut set: WormSet<u32> = WormSet::with_capacity(8);
        for key in 0..5_000u32 {
            assert!(set.insert(key));
        }
        assert_eq!(set.len(), 5_000);
        for key in 0..5_000u32 {
            assert!(set.remove(key), "key {key}");
        }
        assert!(set.is_empty());
    }

    #[test]
    fn test_set_equality_ignores_order() {
        let a: WormSet<u32> = (0..50u32).collect();
        let b: WormSet<u32> = (0..50u32).rev().collect();
        assert_eq!(a, b);

        let c: WormSet<u32> = (0..49u32).collect();
        assert_ne!(a, c);
    }

    #[test]
    fn test_cross_family_remove_all_in() {
        // Membership container seam works across table families.
        let mut worm: WormSet<u32> = (0..20u32).collect();
        let linear: crate::HashSet<u32> = (10..30u32).collect();
        assert_eq!(worm.remove_all_in(&linear), 10);
        assert_eq!(worm.len(), 10);
        assert!(worm.contains(9));
        assert!(!worm.contains(10));
    }

    #[test]
    fn test_retain_and_iteration() {
        let mut set: WormSet<u32> = (0..100u32).collect();
        set.retain(|key| key % 3 == 0);
        assert_eq!(set.len(), 34);

        let mut seen: Vec<u32> = set.iter().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..100u32).filter(|k| k % 3 == 0).collect::<Vec<_>>());
    }

    #[test]
    fn test_clone_and_clear() {
        let mut set: WormSet<u32> = (0..32u32).collect();
        let copy = set.clone();
        set.clear();
        assert!(set.is_empty());
        assert_eq!(copy.len(), 32);
    }
}
