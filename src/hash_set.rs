//! Linear-probing hash set, a thin wrapper over the map with `()` values.

use core::fmt::Debug;

use crate::capacity::CapacityError;
use crate::hash_map::HashMap;
use crate::hash_map::KeysIter;
use crate::key::IdentityHash;
use crate::key::KeyContainer;
use crate::key::KeyHash;
use crate::key::ScatterHash;
use crate::key::SlotKey;
use crate::key::ValueHash;
use crate::mix::Mixing;

/// A hash set over [`SlotKey`] key domains, backed by the linear-probing
/// [`HashMap`] with zero-sized values.
///
/// # Examples
///
/// ```rust
/// use worm_hash::HashSet;
///
/// let mut set: HashSet<u32> = HashSet::new();
/// assert!(set.insert(3));
/// assert!(!set.insert(3));
/// assert!(set.contains(3));
/// assert!(set.remove(3));
/// assert!(set.is_empty());
/// ```
pub struct HashSet<K, H = ValueHash> {
    map: HashMap<K, (), H>,
}

/// Scatter-style set; see [`ScatterMap`](crate::hash_map::ScatterMap) for
/// the hash-order caveats.
pub type ScatterSet<K> = HashSet<K, ScatterHash>;

/// Set of reference keys compared by identity (address).
pub type IdentitySet<'a, T> = HashSet<Option<&'a T>, IdentityHash>;

impl<K, H> HashSet<K, H>
where
    K: SlotKey,
    H: KeyHash<K>,
{
    /// Creates an empty set sized for a handful of elements.
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Creates an empty set that can hold `expected` elements without
    /// reallocating.
    pub fn with_capacity(expected: usize) -> Self {
        Self {
            map: HashMap::with_capacity(expected),
        }
    }

    /// Creates an empty set with an explicit hash-order [`Mixing`]
    /// strategy.
    pub fn with_mixing(mixing: Mixing) -> Self {
        Self {
            map: HashMap::with_mixing(mixing),
        }
    }

    /// Creates an empty set with full control over the capacity hint, the
    /// load factor, and the mixing strategy.
    ///
    /// # Panics
    ///
    /// Same contract as [`HashMap::with_options`].
    pub fn with_options(expected: usize, load_factor: f64, mixing: Mixing) -> Self {
        Self {
            map: HashMap::with_options(expected, load_factor, mixing),
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

    /// Number of elements the set can hold before its next growth.
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
    /// [`HashMap::iter`] for the ordering contract.
    pub fn iter(&self) -> Iter<'_, K> {
        Iter {
            inner: self.map.keys(),
        }
    }
}

impl<K, H> Default for HashSet<K, H>
where
    K: SlotKey,
    H: KeyHash<K>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, H> Clone for HashSet<K, H>
where
    K: SlotKey,
{
    fn clone(&self) -> Self {
        Self {
            map: self.map.clone(),
        }
    }
}

impl<K, H> Debug for HashSet<K, H>
where
    K: SlotKey + Debug,
    H: KeyHash<K>,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K, H> PartialEq for HashSet<K, H>
where
    K: SlotKey,
    H: KeyHash<K>,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|key| other.contains(key))
    }
}

impl<K, H> Eq for HashSet<K, H>
where
    K: SlotKey,
    H: KeyHash<K>,
{
}

impl<K, H> KeyContainer<K> for HashSet<K, H>
where
    K: SlotKey,
    H: KeyHash<K>,
{
    fn has_key(&self, key: K) -> bool {
        self.contains(key)
    }
}

impl<K, H> Extend<K> for HashSet<K, H>
where
    K: SlotKey,
    H: KeyHash<K>,
{
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        self.map.extend(iter.into_iter().map(|key| (key, ())));
    }
}

impl<K, H> FromIterator<K> for HashSet<K, H>
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

impl<'a, K, H> IntoIterator for &'a HashSet<K, H>
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
        let mut set: HashSet<u64> = HashSet::new();
        assert!(set.insert(10));
        assert!(set.insert(0)); // sentinel element
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
    fn test_set_equality_ignores_order() {
        let a: HashSet<u32> = (0..50u32).collect();
        let b: HashSet<u32> = (0..50u32).rev().collect();
        assert_eq!(a, b);

        let c: HashSet<u32> = (0..49u32).collect();
        assert_ne!(a, c);
    }

    #[test]
    fn test_set_difference_via_remove_all_in() {
        let mut a: HashSet<u32> = (0..20u32).collect();
        let b: HashSet<u32> = (10..30u32).collect();
        assert_eq!(a.remove_all_in(&b), 10);
        assert_eq!(a.len(), 10);
        assert!(a.contains(9));
        assert!(!a.contains(10));
    }

    #[test]
    fn test_retain_and_iteration() {
        let mut set: HashSet<u32> = (0..100u32).collect();
        set.retain(|key| key % 3 == 0);
        assert_eq!(set.len(), 34);

        let mut seen: Vec<u32> = set.iter().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..100u32).filter(|k| k % 3 == 0).collect::<Vec<_>>());
    }

    #[test]
    fn test_identity_set() {
        let a = String::from("same");
        let b = String::from("same");

        let mut set: IdentitySet<'_, String> = HashSet::new();
        assert!(set.insert(Some(&a)));
        assert!(set.insert(Some(&b)));
        assert!(set.insert(None));
        assert_eq!(set.len(), 3);
        assert!(set.contains(Some(&a)));
    }

    #[test]
    fn test_clone_and_clear() {
        let mut set: HashSet<u32> = (0..32u32).collect();
        let copy = set.clone();
        set.clear();
        assert!(set.is_empty());
        assert_eq!(copy.len(), 32);
    }
}
