//! Byte-packed chain arithmetic for the displacement-chain tables.
//!
//! Each bucket of a worm table carries one signed byte:
//!
//! - `0`: the bucket is free.
//! - magnitude `1..=126`: forward circular distance to the next chain
//!   member.
//! - magnitude `127` ([`END_OF_CHAIN`]): the bucket is its chain's last
//!   member.
//! - sign: positive means the bucket is a chain head (it is the home
//!   bucket of every key in the chain), negative means it is an interior
//!   or tail member rooted elsewhere.
//!
//! All circular-index arithmetic lives in the few helpers below so the
//! relocation algorithm in `worm_map` stays auditable.

use alloc::vec::Vec;

/// Offset magnitude marking the last member of a chain.
pub(crate) const END_OF_CHAIN: i8 = 127;

/// Largest encodable forward distance between two chain members.
pub(crate) const MAX_OFFSET: usize = 126;

/// Relocation attempts allowed per recursion depth. Indexed by depth;
/// running off the end of this table aborts the relocation search and
/// forces a table doubling instead.
pub(crate) const RECURSIVE_MOVE_ATTEMPTS: [u32; 2] = [10, 1];

/// Circular forward step of `offset` slots.
#[inline(always)]
pub(crate) fn add_offset(slot: usize, offset: usize, mask: usize) -> usize {
    (slot + offset) & mask
}

/// Circular forward distance from `from` to `to`.
#[inline(always)]
pub(crate) fn offset_between(from: usize, to: usize, mask: usize) -> usize {
    to.wrapping_sub(from) & mask
}

/// Usable search window for a buffer with the given mask: offsets above
/// the mask would wrap onto already-visited slots.
#[inline(always)]
pub(crate) fn search_range(mask: usize) -> usize {
    usize::min(MAX_OFFSET, mask)
}

/// An immutable, union-composable set of bucket indices that the
/// relocation search must not touch.
///
/// While a chain is being extended, its buckets must never be chosen as
/// relocation sources (moving the chain's own tail would invalidate the
/// append in progress) nor as targets. Recursive relocation stacks these
/// sets with borrowed [`Excluded::Union`] nodes instead of mutating a
/// visited-set, which keeps the recursive calls side-effect-free.
pub(crate) enum Excluded<'a> {
    /// Nothing excluded.
    None,
    /// A single excluded bucket.
    Single(usize),
    /// The buckets of one chain, sorted ascending.
    Chain(Vec<usize>),
    /// Union of two exclusion sets further up the call stack.
    Union(&'a Excluded<'a>, &'a Excluded<'a>),
}

impl<'a> Excluded<'a> {
    /// Builds an exclusion set from the slots of one chain, in walk
    /// order. A chain's walk order is ascending unless the chain wraps
    /// the circular buffer, so sorting is only needed in the wrapped
    /// case.
    pub(crate) fn from_chain(mut slots: Vec<usize>, wrapped: bool) -> Excluded<'static> {
        if wrapped {
            slots.sort_unstable();
        }
        debug_assert!(slots.is_sorted());
        Excluded::Chain(slots)
    }

    /// Stacks `self` with `other` without copying either.
    pub(crate) fn union(&'a self, other: &'a Excluded<'a>) -> Excluded<'a> {
        Excluded::Union(self, other)
    }

    /// Membership test used by the relocation search.
    pub(crate) fn contains(&self, slot: usize) -> bool {
        match self {
            Excluded::None => false,
            Excluded::Single(excluded) => *excluded == slot,
            Excluded::Chain(slots) => slots.binary_search(&slot).is_ok(),
            Excluded::Union(left, right) => left.contains(slot) || right.contains(slot),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_offset_arithmetic_wraps() {
        let mask = 15;
        assert_eq!(add_offset(14, 3, mask), 1);
        assert_eq!(offset_between(14, 1, mask), 3);
        assert_eq!(offset_between(1, 14, mask), 13);
        assert_eq!(offset_between(5, 5, mask), 0);
    }

    #[test]
    fn test_search_range_caps_at_buffer() {
        assert_eq!(search_range(7), 7);
        assert_eq!(search_range(1023), MAX_OFFSET);
    }

    #[test]
    fn test_excluded_membership() {
        let chain = Excluded::from_chain(vec![3, 9, 120], false);
        let single = Excluded::Single(42);
        let union = chain.union(&single);

        assert!(union.contains(9));
        assert!(union.contains(42));
        assert!(!union.contains(10));
        assert!(!Excluded::None.contains(0));
    }

    #[test]
    fn test_excluded_sorts_wrapped_chains() {
        let chain = Excluded::from_chain(vec![120, 2, 7], true);
        assert!(chain.contains(2));
        assert!(chain.contains(120));
        assert!(!chain.contains(60));
    }
}
