//! Key domains and pluggable hash/equality hooks.
//!
//! Tables in this crate store keys directly in flat slot arrays, one
//! monomorphized copy per key/value domain. Two seams make that work:
//!
//! - [`SlotKey`] is the storage contract: which bit pattern marks a free
//!   slot. Numeric keys use zero, reference keys use `None`; the linear
//!   family keeps a dedicated side-slot so the sentinel itself remains a
//!   valid key.
//! - [`KeyHash`] is the hash/equality strategy, injected as a type
//!   parameter at construction. The identity and scatter table variants
//!   are the same algorithms with this hook swapped.

use crate::mix::mix32;
use crate::mix::mix64;
use crate::mix::mix_phi32;
use crate::mix::mix_phi64;

/// A key type that can live directly in an open-addressed slot array.
///
/// `EMPTY` is the bit pattern the linear-probing family uses to mark free
/// slots. The sentinel is still accepted as a key: tables route it to a
/// dedicated side-slot outside the probe array.
pub trait SlotKey: Copy {
    /// Sentinel marking a free slot.
    const EMPTY: Self;

    /// Returns `true` if `self` is the free-slot sentinel.
    fn is_empty(self) -> bool;
}

/// Hash and equality hooks for a key domain.
///
/// Implementations are zero-sized markers selected by type parameter, so
/// swapping the strategy costs nothing at runtime and two tables with
/// different strategies are different types.
pub trait KeyHash<K> {
    /// Scrambles `key` into a well-distributed 64-bit value, folding in
    /// the table's per-instance mixer `seed`.
    fn mix(key: K, seed: u64) -> u64;

    /// Key equality as seen by the table.
    fn eq(a: K, b: K) -> bool;
}

/// The default strategy: a width-appropriate avalanche of the key's bit
/// pattern XORed with the per-instance mixer seed, and plain value
/// equality (bitwise for floats, so `NaN` keys behave sanely).
///
/// For `Option<&T>` reference keys this hashes through `foldhash` by
/// value (requires the `foldhash` feature, enabled by default).
#[derive(Clone, Copy, Debug, Default)]
pub struct ValueHash;

/// The scatter strategy: a single golden-ratio multiply, ignoring the
/// mixer seed entirely.
///
/// **Warning**: because the seed is ignored, every scatter table maps
/// keys to slots in the same order. Bulk-copying keys from one scatter
/// table into another re-inserts them in correlated hash order, which is
/// the classic quadratic-clustering trap. Use only as a leaf container
/// (counting, deduplication) over keys you control, paired with
/// [`Mixing::None`](crate::Mixing::None).
#[derive(Clone, Copy, Debug, Default)]
pub struct ScatterHash;

/// Reference-identity strategy for `Option<&T>` keys: hashes the address
/// and compares with `core::ptr::eq`, so two equal-but-distinct values
/// are two different keys.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityHash;

/// Membership test over a key domain, the seam used by the bulk
/// `remove_all_in` operations. Implemented by all four containers.
pub trait KeyContainer<K> {
    /// Returns `true` if `key` is present in this container.
    fn has_key(&self, key: K) -> bool;
}

macro_rules! narrow_int_keys {
    ($($t:ty),* $(,)?) => {$(
        impl SlotKey for $t {
            const EMPTY: Self = 0;

            #[inline(always)]
            fn is_empty(self) -> bool {
                self == 0
            }
        }

        impl KeyHash<$t> for ValueHash {
            #[inline(always)]
            fn mix(key: $t, seed: u64) -> u64 {
                mix_phi32((key as u32) ^ (seed as u32)) as u64
            }

            #[inline(always)]
            fn eq(a: $t, b: $t) -> bool {
                a == b
            }
        }

        impl KeyHash<$t> for ScatterHash {
            #[inline(always)]
            fn mix(key: $t, _seed: u64) -> u64 {
                mix_phi32(key as u32) as u64
            }

            #[inline(always)]
            fn eq(a: $t, b: $t) -> bool {
                a == b
            }
        }
    )*};
}

macro_rules! wide32_int_keys {
    ($($t:ty),* $(,)?) => {$(
        impl SlotKey for $t {
            const EMPTY: Self = 0;

            #[inline(always)]
            fn is_empty(self) -> bool {
                self == 0
            }
        }

        impl KeyHash<$t> for ValueHash {
            #[inline(always)]
            fn mix(key: $t, seed: u64) -> u64 {
                mix32((key as u32) ^ (seed as u32)) as u64
            }

            #[inline(always)]
            fn eq(a: $t, b: $t) -> bool {
                a == b
            }
        }

        impl KeyHash<$t> for ScatterHash {
            #[inline(always)]
            fn mix(key: $t, _seed: u64) -> u64 {
                mix_phi32(key as u32) as u64
            }

            #[inline(always)]
            fn eq(a: $t, b: $t) -> bool {
                a == b
            }
        }
    )*};
}

macro_rules! wide64_int_keys {
    ($($t:ty),* $(,)?) => {$(
        impl SlotKey for $t {
            const EMPTY: Self = 0;

            #[inline(always)]
            fn is_empty(self) -> bool {
                self == 0
            }
        }

        impl KeyHash<$t> for ValueHash {
            #[inline(always)]
            fn mix(key: $t, seed: u64) -> u64 {
                mix64((key as u64) ^ seed)
            }

            #[inline(always)]
            fn eq(a: $t, b: $t) -> bool {
                a == b
            }
        }

        impl KeyHash<$t> for ScatterHash {
            #[inline(always)]
            fn mix(key: $t, _seed: u64) -> u64 {
                mix_phi64(key as u64)
            }

            #[inline(always)]
            fn eq(a: $t, b: $t) -> bool {
                a == b
            }
        }
    )*};
}

narrow_int_keys!(u8, i8, u16, i16);
wide32_int_keys!(u32, i32);
wide64_int_keys!(u64, i64, usize, isize);

impl SlotKey for f32 {
    const EMPTY: Self = 0.0;

    #[inline(always)]
    fn is_empty(self) -> bool {
        self.to_bits() == 0
    }
}

impl KeyHash<f32> for ValueHash {
    #[inline(always)]
    fn mix(key: f32, seed: u64) -> u64 {
        mix32(key.to_bits() ^ (seed as u32)) as u64
    }

    // Bitwise equality: NaN matches itself, -0.0 and 0.0 are distinct
    // keys (and -0.0 is not the empty sentinel).
    #[inline(always)]
    fn eq(a: f32, b: f32) -> bool {
        a.to_bits() == b.to_bits()
    }
}

impl SlotKey for f64 {
    const EMPTY: Self = 0.0;

    #[inline(always)]
    fn is_empty(self) -> bool {
        self.to_bits() == 0
    }
}

impl KeyHash<f64> for ValueHash {
    #[inline(always)]
    fn mix(key: f64, seed: u64) -> u64 {
        mix64(key.to_bits() ^ seed)
    }

    #[inline(always)]
    fn eq(a: f64, b: f64) -> bool {
        a.to_bits() == b.to_bits()
    }
}

impl<'a, T> SlotKey for Option<&'a T> {
    const EMPTY: Self = None;

    #[inline(always)]
    fn is_empty(self) -> bool {
        self.is_none()
    }
}

#[cfg(feature = "foldhash")]
impl<'a, T> KeyHash<Option<&'a T>> for ValueHash
where
    T: core::hash::Hash + Eq,
{
    #[inline]
    fn mix(key: Option<&'a T>, seed: u64) -> u64 {
        use core::hash::BuildHasher;
        match key {
            Some(value) => foldhash::fast::FixedState::with_seed(seed).hash_one(value),
            None => 0,
        }
    }

    #[inline]
    fn eq(a: Option<&'a T>, b: Option<&'a T>) -> bool {
        a == b
    }
}

impl<'a, T> KeyHash<Option<&'a T>> for IdentityHash {
    #[inline(always)]
    fn mix(key: Option<&'a T>, seed: u64) -> u64 {
        let address = key.map_or(0, |r| r as *const T as usize as u64);
        mix64(address ^ seed)
    }

    #[inline(always)]
    fn eq(a: Option<&'a T>, b: Option<&'a T>) -> bool {
        match (a, b) {
            (Some(x), Some(y)) => core::ptr::eq(x, y),
            (None, None) => true,
            _ => false,
        }
    }
}
