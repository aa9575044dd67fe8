//! Bit mixing and hash-order randomization.
//!
//! Every table in this crate scrambles raw key bits through one of the
//! avalanche finalizers below, XORed with a per-instance mixer seed, before
//! masking the result into a slot index. The seed itself is produced by a
//! [`Mixing`] strategy each time a table (re)allocates its buffers, so two
//! tables holding the same keys do not share a probe order, and a single
//! table changes its probe order on every resize.

use core::sync::atomic::AtomicU64;
use core::sync::atomic::Ordering;

/// Golden-ratio constant for 32-bit phi mixing.
const PHI32: u32 = 0x9e3779b9;

/// Golden-ratio constant for 64-bit phi mixing.
const PHI64: u64 = 0x9e3779b97f4a7c15;

/// 64-bit avalanche finalizer (Stafford variant of the Murmur3 fmix64
/// sequence). Used for 64-bit key domains and for seed evolution.
#[inline(always)]
pub fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 32)).wrapping_mul(0x4cd6944c5cc20b6d);
    z = (z ^ (z >> 29)).wrapping_mul(0xfc12c5b19d3259e9);
    z ^ (z >> 32)
}

/// 32-bit avalanche finalizer (Murmur3 fmix32).
#[inline(always)]
pub fn mix32(mut k: u32) -> u32 {
    k = (k ^ (k >> 16)).wrapping_mul(0x85ebca6b);
    k = (k ^ (k >> 13)).wrapping_mul(0xc2b2ae35);
    k ^ (k >> 16)
}

/// Cheap golden-ratio mix for sub-32-bit domains. Weaker avalanche than
/// [`mix32`], adequate for 8/16-bit key spaces.
#[inline(always)]
pub fn mix_phi32(k: u32) -> u32 {
    let h = k.wrapping_mul(PHI32);
    h ^ (h >> 16)
}

/// Cheap golden-ratio mix over 64 bits. This is the scatter-table hash and
/// the iteration-seed step function.
#[inline(always)]
pub fn mix_phi64(k: u64) -> u64 {
    let h = k.wrapping_mul(PHI64);
    h ^ (h >> 32)
}

/// Derives a probe stride from an iteration seed.
///
/// The stride is always odd, hence coprime with any power-of-two buffer
/// size, so a full walk visits every slot exactly once.
#[inline(always)]
pub(crate) fn iteration_increment(seed: u64) -> usize {
    29 + (((seed & 7) << 1) as usize)
}

/// Process-global evolving seed state. See [`next_random_seed`].
static RANDOM_SEED: AtomicU64 = AtomicU64::new(0);

/// Returns a fresh pseudo-random seed.
///
/// The counter advances by the 64-bit golden ratio on every call and is
/// folded with the address of the counter itself, which varies across
/// processes under ASLR. No OS entropy source is required, keeping this
/// usable in no_std builds.
pub(crate) fn next_random_seed() -> u64 {
    let counter = RANDOM_SEED.fetch_add(PHI64, Ordering::Relaxed);
    mix64(counter ^ (&raw const RANDOM_SEED as usize as u64))
}

/// Per-container hash-order mixing strategy.
///
/// Consulted whenever a table (re)allocates its buffers to derive the seed
/// that scrambles hash values before they are masked into slot indices.
///
/// # Examples
///
/// ```rust
/// use worm_hash::HashMap;
/// use worm_hash::Mixing;
///
/// let mut map: HashMap<u64, u64> = HashMap::with_mixing(Mixing::Deterministic);
/// map.insert(1, 10);
/// assert_eq!(map.get(1), Some(&10));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mixing {
    /// Derive a fresh seed from a process-global evolving counter every
    /// time buffers are allocated. This decorrelates probe order across
    /// container instances and across resizes, which is the defense
    /// against algorithmic-complexity (hash flooding) attacks. The
    /// default.
    #[default]
    Randomized,
    /// Derive the seed from the buffer size alone. Probe order is
    /// reproducible across runs and processes, at the cost of being
    /// predictable to an adversary who controls the key stream.
    Deterministic,
    /// No mixing at all: the seed is zero and keys map to slots straight
    /// from their mixed bit pattern.
    ///
    /// **Warning**: with linear probing this exposes the table to
    /// worst-case clustering from adversarial or merely correlated key
    /// sequences, and copying keys between two `Mixing::None` tables
    /// re-inserts them in correlated hash order. Only use this for
    /// counting-style workloads over trusted keys (the classic "scatter
    /// table" setup, typically paired with
    /// [`ScatterHash`](crate::key::ScatterHash)).
    None,
}

impl Mixing {
    /// Produces the key-mixer seed for a buffer of `buffer_size` slots.
    pub(crate) fn new_key_mixer(self, buffer_size: usize) -> u64 {
        match self {
            Mixing::Randomized => next_random_seed(),
            Mixing::Deterministic => mix64(buffer_size as u64 ^ PHI64),
            Mixing::None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mix64_avalanche() {
        // Flipping one input bit must change roughly half the output bits.
        let base = mix64(0xdead_beef_cafe_f00d);
        for bit in 0..64 {
            let flipped = mix64(0xdead_beef_cafe_f00d ^ (1u64 << bit));
            let changed = (base ^ flipped).count_ones();
            assert!(changed >= 16, "bit {bit} changed only {changed} bits");
        }
    }

    #[test]
    fn test_mix32_distributes_small_keys() {
        let mut seen = std::collections::HashSet::new();
        for k in 0u32..1024 {
            seen.insert(mix32(k));
        }
        assert_eq!(seen.len(), 1024);
    }

    #[test]
    fn test_iteration_increment_is_odd() {
        for seed in 0..64u64 {
            assert_eq!(iteration_increment(seed) % 2, 1);
        }
    }

    #[test]
    fn test_random_seed_evolves() {
        let a = next_random_seed();
        let b = next_random_seed();
        assert_ne!(a, b);
    }

    #[test]
    fn test_deterministic_mixer_depends_on_size_only() {
        assert_eq!(
            Mixing::Deterministic.new_key_mixer(64),
            Mixing::Deterministic.new_key_mixer(64)
        );
        assert_ne!(
            Mixing::Deterministic.new_key_mixer(64),
            Mixing::Deterministic.new_key_mixer(128)
        );
        assert_eq!(Mixing::None.new_key_mixer(64), 0);
    }
}
