#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// Capacity planning for power-of-two buffers, and the crate's one
/// recoverable error type.
pub mod capacity;

/// Byte-packed chain arithmetic shared by the worm tables.
mod chain;

/// Linear-probing map with backward-shift deletion.
pub mod hash_map;

/// Linear-probing set wrapper.
pub mod hash_set;

/// Key storage sentinels and pluggable hash/equality strategies.
pub mod key;

/// Bit mixers and the hash-order mixing strategy.
pub mod mix;

/// Displacement-chain ("worm") map.
pub mod worm_map;

/// Displacement-chain set wrapper.
pub mod worm_set;

pub use capacity::CapacityError;
pub use hash_map::HashMap;
pub use hash_map::IdentityMap;
pub use hash_map::ScatterMap;
pub use hash_set::HashSet;
pub use hash_set::IdentitySet;
pub use hash_set::ScatterSet;
pub use key::IdentityHash;
pub use key::KeyContainer;
pub use key::KeyHash;
pub use key::ScatterHash;
pub use key::SlotKey;
pub use key::ValueHash;
pub use mix::Mixing;
pub use worm_map::IdentityWormMap;
pub use worm_map::WormMap;
pub use worm_set::IdentityWormSet;
pub use worm_set::WormSet;
