//! Hash strategies for the hopscotch table
//!
//! A [`HashStrategy`] bundles the four byte-level operations a table needs:
//! hashing, equality, copy and swap. Only `hash` is mandatory; the others
//! default to plain byte operations. Overriding `hash` and `equal` to look
//! at part of an entry turns a table of pairs into a map keyed on that
//! part, with `insert_or_replace` updating the rest.
//!
//! # Usage
//!
//! ```rust
//! use fatbuf::hash_map::{fnv1a_64, Fnv1a, HashStrategy};
//!
//! assert_eq!(fnv1a_64(b""), 0xcbf2_9ce4_8422_2325);
//! assert_eq!(Fnv1a.hash(b"a"), fnv1a_64(b"a") as usize);
//! ```

use std::hash::{BuildHasher, Hasher};

/// 64-bit FNV-1a offset basis
pub const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

/// 64-bit FNV prime
pub const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a over `bytes`, first byte first
#[inline]
pub fn fnv1a_64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(FNV_PRIME)
    })
}

/// Byte-level operations a hash table is parameterized by
///
/// Implementations must keep `hash` consistent with `equal`: entries that
/// compare equal must hash equally.
pub trait HashStrategy {
    /// Hash the bytes of an entry
    fn hash(&self, bytes: &[u8]) -> usize;

    /// Whether two entries are the same key
    #[inline]
    fn equal(&self, a: &[u8], b: &[u8]) -> bool {
        a == b
    }

    /// Copy `src` over `dst`; both have the entry size
    #[inline]
    fn copy(&self, dst: &mut [u8], src: &[u8]) {
        dst.copy_from_slice(src)
    }

    /// Exchange the contents of two entries
    #[inline]
    fn swap(&self, a: &mut [u8], b: &mut [u8]) {
        a.swap_with_slice(b)
    }
}

/// FNV-1a hashing; the default strategy
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Fnv1a;

impl HashStrategy for Fnv1a {
    #[inline]
    fn hash(&self, bytes: &[u8]) -> usize {
        fnv1a_64(bytes) as usize
    }
}

/// aHash-based hashing with a per-instance random seed
#[derive(Clone, Default)]
pub struct AHashStrategy {
    state: ahash::RandomState,
}

impl AHashStrategy {
    /// Strategy with a fresh random seed
    pub fn new() -> Self {
        Self::default()
    }

    /// Strategy with fixed seeds, for reproducible layouts
    pub fn with_seeds(k0: u64, k1: u64, k2: u64, k3: u64) -> Self {
        Self {
            state: ahash::RandomState::with_seeds(k0, k1, k2, k3),
        }
    }
}

impl HashStrategy for AHashStrategy {
    #[inline]
    fn hash(&self, bytes: &[u8]) -> usize {
        let mut hasher = self.state.build_hasher();
        hasher.write(bytes);
        hasher.finish() as usize
    }
}

impl std::fmt::Debug for AHashStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AHashStrategy").finish_non_exhaustive()
    }
}
