//! Hash tables over flat entries
//!
//! - [`HopscotchTable`]: open addressing with bounded neighborhoods and a
//!   per-slot hop-info bitmap
//! - [`HashStrategy`]: the byte-level hash/equal/copy/swap operations a
//!   table is parameterized by, with [`Fnv1a`] (default) and
//!   [`AHashStrategy`] implementations

mod hash_functions;
mod hopscotch;

pub use hash_functions::{fnv1a_64, AHashStrategy, Fnv1a, HashStrategy, FNV_OFFSET_BASIS, FNV_PRIME};
pub use hopscotch::{HopscotchTable, Iter, OCCUPIED_BIT};
