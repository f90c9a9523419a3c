//! # fatbuf: Header-Tagged Buffers and Flat Containers
//!
//! Buffers in this crate carry a small header immediately before their first
//! element. The header records how the buffer was allocated and how many
//! elements it holds, so any element pointer handed out by the crate can be
//! asked for its length and allocation class without extra bookkeeping.
//!
//! ## Key Features
//!
//! - **Tagged Buffers**: Heap ([`TaggedBuffer`]) and inline ([`StackBuffer`])
//!   storage sharing one header layout
//! - **Views**: Non-owning [`View`] / [`ViewMut`] ranges with byte-level access
//! - **Growable Arrays**: [`DynArray`] grows through a pluggable
//!   [`Reallocator`] with power-of-two or exact capacity policies
//! - **Hopscotch Hashing**: [`HopscotchTable`] keeps every entry within a
//!   fixed neighborhood of its home slot
//! - **Configuration**: Env, preset and JSON-file driven configuration for
//!   arrays and tables
//!
//! ## Quick Start
//!
//! ```rust
//! use fatbuf::{DynArray, HopscotchTable, Tag};
//!
//! let mut array = DynArray::new();
//! array.push_back(1u32).unwrap();
//! array.push_back(2u32).unwrap();
//! assert_eq!(array.as_slice(), &[1, 2]);
//! assert_eq!(array.tag(), Some(Tag::GrowableArray));
//!
//! let view = array.view_full();
//! assert_eq!(view.len(), 2);
//!
//! let mut table = HopscotchTable::from_array(array).unwrap();
//! table.insert(3).unwrap();
//! assert!(table.contains(&2));
//! ```

#![warn(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod config;
pub mod containers;
pub mod error;
pub mod hash_map;
pub mod memory;

// Re-export core types
pub use containers::{DynArray, View, ViewMut};
pub use error::{FatBufError, Result};
pub use hash_map::{fnv1a_64, AHashStrategy, Fnv1a, HashStrategy, HopscotchTable};
pub use memory::{
    is_tagged, length_of, tag_of, Reallocator, StackBuffer, SystemReallocator, Tag, Tagged,
    TaggedBuffer, HEADER_SIZE, MAX_ALIGN,
};

// Re-export configuration
pub use config::{
    ArrayConfig, ArrayConfigBuilder, Config, GrowthStrategy, HashTableConfig,
    HashTableConfigBuilder,
};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library (currently no-op, for future use)
pub fn init() {
    log::debug!(
        "Initializing fatbuf v{} (header {} bytes, alignment {})",
        VERSION,
        HEADER_SIZE,
        MAX_ALIGN
    );
}
