//! Memory layer: the reallocation contract and tagged buffers
//!
//! - [`Reallocator`] / [`SystemReallocator`]: `realloc`-style allocator function
//! - [`TaggedBuffer`]: heap buffer whose header sits right before element 0
//! - [`StackBuffer`]: the same layout stored inline in a caller's frame
//! - [`Tagged`], [`tag_of`], [`length_of`], [`is_tagged`]: introspection

mod allocator;
mod stack;
mod tagged;

pub use allocator::{Reallocator, SystemReallocator, MAX_ALIGN};
pub use stack::StackBuffer;
pub use tagged::{is_tagged, length_of, tag_of, Tag, Tagged, TaggedBuffer, HEADER_SIZE};

pub(crate) use tagged::{assert_element_layout, RawBlock};
