//! Reallocation contract shared by every buffer layer
//!
//! All storage in this crate flows through a single function with `realloc`
//! semantics: a `None` pointer requests a fresh block, a zero size releases
//! the block, anything else resizes it (possibly moving it).

use std::alloc::{self, Layout};
use std::ptr::NonNull;

/// Alignment of every block handed out by a [`Reallocator`].
///
/// The tagged header is padded to this alignment, so element types may be
/// aligned up to this value.
pub const MAX_ALIGN: usize = 16;

/// General allocator function used uniformly by the buffer layers.
///
/// # Safety
///
/// Implementations must return blocks aligned to [`MAX_ALIGN`] that are valid
/// for reads and writes of `new_size` bytes, must preserve the first
/// `min(old_size, new_size)` bytes when resizing, and must accept back any
/// block they returned together with the size it was last resized to.
pub unsafe trait Reallocator {
    /// Allocate, resize or free a block.
    ///
    /// * `ptr == None` allocates a fresh block of `new_size` bytes.
    /// * `new_size == 0` frees `ptr` and returns `None`.
    /// * Otherwise the block is resized and the possibly moved pointer returned.
    ///
    /// Returns `None` on allocation failure when `new_size > 0`.
    ///
    /// # Safety
    ///
    /// `ptr` must be `None` or a block previously returned by this allocator
    /// whose current size is `old_size`.
    unsafe fn reallocate(
        &self,
        ptr: Option<NonNull<u8>>,
        old_size: usize,
        new_size: usize,
    ) -> Option<NonNull<u8>>;
}

/// [`Reallocator`] backed by the global Rust allocator
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SystemReallocator;

unsafe impl Reallocator for SystemReallocator {
    unsafe fn reallocate(
        &self,
        ptr: Option<NonNull<u8>>,
        old_size: usize,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        match ptr {
            None if new_size == 0 => None,
            None => {
                let layout = Layout::from_size_align(new_size, MAX_ALIGN).ok()?;
                NonNull::new(unsafe { alloc::alloc(layout) })
            }
            Some(p) => {
                let old_layout = Layout::from_size_align(old_size, MAX_ALIGN).ok()?;
                if new_size == 0 {
                    unsafe { alloc::dealloc(p.as_ptr(), old_layout) };
                    return None;
                }
                if new_size == old_size {
                    return Some(p);
                }
                // Reject sizes the layout rules cannot express before handing them to realloc
                Layout::from_size_align(new_size, MAX_ALIGN).ok()?;
                NonNull::new(unsafe { alloc::realloc(p.as_ptr(), old_layout, new_size) })
            }
        }
    }
}
