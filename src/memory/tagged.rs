//! Tagged buffers: element data preceded by an in-band header
//!
//! Every heap block in this crate has the layout
//!
//! ```text
//! +--------------------------+-----------------------------+
//! | Header (HEADER_SIZE)     | element 0 | element 1 | ... |
//! +--------------------------+-----------------------------+
//!                            ^ handle
//! ```
//!
//! A handle is the address of element 0, and the header is recovered by
//! stepping back [`HEADER_SIZE`] bytes. That pointer arithmetic lives in
//! `RawBlock` and nowhere else; everything above it works with slices.

use super::allocator::{Reallocator, SystemReallocator, MAX_ALIGN};
use crate::containers::{View, ViewMut};
use crate::error::{FatBufError, Result};
use bytemuck::Pod;
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};
use std::slice;

/// Allocation class recorded in a buffer header
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Lives inside a caller's frame, never freed explicitly
    StackScoped = 0xFEFF,
    /// Plain heap buffer whose capacity equals its length
    Heap = 0xFEFE,
    /// Growable array with spare capacity
    GrowableArray = 0xFEFD,
    /// Slot array of a hash table
    HashTable = 0xFEFC,
}

impl Tag {
    /// High byte shared by every valid marker
    pub const FAMILY: u16 = 0xFE00;
    const FAMILY_MASK: u16 = 0xFF00;

    /// Raw 16-bit marker stored in the header
    #[inline]
    pub fn magic(self) -> u16 {
        self as u16
    }

    /// Decode a raw marker, rejecting anything outside the tag family
    pub fn from_magic(magic: u16) -> Option<Self> {
        if magic & Self::FAMILY_MASK != Self::FAMILY {
            return None;
        }
        match magic {
            0xFEFF => Some(Self::StackScoped),
            0xFEFE => Some(Self::Heap),
            0xFEFD => Some(Self::GrowableArray),
            0xFEFC => Some(Self::HashTable),
            _ => None,
        }
    }

    /// Whether the buffer vanishes with its scope
    #[inline]
    pub fn is_stack_scoped(self) -> bool {
        self == Self::StackScoped
    }

    /// Whether the buffer is owned heap memory that must be freed
    #[inline]
    pub fn is_heap_backed(self) -> bool {
        !self.is_stack_scoped()
    }
}

/// Metadata stored immediately before element 0
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy)]
pub(crate) struct Header {
    magic: u16,
    length: usize,
    capacity: usize,
}

impl Header {
    pub(crate) const fn new(tag: Tag, length: usize, capacity: usize) -> Self {
        Self {
            magic: tag as u16,
            length,
            capacity,
        }
    }
}

/// Distance in bytes from the start of a block to its first element
pub const HEADER_SIZE: usize = mem::size_of::<Header>();

const _: () = assert!(HEADER_SIZE % MAX_ALIGN == 0);

/// Panics when `T` cannot be laid out directly after a header.
#[inline]
pub(crate) fn assert_element_layout<T>() {
    assert!(mem::size_of::<T>() != 0, "zero-sized element types are not supported");
    assert!(
        mem::align_of::<T>() <= MAX_ALIGN,
        "element alignment exceeds the header alignment"
    );
}

/// Untyped handle to a tagged block (or the null block).
///
/// Does not know its allocator or element size; owners pass both in.
#[derive(Debug)]
pub(crate) struct RawBlock {
    data: Option<NonNull<u8>>,
}

impl RawBlock {
    pub(crate) const fn null() -> Self {
        Self { data: None }
    }

    #[inline]
    pub(crate) fn is_null(&self) -> bool {
        self.data.is_none()
    }

    #[inline]
    pub(crate) fn data_ptr(&self) -> *mut u8 {
        match self.data {
            Some(p) => p.as_ptr(),
            None => ptr::null_mut(),
        }
    }

    #[inline]
    fn header(&self) -> Option<&Header> {
        // SAFETY: a non-null block always carries an initialized header
        // HEADER_SIZE bytes before its data pointer
        self.data
            .map(|p| unsafe { &*(p.as_ptr().sub(HEADER_SIZE) as *const Header) })
    }

    #[inline]
    fn header_mut(&mut self) -> Option<&mut Header> {
        // SAFETY: as in `header`, and `&mut self` guarantees exclusivity
        self.data
            .map(|p| unsafe { &mut *(p.as_ptr().sub(HEADER_SIZE) as *mut Header) })
    }

    #[inline]
    pub(crate) fn tag(&self) -> Option<Tag> {
        self.header().and_then(|h| Tag::from_magic(h.magic))
    }

    #[inline]
    pub(crate) fn length(&self) -> usize {
        self.header().map_or(0, |h| h.length)
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.header().map_or(0, |h| h.capacity)
    }

    /// Set the logical length; the null block only accepts zero.
    pub(crate) fn set_length(&mut self, length: usize) {
        match self.header_mut() {
            Some(h) => {
                assert!(length <= h.capacity, "length {} exceeds capacity {}", length, h.capacity);
                h.length = length;
            }
            None => assert_eq!(length, 0, "cannot set a length on a null buffer"),
        }
    }

    pub(crate) fn set_tag(&mut self, tag: Tag) {
        if let Some(h) = self.header_mut() {
            h.magic = tag.magic();
        }
    }

    fn block_size(elem_size: usize, capacity: usize) -> Result<usize> {
        capacity
            .checked_mul(elem_size)
            .and_then(|bytes| bytes.checked_add(HEADER_SIZE))
            .ok_or_else(|| FatBufError::capacity_overflow(capacity, elem_size))
    }

    /// Resize the block to exactly `new_capacity` elements.
    ///
    /// A null block is allocated with length 0, a zero capacity frees the
    /// block. Newly acquired element bytes are zero-filled, and the length is
    /// clamped to the new capacity. On failure the block is left untouched.
    pub(crate) fn resize<A: Reallocator>(
        &mut self,
        alloc: &A,
        tag: Tag,
        elem_size: usize,
        new_capacity: usize,
    ) -> Result<()> {
        if new_capacity == 0 {
            self.release(alloc, elem_size);
            return Ok(());
        }

        let new_bytes = Self::block_size(elem_size, new_capacity)?;
        let old_capacity = self.capacity();
        let old_bytes = if self.is_null() {
            0
        } else {
            HEADER_SIZE + old_capacity * elem_size
        };
        // SAFETY: data pointers are always HEADER_SIZE bytes past a block start
        let base = self
            .data
            .map(|p| unsafe { NonNull::new_unchecked(p.as_ptr().sub(HEADER_SIZE)) });

        // SAFETY: `base` was returned by `alloc` with size `old_bytes`
        let new_base = unsafe { alloc.reallocate(base, old_bytes, new_bytes) }
            .ok_or_else(|| FatBufError::out_of_memory(new_bytes))?;

        // SAFETY: the new block holds HEADER_SIZE + new_capacity * elem_size bytes
        unsafe {
            let data = new_base.as_ptr().add(HEADER_SIZE);
            let kept = old_capacity.min(new_capacity) * elem_size;
            let total = new_capacity * elem_size;
            if total > kept {
                ptr::write_bytes(data.add(kept), 0, total - kept);
            }

            let header = new_base.as_ptr() as *mut Header;
            if base.is_none() {
                ptr::write(header, Header::new(tag, 0, new_capacity));
            } else {
                let h = &mut *header;
                h.magic = tag.magic();
                h.capacity = new_capacity;
                h.length = h.length.min(new_capacity);
            }
            self.data = Some(NonNull::new_unchecked(data));
        }

        log::trace!(
            "resized {:?} block: {} -> {} elements of {} bytes",
            tag,
            old_capacity,
            new_capacity,
            elem_size
        );
        Ok(())
    }

    /// Free the block and become null.
    pub(crate) fn release<A: Reallocator>(&mut self, alloc: &A, elem_size: usize) {
        if let Some(p) = self.data.take() {
            let capacity = {
                // SAFETY: header precedes data as in `header`
                let h = unsafe { &*(p.as_ptr().sub(HEADER_SIZE) as *const Header) };
                h.capacity
            };
            // SAFETY: block start and size match the last successful resize
            unsafe {
                let base = NonNull::new_unchecked(p.as_ptr().sub(HEADER_SIZE));
                alloc.reallocate(Some(base), HEADER_SIZE + capacity * elem_size, 0);
            }
        }
    }
}

/// Introspection shared by every tagged container
pub trait Tagged {
    /// Allocation class, `None` for a null handle
    fn tag(&self) -> Option<Tag>;

    /// Logical element count; 0 for a null handle
    fn length(&self) -> usize;

    /// Whether the logical length is zero
    fn is_empty(&self) -> bool {
        self.length() == 0
    }
}

/// Allocation class of any tagged container
#[inline]
pub fn tag_of<B: Tagged + ?Sized>(buffer: &B) -> Option<Tag> {
    buffer.tag()
}

/// Logical length of any tagged container
#[inline]
pub fn length_of<B: Tagged + ?Sized>(buffer: &B) -> usize {
    buffer.length()
}

/// Check whether `ptr` is the element pointer of a tagged buffer.
///
/// Returns `false` for null. The header marker is validated rather than
/// trusted, so arbitrary element pointers of untagged memory are rejected
/// unless their preceding bytes happen to form a valid marker.
///
/// # Safety
///
/// When non-null, the [`HEADER_SIZE`] bytes before `ptr` must be readable.
pub unsafe fn is_tagged<T>(ptr: *const T) -> bool {
    if ptr.is_null() {
        return false;
    }
    // SAFETY: caller guarantees the preceding header bytes are readable
    let magic = unsafe {
        let header = (ptr as *const u8).sub(HEADER_SIZE) as *const Header;
        ptr::read_unaligned(ptr::addr_of!((*header).magic))
    };
    Tag::from_magic(magic).is_some()
}

/// Heap buffer of exactly `len` elements behind a tagged header
///
/// The null buffer (after [`TaggedBuffer::null`], `allocate(0)` or
/// `reallocate(0)`) owns no memory and behaves as an empty slice.
///
/// # Examples
///
/// ```rust
/// use fatbuf::{Tag, TaggedBuffer};
///
/// let mut buf = TaggedBuffer::<i32>::allocate(20).unwrap();
/// buf.reallocate(25).unwrap();
/// buf[20] = 6;
/// assert_eq!(buf.len(), 25);
/// assert_eq!(buf.tag(), Some(Tag::Heap));
/// ```
pub struct TaggedBuffer<T, A: Reallocator = SystemReallocator> {
    raw: RawBlock,
    alloc: A,
    _marker: PhantomData<T>,
}

impl<T: Pod> TaggedBuffer<T> {
    /// The null buffer
    pub const fn null() -> Self {
        Self {
            raw: RawBlock::null(),
            alloc: SystemReallocator,
            _marker: PhantomData,
        }
    }

    /// Allocate `len` zeroed elements; `len == 0` yields the null buffer
    pub fn allocate(len: usize) -> Result<Self> {
        Self::allocate_in(len, SystemReallocator)
    }
}

impl TaggedBuffer<u8> {
    /// Allocate a raw byte buffer of `byte_size` zeroed bytes
    pub fn allocate_bytes(byte_size: usize) -> Result<Self> {
        Self::allocate(byte_size)
    }
}

impl<T: Pod, A: Reallocator> TaggedBuffer<T, A> {
    /// The null buffer using a custom allocator
    pub fn null_in(alloc: A) -> Self {
        assert_element_layout::<T>();
        Self {
            raw: RawBlock::null(),
            alloc,
            _marker: PhantomData,
        }
    }

    /// Allocate `len` zeroed elements with a custom allocator
    pub fn allocate_in(len: usize, alloc: A) -> Result<Self> {
        let mut buf = Self::null_in(alloc);
        buf.reallocate(len)?;
        Ok(buf)
    }

    /// Resize to `new_len` elements, keeping the common prefix.
    ///
    /// The data may move; `new_len == 0` frees the buffer.
    pub fn reallocate(&mut self, new_len: usize) -> Result<()> {
        self.raw
            .resize(&self.alloc, Tag::Heap, mem::size_of::<T>(), new_len)?;
        self.raw.set_length(new_len);
        Ok(())
    }

    /// Release the memory
    pub fn free(self) {
        drop(self)
    }

    /// Number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.raw.length()
    }

    /// Whether the buffer holds no elements
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this is the null buffer
    #[inline]
    pub fn is_null(&self) -> bool {
        self.raw.is_null()
    }

    /// Allocation class, `None` when null
    #[inline]
    pub fn tag(&self) -> Option<Tag> {
        self.raw.tag()
    }

    /// Pointer to element 0, null for the null buffer
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.raw.data_ptr() as *const T
    }

    /// Mutable pointer to element 0, null for the null buffer
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.raw.data_ptr() as *mut T
    }

    /// Elements as a slice
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        if self.raw.is_null() {
            &[]
        } else {
            // SAFETY: all `len` elements are initialized (zero-filled or written)
            unsafe { slice::from_raw_parts(self.as_ptr(), self.len()) }
        }
    }

    /// Elements as a mutable slice
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        if self.raw.is_null() {
            &mut []
        } else {
            let len = self.len();
            // SAFETY: as in `as_slice`, with exclusive access
            unsafe { slice::from_raw_parts_mut(self.as_mut_ptr(), len) }
        }
    }

    /// View `length` elements starting at `start`
    pub fn view(&self, start: usize, length: usize) -> View<'_, T> {
        View::make(self.as_slice(), start, length)
    }

    /// Mutable view of `length` elements starting at `start`
    pub fn view_mut(&mut self, start: usize, length: usize) -> ViewMut<'_, T> {
        ViewMut::make(self.as_mut_slice(), start, length)
    }
}

impl<T, A: Reallocator> Drop for TaggedBuffer<T, A> {
    fn drop(&mut self) {
        self.raw.release(&self.alloc, mem::size_of::<T>());
    }
}

impl<T: Pod, A: Reallocator> Tagged for TaggedBuffer<T, A> {
    fn tag(&self) -> Option<Tag> {
        self.raw.tag()
    }

    fn length(&self) -> usize {
        self.raw.length()
    }
}

impl<T: Pod, A: Reallocator> Deref for TaggedBuffer<T, A> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Pod, A: Reallocator> DerefMut for TaggedBuffer<T, A> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Pod + fmt::Debug, A: Reallocator> fmt::Debug for TaggedBuffer<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

// Safety: the buffer uniquely owns its block
unsafe impl<T: Send, A: Reallocator + Send> Send for TaggedBuffer<T, A> {}

// Safety: shared access only hands out shared slices
unsafe impl<T: Sync, A: Reallocator + Sync> Sync for TaggedBuffer<T, A> {}
