//! DynArray: growable array with a capacity distinct from its length
//!
//! The array lives in a single tagged block whose header records both the
//! logical length and the physical capacity. Growth goes through the
//! block's [`Reallocator`], so the allocator can often extend in place.
//! Newly acquired capacity is zero-filled, which keeps every slot up to
//! `capacity` a valid `T` and lets all shifting be done with safe slice
//! operations.

use crate::config::{ArrayConfig, GrowthStrategy};
use crate::containers::{View, ViewMut};
use crate::error::{FatBufError, Result};
use crate::memory::{
    assert_element_layout, RawBlock, Reallocator, SystemReallocator, Tag, Tagged, TaggedBuffer,
};
use bytemuck::Pod;
use std::alloc::{handle_alloc_error, Layout};
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ops::{Deref, DerefMut, Index, IndexMut};
use std::slice;

#[inline]
fn ranges_overlap(start1: usize, start2: usize, count: usize) -> bool {
    count > 0 && start1 < start2 + count && start2 < start1 + count
}

#[inline]
fn checked_end(start: usize, count: usize, len: usize) -> usize {
    let end = start
        .checked_add(count)
        .unwrap_or_else(|| panic!("range overflows: start {} count {}", start, count));
    assert!(end <= len, "range {}..{} out of bounds for length {}", start, end, len);
    end
}

/// Growable array of flat elements
///
/// A null array owns no memory. The first implicit growth allocates
/// [`ArrayConfig::default_size_bytes`] worth of elements; later growth
/// rounds the required length up to a power of two unless the array is
/// configured for [`GrowthStrategy::Exact`] or the operation sizes exactly.
///
/// Positional operations panic when their preconditions are violated, like
/// slice indexing does. Operations that may allocate return [`Result`].
///
/// # Examples
///
/// ```rust
/// use fatbuf::DynArray;
///
/// let mut arr = DynArray::new();
/// arr.push_back(5).unwrap();
/// arr.push_front(6).unwrap();
/// arr.push_back(7).unwrap();
/// assert_eq!(arr.as_slice(), &[6, 5, 7]);
/// assert_eq!(arr.capacity(), 4);
/// ```
pub struct DynArray<T, A: Reallocator = SystemReallocator> {
    raw: RawBlock,
    alloc: A,
    config: ArrayConfig,
    tag: Tag,
    _marker: PhantomData<T>,
}

impl<T: Pod> DynArray<T> {
    /// Create a new null array
    #[inline]
    pub fn new() -> Self {
        Self::new_in(SystemReallocator)
    }

    /// Create a null array with a custom configuration
    pub fn with_config(config: ArrayConfig) -> Self {
        Self::with_config_in(config, SystemReallocator)
    }

    /// Create an empty array with exactly `capacity` slots
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut arr = Self::new();
        arr.reserve(capacity)?;
        Ok(arr)
    }

    /// Create an array holding a copy of `values` at exact capacity
    pub fn from_slice(values: &[T]) -> Result<Self> {
        let mut arr = Self::with_capacity(values.len())?;
        arr.extend_from_slice(values)?;
        Ok(arr)
    }
}

impl<T: Pod, A: Reallocator> DynArray<T, A> {
    /// Create a null array using a custom allocator
    pub fn new_in(alloc: A) -> Self {
        Self::with_config_in(ArrayConfig::default(), alloc)
    }

    /// Create a null array with a custom configuration and allocator
    pub fn with_config_in(config: ArrayConfig, alloc: A) -> Self {
        assert_element_layout::<T>();
        Self {
            raw: RawBlock::null(),
            alloc,
            config,
            tag: Tag::GrowableArray,
            _marker: PhantomData,
        }
    }

    /// Get the number of elements in the array
    #[inline]
    pub fn len(&self) -> usize {
        self.raw.length()
    }

    /// Check if the array is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the number of allocated slots
    #[inline]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// Allocation class, `None` for the null array
    #[inline]
    pub fn tag(&self) -> Option<Tag> {
        self.raw.tag()
    }

    /// Configuration the array grows by
    #[inline]
    pub fn config(&self) -> &ArrayConfig {
        &self.config
    }

    pub(crate) fn retag(&mut self, tag: Tag) {
        self.tag = tag;
        self.raw.set_tag(tag);
    }

    /// Get a pointer to element 0, null for the null array
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.raw.data_ptr() as *const T
    }

    /// Get a mutable pointer to element 0, null for the null array
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.raw.data_ptr() as *mut T
    }

    /// Get the array as a slice
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.spare_inclusive()[..self.len()]
    }

    /// Get the array as a mutable slice
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        let len = self.len();
        &mut self.spare_inclusive_mut()[..len]
    }

    /// All `capacity` slots, including those past the length
    #[inline]
    fn spare_inclusive(&self) -> &[T] {
        if self.raw.is_null() {
            &[]
        } else {
            // SAFETY: every slot up to capacity is initialized (zero-filled on allocation)
            unsafe { slice::from_raw_parts(self.as_ptr(), self.capacity()) }
        }
    }

    #[inline]
    fn spare_inclusive_mut(&mut self) -> &mut [T] {
        if self.raw.is_null() {
            &mut []
        } else {
            let capacity = self.capacity();
            // SAFETY: as in `spare_inclusive`, with exclusive access
            unsafe { slice::from_raw_parts_mut(self.as_mut_ptr(), capacity) }
        }
    }

    /// First element
    #[inline]
    pub fn front(&self) -> Option<&T> {
        self.as_slice().first()
    }

    /// Last element
    #[inline]
    pub fn back(&self) -> Option<&T> {
        self.as_slice().last()
    }

    /// View `length` elements starting at `start`
    pub fn view(&self, start: usize, length: usize) -> View<'_, T> {
        View::make(self.as_slice(), start, length)
    }

    /// View every element
    pub fn view_full(&self) -> View<'_, T> {
        View::make_full(self.as_slice())
    }

    /// Mutable view of `length` elements starting at `start`
    pub fn view_mut(&mut self, start: usize, length: usize) -> ViewMut<'_, T> {
        ViewMut::make(self.as_mut_slice(), start, length)
    }

    /// Resize the block to exactly `capacity` slots
    fn set_capacity(&mut self, capacity: usize) -> Result<()> {
        self.raw
            .resize(&self.alloc, self.tag, mem::size_of::<T>(), capacity)
    }

    /// Capacity to allocate so that `required` elements fit
    fn target_capacity(&self, required: usize, exact: bool) -> Result<usize> {
        if exact || self.config.growth == GrowthStrategy::Exact {
            return Ok(required);
        }
        if self.raw.is_null() {
            let initial = self.config.initial_capacity(mem::size_of::<T>());
            if initial >= required {
                return Ok(initial);
            }
        }
        required
            .max(1)
            .checked_next_power_of_two()
            .ok_or_else(|| FatBufError::capacity_overflow(required, mem::size_of::<T>()))
    }

    /// Make room for `required` elements without touching the length
    fn ensure_capacity(&mut self, required: usize, exact: bool) -> Result<()> {
        if required <= self.capacity() {
            return Ok(());
        }
        let capacity = self.target_capacity(required, exact)?;
        self.set_capacity(capacity)
    }

    /// Append `count` zeroed elements, returning the old length
    fn grow_by(&mut self, count: usize, exact: bool) -> Result<usize> {
        let old_len = self.len();
        let new_len = old_len
            .checked_add(count)
            .ok_or_else(|| FatBufError::capacity_overflow(usize::MAX, mem::size_of::<T>()))?;
        self.ensure_capacity(new_len, exact)?;
        self.spare_inclusive_mut()[old_len..new_len].fill(T::zeroed());
        self.raw.set_length(new_len);
        Ok(old_len)
    }

    /// Ensure capacity for at least `capacity` elements, sizing exactly.
    ///
    /// The length is unchanged.
    pub fn reserve(&mut self, capacity: usize) -> Result<()> {
        self.ensure_capacity(capacity, true)
    }

    /// Append an element and return a reference to it
    pub fn push_back(&mut self, value: T) -> Result<&mut T> {
        let index = self.grow_by(1, false)?;
        let slot = &mut self.as_mut_slice()[index];
        *slot = value;
        Ok(slot)
    }

    /// Prepend an element and return a reference to it
    pub fn push_front(&mut self, value: T) -> Result<&mut T> {
        self.insert(0, value)
    }

    /// Insert an element at `pos`, shifting the tail right
    ///
    /// # Panics
    ///
    /// Panics if `pos > len`.
    pub fn insert(&mut self, pos: usize, value: T) -> Result<&mut T> {
        let gap = self.insert_zeroed(pos, 1)?;
        gap[0] = value;
        Ok(&mut gap[0])
    }

    /// Open a gap of `count` zeroed elements at `pos`
    ///
    /// # Panics
    ///
    /// Panics if `pos > len`.
    pub fn insert_zeroed(&mut self, pos: usize, count: usize) -> Result<&mut [T]> {
        assert!(pos <= self.len(), "insert position {} past length {}", pos, self.len());
        let old_len = self.grow_by(count, false)?;
        let data = self.as_mut_slice();
        data.copy_within(pos..old_len, pos + count);
        let gap = &mut data[pos..pos + count];
        gap.fill(T::zeroed());
        Ok(gap)
    }

    /// Append a copy of `values`
    pub fn extend_from_slice(&mut self, values: &[T]) -> Result<()> {
        let old_len = self.grow_by(values.len(), false)?;
        self.as_mut_slice()[old_len..].copy_from_slice(values);
        Ok(())
    }

    /// Add `to_add` zeroed elements at the end, returning them
    pub fn grow(&mut self, to_add: usize) -> Result<&mut [T]> {
        let old_len = self.grow_by(to_add, false)?;
        Ok(&mut self.as_mut_slice()[old_len..])
    }

    /// Grow to exactly `size` elements, allocating exactly if needed.
    ///
    /// Never shrinks.
    pub fn grow_to_size(&mut self, size: usize) -> Result<()> {
        let len = self.len();
        if size > len {
            self.grow_by(size - len, true)?;
        }
        Ok(())
    }

    /// Add `to_add` copies of `value` at the end
    pub fn grow_and_initialize(&mut self, to_add: usize, value: T) -> Result<()> {
        self.grow(to_add)?.fill(value);
        Ok(())
    }

    /// Grow to `size` elements, filling new ones with `value`
    pub fn grow_to_size_and_initialize(&mut self, size: usize, value: T) -> Result<()> {
        let old_len = self.len();
        self.grow_to_size(size)?;
        self.as_mut_slice()[old_len..].fill(value);
        Ok(())
    }

    /// Remove and return the last element
    pub fn pop_back(&mut self) -> Option<T> {
        let last = *self.back()?;
        let len = self.len();
        self.raw.set_length(len - 1);
        Some(last)
    }

    /// Remove the last `count` elements
    ///
    /// # Panics
    ///
    /// Panics if `count > len`.
    pub fn pop_back_n(&mut self, count: usize) {
        let len = self.len();
        assert!(count <= len, "cannot pop {} elements from length {}", count, len);
        self.raw.set_length(len - count);
    }

    /// Remove trailing elements until at most `size` remain
    pub fn pop_back_to_size(&mut self, size: usize) {
        if self.len() > size {
            self.raw.set_length(size);
        }
    }

    /// Remove and return the first element, shifting the rest left
    pub fn pop_front(&mut self) -> Option<T> {
        let first = *self.front()?;
        self.delete(0);
        Some(first)
    }

    /// Remove `count` elements at `pos`, keeping the capacity
    ///
    /// # Panics
    ///
    /// Panics if `pos + count > len`.
    pub fn delete_range(&mut self, pos: usize, count: usize) {
        let len = self.len();
        let end = checked_end(pos, count, len);
        if count == 0 {
            return;
        }
        self.as_mut_slice().copy_within(end..len, pos);
        self.raw.set_length(len - count);
    }

    /// Remove the element at `pos`
    pub fn delete(&mut self, pos: usize) {
        self.delete_range(pos, 1)
    }

    /// Remove the elements in `[start, end]`
    pub fn delete_start_end(&mut self, start: usize, end: usize) {
        assert!(start <= end + 1, "range end {} precedes start {}", end, start);
        self.delete_range(start, end + 1 - start)
    }

    /// Remove `count` elements at `pos`, then shrink capacity to the new length
    pub fn shrink_delete_range(&mut self, pos: usize, count: usize) -> Result<()> {
        self.delete_range(pos, count);
        self.shrink_to_fit()
    }

    /// Remove the element at `pos`, then shrink to fit
    pub fn shrink_delete(&mut self, pos: usize) -> Result<()> {
        self.shrink_delete_range(pos, 1)
    }

    /// Remove `[start, end]`, then shrink to fit
    pub fn shrink_delete_start_end(&mut self, start: usize, end: usize) -> Result<()> {
        self.delete_start_end(start, end);
        self.shrink_to_fit()
    }

    /// Reallocate so that capacity equals length
    ///
    /// An empty array becomes the null array.
    pub fn shrink_to_fit(&mut self) -> Result<()> {
        let len = self.len();
        if len == self.capacity() {
            return Ok(());
        }
        self.set_capacity(len)
    }

    /// Exchange `[start1, start1 + count)` with `[start2, start2 + count)`
    ///
    /// Overlapping ranges are swapped element by element from the front, so
    /// the result is deterministic: on `[0, 1, 2, 3, 4]`, `swap_range(1, 3, 2)`
    /// yields `[0, 3, 4, 1, 2]`.
    ///
    /// # Panics
    ///
    /// Panics if either range extends past the length.
    pub fn swap_range(&mut self, start1: usize, start2: usize, count: usize) {
        let len = self.len();
        checked_end(start1, count, len);
        checked_end(start2, count, len);
        if count == 0 || start1 == start2 {
            return;
        }

        let data = self.as_mut_slice();
        if ranges_overlap(start1, start2, count) {
            for i in 0..count {
                data.swap(start1 + i, start2 + i);
            }
        } else {
            let (lo, hi) = if start1 < start2 { (start1, start2) } else { (start2, start1) };
            let (head, tail) = data.split_at_mut(hi);
            head[lo..lo + count].swap_with_slice(&mut tail[..count]);
        }
    }

    /// Exchange two elements
    pub fn swap(&mut self, pos1: usize, pos2: usize) {
        self.swap_range(pos1, pos2, 1)
    }

    /// Overwrite `pos` with the last element and drop the last slot.
    ///
    /// O(1) removal that does not preserve order. Returns the removed value.
    ///
    /// # Panics
    ///
    /// Panics if `pos >= len`.
    pub fn swap_delete(&mut self, pos: usize) -> T {
        let len = self.len();
        assert!(pos < len, "swap_delete position {} out of bounds for length {}", pos, len);
        let data = self.as_mut_slice();
        let removed = data[pos];
        data[pos] = data[len - 1];
        self.raw.set_length(len - 1);
        removed
    }

    /// Remove `count` elements at `pos` by filling the hole from the tail.
    ///
    /// Order is not preserved. Only tail elements outside the removed range
    /// are moved.
    ///
    /// # Panics
    ///
    /// Panics if `pos + count > len`.
    pub fn swap_delete_range(&mut self, pos: usize, count: usize) {
        let len = self.len();
        let end = checked_end(pos, count, len);
        if count == 0 {
            return;
        }
        let new_len = len - count;
        let src = new_len.max(end);
        self.as_mut_slice().copy_within(src..len, pos);
        self.raw.set_length(new_len);
    }

    /// Grow to `size` elements, or delete trailing elements down to `size`.
    ///
    /// Growing past the capacity allocates exactly `size` slots. Shrinking
    /// reallocates so that capacity equals the new length.
    pub fn resize(&mut self, size: usize) -> Result<()> {
        let len = self.len();
        if size > self.capacity() {
            self.grow_to_size(size)
        } else if size >= len {
            self.grow_by(size - len, true).map(|_| ())
        } else {
            self.shrink_delete_range(size, len - size)
        }
    }

    /// Drop every element, keeping the capacity
    pub fn clear(&mut self) {
        self.raw.set_length(0);
    }

    /// Release the storage and become the null array
    pub fn free(&mut self) {
        self.raw.release(&self.alloc, mem::size_of::<T>());
    }

    /// Copy this array into `dest`, giving it the same capacity
    pub fn clone_to<B: Reallocator>(&self, dest: &mut DynArray<T, B>) -> Result<()> {
        self.clone_into_with_capacity(dest, self.capacity())
    }

    /// Copy this array into `dest` at capacity equal to length
    pub fn clone_to_shrink<B: Reallocator>(&self, dest: &mut DynArray<T, B>) -> Result<()> {
        self.clone_into_with_capacity(dest, self.len())
    }

    fn clone_into_with_capacity<B: Reallocator>(
        &self,
        dest: &mut DynArray<T, B>,
        capacity: usize,
    ) -> Result<()> {
        dest.set_capacity(capacity)?;
        let len = self.len();
        if capacity > 0 {
            dest.spare_inclusive_mut()[..len].copy_from_slice(self.as_slice());
        }
        dest.raw.set_length(len);
        Ok(())
    }
}

impl<T: Pod, A: Reallocator + Clone> DynArray<T, A> {
    /// Copy `count` elements from `src` to `dst`, one way.
    ///
    /// Overlapping ranges are staged through a scratch area: the unused
    /// capacity when at least `count` slots are free, otherwise a temporary
    /// buffer.
    ///
    /// # Panics
    ///
    /// Panics if either range extends past the length.
    pub fn copy_range(&mut self, src: usize, dst: usize, count: usize) -> Result<()> {
        let len = self.len();
        checked_end(src, count, len);
        checked_end(dst, count, len);
        if count == 0 || src == dst {
            return Ok(());
        }

        if !ranges_overlap(src, dst, count) {
            self.as_mut_slice().copy_within(src..src + count, dst);
        } else if self.capacity() - len >= count {
            let slots = self.spare_inclusive_mut();
            slots.copy_within(src..src + count, len);
            slots.copy_within(len..len + count, dst);
        } else {
            let mut scratch = TaggedBuffer::<T, A>::allocate_in(count, self.alloc.clone())?;
            scratch.copy_from_slice(&self.as_slice()[src..src + count]);
            self.as_mut_slice()[dst..dst + count].copy_from_slice(&scratch);
        }
        Ok(())
    }

    /// Deep copy preserving the capacity
    pub fn try_clone(&self) -> Result<Self> {
        let mut out = Self::with_config_in(self.config, self.alloc.clone());
        out.tag = self.tag;
        self.clone_to(&mut out)?;
        Ok(out)
    }

    /// Deep copy with capacity equal to length
    pub fn clone_shrink_to_fit(&self) -> Result<Self> {
        let mut out = Self::with_config_in(self.config, self.alloc.clone());
        out.tag = self.tag;
        self.clone_to_shrink(&mut out)?;
        Ok(out)
    }
}

impl<T: Pod> Default for DynArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A: Reallocator> Drop for DynArray<T, A> {
    fn drop(&mut self) {
        self.raw.release(&self.alloc, mem::size_of::<T>());
    }
}

impl<T: Pod, A: Reallocator> Tagged for DynArray<T, A> {
    fn tag(&self) -> Option<Tag> {
        self.raw.tag()
    }

    fn length(&self) -> usize {
        self.raw.length()
    }
}

impl<T: Pod, A: Reallocator> Deref for DynArray<T, A> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl<T: Pod, A: Reallocator> DerefMut for DynArray<T, A> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

impl<T: Pod, A: Reallocator> Index<usize> for DynArray<T, A> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.as_slice()[index]
    }
}

impl<T: Pod, A: Reallocator> IndexMut<usize> for DynArray<T, A> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.as_mut_slice()[index]
    }
}

impl<T: Pod + fmt::Debug, A: Reallocator> fmt::Debug for DynArray<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl<T: Pod + PartialEq, A: Reallocator> PartialEq for DynArray<T, A> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Pod + Eq, A: Reallocator> Eq for DynArray<T, A> {}

impl<T: Pod, A: Reallocator + Clone> Clone for DynArray<T, A> {
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(out) => out,
            Err(_) => {
                let size = self.capacity().saturating_mul(mem::size_of::<T>());
                handle_alloc_error(
                    Layout::from_size_align(size, mem::align_of::<T>())
                        .unwrap_or_else(|_| Layout::new::<T>()),
                )
            }
        }
    }
}

// Safety: DynArray uniquely owns its block
unsafe impl<T: Send, A: Reallocator + Send> Send for DynArray<T, A> {}

// Safety: shared access only hands out shared slices
unsafe impl<T: Sync, A: Reallocator + Sync> Sync for DynArray<T, A> {}
