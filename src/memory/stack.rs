//! Frame-scoped tagged buffers
//!
//! A [`StackBuffer`] carries the same header as heap blocks, directly in
//! front of an inline array, so [`is_tagged`](super::is_tagged) and the
//! [`Tagged`] introspection work on it unchanged. It is never freed
//! explicitly; it disappears with the scope that owns it.

use super::tagged::{assert_element_layout, Header, Tag, Tagged};
use crate::containers::{View, ViewMut};
use bytemuck::Pod;
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Fixed-length buffer of `N` elements stored inline
///
/// # Examples
///
/// ```rust
/// use fatbuf::{StackBuffer, Tag};
///
/// let mut arr = StackBuffer::<i32, 20>::new();
/// arr[10] = 6;
/// assert_eq!(arr.len(), 20);
/// assert_eq!(arr.tag(), Some(Tag::StackScoped));
/// assert!(unsafe { fatbuf::is_tagged(arr.as_ptr()) });
/// ```
#[repr(C)]
pub struct StackBuffer<T, const N: usize> {
    header: Header,
    data: [T; N],
}

impl<T: Pod, const N: usize> StackBuffer<T, N> {
    /// Zero-initialized buffer
    pub fn new() -> Self {
        assert_element_layout::<T>();
        Self {
            header: Header::new(Tag::StackScoped, N, N),
            data: [T::zeroed(); N],
        }
    }

    /// Buffer filled with `value`
    pub fn filled(value: T) -> Self {
        assert_element_layout::<T>();
        Self {
            header: Header::new(Tag::StackScoped, N, N),
            data: [value; N],
        }
    }

    /// Number of elements, always `N`
    #[inline]
    pub const fn len(&self) -> usize {
        N
    }

    /// Whether `N == 0`
    #[inline]
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Always [`Tag::StackScoped`]
    #[inline]
    pub fn tag(&self) -> Option<Tag> {
        Some(Tag::StackScoped)
    }

    /// Pointer to element 0; the header sits right before it
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.data.as_ptr()
    }

    /// Mutable pointer to element 0
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.data.as_mut_ptr()
    }

    /// Elements as a slice
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Elements as a mutable slice
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// View `length` elements starting at `start`
    pub fn view(&self, start: usize, length: usize) -> View<'_, T> {
        View::make(&self.data, start, length)
    }

    /// Mutable view of `length` elements starting at `start`
    pub fn view_mut(&mut self, start: usize, length: usize) -> ViewMut<'_, T> {
        ViewMut::make(&mut self.data, start, length)
    }
}

impl<T: Pod, const N: usize> Default for StackBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Pod, const N: usize> Tagged for StackBuffer<T, N> {
    fn tag(&self) -> Option<Tag> {
        Some(Tag::StackScoped)
    }

    fn length(&self) -> usize {
        N
    }
}

impl<T: Pod, const N: usize> Deref for StackBuffer<T, N> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T: Pod, const N: usize> DerefMut for StackBuffer<T, N> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T: Pod + fmt::Debug, const N: usize> fmt::Debug for StackBuffer<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.data.iter()).finish()
    }
}
