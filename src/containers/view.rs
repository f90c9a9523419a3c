//! Non-owning views over element ranges
//!
//! A view is a `(pointer, length)` pair borrowed from any buffer or from
//! another view. It never allocates. Because a view borrows its source, a
//! view taken before a mutating container operation cannot be used after
//! it: the borrow checker enforces what would otherwise be an iterator
//! invalidation rule.

use bytemuck::Pod;
use std::fmt;
use std::ops::{Index, IndexMut};
use std::slice;

#[inline]
fn range_end(start: usize, length: usize, size: usize) -> usize {
    let end = start
        .checked_add(length)
        .unwrap_or_else(|| panic!("view range overflows: start {} length {}", start, length));
    assert!(
        end <= size,
        "view range {}..{} out of bounds for length {}",
        start,
        end,
        size
    );
    end
}

#[inline]
fn inclusive_length(start: usize, end: usize) -> usize {
    assert!(start <= end + 1, "view end {} precedes start {}", end, start);
    end + 1 - start
}

/// Shared view of a range of elements
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct View<'a, T> {
    data: &'a [T],
}

impl<'a, T> View<'a, T> {
    /// View an entire slice
    #[inline]
    pub fn new(data: &'a [T]) -> Self {
        Self { data }
    }

    /// View `length` elements of `source` starting at `start`
    ///
    /// # Panics
    ///
    /// Panics if `start + length > source.len()`.
    #[inline]
    pub fn make(source: &'a [T], start: usize, length: usize) -> Self {
        let end = range_end(start, length, source.len());
        Self {
            data: &source[start..end],
        }
    }

    /// View all of `source`
    #[inline]
    pub fn make_full(source: &'a [T]) -> Self {
        Self::new(source)
    }

    /// View `source[start..=end]`
    #[inline]
    pub fn make_start_end(source: &'a [T], start: usize, end: usize) -> Self {
        Self::make(source, start, inclusive_length(start, end))
    }

    /// One-element view of a single value
    #[inline]
    pub fn from_ref(value: &'a T) -> Self {
        Self {
            data: slice::from_ref(value),
        }
    }

    /// Narrow this view to `length` elements starting at `start`
    #[inline]
    pub fn subview(&self, start: usize, length: usize) -> View<'a, T> {
        View::make(self.data, start, length)
    }

    /// Narrow this view to `[start, end]`
    #[inline]
    pub fn subview_start_end(&self, start: usize, end: usize) -> View<'a, T> {
        View::make_start_end(self.data, start, end)
    }

    /// Number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the view is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Element at `index`, if in range
    #[inline]
    pub fn get(&self, index: usize) -> Option<&'a T> {
        self.data.get(index)
    }

    /// Pointer to the first viewed element
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.data.as_ptr()
    }

    /// The viewed elements
    #[inline]
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Iterate over the viewed elements
    #[inline]
    pub fn iter(&self) -> slice::Iter<'a, T> {
        self.data.iter()
    }
}

impl<'a, T: Pod> View<'a, T> {
    /// Raw bytes of the viewed elements
    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        bytemuck::cast_slice(self.data)
    }

    /// Byte-wise equality, independent of element type
    #[inline]
    pub fn bytes_equal<U: Pod>(&self, other: &View<'_, U>) -> bool {
        self.as_bytes() == other.as_bytes()
    }

    /// Reinterpret the viewed bytes as another element type
    ///
    /// Returns `None` when the byte length or alignment does not fit `U`.
    pub fn cast<U: Pod>(&self) -> Option<View<'a, U>> {
        bytemuck::try_cast_slice(self.data)
            .ok()
            .map(View::new)
    }
}

impl<'a, T> Index<usize> for View<'a, T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.data[index]
    }
}

impl<'a, T> IntoIterator for View<'a, T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

impl<'a, T> From<&'a [T]> for View<'a, T> {
    fn from(data: &'a [T]) -> Self {
        Self::new(data)
    }
}

impl<'a, T: fmt::Debug> fmt::Debug for View<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.data).finish()
    }
}

/// Mutable view of a range of elements
pub struct ViewMut<'a, T> {
    data: &'a mut [T],
}

impl<'a, T> ViewMut<'a, T> {
    /// View an entire mutable slice
    #[inline]
    pub fn new(data: &'a mut [T]) -> Self {
        Self { data }
    }

    /// View `length` elements of `source` starting at `start`
    ///
    /// # Panics
    ///
    /// Panics if `start + length > source.len()`.
    #[inline]
    pub fn make(source: &'a mut [T], start: usize, length: usize) -> Self {
        let end = range_end(start, length, source.len());
        Self {
            data: &mut source[start..end],
        }
    }

    /// View all of `source`
    #[inline]
    pub fn make_full(source: &'a mut [T]) -> Self {
        Self::new(source)
    }

    /// View `source[start..=end]`
    #[inline]
    pub fn make_start_end(source: &'a mut [T], start: usize, end: usize) -> Self {
        Self::make(source, start, inclusive_length(start, end))
    }

    /// Shared subview of `length` elements starting at `start`
    #[inline]
    pub fn subview(&self, start: usize, length: usize) -> View<'_, T> {
        View::make(self.data, start, length)
    }

    /// Mutable subview of `length` elements starting at `start`
    #[inline]
    pub fn subview_mut(&mut self, start: usize, length: usize) -> ViewMut<'_, T> {
        ViewMut::make(self.data, start, length)
    }

    /// Mutable subview of `[start, end]`
    #[inline]
    pub fn subview_start_end_mut(&mut self, start: usize, end: usize) -> ViewMut<'_, T> {
        ViewMut::make_start_end(self.data, start, end)
    }

    /// Give up mutability, keeping the full lifetime
    #[inline]
    pub fn into_view(self) -> View<'a, T> {
        View::new(self.data)
    }

    /// Number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the view is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Element at `index`, if in range
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.data.get(index)
    }

    /// Mutable element at `index`, if in range
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.data.get_mut(index)
    }

    /// The viewed elements
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.data
    }

    /// The viewed elements, mutably
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.data
    }

    /// Iterate over the viewed elements
    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.data.iter()
    }

    /// Iterate mutably over the viewed elements
    #[inline]
    pub fn iter_mut(&mut self) -> slice::IterMut<'_, T> {
        self.data.iter_mut()
    }
}

impl<'a, T: Pod> ViewMut<'a, T> {
    /// Raw bytes of the viewed elements
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.data)
    }

    /// Raw bytes of the viewed elements, mutably
    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(self.data)
    }
}

impl<'a, T> Index<usize> for ViewMut<'a, T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.data[index]
    }
}

impl<'a, T> IndexMut<usize> for ViewMut<'a, T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.data[index]
    }
}

impl<'a, T> From<&'a mut [T]> for ViewMut<'a, T> {
    fn from(data: &'a mut [T]) -> Self {
        Self::new(data)
    }
}

impl<'a, T: fmt::Debug> fmt::Debug for ViewMut<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.data.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_and_subview() {
        let mut arr = [0i32; 20];
        arr[10] = 6;

        let mut view = ViewMut::make(&mut arr, 10, 3);
        assert_eq!(view.len(), 3);
        assert_eq!(view[0], 6);
        view[1] = 8;
        view[2] = 6;

        {
            let mut sub = view.subview_mut(1, 1);
            assert_eq!(sub[0], 8);
            sub[0] = 6;
        }

        assert!(view.iter().all(|&x| x == 6));
        assert_eq!(&arr[10..13], &[6, 6, 6]);
    }

    #[test]
    fn test_start_end_is_inclusive() {
        let data = [1u8, 2, 3, 4, 5];
        let view = View::make_start_end(&data, 1, 3);
        assert_eq!(view.as_slice(), &[2, 3, 4]);

        let sub = view.subview_start_end(1, 1);
        assert_eq!(sub.as_slice(), &[3]);

        let empty = View::make_start_end(&data, 2, 1);
        assert!(empty.is_empty());
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_view_panics() {
        let data = [0u32; 4];
        let _ = View::make(&data, 3, 2);
    }

    #[test]
    fn test_bytes_and_cast() {
        let words = [0x0102_0304u32, 0x0506_0708];
        let view = View::new(&words[..]);
        assert_eq!(view.as_bytes().len(), 8);

        let halves: View<'_, u16> = view.cast().unwrap();
        assert_eq!(halves.len(), 4);
        assert!(halves.bytes_equal(&view));

        let odd = [1u8, 2, 3];
        assert!(View::new(&odd[..]).cast::<u16>().is_none());
    }

    #[test]
    fn test_from_ref() {
        let value = 42u64;
        let view = View::from_ref(&value);
        assert_eq!(view.len(), 1);
        assert_eq!(view.as_bytes(), &42u64.to_ne_bytes());
    }

    #[test]
    fn test_into_view_keeps_lifetime() {
        let mut data = vec![1, 2, 3];
        let view = ViewMut::make_full(&mut data).into_view();
        let collected: Vec<i32> = view.into_iter().copied().collect();
        assert_eq!(collected, vec![1, 2, 3]);
    }
}
