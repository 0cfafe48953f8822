use alloc::vec::Vec;
use core::fmt;
use core::ops::Deref;
use core::slice;

use thiserror::Error;
use track_ptr::{Trackable, TrackingPointer};

// -----------------------------------------------------------------------------
// Error

/// Returned by the checked insertions and removals of [`TrackedVec`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("index {index} is out of bounds for length {len}")]
pub struct IndexError {
    /// The requested index.
    pub index: usize,
    /// The length of the vector at the time of the call.
    pub len: usize,
}

// -----------------------------------------------------------------------------
// TrackedVec

/// A vector of [`Trackable`] values that keeps their observers up to date.
///
/// Whenever an operation moves elements (a reallocation, or the shift of
/// an insertion or removal), the moved elements are reported as
/// [`relocated`](Trackable::relocated), so every tracking pointer keeps
/// resolving to the element it was acquired from.
///
/// - Elements dropped by the vector null their observers.
/// - Elements moved out of the vector (`remove`, `pop`, ...) are in
///   transit: their observers resolve to null until the new owner calls
///   [`relocated`](Trackable::relocated) or [`acquire`](Trackable::acquire).
///
/// # Examples
///
/// ```
/// use track_ptr::Trackable;
/// use track_utils::Tracked;
/// use track_utils::collections::TrackedVec;
///
/// let mut vec = TrackedVec::new();
/// vec.push(Tracked::new(0));
/// let ptr = vec[0].acquire();
///
/// for i in 1..100 {
///     vec.push(Tracked::new(i));
/// }
///
/// assert!(ptr.points_to(&vec[0]));
/// assert_eq!(vec.resolve(&ptr).map(|v| **v), Some(0));
///
/// vec.clear();
/// assert!(ptr.is_null());
/// ```
pub struct TrackedVec<T> {
    inner: Vec<T>,
}

impl<T> TrackedVec<T> {
    /// Creates an empty `TrackedVec`.
    ///
    /// This function does not allocate any memory.
    #[inline]
    pub const fn new() -> Self {
        Self { inner: Vec::new() }
    }

    /// Creates an empty `TrackedVec` with room for `capacity` elements.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.inner
    }

    /// Returns a mutable reference to an element.
    ///
    /// Swapping or replacing whole elements through it bypasses the vector,
    /// use [`swap`](Self::swap) and the [`Trackable`] hooks instead.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.inner.get_mut(index)
    }

    /// Mutable iteration, with the same caveat as [`get_mut`](Self::get_mut).
    #[inline]
    pub fn iter_mut(&mut self) -> slice::IterMut<'_, T> {
        self.inner.iter_mut()
    }

    /// Drops every element after the first `len`.
    #[inline]
    pub fn truncate(&mut self, len: usize) {
        self.inner.truncate(len);
    }

    /// Drops every element; their observers become null.
    #[inline]
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Unwraps the underlying vector.
    ///
    /// Elements stay where they are; from then on the caller reports moves.
    #[inline]
    pub fn into_vec(self) -> Vec<T> {
        self.inner
    }
}

impl<T: Trackable> TrackedVec<T> {
    /// Takes ownership of `vec`, relocating every element.
    pub fn from_vec(vec: Vec<T>) -> Self {
        let this = Self { inner: vec };
        this.relocate_from(0);
        this
    }

    /// Reports every element from `start` as relocated.
    fn relocate_from(&self, start: usize) {
        for item in &self.inner[start..] {
            item.relocated();
        }
    }

    /// Reports the moves of an operation that started with the buffer at `base`.
    ///
    /// Everything moved if the buffer did; otherwise only the elements
    /// from `start`.
    fn settle(&self, base: *const T, start: usize) {
        if base == self.inner.as_ptr() {
            self.relocate_from(start);
        } else {
            log::trace!("TrackedVec buffer moved, relocating {} elements", self.len());
            self.relocate_from(0);
        }
    }

    /// Appends an element.
    pub fn push(&mut self, value: T) {
        let base = self.inner.as_ptr();
        self.inner.push(value);
        self.settle(base, self.len() - 1);
    }

    /// Inserts an element at `index`, shifting the following ones.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, value: T) {
        let base = self.inner.as_ptr();
        self.inner.insert(index, value);
        self.settle(base, index);
    }

    /// Inserts an element at `index`, or returns it with an error when
    /// `index > len`.
    pub fn try_insert(&mut self, index: usize, value: T) -> Result<(), (IndexError, T)> {
        let len = self.len();
        if index > len {
            return Err((IndexError { index, len }, value));
        }
        self.insert(index, value);
        Ok(())
    }

    /// Removes and returns the element at `index`, shifting the following ones.
    ///
    /// The returned value is in transit, see the type documentation.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn remove(&mut self, index: usize) -> T {
        let value = self.inner.remove(index);
        self.relocate_from(index);
        value.suspended();
        value
    }

    /// Checked version of [`remove`](Self::remove).
    pub fn try_remove(&mut self, index: usize) -> Result<T, IndexError> {
        let len = self.len();
        if index >= len {
            return Err(IndexError { index, len });
        }
        Ok(self.remove(index))
    }

    /// Removes the element at `index`, moving the last one into its place.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn swap_remove(&mut self, index: usize) -> T {
        let value = self.inner.swap_remove(index);
        if let Some(moved) = self.inner.get(index) {
            moved.relocated();
        }
        value.suspended();
        value
    }

    /// Removes the last element; the returned value is in transit.
    pub fn pop(&mut self) -> Option<T> {
        let value = self.inner.pop()?;
        value.suspended();
        Some(value)
    }

    /// Swaps two elements; each keeps its observers.
    ///
    /// # Panics
    ///
    /// Panics if `a` or `b` are out of bounds.
    pub fn swap(&mut self, a: usize, b: usize) {
        self.inner.swap(a, b);
        self.inner[a].relocated();
        self.inner[b].relocated();
    }

    /// Resizes in place, filling new slots with the results of `f`.
    pub fn resize_with<F>(&mut self, new_len: usize, f: F)
    where
        F: FnMut() -> T,
    {
        let base = self.inner.as_ptr();
        let len = self.len();
        self.inner.resize_with(new_len, f);
        self.settle(base, len.min(new_len));
    }

    /// Reserves room for at least `additional` more elements.
    pub fn reserve(&mut self, additional: usize) {
        let base = self.inner.as_ptr();
        self.inner.reserve(additional);
        self.settle(base, self.len());
    }

    /// Shrinks the capacity as much as possible.
    pub fn shrink_to_fit(&mut self) {
        let base = self.inner.as_ptr();
        self.inner.shrink_to_fit();
        self.settle(base, self.len());
    }

    /// Returns the index of the element `ptr` resolves to, if it is in this vector.
    pub fn index_of(&self, ptr: &TrackingPointer<T>) -> Option<usize> {
        let size = size_of::<T>();
        let addr = ptr.as_ptr();
        if size == 0 || addr.is_null() {
            return None;
        }

        let offset = addr.addr().checked_sub(self.inner.as_ptr().addr())?;
        let index = offset / size;
        (offset % size == 0 && index < self.len()).then_some(index)
    }

    /// Returns the element `ptr` resolves to, if it is in this vector.
    ///
    /// Unlike [`TrackingPointer::as_ref`], this is safe: the vector is
    /// borrowed for the lifetime of the result.
    #[inline]
    pub fn resolve(&self, ptr: &TrackingPointer<T>) -> Option<&T> {
        self.index_of(ptr).map(|index| &self.inner[index])
    }

    /// Mutable version of [`resolve`](Self::resolve).
    #[inline]
    pub fn resolve_mut(&mut self, ptr: &TrackingPointer<T>) -> Option<&mut T> {
        self.index_of(ptr).map(|index| &mut self.inner[index])
    }
}

impl<T> Default for TrackedVec<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Deref for TrackedVec<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        &self.inner
    }
}

impl<'a, T> IntoIterator for &'a TrackedVec<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

impl<T: Trackable> Extend<T> for TrackedVec<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let base = self.inner.as_ptr();
        let len = self.len();
        self.inner.extend(iter);
        self.settle(base, len);
    }
}

impl<T: Trackable> FromIterator<T> for TrackedVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T: Trackable> From<Vec<T>> for TrackedVec<T> {
    #[inline]
    fn from(vec: Vec<T>) -> Self {
        Self::from_vec(vec)
    }
}

impl<T: Trackable + Clone> Clone for TrackedVec<T> {
    /// Clones every element; the clones are new identities.
    #[inline]
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        let base = self.inner.as_ptr();
        self.inner.clone_from(&source.inner);
        self.settle(base, self.len());
    }
}

impl<T: fmt::Debug> fmt::Debug for TrackedVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.iter()).finish()
    }
}

impl<T: serde_core::Serialize> serde_core::Serialize for TrackedVec<T> {
    #[inline]
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde_core::Serializer,
    {
        serde_core::Serialize::serialize(&self.inner, serializer)
    }
}

impl<'de, T> serde_core::Deserialize<'de> for TrackedVec<T>
where
    T: Trackable + serde_core::Deserialize<'de>,
{
    #[inline]
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde_core::Deserializer<'de>,
    {
        <Vec<T> as serde_core::Deserialize<'de>>::deserialize(deserializer).map(Self::from_vec)
    }
}

// -----------------------------------------------------------------------------
// Tests
