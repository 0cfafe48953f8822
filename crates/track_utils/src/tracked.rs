use core::fmt;
use core::mem;
use core::ops::{Deref, DerefMut};

use track_ptr::{Anchor, Trackable};

// -----------------------------------------------------------------------------
// Tracked

/// A value paired with an [`Anchor`], making it [`Trackable`].
///
/// Mutating the value through [`DerefMut`] keeps its identity. Replacing
/// it with [`replace`](Self::replace), [`Clone::clone_from`] or
/// [`assign`](Self::assign) starts a new one.
///
/// # Examples
///
/// ```
/// use track_ptr::Trackable;
/// use track_utils::Tracked;
///
/// let mut counter = Tracked::new(0);
/// let ptr = counter.acquire();
///
/// *counter += 1;
/// assert!(ptr.points_to(&counter));
///
/// counter.replace(10);
/// assert!(ptr.is_null());
/// ```
pub struct Tracked<T> {
    value: T,
    anchor: Anchor,
}

impl<T> Tracked<T> {
    /// Wraps `value` with a fresh identity.
    #[inline]
    pub const fn new(value: T) -> Self {
        Self {
            value,
            anchor: Anchor::new(),
        }
    }

    /// Unwraps the value; every observer becomes null.
    #[inline]
    pub fn into_inner(self) -> T {
        self.value
    }

    #[inline]
    pub fn get(&self) -> &T {
        &self.value
    }

    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.value
    }

    /// Stores a new value in place and returns the old one.
    ///
    /// Counts as an assignment: every existing observer becomes null.
    pub fn replace(&mut self, value: T) -> T {
        self.reassigned();
        mem::replace(&mut self.value, value)
    }

    /// Move-assignment: the value of `source` moves into `self`.
    ///
    /// The observers of `self` become null, the observers of `source`
    /// follow to `self`.
    ///
    /// # Examples
    ///
    /// ```
    /// use track_ptr::Trackable;
    /// use track_utils::Tracked;
    ///
    /// let source = Tracked::new("new");
    /// let mut target = Tracked::new("old");
    ///
    /// let of_source = source.acquire();
    /// let of_target = target.acquire();
    ///
    /// target.assign(source);
    ///
    /// assert!(of_target.is_null());
    /// assert!(of_source.points_to(&target));
    /// assert_eq!(*target, "new");
    /// ```
    pub fn assign(&mut self, mut source: Tracked<T>) {
        mem::swap(&mut self.value, &mut source.value);
        self.take_observers(&source);
    }
}

impl<T> Trackable for Tracked<T> {
    #[inline]
    fn anchor(&self) -> &Anchor {
        &self.anchor
    }
}

impl<T> From<T> for Tracked<T> {
    #[inline]
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: Default> Default for Tracked<T> {
    #[inline]
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Deref for Tracked<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Tracked<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: Clone> Clone for Tracked<T> {
    /// The copy is a new identity, with no observers.
    #[inline]
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }

    /// Copy-assignment: the observers of `self` become null.
    fn clone_from(&mut self, source: &Self) {
        self.value.clone_from(&source.value);
        self.anchor.clone_from(&source.anchor);
    }
}

impl<T: PartialEq> PartialEq for Tracked<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: Eq> Eq for Tracked<T> {}

impl<T: fmt::Debug> fmt::Debug for Tracked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Tracked").field(&self.value).finish()
    }
}

// Only the value is serialized; identity belongs to the running process.
impl<T: serde_core::Serialize> serde_core::Serialize for Tracked<T> {
    #[inline]
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde_core::Serializer,
    {
        self.value.serialize(serializer)
    }
}

impl<'de, T: serde_core::Deserialize<'de>> serde_core::Deserialize<'de> for Tracked<T> {
    #[inline]
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde_core::Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Self::new)
    }
}

// -----------------------------------------------------------------------------
// Tests
