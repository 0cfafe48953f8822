use core::fmt;
use core::marker::PhantomData;
use core::mem;
use core::ptr::{self, NonNull};

use crate::cast::Extends;
use crate::error::TrackError;
use crate::node::{ListNode, NodePtr};

// -----------------------------------------------------------------------------
// TrackingPointer

/// A non-owning pointer that follows a [`Trackable`] object.
///
/// It resolves to the current address of the object it was acquired
/// from, or to null once that object is dropped or reassigned. It never
/// keeps the object alive.
///
/// - [`Clone`] creates a new, independent observer of the same object.
/// - [`take`](Self::take) and [`assign_from`](Self::assign_from) move the
///   observer, leaving the source null.
/// - [`Drop`] unlinks only this observer.
///
/// Tracking pointers are neither `Send` nor `Sync`.
///
/// # Examples
///
/// ```
/// use track_ptr::{Anchor, Trackable};
///
/// struct Widget {
///     anchor: Anchor,
///     val: u32,
/// }
///
/// impl Trackable for Widget {
///     fn anchor(&self) -> &Anchor {
///         &self.anchor
///     }
/// }
///
/// let widget = Widget { anchor: Anchor::new(), val: 10 };
/// let ptr = widget.acquire();
///
/// assert!(ptr.points_to(&widget));
/// assert_eq!(unsafe { ptr.as_ref() }.map(|w| w.val), Some(10));
///
/// drop(widget);
/// assert!(ptr.is_null());
/// ```
///
/// ```compile_fail
/// fn is_send<T: Send>() {}
/// is_send::<track_ptr::TrackingPointer<u32>>();
/// ```
///
/// [`Trackable`]: crate::Trackable
pub struct TrackingPointer<T> {
    node: Option<NodePtr>,
    _marker: PhantomData<*const T>,
}

impl<T> TrackingPointer<T> {
    /// Creates a detached pointer that resolves to null.
    ///
    /// This does not allocate.
    #[inline]
    pub const fn null() -> Self {
        Self {
            node: None,
            _marker: PhantomData,
        }
    }

    /// Creates a new observer right after `neighbor` in its chain.
    ///
    /// # Safety
    ///
    /// `neighbor` must be a live member of a consistent chain.
    pub(crate) unsafe fn attached_to(neighbor: NodePtr) -> Self {
        let node = ListNode::alloc(ptr::null());
        // SAFETY: `node` is fresh and detached, `neighbor` is live.
        unsafe { ListNode::attach(node, neighbor) };
        Self {
            node: Some(node),
            _marker: PhantomData,
        }
    }

    /// Returns the current address, or `None` if the object is gone.
    #[inline]
    pub fn get(&self) -> Option<NonNull<T>> {
        NonNull::new(self.as_ptr().cast_mut())
    }

    /// Returns the current address as a raw pointer, null if the object is gone.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        match self.node {
            // SAFETY: an owned node is live until `self` drops.
            Some(node) => unsafe { ListNode::resolved(node) }.cast(),
            None => ptr::null(),
        }
    }

    /// Whether the pointer currently resolves to null.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.as_ptr().is_null()
    }

    /// Returns the current address, or [`TrackError::Dangling`].
    ///
    /// # Examples
    ///
    /// ```
    /// use track_ptr::{TrackError, TrackingPointer};
    ///
    /// let ptr = TrackingPointer::<u32>::null();
    /// assert_eq!(ptr.resolve(), Err(TrackError::Dangling));
    /// ```
    #[inline]
    pub fn resolve(&self) -> Result<NonNull<T>, TrackError> {
        self.get().ok_or(TrackError::Dangling)
    }

    /// Whether the pointer currently resolves to `object`.
    #[inline]
    pub fn points_to(&self, object: &T) -> bool {
        ptr::eq(self.as_ptr(), object)
    }

    /// Returns a shared reference to the tracked object, or `None` if it is gone.
    ///
    /// # Safety
    ///
    /// If the pointer is not null:
    /// - the object must still live where the pointer resolves, i.e. it has
    ///   not been moved since its observers were last relocated;
    /// - the object must not be mutably borrowed for `'a`.
    #[inline]
    pub unsafe fn as_ref<'a>(&self) -> Option<&'a T> {
        // SAFETY: upheld by the caller.
        self.get().map(|ptr| unsafe { ptr.as_ref() })
    }

    /// Moves this observer out, leaving `self` null and detached.
    ///
    /// # Examples
    ///
    /// ```
    /// use track_ptr::{Anchor, Trackable};
    ///
    /// struct Node(Anchor);
    ///
    /// impl Trackable for Node {
    ///     fn anchor(&self) -> &Anchor {
    ///         &self.0
    ///     }
    /// }
    ///
    /// let object = Node(Anchor::new());
    /// let mut ptr = object.acquire();
    /// let moved = ptr.take();
    ///
    /// assert!(ptr.is_null());
    /// assert!(moved.points_to(&object));
    /// ```
    #[inline]
    pub fn take(&mut self) -> Self {
        mem::take(self)
    }

    /// Copy-assignment: `self` stops observing its object and becomes a
    /// new observer of whatever `source` observes.
    ///
    /// `self`'s node is reused when it has one.
    pub fn assign(&mut self, source: &Self) {
        match (self.node, source.node) {
            (Some(node), Some(neighbor)) => unsafe {
                // SAFETY: both nodes are owned by live pointers.
                ListNode::detach(node);
                ListNode::attach(node, neighbor);
            },
            // SAFETY: an owned node is live.
            (None, Some(neighbor)) => *self = unsafe { Self::attached_to(neighbor) },
            (Some(_), None) => self.clear(),
            (None, None) => {}
        }
    }

    /// Move-assignment: `self` takes over `source`'s place in its chain,
    /// `source` becomes null.
    ///
    /// `self`'s node is reused when it has one.
    pub fn assign_from(&mut self, source: &mut Self) {
        match (self.node, source.node) {
            (Some(node), Some(other)) => unsafe {
                // SAFETY: both nodes are owned by live pointers, and distinct
                // because `self` and `source` are distinct `&mut`.
                ListNode::detach(node);
                ListNode::transfer(node, other);
            },
            (None, Some(_)) => self.node = source.node.take(),
            (Some(_), None) => self.clear(),
            (None, None) => {}
        }
    }

    /// Stops observing: `self` becomes detached and null.
    ///
    /// The node allocation, if any, is kept for reuse.
    pub fn clear(&mut self) {
        if let Some(node) = self.node {
            // SAFETY: an owned node is live.
            unsafe {
                ListNode::detach(node);
                ListNode::propagate(node, ptr::null());
            }
        }
    }

    /// Relabels this pointer as a pointer to `Base`, without a new observer.
    ///
    /// The result stays in the same chain, so it follows the `T` object
    /// (not a separately tracked `Base`).
    #[inline]
    pub fn upcast<Base>(mut self) -> TrackingPointer<Base>
    where
        T: Extends<Base>,
    {
        TrackingPointer {
            node: self.node.take(),
            _marker: PhantomData,
        }
    }

    /// Creates a new observer of the same object, typed as `Base`.
    #[inline]
    pub fn upcast_ref<Base>(&self) -> TrackingPointer<Base>
    where
        T: Extends<Base>,
    {
        self.clone().upcast()
    }
}

impl<T> Drop for TrackingPointer<T> {
    fn drop(&mut self) {
        if let Some(node) = self.node.take() {
            // SAFETY: an owned node is live; it is unlinked before release.
            unsafe {
                ListNode::detach(node);
                ListNode::release(node);
            }
        }
    }
}

impl<T> Default for TrackingPointer<T> {
    #[inline]
    fn default() -> Self {
        Self::null()
    }
}

impl<T> Clone for TrackingPointer<T> {
    fn clone(&self) -> Self {
        match self.node {
            // SAFETY: an owned node is live.
            Some(node) => unsafe { Self::attached_to(node) },
            None => Self::null(),
        }
    }

    #[inline]
    fn clone_from(&mut self, source: &Self) {
        self.assign(source);
    }
}

impl<T> PartialEq for TrackingPointer<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.as_ptr(), other.as_ptr())
    }
}

impl<T> Eq for TrackingPointer<T> {}

impl<T> PartialEq<*const T> for TrackingPointer<T> {
    #[inline]
    fn eq(&self, other: &*const T) -> bool {
        ptr::eq(self.as_ptr(), *other)
    }
}

impl<T> fmt::Pointer for TrackingPointer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.as_ptr(), f)
    }
}

impl<T> fmt::Debug for TrackingPointer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.as_ptr(), f)
    }
}

// -----------------------------------------------------------------------------
// Tests
