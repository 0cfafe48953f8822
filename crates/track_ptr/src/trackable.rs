use core::cell::Cell;
use core::fmt;
use core::ptr;

use crate::node::{ListNode, NodePtr};
use crate::pointer::TrackingPointer;

// -----------------------------------------------------------------------------
// Anchor

/// The head of the chain of observers of one object.
///
/// A type becomes [`Trackable`] by owning exactly one `Anchor` field.
/// Lifecycle events of the owner are forwarded to the anchor through the
/// hooks of [`Trackable`]; dropping the anchor makes every observer null.
///
/// An object that was never observed holds no chain and does not allocate.
///
/// - [`Clone`] gives a fresh anchor: a copy is a new identity that the
///   observers of the original do not follow.
/// - [`Clone::clone_from`] nulls the destination's observers.
pub struct Anchor {
    node: Cell<Option<NodePtr>>,
}

impl Anchor {
    /// Creates an anchor with no observers.
    #[inline]
    pub const fn new() -> Self {
        Self {
            node: Cell::new(None),
        }
    }

    /// Whether at least one tracking pointer is attached.
    ///
    /// Observers that were nulled by [`invalidate`](Self::invalidate) no
    /// longer count.
    #[inline]
    pub fn is_observed(&self) -> bool {
        match self.node.get() {
            // SAFETY: the anchor's node is live until the anchor drops.
            Some(node) => unsafe { ListNode::has_next(node) },
            None => false,
        }
    }

    /// Makes every observer resolve to null, keeping them in the chain.
    ///
    /// Observers come back as soon as the owner is relocated or acquired
    /// again. Used for values in transit.
    #[inline]
    pub fn suspend(&self) {
        self.relocate(ptr::null());
    }

    /// Makes every observer resolve to null and cuts them off.
    ///
    /// Later acquisitions start a new chain; the old observers never
    /// resolve to this object again.
    pub fn invalidate(&self) {
        if let Some(node) = self.node.get() {
            // SAFETY: the anchor's node is live until the anchor drops.
            unsafe {
                ListNode::propagate(node, ptr::null());
                ListNode::detach(node);
            }
        }
    }

    /// Returns the chain head, bound to `address`.
    ///
    /// If the owner moved since the last binding, every observer follows.
    pub(crate) fn head(&self, address: *const ()) -> NodePtr {
        match self.node.get() {
            Some(node) => {
                // SAFETY: the anchor's node is live until the anchor drops.
                debug_assert!(
                    !unsafe { ListNode::has_prev(node) },
                    "anchor is not a chain head"
                );
                self.rebind(address);
                node
            }
            None => {
                let node = ListNode::alloc(address);
                self.node.set(Some(node));
                node
            }
        }
    }

    /// Points every observer at `address` if they resolve elsewhere.
    pub(crate) fn rebind(&self, address: *const ()) {
        if let Some(node) = self.node.get() {
            // SAFETY: the anchor's node is live until the anchor drops.
            unsafe {
                if ListNode::resolved(node) != address {
                    ListNode::propagate(node, address);
                }
            }
        }
    }

    /// Points every observer at `address`.
    pub(crate) fn relocate(&self, address: *const ()) {
        if let Some(node) = self.node.get() {
            // SAFETY: the anchor's node is live until the anchor drops.
            unsafe { ListNode::propagate(node, address) };
        }
    }

    /// Nulls the own observers, then takes over the chain of `source`
    /// and points it at `address`. `source` ends with no observers.
    ///
    /// `self` and `source` must be distinct anchors.
    pub(crate) fn absorb(&self, source: &Anchor, address: *const ()) {
        debug_assert!(!ptr::eq(self, source), "an anchor cannot absorb itself");

        self.invalidate();

        if let Some(other) = source.node.get() {
            match self.node.get() {
                // SAFETY: both nodes are live, `node` is detached by `invalidate`.
                Some(node) => unsafe { ListNode::transfer(node, other) },
                None => self.node.set(source.node.take()),
            }
        }

        self.relocate(address);
    }
}

impl Drop for Anchor {
    fn drop(&mut self) {
        if let Some(node) = self.node.take() {
            // SAFETY: the anchor's node is live; it is unlinked before release.
            unsafe {
                ListNode::propagate(node, ptr::null());
                ListNode::detach(node);
                ListNode::release(node);
            }
        }
    }
}

impl Default for Anchor {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Anchor {
    #[inline]
    fn clone(&self) -> Self {
        Self::new()
    }

    #[inline]
    fn clone_from(&mut self, _source: &Self) {
        self.invalidate();
    }
}

impl fmt::Debug for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Anchor")
            .field("observed", &self.is_observed())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Trackable

#[inline(always)]
fn address_of<T: ?Sized>(object: &T) -> *const () {
    ptr::from_ref(object).cast()
}

/// Calls `f` on every value listed by [`Trackable::nested`].
fn for_each_nested<T: Trackable + ?Sized>(object: &T, mut f: impl FnMut(&dyn Trackable)) {
    let mut index = 0;
    while let Some(nested) = object.nested(index) {
        f(nested);
        index += 1;
    }
}

/// Rebinds the observers of `object` and of its nested values.
fn catch_up<T: Trackable + ?Sized>(object: &T) {
    object.anchor().rebind(address_of(object));
    for_each_nested(object, |nested| catch_up(nested));
}

/// Moves the observers of `source` and of its nested values into `target`.
fn absorb<T: Trackable + ?Sized>(target: &T, source: &T) {
    target.anchor().absorb(source.anchor(), address_of(target));

    let mut index = 0;
    while let (Some(into), Some(from)) = (target.nested(index), source.nested(index)) {
        absorb(into, from);
        index += 1;
    }
}

/// A type whose instances can be observed by [`TrackingPointer`]s.
///
/// Implementors own one [`Anchor`] and return it from [`anchor`](Self::anchor).
/// Rust moves values without running any code, so an owner that moves an
/// observed value reports it with [`relocated`](Self::relocated).
/// Observers also catch up on the next [`acquire`](Self::acquire).
///
/// A type embedding other trackable values lists them in
/// [`nested`](Self::nested); every hook then reaches their observers too.
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
/// let widget = Widget { anchor: Anchor::new(), val: 3 };
/// let ptr = widget.acquire();
///
/// let moved = Box::new(widget);
/// moved.relocated();
///
/// assert!(ptr.points_to(&moved));
/// ```
pub trait Trackable {
    /// The anchor embedded in `self`.
    fn anchor(&self) -> &Anchor;

    /// The `index`-th trackable value embedded in `self`, counting from 0.
    ///
    /// Returns `None` past the last one. The default lists nothing.
    ///
    /// Values observed on their own, such as the `#[repr(C)]` prefix
    /// reached through [`reinterpret`](crate::reinterpret), must be listed:
    /// they move and die with `self`, but only `self` hears about it.
    ///
    /// # Examples
    ///
    /// ```
    /// use track_ptr::{Anchor, Trackable, TrackingPointer, reinterpret};
    ///
    /// #[repr(C)]
    /// struct Inner {
    ///     anchor: Anchor,
    /// }
    ///
    /// #[repr(C)]
    /// struct Outer {
    ///     inner: Inner,
    ///     anchor: Anchor,
    /// }
    ///
    /// impl Trackable for Inner {
    ///     fn anchor(&self) -> &Anchor {
    ///         &self.anchor
    ///     }
    /// }
    ///
    /// impl Trackable for Outer {
    ///     fn anchor(&self) -> &Anchor {
    ///         &self.anchor
    ///     }
    ///
    ///     fn nested(&self, index: usize) -> Option<&dyn Trackable> {
    ///         match index {
    ///             0 => Some(&self.inner),
    ///             _ => None,
    ///         }
    ///     }
    /// }
    ///
    /// let outer = Outer { inner: Inner { anchor: Anchor::new() }, anchor: Anchor::new() };
    /// // SAFETY: `Outer` is `repr(C)` and starts with an `Inner`.
    /// let inner: TrackingPointer<Inner> = unsafe { reinterpret(&outer.acquire()) };
    ///
    /// let moved = Box::new(outer);
    /// moved.relocated();
    /// assert!(inner.points_to(&moved.inner));
    /// ```
    #[inline]
    fn nested(&self, _index: usize) -> Option<&dyn Trackable> {
        None
    }

    /// Creates a new observer of `self`.
    fn acquire(&self) -> TrackingPointer<Self>
    where
        Self: Sized,
    {
        let head = self.anchor().head(address_of(self));
        for_each_nested(self, |nested| catch_up(nested));
        // SAFETY: `head` belongs to the live anchor of `self`.
        unsafe { TrackingPointer::attached_to(head) }
    }

    /// Reports that `self` now lives at its current address.
    ///
    /// Every observer follows.
    fn relocated(&self) {
        self.anchor().relocate(address_of(self));
        for_each_nested(self, |nested| nested.relocated());
    }

    /// Reports that `self` was assigned a new value in place.
    ///
    /// Every existing observer becomes null; the old identity is gone
    /// even though the address did not change.
    fn reassigned(&self) {
        self.anchor().invalidate();
        for_each_nested(self, |nested| nested.reassigned());
    }

    /// Reports that `self` is in transit.
    ///
    /// Every observer resolves to null until `self` is
    /// [`relocated`](Self::relocated) or acquired again.
    fn suspended(&self) {
        self.anchor().suspend();
        for_each_nested(self, |nested| nested.suspended());
    }

    /// Reports that the value of `source` was moved into `self`.
    ///
    /// The existing observers of `self` become null, and the observers of
    /// `source` follow to `self`. `source` is left unobserved. Nested
    /// values are paired by index.
    fn take_observers(&self, source: &Self)
    where
        Self: Sized,
    {
        if ptr::eq(self, source) {
            log::warn!("ignored an attempt to take the observers of an object from itself");
            return;
        }
        absorb(self, source);
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::vec::Vec;

    use super::{Anchor, Trackable};

    #[derive(Clone, Default)]
    struct Widget {
        anchor: Anchor,
        val: usize,
    }

    impl Widget {
        fn new(val: usize) -> Self {
            Self {
                anchor: Anchor::new(),
                val,
            }
        }
    }

    impl Trackable for Widget {
        fn anchor(&self) -> &Anchor {
            &self.anchor
        }
    }

    #[test]
    fn null_on_destroy() {
        let widget = Widget::new(1);
        let ptrs: Vec<_> = (0..4).map(|_| widget.acquire()).collect();
        assert!(ptrs.iter().all(|ptr| ptr.points_to(&widget)));

        drop(widget);
        assert!(ptrs.iter().all(|ptr| ptr.is_null()));
    }

    #[test]
    fn observers_follow_moves() {
        let widget = Widget::new(7);
        let ptr = widget.acquire();
        let old = ptr.as_ptr();

        let boxed = Box::new(widget);
        boxed.relocated();

        assert!(ptr.points_to(&boxed));
        assert_ne!(ptr.as_ptr(), old);
        assert_eq!(unsafe { ptr.as_ref() }.map(|w| w.val), Some(7));
    }

    #[test]
    fn acquire_catches_up_after_move() {
        let widget = Widget::new(2);
        let first = widget.acquire();

        let boxed = Box::new(widget);
        let second = boxed.acquire();

        assert!(first.points_to(&boxed));
        assert_eq!(first, second);
    }

    #[test]
    fn copy_does_not_inherit_observers() {
        let original = Widget::new(1);
        let ptr = original.acquire();

        let copy = original.clone();
        assert!(!copy.anchor.is_observed());
        assert!(ptr.points_to(&original));
        assert!(!ptr.points_to(&copy));
    }

    #[test]
    fn null_on_copy_assign() {
        let source = Widget::new(10);
        let mut target = Widget::new(15);
        let old = target.acquire();

        target.clone_from(&source);
        assert_eq!(target.val, 10);
        assert!(old.is_null());

        let fresh = target.acquire();
        assert!(fresh.points_to(&target));
        assert!(old.is_null());
    }

    #[test]
    fn null_on_assign_in_place() {
        let mut target = Widget::new(1);
        let old = target.acquire();

        target.val = 2;
        target.reassigned();
        assert!(old.is_null());
        assert!(!target.anchor.is_observed());

        let fresh = target.acquire();
        assert!(fresh.points_to(&target));
    }

    #[test]
    fn null_on_replace() {
        let mut target = Widget::new(1);
        let old = target.acquire();

        // Plain assignment drops the previous value and its anchor.
        target = Widget::new(2);
        assert!(old.is_null());
        assert_eq!(target.val, 2);
    }

    #[test]
    fn move_assign_takes_observers() {
        let source = Widget::new(10);
        let target = Widget::new(15);
        let of_source = source.acquire();
        let of_target = target.acquire();

        target.take_observers(&source);

        assert!(of_target.is_null());
        assert!(of_source.points_to(&target));
        assert!(!source.anchor.is_observed());

        drop(source);
        assert!(of_source.points_to(&target));
        drop(target);
        assert!(of_source.is_null());
    }

    #[test]
    fn move_assign_into_unobserved() {
        let source = Widget::new(1);
        let target = Widget::new(2);
        let ptr = source.acquire();

        target.take_observers(&source);
        assert!(ptr.points_to(&target));
        assert!(target.anchor.is_observed());
    }

    #[test]
    fn take_observers_from_self() {
        let widget = Widget::new(1);
        let ptr = widget.acquire();

        widget.take_observers(&widget);
        assert!(ptr.points_to(&widget));
    }

    #[test]
    fn suspend_and_revive() {
        let widget = Widget::new(4);
        let ptr = widget.acquire();

        widget.anchor.suspend();
        assert!(ptr.is_null());
        assert!(widget.anchor.is_observed());

        widget.relocated();
        assert!(ptr.points_to(&widget));
    }

    #[test]
    fn observed_state() {
        let widget = Widget::default();
        assert!(!widget.anchor.is_observed());

        let ptr = widget.acquire();
        assert!(widget.anchor.is_observed());

        drop(ptr);
        assert!(!widget.anchor.is_observed());
    }

    struct Holder {
        anchor: Anchor,
        part: Widget,
    }

    impl Holder {
        fn new(val: usize) -> Self {
            Self {
                anchor: Anchor::new(),
                part: Widget::new(val),
            }
        }
    }

    impl Trackable for Holder {
        fn anchor(&self) -> &Anchor {
            &self.anchor
        }

        fn nested(&self, index: usize) -> Option<&dyn Trackable> {
            match index {
                0 => Some(&self.part),
                _ => None,
            }
        }
    }

    #[test]
    fn nested_follow_moves() {
        let holder = Holder::new(3);
        let of_part = holder.part.acquire();

        let boxed = Box::new(holder);
        boxed.relocated();
        assert!(of_part.points_to(&boxed.part));
        assert_eq!(unsafe { of_part.as_ref() }.map(|w| w.val), Some(3));
    }

    #[test]
    fn nested_catch_up_on_acquire() {
        let holder = Holder::new(1);
        let of_part = holder.part.acquire();

        let boxed = Box::new(holder);
        let _ = boxed.acquire();
        assert!(of_part.points_to(&boxed.part));
    }

    #[test]
    fn nested_null_on_reassign() {
        let holder = Holder::new(1);
        let of_holder = holder.acquire();
        let of_part = holder.part.acquire();

        holder.reassigned();
        assert!(of_holder.is_null());
        assert!(of_part.is_null());
    }

    #[test]
    fn nested_suspend_and_revive() {
        let holder = Holder::new(1);
        let of_part = holder.part.acquire();

        holder.suspended();
        assert!(of_part.is_null());

        holder.relocated();
        assert!(of_part.points_to(&holder.part));
    }

    #[test]
    fn nested_move_assign() {
        let source = Holder::new(1);
        let target = Holder::new(2);
        let of_source = source.part.acquire();
        let of_target = target.part.acquire();

        target.take_observers(&source);
        assert!(of_target.is_null());
        assert!(of_source.points_to(&target.part));
        assert!(!source.part.anchor.is_observed());
    }

    #[test]
    fn nested_drop_with_owner() {
        let holder = Holder::new(1);
        let of_part = holder.part.acquire();

        drop(holder);
        assert!(of_part.is_null());
    }
}
