//! The intrusive list node shared by anchors and tracking pointers.
//!
//! A chain is a doubly-linked list whose head is the [`Anchor`] node of
//! a tracked object, followed by one node per [`TrackingPointer`].
//! Every node in a chain stores the same resolved address, so reading
//! a tracking pointer never walks the list.
//!
//! Each node sits in its own heap cell. Values of Rust types move by
//! plain copies without any hook, so the neighbour links must never point
//! into a value that may be moved; only the cell addresses are linked.
//!
//! [`Anchor`]: crate::Anchor
//! [`TrackingPointer`]: crate::TrackingPointer

use alloc::boxed::Box;
use core::cell::Cell;
use core::ptr::{self, NonNull};

// -----------------------------------------------------------------------------
// ListNode

pub(crate) type NodePtr = NonNull<ListNode>;

/// One link in the chain of an observed object.
///
/// All fields are [`Cell`]s: a node is reached through shared references
/// from its neighbours, and the list is single-threaded.
pub(crate) struct ListNode {
    /// The address of the tracked object, or null.
    resolved: Cell<*const ()>,
    next: Cell<Option<NodePtr>>,
    prev: Cell<Option<NodePtr>>,
}

impl ListNode {
    /// Allocate a detached node resolving to `resolved`.
    pub(crate) fn alloc(resolved: *const ()) -> NodePtr {
        let boxed = Box::new(ListNode {
            resolved: Cell::new(resolved),
            next: Cell::new(None),
            prev: Cell::new(None),
        });
        NonNull::from(Box::leak(boxed))
    }

    /// Free a node created by [`ListNode::alloc`].
    ///
    /// # Safety
    ///
    /// - `node` must come from [`ListNode::alloc`] and not be released yet.
    /// - `node` must be detached.
    pub(crate) unsafe fn release(node: NodePtr) {
        // SAFETY: the caller guarantees `node` is a live allocation.
        debug_assert!(unsafe { node.as_ref() }.is_detached());

        // SAFETY: created through `Box::leak` in `alloc`.
        drop(unsafe { Box::from_raw(node.as_ptr()) });
    }

    /// The address this node currently resolves to.
    ///
    /// # Safety
    ///
    /// `node` must be live.
    #[inline]
    pub(crate) unsafe fn resolved(node: NodePtr) -> *const () {
        unsafe { node.as_ref() }.resolved.get()
    }

    /// Whether `node` has a predecessor in its chain.
    ///
    /// # Safety
    ///
    /// `node` must be live.
    #[inline]
    pub(crate) unsafe fn has_prev(node: NodePtr) -> bool {
        unsafe { node.as_ref() }.prev.get().is_some()
    }

    /// Whether `node` has a successor in its chain.
    ///
    /// # Safety
    ///
    /// `node` must be live.
    #[inline]
    pub(crate) unsafe fn has_next(node: NodePtr) -> bool {
        unsafe { node.as_ref() }.next.get().is_some()
    }

    #[inline]
    fn is_detached(&self) -> bool {
        self.next.get().is_none() && self.prev.get().is_none()
    }

    /// Insert `node` right after `neighbor`, copying its resolved address.
    ///
    /// # Safety
    ///
    /// - `node` and every node of `neighbor`'s chain must be live.
    /// - `node` must be detached and distinct from `neighbor`.
    pub(crate) unsafe fn attach(node: NodePtr, neighbor: NodePtr) {
        debug_assert_ne!(node, neighbor, "a node cannot follow itself");

        // SAFETY: both nodes are live, guaranteed by the caller.
        let (this, other) = unsafe { (node.as_ref(), neighbor.as_ref()) };
        debug_assert!(this.is_detached());

        this.resolved.set(other.resolved.get());
        this.prev.set(Some(neighbor));
        this.next.set(other.next.get());

        if let Some(next) = other.next.get() {
            // SAFETY: members of a chain are live.
            unsafe { next.as_ref() }.prev.set(Some(node));
        }
        other.next.set(Some(node));
    }

    /// Unlink `node` from its chain and clear its links.
    ///
    /// The resolved address is left untouched. Detaching a node that is
    /// already detached does nothing.
    ///
    /// # Safety
    ///
    /// `node` and every node of its chain must be live.
    pub(crate) unsafe fn detach(node: NodePtr) {
        unsafe { check_links(node) };

        // SAFETY: `node` is live, guaranteed by the caller.
        let this = unsafe { node.as_ref() };
        let prev = this.prev.take();
        let next = this.next.take();

        if let Some(prev) = prev {
            // SAFETY: members of a chain are live.
            unsafe { prev.as_ref() }.next.set(next);
        }
        if let Some(next) = next {
            // SAFETY: members of a chain are live.
            unsafe { next.as_ref() }.prev.set(prev);
        }
    }

    /// Move `src`'s place in its chain to `dest`.
    ///
    /// `dest` receives the resolved address and both links of `src`, the
    /// neighbours are relinked to `dest`, and `src` ends detached and null.
    ///
    /// # Safety
    ///
    /// - `dest`, `src` and every node of `src`'s chain must be live.
    /// - `dest` must be detached and distinct from `src`.
    pub(crate) unsafe fn transfer(dest: NodePtr, src: NodePtr) {
        debug_assert_ne!(dest, src, "cannot transfer a node onto itself");
        unsafe { check_links(src) };

        // SAFETY: both nodes are live, guaranteed by the caller.
        let (this, other) = unsafe { (dest.as_ref(), src.as_ref()) };
        debug_assert!(this.is_detached());

        this.resolved.set(other.resolved.replace(ptr::null()));

        let prev = other.prev.take();
        let next = other.next.take();
        this.prev.set(prev);
        this.next.set(next);

        if let Some(prev) = prev {
            // SAFETY: members of a chain are live.
            unsafe { prev.as_ref() }.next.set(Some(dest));
        }
        if let Some(next) = next {
            // SAFETY: members of a chain are live.
            unsafe { next.as_ref() }.prev.set(Some(dest));
        }
    }

    /// Write `address` into `node` and every node after it.
    ///
    /// # Safety
    ///
    /// `node` and every node of its chain must be live.
    pub(crate) unsafe fn propagate(node: NodePtr, address: *const ()) {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            unsafe { check_links(current) };

            // SAFETY: members of a chain are live.
            let this = unsafe { current.as_ref() };
            this.resolved.set(address);
            cursor = this.next.get();
        }
    }
}

// -----------------------------------------------------------------------------
// Consistency checks

/// Assert that `node`'s neighbours point back at it.
#[cfg(all(feature = "debug", debug_assertions))]
unsafe fn check_links(node: NodePtr) {
    // SAFETY: the callers only pass live chain members.
    let this = unsafe { node.as_ref() };
    if let Some(prev) = this.prev.get() {
        assert_eq!(
            unsafe { prev.as_ref() }.next.get(),
            Some(node),
            "broken chain: `prev.next` does not point back"
        );
    }
    if let Some(next) = this.next.get() {
        assert_eq!(
            unsafe { next.as_ref() }.prev.get(),
            Some(node),
            "broken chain: `next.prev` does not point back"
        );
    }
}

#[cfg(not(all(feature = "debug", debug_assertions)))]
#[inline(always)]
unsafe fn check_links(_node: NodePtr) {}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{ListNode, NodePtr};
    use core::ptr;

    fn addr(value: &u32) -> *const () {
        ptr::from_ref(value).cast()
    }

    unsafe fn links(node: NodePtr) -> (Option<NodePtr>, Option<NodePtr>) {
        let this = unsafe { node.as_ref() };
        (this.prev.get(), this.next.get())
    }

    #[test]
    fn attach_inserts_after_neighbor() {
        let value = 7u32;
        let head = ListNode::alloc(addr(&value));
        let a = ListNode::alloc(ptr::null());
        let b = ListNode::alloc(ptr::null());

        unsafe {
            ListNode::attach(a, head);
            // `b` lands between `head` and `a`.
            ListNode::attach(b, head);

            assert_eq!(ListNode::resolved(a), addr(&value));
            assert_eq!(ListNode::resolved(b), addr(&value));
            assert_eq!(links(head), (None, Some(b)));
            assert_eq!(links(b), (Some(head), Some(a)));
            assert_eq!(links(a), (Some(b), None));

            ListNode::detach(b);
            ListNode::detach(a);
            ListNode::release(a);
            ListNode::release(b);
            ListNode::release(head);
        }
    }

    #[test]
    fn detach_relinks_and_is_idempotent() {
        let head = ListNode::alloc(ptr::null());
        let a = ListNode::alloc(ptr::null());
        let b = ListNode::alloc(ptr::null());

        unsafe {
            ListNode::attach(a, head);
            ListNode::attach(b, a);

            ListNode::detach(a);
            assert_eq!(links(a), (None, None));
            assert_eq!(links(head), (None, Some(b)));
            assert_eq!(links(b), (Some(head), None));

            // A lone node detaches as a no-op.
            ListNode::detach(a);
            assert_eq!(links(head), (None, Some(b)));

            ListNode::detach(b);
            ListNode::release(a);
            ListNode::release(b);
            ListNode::release(head);
        }
    }

    #[test]
    fn transfer_takes_position() {
        let value = 1u32;
        let head = ListNode::alloc(addr(&value));
        let a = ListNode::alloc(ptr::null());
        let b = ListNode::alloc(ptr::null());
        let dest = ListNode::alloc(ptr::null());

        unsafe {
            ListNode::attach(a, head);
            ListNode::attach(b, a);

            ListNode::transfer(dest, a);

            assert!(ListNode::resolved(a).is_null());
            assert_eq!(links(a), (None, None));
            assert_eq!(ListNode::resolved(dest), addr(&value));
            assert_eq!(links(dest), (Some(head), Some(b)));
            assert_eq!(links(head), (None, Some(dest)));
            assert_eq!(links(b), (Some(dest), None));

            ListNode::detach(dest);
            ListNode::detach(b);
            for node in [head, a, b, dest] {
                ListNode::release(node);
            }
        }
    }

    #[test]
    fn propagate_walks_forward() {
        let old = 1u32;
        let new = 2u32;
        let head = ListNode::alloc(addr(&old));
        let nodes = [
            ListNode::alloc(ptr::null()),
            ListNode::alloc(ptr::null()),
            ListNode::alloc(ptr::null()),
        ];

        unsafe {
            for node in nodes {
                ListNode::attach(node, head);
            }
            ListNode::propagate(head, addr(&new));
            assert_eq!(ListNode::resolved(head), addr(&new));
            for node in nodes {
                assert_eq!(ListNode::resolved(node), addr(&new));
            }

            ListNode::propagate(head, ptr::null());
            for node in nodes {
                assert!(ListNode::resolved(node).is_null());
                ListNode::detach(node);
                ListNode::release(node);
            }
            ListNode::release(head);
        }
    }

    #[cfg(all(feature = "debug", debug_assertions))]
    #[test]
    #[should_panic(expected = "broken chain")]
    fn check_links_catches_broken_chain() {
        let head = ListNode::alloc(ptr::null());
        let node = ListNode::alloc(ptr::null());

        unsafe {
            ListNode::attach(node, head);
            // `head` forgets its successor while `node` still names it.
            head.as_ref().next.set(None);
            ListNode::detach(node);
        }
    }
}
