use crate::pointer::TrackingPointer;
use crate::trackable::Trackable;

// -----------------------------------------------------------------------------
// Acquire

/// Creates a new observer of `object`.
///
/// Equivalent to [`Trackable::acquire`]; a type without an [`Anchor`]
/// is rejected at compile time.
///
/// ```compile_fail
/// let value = 5u32;
/// let ptr = track_ptr::acquire(&value);
/// ```
///
/// [`Anchor`]: crate::Anchor
#[inline]
pub fn acquire<T: Trackable>(object: &T) -> TrackingPointer<T> {
    object.acquire()
}

// -----------------------------------------------------------------------------
// Upcast

/// Marks `Self` as usable wherever a `Base` is expected, at the same address.
///
/// Enables [`TrackingPointer::upcast`], a relabeling checked at compile
/// time. Every type extends itself.
///
/// # Safety
///
/// A valid `*const Self` must also be a valid `*const Base`. In practice
/// `Self` is `#[repr(C)]` (or `#[repr(transparent)]`) with a `Base` as its
/// first field.
///
/// # Examples
///
/// ```
/// use track_ptr::{Anchor, Extends, Trackable, TrackingPointer};
///
/// #[repr(C)]
/// struct Base {
///     anchor: Anchor,
///     id: u32,
/// }
///
/// #[repr(C)]
/// struct Derived {
///     base: Base,
///     anchor: Anchor,
/// }
///
/// // SAFETY: `Derived` is `repr(C)` and starts with a `Base`.
/// unsafe impl Extends<Base> for Derived {}
///
/// impl Trackable for Base {
///     fn anchor(&self) -> &Anchor {
///         &self.anchor
///     }
/// }
///
/// impl Trackable for Derived {
///     fn anchor(&self) -> &Anchor {
///         &self.anchor
///     }
///
///     fn nested(&self, index: usize) -> Option<&dyn Trackable> {
///         match index {
///             0 => Some(&self.base),
///             _ => None,
///         }
///     }
/// }
///
/// let derived = Derived {
///     base: Base { anchor: Anchor::new(), id: 4 },
///     anchor: Anchor::new(),
/// };
///
/// let ptr: TrackingPointer<Base> = derived.acquire().upcast();
/// assert!(ptr.points_to(&derived.base));
/// ```
pub unsafe trait Extends<Base> {}

// SAFETY: identity.
unsafe impl<T> Extends<T> for T {}

// -----------------------------------------------------------------------------
// Reinterpret

/// Builds an observer of the `Out` object found at `handle`'s address.
///
/// The result joins the chain of the `Out` object's own anchor, not the
/// chain of `handle`, so either pointer can be dropped without affecting
/// the other. A null `handle` gives a null result.
///
/// The result only follows moves of the `Out` object if its owner lists
/// it in [`Trackable::nested`].
///
/// # Safety
///
/// If `handle` is not null, it must resolve to a live value that also is
/// a valid `Out` (for example a `#[repr(C)]` prefix), reachable through
/// the provenance of `handle`, and not mutably borrowed.
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
/// let ptr = outer.acquire();
///
/// // SAFETY: `Outer` is `repr(C)` and starts with an `Inner`.
/// let inner: TrackingPointer<Inner> = unsafe { reinterpret(&ptr) };
///
/// drop(ptr);
/// assert!(inner.points_to(&outer.inner));
/// ```
pub unsafe fn reinterpret<Out: Trackable, In>(handle: &TrackingPointer<In>) -> TrackingPointer<Out> {
    match handle.get() {
        // SAFETY: the caller guarantees the address holds a live `Out`.
        Some(ptr) => unsafe { ptr.cast::<Out>().as_ref() }.acquire(),
        None => TrackingPointer::null(),
    }
}

// -----------------------------------------------------------------------------
// Tests
