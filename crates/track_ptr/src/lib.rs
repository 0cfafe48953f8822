//! Non-owning pointers that follow the object they point to.
//!
//! A [`TrackingPointer<T>`] resolves to the current address of a
//! [`Trackable`] object, or to null once that object is dropped or
//! reassigned. It never owns the object and never extends its lifetime.
//!
//! **Anchor and Trackable**
//!
//! A type acquires the capability by embedding one [`Anchor`] and
//! implementing [`Trackable::anchor`]. The anchor heads an intrusive
//! doubly-linked chain holding one node per tracking pointer. Lifecycle
//! events of the owner walk the chain once and rewrite every resolved
//! address; acquiring or dropping a pointer is constant time.
//!
//! **Moves**
//!
//! Rust moves values without running any code. Owners report a move with
//! [`Trackable::relocated`], and observers also catch up on the next
//! [`Trackable::acquire`]. Containers that move their elements, such as
//! `TrackedVec` in `track_utils`, do this automatically.
//!
//! **Casts**
//!
//! [`TrackingPointer::upcast`] relabels a pointer at compile time when the
//! pointee [`Extends`] the target type. [`reinterpret`] is the unchecked
//! variant that reattaches to the target's own anchor.
//!
//! Everything here is single-threaded: pointers and anchors are neither
//! `Send` nor `Sync`.
#![expect(unsafe_code, reason = "Intrusive lists are built from raw pointers.")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// No STD Support

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod cast;
mod error;
mod node;
mod pointer;
mod trackable;

// -----------------------------------------------------------------------------
// Top-level exports

pub use cast::{Extends, acquire, reinterpret};
pub use error::TrackError;
pub use pointer::TrackingPointer;
pub use trackable::{Anchor, Trackable};
