//! Holders built on [`track_ptr`].
//!
//! - [`Tracked<T>`] grants the trackable capability to any value by
//!   composition.
//! - [`collections::TrackedVec<T>`] is a vector that reports every move of
//!   its elements, so tracking pointers into it survive reallocation.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// No STD Support

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod tracked;

pub mod collections;

// -----------------------------------------------------------------------------
// Top-level exports

pub use tracked::Tracked;
