//! Containers that keep tracking pointers to their elements up to date.

mod tracked_vec;

pub use tracked_vec::{IndexError, TrackedVec};
