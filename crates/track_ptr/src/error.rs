use thiserror::Error;

// -----------------------------------------------------------------------------
// Error

/// Returned by [`TrackingPointer::resolve`](crate::TrackingPointer::resolve).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TrackError {
    #[error("tracking pointer does not resolve to a live object")]
    Dangling,
}
