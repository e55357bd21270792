//! Error types for `btree_index`.
//!
//! Only conditions the caller cannot rule out up front are errors. A missing
//! key is an ordinary answer and is reported through
//! [`SearchResult::NotFound`](crate::SearchResult::NotFound) and
//! [`Deletion::NotFound`](crate::Deletion::NotFound).

use thiserror::Error;

/// Convenient result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Every error a tree operation can report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Storage for a node, or a slot in the node arena, could not be reserved.
    ///
    /// The operation that reported it made no structural change.
    #[error("allocation failed: could not reserve {what}")]
    AllocationFailure { what: &'static str },

    /// The minimum degree passed at creation is unusable.
    #[error("invalid configuration: minimum degree {min_degree} (must be at least {minimum})")]
    InvalidConfig { min_degree: usize, minimum: usize },
}
