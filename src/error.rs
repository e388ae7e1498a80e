//! Error types surfaced by mutating operations.
//!
//! The teacher crate this library is adapted from reports its own fallible
//! paths (`pile.rs`'s `LoadError`/`InsertError`/`GetError`/`FlushError`) as
//! plain `#[derive(Debug)]` enums with hand-written `From` impls rather than
//! reaching for `thiserror`. The core here has exactly one real failure mode
//! — allocator exhaustion — plus one misuse signal bounded out of an
//! otherwise-infinite retry loop (see [`crate::mutate`]), so the same plain
//! style is used.

use std::fmt;

/// Failure modes a mutating [`crate::BTree`] operation can report.
///
/// Every other outcome (key absent, key present and overwritten, traversal
/// reaching the end) is modeled with `Option`/`bool` rather than `Result`,
/// matching the original library's distinction between "not found" (a normal
/// result) and "out of memory" (an error).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BTreeError {
    /// The backing allocator, or an [`crate::comparator::ItemClone`]
    /// implementation, failed to produce a new allocation. The tree's
    /// logical contents are unchanged; any partially constructed node was
    /// unwound before this error was returned.
    OutOfMemory,
    /// An `Action::Update` callback in a mutating traversal kept producing
    /// an item that compares unequal to the one it replaced, for more than
    /// [`crate::mutate::MAX_UPDATE_DRIFT_RETRIES`] consecutive attempts at
    /// the same slot. The original library retries such a slot forever;
    /// this is the bounded-misuse rendering called for in the design notes.
    UpdateDrift,
}

impl fmt::Display for BTreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BTreeError::OutOfMemory => write!(f, "allocation failed"),
            BTreeError::UpdateDrift => {
                write!(f, "update callback kept changing the sort key of the same item")
            }
        }
    }
}

impl std::error::Error for BTreeError {}

pub(crate) type Result<T> = std::result::Result<T, BTreeError>;
