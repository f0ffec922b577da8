use thiserror::Error;

/// Errors surfaced by [`ZSet`](crate::ZSet) operations and [`Scan`](crate::Scan) cursors.
///
/// Absent members are never errors; lookups signal absence with `None`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A paging offset was negative. Offsets must be `>= 0`.
    #[error("offset: {0} (expected: >= 0)")]
    NegativeOffset(isize),

    /// `Scan::next` was called on an exhausted cursor.
    #[error("scan is exhausted")]
    Exhausted,

    /// `Scan::remove` was called before `next`, or twice for one entry.
    #[error("scan has no current entry to remove")]
    RemoveWithoutNext,

    /// The set was mutated through a path other than the scan's own
    /// `remove` since the cursor was created or last removed.
    #[error("set was modified outside the scan")]
    ConcurrentModification,
}
