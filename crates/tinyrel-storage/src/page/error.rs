//! Page-level errors.

use thiserror::Error;
use tinyrel_common::types::SlotNo;

/// Result type for page operations.
pub type PageResult<T> = Result<T, PageError>;

/// Errors that can occur while manipulating a slotted page.
#[derive(Debug, Error, PartialEq, Eq)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum PageError {
    /// The record does not fit in the page's remaining free space.
    #[error("no space for a {needed}-byte record ({available} bytes free)")]
    NoSpace { needed: usize, available: usize },

    /// No live record follows the given slot.
    #[error("end of page after slot {0}")]
    EndOfPage(SlotNo),

    /// The page holds no live records at all.
    #[error("page has no records")]
    NoRecords,

    /// Slot number outside the page's slot directory.
    #[error("bad slot number {0}")]
    BadSlot(SlotNo),

    /// The slot exists but its record was deleted.
    #[error("record in slot {0} was deleted")]
    RecordDeleted(SlotNo),
}
