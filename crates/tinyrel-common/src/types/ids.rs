//! Core identifier types for TinyRel.
//!
//! These types provide type-safe wrappers around numeric identifiers,
//! preventing accidental misuse of different ID types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Page number - identifies a page within one database file.
///
/// Page numbers are block indexes into the file. Block 0 holds the
/// provider header and is never exposed as a page; the first real page
/// of every file is page 1. The on-disk sentinel for "no page" is `-1`.
///
/// # Example
///
/// ```rust
/// use tinyrel_common::types::PageNo;
///
/// let page = PageNo::new(42);
/// assert_eq!(page.as_i32(), 42);
/// assert!(!PageNo::INVALID.is_valid());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PageNo(i32);

impl PageNo {
    /// Invalid page number constant, the on-disk "no page" sentinel.
    pub const INVALID: Self = Self(-1);

    /// Creates a new `PageNo` from a raw i32 value.
    #[inline]
    #[must_use]
    pub const fn new(no: i32) -> Self {
        Self(no)
    }

    /// Returns the raw i32 value.
    #[inline]
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Checks if this is a valid page number.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 > 0
    }

    /// Creates a PageNo from bytes (little-endian).
    #[inline]
    #[must_use]
    pub fn from_le_bytes(bytes: [u8; 4]) -> Self {
        Self(i32::from_le_bytes(bytes))
    }

    /// Converts to bytes (little-endian).
    #[inline]
    #[must_use]
    pub fn to_le_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl fmt::Debug for PageNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "PageNo(INVALID)")
        } else {
            write!(f, "PageNo({})", self.0)
        }
    }
}

impl fmt::Display for PageNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for PageNo {
    #[inline]
    fn from(no: i32) -> Self {
        Self::new(no)
    }
}

impl From<PageNo> for i32 {
    #[inline]
    fn from(no: PageNo) -> Self {
        no.0
    }
}

/// File identifier - distinguishes open database files in memory.
///
/// Assigned by the file registry when a file is opened and stable for as
/// long as the file stays open. Used as part of the buffer pool's hash
/// key; never persisted.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct FileId(u64);

impl FileId {
    /// Invalid file ID, used as a sentinel value.
    pub const INVALID: Self = Self(0);

    /// Creates a new `FileId` from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next file ID.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Checks if this is a valid file ID.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }
}

impl fmt::Debug for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "FileId(INVALID)")
        } else {
            write!(f, "FileId({})", self.0)
        }
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Slot number - index into a page's slot directory.
///
/// Slot numbers are 0-based and stable across deletions of other slots.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct SlotNo(u16);

impl SlotNo {
    /// Creates a new `SlotNo` from a raw u16 value.
    #[inline]
    #[must_use]
    pub const fn new(no: u16) -> Self {
        Self(no)
    }

    /// Returns the raw u16 value.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns the slot number as a usize index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for SlotNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotNo({})", self.0)
    }
}

impl fmt::Display for SlotNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for SlotNo {
    #[inline]
    fn from(no: u16) -> Self {
        Self::new(no)
    }
}

impl From<SlotNo> for u16 {
    #[inline]
    fn from(no: SlotNo) -> Self {
        no.0
    }
}
