//! Record identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{PageNo, SlotNo};

/// Record identifier - locates one record within a heap file.
///
/// A `Rid` pairs the page number of the data page holding the record with
/// the record's slot number on that page. Rids are unique within one file
/// and stay valid until the record is deleted.
///
/// # Example
///
/// ```rust
/// use tinyrel_common::types::{PageNo, Rid, SlotNo};
///
/// let rid = Rid::new(PageNo::new(3), SlotNo::new(0));
/// assert_eq!(rid.page_no, PageNo::new(3));
/// assert_eq!(rid.slot_no, SlotNo::new(0));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rid {
    /// Page number of the data page holding the record.
    pub page_no: PageNo,
    /// Slot number of the record within that page.
    pub slot_no: SlotNo,
}

impl Rid {
    /// Creates a new record identifier.
    #[inline]
    #[must_use]
    pub const fn new(page_no: PageNo, slot_no: SlotNo) -> Self {
        Self { page_no, slot_no }
    }
}

impl fmt::Debug for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rid({}, {})", self.page_no, self.slot_no)
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.page_no, self.slot_no)
    }
}
