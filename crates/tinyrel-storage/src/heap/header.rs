//! Heap file header page layout.
//!
//! The first allocated page of every heap file holds its persistent
//! metadata.
//!
//! # Layout (80 bytes, little endian)
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//!   0      64   file_name (NUL padded, truncated if longer)
//!  64       4   page_cnt  (header page + data pages)
//!  68       4   rec_cnt   (live records across all data pages)
//!  72       4   first_page (-1 if the file has no data pages)
//!  76       4   last_page  (-1 if the file has no data pages)
//! ```

use tinyrel_common::constants::MAX_NAME_SIZE;
use tinyrel_common::types::PageNo;

/// Size of the encoded header at the start of the header page.
pub const HEAP_HEADER_SIZE: usize = MAX_NAME_SIZE + 16;

const PAGE_CNT_OFFSET: usize = MAX_NAME_SIZE;
const REC_CNT_OFFSET: usize = MAX_NAME_SIZE + 4;
const FIRST_PAGE_OFFSET: usize = MAX_NAME_SIZE + 8;
const LAST_PAGE_OFFSET: usize = MAX_NAME_SIZE + 12;

/// Persistent metadata of one heap file.
///
/// Kept decoded in memory while the file is open; every mutation is
/// re-encoded into the pinned header frame immediately so that eviction
/// write-back always persists the current truth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    /// File name, truncated to `MAX_NAME_SIZE - 1` bytes.
    pub file_name: String,
    /// Number of pages in the file, header page included.
    pub page_cnt: i32,
    /// Number of live records across all data pages.
    pub rec_cnt: i32,
    /// First data page, or INVALID if none.
    pub first_page: PageNo,
    /// Last data page, or INVALID if none.
    pub last_page: PageNo,
}

impl FileHeader {
    /// Creates a header for an empty heap file named `name`.
    pub fn new(name: &str) -> Self {
        let mut file_name = name.to_string();
        if file_name.len() > MAX_NAME_SIZE - 1 {
            let mut end = MAX_NAME_SIZE - 1;
            while !file_name.is_char_boundary(end) {
                end -= 1;
            }
            file_name.truncate(end);
        }
        Self {
            file_name,
            page_cnt: 1,
            rec_cnt: 0,
            first_page: PageNo::INVALID,
            last_page: PageNo::INVALID,
        }
    }

    /// Decodes a header from the start of a header page.
    pub fn decode(page: &[u8]) -> Self {
        debug_assert!(page.len() >= HEAP_HEADER_SIZE);
        let name_bytes = &page[..MAX_NAME_SIZE];
        let name_len = name_bytes.iter().position(|&b| b == 0).unwrap_or(MAX_NAME_SIZE);
        Self {
            file_name: String::from_utf8_lossy(&name_bytes[..name_len]).into_owned(),
            page_cnt: i32::from_le_bytes(
                page[PAGE_CNT_OFFSET..PAGE_CNT_OFFSET + 4].try_into().unwrap(),
            ),
            rec_cnt: i32::from_le_bytes(
                page[REC_CNT_OFFSET..REC_CNT_OFFSET + 4].try_into().unwrap(),
            ),
            first_page: PageNo::from_le_bytes(
                page[FIRST_PAGE_OFFSET..FIRST_PAGE_OFFSET + 4].try_into().unwrap(),
            ),
            last_page: PageNo::from_le_bytes(
                page[LAST_PAGE_OFFSET..LAST_PAGE_OFFSET + 4].try_into().unwrap(),
            ),
        }
    }

    /// Encodes the header into the start of a header page.
    pub fn encode_into(&self, page: &mut [u8]) {
        debug_assert!(page.len() >= HEAP_HEADER_SIZE);
        page[..MAX_NAME_SIZE].fill(0);
        let name = self.file_name.as_bytes();
        let len = name.len().min(MAX_NAME_SIZE - 1);
        page[..len].copy_from_slice(&name[..len]);
        page[PAGE_CNT_OFFSET..PAGE_CNT_OFFSET + 4].copy_from_slice(&self.page_cnt.to_le_bytes());
        page[REC_CNT_OFFSET..REC_CNT_OFFSET + 4].copy_from_slice(&self.rec_cnt.to_le_bytes());
        page[FIRST_PAGE_OFFSET..FIRST_PAGE_OFFSET + 4]
            .copy_from_slice(&self.first_page.to_le_bytes());
        page[LAST_PAGE_OFFSET..LAST_PAGE_OFFSET + 4]
            .copy_from_slice(&self.last_page.to_le_bytes());
    }
}
