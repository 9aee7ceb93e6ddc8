//! Buffer pool errors.

use thiserror::Error;
use tinyrel_common::types::PageNo;

use crate::file::IoError;

/// Result type for buffer pool operations.
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur during buffer pool operations.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum BufferError {
    /// Every frame is pinned or referenced; two full clock sweeps found
    /// no victim.
    #[error("buffer pool exceeded: no evictable frame")]
    BufferExceeded,

    /// The page is resident but not pinned; an unpin or access without a
    /// matching pin.
    #[error("page {page_no} is not pinned")]
    PageNotPinned { page_no: PageNo },

    /// The file still has a pinned page; flush refused.
    #[error("page {page_no} is still pinned")]
    PagePinned { page_no: PageNo },

    /// The page is not resident in the pool.
    #[error("page not found in buffer pool")]
    HashNotFound,

    /// The hash table rejected an operation; internal inconsistency.
    #[error("buffer hash table error: {0}")]
    HashTableError(&'static str),

    /// A frame claims a file while invalid; internal inconsistency.
    #[error("bad buffer state in frame {frame_no}")]
    BadBuffer { frame_no: usize },

    /// I/O failure talking to the file provider.
    #[error("file I/O error: {0}")]
    Io(#[from] IoError),

    /// Configuration error at pool construction.
    #[error("configuration error: {0}")]
    Config(&'static str),
}
