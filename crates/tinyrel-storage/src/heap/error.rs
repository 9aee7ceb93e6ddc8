//! Heap file errors.

use std::path::PathBuf;

use thiserror::Error;
use tinyrel_common::types::Rid;

use crate::buffer::BufferError;
use crate::file::IoError;
use crate::page::PageError;

/// Result type for heap file operations.
pub type HeapResult<T> = Result<T, HeapError>;

/// Errors that can occur during heap file operations.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum HeapError {
    /// A heap file with this name already exists.
    #[error("heap file already exists: {}", path.display())]
    FileExists { path: PathBuf },

    /// The record identifier does not name a live record.
    #[error("bad record identifier {0}")]
    BadRid(Rid),

    /// Invalid predicate parameters passed to start_scan.
    #[error("bad scan parameters")]
    BadScanParam,

    /// The scan is not positioned on a record.
    #[error("scan has no current record")]
    BadScanId,

    /// The record can never fit on a page.
    #[error("record of {len} bytes exceeds the page capacity")]
    InvalidRecLen { len: usize },

    /// The file is not a heap file.
    #[error("bad heap file: {reason}")]
    BadFile { reason: &'static str },

    /// Buffer pool failure.
    #[error(transparent)]
    Buffer(#[from] BufferError),

    /// Page format failure.
    #[error(transparent)]
    Page(#[from] PageError),

    /// File provider failure.
    #[error(transparent)]
    Io(#[from] IoError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinyrel_common::types::{PageNo, SlotNo};

    #[test]
    fn test_display() {
        let err = HeapError::BadRid(Rid::new(PageNo::new(3), SlotNo::new(1)));
        assert!(err.to_string().contains('3'));

        let err = HeapError::InvalidRecLen { len: 99999 };
        assert!(err.to_string().contains("99999"));
    }

    #[test]
    fn test_conversions() {
        let err: HeapError = BufferError::BufferExceeded.into();
        assert!(matches!(err, HeapError::Buffer(_)));

        let err: HeapError = PageError::NoRecords.into();
        assert!(matches!(err, HeapError::Page(_)));

        let err: HeapError = IoError::not_found("/tmp/x.db").into();
        assert!(matches!(err, HeapError::Io(_)));
    }
}
