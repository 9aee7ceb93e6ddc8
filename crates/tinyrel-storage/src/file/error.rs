//! I/O error types for the file module.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tinyrel_common::types::PageNo;

/// Result type for file provider operations.
pub type IoResult<T> = Result<T, IoError>;

/// Errors that can occur in the file provider.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum IoError {
    /// Operating system I/O error.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// File not found.
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// File already exists.
    #[error("file already exists: {}", path.display())]
    AlreadyExists { path: PathBuf },

    /// File is still open and cannot be destroyed.
    #[error("file is open: {}", path.display())]
    FileOpen { path: PathBuf },

    /// File is not a database file or its header is corrupt.
    #[error("bad database file {}: {}", path.display(), reason)]
    BadFile { path: PathBuf, reason: &'static str },

    /// Page number outside the allocated range of the file.
    #[error("bad page number {page_no} (file has {num_pages} blocks)")]
    BadPageNumber { page_no: PageNo, num_pages: i32 },
}

impl IoError {
    /// Creates a NotFound error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates an AlreadyExists error.
    pub fn already_exists(path: impl Into<PathBuf>) -> Self {
        Self::AlreadyExists { path: path.into() }
    }

    /// Creates a BadFile error.
    pub fn bad_file(path: impl Into<PathBuf>, reason: &'static str) -> Self {
        Self::BadFile {
            path: path.into(),
            reason,
        }
    }

    /// Returns true if this is a "not found" error.
    ///
    /// Heap file creation uses this to distinguish "no such file, go
    /// ahead and create it" from every other open failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
            || matches!(self, Self::Io { source } if source.kind() == io::ErrorKind::NotFound)
    }

    /// Converts from std::io::Error with path context.
    pub fn from_io_with_path(err: io::Error, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path },
            io::ErrorKind::AlreadyExists => Self::AlreadyExists { path },
            _ => Self::Io { source: err },
        }
    }
}
