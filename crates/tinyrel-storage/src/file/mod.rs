//! File provider for TinyRel.
//!
//! This module owns everything below the buffer pool: a registry of open
//! database files ([`Db`]) and page-grained block I/O over one file
//! ([`DbFile`]).
//!
//! Every database file is a sequence of `PAGE_SIZE` blocks. Block 0 is
//! the **provider header** recording the block count, the first allocated
//! page, and the head of the free-page list; it is never handed out as a
//! page. Allocation reuses free-listed blocks before growing the file, and
//! disposal links blocks back onto the free list without shrinking it.
//!
//! All I/O is synchronous; a failing system call surfaces as
//! [`IoError::Io`] and is never retried here.

mod db;
mod error;
mod handle;

pub use db::Db;
pub use error::{IoError, IoResult};
pub use handle::DbFile;
