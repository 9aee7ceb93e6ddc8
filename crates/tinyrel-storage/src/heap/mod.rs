//! Heap files for TinyRel.
//!
//! A heap file is an unordered collection of variable-length records
//! stored as a linked list of slotted pages behind a header page:
//!
//! ```text
//! ┌────────────┐    ┌───────────┐    ┌───────────┐
//! │ header page│    │ data page │    │ data page │
//! │ first_page ├───►│ next_page ├───►│  next: -1 │
//! │ last_page  │    │ records   │    │ records   │
//! │ rec_cnt    │    └───────────┘    └───────────┘
//! └────────────┘
//! ```
//!
//! Three access paths share the [`HeapFile`] core by composition:
//!
//! - [`HeapFile::get_record`] for lookup by [`Rid`](tinyrel_common::types::Rid)
//! - [`HeapFileScan`] for (optionally filtered) iteration with
//!   mark/reset and delete-at-cursor
//! - [`InsertFileScan`] for buffered appends to the last data page
//!
//! Every access goes through the buffer pool; the header page stays
//! pinned while a file is open and at most one data page is pinned per
//! instance.

mod error;
mod file;
mod header;
mod insert;
mod scan;

pub use error::{HeapError, HeapResult};
pub use file::{create_heap_file, destroy_heap_file, HeapFile, Record};
pub use header::{FileHeader, HEAP_HEADER_SIZE};
pub use insert::InsertFileScan;
pub use scan::{CompOp, DataType, HeapFileScan, Predicate};
