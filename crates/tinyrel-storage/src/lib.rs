//! # tinyrel-storage
//!
//! Storage core of the TinyRel teaching relational engine.
//!
//! The crate turns a flat file of fixed-size blocks into a usable record
//! store through two interlocking subsystems:
//!
//! - A **buffer pool** ([`buffer::BufMgr`]) that caches disk pages in
//!   memory, pins them on behalf of callers, evicts them with a clock
//!   (second-chance) policy, and writes dirty pages back on eviction or
//!   shutdown.
//! - **Heap files** ([`heap::HeapFile`] and its scans) that layer
//!   linked-list files of variable-length records on top of the buffer
//!   pool, supporting creation, destruction, record lookup by identifier,
//!   filtered scans, and buffered insertion.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │  heap: HeapFile / HeapFileScan / InsertFileScan│
//! └───────────────────────┬────────────────────────┘
//!                         │ pin / unpin
//! ┌───────────────────────▼────────────────────────┐
//! │  buffer: BufMgr (frames + hash table + clock)  │
//! └───────────────────────┬────────────────────────┘
//!                         │ read / write / allocate
//! ┌───────────────────────▼────────────────────────┐
//! │  file: Db / DbFile (page-grained block I/O)    │
//! └────────────────────────────────────────────────┘
//! ```
//!
//! The [`page`] module defines the slotted-page format shared by all
//! layers. The engine is single-threaded and synchronous: the buffer pool
//! is shared behind `Rc<RefCell<_>>`, and every operation completes in the
//! caller's thread before returning.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Buffer pool manager
pub mod buffer;

/// File registry and page-grained block I/O
pub mod file;

/// Heap files and scans
pub mod heap;

/// Slotted page layout
pub mod page;
