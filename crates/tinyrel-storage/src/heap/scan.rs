//! Filtered scans over heap files.
//!
//! A scan walks the linked data pages of one heap file left to right,
//! yielding the identifiers of records that satisfy an optional
//! predicate. At any moment the scan pins at most one data page (plus
//! the header pin owned by the underlying heap file).

use std::cell::RefCell;
use std::cmp::Ordering;
use std::path::Path;
use std::rc::Rc;

use tinyrel_common::types::{PageNo, Rid};

use super::error::{HeapError, HeapResult};
use super::file::{HeapFile, Record};
use crate::buffer::BufMgr;
use crate::file::Db;
use crate::page::{PageError, SlottedPage, SlottedPageRef};

/// Type of the field a predicate compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// 32-bit signed integer, little endian.
    Integer,
    /// 32-bit IEEE float, little endian.
    Float,
    /// Fixed-length byte string.
    String,
}

/// Comparison operator of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompOp {
    /// Field < filter value.
    Lt,
    /// Field <= filter value.
    Lte,
    /// Field == filter value.
    Eq,
    /// Field >= filter value.
    Gte,
    /// Field > filter value.
    Gt,
    /// Field != filter value.
    Ne,
}

impl CompOp {
    fn matches(self, ord: Ordering) -> bool {
        match self {
            Self::Lt => ord == Ordering::Less,
            Self::Lte => ord != Ordering::Greater,
            Self::Eq => ord == Ordering::Equal,
            Self::Gte => ord != Ordering::Less,
            Self::Gt => ord == Ordering::Greater,
            Self::Ne => ord != Ordering::Equal,
        }
    }
}

/// A validated scan predicate: compare `length` bytes at `offset` of
/// each record against a filter value.
#[derive(Debug, Clone)]
pub struct Predicate {
    offset: usize,
    length: usize,
    data_type: DataType,
    value: Vec<u8>,
    op: CompOp,
}

impl Predicate {
    /// Validates the predicate parameters.
    ///
    /// `Integer` and `Float` fields must be exactly four bytes, and the
    /// filter must supply at least `length` bytes.
    pub fn new(
        offset: usize,
        length: usize,
        data_type: DataType,
        filter: &[u8],
        op: CompOp,
    ) -> HeapResult<Self> {
        if length < 1 {
            return Err(HeapError::BadScanParam);
        }
        match data_type {
            DataType::Integer | DataType::Float if length != 4 => {
                return Err(HeapError::BadScanParam)
            }
            _ => {}
        }
        if filter.len() < length {
            return Err(HeapError::BadScanParam);
        }

        Ok(Self {
            offset,
            length,
            data_type,
            value: filter[..length].to_vec(),
            op,
        })
    }

    /// Returns true if `rec` satisfies the predicate.
    ///
    /// Records too short to contain the field never match. Field and
    /// filter bytes are copied into aligned locals before comparison.
    pub(crate) fn matches(&self, rec: &[u8]) -> bool {
        if self.offset + self.length > rec.len() {
            return false;
        }
        let field = &rec[self.offset..self.offset + self.length];

        let ord = match self.data_type {
            DataType::Integer => {
                let attr = i32::from_le_bytes(field.try_into().unwrap());
                let filter = i32::from_le_bytes(self.value.as_slice().try_into().unwrap());
                Some(attr.cmp(&filter))
            }
            DataType::Float => {
                let attr = f32::from_le_bytes(field.try_into().unwrap());
                let filter = f32::from_le_bytes(self.value.as_slice().try_into().unwrap());
                attr.partial_cmp(&filter)
            }
            DataType::String => Some(field.cmp(self.value.as_slice())),
        };

        match ord {
            Some(ord) => self.op.matches(ord),
            // An unordered float compares as "not equal" and nothing else.
            None => self.op == CompOp::Ne,
        }
    }
}

/// A stateful cursor over the records of one heap file.
///
/// # Example
///
/// ```rust,no_run
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use tinyrel_storage::buffer::{BufMgr, BufPoolConfig};
/// use tinyrel_storage::file::Db;
/// use tinyrel_storage::heap::{CompOp, DataType, HeapFileScan};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let db = Rc::new(Db::new());
/// let pool = Rc::new(RefCell::new(BufMgr::new(BufPoolConfig::new(10))?));
///
/// let mut scan = HeapFileScan::open(&db, &pool, "users.db")?;
/// scan.start_scan(0, 4, DataType::Integer, Some(&7i32.to_le_bytes()), CompOp::Eq)?;
/// while let Some(rid) = scan.scan_next()? {
///     let rec = scan.get_record()?;
///     println!("{rid}: {} bytes", rec.len());
/// }
/// scan.end_scan()?;
/// # Ok(())
/// # }
/// ```
pub struct HeapFileScan {
    heap: HeapFile,
    predicate: Option<Predicate>,
    marked: Option<(PageNo, Rid)>,
    exhausted: bool,
}

impl HeapFileScan {
    /// Opens a scan over the heap file at `path`.
    pub fn open(
        db: &Rc<Db>,
        pool: &Rc<RefCell<BufMgr>>,
        path: impl AsRef<Path>,
    ) -> HeapResult<Self> {
        Ok(Self {
            heap: HeapFile::open(db, pool, path)?,
            predicate: None,
            marked: None,
            exhausted: false,
        })
    }

    /// Returns the underlying heap file.
    #[inline]
    pub fn heap_file(&self) -> &HeapFile {
        &self.heap
    }

    /// Returns the number of live records in the file.
    #[inline]
    pub fn rec_count(&self) -> i32 {
        self.heap.rec_count()
    }

    /// Starts (or restarts) the scan.
    ///
    /// With `filter = None` the scan is unfiltered and the remaining
    /// parameters are ignored. Otherwise the parameters are validated
    /// and rejected with [`HeapError::BadScanParam`] before any scan
    /// state changes. The position resets to before the first record of
    /// the first data page.
    pub fn start_scan(
        &mut self,
        offset: usize,
        length: usize,
        data_type: DataType,
        filter: Option<&[u8]>,
        op: CompOp,
    ) -> HeapResult<()> {
        self.predicate = match filter {
            None => None,
            Some(filter) => Some(Predicate::new(offset, length, data_type, filter, op)?),
        };

        self.marked = None;
        self.exhausted = false;
        self.heap.release_current()?;

        if self.heap.header.first_page.is_valid() {
            self.heap.pin_current(self.heap.header.first_page)?;
        }
        Ok(())
    }

    /// Advances to the next matching record and returns its identifier.
    ///
    /// Returns `Ok(None)` when the scan has passed the last data page;
    /// at that point the scan holds no data-page pin. Unfiltered scans
    /// match every record.
    pub fn scan_next(&mut self) -> HeapResult<Option<Rid>> {
        if self.exhausted {
            return Ok(None);
        }

        if self.heap.cur_page_no.is_none() {
            let first = self.heap.header.first_page;
            if !first.is_valid() {
                self.exhausted = true;
                return Ok(None);
            }
            self.heap.pin_current(first)?;
        }

        loop {
            let cur_page_no = self.heap.cur_page_no.expect("scan holds a pinned page");

            let candidate = {
                let pool = self.heap.pool.borrow();
                let page = pool.page(&self.heap.file, cur_page_no)?;
                let view = SlottedPageRef::new(page);
                let found = match self.heap.cur_rec {
                    Some(rid) if rid.page_no == cur_page_no => view.next_record(rid.slot_no),
                    _ => view.first_record(),
                };
                match found {
                    Ok(slot) => Some(slot),
                    Err(PageError::EndOfPage(_)) | Err(PageError::NoRecords) => None,
                    Err(e) => return Err(e.into()),
                }
            };

            match candidate {
                Some(slot) => {
                    let rid = Rid::new(cur_page_no, slot);
                    let matched = {
                        let pool = self.heap.pool.borrow();
                        let page = pool.page(&self.heap.file, cur_page_no)?;
                        let rec = SlottedPageRef::new(page).record(slot)?;
                        self.predicate.as_ref().map(|p| p.matches(rec)).unwrap_or(true)
                    };
                    self.heap.cur_rec = Some(rid);
                    if matched {
                        return Ok(Some(rid));
                    }
                }
                None => {
                    let next_page = {
                        let pool = self.heap.pool.borrow();
                        let page = pool.page(&self.heap.file, cur_page_no)?;
                        SlottedPageRef::new(page).next_page()
                    };
                    self.heap.release_current()?;
                    if !next_page.is_valid() {
                        self.exhausted = true;
                        return Ok(None);
                    }
                    self.heap.pin_current(next_page)?;
                }
            }
        }
    }

    /// Returns the record the scan is positioned on.
    ///
    /// The returned [`Record`] borrows the pinned page.
    pub fn get_record(&self) -> HeapResult<Record<'_>> {
        self.heap.current_record()
    }

    /// Deletes the record the scan is positioned on.
    ///
    /// The slot is vacated within the page; the scan position stays
    /// valid and the next [`HeapFileScan::scan_next`] continues behind
    /// the deleted record.
    pub fn delete_record(&mut self) -> HeapResult<()> {
        let (page_no, rid) = match (self.heap.cur_page_no, self.heap.cur_rec) {
            (Some(page_no), Some(rid)) if rid.page_no == page_no => (page_no, rid),
            _ => return Err(HeapError::BadScanId),
        };

        {
            let mut pool = self.heap.pool.borrow_mut();
            let page = pool.page_mut(&self.heap.file, page_no)?;
            SlottedPage::new(page).delete_record(rid.slot_no)?;
        }

        self.heap.cur_dirty = true;
        self.heap.update_header(|h| h.rec_cnt -= 1)?;
        Ok(())
    }

    /// Marks the current page of the scan dirty.
    pub fn mark_dirty(&mut self) -> HeapResult<()> {
        self.heap.cur_dirty = true;
        Ok(())
    }

    /// Snapshots the current scan position for a later reset.
    pub fn mark_scan(&mut self) -> HeapResult<()> {
        match (self.heap.cur_page_no, self.heap.cur_rec) {
            (Some(page_no), Some(rid)) => {
                self.marked = Some((page_no, rid));
                Ok(())
            }
            _ => Err(HeapError::BadScanId),
        }
    }

    /// Restores the position saved by [`HeapFileScan::mark_scan`].
    ///
    /// If the marked page is no longer the pinned one, the current page
    /// is released and the marked page re-read; the restored page is
    /// clean.
    pub fn reset_scan(&mut self) -> HeapResult<()> {
        let (page_no, rid) = self.marked.ok_or(HeapError::BadScanId)?;

        if self.heap.cur_page_no != Some(page_no) {
            self.heap.release_current()?;
            self.heap.pin_current(page_no)?;
        }
        self.heap.cur_rec = Some(rid);
        self.exhausted = false;
        Ok(())
    }

    /// Ends the scan, releasing the data-page pin. Idempotent.
    pub fn end_scan(&mut self) -> HeapResult<()> {
        self.heap.release_current()
    }
}

impl std::fmt::Debug for HeapFileScan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeapFileScan")
            .field("heap", &self.heap)
            .field("filtered", &self.predicate.is_some())
            .field("exhausted", &self.exhausted)
            .finish()
    }
}
