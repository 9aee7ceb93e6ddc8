//! Buffered record insertion.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use tinyrel_common::types::Rid;

use super::error::{HeapError, HeapResult};
use super::file::HeapFile;
use crate::buffer::BufMgr;
use crate::file::Db;
use crate::page::{PageError, SlottedPage, MAX_RECORD_SIZE};

/// Appends records to the last data page of a heap file.
///
/// The scan keeps the file's last data page pinned and inserts into it
/// until the page fills up, at which point a new page is allocated,
/// linked behind the old one, and made the file's new last page.
///
/// On drop the current page is unpinned dirty unconditionally, since any
/// insert that reached it may have mutated it.
pub struct InsertFileScan {
    heap: HeapFile,
}

impl InsertFileScan {
    /// Opens an insert scan, positioning on the file's last data page.
    pub fn open(
        db: &Rc<Db>,
        pool: &Rc<RefCell<BufMgr>>,
        path: impl AsRef<Path>,
    ) -> HeapResult<Self> {
        let mut heap = HeapFile::open(db, pool, path)?;

        let last = heap.header.last_page;
        if last.is_valid() && heap.cur_page_no != Some(last) {
            heap.release_current()?;
            heap.pin_current(last)?;
        }

        Ok(Self { heap })
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

    /// Inserts a record and returns its identifier.
    ///
    /// Records longer than [`MAX_RECORD_SIZE`] are rejected with
    /// [`HeapError::InvalidRecLen`] before any state changes. When the
    /// current last page is full, a new page is chained behind it and
    /// the insert retried there.
    pub fn insert_record(&mut self, rec: &[u8]) -> HeapResult<Rid> {
        if rec.len() > MAX_RECORD_SIZE {
            return Err(HeapError::InvalidRecLen { len: rec.len() });
        }

        let cur_page_no = match self.heap.cur_page_no {
            Some(page_no) => page_no,
            None => {
                let last = self.heap.header.last_page;
                if !last.is_valid() {
                    return Err(HeapError::BadFile {
                        reason: "heap file has no data pages",
                    });
                }
                self.heap.pin_current(last)?;
                last
            }
        };

        let first_try = {
            let mut pool = self.heap.pool.borrow_mut();
            let page = pool.page_mut(&self.heap.file, cur_page_no)?;
            SlottedPage::new(page).insert_record(rec)
        };

        let rid = match first_try {
            Ok(slot) => Rid::new(cur_page_no, slot),
            Err(PageError::NoSpace { .. }) => self.chain_and_insert(rec)?,
            Err(e) => return Err(e.into()),
        };

        self.heap.cur_dirty = true;
        self.heap.cur_rec = Some(rid);
        self.heap.update_header(|h| h.rec_cnt += 1)?;
        Ok(rid)
    }

    /// Grows the file by one data page and inserts into it.
    fn chain_and_insert(&mut self, rec: &[u8]) -> HeapResult<Rid> {
        let old_page_no = self.heap.cur_page_no.expect("current page pinned");

        let new_page_no = {
            let mut pool = self.heap.pool.borrow_mut();
            let new_page_no = pool.alloc_page(&self.heap.file)?;
            SlottedPage::new(pool.page_mut(&self.heap.file, new_page_no)?).init(new_page_no);
            SlottedPage::new(pool.page_mut(&self.heap.file, old_page_no)?)
                .set_next_page(new_page_no);
            new_page_no
        };

        // The old page's next pointer changed; release it dirty and
        // adopt the pin the allocation left on the new page.
        self.heap.cur_dirty = true;
        self.heap.release_current()?;
        self.heap.adopt_current(new_page_no);

        self.heap.update_header(|h| {
            h.last_page = new_page_no;
            h.page_cnt += 1;
        })?;

        // A record that passed the length check fits in a fresh page.
        let slot = {
            let mut pool = self.heap.pool.borrow_mut();
            let page = pool.page_mut(&self.heap.file, new_page_no)?;
            SlottedPage::new(page).insert_record(rec)?
        };
        Ok(Rid::new(new_page_no, slot))
    }
}

impl Drop for InsertFileScan {
    fn drop(&mut self) {
        // Every insert that reached the current page may have mutated it.
        if self.heap.cur_page_no.is_some() {
            self.heap.cur_dirty = true;
        }
    }
}

impl std::fmt::Debug for InsertFileScan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsertFileScan").field("heap", &self.heap).finish()
    }
}
