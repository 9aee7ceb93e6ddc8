//! Heap file creation, destruction and record lookup.

use std::cell::{Ref, RefCell};
use std::ops::Deref;
use std::path::Path;
use std::rc::Rc;

use tinyrel_common::types::{PageNo, Rid};

use super::error::{HeapError, HeapResult};
use super::header::FileHeader;
use crate::buffer::BufMgr;
use crate::file::{Db, DbFile, IoError};
use crate::page::{SlottedPage, SlottedPageRef};

/// Creates a heap file named `path`.
///
/// Fails with [`HeapError::FileExists`] when something already sits at
/// the path. Otherwise the file is created with its header page and one
/// empty data page, both written through the buffer pool, and closed
/// again.
pub fn create_heap_file(
    db: &Rc<Db>,
    pool: &Rc<RefCell<BufMgr>>,
    path: impl AsRef<Path>,
) -> HeapResult<()> {
    let path = path.as_ref();

    match db.open_file(path) {
        Ok(file) => {
            db.close_file(file);
            return Err(HeapError::FileExists {
                path: path.to_path_buf(),
            });
        }
        Err(e) if e.is_not_found() => {}
        Err(IoError::BadFile { .. }) => {
            // Something is there, even if it is not one of our files.
            return Err(HeapError::FileExists {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(e.into()),
    }

    db.create_file(path)?;
    let file = db.open_file(path)?;
    let result = init_heap_file(pool, &file, path);
    db.close_file(file);
    result
}

fn init_heap_file(pool: &RefCell<BufMgr>, file: &Rc<DbFile>, path: &Path) -> HeapResult<()> {
    let mut pool = pool.borrow_mut();

    let header_page_no = pool.alloc_page(file)?;
    let data_page_no = match pool.alloc_page(file) {
        Ok(page_no) => page_no,
        Err(e) => {
            let _ = pool.unpin_page(file, header_page_no, false);
            return Err(e.into());
        }
    };

    SlottedPage::new(pool.page_mut(file, data_page_no)?).init(data_page_no);

    let mut header = FileHeader::new(&path.to_string_lossy());
    header.first_page = data_page_no;
    header.last_page = data_page_no;
    header.page_cnt = 2;
    header.encode_into(pool.page_mut(file, header_page_no)?);

    pool.unpin_page(file, data_page_no, true)?;
    pool.unpin_page(file, header_page_no, true)?;
    Ok(())
}

/// Removes a heap file from disk.
///
/// Any clean resident pages are flushed out of the pool first. Fails
/// with [`crate::buffer::BufferError::PagePinned`] while an open
/// [`HeapFile`] still pins the header, and with
/// [`IoError::FileOpen`] while other handles are outstanding.
pub fn destroy_heap_file(
    db: &Rc<Db>,
    pool: &Rc<RefCell<BufMgr>>,
    path: impl AsRef<Path>,
) -> HeapResult<()> {
    let path = path.as_ref();

    if db.is_open(path) {
        let file = db.open_file(path)?;
        let flushed = pool.borrow_mut().flush_file(&file);
        db.close_file(file);
        flushed?;
    }

    db.destroy_file(path)?;
    Ok(())
}

/// An open heap file.
///
/// The header page stays pinned for the whole lifetime of the instance;
/// at most one data page (the *current* page) is pinned alongside it.
/// Record lookups reposition that single data-page pin. Dropping the
/// instance releases both pins, propagating the dirty flags, and returns
/// the file handle to the registry.
pub struct HeapFile {
    pub(crate) db: Rc<Db>,
    pub(crate) pool: Rc<RefCell<BufMgr>>,
    pub(crate) file: Rc<DbFile>,
    pub(crate) header: FileHeader,
    pub(crate) header_page_no: PageNo,
    pub(crate) hdr_dirty: bool,
    pub(crate) cur_page_no: Option<PageNo>,
    pub(crate) cur_dirty: bool,
    pub(crate) cur_rec: Option<Rid>,
}

impl HeapFile {
    /// Opens a heap file, pinning its header page and first data page.
    pub fn open(
        db: &Rc<Db>,
        pool: &Rc<RefCell<BufMgr>>,
        path: impl AsRef<Path>,
    ) -> HeapResult<Self> {
        let path = path.as_ref();
        let file = db.open_file(path)?;

        let header_page_no = file.first_page();
        if !header_page_no.is_valid() {
            db.close_file(file);
            return Err(HeapError::BadFile {
                reason: "file has no header page",
            });
        }

        if let Err(e) = pool.borrow_mut().read_page(&file, header_page_no) {
            db.close_file(file);
            return Err(e.into());
        }

        // From here on the destructor owns the cleanup.
        let mut this = Self {
            db: Rc::clone(db),
            pool: Rc::clone(pool),
            file,
            header: FileHeader::new(""),
            header_page_no,
            hdr_dirty: false,
            cur_page_no: None,
            cur_dirty: false,
            cur_rec: None,
        };

        this.header = {
            let pool = this.pool.borrow();
            FileHeader::decode(pool.page(&this.file, header_page_no)?)
        };

        if this.header.first_page.is_valid() {
            this.pin_current(this.header.first_page)?;
        }

        Ok(this)
    }

    /// Returns the file's persistent metadata.
    #[inline]
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Returns the number of live records in the file.
    #[inline]
    pub fn rec_count(&self) -> i32 {
        self.header.rec_cnt
    }

    /// Retrieves the record identified by `rid`.
    ///
    /// If the record lives on a different page than the current one, the
    /// current page is unpinned (propagating its dirty flag) and the
    /// record's page becomes the new current page. The returned
    /// [`Record`] borrows the pinned frame; no bytes are copied.
    pub fn get_record(&mut self, rid: Rid) -> HeapResult<Record<'_>> {
        if !rid.page_no.is_valid() {
            return Err(HeapError::BadRid(rid));
        }

        if self.cur_page_no != Some(rid.page_no) {
            self.release_current()?;
            self.pin_current(rid.page_no)?;
        }

        // Validate the slot before handing out the borrow.
        {
            let pool = self.pool.borrow();
            let page = pool.page(&self.file, rid.page_no)?;
            SlottedPageRef::new(page).record(rid.slot_no)?;
        }

        self.cur_rec = Some(rid);
        self.current_record()
    }

    /// Returns the record the file is currently positioned on.
    pub(crate) fn current_record(&self) -> HeapResult<Record<'_>> {
        let rid = match (self.cur_page_no, self.cur_rec) {
            (Some(page_no), Some(rid)) if rid.page_no == page_no => rid,
            _ => return Err(HeapError::BadScanId),
        };

        let pool = self.pool.borrow();
        let bytes = Ref::filter_map(pool, |p| {
            let page = p.page(&self.file, rid.page_no).ok()?;
            SlottedPageRef::new(page).record(rid.slot_no).ok()
        })
        .map_err(|_| HeapError::BadRid(rid))?;

        Ok(Record { bytes })
    }

    /// Pins `page_no` as the new current page.
    ///
    /// The previous current page must have been released already.
    pub(crate) fn pin_current(&mut self, page_no: PageNo) -> HeapResult<()> {
        debug_assert!(self.cur_page_no.is_none(), "current page already pinned");
        self.pool.borrow_mut().read_page(&self.file, page_no)?;
        self.cur_page_no = Some(page_no);
        self.cur_dirty = false;
        self.cur_rec = None;
        Ok(())
    }

    /// Adopts an already-pinned page as the current page.
    pub(crate) fn adopt_current(&mut self, page_no: PageNo) {
        debug_assert!(self.cur_page_no.is_none(), "current page already pinned");
        self.cur_page_no = Some(page_no);
        self.cur_dirty = false;
        self.cur_rec = None;
    }

    /// Unpins the current page, propagating its dirty flag. Idempotent.
    pub(crate) fn release_current(&mut self) -> HeapResult<()> {
        if let Some(page_no) = self.cur_page_no.take() {
            let dirty = self.cur_dirty;
            self.cur_dirty = false;
            self.cur_rec = None;
            self.pool.borrow_mut().unpin_page(&self.file, page_no, dirty)?;
        }
        Ok(())
    }

    /// Mutates the cached header and re-encodes it into the pinned
    /// header frame, so eviction write-back persists the change.
    pub(crate) fn update_header(&mut self, f: impl FnOnce(&mut FileHeader)) -> HeapResult<()> {
        f(&mut self.header);
        {
            let mut pool = self.pool.borrow_mut();
            let frame = pool.page_mut(&self.file, self.header_page_no)?;
            self.header.encode_into(frame);
        }
        self.hdr_dirty = true;
        Ok(())
    }
}

impl Drop for HeapFile {
    /// Unpins the current page and the header page, then returns the
    /// file handle. Unpin failures indicate a pin-balance bug and are
    /// logged rather than propagated.
    fn drop(&mut self) {
        {
            let mut pool = self.pool.borrow_mut();
            if let Some(page_no) = self.cur_page_no.take() {
                if let Err(e) = pool.unpin_page(&self.file, page_no, self.cur_dirty) {
                    tracing::warn!(%page_no, error = %e, "failed to unpin current data page");
                }
            }
            if let Err(e) = pool.unpin_page(&self.file, self.header_page_no, self.hdr_dirty) {
                tracing::warn!(page_no = %self.header_page_no, error = %e, "failed to unpin header page");
            }
        }
        self.db.close_file(Rc::clone(&self.file));
    }
}

impl std::fmt::Debug for HeapFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeapFile")
            .field("file", &self.file.id())
            .field("header", &self.header)
            .field("cur_page_no", &self.cur_page_no)
            .field("cur_rec", &self.cur_rec)
            .finish()
    }
}

/// A record borrowed from a pinned page frame.
///
/// The guard keeps the buffer pool borrowed for as long as it lives, so
/// the frame cannot be repositioned or evicted underneath it. Drop the
/// record before the next operation on the same heap file or pool.
pub struct Record<'a> {
    bytes: Ref<'a, [u8]>,
}

impl Deref for Record<'_> {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl AsRef<[u8]> for Record<'_> {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for Record<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record").field("len", &self.bytes.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{BufPoolConfig, BufferError};
    use tempfile::tempdir;
    use tinyrel_common::types::SlotNo;

    fn setup(num_bufs: usize) -> (tempfile::TempDir, Rc<Db>, Rc<RefCell<BufMgr>>) {
        let dir = tempdir().unwrap();
        let db = Rc::new(Db::new());
        let pool = Rc::new(RefCell::new(
            BufMgr::new(BufPoolConfig::new(num_bufs)).unwrap(),
        ));
        (dir, db, pool)
    }

    #[test]
    fn test_create_initializes_header() {
        let (dir, db, pool) = setup(5);
        let path = dir.path().join("t.db");
        create_heap_file(&db, &pool, &path).unwrap();

        let heap = HeapFile::open(&db, &pool, &path).unwrap();
        let header = heap.header();
        assert_eq!(header.page_cnt, 2);
        assert_eq!(header.rec_cnt, 0);
        assert!(header.first_page.is_valid());
        assert_eq!(header.first_page, header.last_page);
        assert_eq!(heap.rec_count(), 0);
    }

    #[test]
    fn test_create_existing_fails() {
        let (dir, db, pool) = setup(5);
        let path = dir.path().join("t.db");
        create_heap_file(&db, &pool, &path).unwrap();

        let err = create_heap_file(&db, &pool, &path).unwrap_err();
        assert!(matches!(err, HeapError::FileExists { .. }));
    }

    #[test]
    fn test_create_over_foreign_file_fails() {
        let (dir, db, pool) = setup(5);
        let path = dir.path().join("junk.db");
        std::fs::write(&path, b"not a database").unwrap();

        let err = create_heap_file(&db, &pool, &path).unwrap_err();
        assert!(matches!(err, HeapError::FileExists { .. }));
    }

    #[test]
    fn test_open_missing_fails() {
        let (dir, db, pool) = setup(5);
        let err = HeapFile::open(&db, &pool, dir.path().join("missing.db")).unwrap_err();
        assert!(matches!(err, HeapError::Io(e) if e.is_not_found()));
    }

    #[test]
    fn test_open_pins_header_and_first_data_page() {
        let (dir, db, pool) = setup(5);
        let path = dir.path().join("t.db");
        create_heap_file(&db, &pool, &path).unwrap();

        {
            let _heap = HeapFile::open(&db, &pool, &path).unwrap();
            assert_eq!(pool.borrow().stats().pinned_frames, 2);
        }
        // Dropping the heap file releases both pins.
        assert_eq!(pool.borrow().stats().pinned_frames, 0);
    }

    #[test]
    fn test_flush_file_refused_while_open() {
        let (dir, db, pool) = setup(5);
        let path = dir.path().join("t.db");
        create_heap_file(&db, &pool, &path).unwrap();

        let heap = HeapFile::open(&db, &pool, &path).unwrap();
        let dirty_before = pool.borrow().stats().dirty_frames;

        let err = pool.borrow_mut().flush_file(&heap.file).unwrap_err();
        assert!(matches!(err, BufferError::PagePinned { .. }));
        assert_eq!(pool.borrow().stats().dirty_frames, dirty_before);
    }

    #[test]
    fn test_get_record_rejects_bad_rid() {
        let (dir, db, pool) = setup(5);
        let path = dir.path().join("t.db");
        create_heap_file(&db, &pool, &path).unwrap();
        let mut heap = HeapFile::open(&db, &pool, &path).unwrap();

        let err = heap
            .get_record(Rid::new(PageNo::INVALID, SlotNo::new(0)))
            .unwrap_err();
        assert!(matches!(err, HeapError::BadRid(_)));

        // An empty data page has no slot 0.
        let first = heap.header().first_page;
        let err = heap.get_record(Rid::new(first, SlotNo::new(0))).unwrap_err();
        assert!(matches!(err, HeapError::Page(_)));
    }

    #[test]
    fn test_destroy_removes_file() {
        let (dir, db, pool) = setup(5);
        let path = dir.path().join("t.db");
        create_heap_file(&db, &pool, &path).unwrap();

        destroy_heap_file(&db, &pool, &path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_destroy_open_file_fails() {
        let (dir, db, pool) = setup(5);
        let path = dir.path().join("t.db");
        create_heap_file(&db, &pool, &path).unwrap();

        let heap = HeapFile::open(&db, &pool, &path).unwrap();
        let err = destroy_heap_file(&db, &pool, &path).unwrap_err();
        assert!(matches!(
            err,
            HeapError::Buffer(BufferError::PagePinned { .. })
        ));

        drop(heap);
        destroy_heap_file(&db, &pool, &path).unwrap();
    }
}
