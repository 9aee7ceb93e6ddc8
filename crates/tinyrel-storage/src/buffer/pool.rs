//! Buffer pool implementation.
//!
//! The pool owns a fixed array of page frames, the descriptor for each
//! frame, and the hash table mapping resident `(file, page)` pairs to
//! frames. Eviction uses the clock (second-chance) policy.

use std::rc::Rc;

use tinyrel_common::constants::PAGE_SIZE;
use tinyrel_common::types::PageNo;

use super::config::BufPoolConfig;
use super::error::{BufferError, BufferResult};
use super::frame::FrameDesc;
use super::table::BufHashTable;
use super::BufStats;
use crate::file::DbFile;

/// The buffer pool manager.
///
/// Callers pin pages with [`BufMgr::read_page`] or [`BufMgr::alloc_page`],
/// access the frame bytes through [`BufMgr::page`] / [`BufMgr::page_mut`]
/// while the pin is outstanding, and release the pin with
/// [`BufMgr::unpin_page`], declaring at that point whether they dirtied
/// the frame. A frame with an outstanding pin is never evicted and never
/// changes identity.
///
/// On drop the pool writes every valid dirty frame back to its file.
/// Failures at that point are logged and swallowed; callers that need
/// write-back errors surfaced must use [`BufMgr::flush_file`] instead.
pub struct BufMgr {
    frames: Vec<Box<[u8]>>,
    descs: Vec<FrameDesc>,
    table: BufHashTable,
    clock_hand: usize,
    num_bufs: usize,
}

impl BufMgr {
    /// Creates a pool with `config.num_bufs` frames, all invalid.
    pub fn new(config: BufPoolConfig) -> BufferResult<Self> {
        config.validate().map_err(BufferError::Config)?;
        let num_bufs = config.num_bufs;

        Ok(Self {
            frames: (0..num_bufs)
                .map(|_| vec![0u8; PAGE_SIZE].into_boxed_slice())
                .collect(),
            descs: (0..num_bufs).map(FrameDesc::new).collect(),
            table: BufHashTable::new(num_bufs),
            clock_hand: num_bufs - 1,
            num_bufs,
        })
    }

    /// Returns the number of frames in the pool.
    #[inline]
    pub fn num_bufs(&self) -> usize {
        self.num_bufs
    }

    /// Reads a page into the pool and pins it.
    ///
    /// On a hit the existing frame's pin count is bumped and its
    /// reference bit set; the dirty bit is left alone. On a miss a frame
    /// is claimed through the clock, the page is read from disk, and the
    /// frame comes out valid, pinned once and clean.
    pub fn read_page(&mut self, file: &Rc<DbFile>, page_no: PageNo) -> BufferResult<()> {
        match self.table.lookup(file.id(), page_no) {
            Ok(frame_no) => {
                self.descs[frame_no].pin();
                Ok(())
            }
            Err(BufferError::HashNotFound) => {
                let frame_no = self.alloc_frame()?;
                file.read_page(page_no, &mut self.frames[frame_no])?;
                self.table.insert(file.id(), page_no, frame_no)?;
                self.descs[frame_no].set(Rc::clone(file), page_no);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Releases one pin on a page, ORing `dirty` into the frame.
    ///
    /// Fails with [`BufferError::HashNotFound`] if the page is not
    /// resident and [`BufferError::PageNotPinned`] if its pin count is
    /// already zero. Unpinning with `dirty = false` never clears a dirty
    /// bit set earlier.
    pub fn unpin_page(&mut self, file: &DbFile, page_no: PageNo, dirty: bool) -> BufferResult<()> {
        let frame_no = self.table.lookup(file.id(), page_no)?;
        let desc = &mut self.descs[frame_no];
        if desc.pin_count() == 0 {
            return Err(BufferError::PageNotPinned { page_no });
        }
        desc.unpin();
        desc.or_dirty(dirty);
        Ok(())
    }

    /// Allocates a new page in `file` and pins it in the pool.
    ///
    /// The frame comes out zeroed, pinned once and clean; the caller is
    /// expected to initialize the page format and unpin dirty.
    pub fn alloc_page(&mut self, file: &Rc<DbFile>) -> BufferResult<PageNo> {
        let page_no = file.allocate_page()?;
        let frame_no = self.alloc_frame()?;
        self.table.insert(file.id(), page_no, frame_no)?;
        self.frames[frame_no].fill(0);
        self.descs[frame_no].set(Rc::clone(file), page_no);
        Ok(page_no)
    }

    /// Removes a page from the pool (if resident) and from the file.
    ///
    /// Pinned pages are not protected here; callers must have released
    /// their pins first.
    pub fn dispose_page(&mut self, file: &DbFile, page_no: PageNo) -> BufferResult<()> {
        if let Ok(frame_no) = self.table.lookup(file.id(), page_no) {
            self.descs[frame_no].clear();
            self.table.remove(file.id(), page_no)?;
        }
        file.dispose_page(page_no)?;
        Ok(())
    }

    /// Flushes every page of `file` out of the pool.
    ///
    /// If any page of the file is still pinned, returns
    /// [`BufferError::PagePinned`] without touching a single frame.
    /// Otherwise dirty pages are written back and every frame of the
    /// file is invalidated.
    pub fn flush_file(&mut self, file: &DbFile) -> BufferResult<()> {
        // Refuse before mutating anything.
        for desc in &self.descs {
            let belongs = desc.file().map(|f| f.id() == file.id()).unwrap_or(false);
            if belongs && !desc.is_valid() {
                return Err(BufferError::BadBuffer {
                    frame_no: desc.frame_no(),
                });
            }
            if belongs && desc.pin_count() > 0 {
                return Err(BufferError::PagePinned {
                    page_no: desc.page_no(),
                });
            }
        }

        for frame_no in 0..self.num_bufs {
            let desc = &self.descs[frame_no];
            if !desc.file().map(|f| f.id() == file.id()).unwrap_or(false) {
                continue;
            }
            let page_no = desc.page_no();
            if desc.is_dirty() {
                file.write_page(page_no, &self.frames[frame_no])?;
                self.descs[frame_no].clear_dirty();
            }
            self.table.remove(file.id(), page_no)?;
            self.descs[frame_no].clear();
        }
        Ok(())
    }

    /// Returns the bytes of a pinned page.
    ///
    /// Fails with [`BufferError::HashNotFound`] when the page is not
    /// resident and [`BufferError::PageNotPinned`] when it is resident
    /// but no pin is outstanding; frame borrows are only honored while
    /// the pin keeps the frame's identity stable.
    pub fn page(&self, file: &DbFile, page_no: PageNo) -> BufferResult<&[u8]> {
        let frame_no = self.table.lookup(file.id(), page_no)?;
        if self.descs[frame_no].pin_count() == 0 {
            return Err(BufferError::PageNotPinned { page_no });
        }
        Ok(&self.frames[frame_no])
    }

    /// Returns the bytes of a pinned page, mutably.
    ///
    /// Same residency and pin requirements as [`BufMgr::page`]. Mutating
    /// the bytes does not set the dirty bit; that is declared at unpin.
    pub fn page_mut(&mut self, file: &DbFile, page_no: PageNo) -> BufferResult<&mut [u8]> {
        let frame_no = self.table.lookup(file.id(), page_no)?;
        if self.descs[frame_no].pin_count() == 0 {
            return Err(BufferError::PageNotPinned { page_no });
        }
        Ok(&mut self.frames[frame_no])
    }

    /// Returns true if `(file, page_no)` is resident.
    pub fn contains(&self, file: &DbFile, page_no: PageNo) -> bool {
        self.table.lookup(file.id(), page_no).is_ok()
    }

    /// Returns the pin count of a resident page.
    pub fn pin_count(&self, file: &DbFile, page_no: PageNo) -> Option<u32> {
        self.table
            .lookup(file.id(), page_no)
            .ok()
            .map(|frame_no| self.descs[frame_no].pin_count())
    }

    /// Returns aggregate counters over all frames.
    pub fn stats(&self) -> BufStats {
        let mut stats = BufStats::default();
        for desc in &self.descs {
            if desc.is_valid() {
                stats.valid_frames += 1;
                if desc.pin_count() > 0 {
                    stats.pinned_frames += 1;
                }
                if desc.is_dirty() {
                    stats.dirty_frames += 1;
                }
            }
        }
        stats
    }

    /// Claims a frame for a new page via the clock policy.
    ///
    /// Walks the clock for at most two full sweeps. Invalid frames are
    /// taken immediately; referenced frames lose their reference bit and
    /// get a second chance; pinned frames are skipped. A victim's dirty
    /// page is written back before the frame is reclaimed - if that write
    /// fails the victim is left intact (still valid, still dirty) so a
    /// retry can find it.
    fn alloc_frame(&mut self) -> BufferResult<usize> {
        for _ in 0..2 * self.num_bufs {
            let frame_no = self.clock_hand;

            if !self.descs[frame_no].is_valid() {
                self.advance_clock();
                return Ok(frame_no);
            }

            if self.descs[frame_no].ref_bit() {
                self.descs[frame_no].clear_ref_bit();
            } else if self.descs[frame_no].pin_count() == 0 {
                if self.descs[frame_no].is_dirty() {
                    let desc = &self.descs[frame_no];
                    let file = desc.file().expect("valid frame has a file");
                    file.write_page(desc.page_no(), &self.frames[frame_no])?;
                }

                let desc = &self.descs[frame_no];
                let (file_id, page_no) = (
                    desc.file().expect("valid frame has a file").id(),
                    desc.page_no(),
                );
                self.table
                    .remove(file_id, page_no)
                    .map_err(|_| BufferError::HashTableError("victim not in table"))?;

                self.descs[frame_no].clear();
                return Ok(frame_no);
            }
            self.advance_clock();
        }

        Err(BufferError::BufferExceeded)
    }

    #[inline]
    fn advance_clock(&mut self) {
        self.clock_hand = (self.clock_hand + 1) % self.num_bufs;
    }
}

impl Drop for BufMgr {
    /// Writes back every valid dirty frame, best effort.
    ///
    /// Errors are logged and swallowed; this is the documented shutdown
    /// policy, and callers needing error reporting flush explicitly.
    fn drop(&mut self) {
        for frame_no in 0..self.num_bufs {
            let desc = &self.descs[frame_no];
            if desc.is_valid() && desc.is_dirty() {
                let file = desc.file().expect("valid frame has a file");
                if let Err(e) = file.write_page(desc.page_no(), &self.frames[frame_no]) {
                    tracing::warn!(
                        page_no = %desc.page_no(),
                        error = %e,
                        "write-back failed during buffer pool shutdown"
                    );
                }
            }
        }
    }
}

impl std::fmt::Debug for BufMgr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufMgr")
            .field("num_bufs", &self.num_bufs)
            .field("clock_hand", &self.clock_hand)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::Db;
    use tempfile::tempdir;

    struct Fixture {
        _dir: tempfile::TempDir,
        db: Db,
        file: Rc<DbFile>,
    }

    /// A database file with `pages` allocated data pages, each stamped
    /// with its page number in the first byte.
    fn fixture(pages: usize) -> Fixture {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pool.db");
        let db = Db::new();
        db.create_file(&path).unwrap();
        let file = db.open_file(&path).unwrap();

        for i in 0..pages {
            let page_no = file.allocate_page().unwrap();
            let mut block = vec![0u8; PAGE_SIZE];
            block[0] = page_no.as_i32() as u8;
            file.write_page(page_no, &block).unwrap();
            assert_eq!(page_no.as_i32(), i as i32 + 1);
        }

        Fixture {
            _dir: dir,
            db,
            file,
        }
    }

    fn pool(num_bufs: usize) -> BufMgr {
        BufMgr::new(BufPoolConfig::new(num_bufs)).unwrap()
    }

    #[test]
    fn test_zero_frames_rejected() {
        assert!(matches!(
            BufMgr::new(BufPoolConfig::new(0)).unwrap_err(),
            BufferError::Config(_)
        ));
    }

    #[test]
    fn test_read_page_miss_then_hit() {
        let fx = fixture(1);
        let mut pool = pool(3);
        let p1 = PageNo::new(1);

        pool.read_page(&fx.file, p1).unwrap();
        assert_eq!(pool.pin_count(&fx.file, p1), Some(1));
        assert_eq!(pool.page(&fx.file, p1).unwrap()[0], 1);

        // A hit bumps the pin count on the same frame.
        pool.read_page(&fx.file, p1).unwrap();
        assert_eq!(pool.pin_count(&fx.file, p1), Some(2));
        assert_eq!(pool.stats().valid_frames, 1);
    }

    #[test]
    fn test_unpin_errors() {
        let fx = fixture(1);
        let mut pool = pool(3);
        let p1 = PageNo::new(1);

        // Not resident at all.
        assert!(matches!(
            pool.unpin_page(&fx.file, p1, false).unwrap_err(),
            BufferError::HashNotFound
        ));

        pool.read_page(&fx.file, p1).unwrap();
        pool.unpin_page(&fx.file, p1, false).unwrap();

        // Double unpin.
        assert!(matches!(
            pool.unpin_page(&fx.file, p1, false).unwrap_err(),
            BufferError::PageNotPinned { .. }
        ));
    }

    #[test]
    fn test_unpin_false_never_clears_dirty() {
        let fx = fixture(1);
        let mut pool = pool(3);
        let p1 = PageNo::new(1);

        pool.read_page(&fx.file, p1).unwrap();
        pool.read_page(&fx.file, p1).unwrap();
        pool.unpin_page(&fx.file, p1, true).unwrap();
        pool.unpin_page(&fx.file, p1, false).unwrap();

        assert_eq!(pool.stats().dirty_frames, 1);
    }

    #[test]
    fn test_page_access_requires_pin() {
        let fx = fixture(1);
        let mut pool = pool(3);
        let p1 = PageNo::new(1);

        assert!(matches!(
            pool.page(&fx.file, p1).unwrap_err(),
            BufferError::HashNotFound
        ));

        pool.read_page(&fx.file, p1).unwrap();
        pool.unpin_page(&fx.file, p1, false).unwrap();

        // Resident but unpinned: the borrow token is gone.
        assert!(matches!(
            pool.page(&fx.file, p1).unwrap_err(),
            BufferError::PageNotPinned { .. }
        ));
    }

    #[test]
    fn test_clock_second_chance_order() {
        let fx = fixture(5);
        let mut pool = pool(3);
        let (p1, p2, p3, p4) = (
            PageNo::new(1),
            PageNo::new(2),
            PageNo::new(3),
            PageNo::new(4),
        );

        for p in [p1, p2, p3] {
            pool.read_page(&fx.file, p).unwrap();
            pool.unpin_page(&fx.file, p, false).unwrap();
        }

        // All reference bits are set; the sweep clears them oldest-first
        // and the oldest page loses its frame.
        pool.read_page(&fx.file, p4).unwrap();
        pool.unpin_page(&fx.file, p4, false).unwrap();
        assert!(!pool.contains(&fx.file, p1));
        assert!(pool.contains(&fx.file, p2));
        assert!(pool.contains(&fx.file, p3));

        // Next victim is the page whose second chance was spent.
        pool.read_page(&fx.file, p1).unwrap();
        pool.unpin_page(&fx.file, p1, false).unwrap();
        assert!(!pool.contains(&fx.file, p2));
        assert!(pool.contains(&fx.file, p3));
        assert!(pool.contains(&fx.file, p4));
    }

    #[test]
    fn test_eviction_skips_pinned() {
        let fx = fixture(3);
        let mut pool = pool(2);
        let (p1, p2, p3) = (PageNo::new(1), PageNo::new(2), PageNo::new(3));

        pool.read_page(&fx.file, p1).unwrap(); // stays pinned
        pool.read_page(&fx.file, p2).unwrap();
        pool.unpin_page(&fx.file, p2, false).unwrap();

        pool.read_page(&fx.file, p3).unwrap();
        assert!(pool.contains(&fx.file, p1));
        assert!(!pool.contains(&fx.file, p2));
        assert!(pool.contains(&fx.file, p3));
    }

    #[test]
    fn test_buffer_exceeded_when_all_pinned() {
        let fx = fixture(3);
        let mut pool = pool(2);

        pool.read_page(&fx.file, PageNo::new(1)).unwrap();
        pool.read_page(&fx.file, PageNo::new(2)).unwrap();

        assert!(matches!(
            pool.read_page(&fx.file, PageNo::new(3)).unwrap_err(),
            BufferError::BufferExceeded
        ));
    }

    #[test]
    fn test_dirty_write_back_on_eviction() {
        let fx = fixture(3);
        let mut pool = pool(2);
        let (p1, p2, p3) = (PageNo::new(1), PageNo::new(2), PageNo::new(3));

        pool.read_page(&fx.file, p1).unwrap();
        pool.page_mut(&fx.file, p1).unwrap()[0] = 0xAA;
        pool.unpin_page(&fx.file, p1, true).unwrap();

        pool.read_page(&fx.file, p2).unwrap();
        pool.unpin_page(&fx.file, p2, false).unwrap();

        // Evicting p1 must write it back before p3 takes its frame.
        pool.read_page(&fx.file, p3).unwrap();
        assert!(!pool.contains(&fx.file, p1));

        let mut block = vec![0u8; PAGE_SIZE];
        fx.file.read_page(p1, &mut block).unwrap();
        assert_eq!(block[0], 0xAA);
    }

    #[test]
    fn test_alloc_page_is_pinned_and_clean() {
        let fx = fixture(0);
        let mut pool = pool(3);

        let page_no = pool.alloc_page(&fx.file).unwrap();
        assert_eq!(pool.pin_count(&fx.file, page_no), Some(1));
        let stats = pool.stats();
        assert_eq!(stats.dirty_frames, 0);
        assert!(pool.page(&fx.file, page_no).unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_dispose_page_drops_residency() {
        let fx = fixture(0);
        let mut pool = pool(3);

        let page_no = pool.alloc_page(&fx.file).unwrap();
        pool.unpin_page(&fx.file, page_no, false).unwrap();
        pool.dispose_page(&fx.file, page_no).unwrap();

        assert!(!pool.contains(&fx.file, page_no));
    }

    #[test]
    fn test_flush_file_refuses_pinned_without_mutation() {
        let fx = fixture(2);
        let mut pool = pool(3);
        let (p1, p2) = (PageNo::new(1), PageNo::new(2));

        pool.read_page(&fx.file, p1).unwrap();
        pool.read_page(&fx.file, p2).unwrap();
        pool.page_mut(&fx.file, p2).unwrap()[0] = 0xBB;
        pool.unpin_page(&fx.file, p2, true).unwrap();

        let err = pool.flush_file(&fx.file).unwrap_err();
        assert!(matches!(err, BufferError::PagePinned { .. }));

        // Nothing was flushed or invalidated.
        assert!(pool.contains(&fx.file, p1));
        assert!(pool.contains(&fx.file, p2));
        assert_eq!(pool.stats().dirty_frames, 1);
        let mut block = vec![0u8; PAGE_SIZE];
        fx.file.read_page(p2, &mut block).unwrap();
        assert_eq!(block[0], 2);
    }

    #[test]
    fn test_flush_file_writes_and_invalidates() {
        let fx = fixture(2);
        let mut pool = pool(3);
        let (p1, p2) = (PageNo::new(1), PageNo::new(2));

        pool.read_page(&fx.file, p1).unwrap();
        pool.page_mut(&fx.file, p1).unwrap()[0] = 0xCC;
        pool.unpin_page(&fx.file, p1, true).unwrap();
        pool.read_page(&fx.file, p2).unwrap();
        pool.unpin_page(&fx.file, p2, false).unwrap();

        pool.flush_file(&fx.file).unwrap();
        assert!(!pool.contains(&fx.file, p1));
        assert!(!pool.contains(&fx.file, p2));
        assert_eq!(pool.stats().valid_frames, 0);

        let mut block = vec![0u8; PAGE_SIZE];
        fx.file.read_page(p1, &mut block).unwrap();
        assert_eq!(block[0], 0xCC);
    }

    #[test]
    fn test_drop_writes_back_dirty_frames() {
        let fx = fixture(1);
        let p1 = PageNo::new(1);
        {
            let mut pool = pool(3);
            pool.read_page(&fx.file, p1).unwrap();
            pool.page_mut(&fx.file, p1).unwrap()[0] = 0xDD;
            pool.unpin_page(&fx.file, p1, true).unwrap();
        }

        let mut block = vec![0u8; PAGE_SIZE];
        fx.file.read_page(p1, &mut block).unwrap();
        assert_eq!(block[0], 0xDD);
    }

    #[test]
    fn test_two_files_do_not_collide() {
        let dir = tempdir().unwrap();
        let db = Db::new();
        let path_a = dir.path().join("a.db");
        let path_b = dir.path().join("b.db");
        db.create_file(&path_a).unwrap();
        db.create_file(&path_b).unwrap();
        let a = db.open_file(&path_a).unwrap();
        let b = db.open_file(&path_b).unwrap();
        a.allocate_page().unwrap();
        b.allocate_page().unwrap();

        let mut pool = pool(4);
        let p1 = PageNo::new(1);
        pool.read_page(&a, p1).unwrap();
        pool.read_page(&b, p1).unwrap();
        pool.page_mut(&a, p1).unwrap()[0] = 1;
        pool.page_mut(&b, p1).unwrap()[0] = 2;

        assert_eq!(pool.page(&a, p1).unwrap()[0], 1);
        assert_eq!(pool.page(&b, p1).unwrap()[0], 2);
    }
}
