//! Frame descriptors - per-frame metadata for the buffer pool.

use std::rc::Rc;

use tinyrel_common::types::PageNo;

use crate::file::DbFile;

/// Metadata for one buffer frame.
///
/// A descriptor records which page occupies its frame, how many callers
/// hold the page pinned, whether the in-memory bytes diverge from disk,
/// and the reference bit consulted by the clock sweep. An invalid
/// descriptor means the frame is free.
///
/// While `pin_count > 0` the identity fields (`file`, `page_no`, `valid`)
/// never change; only the pin count, dirty bit and reference bit move.
pub struct FrameDesc {
    file: Option<Rc<DbFile>>,
    page_no: PageNo,
    frame_no: usize,
    pin_count: u32,
    dirty: bool,
    ref_bit: bool,
    valid: bool,
}

impl FrameDesc {
    /// Creates an invalid descriptor for frame `frame_no`.
    pub fn new(frame_no: usize) -> Self {
        Self {
            file: None,
            page_no: PageNo::INVALID,
            frame_no,
            pin_count: 0,
            dirty: false,
            ref_bit: false,
            valid: false,
        }
    }

    /// Installs a new page identity into the frame.
    ///
    /// The frame comes out valid, pinned once, referenced and clean.
    pub fn set(&mut self, file: Rc<DbFile>, page_no: PageNo) {
        self.file = Some(file);
        self.page_no = page_no;
        self.pin_count = 1;
        self.dirty = false;
        self.ref_bit = true;
        self.valid = true;
    }

    /// Returns the descriptor to the free state.
    pub fn clear(&mut self) {
        self.file = None;
        self.page_no = PageNo::INVALID;
        self.pin_count = 0;
        self.dirty = false;
        self.ref_bit = false;
        self.valid = false;
    }

    /// Returns the file whose page occupies this frame.
    #[inline]
    pub fn file(&self) -> Option<&Rc<DbFile>> {
        self.file.as_ref()
    }

    /// Returns the page number occupying this frame.
    #[inline]
    pub fn page_no(&self) -> PageNo {
        self.page_no
    }

    /// Returns this frame's index in the pool.
    #[inline]
    pub fn frame_no(&self) -> usize {
        self.frame_no
    }

    /// Returns the current pin count.
    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count
    }

    /// Increments the pin count and sets the reference bit.
    #[inline]
    pub fn pin(&mut self) {
        self.pin_count += 1;
        self.ref_bit = true;
    }

    /// Decrements the pin count.
    ///
    /// Callers must check `pin_count() > 0` first.
    #[inline]
    pub fn unpin(&mut self) {
        debug_assert!(self.pin_count > 0, "unpinned frame with pin_count = 0");
        self.pin_count -= 1;
    }

    /// Returns true if the frame is dirty.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// ORs `dirty` into the dirty bit; never clears it.
    #[inline]
    pub fn or_dirty(&mut self, dirty: bool) {
        self.dirty |= dirty;
    }

    /// Clears the dirty bit after a successful write-back.
    #[inline]
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Returns the reference bit.
    #[inline]
    pub fn ref_bit(&self) -> bool {
        self.ref_bit
    }

    /// Clears the reference bit (clock sweep).
    #[inline]
    pub fn clear_ref_bit(&mut self) {
        self.ref_bit = false;
    }

    /// Returns true if the frame holds a page.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

impl std::fmt::Debug for FrameDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameDesc")
            .field("frame_no", &self.frame_no)
            .field("file", &self.file.as_ref().map(|f| f.id()))
            .field("page_no", &self.page_no)
            .field("pin_count", &self.pin_count)
            .field("dirty", &self.dirty)
            .field("ref_bit", &self.ref_bit)
            .field("valid", &self.valid)
            .finish()
    }
}
