//! Page-grained I/O over one database file.

use std::cell::{Cell, RefCell};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tinyrel_common::constants::{FILE_MAGIC, FILE_VERSION, PAGE_SIZE};
use tinyrel_common::types::{FileId, PageNo};

use super::error::{IoError, IoResult};

/// Size of the provider header at the start of block 0.
const HEADER_SIZE: usize = 20;

/// Offset of the magic field within block 0.
const MAGIC_OFFSET: usize = 0;
/// Offset of the version field within block 0.
const VERSION_OFFSET: usize = 4;
/// Offset of the block count field within block 0.
const NUM_PAGES_OFFSET: usize = 8;
/// Offset of the first-page field within block 0.
const FIRST_PAGE_OFFSET: usize = 12;
/// Offset of the free-list head field within block 0.
const FIRST_FREE_OFFSET: usize = 16;

/// In-memory copy of the provider header.
#[derive(Debug, Clone, Copy)]
struct FileHeader {
    /// Number of blocks in the file, including block 0.
    num_pages: i32,
    /// First page ever allocated, or INVALID if none.
    first_page: PageNo,
    /// Head of the free-page list, or INVALID if empty.
    first_free: PageNo,
}

impl FileHeader {
    fn empty() -> Self {
        Self {
            num_pages: 1,
            first_page: PageNo::INVALID,
            first_free: PageNo::INVALID,
        }
    }

    fn decode(block: &[u8]) -> IoResult<Self> {
        debug_assert!(block.len() >= HEADER_SIZE);
        let magic = u32::from_le_bytes(block[MAGIC_OFFSET..MAGIC_OFFSET + 4].try_into().unwrap());
        let version =
            u32::from_le_bytes(block[VERSION_OFFSET..VERSION_OFFSET + 4].try_into().unwrap());
        if magic != FILE_MAGIC {
            return Err(IoError::Io {
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, "bad magic"),
            });
        }
        if version != FILE_VERSION {
            return Err(IoError::Io {
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, "bad version"),
            });
        }
        Ok(Self {
            num_pages: i32::from_le_bytes(
                block[NUM_PAGES_OFFSET..NUM_PAGES_OFFSET + 4].try_into().unwrap(),
            ),
            first_page: PageNo::from_le_bytes(
                block[FIRST_PAGE_OFFSET..FIRST_PAGE_OFFSET + 4].try_into().unwrap(),
            ),
            first_free: PageNo::from_le_bytes(
                block[FIRST_FREE_OFFSET..FIRST_FREE_OFFSET + 4].try_into().unwrap(),
            ),
        })
    }

    fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[MAGIC_OFFSET..MAGIC_OFFSET + 4].copy_from_slice(&FILE_MAGIC.to_le_bytes());
        buf[VERSION_OFFSET..VERSION_OFFSET + 4].copy_from_slice(&FILE_VERSION.to_le_bytes());
        buf[NUM_PAGES_OFFSET..NUM_PAGES_OFFSET + 4].copy_from_slice(&self.num_pages.to_le_bytes());
        buf[FIRST_PAGE_OFFSET..FIRST_PAGE_OFFSET + 4].copy_from_slice(&self.first_page.to_le_bytes());
        buf[FIRST_FREE_OFFSET..FIRST_FREE_OFFSET + 4].copy_from_slice(&self.first_free.to_le_bytes());
        buf
    }
}

/// One open database file.
///
/// A `DbFile` provides page-grained block I/O: pages are allocated from a
/// free list (or by growing the file), read and written as whole blocks,
/// and disposed back onto the free list. Handles are shared via `Rc` by
/// the [`Db`](super::Db) registry; the [`FileId`] distinguishes open files
/// in memory and keys the buffer pool's hash table.
pub struct DbFile {
    id: FileId,
    path: PathBuf,
    file: RefCell<File>,
    header: Cell<FileHeader>,
}

impl DbFile {
    /// Creates a new database file at `path`.
    ///
    /// Fails with [`IoError::AlreadyExists`] if the path exists. The new
    /// file consists of a single header block and no pages.
    pub(super) fn create(path: &Path) -> IoResult<()> {
        let mut file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| IoError::from_io_with_path(e, path))?;

        let mut block = vec![0u8; PAGE_SIZE];
        block[..HEADER_SIZE].copy_from_slice(&FileHeader::empty().encode());
        file.write_all(&block)?;
        file.sync_all()?;
        Ok(())
    }

    /// Opens an existing database file, validating its header.
    pub(super) fn open(path: &Path, id: FileId) -> IoResult<Self> {
        let mut file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| IoError::from_io_with_path(e, path))?;

        let mut block = vec![0u8; PAGE_SIZE];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut block)
            .map_err(|_| IoError::bad_file(path, "header block truncated"))?;
        let header = FileHeader::decode(&block)
            .map_err(|_| IoError::bad_file(path, "not a database file"))?;

        Ok(Self {
            id,
            path: path.to_path_buf(),
            file: RefCell::new(file),
            header: Cell::new(header),
        })
    }

    /// Returns the in-memory identifier of this open file.
    #[inline]
    pub fn id(&self) -> FileId {
        self.id
    }

    /// Returns the file path.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of blocks in the file, including the header block.
    #[inline]
    pub fn page_count(&self) -> i32 {
        self.header.get().num_pages
    }

    /// Returns the first page ever allocated in this file.
    ///
    /// For a heap file this is the heap header page. Returns
    /// [`PageNo::INVALID`] if no page has been allocated yet.
    #[inline]
    pub fn first_page(&self) -> PageNo {
        self.header.get().first_page
    }

    /// Allocates a new page and returns its number.
    ///
    /// Reuses the head of the free list if one exists, otherwise appends
    /// a block to the file. The returned block is zeroed either way.
    pub fn allocate_page(&self) -> IoResult<PageNo> {
        let mut header = self.header.get();

        let page_no = if header.first_free.is_valid() {
            let page_no = header.first_free;
            // The first four bytes of a free block link to the next one.
            let mut link = [0u8; 4];
            self.read_at(page_no, 0, &mut link)?;
            header.first_free = PageNo::from_le_bytes(link);
            self.write_block(page_no, &vec![0u8; PAGE_SIZE])?;
            page_no
        } else {
            let page_no = PageNo::new(header.num_pages);
            self.write_block(page_no, &vec![0u8; PAGE_SIZE])?;
            header.num_pages += 1;
            page_no
        };

        if !header.first_page.is_valid() {
            header.first_page = page_no;
        }

        self.header.set(header);
        self.write_header()?;
        Ok(page_no)
    }

    /// Returns a disposed page to the free list.
    ///
    /// The block stays in the file; its first four bytes are overwritten
    /// with the previous free-list head.
    pub fn dispose_page(&self, page_no: PageNo) -> IoResult<()> {
        self.check_page_no(page_no)?;
        let mut header = self.header.get();
        self.write_at(page_no, 0, &header.first_free.to_le_bytes())?;
        header.first_free = page_no;
        self.header.set(header);
        self.write_header()
    }

    /// Reads one page into `buf`, which must be `PAGE_SIZE` bytes.
    pub fn read_page(&self, page_no: PageNo, buf: &mut [u8]) -> IoResult<()> {
        debug_assert_eq!(buf.len(), PAGE_SIZE);
        self.check_page_no(page_no)?;
        self.read_at(page_no, 0, buf)
    }

    /// Writes one page from `buf`, which must be `PAGE_SIZE` bytes.
    pub fn write_page(&self, page_no: PageNo, buf: &[u8]) -> IoResult<()> {
        debug_assert_eq!(buf.len(), PAGE_SIZE);
        self.check_page_no(page_no)?;
        self.write_block(page_no, buf)
    }

    fn check_page_no(&self, page_no: PageNo) -> IoResult<()> {
        let num_pages = self.header.get().num_pages;
        if !page_no.is_valid() || page_no.as_i32() >= num_pages {
            return Err(IoError::BadPageNumber { page_no, num_pages });
        }
        Ok(())
    }

    fn write_header(&self) -> IoResult<()> {
        let bytes = self.header.get().encode();
        let mut file = self.file.borrow_mut();
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&bytes)?;
        Ok(())
    }

    fn read_at(&self, page_no: PageNo, offset: u64, buf: &mut [u8]) -> IoResult<()> {
        let mut file = self.file.borrow_mut();
        file.seek(SeekFrom::Start(page_no.as_i32() as u64 * PAGE_SIZE as u64 + offset))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write_at(&self, page_no: PageNo, offset: u64, buf: &[u8]) -> IoResult<()> {
        let mut file = self.file.borrow_mut();
        file.seek(SeekFrom::Start(page_no.as_i32() as u64 * PAGE_SIZE as u64 + offset))?;
        file.write_all(buf)?;
        Ok(())
    }

    fn write_block(&self, page_no: PageNo, buf: &[u8]) -> IoResult<()> {
        self.write_at(page_no, 0, buf)
    }
}

impl std::fmt::Debug for DbFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbFile")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("num_pages", &self.header.get().num_pages)
            .finish()
    }
}
