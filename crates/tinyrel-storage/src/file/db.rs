//! Registry of open database files.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tinyrel_common::types::FileId;

use super::error::{IoError, IoResult};
use super::handle::DbFile;

/// Registry of open database files.
///
/// The registry hands out shared [`DbFile`] handles: opening the same
/// path twice returns the same `Rc`, so every layer sees one in-memory
/// header per file. A file stays registered until every outside handle
/// has been returned through [`Db::close_file`].
pub struct Db {
    open_files: RefCell<HashMap<PathBuf, Rc<DbFile>>>,
    next_id: Cell<FileId>,
}

impl Db {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            open_files: RefCell::new(HashMap::new()),
            next_id: Cell::new(FileId::new(1)),
        }
    }

    /// Creates a new database file at `path`.
    ///
    /// Fails with [`IoError::AlreadyExists`] if the path exists.
    pub fn create_file(&self, path: impl AsRef<Path>) -> IoResult<()> {
        DbFile::create(path.as_ref())
    }

    /// Opens a database file, sharing the handle if it is already open.
    pub fn open_file(&self, path: impl AsRef<Path>) -> IoResult<Rc<DbFile>> {
        let path = path.as_ref();
        let mut open_files = self.open_files.borrow_mut();

        if let Some(file) = open_files.get(path) {
            return Ok(Rc::clone(file));
        }

        let id = self.next_id.get();
        self.next_id.set(id.next());

        let file = Rc::new(DbFile::open(path, id)?);
        open_files.insert(path.to_path_buf(), Rc::clone(&file));
        Ok(file)
    }

    /// Returns a handle obtained from [`Db::open_file`].
    ///
    /// When the last outside handle comes back the file is dropped from
    /// the registry and its descriptor is closed.
    pub fn close_file(&self, file: Rc<DbFile>) {
        let path = file.path().to_path_buf();
        drop(file);

        let mut open_files = self.open_files.borrow_mut();
        if let Some(shared) = open_files.get(&path) {
            // Only the registry's own reference is left.
            if Rc::strong_count(shared) == 1 {
                open_files.remove(&path);
            }
        }
    }

    /// Removes a database file from disk.
    ///
    /// Fails with [`IoError::FileOpen`] while any handle is outstanding.
    pub fn destroy_file(&self, path: impl AsRef<Path>) -> IoResult<()> {
        let path = path.as_ref();
        if self.is_open(path) {
            return Err(IoError::FileOpen {
                path: path.to_path_buf(),
            });
        }
        std::fs::remove_file(path).map_err(|e| IoError::from_io_with_path(e, path))
    }

    /// Returns true if `path` is currently open.
    pub fn is_open(&self, path: impl AsRef<Path>) -> bool {
        self.open_files.borrow().contains_key(path.as_ref())
    }
}

impl Default for Db {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("open_files", &self.open_files.borrow().len())
            .finish()
    }
}
