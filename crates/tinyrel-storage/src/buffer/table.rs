//! Hash table mapping resident pages to buffer frames.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tinyrel_common::types::{FileId, PageNo};

use super::error::{BufferError, BufferResult};

/// One chained entry in the table.
#[derive(Debug, Clone, Copy)]
struct Entry {
    file: FileId,
    page_no: PageNo,
    frame_no: usize,
}

/// Fixed-bucket chained hash table keyed by `(FileId, PageNo)`.
///
/// The bucket count is roughly 1.2 times the frame count, rounded up to
/// an odd number. Entries chain within their bucket; the table never
/// resizes because the pool's residency is bounded by its frame count.
pub struct BufHashTable {
    buckets: Vec<Vec<Entry>>,
}

impl BufHashTable {
    /// Creates a table sized for a pool of `num_bufs` frames.
    pub fn new(num_bufs: usize) -> Self {
        let mut size = num_bufs + num_bufs / 5 + 1;
        if size % 2 == 0 {
            size += 1;
        }
        Self {
            buckets: vec![Vec::new(); size],
        }
    }

    /// Returns the bucket count.
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Inserts a mapping for `(file, page_no)`.
    ///
    /// Fails with [`BufferError::HashTableError`] if the key is already
    /// present; a page is resident in at most one frame.
    pub fn insert(&mut self, file: FileId, page_no: PageNo, frame_no: usize) -> BufferResult<()> {
        let bucket = self.bucket_of(file, page_no);
        if self.buckets[bucket]
            .iter()
            .any(|e| e.file == file && e.page_no == page_no)
        {
            return Err(BufferError::HashTableError("duplicate insert"));
        }
        self.buckets[bucket].push(Entry {
            file,
            page_no,
            frame_no,
        });
        Ok(())
    }

    /// Looks up the frame holding `(file, page_no)`.
    pub fn lookup(&self, file: FileId, page_no: PageNo) -> BufferResult<usize> {
        let bucket = self.bucket_of(file, page_no);
        self.buckets[bucket]
            .iter()
            .find(|e| e.file == file && e.page_no == page_no)
            .map(|e| e.frame_no)
            .ok_or(BufferError::HashNotFound)
    }

    /// Removes the mapping for `(file, page_no)`.
    pub fn remove(&mut self, file: FileId, page_no: PageNo) -> BufferResult<()> {
        let bucket = self.bucket_of(file, page_no);
        let chain = &mut self.buckets[bucket];
        let pos = chain
            .iter()
            .position(|e| e.file == file && e.page_no == page_no)
            .ok_or(BufferError::HashNotFound)?;
        chain.swap_remove(pos);
        Ok(())
    }

    fn bucket_of(&self, file: FileId, page_no: PageNo) -> usize {
        let mut hasher = DefaultHasher::new();
        (file, page_no).hash(&mut hasher);
        (hasher.finish() % self.buckets.len() as u64) as usize
    }
}

impl std::fmt::Debug for BufHashTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries: usize = self.buckets.iter().map(Vec::len).sum();
        f.debug_struct("BufHashTable")
            .field("buckets", &self.buckets.len())
            .field("entries", &entries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizing_is_odd() {
        for num_bufs in [1, 3, 5, 10, 16, 100] {
            let table = BufHashTable::new(num_bufs);
            assert_eq!(table.bucket_count() % 2, 1, "num_bufs = {num_bufs}");
            assert!(table.bucket_count() > num_bufs);
        }
    }

    #[test]
    fn test_insert_lookup_remove() {
        let mut table = BufHashTable::new(10);
        let file = FileId::new(1);

        table.insert(file, PageNo::new(3), 7).unwrap();
        assert_eq!(table.lookup(file, PageNo::new(3)).unwrap(), 7);

        table.remove(file, PageNo::new(3)).unwrap();
        assert!(matches!(
            table.lookup(file, PageNo::new(3)).unwrap_err(),
            BufferError::HashNotFound
        ));
    }

    #[test]
    fn test_duplicate_insert_fails() {
        let mut table = BufHashTable::new(10);
        let file = FileId::new(1);

        table.insert(file, PageNo::new(3), 7).unwrap();
        assert!(matches!(
            table.insert(file, PageNo::new(3), 8).unwrap_err(),
            BufferError::HashTableError(_)
        ));
        // The original mapping is untouched.
        assert_eq!(table.lookup(file, PageNo::new(3)).unwrap(), 7);
    }

    #[test]
    fn test_remove_missing_fails() {
        let mut table = BufHashTable::new(10);
        assert!(matches!(
            table.remove(FileId::new(1), PageNo::new(3)).unwrap_err(),
            BufferError::HashNotFound
        ));
    }

    #[test]
    fn test_same_page_distinct_files() {
        let mut table = BufHashTable::new(10);
        table.insert(FileId::new(1), PageNo::new(3), 0).unwrap();
        table.insert(FileId::new(2), PageNo::new(3), 1).unwrap();

        assert_eq!(table.lookup(FileId::new(1), PageNo::new(3)).unwrap(), 0);
        assert_eq!(table.lookup(FileId::new(2), PageNo::new(3)).unwrap(), 1);
    }

    #[test]
    fn test_many_entries_chain() {
        let mut table = BufHashTable::new(4);
        let file = FileId::new(1);
        // More entries than buckets forces chaining.
        for i in 1..=20 {
            table.insert(file, PageNo::new(i), i as usize).unwrap();
        }
        for i in 1..=20 {
            assert_eq!(table.lookup(file, PageNo::new(i)).unwrap(), i as usize);
        }
    }
}
