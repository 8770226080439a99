//! Single-file page store.
//!
//! Page 0 holds the superblock; every other page is a sealed B-tree node.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{info, warn};

use crate::storage::btree::BNode;
use crate::storage::page::{PAGE_SIZE_U64, Page, PageError, PageId};
use crate::storage::store::{NodeSink, NodeStore, StoreError};
use crate::storage::superblock::Superblock;

struct Inner {
    file: File,
    superblock: Superblock,
}

impl Inner {
    /// Position the file at an existing page.
    fn seek_page(&mut self, page_id: PageId) -> Result<(), StoreError> {
        let total_pages = self.superblock.total_page_count;
        if page_id >= total_pages {
            return Err(StoreError::PageOutOfBounds {
                page_id,
                total_pages,
            });
        }
        self.file.seek(SeekFrom::Start(page_id * PAGE_SIZE_U64))?;
        Ok(())
    }
}

/// A database file handle with page I/O and node access.
///
/// File access is serialized behind a mutex so one `PageFile` can serve
/// concurrent readers.
pub struct PageFile {
    inner: Mutex<Inner>,
    verify_checksums: bool,
}

impl PageFile {
    /// Create a new database file at the given path.
    ///
    /// Returns an error if the file already exists.
    pub fn create(path: &Path) -> Result<Self, StoreError> {
        if path.exists() {
            return Err(StoreError::AlreadyExists(path.to_path_buf()));
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        // Initialize with a fresh superblock
        let superblock = Superblock::new();
        file.write_all(superblock.to_page().as_bytes())?;
        file.sync_all()?;

        info!(path = %path.display(), "created database file");

        Ok(Self {
            inner: Mutex::new(Inner { file, superblock }),
            verify_checksums: true,
        })
    }

    /// Open an existing database file.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;

        let mut page = Page::new();
        file.read_exact(page.as_bytes_mut())?;
        let superblock = Superblock::from_page(&page)?;

        info!(
            path = %path.display(),
            total_pages = superblock.total_page_count,
            root = superblock.root_page,
            "opened database file"
        );

        Ok(Self {
            inner: Mutex::new(Inner { file, superblock }),
            verify_checksums: true,
        })
    }

    /// Enable or disable checksum verification on node reads.
    pub const fn set_verify_checksums(&mut self, verify: bool) {
        self.verify_checksums = verify;
    }

    #[allow(clippy::expect_used)] // Mutex poisoning indicates unrecoverable state
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("lock poisoned")
    }

    #[must_use]
    pub fn superblock(&self) -> Superblock {
        self.lock().superblock
    }

    /// The committed root page, or 0 for an empty database.
    #[must_use]
    pub fn root(&self) -> PageId {
        self.lock().superblock.root_page
    }

    #[must_use]
    pub fn total_pages(&self) -> u64 {
        self.lock().superblock.total_page_count
    }

    /// Read a raw page from the file.
    pub fn read_page(&self, page_id: PageId) -> Result<Page, StoreError> {
        let mut inner = self.lock();
        inner.seek_page(page_id)?;
        let mut page = Page::new();
        inner.file.read_exact(page.as_bytes_mut())?;
        Ok(page)
    }

    /// Write a raw page to the file.
    pub fn write_page(&self, page_id: PageId, page: &Page) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.seek_page(page_id)?;
        inner.file.write_all(page.as_bytes())?;
        Ok(())
    }

    /// Allocate new pages at the end of the file.
    ///
    /// Returns the page ID of the first allocated page. The new page count is
    /// persisted by the next `write_superblock`.
    pub fn allocate_pages(&self, count: u64) -> Result<PageId, StoreError> {
        let mut inner = self.lock();
        let first_new_page = inner.superblock.total_page_count;
        let new_total = first_new_page + count;

        inner.file.set_len(new_total * PAGE_SIZE_U64)?;
        inner.superblock.total_page_count = new_total;

        Ok(first_new_page)
    }

    /// Write the in-memory superblock to page 0.
    pub fn write_superblock(&self) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let page = inner.superblock.to_page();
        inner.seek_page(0)?;
        inner.file.write_all(page.as_bytes())?;
        Ok(())
    }

    /// Sync all pending writes to disk.
    pub fn sync(&self) -> Result<(), StoreError> {
        self.lock().file.sync_all()?;
        Ok(())
    }
}

impl std::fmt::Debug for PageFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageFile")
            .field("superblock", &self.superblock())
            .field("verify_checksums", &self.verify_checksums)
            .finish_non_exhaustive()
    }
}

impl NodeStore for PageFile {
    fn get(&self, ptr: PageId) -> Result<Arc<BNode>, StoreError> {
        if ptr == 0 {
            return Err(StoreError::PageNotFound(ptr));
        }
        let page = self.read_page(ptr)?;

        let verified = if self.verify_checksums {
            page.verify_checksum()
        } else {
            Ok(())
        };
        if let Err(PageError::ChecksumMismatch { expected, actual }) = verified {
            warn!(page_id = ptr, expected, actual, "page checksum mismatch");
            return Err(StoreError::ChecksumMismatch {
                page_id: ptr,
                expected,
                actual,
            });
        }

        let node = BNode::from_page(page).map_err(|source| StoreError::Node {
            page_id: ptr,
            source,
        })?;
        Ok(Arc::new(node))
    }
}

impl NodeSink for PageFile {
    fn put(&mut self, node: BNode) -> Result<PageId, StoreError> {
        let page_id = self.allocate_pages(1)?;
        self.write_page(page_id, node.page())?;
        Ok(page_id)
    }

    fn commit_root(&mut self, root: PageId) -> Result<(), StoreError> {
        self.lock().superblock.root_page = root;
        self.write_superblock()?;
        self.sync()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::btree::{NodeBuilder, NodeType};
    use std::fs;
    use tempfile::tempdir;

    fn leaf(keys: &[&[u8]]) -> BNode {
        let mut builder = NodeBuilder::new(NodeType::Leaf);
        for key in keys {
            builder.push(key.to_vec(), b"value".to_vec()).expect("push");
        }
        builder.finish()
    }

    #[test]
    fn test_create_and_open() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("test.db");

        {
            let db = PageFile::create(&path).expect("create db");
            assert_eq!(db.total_pages(), 1);
            assert_eq!(db.root(), 0);
        }

        {
            let db = PageFile::open(&path).expect("open db");
            assert_eq!(db.total_pages(), 1);
            assert_eq!(db.root(), 0);
        }
    }

    #[test]
    fn test_create_already_exists() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("test.db");

        fs::write(&path, b"existing").expect("write file");

        let result = PageFile::create(&path);
        assert!(matches!(result, Err(StoreError::AlreadyExists(_))));
    }

    #[test]
    fn test_open_rejects_foreign_file() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("test.db");

        fs::write(&path, vec![0x42u8; 8192]).expect("write file");

        let result = PageFile::open(&path);
        assert!(matches!(result, Err(StoreError::Superblock(_))));
    }

    #[test]
    fn test_put_commit_and_reopen() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("test.db");

        let root = {
            let mut db = PageFile::create(&path).expect("create db");
            let first = db.put(leaf(&[b"a", b"b"])).expect("put");
            let second = db.put(leaf(&[b"c"])).expect("put");
            assert_eq!(first, 1); // Page 0 is superblock
            assert_eq!(second, 2);
            db.commit_root(second).expect("commit");
            second
        };

        let db = PageFile::open(&path).expect("open db");
        assert_eq!(db.root(), root);
        assert_eq!(db.total_pages(), 3);

        let node = db.get(1).expect("get");
        assert_eq!(node.key_count(), 2);
        assert_eq!(node.key_at(1), b"b");
        assert_eq!(db.get(2).expect("get").key_at(0), b"c");
    }

    #[test]
    fn test_page_out_of_bounds() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("test.db");

        let db = PageFile::create(&path).expect("create db");

        assert!(matches!(
            db.read_page(100),
            Err(StoreError::PageOutOfBounds { .. })
        ));
        assert!(matches!(db.get(0), Err(StoreError::PageNotFound(0))));
    }

    #[test]
    fn test_checksum_mismatch_detected() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("test.db");

        {
            let mut db = PageFile::create(&path).expect("create db");
            let id = db.put(leaf(&[b"key"])).expect("put");
            db.commit_root(id).expect("commit");
        }

        // Flip a byte in the unused tail of page 1
        let mut bytes = fs::read(&path).expect("read file");
        let offset = usize::try_from(2 * PAGE_SIZE_U64 - 1).expect("offset fits");
        bytes[offset] ^= 0xFF;
        fs::write(&path, bytes).expect("write file");

        let mut db = PageFile::open(&path).expect("open db");
        assert!(matches!(
            db.get(1),
            Err(StoreError::ChecksumMismatch { page_id: 1, .. })
        ));

        db.set_verify_checksums(false);
        assert_eq!(db.get(1).expect("get").key_at(0), b"key");
    }
}
