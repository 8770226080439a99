//! Node access traits shared by every store.
//!
//! Readers (the cursor and the scanner) only need [`NodeStore`]; the bulk
//! loader writes through [`NodeSink`].

use std::path::PathBuf;
use std::sync::Arc;

use crate::storage::btree::{BNode, NodeError};
use crate::storage::page::PageId;
use crate::storage::superblock::SuperblockError;

/// Read-only access to immutable tree nodes.
///
/// Page 0 is never a node; stores report it as [`StoreError::PageNotFound`].
pub trait NodeStore: Send + Sync {
    /// Fetch the node stored at `ptr`.
    fn get(&self, ptr: PageId) -> Result<Arc<BNode>, StoreError>;
}

/// Write access used when materializing a fresh tree.
pub trait NodeSink {
    /// Persist a node and return its new page id (never 0).
    fn put(&mut self, node: BNode) -> Result<PageId, StoreError>;

    /// Record `root` as the tree root. Stores without a header ignore it.
    fn commit_root(&mut self, root: PageId) -> Result<(), StoreError> {
        let _ = root;
        Ok(())
    }
}

impl<S: NodeStore + ?Sized> NodeStore for Arc<S> {
    fn get(&self, ptr: PageId) -> Result<Arc<BNode>, StoreError> {
        (**self).get(ptr)
    }
}

impl<S: NodeStore + ?Sized> NodeStore for &S {
    fn get(&self, ptr: PageId) -> Result<Arc<BNode>, StoreError> {
        (**self).get(ptr)
    }
}

/// Errors raised by node stores.
#[derive(Debug)]
pub enum StoreError {
    /// I/O error.
    Io(std::io::Error),
    /// File already exists.
    AlreadyExists(PathBuf),
    /// Superblock error.
    Superblock(SuperblockError),
    /// No node is stored under this id.
    PageNotFound(PageId),
    /// Page ID out of bounds.
    PageOutOfBounds { page_id: PageId, total_pages: u64 },
    /// A page failed checksum verification.
    ChecksumMismatch {
        page_id: PageId,
        expected: u32,
        actual: u32,
    },
    /// A page could not be parsed as a node.
    Node { page_id: PageId, source: NodeError },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::AlreadyExists(p) => write!(f, "file already exists: {}", p.display()),
            Self::Superblock(e) => write!(f, "superblock error: {e}"),
            Self::PageNotFound(id) => write!(f, "page {id} not found"),
            Self::PageOutOfBounds {
                page_id,
                total_pages,
            } => {
                write!(
                    f,
                    "page {page_id} out of bounds (total pages: {total_pages})"
                )
            }
            Self::ChecksumMismatch {
                page_id,
                expected,
                actual,
            } => write!(
                f,
                "checksum mismatch on page {page_id}: expected {expected:#010x}, got {actual:#010x}"
            ),
            Self::Node { page_id, source } => write!(f, "invalid node on page {page_id}: {source}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Superblock(e) => Some(e),
            Self::Node { source, .. } => Some(source),
            Self::AlreadyExists(_)
            | Self::PageNotFound(_)
            | Self::PageOutOfBounds { .. }
            | Self::ChecksumMismatch { .. } => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<SuperblockError> for StoreError {
    fn from(e: SuperblockError) -> Self {
        Self::Superblock(e)
    }
}
