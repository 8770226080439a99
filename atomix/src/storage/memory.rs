//! In-memory node store.

use std::sync::Arc;

use crate::storage::btree::BNode;
use crate::storage::page::PageId;
use crate::storage::store::{NodeSink, NodeStore, StoreError};

/// A node store backed by a vector of shared nodes.
///
/// Node `i` lives under page id `i + 1`, keeping 0 free as "no page".
#[derive(Debug, Default)]
pub struct MemoryStore {
    nodes: Vec<Arc<BNode>>,
    root: PageId,
}

impl MemoryStore {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: 0,
        }
    }

    /// The last committed root, or 0 if none.
    #[must_use]
    pub const fn root(&self) -> PageId {
        self.root
    }

    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Vec::len() is not const-stable
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl NodeStore for MemoryStore {
    fn get(&self, ptr: PageId) -> Result<Arc<BNode>, StoreError> {
        let index = usize::try_from(ptr)
            .ok()
            .and_then(|p| p.checked_sub(1))
            .ok_or(StoreError::PageNotFound(ptr))?;
        self.nodes
            .get(index)
            .cloned()
            .ok_or(StoreError::PageNotFound(ptr))
    }
}

impl NodeSink for MemoryStore {
    fn put(&mut self, node: BNode) -> Result<PageId, StoreError> {
        self.nodes.push(Arc::new(node));
        Ok(self.nodes.len() as PageId)
    }

    fn commit_root(&mut self, root: PageId) -> Result<(), StoreError> {
        self.root = root;
        Ok(())
    }
}
