//! Ordered B-tree cursor.
//!
//! A `BIter` is a root-to-leaf path of node snapshots plus one slot index per
//! level. `path[i].child_at(pos[i])` is `path[i + 1]`. The slot indices form a
//! mixed-radix counter with the most significant digit at the root: stepping
//! increments (or decrements) the leaf digit, carries up while a digit
//! overflows, then resets every digit below the one that moved.

use std::sync::Arc;

use tracing::trace;

use crate::storage::btree::node::{BNode, NodeError};
use crate::storage::page::PageId;
use crate::storage::store::{NodeStore, StoreError};
use crate::types::CmpOp;

/// A cursor over the keys of one tree.
pub struct BIter<'a, S: NodeStore + ?Sized> {
    store: &'a S,
    path: Vec<Arc<BNode>>,
    pos: Vec<usize>,
}

/// Which end of a subtree a descent lands on.
#[derive(Clone, Copy)]
enum Edge {
    First,
    Last,
}

impl<'a, S: NodeStore + ?Sized> BIter<'a, S> {
    /// Position the cursor at the last key `<= key`.
    ///
    /// If every key is greater than `key` the cursor lands on the first key.
    /// A root of 0 or an empty root leaf yields an invalid cursor.
    pub fn seek_le(store: &'a S, root: PageId, key: &[u8]) -> Result<Self, StoreError> {
        let mut iter = Self {
            store,
            path: Vec::new(),
            pos: Vec::new(),
        };
        if root == 0 {
            return Ok(iter);
        }

        let mut ptr = root;
        loop {
            let node = store.get(ptr)?;
            if node.key_count() == 0 {
                // Only a leaf root may be empty
                if node.is_leaf() && iter.path.is_empty() {
                    iter.path.push(node);
                    iter.pos.push(0);
                    break;
                }
                return Err(StoreError::Node {
                    page_id: ptr,
                    source: NodeError::EmptyNode,
                });
            }

            let slot = node.lookup_le(key);
            let child = (!node.is_leaf()).then(|| node.child_at(slot));
            iter.path.push(node);
            iter.pos.push(slot);
            match child {
                Some(next) => ptr = next,
                None => break,
            }
        }

        Ok(iter)
    }

    /// Position the cursor at the first key satisfying `cmp` against `key`,
    /// in `cmp`'s direction.
    ///
    /// `>`/`>=` land on the smallest qualifying key, `<`/`<=` on the largest.
    /// The cursor is invalid if no key qualifies.
    pub fn seek(store: &'a S, root: PageId, key: &[u8], cmp: CmpOp) -> Result<Self, StoreError> {
        let mut iter = Self::seek_le(store, root, key)?;
        if iter.deref().is_some_and(|(found, _)| !cmp.matches(found, key)) {
            if cmp.is_ascending() {
                iter.next()?;
            } else {
                iter.prev()?;
            }
        }
        trace!(%cmp, depth = iter.depth(), valid = iter.valid(), "cursor seek");
        Ok(iter)
    }

    /// Whether the cursor points at a key.
    #[must_use]
    pub fn valid(&self) -> bool {
        match (self.path.last(), self.pos.last()) {
            (Some(leaf), Some(&slot)) => slot < leaf.key_count(),
            _ => false,
        }
    }

    /// The key and value under the cursor.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn deref(&self) -> Option<(&[u8], &[u8])> {
        if !self.valid() {
            return None;
        }
        let leaf = self.path.last()?;
        let slot = *self.pos.last()?;
        Some((leaf.key_at(slot), leaf.value_at(slot)))
    }

    /// Number of levels on the current path; 0 once exhausted.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Vec::len() is not const-stable
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Step to the next key. Past the last key the cursor becomes invalid.
    ///
    /// Stepping an invalid cursor does nothing.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<(), StoreError> {
        if !self.valid() {
            return Ok(());
        }

        // Carry up until some level can advance.
        let mut level = self.path.len();
        loop {
            if level == 0 {
                self.exhaust();
                return Ok(());
            }
            level -= 1;
            if self.pos[level] + 1 < self.path[level].key_count() {
                self.pos[level] += 1;
                break;
            }
        }

        self.descend(level, Edge::First)
    }

    /// Step to the previous key. Before the first key the cursor becomes
    /// invalid.
    ///
    /// Stepping an invalid cursor does nothing.
    pub fn prev(&mut self) -> Result<(), StoreError> {
        if !self.valid() {
            return Ok(());
        }

        let mut level = self.path.len();
        loop {
            if level == 0 {
                self.exhaust();
                return Ok(());
            }
            level -= 1;
            if self.pos[level] > 0 {
                self.pos[level] -= 1;
                break;
            }
        }

        self.descend(level, Edge::Last)
    }

    /// Rebuild the path below `level` along the given edge of each subtree.
    fn descend(&mut self, level: usize, edge: Edge) -> Result<(), StoreError> {
        self.path.truncate(level + 1);
        self.pos.truncate(level + 1);

        loop {
            let depth = self.path.len() - 1;
            let parent = &self.path[depth];
            if parent.is_leaf() {
                return Ok(());
            }
            let ptr = parent.child_at(self.pos[depth]);

            let node = match self.store.get(ptr) {
                Ok(node) => node,
                Err(e) => {
                    self.exhaust();
                    return Err(e);
                }
            };
            let Some(last) = node.key_count().checked_sub(1) else {
                self.exhaust();
                return Err(StoreError::Node {
                    page_id: ptr,
                    source: NodeError::EmptyNode,
                });
            };

            let slot = match edge {
                Edge::First => 0,
                Edge::Last => last,
            };
            self.path.push(node);
            self.pos.push(slot);
        }
    }

    fn exhaust(&mut self) {
        self.path.clear();
        self.pos.clear();
    }
}

impl<S: NodeStore + ?Sized> std::fmt::Debug for BIter<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BIter")
            .field("pos", &self.pos)
            .field("valid", &self.valid())
            .finish_non_exhaustive()
    }
}
