//! B-tree node types and serialization.
//!
//! Nodes are 8KB pages with the following layout:
//!
//! ```text
//! [page header: 8 bytes]
//! [key_count: u16]
//! [cell offsets: u16 * key_count]
//! [cells ...]
//! ```
//!
//! Each cell is `[key_len: u16][val_len: u16][key][val]`. In a leaf the
//! value is the row payload; in an internal node it is the 8-byte child
//! page pointer, and the key is the smallest key of that child's subtree.
//! Keys within a node are strictly ascending.

#![allow(clippy::cast_possible_truncation)]

use crate::storage::page::{PAGE_SIZE, Page, PageError, PageHeader, PageId, PageType};

/// Offset of the key count (after the page header).
const KEY_COUNT_OFFSET: usize = PageHeader::SIZE;

/// Offset of the cell offset array.
const SLOTS_OFFSET: usize = KEY_COUNT_OFFSET + 2;

/// Size of one entry in the cell offset array.
const SLOT_SIZE: usize = 2;

/// Cell header: `key_len` (2 bytes) + `val_len` (2 bytes).
const CELL_HEADER_SIZE: usize = 4;

/// Size of a child pointer stored as an internal cell value.
const CHILD_POINTER_SIZE: usize = 8;

/// Largest key + value that fits in a node on its own.
pub const MAX_CELL_PAYLOAD: usize = PAGE_SIZE - SLOTS_OFFSET - SLOT_SIZE - CELL_HEADER_SIZE;

/// Node type discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeType {
    Internal = 0,
    Leaf = 1,
}

impl NodeType {
    const fn page_type(self) -> PageType {
        match self {
            Self::Internal => PageType::BTreeInternal,
            Self::Leaf => PageType::BTreeLeaf,
        }
    }
}

impl From<PageType> for NodeType {
    fn from(value: PageType) -> Self {
        match value {
            PageType::BTreeInternal => Self::Internal,
            PageType::BTreeLeaf => Self::Leaf,
        }
    }
}

/// An immutable, validated B-tree node.
///
/// All accessors index into the underlying page; bounds were checked once
/// in `from_page`.
pub struct BNode {
    page: Page,
    node_type: NodeType,
    key_count: usize,
}

impl BNode {
    /// Parse and validate a node from a page.
    pub fn from_page(page: Page) -> Result<Self, NodeError> {
        let header = PageHeader::read(&page).map_err(NodeError::InvalidHeader)?;
        let node_type = NodeType::from(header.page_type);

        let key_count = page.read_u16(KEY_COUNT_OFFSET) as usize;
        let cells_start = SLOTS_OFFSET + key_count * SLOT_SIZE;
        if cells_start > PAGE_SIZE {
            return Err(NodeError::InvalidKeyCount(key_count));
        }

        for slot in 0..key_count {
            let offset = page.read_u16(SLOTS_OFFSET + slot * SLOT_SIZE) as usize;
            if offset < cells_start || offset + CELL_HEADER_SIZE > PAGE_SIZE {
                return Err(NodeError::CorruptCell { slot });
            }
            let key_len = page.read_u16(offset) as usize;
            let val_len = page.read_u16(offset + 2) as usize;
            if offset + CELL_HEADER_SIZE + key_len + val_len > PAGE_SIZE {
                return Err(NodeError::CorruptCell { slot });
            }
            if node_type == NodeType::Internal && val_len != CHILD_POINTER_SIZE {
                return Err(NodeError::CorruptCell { slot });
            }
        }

        Ok(Self {
            page,
            node_type,
            key_count,
        })
    }

    #[must_use]
    pub const fn node_type(&self) -> NodeType {
        self.node_type
    }

    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self.node_type, NodeType::Leaf)
    }

    #[must_use]
    pub const fn key_count(&self) -> usize {
        self.key_count
    }

    #[must_use]
    pub const fn page(&self) -> &Page {
        &self.page
    }

    fn cell(&self, slot: usize) -> (usize, usize, usize) {
        assert!(slot < self.key_count, "slot {slot} out of range");
        let offset = self.page.read_u16(SLOTS_OFFSET + slot * SLOT_SIZE) as usize;
        let key_len = self.page.read_u16(offset) as usize;
        let val_len = self.page.read_u16(offset + 2) as usize;
        (offset + CELL_HEADER_SIZE, key_len, val_len)
    }

    /// The key at a slot.
    ///
    /// # Panics
    ///
    /// Panics if `slot >= key_count()`.
    #[must_use]
    pub fn key_at(&self, slot: usize) -> &[u8] {
        let (start, key_len, _) = self.cell(slot);
        self.page.read_bytes(start, key_len)
    }

    /// The value at a slot. For internal nodes this is the encoded child pointer.
    ///
    /// # Panics
    ///
    /// Panics if `slot >= key_count()`.
    #[must_use]
    pub fn value_at(&self, slot: usize) -> &[u8] {
        let (start, key_len, val_len) = self.cell(slot);
        self.page.read_bytes(start + key_len, val_len)
    }

    /// The child pointer at a slot of an internal node.
    ///
    /// # Panics
    ///
    /// Panics if `slot >= key_count()`.
    #[must_use]
    pub fn child_at(&self, slot: usize) -> PageId {
        debug_assert_eq!(self.node_type, NodeType::Internal);
        let (start, key_len, _) = self.cell(slot);
        self.page.read_u64(start + key_len)
    }

    /// Index of the last slot whose key is `<= key`, or 0 if there is none.
    #[must_use]
    pub fn lookup_le(&self, key: &[u8]) -> usize {
        let (mut lo, mut hi) = (0, self.key_count);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.key_at(mid) <= key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo.saturating_sub(1)
    }
}

impl std::fmt::Debug for BNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BNode")
            .field("node_type", &self.node_type)
            .field("key_count", &self.key_count)
            .finish_non_exhaustive()
    }
}

/// Accumulates sorted cells and serializes them into a node page.
#[derive(Debug)]
pub struct NodeBuilder {
    node_type: NodeType,
    cells: Vec<(Vec<u8>, Vec<u8>)>,
    /// Bytes used so far, including header and slot array.
    used: usize,
}

impl NodeBuilder {
    #[must_use]
    pub const fn new(node_type: NodeType) -> Self {
        Self {
            node_type,
            cells: Vec::new(),
            used: SLOTS_OFFSET,
        }
    }

    const fn cell_size(key_len: usize, val_len: usize) -> usize {
        SLOT_SIZE + CELL_HEADER_SIZE + key_len + val_len
    }

    #[must_use]
    pub const fn node_type(&self) -> NodeType {
        self.node_type
    }

    #[must_use]
    pub const fn fits(&self, key_len: usize, val_len: usize) -> bool {
        self.used + Self::cell_size(key_len, val_len) <= PAGE_SIZE
    }

    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Vec::len() is not const-stable
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[must_use]
    pub fn first_key(&self) -> Option<&[u8]> {
        self.cells.first().map(|(k, _)| k.as_slice())
    }

    /// Append a key-value cell. Keys must arrive in strictly ascending order.
    pub fn push(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), NodeError> {
        let payload = key.len() + value.len();
        if payload > MAX_CELL_PAYLOAD {
            return Err(NodeError::CellTooLarge(payload));
        }
        if !self.fits(key.len(), value.len()) {
            return Err(NodeError::NodeFull);
        }
        if self
            .cells
            .last()
            .is_some_and(|(last, _)| last.as_slice() >= key.as_slice())
        {
            return Err(NodeError::UnorderedKey { slot: self.cells.len() });
        }
        self.used += Self::cell_size(key.len(), value.len());
        self.cells.push((key, value));
        Ok(())
    }

    /// Append a separator key and child pointer to an internal node.
    pub fn push_child(&mut self, key: Vec<u8>, child: PageId) -> Result<(), NodeError> {
        self.push(key, child.to_le_bytes().to_vec())
    }

    /// Serialize into a sealed page and return the node.
    #[must_use]
    pub fn finish(self) -> BNode {
        let mut page = Page::new();
        PageHeader::new(self.node_type.page_type()).write_to(&mut page);
        page.write_u16(KEY_COUNT_OFFSET, self.cells.len() as u16);

        let mut offset = SLOTS_OFFSET + self.cells.len() * SLOT_SIZE;
        for (slot, (key, value)) in self.cells.iter().enumerate() {
            page.write_u16(SLOTS_OFFSET + slot * SLOT_SIZE, offset as u16);
            page.write_u16(offset, key.len() as u16);
            page.write_u16(offset + 2, value.len() as u16);
            page.write_bytes(offset + CELL_HEADER_SIZE, key);
            page.write_bytes(offset + CELL_HEADER_SIZE + key.len(), value);
            offset += CELL_HEADER_SIZE + key.len() + value.len();
        }
        page.seal();

        BNode {
            page,
            node_type: self.node_type,
            key_count: self.cells.len(),
        }
    }
}

/// Errors that can occur when working with B-tree nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    /// Invalid page header.
    InvalidHeader(PageError),
    /// The key count does not fit in a page.
    InvalidKeyCount(usize),
    /// A cell points outside the page or has the wrong shape.
    CorruptCell { slot: usize },
    /// A node with no keys below the root, or an internal root with no children.
    EmptyNode,
    /// Key + value too large for any node.
    CellTooLarge(usize),
    /// Node is full.
    NodeFull,
    /// A key was not greater than its predecessor.
    UnorderedKey { slot: usize },
}

impl std::fmt::Display for NodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidHeader(e) => write!(f, "invalid node header: {e}"),
            Self::InvalidKeyCount(n) => write!(f, "invalid key count: {n}"),
            Self::CorruptCell { slot } => write!(f, "corrupt cell at slot {slot}"),
            Self::EmptyNode => write!(f, "node has no keys"),
            Self::CellTooLarge(size) => {
                write!(f, "cell too large: {size} bytes (max {MAX_CELL_PAYLOAD})")
            }
            Self::NodeFull => write!(f, "node is full"),
            Self::UnorderedKey { slot } => write!(f, "key at slot {slot} is out of order"),
        }
    }
}

impl std::error::Error for NodeError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(keys: &[&[u8]]) -> BNode {
        let mut builder = NodeBuilder::new(NodeType::Leaf);
        for (i, key) in keys.iter().enumerate() {
            builder
                .push(key.to_vec(), format!("v{i}").into_bytes())
                .expect("push");
        }
        builder.finish()
    }

    #[test]
    fn test_leaf_node_roundtrip() {
        let node = leaf(&[b"apple", b"banana", b"cherry"]);
        let restored = BNode::from_page(node.page().clone()).expect("should parse");

        assert_eq!(restored.node_type(), NodeType::Leaf);
        assert_eq!(restored.key_count(), 3);
        assert_eq!(restored.key_at(0), b"apple");
        assert_eq!(restored.key_at(2), b"cherry");
        assert_eq!(restored.value_at(1), b"v1");
        assert!(restored.page().verify_checksum().is_ok());
    }

    #[test]
    fn test_internal_node_roundtrip() {
        let mut builder = NodeBuilder::new(NodeType::Internal);
        builder.push_child(b"a".to_vec(), 10).expect("push");
        builder.push_child(b"m".to_vec(), 20).expect("push");
        builder.push_child(b"t".to_vec(), 30).expect("push");
        let node = builder.finish();

        let restored = BNode::from_page(node.page().clone()).expect("should parse");
        assert_eq!(restored.node_type(), NodeType::Internal);
        assert!(!restored.is_leaf());
        assert_eq!(restored.key_count(), 3);
        assert_eq!(restored.child_at(0), 10);
        assert_eq!(restored.child_at(2), 30);
        assert_eq!(restored.key_at(1), b"m");
    }

    #[test]
    fn test_lookup_le() {
        let node = leaf(&[b"b", b"d", b"f"]);

        // Smaller than every key -> slot 0
        assert_eq!(node.lookup_le(b"a"), 0);
        // Exact matches
        assert_eq!(node.lookup_le(b"b"), 0);
        assert_eq!(node.lookup_le(b"d"), 1);
        assert_eq!(node.lookup_le(b"f"), 2);
        // Between keys -> the lesser neighbour
        assert_eq!(node.lookup_le(b"c"), 0);
        assert_eq!(node.lookup_le(b"e"), 1);
        // Larger than every key -> last slot
        assert_eq!(node.lookup_le(b"z"), 2);
        // A prefix of "d" sorts before it
        assert_eq!(node.lookup_le(b"d\x00"), 1);
    }

    #[test]
    fn test_empty_leaf() {
        let node = NodeBuilder::new(NodeType::Leaf).finish();
        assert_eq!(node.key_count(), 0);
        assert_eq!(node.lookup_le(b"x"), 0);
    }

    #[test]
    fn test_builder_rejects_unordered_keys() {
        let mut builder = NodeBuilder::new(NodeType::Leaf);
        builder.push(b"b".to_vec(), vec![]).expect("push");
        assert_eq!(
            builder.push(b"a".to_vec(), vec![]),
            Err(NodeError::UnorderedKey { slot: 1 })
        );
        assert_eq!(
            builder.push(b"b".to_vec(), vec![]),
            Err(NodeError::UnorderedKey { slot: 1 })
        );
    }

    #[test]
    fn test_builder_fills_up() {
        let mut builder = NodeBuilder::new(NodeType::Leaf);
        let value = vec![0u8; 1000];
        let mut count = 0u32;
        loop {
            let key = count.to_be_bytes().to_vec();
            match builder.push(key, value.clone()) {
                Ok(()) => count += 1,
                Err(e) => {
                    assert_eq!(e, NodeError::NodeFull);
                    break;
                }
            }
        }
        // 8 cells of ~1010 bytes fit in 8KB, the 9th does not.
        assert_eq!(count, 8);
        assert!(!builder.fits(4, 1000));

        assert_eq!(
            NodeBuilder::new(NodeType::Leaf).push(vec![1], vec![0u8; PAGE_SIZE]),
            Err(NodeError::CellTooLarge(PAGE_SIZE + 1))
        );
    }

    #[test]
    fn test_from_page_rejects_bad_pages() {
        // All zeros: page type 0 is invalid
        assert!(matches!(
            BNode::from_page(Page::new()),
            Err(NodeError::InvalidHeader(PageError::InvalidPageType(0)))
        ));

        // The superblock starts with its magic, not a node type
        let superblock = crate::storage::Superblock::new().to_page();
        assert_eq!(
            BNode::from_page(superblock).map(|_| ()),
            Err(NodeError::InvalidHeader(PageError::InvalidPageType(b'A')))
        );

        let node = leaf(&[b"k"]);
        let mut page = node.page().clone();
        // Point slot 0 past the end of the page
        page.write_u16(SLOTS_OFFSET, u16::MAX);
        assert_eq!(
            BNode::from_page(page).map(|_| ()),
            Err(NodeError::CorruptCell { slot: 0 })
        );
    }
}
