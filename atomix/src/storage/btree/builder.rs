//! Bottom-up bulk loading of immutable trees.
//!
//! Sorted entries are packed left to right into leaves, then each level of
//! `(first key, page)` pairs is packed into internal nodes until a single
//! root remains. Nodes are never revisited, so the sink sees every page
//! exactly once.

use tracing::info;

use crate::storage::btree::node::{NodeBuilder, NodeError, NodeType};
use crate::storage::page::PageId;
use crate::storage::store::{NodeSink, StoreError};

/// Smallest usable fanout: an internal level must shrink.
pub const MIN_NODE_KEYS: usize = 2;

/// Build a tree from strictly ascending `(key, value)` entries.
///
/// Each node holds at most `max_keys` entries (fewer if the page fills up).
/// An empty input produces a single empty leaf. Returns the root page.
pub fn build_tree<K, I>(sink: &mut K, entries: I, max_keys: usize) -> Result<PageId, BuildError>
where
    K: NodeSink + ?Sized,
    I: IntoIterator<Item = (Vec<u8>, Vec<u8>)>,
{
    if max_keys < MIN_NODE_KEYS {
        return Err(BuildError::InvalidFanout(max_keys));
    }

    let mut level = pack(sink, NodeType::Leaf, entries, max_keys)?;
    let leaves = level.len();
    let mut height = 1;

    while level.len() > 1 {
        let children = level.len();
        level = pack(sink, NodeType::Internal, level, max_keys)?;
        if level.len() >= children {
            return Err(BuildError::SeparatorTooLarge);
        }
        height += 1;
    }

    let Some((_, root)) = level.pop() else {
        unreachable!("pack emits at least one node");
    };
    info!(leaves, height, root, "bulk loaded tree");
    Ok(root)
}

/// What a cell carries: a row payload in a leaf, a child page in an internal node.
trait CellValue {
    fn encoded_len(&self) -> usize;
    fn push_into(self, builder: &mut NodeBuilder, key: Vec<u8>) -> Result<(), NodeError>;
}

impl CellValue for Vec<u8> {
    fn encoded_len(&self) -> usize {
        self.len()
    }

    fn push_into(self, builder: &mut NodeBuilder, key: Vec<u8>) -> Result<(), NodeError> {
        builder.push(key, self)
    }
}

impl CellValue for PageId {
    fn encoded_len(&self) -> usize {
        std::mem::size_of::<PageId>()
    }

    fn push_into(self, builder: &mut NodeBuilder, key: Vec<u8>) -> Result<(), NodeError> {
        builder.push_child(key, self)
    }
}

/// Pack one level of nodes, returning each node's first key and page.
fn pack<K, V, I>(
    sink: &mut K,
    node_type: NodeType,
    items: I,
    max_keys: usize,
) -> Result<Vec<(Vec<u8>, PageId)>, BuildError>
where
    K: NodeSink + ?Sized,
    V: CellValue,
    I: IntoIterator<Item = (Vec<u8>, V)>,
{
    let mut nodes = Vec::new();
    let mut builder = NodeBuilder::new(node_type);
    let mut prev: Option<Vec<u8>> = None;

    for (position, (key, value)) in items.into_iter().enumerate() {
        if prev.as_deref().is_some_and(|p| p >= key.as_slice()) {
            return Err(BuildError::Unsorted { position });
        }
        let full = builder.len() == max_keys
            || (!builder.is_empty() && !builder.fits(key.len(), value.encoded_len()));
        if full {
            flush(sink, &mut builder, &mut nodes)?;
        }
        prev = Some(key.clone());
        value.push_into(&mut builder, key)?;
    }

    if !builder.is_empty() || nodes.is_empty() {
        flush(sink, &mut builder, &mut nodes)?;
    }
    Ok(nodes)
}

fn flush<K: NodeSink + ?Sized>(
    sink: &mut K,
    builder: &mut NodeBuilder,
    nodes: &mut Vec<(Vec<u8>, PageId)>,
) -> Result<(), BuildError> {
    let node_type = builder.node_type();
    let full = std::mem::replace(builder, NodeBuilder::new(node_type));
    let first = full.first_key().map(<[u8]>::to_vec).unwrap_or_default();
    let page_id = sink.put(full.finish())?;
    nodes.push((first, page_id));
    Ok(())
}

/// Errors raised while bulk loading a tree.
#[derive(Debug)]
pub enum BuildError {
    /// Fanout below `MIN_NODE_KEYS`.
    InvalidFanout(usize),
    /// The entry at this position is not greater than its predecessor.
    Unsorted { position: usize },
    /// Separator keys too large for two to share an internal node.
    SeparatorTooLarge,
    /// A node could not be built.
    Node(NodeError),
    /// The sink failed.
    Store(StoreError),
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFanout(n) => {
                write!(f, "invalid fanout {n} (minimum {MIN_NODE_KEYS})")
            }
            Self::Unsorted { position } => {
                write!(f, "entry {position} is not in strictly ascending order")
            }
            Self::SeparatorTooLarge => write!(f, "separator keys too large for internal nodes"),
            Self::Node(e) => write!(f, "node error: {e}"),
            Self::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Node(e) => Some(e),
            Self::Store(e) => Some(e),
            Self::InvalidFanout(_) | Self::Unsorted { .. } | Self::SeparatorTooLarge => None,
        }
    }
}

impl From<NodeError> for BuildError {
    fn from(e: NodeError) -> Self {
        Self::Node(e)
    }
}

impl From<StoreError> for BuildError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}
