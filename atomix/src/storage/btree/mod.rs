//! Immutable B+trees: node format, bulk loading and ordered cursors.
//!
//! Internal nodes hold `(first key of child subtree, child page)` pairs;
//! leaves hold `(key, value)` pairs. Keys are arbitrary byte strings compared
//! lexicographically.

mod builder;
mod iter;
mod node;

pub use builder::{BuildError, MIN_NODE_KEYS, build_tree};
pub use iter::BIter;
pub use node::{BNode, MAX_CELL_PAYLOAD, NodeBuilder, NodeError, NodeType};
