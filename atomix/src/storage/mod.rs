//! Page storage and immutable B+trees.
//!
//! # File Format
//!
//! A database file is a sequence of 8KB pages:
//!
//! - Page 0: Superblock (magic, format version, page count, root page)
//! - Pages 1-N: B-tree nodes, each with a CRC32-checked page header
//!
//! # Usage
//!
//! ```ignore
//! use atomix::storage::{BIter, MemoryStore, build_tree};
//!
//! let mut store = MemoryStore::new();
//! let root = build_tree(&mut store, entries, 128)?;
//!
//! let mut iter = BIter::seek(&store, root, b"start", CmpOp::Ge)?;
//! while let Some((key, value)) = iter.deref() {
//!     iter.next()?;
//! }
//! ```

pub mod btree;
mod file;
mod memory;
mod page;
mod store;
mod superblock;

pub use btree::{BIter, BNode, BuildError, NodeBuilder, NodeError, NodeType, build_tree};
pub use file::PageFile;
pub use memory::MemoryStore;
pub use page::{PAGE_SIZE, PAGE_SIZE_U64, Page, PageError, PageHeader, PageId, PageType};
pub use store::{NodeSink, NodeStore, StoreError};
pub use superblock::{Superblock, SuperblockError};
