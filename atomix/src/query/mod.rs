//! Relational range scans.
//!
//! A scan resolves a table and a pair of bounds to one key space (the
//! primary key or a secondary index), encodes the bounds into byte keys and
//! walks the tree between them with a [`BIter`](crate::storage::BIter).
//!
//! # Example
//!
//! ```ignore
//! let request = ScanRequest::new(
//!     CmpOp::Ge,
//!     Record::new().add_int64("a", 2),
//!     CmpOp::Le,
//!     Record::new().add_int64("a", 4),
//! );
//! for row in db.scan("T", request)?.rows() {
//!     println!("{}", row?);
//! }
//! ```

pub mod index;
pub mod row;
mod scanner;

pub use index::{IndexSelection, KeyLayout, find_index, resolve_layout};
pub use row::RowError;
pub use scanner::{RowLookup, Rows, ScanContext, ScanError, ScanRequest, Scanner, scan};
