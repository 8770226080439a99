//! Relational range scans over a tree.
//!
//! A scan is bounded on both sides: a start bound whose operator also sets
//! the direction (`>`/`>=` ascending, `<`/`<=` descending) and an end bound
//! with the opposite direction. Bounds are records over a leading subset of
//! the chosen key columns; missing trailing columns are padded so partial
//! bounds stay exact.

use std::iter::FusedIterator;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::codec::{self, CodecError};
use crate::config::IndexMissPolicy;
use crate::query::index::{IndexSelection, KeyLayout, resolve_layout};
use crate::query::row;
use crate::storage::{BIter, NodeStore, PageId, StoreError};
use crate::types::{CmpOp, Record, TableDef, ValueType};

/// Fetches full rows by primary key.
pub trait RowLookup {
    /// Look up the row whose primary key columns equal those in `pk`.
    fn point_get(&self, table: &TableDef, pk: &Record) -> Result<Option<Record>, ScanError>;
}

/// A range request: two bounds and an optional secondary index to use.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRequest {
    /// Start operator; its direction is the scan direction.
    pub cmp1: CmpOp,
    /// Start bound.
    pub key1: Record,
    /// End operator; must have the opposite direction.
    pub cmp2: CmpOp,
    /// End bound.
    pub key2: Record,
    /// Secondary index to scan instead of choosing one from `key1`.
    pub index: Option<String>,
}

impl ScanRequest {
    #[must_use]
    pub const fn new(cmp1: CmpOp, key1: Record, cmp2: CmpOp, key2: Record) -> Self {
        Self {
            cmp1,
            key1,
            cmp2,
            key2,
            index: None,
        }
    }

    /// Scan the named secondary index.
    #[must_use]
    pub fn using_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }
}

/// The collaborators a scan reads from.
pub struct ScanContext<'a, S: NodeStore + ?Sized> {
    pub catalog: &'a dyn Catalog,
    pub store: &'a S,
    /// Root of the tree holding every key space.
    pub root: PageId,
    pub lookup: &'a dyn RowLookup,
    pub index_miss_policy: IndexMissPolicy,
}

/// Start a range scan over `table`.
///
/// Schema and range errors are returned before any cursor is built.
pub fn scan<'a, S: NodeStore + ?Sized>(
    ctx: &ScanContext<'a, S>,
    table: &str,
    request: ScanRequest,
) -> Result<Scanner<'a, S>, ScanError> {
    let table = ctx
        .catalog
        .get_table_def(table)
        .ok_or_else(|| ScanError::TableNotFound(table.to_string()))?;

    if request.cmp1.direction() == request.cmp2.direction() {
        return Err(ScanError::BadRange {
            start: request.cmp1,
            end: request.cmp2,
        });
    }

    let layout = resolve_layout(
        &table,
        request.index.as_deref(),
        &request.key1,
        &request.key2,
    )?;

    let start_key = codec::encode_key_partial(
        layout.prefix,
        &request.key1.vals,
        &layout.types,
        request.cmp1,
    );
    let end_key = codec::encode_key_partial(
        layout.prefix,
        &request.key2.vals,
        &layout.types,
        request.cmp2,
    );

    debug!(
        table = table.name(),
        index = layout.name(&table),
        start = %format_args!("{} {}", request.cmp1, request.key1),
        end = %format_args!("{} {}", request.cmp2, request.key2),
        "scan setup"
    );

    let iter = BIter::seek(ctx.store, ctx.root, &start_key, request.cmp1)?;

    Ok(Scanner {
        table,
        layout,
        cmp1: request.cmp1,
        cmp2: request.cmp2,
        start_key,
        end_key,
        iter,
        lookup: ctx.lookup,
        index_miss_policy: ctx.index_miss_policy,
    })
}

/// A live range scan.
pub struct Scanner<'a, S: NodeStore + ?Sized> {
    table: Arc<TableDef>,
    layout: KeyLayout,
    cmp1: CmpOp,
    cmp2: CmpOp,
    start_key: Vec<u8>,
    end_key: Vec<u8>,
    iter: BIter<'a, S>,
    lookup: &'a dyn RowLookup,
    index_miss_policy: IndexMissPolicy,
}

impl<'a, S: NodeStore + ?Sized> Scanner<'a, S> {
    /// Whether the cursor is on a key inside both bounds.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.iter.deref().is_some_and(|(key, _)| {
            self.cmp1.matches(key, &self.start_key) && self.cmp2.matches(key, &self.end_key)
        })
    }

    /// Move one key in the scan direction. Does nothing once out of range.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<(), ScanError> {
        if !self.valid() {
            return Ok(());
        }
        if self.cmp1.is_ascending() {
            self.iter.next()?;
        } else {
            self.iter.prev()?;
        }
        Ok(())
    }

    /// Materialize the current row into `out`.
    ///
    /// Returns `Ok(false)` without touching `out` when the scanner is not
    /// valid, and with `out` cleared when a secondary entry has no row and
    /// the miss policy is `Skip`.
    pub fn deref(&self, out: &mut Record) -> Result<bool, ScanError> {
        if !self.valid() {
            return Ok(false);
        }
        let Some((key, value)) = self.iter.deref() else {
            return Ok(false);
        };

        match self.layout.selection {
            IndexSelection::Primary => {
                row::decode_primary(&self.table, key, value, out)?;
                Ok(true)
            }
            IndexSelection::Secondary(_) => {
                let pk = row::decode_index_pk(
                    &self.table,
                    &self.layout.columns,
                    &self.layout.types,
                    key,
                )?;
                if let Some(found) = self.lookup.point_get(&self.table, &pk)? {
                    *out = found;
                    return Ok(true);
                }

                out.clear();
                let index = self.layout.name(&self.table);
                match self.index_miss_policy {
                    IndexMissPolicy::Skip => {
                        warn!(table = self.table.name(), index, %pk, "index entry has no row");
                        Ok(false)
                    }
                    IndexMissPolicy::Error => Err(ScanError::DanglingIndexEntry {
                        table: self.table.name().to_string(),
                        index: index.to_string(),
                        pk: pk.to_string(),
                    }),
                }
            }
        }
    }

    #[must_use]
    pub fn table(&self) -> &TableDef {
        &self.table
    }

    /// The key space being scanned.
    #[must_use]
    pub const fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    /// Iterate over the remaining rows, skipping missed index entries.
    #[must_use]
    pub const fn rows(self) -> Rows<'a, S> {
        Rows {
            scanner: self,
            advance: false,
            done: false,
        }
    }
}

/// Iterator over the rows of a scan. Stops after the first error.
pub struct Rows<'a, S: NodeStore + ?Sized> {
    scanner: Scanner<'a, S>,
    advance: bool,
    done: bool,
}

impl<S: NodeStore + ?Sized> Iterator for Rows<'_, S> {
    type Item = Result<Record, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if self.advance {
                if let Err(e) = self.scanner.next() {
                    self.done = true;
                    return Some(Err(e));
                }
            }
            self.advance = true;

            if !self.scanner.valid() {
                self.done = true;
                return None;
            }
            let mut record = Record::new();
            match self.scanner.deref(&mut record) {
                Ok(true) => return Some(Ok(record)),
                Ok(false) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl<S: NodeStore + ?Sized> FusedIterator for Rows<'_, S> {}

/// Errors raised by scans and row lookups.
#[derive(Debug)]
pub enum ScanError {
    /// No table with this name.
    TableNotFound(String),
    /// No key space leads with the requested columns.
    UnindexedQuery { table: String, columns: Vec<String> },
    /// The requested secondary index does not exist.
    IndexNotFound { table: String, index: String },
    /// Start and end operators point the same way.
    BadRange { start: CmpOp, end: CmpOp },
    /// A bound value has the wrong type for its column.
    TypeMismatch {
        column: String,
        expected: ValueType,
        actual: ValueType,
    },
    /// A primary key column is absent from a lookup.
    MissingColumn { table: String, column: String },
    /// A secondary index entry points at a missing row.
    DanglingIndexEntry {
        table: String,
        index: String,
        pk: String,
    },
    /// Malformed key or value bytes.
    Codec(CodecError),
    /// The node store failed.
    Store(StoreError),
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TableNotFound(name) => write!(f, "table not found: {name}"),
            Self::UnindexedQuery { table, columns } => {
                write!(f, "no index on {table} covers columns {columns:?}")
            }
            Self::IndexNotFound { table, index } => {
                write!(f, "index {index} not found on table {table}")
            }
            Self::BadRange { start, end } => {
                write!(f, "bad range: {start} and {end} scan in the same direction")
            }
            Self::TypeMismatch {
                column,
                expected,
                actual,
            } => write!(f, "column {column} expects {expected}, got {actual}"),
            Self::MissingColumn { table, column } => {
                write!(f, "missing key column {column} for table {table}")
            }
            Self::DanglingIndexEntry { table, index, pk } => {
                write!(f, "index {index} on {table} points at missing row {pk}")
            }
            Self::Codec(e) => write!(f, "codec error: {e}"),
            Self::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for ScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Codec(e) => Some(e),
            Self::Store(e) => Some(e),
            Self::TableNotFound(_)
            | Self::UnindexedQuery { .. }
            | Self::IndexNotFound { .. }
            | Self::BadRange { .. }
            | Self::TypeMismatch { .. }
            | Self::MissingColumn { .. }
            | Self::DanglingIndexEntry { .. } => None,
        }
    }
}

impl From<CodecError> for ScanError {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

impl From<StoreError> for ScanError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::storage::{MemoryStore, build_tree};
    use crate::testing::{init_tracing, sample_rows, sample_table};
    use crate::types::Value;

    /// Rows keyed by the value of `a`.
    struct FixedRows(HashMap<i64, Record>);

    impl RowLookup for FixedRows {
        fn point_get(&self, _table: &TableDef, pk: &Record) -> Result<Option<Record>, ScanError> {
            Ok(pk
                .get("a")
                .and_then(Value::as_int64)
                .and_then(|a| self.0.get(&a).cloned()))
        }
    }

    /// A tree holding only the `by_b` entries of the sample rows.
    fn index_only_store() -> (MemoryStore, PageId) {
        let table = sample_table();
        let mut entries: Vec<(Vec<u8>, Vec<u8>)> = sample_rows()
            .iter()
            .map(|(_, record)| {
                let values = row::project(&table, record).expect("projects");
                (row::index_key(&table, &table.indexes()[0], &values), Vec::new())
            })
            .collect();
        entries.sort();

        let mut store = MemoryStore::new();
        let root = build_tree(&mut store, entries, 2).expect("build");
        (store, root)
    }

    fn catalog() -> HashMap<String, Arc<TableDef>> {
        HashMap::from([("T".to_string(), Arc::new(sample_table()))])
    }

    fn full_index_scan() -> ScanRequest {
        ScanRequest::new(CmpOp::Ge, Record::new(), CmpOp::Le, Record::new()).using_index("by_b")
    }

    fn a_values(rows: &[Record]) -> Vec<i64> {
        rows.iter()
            .filter_map(|r| r.get("a").and_then(Value::as_int64))
            .collect()
    }

    #[test]
    fn test_setup_errors_build_no_cursor() {
        init_tracing();
        let (store, root) = index_only_store();
        let catalog = catalog();
        let lookup = FixedRows(HashMap::new());
        let ctx = ScanContext {
            catalog: &catalog,
            store: &store,
            root,
            lookup: &lookup,
            index_miss_policy: IndexMissPolicy::Skip,
        };

        let same_direction = ScanRequest::new(
            CmpOp::Ge,
            Record::new().add_int64("a", 1),
            CmpOp::Ge,
            Record::new().add_int64("a", 2),
        );
        assert!(matches!(
            scan(&ctx, "T", same_direction),
            Err(ScanError::BadRange {
                start: CmpOp::Ge,
                end: CmpOp::Ge
            })
        ));

        assert!(matches!(
            scan(&ctx, "missing", full_index_scan()),
            Err(ScanError::TableNotFound(name)) if name == "missing"
        ));

        let unknown_index = ScanRequest::new(CmpOp::Ge, Record::new(), CmpOp::Le, Record::new())
            .using_index("nope");
        assert!(matches!(
            scan(&ctx, "T", unknown_index),
            Err(ScanError::IndexNotFound { .. })
        ));
    }

    #[test]
    fn test_dangling_entries_are_skipped() {
        init_tracing();
        let (store, root) = index_only_store();
        let catalog = catalog();
        // Only the even rows still exist
        let lookup = FixedRows(
            sample_rows()
                .into_iter()
                .map(|(_, r)| r)
                .filter_map(|r| {
                    let a = r.get("a").and_then(Value::as_int64)?;
                    (a % 2 == 0).then_some((a, r))
                })
                .collect(),
        );
        let ctx = ScanContext {
            catalog: &catalog,
            store: &store,
            root,
            lookup: &lookup,
            index_miss_policy: IndexMissPolicy::Skip,
        };

        let scanner = scan(&ctx, "T", full_index_scan()).expect("scan");
        let mut out = Record::new().add_int64("stale", 1);
        // by_b order starts with a=3, which is gone
        assert!(scanner.valid());
        assert!(!scanner.deref(&mut out).expect("deref"));
        assert!(out.is_empty());

        let rows = scanner
            .rows()
            .collect::<Result<Vec<_>, _>>()
            .expect("rows");
        assert_eq!(a_values(&rows), vec![2, 4]);
    }

    #[test]
    fn test_dangling_entries_fail_under_error_policy() {
        init_tracing();
        let (store, root) = index_only_store();
        let catalog = catalog();
        let lookup = FixedRows(HashMap::new());
        let ctx = ScanContext {
            catalog: &catalog,
            store: &store,
            root,
            lookup: &lookup,
            index_miss_policy: IndexMissPolicy::Error,
        };

        let mut rows = scan(&ctx, "T", full_index_scan()).expect("scan").rows();
        match rows.next() {
            Some(Err(ScanError::DanglingIndexEntry { table, index, pk })) => {
                assert_eq!(table, "T");
                assert_eq!(index, "by_b");
                assert_eq!(pk, "{a: 3}");
            }
            other => panic!("expected dangling entry error, got {other:?}"),
        }
        assert!(rows.next().is_none());
    }

    #[test]
    fn test_invalid_scanner_is_inert() {
        init_tracing();
        let (store, root) = index_only_store();
        let catalog = catalog();
        let lookup = FixedRows(HashMap::new());
        let ctx = ScanContext {
            catalog: &catalog,
            store: &store,
            root,
            lookup: &lookup,
            index_miss_policy: IndexMissPolicy::Error,
        };

        // b > 5 matches nothing
        let request = ScanRequest::new(
            CmpOp::Gt,
            Record::new().add_int64("b", 5),
            CmpOp::Le,
            Record::new(),
        );
        let mut scanner = scan(&ctx, "T", request).expect("scan");
        assert_eq!(scanner.layout().selection, IndexSelection::Secondary(0));
        assert!(!scanner.valid());

        let mut out = Record::new().add_int64("kept", 1);
        assert!(!scanner.deref(&mut out).expect("deref"));
        assert_eq!(out, Record::new().add_int64("kept", 1));

        scanner.next().expect("step");
        assert!(!scanner.valid());
        assert_eq!(scanner.table().name(), "T");
    }
}
