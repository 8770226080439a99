//! High-level database interface.
//!
//! A `Database` pins one tree root holding the catalog, every table's primary
//! entries and every secondary index. It is built once from table
//! definitions and rows, then serves scans and point lookups.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::catalog::{self, Catalog, CatalogError};
use crate::codec;
use crate::config::EngineConfig;
use crate::query::row::{self, RowError};
use crate::query::{RowLookup, ScanContext, ScanError, ScanRequest, Scanner, scan};
use crate::storage::{
    BIter, BuildError, NodeSink, NodeStore, PageFile, PageId, StoreError, build_tree,
};
use crate::types::{CmpOp, Record, TableDef};

/// A read-only database over a node store.
pub struct Database<S: NodeStore> {
    store: S,
    root: PageId,
    tables: HashMap<String, Arc<TableDef>>,
    config: EngineConfig,
}

impl<S: NodeStore + NodeSink> Database<S> {
    /// Bulk load `tables` and `rows` into `store` and commit the new root.
    ///
    /// Each row names its table. Table names must be unique, key-space
    /// prefixes must not overlap, and primary keys must be unique per table.
    pub fn build<I, T>(
        mut store: S,
        config: EngineConfig,
        tables: Vec<TableDef>,
        rows: I,
    ) -> Result<Self, DatabaseError>
    where
        I: IntoIterator<Item = (T, Record)>,
        T: AsRef<str>,
    {
        let tables = Self::check_tables(tables)?;

        let mut entries = BTreeMap::new();
        for table in tables.values() {
            let (key, value) = catalog::encode_table_def(table);
            entries.insert(key, value);
        }

        let mut row_count = 0usize;
        for (name, record) in rows {
            let name = name.as_ref();
            let table = tables
                .get(name)
                .ok_or_else(|| DatabaseError::UnknownTable(name.to_string()))?;
            let values = row::project(table, &record).map_err(|source| DatabaseError::Row {
                table: name.to_string(),
                source,
            })?;

            let (key, value) = row::primary_entry(table, &values);
            if entries.insert(key, value).is_some() {
                return Err(DatabaseError::DuplicateKey {
                    table: name.to_string(),
                    row: record.to_string(),
                });
            }
            for index in table.indexes() {
                entries.insert(row::index_key(table, index, &values), Vec::new());
            }
            row_count += 1;
        }

        let root = build_tree(&mut store, entries, config.max_node_keys)?;
        store.commit_root(root)?;
        info!(tables = tables.len(), rows = row_count, root, "database built");

        Ok(Self {
            store,
            root,
            tables,
            config,
        })
    }

    fn check_tables(
        tables: Vec<TableDef>,
    ) -> Result<HashMap<String, Arc<TableDef>>, DatabaseError> {
        let mut by_name: HashMap<String, Arc<TableDef>> = HashMap::new();
        for table in tables {
            if let Some(other) = by_name
                .values()
                .find(|o| table.prefix() <= o.last_prefix() && o.prefix() <= table.last_prefix())
            {
                return Err(DatabaseError::PrefixConflict {
                    table: table.name().to_string(),
                    other: other.name().to_string(),
                });
            }
            let name = table.name().to_string();
            if by_name.insert(name.clone(), Arc::new(table)).is_some() {
                return Err(DatabaseError::DuplicateTable(name));
            }
        }
        Ok(by_name)
    }
}

impl Database<PageFile> {
    /// Create a database file at `path` holding `tables` and `rows`.
    pub fn create<I, T>(
        path: &Path,
        config: EngineConfig,
        tables: Vec<TableDef>,
        rows: I,
    ) -> Result<Self, DatabaseError>
    where
        I: IntoIterator<Item = (T, Record)>,
        T: AsRef<str>,
    {
        let mut file = PageFile::create(path)?;
        file.set_verify_checksums(config.verify_checksums);
        Self::build(file, config, tables, rows)
    }

    /// Open an existing database file and load its catalog.
    pub fn open(path: &Path, config: EngineConfig) -> Result<Self, DatabaseError> {
        let mut file = PageFile::open(path)?;
        file.set_verify_checksums(config.verify_checksums);
        let root = file.root();
        let tables = catalog::load_catalog(&file, root)?;
        info!(tables = tables.len(), root, "database opened");

        Ok(Self {
            store: file,
            root,
            tables,
            config,
        })
    }
}

impl<S: NodeStore> Database<S> {
    /// Start a range scan over `table`.
    pub fn scan(&self, table: &str, request: ScanRequest) -> Result<Scanner<'_, S>, ScanError> {
        let ctx = ScanContext {
            catalog: self,
            store: &self.store,
            root: self.root,
            lookup: self,
            index_miss_policy: self.config.index_miss_policy,
        };
        scan(&ctx, table, request)
    }

    /// Fetch one row of `table` by primary key.
    pub fn get(&self, table: &str, pk: &Record) -> Result<Option<Record>, ScanError> {
        let table = self
            .get_table_def(table)
            .ok_or_else(|| ScanError::TableNotFound(table.to_string()))?;
        self.point_get(&table, pk)
    }

    #[must_use]
    pub const fn root(&self) -> PageId {
        self.root
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Names of all tables, sorted.
    #[must_use]
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<S: NodeStore> Catalog for Database<S> {
    fn get_table_def(&self, name: &str) -> Option<Arc<TableDef>> {
        self.tables.get_table_def(name)
    }
}

impl<S: NodeStore> RowLookup for Database<S> {
    fn point_get(&self, table: &TableDef, pk: &Record) -> Result<Option<Record>, ScanError> {
        let mut values = Vec::with_capacity(table.pkeys());
        for column in table.primary_key() {
            let value = pk.get(&column.name).ok_or_else(|| ScanError::MissingColumn {
                table: table.name().to_string(),
                column: column.name.clone(),
            })?;
            if value.value_type() != column.value_type {
                return Err(ScanError::TypeMismatch {
                    column: column.name.clone(),
                    expected: column.value_type,
                    actual: value.value_type(),
                });
            }
            values.push(value.clone());
        }

        let key = codec::encode_key(table.prefix(), &values);
        let iter = BIter::seek(&self.store, self.root, &key, CmpOp::Ge)?;
        match iter.deref() {
            Some((found, value)) if found == key.as_slice() => {
                let mut record = Record::new();
                row::decode_primary(table, found, value, &mut record)?;
                Ok(Some(record))
            }
            _ => Ok(None),
        }
    }
}

impl<S: NodeStore> std::fmt::Debug for Database<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("root", &self.root)
            .field("tables", &self.table_names())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Errors that can occur while building or opening a database.
#[derive(Debug)]
pub enum DatabaseError {
    /// Two tables share a name.
    DuplicateTable(String),
    /// Two tables' key spaces overlap.
    PrefixConflict { table: String, other: String },
    /// A row names a table that was not defined.
    UnknownTable(String),
    /// A row does not match its table.
    Row { table: String, source: RowError },
    /// Two rows share a primary key.
    DuplicateKey { table: String, row: String },
    /// Bulk loading failed.
    Build(BuildError),
    /// The persisted catalog could not be read.
    Catalog(CatalogError),
    /// The node store failed.
    Store(StoreError),
}

impl std::fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateTable(name) => write!(f, "duplicate table: {name}"),
            Self::PrefixConflict { table, other } => {
                write!(f, "key space of {table} overlaps {other}")
            }
            Self::UnknownTable(name) => write!(f, "unknown table: {name}"),
            Self::Row { table, source } => write!(f, "invalid row for {table}: {source}"),
            Self::DuplicateKey { table, row } => {
                write!(f, "duplicate primary key in {table}: {row}")
            }
            Self::Build(e) => write!(f, "build error: {e}"),
            Self::Catalog(e) => write!(f, "catalog error: {e}"),
            Self::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for DatabaseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Row { source, .. } => Some(source),
            Self::Build(e) => Some(e),
            Self::Catalog(e) => Some(e),
            Self::Store(e) => Some(e),
            Self::DuplicateTable(_)
            | Self::PrefixConflict { .. }
            | Self::UnknownTable(_)
            | Self::DuplicateKey { .. } => None,
        }
    }
}

impl From<BuildError> for DatabaseError {
    fn from(e: BuildError) -> Self {
        Self::Build(e)
    }
}

impl From<CatalogError> for DatabaseError {
    fn from(e: CatalogError) -> Self {
        Self::Catalog(e)
    }
}

impl From<StoreError> for DatabaseError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}
