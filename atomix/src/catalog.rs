//! Table definitions and their persisted form.
//!
//! Table definitions live in the same tree as the data, under the reserved
//! prefix [`CATALOG_PREFIX`], keyed by table name. The value is a flat
//! sequence of codec values:
//!
//! ```text
//! prefix, pkeys, column count, (name, type tag)*, index count,
//! (index name, column count, column*)*
//! ```
//!
//! Index prefixes are not stored; they follow from the table prefix.

use std::collections::HashMap;
use std::sync::Arc;

use crate::codec::{self, CodecError};
use crate::storage::{BIter, NodeStore, PageId, StoreError};
use crate::types::{CmpOp, TableDef, TableDefError, Value, ValueType};

/// Key-space prefix of catalog entries.
pub const CATALOG_PREFIX: u32 = 1;

/// Resolves table names to definitions.
pub trait Catalog {
    fn get_table_def(&self, name: &str) -> Option<Arc<TableDef>>;
}

impl Catalog for HashMap<String, Arc<TableDef>> {
    fn get_table_def(&self, name: &str) -> Option<Arc<TableDef>> {
        self.get(name).cloned()
    }
}

/// The catalog entry describing `table`.
#[must_use]
pub fn encode_table_def(table: &TableDef) -> (Vec<u8>, Vec<u8>) {
    let key = codec::encode_key(CATALOG_PREFIX, &[Value::from(table.name())]);

    let mut values = vec![
        Value::Int64(i64::from(table.prefix())),
        count(table.pkeys()),
        count(table.columns().len()),
    ];
    for column in table.columns() {
        values.push(Value::from(column.name.as_str()));
        values.push(Value::Int64(i64::from(column.value_type as u8)));
    }
    values.push(count(table.indexes().len()));
    for index in table.indexes() {
        values.push(Value::from(index.name.as_str()));
        values.push(count(index.columns.len()));
        values.extend(index.columns.iter().map(|c| Value::from(c.as_str())));
    }

    let mut value = Vec::new();
    codec::encode_values(&values, &mut value);
    (key, value)
}

#[allow(clippy::cast_possible_wrap)] // counts are bounded by page-sized schemas
const fn count(n: usize) -> Value {
    Value::Int64(n as i64)
}

/// Sequential reader over an encoded catalog value.
struct Reader<'a> {
    bytes: &'a [u8],
}

impl Reader<'_> {
    fn value(&mut self, ty: ValueType) -> Result<Value, CatalogError> {
        let (value, used) = codec::decode_value(self.bytes, ty)?;
        self.bytes = &self.bytes[used..];
        Ok(value)
    }

    fn int(&mut self) -> Result<i64, CatalogError> {
        match self.value(ValueType::Int64)? {
            Value::Int64(v) => Ok(v),
            Value::Bytes(_) => Err(CatalogError::Malformed("expected integer")),
        }
    }

    fn count(&mut self) -> Result<usize, CatalogError> {
        usize::try_from(self.int()?).map_err(|_| CatalogError::Malformed("negative count"))
    }

    fn string(&mut self) -> Result<String, CatalogError> {
        match self.value(ValueType::Bytes)? {
            Value::Bytes(b) => {
                String::from_utf8(b).map_err(|_| CatalogError::Malformed("name is not UTF-8"))
            }
            Value::Int64(_) => Err(CatalogError::Malformed("expected name")),
        }
    }
}

/// Rebuild a table definition from its catalog entry.
pub fn decode_table_def(key: &[u8], value: &[u8]) -> Result<TableDef, CatalogError> {
    let (prefix, body) = codec::split_prefix(key)?;
    if prefix != CATALOG_PREFIX {
        return Err(CatalogError::Malformed("not a catalog key"));
    }
    let name = Reader { bytes: body }.string()?;

    let mut reader = Reader { bytes: value };
    let table_prefix = u32::try_from(reader.int()?)
        .map_err(|_| CatalogError::Malformed("prefix out of range"))?;
    let pkeys = reader.count()?;

    let mut builder = TableDef::builder(name)
        .prefix(table_prefix)
        .primary_key(pkeys);
    for _ in 0..reader.count()? {
        let column = reader.string()?;
        let tag = u8::try_from(reader.int()?)
            .ok()
            .and_then(|t| ValueType::try_from(t).ok())
            .ok_or(CatalogError::Malformed("unknown column type"))?;
        builder = builder.column(column, tag);
    }
    for _ in 0..reader.count()? {
        let index = reader.string()?;
        let columns = (0..reader.count()?)
            .map(|_| reader.string())
            .collect::<Result<Vec<_>, _>>()?;
        let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
        builder = builder.index(index, &columns);
    }

    if !reader.bytes.is_empty() {
        return Err(CatalogError::Codec(CodecError::TrailingBytes(
            reader.bytes.len(),
        )));
    }
    Ok(builder.build()?)
}

/// Read every table definition stored in the tree under `root`.
pub fn load_catalog<S: NodeStore + ?Sized>(
    store: &S,
    root: PageId,
) -> Result<HashMap<String, Arc<TableDef>>, CatalogError> {
    let start = CATALOG_PREFIX.to_be_bytes();
    let mut iter = BIter::seek(store, root, &start, CmpOp::Ge)?;

    let mut tables = HashMap::new();
    while let Some((key, value)) = iter.deref() {
        if !key.starts_with(&start) {
            break;
        }
        let table = decode_table_def(key, value)?;
        tables.insert(table.name().to_string(), Arc::new(table));
        iter.next()?;
    }
    Ok(tables)
}

/// Errors raised when reading the persisted catalog.
#[derive(Debug)]
pub enum CatalogError {
    /// An entry does not have the expected shape.
    Malformed(&'static str),
    /// Malformed codec bytes.
    Codec(CodecError),
    /// The stored definition is invalid.
    TableDef(TableDefError),
    /// The node store failed.
    Store(StoreError),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(what) => write!(f, "malformed catalog entry: {what}"),
            Self::Codec(e) => write!(f, "codec error: {e}"),
            Self::TableDef(e) => write!(f, "invalid table definition: {e}"),
            Self::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Malformed(_) => None,
            Self::Codec(e) => Some(e),
            Self::TableDef(e) => Some(e),
            Self::Store(e) => Some(e),
        }
    }
}

impl From<CodecError> for CatalogError {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

impl From<TableDefError> for CatalogError {
    fn from(e: TableDefError) -> Self {
        Self::TableDef(e)
    }
}

impl From<StoreError> for CatalogError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}
