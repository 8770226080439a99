//! Mapping rows to and from tree entries.
//!
//! A row is stored once under its primary key:
//!
//! ```text
//! key:   [table prefix][pk column 0][pk column 1]...
//! value: [non-key column 0][non-key column 1]...
//! ```
//!
//! and once per secondary index with an empty value:
//!
//! ```text
//! key:   [index prefix][index column 0][index column 1]...
//! ```
//!
//! Index columns always include the primary key, so every index key is
//! unique and carries what is needed to find the row.

use crate::codec::{self, CodecError};
use crate::types::{IndexDef, Record, TableDef, Value, ValueType};

/// Arrange a record's values in table column order, checking names and types.
pub fn project(table: &TableDef, record: &Record) -> Result<Vec<Value>, RowError> {
    if let Some(unknown) = record
        .cols
        .iter()
        .find(|c| table.column_index(c).is_none())
    {
        return Err(RowError::UnknownColumn(unknown.clone()));
    }

    table
        .columns()
        .iter()
        .map(|column| {
            let value = record
                .get(&column.name)
                .ok_or_else(|| RowError::MissingColumn(column.name.clone()))?;
            if value.value_type() != column.value_type {
                return Err(RowError::TypeMismatch {
                    column: column.name.clone(),
                    expected: column.value_type,
                    actual: value.value_type(),
                });
            }
            Ok(value.clone())
        })
        .collect()
}

/// The primary entry of a row given its values in table column order.
#[must_use]
pub fn primary_entry(table: &TableDef, values: &[Value]) -> (Vec<u8>, Vec<u8>) {
    let (keys, rest) = values.split_at(table.pkeys());
    let key = codec::encode_key(table.prefix(), keys);
    let mut value = Vec::new();
    codec::encode_values(rest, &mut value);
    (key, value)
}

/// The key of a row's entry in one secondary index.
#[must_use]
pub fn index_key(table: &TableDef, index: &IndexDef, values: &[Value]) -> Vec<u8> {
    let indexed: Vec<Value> = index
        .columns
        .iter()
        .filter_map(|c| table.column_index(c))
        .map(|i| values[i].clone())
        .collect();
    codec::encode_key(index.prefix, &indexed)
}

/// Decode a primary entry into `out` with columns in table order.
pub fn decode_primary(
    table: &TableDef,
    key: &[u8],
    value: &[u8],
    out: &mut Record,
) -> Result<(), CodecError> {
    let (_, body) = codec::split_prefix(key)?;
    let (pk, rest) = table.columns().split_at(table.pkeys());

    let pk_types: Vec<ValueType> = pk.iter().map(|c| c.value_type).collect();
    let rest_types: Vec<ValueType> = rest.iter().map(|c| c.value_type).collect();
    let pk_values = codec::decode_exact(body, &pk_types)?;
    let rest_values = codec::decode_exact(value, &rest_types)?;

    out.clear();
    for (column, value) in table.columns().iter().zip(pk_values.into_iter().chain(rest_values)) {
        out.push(column.name.clone(), value);
    }
    Ok(())
}

/// Decode the primary key carried by a secondary index key.
pub fn decode_index_pk(
    table: &TableDef,
    columns: &[String],
    types: &[ValueType],
    key: &[u8],
) -> Result<Record, CodecError> {
    let (_, body) = codec::split_prefix(key)?;
    let values = codec::decode_exact(body, types)?;

    let mut pk = Record::new();
    for column in table.primary_key() {
        if let Some(i) = columns.iter().position(|c| *c == column.name) {
            pk.push(column.name.clone(), values[i].clone());
        }
    }
    Ok(pk)
}

/// Errors raised when a record does not fit its table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    /// A table column has no value.
    MissingColumn(String),
    /// The record names a column the table does not have.
    UnknownColumn(String),
    /// A value has the wrong type for its column.
    TypeMismatch {
        column: String,
        expected: ValueType,
        actual: ValueType,
    },
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingColumn(c) => write!(f, "missing column: {c}"),
            Self::UnknownColumn(c) => write!(f, "unknown column: {c}"),
            Self::TypeMismatch {
                column,
                expected,
                actual,
            } => write!(f, "column {column} expects {expected}, got {actual}"),
        }
    }
}

impl std::error::Error for RowError {}
