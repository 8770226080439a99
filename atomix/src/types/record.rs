//! Row projections.
//!
//! A `Record` pairs column names with values positionally. It is used both
//! for scan bounds (a possibly partial tuple of key columns) and for fully
//! materialized rows.

use crate::types::value::Value;

/// An ordered list of `(column, value)` pairs.
///
/// # Invariants
///
/// - `cols.len() == vals.len()`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub cols: Vec<String>,
    pub vals: Vec<Value>,
}

impl Record {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cols: Vec::new(),
            vals: Vec::new(),
        }
    }

    /// Append a column, builder style.
    #[must_use]
    pub fn add(mut self, col: impl Into<String>, val: Value) -> Self {
        self.push(col, val);
        self
    }

    /// Append an `Int64` column, builder style.
    #[must_use]
    pub fn add_int64(self, col: impl Into<String>, val: i64) -> Self {
        self.add(col, Value::Int64(val))
    }

    /// Append a `Bytes` column, builder style.
    #[must_use]
    pub fn add_bytes(self, col: impl Into<String>, val: impl Into<Vec<u8>>) -> Self {
        self.add(col, Value::Bytes(val.into()))
    }

    /// Append a text column, stored as `Bytes`.
    #[must_use]
    pub fn add_str(self, col: impl Into<String>, val: &str) -> Self {
        self.add_bytes(col, val.as_bytes())
    }

    /// Append a column in place.
    pub fn push(&mut self, col: impl Into<String>, val: Value) {
        self.cols.push(col.into());
        self.vals.push(val);
    }

    /// Look up a value by column name.
    #[must_use]
    pub fn get(&self, col: &str) -> Option<&Value> {
        self.cols
            .iter()
            .position(|c| c == col)
            .map(|i| &self.vals[i])
    }

    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Vec::len() is not const-stable
    pub fn len(&self) -> usize {
        self.cols.len()
    }

    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn is_empty(&self) -> bool {
        self.cols.is_empty()
    }

    /// Remove all columns, keeping the allocations.
    pub fn clear(&mut self) {
        self.cols.clear();
        self.vals.clear();
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (col, val)) in self.cols.iter().zip(&self.vals).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{col}: {val}")?;
        }
        write!(f, "}}")
    }
}
