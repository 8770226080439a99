//! Table schema definitions.
//!
//! A `TableDef` describes a table's columns, its primary key and its
//! secondary indexes, along with the key-space prefixes under which their
//! entries live in the shared B-tree.
//!
//! # Key spaces
//!
//! - Primary key entries: `prefix ++ pk columns` -> non-key columns
//! - Index `i` entries: `prefix + 1 + i ++ index columns` -> empty
//!
//! # Invariants
//!
//! - `1 <= pkeys <= columns.len()`
//! - Column names are unique and non-empty
//! - Every index column resolves against the table's columns
//! - Every index contains all primary-key columns (appended when missing)

use crate::types::value::ValueType;

/// Prefixes below this value are reserved for internal key spaces.
pub const FIRST_USER_PREFIX: u32 = 100;

/// A table column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub value_type: ValueType,
}

/// A secondary index definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    /// Index name, unique within the table.
    pub name: String,
    /// Indexed columns in key order, primary-key columns included.
    pub columns: Vec<String>,
    /// Key-space prefix of the index entries.
    pub prefix: u32,
}

/// An immutable table definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    name: String,
    columns: Vec<Column>,
    pkeys: usize,
    prefix: u32,
    indexes: Vec<IndexDef>,
}

impl TableDef {
    /// Start building a table definition.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> TableDefBuilder {
        TableDefBuilder::new(name)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All columns, primary-key columns first.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Number of leading columns forming the primary key.
    #[must_use]
    pub const fn pkeys(&self) -> usize {
        self.pkeys
    }

    #[must_use]
    pub fn primary_key(&self) -> &[Column] {
        &self.columns[..self.pkeys]
    }

    /// Key-space prefix of the primary key entries.
    #[must_use]
    pub const fn prefix(&self) -> u32 {
        self.prefix
    }

    #[must_use]
    pub fn indexes(&self) -> &[IndexDef] {
        &self.indexes
    }

    /// Last prefix used by this table (the primary prefix if it has no indexes).
    #[must_use]
    pub fn last_prefix(&self) -> u32 {
        self.indexes.last().map_or(self.prefix, |i| i.prefix)
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Declared type of a column by name.
    #[must_use]
    pub fn column_type(&self, name: &str) -> Option<ValueType> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value_type)
    }

    /// Find a secondary index by name.
    #[must_use]
    pub fn index_position(&self, name: &str) -> Option<usize> {
        self.indexes.iter().position(|i| i.name == name)
    }
}

/// Builder for `TableDef`.
#[derive(Debug)]
pub struct TableDefBuilder {
    name: String,
    columns: Vec<Column>,
    pkeys: usize,
    prefix: u32,
    indexes: Vec<(String, Vec<String>)>,
}

impl TableDefBuilder {
    /// Create a builder. The primary key defaults to the first column and
    /// the prefix to `FIRST_USER_PREFIX`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            pkeys: 1,
            prefix: FIRST_USER_PREFIX,
            indexes: Vec::new(),
        }
    }

    #[must_use]
    pub fn column(mut self, name: impl Into<String>, value_type: ValueType) -> Self {
        self.columns.push(Column {
            name: name.into(),
            value_type,
        });
        self
    }

    /// Set the number of leading columns forming the primary key.
    #[must_use]
    pub const fn primary_key(mut self, pkeys: usize) -> Self {
        self.pkeys = pkeys;
        self
    }

    /// Set the primary key-space prefix. Index `i` gets `prefix + 1 + i`.
    #[must_use]
    pub const fn prefix(mut self, prefix: u32) -> Self {
        self.prefix = prefix;
        self
    }

    /// Add a secondary index over the given columns.
    #[must_use]
    pub fn index(mut self, name: impl Into<String>, columns: &[&str]) -> Self {
        self.indexes.push((
            name.into(),
            columns.iter().map(|c| (*c).to_string()).collect(),
        ));
        self
    }

    /// Validate and build the table definition.
    pub fn build(self) -> Result<TableDef, TableDefError> {
        if self.name.is_empty() {
            return Err(TableDefError::EmptyName);
        }
        if self.columns.is_empty() {
            return Err(TableDefError::NoColumns);
        }
        if self.pkeys == 0 || self.pkeys > self.columns.len() {
            return Err(TableDefError::InvalidPrimaryKey {
                pkeys: self.pkeys,
                columns: self.columns.len(),
            });
        }
        if self.prefix < FIRST_USER_PREFIX {
            return Err(TableDefError::ReservedPrefix(self.prefix));
        }

        for (i, col) in self.columns.iter().enumerate() {
            if col.name.is_empty() {
                return Err(TableDefError::EmptyName);
            }
            if self.columns[..i].iter().any(|c| c.name == col.name) {
                return Err(TableDefError::DuplicateColumn(col.name.clone()));
            }
        }

        let mut indexes = Vec::with_capacity(self.indexes.len());
        for (i, (name, mut columns)) in self.indexes.into_iter().enumerate() {
            if name.is_empty() {
                return Err(TableDefError::EmptyName);
            }
            if indexes.iter().any(|idx: &IndexDef| idx.name == name) {
                return Err(TableDefError::DuplicateIndex(name));
            }
            if columns.is_empty() {
                return Err(TableDefError::EmptyIndex(name));
            }
            for (j, col) in columns.iter().enumerate() {
                if !self.columns.iter().any(|c| &c.name == col) {
                    return Err(TableDefError::UnknownColumn {
                        index: name,
                        column: col.clone(),
                    });
                }
                if columns[..j].contains(col) {
                    return Err(TableDefError::DuplicateColumn(col.clone()));
                }
            }
            // Index entries carry the full primary key so each is unique
            // and resolvable back to its row.
            for pk in &self.columns[..self.pkeys] {
                if !columns.contains(&pk.name) {
                    columns.push(pk.name.clone());
                }
            }

            let offset = u32::try_from(i + 1).map_err(|_| TableDefError::PrefixOverflow)?;
            let prefix = self
                .prefix
                .checked_add(offset)
                .ok_or(TableDefError::PrefixOverflow)?;
            indexes.push(IndexDef {
                name,
                columns,
                prefix,
            });
        }

        Ok(TableDef {
            name: self.name,
            columns: self.columns,
            pkeys: self.pkeys,
            prefix: self.prefix,
            indexes,
        })
    }
}

/// Errors raised when building a table definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableDefError {
    /// A table, column or index name is empty.
    EmptyName,
    /// The table has no columns.
    NoColumns,
    /// The primary key column count is out of range.
    InvalidPrimaryKey { pkeys: usize, columns: usize },
    /// Two columns share a name, or an index lists a column twice.
    DuplicateColumn(String),
    /// Two indexes share a name.
    DuplicateIndex(String),
    /// An index has no columns.
    EmptyIndex(String),
    /// An index refers to a column the table does not have.
    UnknownColumn { index: String, column: String },
    /// The prefix falls in the reserved range.
    ReservedPrefix(u32),
    /// The index prefixes do not fit in a `u32`.
    PrefixOverflow,
}

impl std::fmt::Display for TableDefError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "names must not be empty"),
            Self::NoColumns => write!(f, "table has no columns"),
            Self::InvalidPrimaryKey { pkeys, columns } => {
                write!(
                    f,
                    "invalid primary key: {pkeys} key columns for {columns} columns"
                )
            }
            Self::DuplicateColumn(name) => write!(f, "duplicate column: {name}"),
            Self::DuplicateIndex(name) => write!(f, "duplicate index: {name}"),
            Self::EmptyIndex(name) => write!(f, "index has no columns: {name}"),
            Self::UnknownColumn { index, column } => {
                write!(f, "index {index} refers to unknown column {column}")
            }
            Self::ReservedPrefix(p) => {
                write!(f, "prefix {p} is reserved (must be >= {FIRST_USER_PREFIX})")
            }
            Self::PrefixOverflow => write!(f, "index prefixes overflow u32"),
        }
    }
}

impl std::error::Error for TableDefError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> TableDefBuilder {
        TableDef::builder("people")
            .column("id", ValueType::Int64)
            .column("name", ValueType::Bytes)
            .column("age", ValueType::Int64)
    }

    #[test]
    fn test_build_basic_table() {
        let tdef = people()
            .index("by_name", &["name"])
            .index("by_age_name", &["age", "name"])
            .prefix(200)
            .build()
            .expect("build");

        assert_eq!(tdef.name(), "people");
        assert_eq!(tdef.pkeys(), 1);
        assert_eq!(tdef.primary_key().len(), 1);
        assert_eq!(tdef.prefix(), 200);
        assert_eq!(tdef.indexes()[0].prefix, 201);
        assert_eq!(tdef.indexes()[1].prefix, 202);
        assert_eq!(tdef.last_prefix(), 202);
        assert_eq!(tdef.column_index("age"), Some(2));
        assert_eq!(tdef.column_type("name"), Some(ValueType::Bytes));
        assert_eq!(tdef.column_type("nope"), None);
        assert_eq!(tdef.index_position("by_age_name"), Some(1));
    }

    #[test]
    fn test_index_gets_primary_key_appended() {
        let tdef = people()
            .index("by_name", &["name"])
            .index("by_id_age", &["age", "id"])
            .build()
            .expect("build");

        assert_eq!(tdef.indexes()[0].columns, vec!["name", "id"]);
        // Already contains the pk: unchanged.
        assert_eq!(tdef.indexes()[1].columns, vec!["age", "id"]);
    }

    #[test]
    fn test_composite_primary_key() {
        let tdef = people()
            .primary_key(2)
            .index("by_age", &["age"])
            .build()
            .expect("build");
        assert_eq!(tdef.indexes()[0].columns, vec!["age", "id", "name"]);
    }

    #[test]
    fn test_invalid_definitions() {
        assert_eq!(
            TableDef::builder("t").build(),
            Err(TableDefError::NoColumns)
        );
        assert_eq!(
            people().primary_key(0).build(),
            Err(TableDefError::InvalidPrimaryKey {
                pkeys: 0,
                columns: 3
            })
        );
        assert_eq!(
            people().primary_key(4).build(),
            Err(TableDefError::InvalidPrimaryKey {
                pkeys: 4,
                columns: 3
            })
        );
        assert_eq!(
            people().column("id", ValueType::Bytes).build(),
            Err(TableDefError::DuplicateColumn("id".to_string()))
        );
        assert_eq!(
            people().index("i", &["missing"]).build(),
            Err(TableDefError::UnknownColumn {
                index: "i".to_string(),
                column: "missing".to_string()
            })
        );
        assert_eq!(
            people().index("i", &["age"]).index("i", &["name"]).build(),
            Err(TableDefError::DuplicateIndex("i".to_string()))
        );
        assert_eq!(
            people().index("i", &[]).build(),
            Err(TableDefError::EmptyIndex("i".to_string()))
        );
        assert_eq!(
            people().prefix(2).build(),
            Err(TableDefError::ReservedPrefix(2))
        );
        assert_eq!(
            people().prefix(u32::MAX).index("i", &["age"]).build(),
            Err(TableDefError::PrefixOverflow)
        );
    }
}
