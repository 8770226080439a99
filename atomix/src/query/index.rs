//! Choosing the key space a range scan runs over.

use crate::query::ScanError;
use crate::types::{Record, TableDef, ValueType};

/// The key space a scan runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSelection {
    /// The table's primary key.
    Primary,
    /// The secondary index at this position in `TableDef::indexes`.
    Secondary(usize),
}

/// Return `true` if `columns` equals the leading entries of `key_columns`.
fn is_prefix_of<S: AsRef<str>, T: AsRef<str>>(columns: &[S], key_columns: &[T]) -> bool {
    columns.len() <= key_columns.len()
        && columns
            .iter()
            .zip(key_columns)
            .all(|(a, b)| a.as_ref() == b.as_ref())
}

/// Pick the key space for a scan bounded on `columns`.
///
/// The primary key wins whenever `columns` is a prefix of it (so an empty
/// column list is a full table scan). Otherwise the first secondary index,
/// in declaration order, whose leading columns equal `columns` is used.
pub fn find_index<S: AsRef<str>>(
    table: &TableDef,
    columns: &[S],
) -> Result<IndexSelection, ScanError> {
    let primary: Vec<&str> = table.primary_key().iter().map(|c| c.name.as_str()).collect();
    if is_prefix_of(columns, &primary) {
        return Ok(IndexSelection::Primary);
    }

    table
        .indexes()
        .iter()
        .position(|index| is_prefix_of(columns, &index.columns))
        .map(IndexSelection::Secondary)
        .ok_or_else(|| ScanError::UnindexedQuery {
            table: table.name().to_string(),
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
        })
}

/// The resolved shape of the keys a scan compares against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLayout {
    pub selection: IndexSelection,
    /// Key-space prefix.
    pub prefix: u32,
    /// Key columns in order.
    pub columns: Vec<String>,
    /// Type of each key column.
    pub types: Vec<ValueType>,
}

impl KeyLayout {
    /// Build the layout of the selected key space.
    ///
    /// # Panics
    ///
    /// Panics if `selection` names an index the table does not have.
    #[must_use]
    pub fn new(table: &TableDef, selection: IndexSelection) -> Self {
        match selection {
            IndexSelection::Primary => Self {
                selection,
                prefix: table.prefix(),
                columns: table.primary_key().iter().map(|c| c.name.clone()).collect(),
                types: table.primary_key().iter().map(|c| c.value_type).collect(),
            },
            IndexSelection::Secondary(i) => {
                let index = &table.indexes()[i];
                Self {
                    selection,
                    prefix: index.prefix,
                    columns: index.columns.clone(),
                    types: index
                        .columns
                        .iter()
                        .filter_map(|c| table.column_type(c))
                        .collect(),
                }
            }
        }
    }

    /// A display name for logging: `primary` or the index name.
    #[must_use]
    pub fn name<'t>(&self, table: &'t TableDef) -> &'t str {
        match self.selection {
            IndexSelection::Primary => "primary",
            IndexSelection::Secondary(i) => table.indexes()[i].name.as_str(),
        }
    }

    /// Check that `bound` covers a prefix of the key columns with values of
    /// the right types.
    pub fn check_bound(&self, table: &TableDef, bound: &Record) -> Result<(), ScanError> {
        if !is_prefix_of(&bound.cols, &self.columns) || bound.cols.len() != bound.vals.len() {
            return Err(ScanError::UnindexedQuery {
                table: table.name().to_string(),
                columns: bound.cols.clone(),
            });
        }
        for ((column, value), &expected) in bound.cols.iter().zip(&bound.vals).zip(&self.types) {
            let actual = value.value_type();
            if actual != expected {
                return Err(ScanError::TypeMismatch {
                    column: column.clone(),
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}

/// Resolve the key space for a pair of bounds.
///
/// With an explicit `index` name that index is used; otherwise the start
/// bound's columns select it. Both bounds must be typed prefixes of the
/// chosen key columns.
pub fn resolve_layout(
    table: &TableDef,
    index: Option<&str>,
    start: &Record,
    end: &Record,
) -> Result<KeyLayout, ScanError> {
    let selection = match index {
        Some(name) => table
            .index_position(name)
            .map(IndexSelection::Secondary)
            .ok_or_else(|| ScanError::IndexNotFound {
                table: table.name().to_string(),
                index: name.to_string(),
            })?,
        None => find_index(table, &start.cols)?,
    };

    let layout = KeyLayout::new(table, selection);
    layout.check_bound(table, start)?;
    layout.check_bound(table, end)?;
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    fn table() -> TableDef {
        TableDef::builder("t")
            .column("a", ValueType::Int64)
            .column("b", ValueType::Int64)
            .column("c", ValueType::Bytes)
            .primary_key(1)
            .index("by_b", &["b"])
            .index("by_c_b", &["c", "b"])
            .index("by_c", &["c"])
            .build()
            .expect("valid table")
    }

    fn pick(t: &TableDef, columns: &[&str]) -> Option<IndexSelection> {
        find_index(t, columns).ok()
    }

    #[test]
    fn test_primary_key_wins() {
        let t = table();
        assert_eq!(pick(&t, &["a"]), Some(IndexSelection::Primary));
        // An empty request is a full table scan
        assert_eq!(pick(&t, &[]), Some(IndexSelection::Primary));
    }

    #[test]
    fn test_secondary_in_declaration_order() {
        let t = table();
        assert_eq!(pick(&t, &["b"]), Some(IndexSelection::Secondary(0)));
        // Both by_c_b and by_c start with c; the first declared wins
        assert_eq!(pick(&t, &["c"]), Some(IndexSelection::Secondary(1)));
        assert_eq!(pick(&t, &["c", "b"]), Some(IndexSelection::Secondary(1)));
        // by_b was extended with the primary key column
        assert_eq!(pick(&t, &["b", "a"]), Some(IndexSelection::Secondary(0)));
        // Deterministic across calls
        assert_eq!(pick(&t, &["c"]), pick(&t, &["c"]));
    }

    #[test]
    fn test_unindexed_columns() {
        let t = table();
        assert!(matches!(
            find_index(&t, &["b", "c"]),
            Err(ScanError::UnindexedQuery { .. })
        ));
        assert!(matches!(
            find_index(&t, &["d"]),
            Err(ScanError::UnindexedQuery { .. })
        ));
    }

    #[test]
    fn test_layouts() {
        let t = table();
        let primary = KeyLayout::new(&t, IndexSelection::Primary);
        assert_eq!(primary.prefix, t.prefix());
        assert_eq!(primary.columns, vec!["a"]);
        assert_eq!(primary.types, vec![ValueType::Int64]);
        assert_eq!(primary.name(&t), "primary");

        let by_c = KeyLayout::new(&t, IndexSelection::Secondary(2));
        assert_eq!(by_c.prefix, t.prefix() + 3);
        assert_eq!(by_c.columns, vec!["c", "a"]);
        assert_eq!(by_c.types, vec![ValueType::Bytes, ValueType::Int64]);
        assert_eq!(by_c.name(&t), "by_c");
    }

    #[test]
    fn test_resolve_layout_checks_both_bounds() {
        let t = table();
        let start = Record::new().add_int64("b", 1);

        let layout = resolve_layout(&t, None, &start, &Record::new().add_int64("b", 9))
            .expect("resolves");
        assert_eq!(layout.selection, IndexSelection::Secondary(0));

        // End bound on a column the chosen index does not lead with
        assert!(matches!(
            resolve_layout(&t, None, &start, &Record::new().add_int64("a", 9)),
            Err(ScanError::UnindexedQuery { .. })
        ));

        // Wrong value type
        assert!(matches!(
            resolve_layout(&t, None, &Record::new().add_str("b", "x"), &Record::new()),
            Err(ScanError::TypeMismatch {
                expected: ValueType::Int64,
                actual: ValueType::Bytes,
                ..
            })
        ));
    }

    #[test]
    fn test_resolve_named_index() {
        let t = table();
        let layout =
            resolve_layout(&t, Some("by_c"), &Record::new(), &Record::new()).expect("resolves");
        assert_eq!(layout.selection, IndexSelection::Secondary(2));

        let bound = Record::new().add("c", Value::from("x"));
        assert!(resolve_layout(&t, Some("by_c"), &bound, &Record::new()).is_ok());
        assert!(matches!(
            resolve_layout(&t, Some("by_b"), &bound, &Record::new()),
            Err(ScanError::UnindexedQuery { .. })
        ));
        assert!(matches!(
            resolve_layout(&t, Some("nope"), &Record::new(), &Record::new()),
            Err(ScanError::IndexNotFound { .. })
        ));
    }
}
