//! Shared fixtures for unit and scenario tests.

use crate::types::{Record, TableDef, ValueType};

/// Install a tracing subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// `T(a int, b int)` keyed by `a` with an index `by_b` on `b`.
#[must_use]
#[allow(clippy::expect_used)]
pub fn sample_table() -> TableDef {
    TableDef::builder("T")
        .column("a", ValueType::Int64)
        .column("b", ValueType::Int64)
        .index("by_b", &["b"])
        .build()
        .expect("valid table")
}

/// Rows `a = 1..=5` with `b = 5, 3, 1, 4, 2`.
#[must_use]
pub fn sample_rows() -> Vec<(&'static str, Record)> {
    [(1, 5), (2, 3), (3, 1), (4, 4), (5, 2)]
        .into_iter()
        .map(|(a, b)| ("T", Record::new().add_int64("a", a).add_int64("b", b)))
        .collect()
}
