//! Seeded random ranges checked against a sorted model.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::e2e_tests::helpers::*;
use crate::types::{CmpOp, Record, TableDef, ValueType};

const SEEDS: [u64; 4] = [1, 7, 42, 12345];
const ROWS: usize = 300;
const QUERIES: usize = 200;

struct Model {
    /// `(k, v)` for every row, sorted by `k`.
    rows: Vec<(i64, i64)>,
}

impl Model {
    fn generate(rng: &mut StdRng) -> Self {
        let mut keys = BTreeSet::new();
        while keys.len() < ROWS {
            keys.insert(rng.random_range(-1000..1000));
        }
        let rows = keys
            .into_iter()
            .map(|k| (k, rng.random_range(0..25)))
            .collect();
        Self { rows }
    }

    /// Primary keys of the rows inside both bounds, in scan order.
    fn expect(&self, by_v: bool, cmp1: CmpOp, lo_or_hi: i64, cmp2: CmpOp, other: i64) -> Vec<i64> {
        let inside = |x: i64, cmp: CmpOp, bound: i64| match cmp {
            CmpOp::Gt => x > bound,
            CmpOp::Ge => x >= bound,
            CmpOp::Lt => x < bound,
            CmpOp::Le => x <= bound,
        };
        let mut hits: Vec<(i64, i64)> = self
            .rows
            .iter()
            .map(|&(k, v)| if by_v { (v, k) } else { (k, v) })
            .filter(|&(x, _)| inside(x, cmp1, lo_or_hi) && inside(x, cmp2, other))
            .collect();
        hits.sort_unstable();
        if !cmp1.is_ascending() {
            hits.reverse();
        }
        hits.into_iter()
            .map(|(x, y)| if by_v { y } else { x })
            .collect()
    }
}

fn random_query(rng: &mut StdRng, span: std::ops::Range<i64>) -> (CmpOp, i64, CmpOp, i64) {
    let a = rng.random_range(span.clone());
    let b = rng.random_range(span);
    let (lo, hi) = (a.min(b), a.max(b));
    let lower = if rng.random_bool(0.5) { CmpOp::Ge } else { CmpOp::Gt };
    let upper = if rng.random_bool(0.5) { CmpOp::Le } else { CmpOp::Lt };
    if rng.random_bool(0.5) {
        (lower, lo, upper, hi)
    } else {
        (upper, hi, lower, lo)
    }
}

#[test]
fn test_random_primary_and_index_ranges() {
    let table = TableDef::builder("R")
        .column("k", ValueType::Int64)
        .column("v", ValueType::Int64)
        .index("by_v", &["v"])
        .build()
        .expect("valid table");

    for seed in SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let model = Model::generate(&mut rng);
        let rows = model
            .rows
            .iter()
            .map(|&(k, v)| ("R", Record::new().add_int64("k", k).add_int64("v", v)))
            .collect();
        let db = memory_database(vec![table.clone()], rows);

        for _ in 0..QUERIES {
            let (cmp1, key1, cmp2, key2) = random_query(&mut rng, -1100..1100);
            let found = scan_all(
                &db,
                "R",
                range(cmp1, int_key("k", key1), cmp2, int_key("k", key2)),
            );
            assert_eq!(
                ints(&found, "k"),
                model.expect(false, cmp1, key1, cmp2, key2),
                "seed {seed}: k {cmp1} {key1}, {cmp2} {key2}"
            );

            let (cmp1, key1, cmp2, key2) = random_query(&mut rng, -3..28);
            let found = scan_all(
                &db,
                "R",
                range(cmp1, int_key("v", key1), cmp2, int_key("v", key2)),
            );
            assert_eq!(
                ints(&found, "k"),
                model.expect(true, cmp1, key1, cmp2, key2),
                "seed {seed}: v {cmp1} {key1}, {cmp2} {key2}"
            );
        }
    }
}

#[test]
fn test_seeded_runs_are_deterministic() {
    let run = |seed| {
        let mut rng = StdRng::seed_from_u64(seed);
        let model = Model::generate(&mut rng);
        (model.rows, random_query(&mut rng, -1100..1100))
    };
    assert_eq!(run(99), run(99));
}
