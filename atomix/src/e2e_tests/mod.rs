//! End-to-end scan scenarios.
//!
//! Each test file covers one scenario, building a database from fixed or
//! seeded-random rows and checking exactly which rows a scan yields.

#![cfg(test)]

mod helpers;

mod test_bytes_keys;
mod test_descending_scan;
mod test_index_scan;
mod test_page_file;
mod test_partial_keys;
mod test_primary_range;
mod test_random_ranges;
mod test_scan_errors;
