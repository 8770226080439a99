//! Engine configuration.
//!
//! This module provides configuration loading for the engine from
//! environment variables.
//!
//! # Environment Variables
//!
//! - `ATOMIX_MAX_NODE_KEYS`: Maximum entries per node when bulk loading (default: `128`)
//! - `ATOMIX_INDEX_MISS_POLICY`: `skip` or `error` for index entries without a row
//!   (default: `skip`)
//! - `ATOMIX_VERIFY_CHECKSUMS`: Verify page checksums on read (default: `true`)
//!
//! # Invariants
//!
//! - `max_node_keys` is always at least `MIN_NODE_KEYS`

use std::str::FromStr;

use crate::storage::btree::MIN_NODE_KEYS;

const MAX_NODE_KEYS_VAR: &str = "ATOMIX_MAX_NODE_KEYS";
const INDEX_MISS_POLICY_VAR: &str = "ATOMIX_INDEX_MISS_POLICY";
const VERIFY_CHECKSUMS_VAR: &str = "ATOMIX_VERIFY_CHECKSUMS";

/// What a secondary-index scan does with an entry whose row is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexMissPolicy {
    /// Log a warning and move on.
    #[default]
    Skip,
    /// Fail the scan with `ScanError::DanglingIndexEntry`.
    Error,
}

impl FromStr for IndexMissPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "error" => Ok(Self::Error),
            _ => Err(ConfigError::InvalidValue {
                name: INDEX_MISS_POLICY_VAR.to_string(),
                message: format!("'{s}' is not a valid policy (expected 'skip' or 'error')"),
            }),
        }
    }
}

/// Engine configuration.
///
/// # Post-conditions
///
/// When constructed via `from_env()` or `default()`:
/// - `max_node_keys >= MIN_NODE_KEYS`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Fanout used by the bulk loader.
    pub max_node_keys: usize,
    /// Handling of secondary index entries without a row.
    pub index_miss_policy: IndexMissPolicy,
    /// Verify page checksums when reading from a file.
    pub verify_checksums: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_node_keys: Self::DEFAULT_MAX_NODE_KEYS,
            index_miss_policy: IndexMissPolicy::default(),
            verify_checksums: true,
        }
    }
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl EngineConfig {
    /// Default bulk-loader fanout.
    pub const DEFAULT_MAX_NODE_KEYS: usize = 128;

    /// Load configuration from environment variables.
    ///
    /// Unset variables take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to a value that does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            max_node_keys: Self::load_max_node_keys(var(MAX_NODE_KEYS_VAR))?,
            index_miss_policy: var(INDEX_MISS_POLICY_VAR)
                .map_or(Ok(IndexMissPolicy::default()), |v| v.parse())?,
            verify_checksums: Self::load_verify_checksums(var(VERIFY_CHECKSUMS_VAR))?,
        })
    }

    fn load_max_node_keys(value: Option<String>) -> Result<usize, ConfigError> {
        let Some(value) = value else {
            return Ok(Self::DEFAULT_MAX_NODE_KEYS);
        };
        match value.trim().parse::<usize>() {
            Ok(n) if n >= MIN_NODE_KEYS => Ok(n),
            _ => Err(ConfigError::InvalidValue {
                name: MAX_NODE_KEYS_VAR.to_string(),
                message: format!("'{value}' is not an integer >= {MIN_NODE_KEYS}"),
            }),
        }
    }

    fn load_verify_checksums(value: Option<String>) -> Result<bool, ConfigError> {
        let Some(value) = value else {
            return Ok(true);
        };
        match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                name: VERIFY_CHECKSUMS_VAR.to_string(),
                message: format!("'{value}' is not a boolean"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<EngineConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        EngineConfig::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_default_values() {
        assert_eq!(load(&[]), Ok(EngineConfig::default()));
        assert_eq!(EngineConfig::default().max_node_keys, 128);
        assert_eq!(
            EngineConfig::default().index_miss_policy,
            IndexMissPolicy::Skip
        );
        assert!(EngineConfig::default().verify_checksums);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("ATOMIX_MAX_NODE_KEYS", "16"),
            ("ATOMIX_INDEX_MISS_POLICY", "Error"),
            ("ATOMIX_VERIFY_CHECKSUMS", "false"),
        ])
        .expect("valid config");

        assert_eq!(config.max_node_keys, 16);
        assert_eq!(config.index_miss_policy, IndexMissPolicy::Error);
        assert!(!config.verify_checksums);
    }

    #[test]
    fn test_invalid_values() {
        for (name, value) in [
            ("ATOMIX_MAX_NODE_KEYS", "1"),
            ("ATOMIX_MAX_NODE_KEYS", "many"),
            ("ATOMIX_INDEX_MISS_POLICY", "ignore"),
            ("ATOMIX_VERIFY_CHECKSUMS", "maybe"),
        ] {
            let err = load(&[(name, value)]).expect_err("should reject");
            assert!(
                matches!(&err, ConfigError::InvalidValue { name: n, .. } if n == name),
                "{name}={value} gave {err}"
            );
        }
    }

    #[test]
    fn test_config_error_display_invalid() {
        let error = ConfigError::InvalidValue {
            name: "TEST_VAR".to_string(),
            message: "bad value".to_string(),
        };
        assert_eq!(error.to_string(), "invalid value for TEST_VAR: bad value");
    }
}
