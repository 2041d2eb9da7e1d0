//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Runtime configuration for the `sift` binary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Query schema file (SIFT_SCHEMA). The `--schema` flag takes precedence.
    pub schema_path: Option<PathBuf>,

    /// Table override for generated SELECTs (SIFT_BASE_TABLE). When unset,
    /// the schema's `base_table` is used.
    pub base_table: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value
    /// if it is set.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let schema_path = lookup("SIFT_SCHEMA")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let base_table = match lookup("SIFT_BASE_TABLE") {
            Some(table) if table.trim().is_empty() => None,
            Some(table) => {
                if !crate::field::is_safe_identifier(&table) {
                    bail!("SIFT_BASE_TABLE must be a plain SQL identifier, got '{table}'");
                }
                Some(table)
            }
            None => None,
        };

        Ok(Self {
            schema_path,
            base_table,
        })
    }

    /// Schema path from `flag`, falling back to SIFT_SCHEMA.
    pub fn schema_path(&self, flag: Option<PathBuf>) -> Result<PathBuf> {
        flag.or_else(|| self.schema_path.clone())
            .context("no schema given: pass --schema or set SIFT_SCHEMA")
    }
}
