// Adapter - the persistence contract a policy engine drives
//
// `Adapter` covers loading and single-rule writes; `BatchAdapter` adds the
// multi-rule variants. Every write goes straight to storage, so the engine
// runs with auto-save and never needs `save_policy`.

mod redb_adapter;

pub use redb_adapter::{filter_query, RedbAdapter};

use crate::model::{ModelError, PolicyModel};
use crate::rule::MAX_FIELDS;
use crate::storage::StoreError;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("not supported: {0}")]
    Unsupported(&'static str),

    #[error("unsupported filter at field index {field_index}: {reason}")]
    UnsupportedFilter {
        field_index: usize,
        reason: &'static str,
    },

    #[error("rule has {len} fields; at most {} are supported", MAX_FIELDS)]
    RuleTooLong { len: usize },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Batch(#[from] BatchError),
}

pub type Result<T> = std::result::Result<T, AdapterError>;

/// Per-rule failures collected from an independent batch
#[derive(Error, Debug)]
pub struct BatchError {
    /// Rules in the batch
    pub attempted: usize,
    /// `(index into the batch, cause)` for every rule that failed
    pub failures: Vec<(usize, AdapterError)>,
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} rules in batch failed",
            self.failures.len(),
            self.attempted
        )?;
        if let Some((index, cause)) = self.failures.first() {
            write!(f, "; first at index {}: {}", index, cause)?;
        }
        Ok(())
    }
}

/// How multi-rule writes map onto storage transactions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BatchMode {
    /// One transaction per rule. Every rule is attempted and failures are
    /// reported together; rules that succeeded stay committed.
    #[default]
    Independent,
    /// One transaction for the whole batch; the first failure rolls it back.
    Atomic,
}

impl FromStr for BatchMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "independent" => Ok(BatchMode::Independent),
            "atomic" => Ok(BatchMode::Atomic),
            other => Err(format!("unknown batch mode '{}'", other)),
        }
    }
}

impl fmt::Display for BatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchMode::Independent => write!(f, "independent"),
            BatchMode::Atomic => write!(f, "atomic"),
        }
    }
}

/// Storage backend for a policy engine
pub trait Adapter {
    /// Merge every stored rule into `model`
    fn load_policy(&self, model: &mut PolicyModel) -> Result<()>;

    /// Replace stored rules with the contents of `model`
    fn save_policy(&self, model: &PolicyModel) -> Result<()>;

    fn add_policy(&self, sec: &str, ptype: &str, rule: &[String]) -> Result<()>;

    /// Remove rules equal to `rule` in every field
    fn remove_policy(&self, sec: &str, ptype: &str, rule: &[String]) -> Result<()>;

    /// Remove rules whose fields, starting at `field_index`, equal `field_values`
    fn remove_filtered_policy(
        &self,
        sec: &str,
        ptype: &str,
        field_index: usize,
        field_values: &[String],
    ) -> Result<()>;
}

/// Multi-rule writes
pub trait BatchAdapter: Adapter {
    fn add_policies(&self, sec: &str, ptype: &str, rules: &[Vec<String>]) -> Result<()>;

    fn remove_policies(&self, sec: &str, ptype: &str, rules: &[Vec<String>]) -> Result<()>;
}
