// RedbAdapter - policy rules persisted through a RuleStore

use super::{Adapter, AdapterError, BatchAdapter, BatchError, BatchMode, Result};
use crate::config::AdapterConfig;
use crate::model::{load_policy_line, load_policy_text, PolicyModel};
use crate::rule::{Field, PolicyRecord, RuleTooLong, MAX_FIELDS};
use crate::storage::{Query, RuleStore, RuleTxn};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Persistence adapter writing every change straight to a redb-backed store.
///
/// The adapter holds no mutable state; concurrent callers are isolated by the
/// store's transactions.
pub struct RedbAdapter {
    store: Arc<RuleStore>,
    builtin_policy: Option<String>,
    batch_mode: BatchMode,
}

impl RedbAdapter {
    /// Wrap an opened store. `builtin_policy` is CSV policy text merged into
    /// the model ahead of stored rules on every load.
    pub fn new(store: Arc<RuleStore>, builtin_policy: Option<String>) -> Self {
        Self {
            store,
            builtin_policy: builtin_policy.filter(|text| !text.is_empty()),
            batch_mode: BatchMode::default(),
        }
    }

    /// Open the configured store and build an adapter over it
    pub fn from_config(config: &AdapterConfig) -> anyhow::Result<Self> {
        let store = RuleStore::open(&config.path, &config.table)?;
        let builtin_policy = config.bootstrap_text()?;
        Ok(Self::new(Arc::new(store), builtin_policy).with_batch_mode(config.batch_mode))
    }

    pub fn with_batch_mode(mut self, batch_mode: BatchMode) -> Self {
        self.batch_mode = batch_mode;
        self
    }

    pub fn store(&self) -> &Arc<RuleStore> {
        &self.store
    }

    pub fn batch_mode(&self) -> BatchMode {
        self.batch_mode
    }

    pub fn builtin_policy(&self) -> Option<&str> {
        self.builtin_policy.as_deref()
    }

    /// Apply `op` to each rule, per the configured batch mode
    fn apply_batch<F>(&self, rules: &[Vec<String>], op: F) -> Result<()>
    where
        F: Fn(&RuleTxn<'_>, &[String]) -> Result<()>,
    {
        match self.batch_mode {
            BatchMode::Atomic => self.store.update(|txn| {
                rules.iter().try_for_each(|rule| op(txn, rule.as_slice()))
            }),
            BatchMode::Independent => {
                let mut failures = Vec::new();
                for (index, rule) in rules.iter().enumerate() {
                    if let Err(e) = self.store.update(|txn| op(txn, rule.as_slice())) {
                        warn!("Batch rule {} of {} failed: {}", index, rules.len(), e);
                        failures.push((index, e));
                    }
                }

                if failures.is_empty() {
                    Ok(())
                } else {
                    Err(BatchError {
                        attempted: rules.len(),
                        failures,
                    }
                    .into())
                }
            }
        }
    }
}

impl From<RuleTooLong> for AdapterError {
    fn from(err: RuleTooLong) -> Self {
        AdapterError::RuleTooLong { len: err.0 }
    }
}

/// Query matching a record on the policy type and all six slots
fn exact_match(record: &PolicyRecord) -> Query {
    Field::SLOTS.iter().fold(
        Query::where_field(Field::PolicyType).eq(record.ptype.as_str()),
        |query, &slot| query.and(slot).eq(record.get(slot)),
    )
}

/// Query for a filtered removal.
///
/// `field_values` is a contiguous run starting at `v0`. Only the leading
/// non-empty values become predicates; the first empty value ends the run, so
/// anything after it is ignored.
pub fn filter_query(
    ptype: &str,
    field_index: usize,
    field_values: &[String],
) -> Result<Query> {
    if field_index != 0 {
        return Err(AdapterError::UnsupportedFilter {
            field_index,
            reason: "filtering must start at field 0",
        });
    }

    let leading = field_values
        .iter()
        .take_while(|value| !value.is_empty())
        .count();
    if leading > MAX_FIELDS {
        return Err(AdapterError::UnsupportedFilter {
            field_index,
            reason: "more field values than stored fields",
        });
    }

    let query = Field::SLOTS
        .iter()
        .zip(&field_values[..leading])
        .fold(
            Query::where_field(Field::PolicyType).eq(ptype),
            |query, (&slot, value)| query.and(slot).eq(value.as_str()),
        );
    Ok(query)
}

fn insert_rule(txn: &RuleTxn<'_>, ptype: &str, rule: &[String]) -> Result<()> {
    let record = PolicyRecord::from_rule(ptype, rule)?;
    txn.insert(&record)?;
    Ok(())
}

fn remove_rule(txn: &RuleTxn<'_>, ptype: &str, rule: &[String]) -> Result<()> {
    let record = PolicyRecord::from_rule(ptype, rule)?;
    txn.delete_matching(&exact_match(&record))?;
    Ok(())
}

impl Adapter for RedbAdapter {
    fn load_policy(&self, model: &mut PolicyModel) -> Result<()> {
        let mut builtin = 0;
        if let Some(text) = &self.builtin_policy {
            builtin = load_policy_text(text, model)?;
        }

        let records = self
            .store
            .find(&Query::where_field(Field::PolicyType).ne(""))?;
        for (_, record) in &records {
            load_policy_line(&record.load_line(), model)?;
        }

        info!(
            builtin,
            stored = records.len(),
            table = self.store.table(),
            "Loaded policy"
        );
        Ok(())
    }

    fn save_policy(&self, _model: &PolicyModel) -> Result<()> {
        Err(AdapterError::Unsupported("must use auto-save with this adapter"))
    }

    fn add_policy(&self, _sec: &str, ptype: &str, rule: &[String]) -> Result<()> {
        self.store.update(|txn| insert_rule(txn, ptype, rule))
    }

    fn remove_policy(&self, _sec: &str, ptype: &str, rule: &[String]) -> Result<()> {
        self.store.update(|txn| remove_rule(txn, ptype, rule))
    }

    fn remove_filtered_policy(
        &self,
        _sec: &str,
        ptype: &str,
        field_index: usize,
        field_values: &[String],
    ) -> Result<()> {
        let query = filter_query(ptype, field_index, field_values)?;
        let removed = self.store.delete_matching(&query)?;
        debug!(removed, %query, "Removed filtered policy");
        Ok(())
    }
}

impl BatchAdapter for RedbAdapter {
    fn add_policies(&self, _sec: &str, ptype: &str, rules: &[Vec<String>]) -> Result<()> {
        self.apply_batch(rules, |txn, rule| insert_rule(txn, ptype, rule))
    }

    fn remove_policies(&self, _sec: &str, ptype: &str, rules: &[Vec<String>]) -> Result<()> {
        self.apply_batch(rules, |txn, rule| remove_rule(txn, ptype, rule))
    }
}
