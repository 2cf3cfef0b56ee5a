// Rule store - policy records persisted in redb tables
//
// Records live in `<table>` keyed by a store-assigned sequence number. The
// sequence counter lives in `<table>_meta` so keys are never reused, even after
// the newest record is deleted.

use super::query::Query;
use crate::rule::PolicyRecord;
use redb::backends::InMemoryBackend;
use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default table name for stored rules
pub const DEFAULT_TABLE: &str = "casbin_rule";

const NEXT_SEQUENCE: &str = "next_sequence";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to open database: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("transaction failed: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("commit failed: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("failed to encode rule record: {0}")]
    Encode(#[source] bincode::Error),

    #[error("failed to decode rule record {key}: {source}")]
    Decode {
        key: u64,
        #[source]
        source: bincode::Error,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Transactional store of policy records
pub struct RuleStore {
    db: Database,
    table: String,
    meta_table: String,
}

impl RuleStore {
    /// Open (or create) a database file at `path`
    pub fn open(path: impl AsRef<Path>, table: &str) -> StoreResult<Self> {
        let path = path.as_ref();
        let db = Database::create(path)?;
        info!("Opened rule store at {} (table '{}')", path.display(), table);
        Self::from_database(db, table)
    }

    /// Create a store backed by memory only; contents vanish on drop
    pub fn in_memory(table: &str) -> StoreResult<Self> {
        let db = redb::Builder::new().create_with_backend(InMemoryBackend::new())?;
        Self::from_database(db, table)
    }

    /// Wrap an already opened database
    pub fn from_database(db: Database, table: &str) -> StoreResult<Self> {
        let store = Self {
            db,
            table: table.to_string(),
            meta_table: format!("{}_meta", table),
        };

        // Create both tables up front so readers never see a missing table
        let txn = store.db.begin_write()?;
        {
            txn.open_table(store.rules_def())?;
            txn.open_table(store.meta_def())?;
        }
        txn.commit()?;

        Ok(store)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn rules_def(&self) -> TableDefinition<'_, u64, &'static [u8]> {
        TableDefinition::new(&self.table)
    }

    fn meta_def(&self) -> TableDefinition<'_, &'static str, u64> {
        TableDefinition::new(&self.meta_table)
    }

    /// Run `f` inside one write transaction.
    ///
    /// Commits when `f` returns `Ok`, aborts when it returns `Err`.
    pub fn update<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&RuleTxn<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let txn = self.db.begin_write().map_err(StoreError::from)?;

        let result = {
            let rule_txn = RuleTxn {
                txn: &txn,
                rules: self.rules_def(),
                meta: self.meta_def(),
            };
            f(&rule_txn)
        };

        match result {
            Ok(value) => {
                txn.commit().map_err(StoreError::from)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(abort_err) = txn.abort() {
                    warn!("Failed to abort rule transaction: {}", abort_err);
                }
                Err(e)
            }
        }
    }

    /// Insert a record under the next sequence key
    pub fn insert(&self, record: &PolicyRecord) -> StoreResult<u64> {
        self.update(|txn| txn.insert(record))
    }

    /// Delete every record matching `query`; returns how many were removed
    pub fn delete_matching(&self, query: &Query) -> StoreResult<usize> {
        self.update(|txn| txn.delete_matching(query))
    }

    /// All records matching `query`, in key order
    pub fn find(&self, query: &Query) -> StoreResult<Vec<(u64, PolicyRecord)>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(self.rules_def())?;

        let mut found = Vec::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            let key = key.value();
            let record = decode(key, value.value())?;
            if query.matches(&record) {
                found.push((key, record));
            }
        }
        Ok(found)
    }

    pub fn count(&self, query: &Query) -> StoreResult<usize> {
        Ok(self.find(query)?.len())
    }
}

/// Rule operations bound to an open write transaction
pub struct RuleTxn<'a> {
    txn: &'a WriteTransaction,
    rules: TableDefinition<'a, u64, &'static [u8]>,
    meta: TableDefinition<'a, &'static str, u64>,
}

impl RuleTxn<'_> {
    pub fn insert(&self, record: &PolicyRecord) -> StoreResult<u64> {
        let bytes = bincode::serialize(record).map_err(StoreError::Encode)?;
        let key = self.next_sequence()?;

        let mut table = self.txn.open_table(self.rules)?;
        table.insert(key, bytes.as_slice())?;

        debug!(key, ptype = %record.ptype, "Inserted rule");
        Ok(key)
    }

    pub fn delete_matching(&self, query: &Query) -> StoreResult<usize> {
        let mut table = self.txn.open_table(self.rules)?;

        let mut matched = Vec::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            let key = key.value();
            if query.matches(&decode(key, value.value())?) {
                matched.push(key);
            }
        }

        for key in &matched {
            table.remove(*key)?;
        }

        debug!(removed = matched.len(), %query, "Deleted matching rules");
        Ok(matched.len())
    }

    fn next_sequence(&self) -> StoreResult<u64> {
        let mut meta = self.txn.open_table(self.meta)?;
        let next = meta.get(NEXT_SEQUENCE)?.map(|v| v.value()).unwrap_or(1);
        meta.insert(NEXT_SEQUENCE, next + 1)?;
        Ok(next)
    }
}

fn decode(key: u64, bytes: &[u8]) -> StoreResult<PolicyRecord> {
    bincode::deserialize(bytes).map_err(|source| StoreError::Decode { key, source })
}
