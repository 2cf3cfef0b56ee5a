// Storage module - redb-backed rule store and record queries

pub mod db;
pub mod query;

pub use db::{RuleStore, RuleTxn, StoreError, StoreResult, DEFAULT_TABLE};
pub use query::{Criterion, Op, Predicate, Query};
