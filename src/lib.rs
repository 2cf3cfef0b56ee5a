// redb-backed persistence adapter for policy-based access control

pub mod adapter;
pub mod config;
pub mod model;
pub mod rule;
pub mod storage;

// Re-export commonly used types
pub use adapter::{Adapter, AdapterError, BatchAdapter, BatchError, BatchMode, RedbAdapter};
pub use config::{AdapterConfig, ConfigError};
pub use model::{
    load_policy_line, load_policy_text, section_of, ModelError, ParseError, PolicyModel,
};
pub use rule::{Field, PolicyRecord, MAX_FIELDS};
pub use storage::{Query, RuleStore, StoreError, DEFAULT_TABLE};
