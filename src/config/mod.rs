// Adapter configuration
// Defaults can be overridden from a directive file or the builder methods

mod parser;

use parser::{ConfigParser, Directive};

use crate::adapter::BatchMode;
use crate::model::{ModelError, PolicyModel};
use crate::storage::DEFAULT_TABLE;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: unterminated quoted value")]
    UnterminatedQuote { line: usize },

    #[error("line {line}: unknown directive '{key}'")]
    UnknownDirective { line: usize, key: String },

    #[error("line {line}: '{key}' expects {expected} argument(s), got {got}")]
    WrongArity {
        line: usize,
        key: String,
        expected: &'static str,
        got: usize,
    },

    #[error("line {line}: invalid value for '{key}': {reason}")]
    InvalidValue {
        line: usize,
        key: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterConfig {
    /// Database file
    pub path: PathBuf,
    /// Table holding rule records
    pub table: String,
    /// Inline CSV policy merged ahead of stored rules
    pub bootstrap_policy: Option<String>,
    /// File with CSV policy merged after the inline text
    pub bootstrap_policy_file: Option<PathBuf>,
    pub batch_mode: BatchMode,
    /// Policy types the model is built with, e.g. `p`, `g`, `g2`
    pub policy_types: Vec<String>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("policy.redb"),
            table: DEFAULT_TABLE.to_string(),
            bootstrap_policy: None,
            bootstrap_policy_file: None,
            batch_mode: BatchMode::Independent,
            policy_types: vec!["p".to_string(), "g".to_string()],
        }
    }
}

impl AdapterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file, starting from the defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::parse(&content)?;
        info!("Loaded adapter configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration text, starting from the defaults
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for directive in ConfigParser::new(content).parse()? {
            config.apply(directive)?;
        }
        Ok(config)
    }

    fn apply(&mut self, directive: Directive) -> Result<(), ConfigError> {
        let Directive { line, key, mut args } = directive;

        if key == "policy-types" {
            if args.is_empty() {
                return Err(ConfigError::WrongArity {
                    line,
                    key,
                    expected: "1 or more",
                    got: 0,
                });
            }
            if let Some(bad) = args.iter().find(|t| t.contains(',')) {
                return Err(ConfigError::InvalidValue {
                    line,
                    reason: format!("policy type '{}' contains a comma", bad),
                    key,
                });
            }
            self.policy_types = args;
            return Ok(());
        }

        if !matches!(
            key.as_str(),
            "dbpath" | "table" | "bootstrap-policy" | "bootstrap-policy-file" | "batch-mode"
        ) {
            return Err(ConfigError::UnknownDirective { line, key });
        }
        if args.len() != 1 {
            return Err(ConfigError::WrongArity {
                line,
                key,
                expected: "1",
                got: args.len(),
            });
        }
        let value = args.remove(0);

        match key.as_str() {
            "dbpath" => self.path = PathBuf::from(value),
            "table" => {
                if value.is_empty() {
                    return Err(ConfigError::InvalidValue {
                        line,
                        key: key.clone(),
                        reason: "table name is empty".to_string(),
                    });
                }
                self.table = value;
            }
            "bootstrap-policy" => self.bootstrap_policy = Some(value),
            "bootstrap-policy-file" => self.bootstrap_policy_file = Some(PathBuf::from(value)),
            _ => {
                self.batch_mode = value.parse().map_err(|reason| ConfigError::InvalidValue {
                    line,
                    key: key.clone(),
                    reason,
                })?;
            }
        }
        Ok(())
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_bootstrap_policy(mut self, policy: impl Into<String>) -> Self {
        self.bootstrap_policy = Some(policy.into());
        self
    }

    pub fn with_bootstrap_policy_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.bootstrap_policy_file = Some(path.into());
        self
    }

    pub fn with_batch_mode(mut self, batch_mode: BatchMode) -> Self {
        self.batch_mode = batch_mode;
        self
    }

    pub fn with_policy_types<S: Into<String>>(
        mut self,
        types: impl IntoIterator<Item = S>,
    ) -> Self {
        self.policy_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Combined bootstrap policy: inline text, then the file's contents
    pub fn bootstrap_text(&self) -> Result<Option<String>, ConfigError> {
        let mut parts = Vec::new();
        if let Some(inline) = &self.bootstrap_policy {
            parts.push(inline.clone());
        }
        if let Some(path) = &self.bootstrap_policy_file {
            let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            parts.push(text);
        }

        if parts.is_empty() {
            Ok(None)
        } else {
            Ok(Some(parts.join("\n")))
        }
    }

    /// An empty model with the configured policy types
    pub fn empty_model(&self) -> Result<PolicyModel, ModelError> {
        PolicyModel::with_policy_types(self.policy_types.as_slice())
    }
}
