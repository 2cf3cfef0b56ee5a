// Policy model - in-memory rule lists grouped by section and policy type
//
// This is the shape the adapter fills on load: a section ("p", "g", ...) holds
// one assertion per policy type ("p", "g", "g2", ...), and each assertion holds
// the positional rules loaded for that type.

mod csv;
mod loader;

pub use csv::{parse_csv_line, ParseError};
pub use loader::{load_policy_line, load_policy_text};

use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("policy line has no policy type: {0:?}")]
    MissingPolicyType(String),

    #[error("unknown policy type '{ptype}' in section '{sec}'")]
    UnknownPolicyType { sec: String, ptype: String },

    #[error("policy type '{key}' does not belong to section '{sec}'")]
    SectionMismatch { sec: String, key: String },
}

/// One policy type's definition and its loaded rules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assertion {
    pub key: String,
    pub value: String,
    pub policy: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct PolicyModel {
    sections: BTreeMap<String, BTreeMap<String, Assertion>>,
}

impl PolicyModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Model with one empty assertion per policy type, each filed under the
    /// section named by the type's first character
    pub fn with_policy_types<S: AsRef<str>>(types: &[S]) -> Result<Self, ModelError> {
        let mut model = Self::new();
        for ptype in types {
            let ptype = ptype.as_ref();
            let sec = section_of(ptype)
                .ok_or_else(|| ModelError::MissingPolicyType(ptype.to_string()))?;
            model.add_def(sec, ptype, "")?;
        }
        Ok(model)
    }

    /// Register a policy type under `sec`. Re-registering keeps loaded rules.
    pub fn add_def(&mut self, sec: &str, key: &str, value: &str) -> Result<(), ModelError> {
        if section_of(key) != Some(sec) {
            return Err(ModelError::SectionMismatch {
                sec: sec.to_string(),
                key: key.to_string(),
            });
        }

        let assertion = self
            .sections
            .entry(sec.to_string())
            .or_default()
            .entry(key.to_string())
            .or_insert_with(|| Assertion {
                key: key.to_string(),
                ..Default::default()
            });
        assertion.value = value.to_string();
        Ok(())
    }

    pub fn assertion(&self, sec: &str, ptype: &str) -> Option<&Assertion> {
        self.sections.get(sec).and_then(|types| types.get(ptype))
    }

    pub fn assertion_mut(&mut self, sec: &str, ptype: &str) -> Option<&mut Assertion> {
        self.sections.get_mut(sec).and_then(|types| types.get_mut(ptype))
    }

    /// Append a rule to a registered policy type
    pub fn add_policy(
        &mut self,
        sec: &str,
        ptype: &str,
        rule: Vec<String>,
    ) -> Result<(), ModelError> {
        let assertion =
            self.assertion_mut(sec, ptype)
                .ok_or_else(|| ModelError::UnknownPolicyType {
                    sec: sec.to_string(),
                    ptype: ptype.to_string(),
                })?;
        assertion.policy.push(rule);
        Ok(())
    }

    pub fn get_policy(&self, sec: &str, ptype: &str) -> &[Vec<String>] {
        self.assertion(sec, ptype)
            .map(|a| a.policy.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_policy<S: AsRef<str>>(&self, sec: &str, ptype: &str, rule: &[S]) -> bool {
        self.get_policy(sec, ptype).iter().any(|existing| {
            existing.len() == rule.len()
                && existing.iter().zip(rule).all(|(a, b)| a == b.as_ref())
        })
    }

    /// Registered `(section, policy type)` pairs
    pub fn policy_types(&self) -> impl Iterator<Item = (&str, &str)> {
        self.sections.iter().flat_map(|(sec, types)| {
            types.keys().map(move |ptype| (sec.as_str(), ptype.as_str()))
        })
    }

    pub fn rule_count(&self) -> usize {
        self.sections
            .values()
            .flat_map(|types| types.values())
            .map(|a| a.policy.len())
            .sum()
    }
}

/// Section a policy type belongs to: its first character
pub fn section_of(ptype: &str) -> Option<&str> {
    let first = ptype.chars().next()?;
    Some(&ptype[..first.len_utf8()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_policy_types() {
        let model = PolicyModel::with_policy_types(&["p", "g", "g2"]).unwrap();
        let types: Vec<_> = model.policy_types().collect();

        assert_eq!(types, vec![("g", "g"), ("g", "g2"), ("p", "p")]);
        assert_eq!(model.rule_count(), 0);
    }

    #[test]
    fn test_add_def_rejects_wrong_section() {
        let mut model = PolicyModel::new();
        let err = model.add_def("p", "g", "_, _").unwrap_err();
        assert!(matches!(err, ModelError::SectionMismatch { .. }));
    }

    #[test]
    fn test_add_and_query_policy() {
        let mut model = PolicyModel::with_policy_types(&["p"]).unwrap();
        model
            .add_policy("p", "p", vec!["alice".into(), "data1".into(), "read".into()])
            .unwrap();

        assert!(model.has_policy("p", "p", &["alice", "data1", "read"]));
        assert!(!model.has_policy("p", "p", &["alice", "data1"]));
        assert_eq!(model.get_policy("p", "p").len(), 1);
        assert!(model.get_policy("g", "g").is_empty());
    }

    #[test]
    fn test_add_policy_unknown_type() {
        let mut model = PolicyModel::with_policy_types(&["p"]).unwrap();
        let err = model.add_policy("g", "g", vec!["alice".into()]).unwrap_err();
        assert_eq!(
            err,
            ModelError::UnknownPolicyType {
                sec: "g".to_string(),
                ptype: "g".to_string()
            }
        );
    }

    #[test]
    fn test_section_of() {
        assert_eq!(section_of("p"), Some("p"));
        assert_eq!(section_of("g2"), Some("g"));
        assert_eq!(section_of("édit"), Some("é"));
        assert_eq!(section_of(""), None);
    }

    #[test]
    fn test_redefining_keeps_rules() {
        let mut model = PolicyModel::with_policy_types(&["p"]).unwrap();
        model.add_policy("p", "p", vec!["alice".into()]).unwrap();
        model.add_def("p", "p", "sub, obj, act").unwrap();

        let assertion = model.assertion("p", "p").unwrap();
        assert_eq!(assertion.value, "sub, obj, act");
        assert_eq!(assertion.policy.len(), 1);
    }
}
