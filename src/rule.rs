// Rule record - the fixed-width shape every policy rule is stored as

use serde::{Deserialize, Serialize};

/// Number of positional field slots a stored rule carries
pub const MAX_FIELDS: usize = 6;

/// Selects one column of a stored rule record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    PolicyType,
    V0,
    V1,
    V2,
    V3,
    V4,
    V5,
}

impl Field {
    /// Positional slots in storage order
    pub const SLOTS: [Field; MAX_FIELDS] = [
        Field::V0,
        Field::V1,
        Field::V2,
        Field::V3,
        Field::V4,
        Field::V5,
    ];

    /// Map a positional index (0..=5) to its slot
    pub fn at(index: usize) -> Option<Field> {
        Self::SLOTS.get(index).copied()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Field::PolicyType => "ptype",
            Field::V0 => "v0",
            Field::V1 => "v1",
            Field::V2 => "v2",
            Field::V3 => "v3",
            Field::V4 => "v4",
            Field::V5 => "v5",
        }
    }
}

/// A single persisted policy rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub ptype: String,
    pub v0: String,
    pub v1: String,
    pub v2: String,
    pub v3: String,
    pub v4: String,
    pub v5: String,
}

/// Returned when a rule has more positional fields than a record can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleTooLong(pub usize);

impl PolicyRecord {
    /// Build a record from a policy type and its positional fields.
    ///
    /// Slots are filled left to right; slots past the rule's arity stay empty.
    pub fn from_rule<S: AsRef<str>>(ptype: &str, rule: &[S]) -> Result<Self, RuleTooLong> {
        if rule.len() > MAX_FIELDS {
            return Err(RuleTooLong(rule.len()));
        }

        let mut record = PolicyRecord {
            ptype: ptype.to_string(),
            ..Default::default()
        };
        for (slot, value) in Field::SLOTS.iter().zip(rule) {
            *record.get_mut(*slot) = value.as_ref().to_string();
        }
        Ok(record)
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::PolicyType => &self.ptype,
            Field::V0 => &self.v0,
            Field::V1 => &self.v1,
            Field::V2 => &self.v2,
            Field::V3 => &self.v3,
            Field::V4 => &self.v4,
            Field::V5 => &self.v5,
        }
    }

    fn get_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::PolicyType => &mut self.ptype,
            Field::V0 => &mut self.v0,
            Field::V1 => &mut self.v1,
            Field::V2 => &mut self.v2,
            Field::V3 => &mut self.v3,
            Field::V4 => &mut self.v4,
            Field::V5 => &mut self.v5,
        }
    }

    /// Positional fields with trailing empty slots dropped
    pub fn fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Field::SLOTS.iter().map(|f| self.get(*f)).collect();
        while fields.last().is_some_and(|f| f.is_empty()) {
            fields.pop();
        }
        fields
    }

    /// Render the record as a policy line: `ptype, v0, v1, ...`
    ///
    /// Trailing empty fields are omitted. Fields that would not survive CSV
    /// tokenizing unchanged are quoted.
    pub fn load_line(&self) -> String {
        let mut line = quote_field(&self.ptype);
        for field in self.fields() {
            line.push_str(", ");
            line.push_str(&quote_field(field));
        }
        line
    }
}

fn quote_field(value: &str) -> String {
    let needs_quotes = value.contains([',', '"', '\n', '\r'])
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace);
    if needs_quotes {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rule_fills_left_to_right() {
        let record = PolicyRecord::from_rule("p", &["alice", "data1", "read"]).unwrap();

        assert_eq!(record.ptype, "p");
        assert_eq!(record.v0, "alice");
        assert_eq!(record.v1, "data1");
        assert_eq!(record.v2, "read");
        assert_eq!(record.v3, "");
        assert_eq!(record.v5, "");
    }

    #[test]
    fn test_from_rule_rejects_seven_fields() {
        let rule = ["a", "b", "c", "d", "e", "f", "g"];
        assert_eq!(PolicyRecord::from_rule("p", &rule), Err(RuleTooLong(7)));
    }

    #[test]
    fn test_field_at() {
        assert_eq!(Field::at(0), Some(Field::V0));
        assert_eq!(Field::at(5), Some(Field::V5));
        assert_eq!(Field::at(6), None);
    }

    #[test]
    fn test_load_line_omits_trailing_empties() {
        let record = PolicyRecord::from_rule("g", &["alice", "admin", "", ""]).unwrap();
        assert_eq!(record.load_line(), "g, alice, admin");
    }

    #[test]
    fn test_load_line_keeps_interior_empties() {
        let record = PolicyRecord::from_rule("p", &["alice", "", "read"]).unwrap();
        assert_eq!(record.load_line(), "p, alice, , read");
    }

    #[test]
    fn test_load_line_quotes_special_values() {
        let record = PolicyRecord::from_rule("p", &["alice", "data,1", "say \"hi\""]).unwrap();
        assert_eq!(
            record.load_line(),
            "p, alice, \"data,1\", \"say \"\"hi\"\"\""
        );
    }

    #[test]
    fn test_type_only_record() {
        let record = PolicyRecord::from_rule::<&str>("p", &[]).unwrap();
        assert_eq!(record.load_line(), "p");
        assert!(record.fields().is_empty());
    }
}
