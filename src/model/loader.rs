// Policy line loader - feeds CSV policy lines into a PolicyModel

use super::csv::parse_csv_line;
use super::{section_of, ModelError, PolicyModel};

/// Load a single `ptype, v0, v1, ...` line into the model.
///
/// Blank lines and `#` comments are skipped. Returns whether a rule was added.
pub fn load_policy_line(line: &str, model: &mut PolicyModel) -> Result<bool, ModelError> {
    if line.is_empty() || line.starts_with('#') {
        return Ok(false);
    }

    let mut tokens = parse_csv_line(line)?.into_iter();
    let ptype = tokens.next().unwrap_or_default();
    let sec = section_of(&ptype).ok_or_else(|| ModelError::MissingPolicyType(line.to_string()))?;

    model.add_policy(sec, &ptype, tokens.collect())?;
    Ok(true)
}

/// Load newline-separated policy text, stopping at the first bad line.
///
/// Each line is trimmed before loading. Returns the number of rules added.
pub fn load_policy_text(text: &str, model: &mut PolicyModel) -> Result<usize, ModelError> {
    let mut loaded = 0;
    for line in text.lines() {
        if load_policy_line(line.trim(), model)? {
            loaded += 1;
        }
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ParseError;

    fn model() -> PolicyModel {
        PolicyModel::with_policy_types(&["p", "g", "g2"]).unwrap()
    }

    #[test]
    fn test_load_line_into_section() {
        let mut model = model();

        assert!(load_policy_line("p, alice, data1, read", &mut model).unwrap());
        assert!(load_policy_line("g2, data1, data_group", &mut model).unwrap());

        assert_eq!(
            model.get_policy("p", "p"),
            &[vec!["alice".to_string(), "data1".to_string(), "read".to_string()]]
        );
        assert_eq!(model.get_policy("g", "g2").len(), 1);
        assert!(model.get_policy("g", "g").is_empty());
    }

    #[test]
    fn test_blank_and_comment_lines_are_skipped() {
        let mut model = model();
        assert!(!load_policy_line("", &mut model).unwrap());
        assert!(!load_policy_line("# p, alice, data1, read", &mut model).unwrap());
        assert_eq!(model.rule_count(), 0);
    }

    #[test]
    fn test_missing_policy_type() {
        let mut model = model();
        let err = load_policy_line(", alice", &mut model).unwrap_err();
        assert!(matches!(err, ModelError::MissingPolicyType(_)));
    }

    #[test]
    fn test_unknown_policy_type() {
        let mut model = model();
        let err = load_policy_line("x, alice", &mut model).unwrap_err();
        assert!(matches!(err, ModelError::UnknownPolicyType { .. }));
    }

    #[test]
    fn test_load_bootstrap_text() {
        let mut model = model();
        let text = "p, alice, data1, read\n# comment\n\np, bob, data2, write";

        assert_eq!(load_policy_text(text, &mut model).unwrap(), 2);
        assert_eq!(model.get_policy("p", "p").len(), 2);
    }

    #[test]
    fn test_lines_are_trimmed() {
        let mut model = model();
        let text = "   p, alice, data1, read  \r\n\t# indented comment\n";

        assert_eq!(load_policy_text(text, &mut model).unwrap(), 1);
        assert_eq!(model.get_policy("p", "p")[0][2], "read");
    }

    #[test]
    fn test_malformed_line_aborts_but_keeps_earlier_rules() {
        let mut model = model();
        let text = "p, alice, data1, read\np, b\"ob, data2\np, carol, data3, read";

        let err = load_policy_text(text, &mut model).unwrap_err();
        assert!(matches!(err, ModelError::Parse(ParseError::BareQuote { .. })));
        assert_eq!(model.get_policy("p", "p").len(), 1);
    }
}
