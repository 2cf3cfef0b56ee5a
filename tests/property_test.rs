// Property tests for rule records, policy lines and filtered removal

use proptest::prelude::*;
use redb_policy_adapter::adapter::filter_query;
use redb_policy_adapter::model::parse_csv_line;
use redb_policy_adapter::{
    Adapter, BatchAdapter, PolicyModel, PolicyRecord, RedbAdapter, RuleStore, DEFAULT_TABLE,
    MAX_FIELDS,
};
use std::sync::Arc;

fn arb_ptype() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("p".to_string()),
        Just("p2".to_string()),
        Just("g".to_string()),
        Just("g2".to_string()),
    ]
}

// Anything a single policy line can carry, including separators and quotes
fn arb_value() -> impl Strategy<Value = String> {
    "[a-z0-9 ,\"#*/_-]{0,8}"
}

fn arb_rule(max_len: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_value(), 0..=max_len)
}

fn arb_simple_rule() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-c]{1,2}", 1..=3)
}

fn trim_trailing_empties(rule: &[String]) -> Vec<String> {
    let mut rule = rule.to_vec();
    while rule.last().is_some_and(|f| f.is_empty()) {
        rule.pop();
    }
    rule
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_from_rule_keeps_fields(ptype in arb_ptype(), rule in arb_rule(MAX_FIELDS)) {
        let record = PolicyRecord::from_rule(&ptype, rule.as_slice()).unwrap();

        prop_assert_eq!(&record.ptype, &ptype);
        let fields: Vec<String> = record.fields().into_iter().map(String::from).collect();
        prop_assert_eq!(fields, trim_trailing_empties(&rule));
    }

    #[test]
    fn prop_from_rule_rejects_long_rules(
        rule in prop::collection::vec(arb_value(), MAX_FIELDS + 1..MAX_FIELDS + 5)
    ) {
        let err = PolicyRecord::from_rule("p", rule.as_slice()).unwrap_err();
        prop_assert_eq!(err.0, rule.len());
    }

    #[test]
    fn prop_load_line_tokenizes_back(ptype in arb_ptype(), rule in arb_rule(MAX_FIELDS)) {
        let record = PolicyRecord::from_rule(&ptype, rule.as_slice()).unwrap();
        let tokens = parse_csv_line(&record.load_line()).unwrap();

        let mut expected = vec![ptype];
        expected.extend(trim_trailing_empties(&rule));
        prop_assert_eq!(tokens, expected);
    }

    #[test]
    fn prop_filter_predicates_stop_at_first_empty(
        ptype in arb_ptype(),
        values in prop::collection::vec(prop_oneof![Just(String::new()), "[a-z]{1,3}"], 0..=MAX_FIELDS)
    ) {
        let query = filter_query(&ptype, 0, &values).unwrap();
        let leading = values.iter().take_while(|v| !v.is_empty()).count();

        prop_assert_eq!(query.predicates().len(), leading + 1);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_stored_rules_load_back(rules in prop::collection::vec(arb_rule(MAX_FIELDS), 0..8)) {
        let store = RuleStore::in_memory(DEFAULT_TABLE).unwrap();
        let adapter = RedbAdapter::new(Arc::new(store), None);
        adapter.add_policies("p", "p", &rules).unwrap();

        let mut model = PolicyModel::with_policy_types(&["p"]).unwrap();
        adapter.load_policy(&mut model).unwrap();

        let mut loaded = model.get_policy("p", "p").to_vec();
        let mut expected: Vec<Vec<String>> =
            rules.iter().map(|r| trim_trailing_empties(r)).collect();
        loaded.sort();
        expected.sort();
        prop_assert_eq!(loaded, expected);
    }

    #[test]
    fn prop_filtered_removal_leaves_no_match(
        rules in prop::collection::vec(arb_simple_rule(), 1..10),
        prefix in prop::collection::vec("[a-c]{1,2}", 1..=2)
    ) {
        let store = RuleStore::in_memory(DEFAULT_TABLE).unwrap();
        let adapter = RedbAdapter::new(Arc::new(store), None);
        adapter.add_policies("p", "p", &rules).unwrap();

        adapter.remove_filtered_policy("p", "p", 0, &prefix).unwrap();

        let mut model = PolicyModel::with_policy_types(&["p"]).unwrap();
        adapter.load_policy(&mut model).unwrap();

        let survivors = rules.iter().filter(|r| !r.starts_with(&prefix)).count();
        prop_assert_eq!(model.get_policy("p", "p").len(), survivors);
        prop_assert!(model.get_policy("p", "p").iter().all(|r| !r.starts_with(&prefix)));
    }
}
