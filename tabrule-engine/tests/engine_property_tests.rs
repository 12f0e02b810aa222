//! Property-Based Tests for evaluation over generated tab batches
//!
//! Properties:
//! - Compiled rules never hit an invalid-AST error
//! - `all`/`any` agree with boolean conjunction/disjunction of their children
//! - `close keepFirst` never targets the first tab of a dupe-key group
//! - Duplicate groups are disjoint and hold two or more tabs

use proptest::prelude::*;
use std::collections::HashSet;
use tabrule_dsl::{Action, Condition, Rule};
use tabrule_engine::*;
use tabrule_test_utils::generators::{arb_condition, arb_rule, arb_tab_batch, GEN_NOW};

fn ctx() -> EvalContext {
    EvalContext::new(GEN_NOW)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_compiled_rules_evaluate_cleanly(rule in arb_rule(), tabs in arb_tab_batch(12)) {
        let engine = RuleEngine::with_defaults();
        let indices = engine.index(tabs, Vec::new());
        if let Some(when) = &rule.when {
            for tab in indices.tabs() {
                prop_assert!(try_evaluate(when, tab, &indices, &ctx()).is_ok());
            }
        }
        let matched = engine.evaluate_rule(&rule, &indices, &ctx());
        if !rule.enabled {
            prop_assert!(matched.tab_ids.is_empty());
        }
        for intent in &matched.intents {
            prop_assert!(!intent.tab_ids.is_empty());
            prop_assert!(intent.tab_ids.iter().all(|id| matched.tab_ids.contains(id)));
        }
    }

    #[test]
    fn prop_combinators_match_boolean_algebra(
        a in arb_condition(),
        b in arb_condition(),
        tabs in arb_tab_batch(8),
    ) {
        let indices = RuleEngine::with_defaults().index(tabs, Vec::new());
        let all = Condition::All(vec![a.clone(), b.clone()]);
        let any = Condition::Any(vec![a.clone(), b.clone()]);
        for tab in indices.tabs() {
            let (ea, eb) = (evaluate(&a, tab, &indices, &ctx()), evaluate(&b, tab, &indices, &ctx()));
            prop_assert_eq!(evaluate(&all, tab, &indices, &ctx()), ea && eb);
            prop_assert_eq!(evaluate(&any, tab, &indices, &ctx()), ea || eb);
            prop_assert_eq!(evaluate(&Condition::All(vec![a.clone()]), tab, &indices, &ctx()), ea);
        }
    }

    #[test]
    fn prop_keep_first_spares_group_heads(tabs in arb_tab_batch(20)) {
        let engine = RuleEngine::with_defaults();
        let indices = engine.index(tabs, Vec::new());
        let rule = Rule::new("Dedupe")
            .with_when(Condition::Is("tab.isDupe".into(), tabrule_dsl::Literal::Bool(true)))
            .with_action(Action::Close { keep_first: true });

        let heads: HashSet<i64> = find_duplicates(&indices).iter().map(|g| g[0]).collect();
        let matched = engine.evaluate_rule(&rule, &indices, &ctx());
        for intent in &matched.intents {
            prop_assert!(intent.tab_ids.iter().all(|id| !heads.contains(id)));
        }
        let targeted: usize = matched.intents.iter().map(|i| i.tab_ids.len()).sum();
        prop_assert_eq!(targeted + heads.len(), matched.tab_ids.len());
    }

    #[test]
    fn prop_duplicate_groups_are_disjoint(tabs in arb_tab_batch(20)) {
        let indices = RuleEngine::with_defaults().index(tabs, Vec::new());
        let mut seen = HashSet::new();
        for group in find_duplicates(&indices) {
            prop_assert!(group.len() >= 2);
            for id in group {
                prop_assert!(seen.insert(id), "tab {} in two groups", id);
            }
        }
    }
}
