//! Rule files and legacy exports, end to end through the public API.

use std::fs;
use std::path::PathBuf;
use tabrule_dsl::*;

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("read {}: {}", path.display(), e))
}

#[test]
fn tidy_rules_validate_and_compile() {
    let result = validate_dsl(&fixture("tidy.rules"));
    assert!(result.valid, "{:?}", result.error);
    let rules = result.rules.unwrap_or_default();
    let names: Vec<&str> = rules.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Close stale tabs",
            "Dedupe",
            "Group research",
            "Snooze news",
            "Busy window",
            "Placeholder"
        ]
    );

    let set = RuleSetCompiler::compile(rules).expect("compile");
    assert_eq!(set.enabled().count(), 5);
    assert!(set.get("Busy window").is_some_and(|r| !r.enabled));
    assert!(set.get("Placeholder").is_some_and(|r| r.when.is_none() && r.then.is_empty()));
}

#[test]
fn tidy_rules_clause_details() {
    let rules = parse_dsl(&fixture("tidy.rules")).expect("parse");

    assert_eq!(rules[0].trigger, Some(Trigger::RepeatEvery("1h".into())));
    assert_eq!(rules[0].trigger.as_ref().and_then(Trigger::interval_ms), Some(3_600_000));
    assert!(rules[0].has_flag(flags::SKIP_PINNED));

    assert_eq!(rules[1].then, vec![Action::Close { keep_first: true }]);
    assert_eq!(rules[2].trigger, Some(Trigger::OnAction));
    assert_eq!(
        rules[2].then,
        vec![Action::Group {
            name: None,
            by: Some("domain".into()),
            create_if_missing: true
        }]
    );

    assert_eq!(
        rules[3].then,
        vec![
            Action::Snooze {
                duration: "3h".into(),
                wake_into: Some(WakeTarget::OriginalWindow)
            },
            Action::Suspend
        ]
    );
    let once = rules[3].trigger.as_ref().and_then(Trigger::once_at_time);
    assert_eq!(once.map(|t| t.timestamp()), Some(1_793_520_000));

    let Some(Condition::All(children)) = &rules[4].when else {
        panic!("expected a conjunction");
    };
    assert_eq!(children[1].path(), Some("tab.countPerOrigin:domain"));
}

#[test]
fn tidy_rules_survive_print_and_reparse() {
    let rules = parse_dsl(&fixture("tidy.rules")).expect("parse");
    let printed = serialize_rules_to_dsl(&rules);
    let reparsed = parse_dsl(&printed).expect("reparse printed rules");
    assert_eq!(rules, reparsed);
    assert_eq!(printed, serialize_rules_to_dsl(&reparsed));
}

#[test]
fn fingerprint_ignores_comments_and_layout() {
    let source = fixture("tidy.rules");
    let original = RuleSetCompiler::compile(parse_dsl(&source).expect("parse")).expect("compile");

    let reflowed: String = source
        .lines()
        .filter(|line| !line.trim_start().starts_with("//"))
        .map(|line| format!("{}\n", line.trim()))
        .collect();
    let again = RuleSetCompiler::compile(parse_dsl(&reflowed).expect("parse")).expect("compile");
    assert_eq!(original.fingerprint(), again.fingerprint());

    let edited = source.replace("repeat every 1h", "repeat every 2h");
    let changed = RuleSetCompiler::compile(parse_dsl(&edited).expect("parse")).expect("compile");
    assert_ne!(original.fingerprint(), changed.fingerprint());
}

#[test]
fn compiled_json_is_stable() {
    let rules = parse_dsl(&fixture("tidy.rules")).expect("parse");
    let json = serde_json::to_value(&rules[0]).expect("serialize");
    assert_eq!(
        json,
        serde_json::json!({
            "name": "Close stale tabs",
            "enabled": true,
            "when": {"all": [{"gt": ["tab.age", "7d"]}, {"gt": ["tab.lastAccessed", "2d"]}]},
            "then": [{"action": "close"}],
            "trigger": {"repeat_every": "1h"},
            "flags": {"skipPinned": true}
        })
    );
    let back: Vec<Rule> = serde_json::from_value(serde_json::to_value(&rules).expect("serialize")).expect("deserialize");
    assert_eq!(back, rules);
}

#[test]
fn legacy_export_migrates_with_warnings() {
    let legacy: Vec<LegacyRule> = serde_json::from_str(&fixture("legacy_rules.json")).expect("legacy json");
    let (rules, warnings) = migrate_rules(&legacy);
    assert_eq!(rules.len(), 3);

    assert_eq!(rules[0].id.as_deref(), Some("legacy-1"));
    assert_eq!(rules[0].trigger, Some(Trigger::RepeatEvery("1h".into())));
    assert!(rules[0].has_flag(flags::SKIP_PINNED));
    assert_eq!(
        rules[0].when,
        Some(Condition::All(vec![
            Condition::Eq("tab.domain".into(), Literal::string("reddit.com")),
            Condition::Gt("tab.age".into(), Literal::string("3d")),
        ]))
    );

    assert_eq!(rules[1].trigger, Some(Trigger::Immediate));
    assert!(rules[1].has_flag(flags::IMMEDIATE));
    assert_eq!(rules[1].then, vec![Action::Close { keep_first: true }]);

    assert_eq!(rules[2].name, "Migrated rule legacy-3");
    assert!(!rules[2].enabled);
    assert!(rules[2].when.is_none());
    assert_eq!(
        rules[2].then,
        vec![Action::Snooze {
            duration: "90m".into(),
            wake_into: None
        }]
    );

    assert_eq!(warnings.len(), 2);
    assert!(matches!(warnings[0], MigrationWarning::IntervalIgnored { minutes: 15, .. }));
    assert!(matches!(warnings[1], MigrationWarning::UnknownCondition { ref kind, .. } if kind == "weather"));

    // Migrated rules join the normal pipeline.
    let source = serialize_rules_to_dsl(&rules);
    let result = validate_dsl(&source);
    assert!(result.valid, "{:?}\n{}", result.error, source);
}

#[test]
fn loosely_typed_legacy_export_still_migrates() {
    let legacy: Vec<LegacyRule> = serde_json::from_str(&fixture("legacy_loose.json")).expect("legacy json");
    let (rules, warnings) = migrate_rules(&legacy);
    let ids: Vec<&str> = rules.iter().filter_map(|r| r.id.as_deref()).collect();
    assert_eq!(ids, vec!["loose-1", "loose-2", "loose-3"]);

    assert_eq!(
        rules[0].when,
        Some(Condition::Gt("tab.age".into(), Literal::Number(90000.0)))
    );
    assert_eq!(
        rules[0].then,
        vec![Action::Snooze {
            duration: "2m".into(),
            wake_into: None
        }]
    );
    assert_eq!(rules[0].trigger, Some(Trigger::Manual));
    assert_eq!(rules[1].then, vec![Action::Suspend]);
    assert_eq!(rules[2].trigger, Some(Trigger::RepeatEvery("30m".into())));
    assert_eq!(rules[2].then, vec![Action::Close { keep_first: true }]);

    let kinds: Vec<&str> = warnings
        .iter()
        .map(|w| match w {
            MigrationWarning::UnknownCondition { .. } => "condition",
            MigrationWarning::UnknownAction { .. } => "action",
            MigrationWarning::InvalidActionValue { .. } => "action value",
            MigrationWarning::InvalidInterval { .. } => "interval",
            _ => "other",
        })
        .collect();
    assert_eq!(
        kinds,
        vec!["action value", "interval", "action value", "interval", "condition", "action"]
    );

    // Printed and re-read, the set behaves like hand-written rules.
    let source = serialize_rules_to_dsl(&rules);
    let reparsed = parse_dsl(&source).expect("migrated DSL parses");
    assert_eq!(reparsed.len(), 3);
    assert!(RuleSetCompiler::compile(reparsed).is_ok(), "{}", source);
}
