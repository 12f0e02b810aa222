//! Tabrule Test Utilities
//!
//! Shared test infrastructure for the Tabrule workspace:
//! - Proptest generators for rules and tab records
//! - Mock category resolver and action executor
//! - Tab fixtures for common scenarios
//! - Assertions for DSL validation and round trips
//!
//! Only integration tests (`tests/`) may depend on this crate; in-crate
//! unit tests would see two copies of the engine types.

// Re-export core types for convenience
pub use tabrule_core::{Category, EngineConfig, EpochMs, StaticCategoryTable, TabId, TabRecord, WindowRecord};
pub use tabrule_dsl::{Action, Condition, Literal, Rule, Trigger};
pub use tabrule_engine::{ActionExecutor, ActionIntent, CategoryResolver, EvalContext, ExecutionReport};

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tabrule_core::CategoryLookup;

// ============================================================================
// MOCKS
// ============================================================================

/// Category resolver backed by a static table that yields before answering.
pub struct MockCategoryResolver {
    table: StaticCategoryTable,
    calls: AtomicUsize,
}

impl MockCategoryResolver {
    pub fn new(table: StaticCategoryTable) -> Self {
        Self {
            table,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of lookups served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockCategoryResolver {
    fn default() -> Self {
        Self::new(StaticCategoryTable::with_defaults())
    }
}

#[async_trait]
impl CategoryResolver for MockCategoryResolver {
    async fn resolve_categories(&self, domain: &str) -> Vec<Category> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.table.categories_of(domain)
    }
}

/// Executor that records every intent and fails chosen actions.
#[derive(Default)]
pub struct MockExecutor {
    executed: Mutex<Vec<ActionIntent>>,
    failing: HashSet<&'static str>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report failure for every intent whose action has this name.
    pub fn failing_on(mut self, action: &'static str) -> Self {
        self.failing.insert(action);
        self
    }

    /// Intents seen so far, in execution order.
    pub fn executed(&self) -> Vec<ActionIntent> {
        match self.executed.lock() {
            Ok(executed) => executed.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl ActionExecutor for MockExecutor {
    async fn execute(&self, intent: &ActionIntent) -> ExecutionReport {
        match self.executed.lock() {
            Ok(mut executed) => executed.push(intent.clone()),
            Err(poisoned) => poisoned.into_inner().push(intent.clone()),
        }
        let name = intent.action.name();
        if self.failing.contains(name) {
            ExecutionReport::failed(format!("mock failure for '{}'", name))
        } else {
            ExecutionReport::ok()
        }
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for rules and tab records.
    //!
    //! Rule generators only produce rules the compiler accepts, so every
    //! generated rule survives `validate_dsl` after printing.

    use super::*;
    use proptest::prelude::*;
    use tabrule_dsl::{flags, FlagSet, RegexLiteral, WakeTarget};

    /// Reference instant for generated records.
    pub const GEN_NOW: EpochMs = 1_700_000_000_000;

    /// A rule name, including characters that need escaping.
    pub fn arb_rule_name() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9 _\"\\\\-]{0,20}"
    }

    /// A short string that may need escaping.
    pub fn arb_text() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 _.\\-\"\\\\/\n\t]{0,12}"
    }

    /// A duration literal such as `30m` or `7d`.
    pub fn arb_duration() -> impl Strategy<Value = String> {
        (1u32..1000, prop_oneof![Just('m'), Just('h'), Just('d')])
            .prop_map(|(n, unit)| format!("{}{}", n, unit))
    }

    /// A resolvable attribute path.
    pub fn arb_path() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("tab.age".to_string()),
            Just("tab.lastAccessed".to_string()),
            Just("tab.domain".to_string()),
            Just("tab.origin".to_string()),
            Just("tab.title".to_string()),
            Just("tab.url".to_string()),
            Just("tab.category".to_string()),
            Just("tab.isPinned".to_string()),
            Just("tab.isDupe".to_string()),
            Just("tab.dupeCount".to_string()),
            Just("tab.countPerOrigin:domain".to_string()),
            Just("window.tabCount".to_string()),
        ]
    }

    /// A scalar comparison operand (never a list).
    pub fn arb_scalar() -> impl Strategy<Value = Literal> {
        prop_oneof![
            arb_text().prop_map(Literal::String),
            arb_duration().prop_map(Literal::String),
            (-400i32..400).prop_map(|n| Literal::Number(f64::from(n) / 4.0)),
            any::<bool>().prop_map(Literal::Bool),
        ]
    }

    pub fn arb_regex() -> impl Strategy<Value = RegexLiteral> {
        prop_oneof![
            ("[a-z]{1,6}", "[im]{0,1}").prop_map(|(p, f)| RegexLiteral::new(format!("/{}/{}", p, f))),
            "\\^?[a-z]{1,6}\\$?".prop_map(RegexLiteral::new),
        ]
    }

    /// A leaf comparison with an operand valid for its operator.
    pub fn arb_leaf() -> impl Strategy<Value = Condition> {
        prop_oneof![
            (arb_path(), arb_scalar()).prop_map(|(p, l)| Condition::Eq(p, l)),
            (arb_path(), arb_scalar()).prop_map(|(p, l)| Condition::Neq(p, l)),
            (arb_path(), arb_duration()).prop_map(|(p, d)| Condition::Gt(p, Literal::String(d))),
            (arb_path(), arb_duration()).prop_map(|(p, d)| Condition::Lte(p, Literal::String(d))),
            (arb_path(), prop::collection::vec(arb_text(), 0..3))
                .prop_map(|(p, items)| Condition::In(p, Literal::List(items))),
            (arb_path(), arb_text()).prop_map(|(p, s)| Condition::Contains(p, Literal::String(s))),
            (arb_path(), prop_oneof![Just(Literal::Bool(true)), Just(Literal::Bool(false)), Just(Literal::Null)])
                .prop_map(|(p, l)| Condition::Is(p, l)),
            (arb_path(), arb_regex()).prop_map(|(p, r)| Condition::Regex(p, r)),
        ]
    }

    /// A condition tree up to three levels deep.
    pub fn arb_condition() -> impl Strategy<Value = Condition> {
        arb_leaf().prop_recursive(3, 16, 3, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 1..4).prop_map(Condition::All),
                prop::collection::vec(inner, 1..4).prop_map(Condition::Any),
            ]
        })
    }

    pub fn arb_action() -> impl Strategy<Value = Action> {
        prop_oneof![
            any::<bool>().prop_map(|keep_first| Action::Close { keep_first }),
            (
                prop::option::of(arb_text()),
                prop::option::of(Just("domain".to_string())),
                any::<bool>()
            )
                .prop_map(|(name, by, create_if_missing)| Action::Group {
                    name,
                    by,
                    create_if_missing
                }),
            (
                arb_duration(),
                prop::option::of(prop_oneof![
                    Just(WakeTarget::SameWindow),
                    Just(WakeTarget::NewWindow),
                    Just(WakeTarget::OriginalWindow),
                ])
            )
                .prop_map(|(duration, wake_into)| Action::Snooze { duration, wake_into }),
            Just(Action::Suspend),
        ]
    }

    pub fn arb_trigger() -> impl Strategy<Value = Trigger> {
        prop_oneof![
            Just(Trigger::Immediate),
            Just(Trigger::Manual),
            Just(Trigger::OnAction),
            arb_duration().prop_map(Trigger::RepeatEvery),
            (0u32..28).prop_map(|day| Trigger::OnceAt(format!("2026-02-{:02}T09:00:00Z", day + 1))),
        ]
    }

    pub fn arb_flags() -> impl Strategy<Value = FlagSet> {
        prop::collection::vec(
            prop_oneof![Just(flags::SKIP_PINNED), Just(flags::LOG), Just(flags::IMMEDIATE)],
            0..3,
        )
        .prop_map(|names| names.into_iter().fold(FlagSet::new(), |set, name| set.with(name)))
    }

    /// A rule the compiler accepts.
    pub fn arb_rule() -> impl Strategy<Value = Rule> {
        (
            arb_rule_name(),
            any::<bool>(),
            prop::option::of(arb_condition()),
            prop::collection::vec(arb_action(), 0..3),
            prop::option::of(arb_trigger()),
            arb_flags(),
        )
            .prop_map(|(name, enabled, when, then, trigger, flags)| Rule {
                id: None,
                name,
                enabled,
                when,
                then,
                trigger,
                flags,
            })
    }

    /// Several rules with distinct names.
    pub fn arb_rule_set() -> impl Strategy<Value = Vec<Rule>> {
        prop::collection::vec(arb_rule(), 0..5).prop_map(|rules| {
            rules
                .into_iter()
                .enumerate()
                .map(|(i, rule)| {
                    let name = format!("{} #{}", rule.name, i);
                    Rule { name, ..rule }
                })
                .collect()
        })
    }

    /// A URL over a small host pool, so duplicates and shared domains occur.
    pub fn arb_url() -> impl Strategy<Value = String> {
        (
            prop_oneof![
                Just("https://www.reddit.com"),
                Just("https://github.com"),
                Just("https://www.nytimes.com"),
                Just("https://example.org"),
            ],
            prop_oneof![Just("/"), Just("/a"), Just("/b")],
            prop_oneof![Just(""), Just("?q=1"), Just("#top")],
        )
            .prop_map(|(host, path, suffix)| format!("{}{}{}", host, path, suffix))
    }

    /// A tab record with ages within thirty days of `GEN_NOW`.
    pub fn arb_tab_record(id: TabId) -> impl Strategy<Value = TabRecord> {
        (
            1i64..4,
            arb_url(),
            prop::option::of(prop_oneof![
                Just("https://www.google.com/search".to_string()),
                Just("https://news.ycombinator.com/".to_string()),
            ]),
            0i64..30 * 86_400_000,
            0i64..30 * 86_400_000,
            any::<bool>(),
        )
            .prop_map(move |(window, url, referrer, age, idle, pinned)| {
                let mut tab = TabRecord::new(id, window, url);
                tab.referrer = referrer;
                tab.created_at = GEN_NOW - age;
                tab.last_accessed = GEN_NOW - idle.min(age);
                tab.pinned = pinned;
                tab
            })
    }

    /// A batch of tab records with ids `1..=n`.
    pub fn arb_tab_batch(max: usize) -> impl Strategy<Value = Vec<TabRecord>> {
        (0..=max).prop_flat_map(|n| {
            (1..=n as TabId)
                .map(arb_tab_record)
                .collect::<Vec<_>>()
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built tab sessions for common scenarios.

    use super::*;

    pub const MINUTE: EpochMs = 60_000;
    pub const HOUR: EpochMs = 60 * MINUTE;
    pub const DAY: EpochMs = 24 * HOUR;

    /// Reference instant shared by the fixtures.
    pub const NOW: EpochMs = 1_760_000_000_000;

    /// Builder for a single tab record.
    #[derive(Debug, Clone)]
    pub struct TabBuilder {
        record: TabRecord,
    }

    impl TabBuilder {
        pub fn new(id: TabId, url: &str) -> Self {
            let mut record = TabRecord::new(id, 1, url);
            record.created_at = NOW;
            record.last_accessed = NOW;
            Self { record }
        }

        pub fn window(mut self, window: i64) -> Self {
            self.record.window_id = window;
            self
        }

        pub fn title(mut self, title: &str) -> Self {
            self.record.title = title.to_string();
            self
        }

        pub fn referrer(mut self, referrer: &str) -> Self {
            self.record.referrer = Some(referrer.to_string());
            self
        }

        pub fn aged(mut self, age: EpochMs) -> Self {
            self.record.created_at = NOW - age;
            self
        }

        pub fn idle(mut self, idle: EpochMs) -> Self {
            self.record.last_accessed = NOW - idle;
            self
        }

        pub fn pinned(mut self) -> Self {
            self.record.pinned = true;
            self
        }

        pub fn audible(mut self) -> Self {
            self.record.audible = true;
            self
        }

        pub fn categories(mut self, categories: &[&str]) -> Self {
            self.record.categories = Some(categories.iter().map(|c| Category::new(*c)).collect());
            self
        }

        pub fn build(self) -> TabRecord {
            self.record
        }
    }

    pub fn tab(id: TabId, url: &str) -> TabBuilder {
        TabBuilder::new(id, url)
    }

    /// Context anchored at `NOW`.
    pub fn ctx() -> EvalContext {
        EvalContext::new(NOW)
    }

    /// A mixed session over two windows.
    ///
    /// | id | url                                   | notes                      |
    /// |----|---------------------------------------|----------------------------|
    /// | 1  | reddit.com/r/rust?sort=new            | from google, 8 days old    |
    /// | 2  | github.com/rust-lang/rust             | pinned                     |
    /// | 3  | reddit.com/r/rust#comments            | dupe of 1, from google     |
    /// | 4  | nytimes.com/section/world             | idle 3 hours, audible      |
    /// | 5  | reddit.com/r/rust                     | dupe of 1, window 2        |
    /// | 6  | bbc.co.uk/news                        | window 2, 2 days old       |
    pub fn mixed_session() -> Vec<TabRecord> {
        vec![
            tab(1, "https://www.reddit.com/r/rust?sort=new")
                .title("r/rust")
                .referrer("https://www.google.com/search?q=rust")
                .aged(8 * DAY)
                .idle(2 * DAY)
                .build(),
            tab(2, "https://github.com/rust-lang/rust")
                .title("rust-lang/rust")
                .pinned()
                .aged(30 * DAY)
                .build(),
            tab(3, "https://www.reddit.com/r/rust#comments")
                .referrer("https://google.com/")
                .aged(HOUR)
                .build(),
            tab(4, "https://www.nytimes.com/section/world")
                .title("World News")
                .aged(DAY)
                .idle(3 * HOUR)
                .audible()
                .build(),
            tab(5, "https://www.reddit.com/r/rust")
                .window(2)
                .aged(10 * MINUTE)
                .build(),
            tab(6, "https://www.bbc.co.uk/news")
                .window(2)
                .aged(2 * DAY)
                .build(),
        ]
    }

    pub fn windows() -> Vec<WindowRecord> {
        vec![
            WindowRecord {
                id: 1,
                focused: true,
                incognito: false,
            },
            WindowRecord {
                id: 2,
                focused: false,
                incognito: false,
            },
        ]
    }

    /// `n` tabs cycling over `distinct` URLs, for duplicate stress tests.
    pub fn duplicate_heavy(n: usize, distinct: usize) -> Vec<TabRecord> {
        (0..n)
            .map(|i| {
                let url = format!("https://example.com/page/{}?visit={}", i % distinct.max(1), i);
                tab(i as TabId + 1, &url).aged(i as EpochMs * MINUTE).build()
            })
            .collect()
    }

    /// A rule file exercising every clause.
    pub const SAMPLE_RULES: &str = r#"
// Stale tabs
rule "Close old tabs" {
  when tab.age > 7d and tab.isPinned is false
  then close
  trigger repeat every 1h
  flags skipPinned
}

rule "Dedupe" {
  when tab.isDupe is true
  then close keepFirst
  trigger immediate
}

rule "News later" {
  when any(tab.category contains "news_media", tab.domain in ["nytimes.com", "bbc.co.uk"])
  then group name "News" createIfMissing and snooze for 2h wakeInto newWindow
  trigger on action
}

rule "Parked" disabled {
  when tab.lastAccessed > 1d
  then suspend
  trigger manual
}
"#;
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for DSL validation and round trips.

    use super::*;
    use tabrule_dsl::{parse_rule, serialize_rule_to_dsl, validate_dsl, ValidationResult};

    /// Assert that `source` validates and return its rules.
    #[track_caller]
    pub fn assert_valid_dsl(source: &str) -> Vec<Rule> {
        let result = validate_dsl(source);
        match result {
            ValidationResult {
                valid: true,
                rules: Some(rules),
                ..
            } => rules,
            other => panic!("Expected valid DSL, got: {:?}\nSource:\n{}", other, source),
        }
    }

    /// Assert that `source` is rejected with an error containing `needle`.
    #[track_caller]
    pub fn assert_invalid_dsl(source: &str, needle: &str) {
        let result = validate_dsl(source);
        assert!(!result.valid, "Expected invalid DSL, got: {:?}", result);
        let error = result.error.unwrap_or_default();
        assert!(
            error.contains(needle),
            "Expected error containing {:?}, got {:?}",
            needle,
            error
        );
    }

    /// Assert that printing then parsing `rule` gives it back.
    #[track_caller]
    pub fn assert_round_trip(rule: &Rule) {
        let printed = serialize_rule_to_dsl(rule);
        match parse_rule(&printed) {
            Ok(parsed) => assert_eq!(&parsed, rule, "Printed:\n{}", printed),
            Err(e) => panic!("Printed rule failed to parse: {}\nPrinted:\n{}", e, printed),
        }
    }

    /// Assert that every intent targets only the listed ids.
    #[track_caller]
    pub fn assert_targets(intent: &ActionIntent, expected: &[TabId]) {
        assert_eq!(
            intent.tab_ids, expected,
            "Intent '{}' of rule '{}' targeted the wrong tabs",
            intent.action.name(),
            intent.rule
        );
    }

    /// Assert that the compiled-rule JSON of `rule` equals `expected`.
    #[track_caller]
    pub fn assert_rule_json(rule: &Rule, expected: serde_json::Value) {
        match serde_json::to_value(rule) {
            Ok(actual) => assert_eq!(actual, expected),
            Err(e) => panic!("Rule failed to serialize: {}", e),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tabrule_engine::dispatch_intents;

    #[test]
    fn test_sample_rules_validate() {
        let rules = assertions::assert_valid_dsl(fixtures::SAMPLE_RULES);
        assert_eq!(rules.len(), 4);
        assert!(!rules[3].enabled);
    }

    #[test]
    fn test_mixed_session_shape() {
        let tabs = fixtures::mixed_session();
        assert_eq!(tabs.len(), 6);
        assert!(tabs[1].pinned);
        assert_eq!(tabs[4].window_id, 2);
    }

    #[test]
    fn test_duplicate_heavy_fixture() {
        let tabs = fixtures::duplicate_heavy(10, 3);
        assert_eq!(tabs.len(), 10);
        assert_eq!(tabs[0].url, "https://example.com/page/0?visit=0");
        assert_eq!(tabs[3].url, "https://example.com/page/0?visit=3");
    }

    #[tokio::test]
    async fn test_mock_resolver_counts_calls() {
        let resolver = MockCategoryResolver::default();
        let categories = resolver.resolve_categories("github.com").await;
        assert_eq!(categories, vec![Category::new("dev_tools")]);
        assert_eq!(resolver.calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_executor_records_and_fails() {
        let executor = MockExecutor::new().failing_on("close");
        let intents = vec![
            ActionIntent {
                rule: "R".into(),
                rule_id: None,
                action: Action::Suspend,
                tab_ids: vec![1],
            },
            ActionIntent {
                rule: "R".into(),
                rule_id: None,
                action: Action::Close { keep_first: false },
                tab_ids: vec![2],
            },
        ];
        let reports = dispatch_intents(&executor, &intents).await;
        assert!(reports[0].success);
        assert!(!reports[1].success);
        assert_eq!(executor.executed(), intents);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_generated_rules_validate(rule in generators::arb_rule()) {
            let source = tabrule_dsl::serialize_rule_to_dsl(&rule);
            let result = tabrule_dsl::validate_dsl(&source);
            prop_assert!(result.valid, "{:?}\n{}", result.error, source);
        }

        #[test]
        fn prop_tab_batch_ids_are_sequential(tabs in generators::arb_tab_batch(8)) {
            for (i, tab) in tabs.iter().enumerate() {
                prop_assert_eq!(tab.id, i as TabId + 1);
                prop_assert!(tab.last_accessed >= tab.created_at);
            }
        }
    }
}
