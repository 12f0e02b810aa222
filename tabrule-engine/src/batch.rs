//! Batch evaluation and the async category pre-pass.
//!
//! ```text
//! records ──► materialize_categories (async, join_all) ──► Indexer::build
//!                                                               │
//!             rules ──► matching_tabs (sync) ──► plan_intents ◄─┘
//! ```

use crate::evaluator::matching_tabs;
use crate::index::{Indexer, Indices};
use crate::intent::{plan_intents, ActionIntent};
use crate::resolve::EvalContext;
use async_trait::async_trait;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tabrule_core::{extract_domain, Category, CategoryLookup, EngineConfig, StaticCategoryTable, TabId, TabRecord, WindowRecord};
use tabrule_dsl::Rule;

/// Asynchronous domain→category source (storage, network).
#[async_trait]
pub trait CategoryResolver: Send + Sync {
    async fn resolve_categories(&self, domain: &str) -> Vec<Category>;
}

/// Resolve categories for every record that has none yet.
///
/// All lookups run concurrently and are gathered before returning, so the
/// synchronous evaluator only ever sees settled values. Records whose
/// categories are already `Some` keep them.
pub async fn materialize_categories(mut records: Vec<TabRecord>, resolver: &dyn CategoryResolver) -> Vec<TabRecord> {
    let pending: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.categories.is_none())
        .map(|(pos, _)| pos)
        .collect();

    let domains: Vec<String> = pending.iter().map(|&pos| extract_domain(&records[pos].url)).collect();
    let lookups = domains.iter().map(|domain| async move {
        if domain.is_empty() {
            Vec::new()
        } else {
            resolver.resolve_categories(domain).await
        }
    });
    let resolved = join_all(lookups).await;

    tracing::debug!(records = records.len(), resolved = resolved.len(), "materialized categories");
    for (pos, categories) in pending.into_iter().zip(resolved) {
        records[pos].categories = Some(categories);
    }
    records
}

// ============================================================================
// RULE ENGINE
// ============================================================================

/// Matches and planned intents for one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleMatch {
    pub rule: String,
    pub tab_ids: Vec<TabId>,
    pub intents: Vec<ActionIntent>,
}

/// Result of evaluating a batch of rules over one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// One entry per enabled rule, in input order.
    pub matches: Vec<RuleMatch>,
}

impl BatchOutcome {
    /// Every planned intent, rule order then action order.
    pub fn intents(&self) -> impl Iterator<Item = &ActionIntent> {
        self.matches.iter().flat_map(|m| m.intents.iter())
    }
}

/// Evaluates rules over tab snapshots.
pub struct RuleEngine {
    config: EngineConfig,
    lookup: Arc<dyn CategoryLookup>,
}

impl RuleEngine {
    pub fn new(config: EngineConfig, lookup: Arc<dyn CategoryLookup>) -> Self {
        Self { config, lookup }
    }

    /// Default config with the built-in category table.
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default(), Arc::new(StaticCategoryTable::with_defaults()))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build indices for one snapshot.
    pub fn index(&self, tabs: Vec<TabRecord>, windows: Vec<WindowRecord>) -> Indices {
        Indexer::new(&self.config, self.lookup.as_ref()).build(tabs, windows)
    }

    /// Evaluate one rule against prebuilt indices.
    pub fn evaluate_rule(&self, rule: &Rule, indices: &Indices, ctx: &EvalContext) -> RuleMatch {
        let positions = matching_tabs(rule, indices, ctx);
        let intents = plan_intents(rule, &positions, indices);
        RuleMatch {
            rule: rule.name.clone(),
            tab_ids: positions
                .iter()
                .filter_map(|&pos| indices.tab(pos).map(|t| t.id()))
                .collect(),
            intents,
        }
    }

    /// Index once, then evaluate every enabled rule.
    pub fn evaluate_batch(
        &self,
        rules: &[Rule],
        tabs: Vec<TabRecord>,
        windows: Vec<WindowRecord>,
        ctx: &EvalContext,
    ) -> BatchOutcome {
        let indices = self.index(tabs, windows);
        let matches: Vec<RuleMatch> = rules
            .iter()
            .filter(|rule| rule.enabled)
            .map(|rule| self.evaluate_rule(rule, &indices, ctx))
            .collect();
        tracing::debug!(
            rules = matches.len(),
            tabs = indices.len(),
            intents = matches.iter().map(|m| m.intents.len()).sum::<usize>(),
            "evaluated batch"
        );
        BatchOutcome { matches }
    }

    /// Materialize categories through `resolver`, then evaluate synchronously.
    pub async fn evaluate_batch_async(
        &self,
        rules: &[Rule],
        tabs: Vec<TabRecord>,
        windows: Vec<WindowRecord>,
        resolver: &dyn CategoryResolver,
        ctx: &EvalContext,
    ) -> BatchOutcome {
        let tabs = materialize_categories(tabs, resolver).await;
        self.evaluate_batch(rules, tabs, windows, ctx)
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tabrule_dsl::parse_dsl;

    /// Answers after yielding once, like a storage round trip.
    struct SlowResolver {
        calls: AtomicUsize,
    }

    impl SlowResolver {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CategoryResolver for SlowResolver {
        async fn resolve_categories(&self, domain: &str) -> Vec<Category> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            match domain {
                "nytimes.com" | "bbc.co.uk" => vec![Category::new("news_media")],
                "github.com" => vec![Category::new("dev_tools")],
                _ => Vec::new(),
            }
        }
    }

    fn records() -> Vec<TabRecord> {
        vec![
            TabRecord::new(1, 1, "https://www.nytimes.com/a"),
            TabRecord::new(2, 1, "https://github.com/rust-lang"),
            TabRecord::new(3, 1, "https://www.bbc.co.uk/news"),
            TabRecord::new(4, 2, "https://example.org/"),
            TabRecord::new(5, 2, "about:blank"),
        ]
    }

    #[tokio::test]
    async fn test_materialize_skips_resolved_records() {
        let mut tabs = records();
        tabs[1].categories = Some(vec![Category::new("pinned_work")]);
        let resolver = SlowResolver::new();

        let out = materialize_categories(tabs, &resolver).await;
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 3);
        assert_eq!(out[0].categories, Some(vec![Category::new("news_media")]));
        assert_eq!(out[1].categories, Some(vec![Category::new("pinned_work")]));
        assert_eq!(out[3].categories, Some(Vec::new()));
        assert_eq!(out[4].categories, Some(Vec::new()));
    }

    /// Filter verdict taken from an unawaited lookup. `filter` only accepts
    /// a `bool`, so a future cannot be the verdict itself; the closest form
    /// is "the lookup object exists", which holds for every tab.
    fn lookup_exists<T>(pending: &T) -> bool {
        std::mem::size_of_val(pending) > 0
    }

    #[tokio::test]
    async fn test_filtering_on_unawaited_lookup_keeps_every_tab() {
        let resolver = SlowResolver::new();
        let tabs = records();
        let is_news = |cats: &[Category]| cats.iter().any(|c| c.0 == "news_media");

        let naive = tabs
            .iter()
            .filter(|t| {
                let domain = extract_domain(&t.url);
                let pending = resolver.resolve_categories(&domain);
                lookup_exists(&pending)
            })
            .count();
        assert_eq!(naive, tabs.len());
        // None of those lookups ran.
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);

        let gathered = materialize_categories(tabs, &resolver).await;
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 5);
        let kept: Vec<TabId> = gathered
            .iter()
            .filter(|t| is_news(t.categories.as_deref().unwrap_or(&[])))
            .map(|t| t.id)
            .collect();
        assert_eq!(kept, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_async_batch_matches_sync_with_same_categories() {
        let rules = parse_dsl(
            r#"
            rule "News" { when tab.category contains "news_media" then snooze for 1d }
            rule "Off" disabled { when tab.id > 0 then close }
            "#,
        )
        .unwrap();
        let ctx = EvalContext::new(0);
        let engine = RuleEngine::new(EngineConfig::default(), Arc::new(StaticCategoryTable::new()));
        let resolver = SlowResolver::new();

        let outcome = engine
            .evaluate_batch_async(&rules, records(), Vec::new(), &resolver, &ctx)
            .await;
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].tab_ids, vec![1, 3]);

        let sync = RuleEngine::with_defaults().evaluate_batch(&rules, records(), Vec::new(), &ctx);
        assert_eq!(sync, outcome);
    }

    #[test]
    fn test_evaluate_batch_plans_keep_first() {
        let rules = parse_dsl(r#"rule "Dedupe" { when tab.isDupe is true then close keepFirst }"#).unwrap();
        let tabs = vec![
            TabRecord::new(1, 1, "https://a.com/x?1"),
            TabRecord::new(2, 1, "https://a.com/x?2"),
            TabRecord::new(3, 1, "https://a.com/y"),
        ];
        let outcome = RuleEngine::default().evaluate_batch(&rules, tabs, Vec::new(), &EvalContext::new(0));
        assert_eq!(outcome.matches[0].tab_ids, vec![1, 2]);
        let intents: Vec<&ActionIntent> = outcome.intents().collect();
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].tab_ids, vec![2]);
    }
}
