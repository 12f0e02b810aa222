//! Domain → category classification.
//!
//! The engine never reaches for a global table: a [`CategoryLookup`] is
//! injected wherever categories are needed, so tests can supply fakes.

use crate::error::CategoryError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A category label such as "social" or "news_media".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(pub String);

impl Category {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Synchronous domain → categories lookup.
pub trait CategoryLookup: Send + Sync {
    /// Categories for a registrable domain; empty when unmapped.
    fn categories_of(&self, domain: &str) -> Vec<Category>;
}

/// Read-only in-memory category table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticCategoryTable {
    entries: HashMap<String, Vec<Category>>,
}

impl StaticCategoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Small built-in table covering the most visited domains.
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        let defaults: &[(&str, &[&str])] = &[
            ("google.com", &["search", "productivity_tools"]),
            ("bing.com", &["search"]),
            ("duckduckgo.com", &["search"]),
            ("facebook.com", &["social"]),
            ("instagram.com", &["social"]),
            ("twitter.com", &["social"]),
            ("x.com", &["social"]),
            ("reddit.com", &["social", "reference_research"]),
            ("linkedin.com", &["social", "professional"]),
            ("discord.com", &["communication", "gaming"]),
            ("slack.com", &["communication", "productivity_tools"]),
            ("youtube.com", &["streaming_entertainment"]),
            ("netflix.com", &["streaming_entertainment"]),
            ("twitch.tv", &["streaming_entertainment", "gaming"]),
            ("github.com", &["dev_tools"]),
            ("stackoverflow.com", &["dev_tools", "reference_research"]),
            ("wikipedia.org", &["reference_research"]),
            ("nytimes.com", &["news_media"]),
            ("bbc.co.uk", &["news_media"]),
            ("cnn.com", &["news_media"]),
            ("amazon.com", &["shopping"]),
            ("ebay.com", &["shopping"]),
            ("paypal.com", &["finance"]),
        ];
        for (domain, categories) in defaults {
            table.insert(domain, categories.iter().map(|c| Category::from(*c)).collect());
        }
        table
    }

    /// Load a table from JSON shaped like `{ "domain": ["category", ...] }`.
    pub fn from_json(source: &str) -> Result<Self, CategoryError> {
        let raw: HashMap<String, Vec<String>> =
            serde_json::from_str(source).map_err(|e| CategoryError::LoadFailed {
                reason: e.to_string(),
            })?;
        let mut table = Self::new();
        for (domain, categories) in raw {
            table.insert(&domain, categories.into_iter().map(Category).collect());
        }
        Ok(table)
    }

    pub fn insert(&mut self, domain: &str, categories: Vec<Category>) {
        self.entries.insert(domain.to_ascii_lowercase(), categories);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CategoryLookup for StaticCategoryTable {
    /// Exact domain first, then each parent domain (`mail.google.com` →
    /// `google.com`), stopping before the bare TLD.
    fn categories_of(&self, domain: &str) -> Vec<Category> {
        let domain = domain.to_ascii_lowercase();
        let mut candidate = domain.as_str();
        loop {
            if let Some(categories) = self.entries.get(candidate) {
                return categories.clone();
            }
            match candidate.split_once('.') {
                Some((_, parent)) if parent.contains('.') => candidate = parent,
                _ => return Vec::new(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_lookup() {
        let table = StaticCategoryTable::with_defaults();
        assert_eq!(
            table.categories_of("reddit.com"),
            vec![Category::from("social"), Category::from("reference_research")]
        );
    }

    #[test]
    fn test_parent_domain_lookup() {
        let table = StaticCategoryTable::with_defaults();
        assert_eq!(table.categories_of("en.wikipedia.org"), vec![Category::from("reference_research")]);
        assert_eq!(table.categories_of("Docs.GitHub.com"), vec![Category::from("dev_tools")]);
    }

    #[test]
    fn test_unmapped_domain_is_empty() {
        let table = StaticCategoryTable::with_defaults();
        assert!(table.categories_of("example.org").is_empty());
        assert!(table.categories_of("").is_empty());
        assert!(table.categories_of("localhost").is_empty());
    }

    #[test]
    fn test_tld_is_never_matched() {
        let mut table = StaticCategoryTable::new();
        table.insert("com", vec![Category::from("everything")]);
        assert!(table.categories_of("example.com").is_empty());
    }

    #[test]
    fn test_from_json() {
        let table = StaticCategoryTable::from_json(r#"{"news.ycombinator.com": ["news_media", "dev_tools"]}"#).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.categories_of("news.ycombinator.com").len(), 2);
    }

    #[test]
    fn test_from_json_rejects_bad_shape() {
        let err = StaticCategoryTable::from_json(r#"{"a.com": "social"}"#).unwrap_err();
        assert!(matches!(err, CategoryError::LoadFailed { .. }));
    }
}
