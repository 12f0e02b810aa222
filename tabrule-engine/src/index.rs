//! Per-batch indices over tab snapshots.
//!
//! Indices are built wholesale from one snapshot of the browser and never
//! patched. Every grouping map stores arena positions in encounter order.

use std::collections::{BTreeSet, HashMap};
use tabrule_core::{
    dupe_key, extract_domain, Category, CategoryLookup, DedupeConfig, EngineConfig,
    OriginClassifier, TabId, TabRecord, TabSnapshot, WindowId, WindowRecord,
};

// ============================================================================
// INDEX KEYS
// ============================================================================

/// Derived key a tab can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKey {
    Domain,
    Origin,
    DupeKey,
    Category,
    Window,
}

impl IndexKey {
    pub const ALL: [IndexKey; 5] = [
        IndexKey::Domain,
        IndexKey::Origin,
        IndexKey::DupeKey,
        IndexKey::Category,
        IndexKey::Window,
    ];

    /// Parse a key name, ignoring ASCII case (`Origin`, `origin`, `dupeKey`).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(name))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKey::Domain => "domain",
            IndexKey::Origin => "origin",
            IndexKey::DupeKey => "dupeKey",
            IndexKey::Category => "category",
            IndexKey::Window => "window",
        }
    }

    fn slot(&self) -> usize {
        match self {
            IndexKey::Domain => 0,
            IndexKey::Origin => 1,
            IndexKey::DupeKey => 2,
            IndexKey::Category => 3,
            IndexKey::Window => 4,
        }
    }

    /// Values of this key for `tab`. Only `Category` can have several.
    pub fn values_of(&self, tab: &TabSnapshot) -> Vec<String> {
        match self {
            IndexKey::Domain => vec![tab.domain.clone()],
            IndexKey::Origin => vec![tab.origin.clone()],
            IndexKey::DupeKey => vec![tab.dupe_key.clone()],
            IndexKey::Category => tab.category.iter().map(|c| c.0.clone()).collect(),
            IndexKey::Window => vec![tab.window_id().to_string()],
        }
    }
}

// ============================================================================
// INDICES
// ============================================================================

/// Arena of snapshots plus grouping maps keyed by derived values.
#[derive(Debug, Clone, Default)]
pub struct Indices {
    tabs: Vec<TabSnapshot>,
    windows: HashMap<WindowId, WindowRecord>,
    positions: HashMap<TabId, usize>,
    groups: [HashMap<String, Vec<usize>>; 5],
}

impl Indices {
    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn tabs(&self) -> &[TabSnapshot] {
        &self.tabs
    }

    pub fn tab(&self, pos: usize) -> Option<&TabSnapshot> {
        self.tabs.get(pos)
    }

    /// Arena position of the first tab with `id`.
    pub fn position_of(&self, id: TabId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    pub fn window(&self, id: WindowId) -> Option<&WindowRecord> {
        self.windows.get(&id)
    }

    /// Positions of tabs whose `key` equals `value`, in encounter order.
    pub fn group(&self, key: IndexKey, value: &str) -> &[usize] {
        self.groups[key.slot()]
            .get(value)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn group_by_domain(&self, domain: &str) -> &[usize] {
        self.group(IndexKey::Domain, domain)
    }

    pub fn group_by_origin(&self, origin: &str) -> &[usize] {
        self.group(IndexKey::Origin, origin)
    }

    pub fn group_by_dupe_key(&self, key: &str) -> &[usize] {
        self.group(IndexKey::DupeKey, key)
    }

    pub fn group_by_category(&self, category: &str) -> &[usize] {
        self.group(IndexKey::Category, category)
    }

    pub fn group_by_window(&self, window: WindowId) -> &[usize] {
        self.group(IndexKey::Window, &window.to_string())
    }

    /// Positions sharing at least one `key` value with `tab`, ascending.
    pub fn peers(&self, tab: &TabSnapshot, key: IndexKey) -> Vec<usize> {
        let values = key.values_of(tab);
        if let [value] = values.as_slice() {
            return self.group(key, value).to_vec();
        }
        values
            .iter()
            .flat_map(|v| self.group(key, v).iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Number of tabs sharing `tab`'s `primary` key, optionally narrowed to
    /// those that also share its `secondary` key.
    pub fn count_per(&self, tab: &TabSnapshot, primary: IndexKey, secondary: Option<IndexKey>) -> usize {
        let peers = self.peers(tab, primary);
        match secondary {
            None => peers.len(),
            Some(secondary) => {
                let mine = secondary.values_of(tab);
                peers
                    .into_iter()
                    .filter_map(|pos| self.tabs.get(pos))
                    .filter(|other| secondary.values_of(other).iter().any(|v| mine.contains(v)))
                    .count()
            }
        }
    }

    /// Tab count of a window.
    pub fn window_tab_count(&self, window: WindowId) -> usize {
        self.group_by_window(window).len()
    }

    /// True when `tab` shares a non-empty dupe key with another tab.
    pub fn is_dupe(&self, tab: &TabSnapshot) -> bool {
        !tab.dupe_key.is_empty() && self.group_by_dupe_key(&tab.dupe_key).len() >= 2
    }

    /// True when `pos` is a duplicate that is not the first of its group.
    pub fn is_later_duplicate(&self, pos: usize) -> bool {
        match self.tabs.get(pos) {
            Some(tab) if !tab.dupe_key.is_empty() => {
                self.group_by_dupe_key(&tab.dupe_key).first() != Some(&pos)
            }
            _ => false,
        }
    }
}

// ============================================================================
// INDEXER
// ============================================================================

/// Derives snapshot keys and builds `Indices`.
pub struct Indexer<'a> {
    origins: OriginClassifier,
    dedupe: DedupeConfig,
    unknown: Category,
    lookup: &'a dyn CategoryLookup,
}

impl<'a> Indexer<'a> {
    pub fn new(config: &EngineConfig, lookup: &'a dyn CategoryLookup) -> Self {
        Self {
            origins: OriginClassifier::new(config.origins.clone()),
            dedupe: config.dedupe,
            unknown: Category::new(config.categories.unknown.clone()),
            lookup,
        }
    }

    /// Derive domain, origin, dupe key and categories for one record.
    ///
    /// Categories already materialized on the record win over the lookup.
    pub fn snapshot(&self, record: TabRecord) -> TabSnapshot {
        let domain = extract_domain(&record.url);
        let origin = self.origins.classify(record.referrer.as_deref());
        let dupe_key = dupe_key(&record.url, &self.dedupe);
        let mut category = match &record.categories {
            Some(categories) => categories.clone(),
            None if domain.is_empty() => Vec::new(),
            None => self.lookup.categories_of(&domain),
        };
        if category.is_empty() {
            category.push(self.unknown.clone());
        }

        TabSnapshot {
            record,
            domain,
            origin,
            dupe_key,
            category,
        }
    }

    /// Build indices in one linear pass over `tabs`.
    pub fn build(&self, tabs: Vec<TabRecord>, windows: Vec<WindowRecord>) -> Indices {
        let mut indices = Indices {
            tabs: Vec::with_capacity(tabs.len()),
            windows: windows.into_iter().map(|w| (w.id, w)).collect(),
            ..Indices::default()
        };

        for (pos, record) in tabs.into_iter().enumerate() {
            let snapshot = self.snapshot(record);
            indices.positions.entry(snapshot.id()).or_insert(pos);
            for key in IndexKey::ALL {
                for value in key.values_of(&snapshot) {
                    indices.groups[key.slot()].entry(value).or_default().push(pos);
                }
            }
            indices.tabs.push(snapshot);
        }

        tracing::debug!(
            tabs = indices.tabs.len(),
            windows = indices.windows.len(),
            "built tab indices"
        );
        indices
    }
}

/// Every dupe-key group with two or more tabs, members in encounter order,
/// groups ordered by their first member.
pub fn find_duplicates(indices: &Indices) -> Vec<Vec<TabId>> {
    indices
        .tabs
        .iter()
        .enumerate()
        .filter(|(_, tab)| !tab.dupe_key.is_empty())
        .filter_map(|(pos, tab)| {
            let group = indices.group_by_dupe_key(&tab.dupe_key);
            (group.len() >= 2 && group.first() == Some(&pos)).then(|| {
                group
                    .iter()
                    .filter_map(|&p| indices.tab(p).map(TabSnapshot::id))
                    .collect::<Vec<_>>()
            })
        })
        .collect()
}
