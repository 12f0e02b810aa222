//! Attribute path resolution against a tab snapshot.

use crate::index::{IndexKey, Indices};
use serde::{Deserialize, Serialize};
use tabrule_core::{EpochMs, TabSnapshot};

/// Value of a resolved attribute path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Str(s.to_string())
    }
}

impl From<usize> for FieldValue {
    fn from(n: usize) -> Self {
        FieldValue::Num(n as f64)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Num(n as f64)
    }
}

/// Ambient inputs to evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalContext {
    /// Reference instant for `age` and `lastAccessed`.
    pub now_ms: EpochMs,
}

impl EvalContext {
    pub fn new(now_ms: EpochMs) -> Self {
        Self { now_ms }
    }

    /// Context anchored at the current wall-clock time.
    pub fn now() -> Self {
        Self::new(chrono::Utc::now().timestamp_millis())
    }

    fn elapsed_since(&self, then: EpochMs) -> FieldValue {
        FieldValue::from(self.now_ms.saturating_sub(then).max(0))
    }
}

/// Resolve `path` for `tab`. Unknown paths resolve to `Null`.
///
/// Paths may carry a `tab.` prefix; `window.*` paths read the tab's window.
pub fn resolve(path: &str, tab: &TabSnapshot, indices: &Indices, ctx: &EvalContext) -> FieldValue {
    if let Some(field) = path.strip_prefix("window.") {
        return resolve_window(field, tab, indices);
    }
    let field = path.strip_prefix("tab.").unwrap_or(path);
    let record = &tab.record;

    match field {
        "id" => record.id.into(),
        "url" => record.url.as_str().into(),
        "title" => record.title.as_str().into(),
        "domain" => tab.domain.as_str().into(),
        "origin" => tab.origin.as_str().into(),
        "dupeKey" => tab.dupe_key.as_str().into(),
        "referrer" => match &record.referrer {
            Some(r) => r.as_str().into(),
            None => FieldValue::Null,
        },
        "category" | "categories" => FieldValue::List(tab.category.iter().map(|c| c.0.clone()).collect()),
        "windowId" => record.window_id.into(),
        "groupId" => match record.group_id {
            Some(id) => id.into(),
            None => FieldValue::Null,
        },
        "isGrouped" => record.group_id.map(|id| id >= 0).unwrap_or(false).into(),
        "isPinned" | "pinned" => record.pinned.into(),
        "isActive" | "active" => record.active.into(),
        "isAudible" | "audible" => record.audible.into(),
        "isMuted" | "muted" => record.muted.into(),
        "isDiscarded" | "discarded" => record.discarded.into(),
        "age" => ctx.elapsed_since(record.created_at),
        "lastAccessed" => ctx.elapsed_since(record.last_accessed),
        "isDupe" => indices.is_dupe(tab).into(),
        "dupeCount" => indices.count_per(tab, IndexKey::DupeKey, None).into(),
        "domainCount" => indices.count_per(tab, IndexKey::Domain, None).into(),
        "originCount" => indices.count_per(tab, IndexKey::Origin, None).into(),
        "categoryCount" => indices.count_per(tab, IndexKey::Category, None).into(),
        other => match parse_count_path(other) {
            Some((primary, secondary)) => indices.count_per(tab, primary, secondary).into(),
            None => FieldValue::Null,
        },
    }
}

fn resolve_window(field: &str, tab: &TabSnapshot, indices: &Indices) -> FieldValue {
    let id = tab.window_id();
    let window = indices.window(id);
    match field {
        "id" => id.into(),
        "tabCount" => indices.window_tab_count(id).into(),
        "focused" => window.map(|w| FieldValue::Bool(w.focused)).unwrap_or(FieldValue::Null),
        "incognito" => window.map(|w| FieldValue::Bool(w.incognito)).unwrap_or(FieldValue::Null),
        _ => FieldValue::Null,
    }
}

/// Parse `countPer<Key>[:<secondary>]`, e.g. `countPerOrigin:domain`.
pub fn parse_count_path(field: &str) -> Option<(IndexKey, Option<IndexKey>)> {
    let rest = field.strip_prefix("countPer")?;
    let (primary, secondary) = match rest.split_once(':') {
        Some((primary, secondary)) => (primary, Some(secondary)),
        None => (rest, None),
    };
    let primary = IndexKey::from_name(primary)?;
    let secondary = match secondary {
        Some(name) => Some(IndexKey::from_name(name)?),
        None => None,
    };
    Some((primary, secondary))
}
