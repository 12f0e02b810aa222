//! Tab and window records supplied by the host browser.

use crate::category::Category;
use crate::{EpochMs, TabId, WindowId};
use serde::{Deserialize, Serialize};

/// A tab as enumerated by the host browser, before derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabRecord {
    pub id: TabId,
    pub window_id: WindowId,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    /// Creation time, used for `tab.age`.
    pub created_at: EpochMs,
    pub last_accessed: EpochMs,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub audible: bool,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub discarded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
    /// Categories materialized by an asynchronous pre-pass, if one ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<Category>>,
}

impl TabRecord {
    /// Minimal record; remaining fields take their defaults.
    pub fn new(id: TabId, window_id: WindowId, url: impl Into<String>) -> Self {
        Self {
            id,
            window_id,
            url: url.into(),
            title: String::new(),
            referrer: None,
            created_at: 0,
            last_accessed: 0,
            pinned: false,
            active: false,
            audible: false,
            muted: false,
            discarded: false,
            group_id: None,
            categories: None,
        }
    }
}

/// A browser window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowRecord {
    pub id: WindowId,
    #[serde(default)]
    pub focused: bool,
    #[serde(default)]
    pub incognito: bool,
}

/// A tab plus the keys derived from it at indexing time.
///
/// Derived fields are computed once per batch and are read-only inputs to
/// condition evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabSnapshot {
    #[serde(flatten)]
    pub record: TabRecord,
    pub domain: String,
    pub origin: String,
    pub dupe_key: String,
    /// Never empty; falls back to the unknown sentinel.
    pub category: Vec<Category>,
}

impl TabSnapshot {
    pub fn id(&self) -> TabId {
        self.record.id
    }

    pub fn window_id(&self) -> WindowId {
        self.record.window_id
    }

    pub fn url(&self) -> &str {
        &self.record.url
    }

    pub fn is_pinned(&self) -> bool {
        self.record.pinned
    }
}
