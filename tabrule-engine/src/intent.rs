//! Action intents and the executor seam.
//!
//! The engine never touches the browser. A matched rule turns into an
//! ordered list of `ActionIntent`s which an `ActionExecutor` carries out.

use crate::index::Indices;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tabrule_core::{TabId, TabSnapshot};
use tabrule_dsl::{Action, Rule};

/// One action of one rule, applied to a set of tabs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionIntent {
    /// Name of the rule that produced the intent.
    pub rule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    pub action: Action,
    /// Target tabs in encounter order.
    pub tab_ids: Vec<TabId>,
}

/// Plan one intent per action of `rule`, in `then` order.
///
/// `matches` are arena positions from `matching_tabs`. For
/// `close keepFirst` only later members of a dupe-key group are targeted,
/// so the first tab of every group survives.
pub fn plan_intents(rule: &Rule, matches: &[usize], indices: &Indices) -> Vec<ActionIntent> {
    rule.then
        .iter()
        .filter_map(|action| {
            let tab_ids: Vec<TabId> = matches
                .iter()
                .copied()
                .filter(|&pos| match action {
                    Action::Close { keep_first: true } => indices.is_later_duplicate(pos),
                    _ => true,
                })
                .filter_map(|pos| indices.tab(pos).map(TabSnapshot::id))
                .collect();

            (!tab_ids.is_empty()).then(|| ActionIntent {
                rule: rule.name.clone(),
                rule_id: rule.id.clone(),
                action: action.clone(),
                tab_ids,
            })
        })
        .collect()
}

// ============================================================================
// EXECUTOR SEAM
// ============================================================================

/// Outcome of executing one intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionReport {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Carries out action intents against a host browser.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, intent: &ActionIntent) -> ExecutionReport;
}

/// Execute `intents` one after another, in order.
///
/// A failed intent is logged and does not stop the ones after it.
pub async fn dispatch_intents(executor: &dyn ActionExecutor, intents: &[ActionIntent]) -> Vec<ExecutionReport> {
    let mut reports = Vec::with_capacity(intents.len());
    for (idx, intent) in intents.iter().enumerate() {
        let report = executor.execute(intent).await;
        if !report.success {
            tracing::warn!(
                intent_index = idx,
                rule = %intent.rule,
                action = intent.action.name(),
                error = report.error.as_deref().unwrap_or(""),
                "action intent failed"
            );
        }
        reports.push(report);
    }
    reports
}
