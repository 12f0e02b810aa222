//! Migration from the legacy single-object rule format.
//!
//! Legacy rules carry a flat list of `{type, value}` conditions, a list of
//! `{type, ...}` actions and an `interval` in minutes. Migration never
//! fails: anything that cannot be mapped is dropped and reported as a
//! `MigrationWarning`. Numeric fields are read as raw JSON so one badly
//! typed value cannot reject the whole export.

use crate::parser::ast::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabrule_core::{is_duration_literal, new_rule_id, parse_duration, parse_duration_value, serialize_duration};
use thiserror::Error;

const MINUTE_MS: u64 = 60_000;

// ============================================================================
// LEGACY FORMAT
// ============================================================================

/// A rule in the legacy persisted format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyRule {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Older exports hold a single condition object.
    #[serde(default)]
    pub condition: Option<LegacyCondition>,
    #[serde(default)]
    pub conditions: Vec<LegacyCondition>,
    #[serde(default)]
    pub action: Option<LegacyAction>,
    #[serde(default)]
    pub actions: Vec<LegacyAction>,
    /// Repeat interval in minutes, or a duration literal.
    #[serde(default)]
    pub interval: Value,
    #[serde(default)]
    pub immediate: bool,
    #[serde(default)]
    pub skip_pinned: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyCondition {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub value: Value,
}

impl LegacyCondition {
    pub fn new(kind: &str, value: Value) -> Self {
        Self {
            kind: kind.to_string(),
            value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyAction {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub keep_first: bool,
    #[serde(default)]
    pub group_by: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub create_if_missing: bool,
    /// Snooze length in minutes.
    #[serde(default)]
    pub minutes: Value,
    /// Snooze length as a duration literal or raw milliseconds.
    #[serde(default)]
    pub duration: Option<Value>,
    #[serde(default)]
    pub wake_into: Option<String>,
}

impl LegacyAction {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            ..Self::default()
        }
    }
}

// ============================================================================
// WARNINGS
// ============================================================================

/// Non-fatal problem found while migrating one rule.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MigrationWarning {
    #[error("rule '{rule}': unknown condition type '{kind}' dropped")]
    UnknownCondition { rule: String, kind: String },

    #[error("rule '{rule}': condition '{kind}' has unusable value {value}")]
    InvalidConditionValue {
        rule: String,
        kind: String,
        value: String,
    },

    #[error("rule '{rule}': unknown action type '{kind}' dropped")]
    UnknownAction { rule: String, kind: String },

    #[error("rule '{rule}': action '{kind}' has unusable value {value}")]
    InvalidActionValue {
        rule: String,
        kind: String,
        value: String,
    },

    #[error("rule '{rule}': interval of {minutes} minutes ignored for an immediate rule")]
    IntervalIgnored { rule: String, minutes: u64 },

    #[error("rule '{rule}': unusable interval {value} ignored")]
    InvalidInterval { rule: String, value: String },
}

// ============================================================================
// MIGRATION
// ============================================================================

/// Migrate one legacy rule.
pub fn migrate_rule(legacy: &LegacyRule) -> (Rule, Vec<MigrationWarning>) {
    let id = legacy.id.clone().unwrap_or_else(new_rule_id);
    let name = if legacy.name.trim().is_empty() {
        format!("Migrated rule {}", id)
    } else {
        legacy.name.clone()
    };

    let mut migrator = Migrator {
        rule: name.clone(),
        warnings: Vec::new(),
    };

    let conditions: Vec<Condition> = legacy
        .condition
        .iter()
        .chain(&legacy.conditions)
        .filter_map(|c| migrator.condition(c))
        .collect();
    let when = match conditions.len() {
        0 => None,
        1 => conditions.into_iter().next(),
        _ => Some(Condition::All(conditions)),
    };

    let then: Vec<Action> = legacy
        .action
        .iter()
        .chain(&legacy.actions)
        .filter_map(|a| migrator.action(a))
        .collect();

    let interval = migrator.interval(&legacy.interval).filter(|ms| *ms > 0);
    let trigger = if legacy.immediate {
        if let Some(ms) = interval {
            migrator.warn(MigrationWarning::IntervalIgnored {
                rule: migrator.rule.clone(),
                minutes: ms / MINUTE_MS,
            });
        }
        Trigger::Immediate
    } else {
        match interval {
            Some(ms) => Trigger::RepeatEvery(serialize_duration(ms)),
            None => Trigger::Manual,
        }
    };

    let mut flags = FlagSet::new();
    if legacy.immediate {
        flags = flags.with(flags::IMMEDIATE);
    }
    if legacy.skip_pinned {
        flags = flags.with(flags::SKIP_PINNED);
    }

    let rule = Rule {
        id: Some(id),
        name,
        enabled: legacy.enabled,
        when,
        then,
        trigger: Some(trigger),
        flags,
    };
    (rule, migrator.warnings)
}

/// Migrate a whole legacy rule set, collecting every warning.
pub fn migrate_rules(legacy: &[LegacyRule]) -> (Vec<Rule>, Vec<MigrationWarning>) {
    legacy
        .iter()
        .fold((Vec::new(), Vec::new()), |(mut rules, mut warnings), old| {
            let (rule, mut rule_warnings) = migrate_rule(old);
            rules.push(rule);
            warnings.append(&mut rule_warnings);
            (rules, warnings)
        })
}

struct Migrator {
    rule: String,
    warnings: Vec<MigrationWarning>,
}

impl Migrator {
    fn warn(&mut self, warning: MigrationWarning) {
        tracing::warn!(%warning, "legacy rule migration");
        self.warnings.push(warning);
    }

    /// Whole minutes or a duration literal; anything else is warned about
    /// and treated as no interval.
    fn interval(&mut self, value: &Value) -> Option<u64> {
        if let Some(minutes) = value.as_u64() {
            return Some(minutes.saturating_mul(MINUTE_MS));
        }
        match value {
            Value::Null => None,
            Value::String(s) if is_duration_literal(s) => Some(parse_duration(s)),
            other => {
                self.warn(MigrationWarning::InvalidInterval {
                    rule: self.rule.clone(),
                    value: other.to_string(),
                });
                None
            }
        }
    }

    fn bad_condition(&mut self, c: &LegacyCondition) -> Option<Condition> {
        self.warn(MigrationWarning::InvalidConditionValue {
            rule: self.rule.clone(),
            kind: c.kind.clone(),
            value: c.value.to_string(),
        });
        None
    }

    fn condition(&mut self, c: &LegacyCondition) -> Option<Condition> {
        match c.kind.as_str() {
            "duplicate" => Some(Condition::Is("tab.isDupe".into(), Literal::Bool(true))),
            "domain" => match &c.value {
                Value::String(s) => Some(Condition::Eq("tab.domain".into(), Literal::string(s))),
                Value::Array(_) => match string_list(&c.value) {
                    Some(list) => Some(Condition::In("tab.domain".into(), Literal::List(list))),
                    None => self.bad_condition(c),
                },
                _ => self.bad_condition(c),
            },
            "age" | "inactive" => {
                let path = if c.kind == "age" { "tab.age" } else { "tab.lastAccessed" };
                match parse_duration_value(&c.value) {
                    0 => self.bad_condition(c),
                    ms if ms % MINUTE_MS == 0 => {
                        Some(Condition::Gt(path.into(), Literal::String(serialize_duration(ms))))
                    }
                    ms => Some(Condition::Gt(path.into(), Literal::Number(ms as f64))),
                }
            }
            "category" => match &c.value {
                Value::String(s) => Some(Condition::In("tab.category".into(), Literal::list([s.as_str()]))),
                Value::Array(_) => match string_list(&c.value) {
                    Some(list) => Some(Condition::In("tab.category".into(), Literal::List(list))),
                    None => self.bad_condition(c),
                },
                _ => self.bad_condition(c),
            },
            "url" | "url_pattern" => match &c.value {
                Value::String(s) if !s.is_empty() => {
                    Some(Condition::Regex("tab.url".into(), RegexLiteral::new(s.clone())))
                }
                _ => self.bad_condition(c),
            },
            "origin" => match &c.value {
                Value::String(s) => Some(Condition::Eq("tab.origin".into(), Literal::string(s))),
                _ => self.bad_condition(c),
            },
            "pinned" => match &c.value {
                Value::Bool(b) => Some(Condition::Is("tab.isPinned".into(), Literal::Bool(*b))),
                Value::Null => Some(Condition::Is("tab.isPinned".into(), Literal::Bool(true))),
                _ => self.bad_condition(c),
            },
            _ => {
                self.warn(MigrationWarning::UnknownCondition {
                    rule: self.rule.clone(),
                    kind: c.kind.clone(),
                });
                None
            }
        }
    }

    fn action(&mut self, a: &LegacyAction) -> Option<Action> {
        match a.kind.as_str() {
            "close" => Some(Action::Close {
                keep_first: a.keep_first,
            }),
            "group" => Some(Action::Group {
                name: a.name.clone(),
                by: a.group_by.clone(),
                create_if_missing: a.create_if_missing,
            }),
            "snooze" => {
                let (ms, raw) = if a.minutes.is_null() {
                    let raw = a.duration.clone().unwrap_or(Value::Null);
                    (parse_duration_value(&raw), raw)
                } else {
                    let ms = a.minutes.as_u64().map_or(0, |m| m.saturating_mul(MINUTE_MS));
                    (ms, a.minutes.clone())
                };
                if ms == 0 {
                    self.warn(MigrationWarning::InvalidActionValue {
                        rule: self.rule.clone(),
                        kind: a.kind.clone(),
                        value: raw.to_string(),
                    });
                    return None;
                }
                // The DSL has no sub-minute unit.
                let ms = if ms % MINUTE_MS == 0 {
                    ms
                } else {
                    self.warn(MigrationWarning::InvalidActionValue {
                        rule: self.rule.clone(),
                        kind: a.kind.clone(),
                        value: format!("{}ms rounded up to whole minutes", ms),
                    });
                    ms.div_ceil(MINUTE_MS).saturating_mul(MINUTE_MS)
                };
                let wake_into = match a.wake_into.as_deref() {
                    None => None,
                    Some(word) => {
                        let target = WakeTarget::from_word(word);
                        if target.is_none() {
                            self.warn(MigrationWarning::InvalidActionValue {
                                rule: self.rule.clone(),
                                kind: "wakeInto".to_string(),
                                value: word.to_string(),
                            });
                        }
                        target
                    }
                };
                Some(Action::Snooze {
                    duration: serialize_duration(ms),
                    wake_into,
                })
            }
            "suspend" | "discard" => Some(Action::Suspend),
            _ => {
                self.warn(MigrationWarning::UnknownAction {
                    rule: self.rule.clone(),
                    kind: a.kind.clone(),
                });
                None
            }
        }
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}
