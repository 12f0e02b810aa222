//! Rule-set compiler
//!
//! Takes parsed (or programmatically built) rules and checks the semantic
//! constraints the grammar cannot express, producing a `RuleSet` ready for
//! evaluation.
//!
//! # Pipeline
//!
//! ```text
//! DSL Source → Lexer → Parser → Vec<Rule> → RuleSetCompiler → RuleSet → Engine
//!                                                ↓
//!                                       Validation (semantic)
//! ```

use crate::parser::ast::*;
use crate::pretty_printer::serialize_rules_to_dsl;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tabrule_core::is_duration_literal;
use thiserror::Error;

// ============================================================================
// COMPILE ERRORS
// ============================================================================

/// Errors that can occur while compiling a rule set.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    /// Two rules share a name
    #[error("duplicate rule: '{name}' is already defined")]
    DuplicateRule { name: String },

    /// Rule without a name
    #[error("rule name must not be empty")]
    EmptyName,

    /// Operand shape the operator cannot take
    #[error("invalid operand in rule '{rule}': '{path} {op}' expects {expected}")]
    InvalidOperand {
        rule: String,
        path: String,
        op: String,
        expected: String,
    },

    /// Regex literal that does not compile
    #[error("invalid regex in rule '{rule}': {pattern}: {reason}")]
    InvalidRegex {
        rule: String,
        pattern: String,
        reason: String,
    },

    /// Duration text that is not `<digits>[mhd]`
    #[error("invalid duration in rule '{rule}': {value}")]
    InvalidDuration { rule: String, value: String },

    /// `once at` timestamp that is not RFC 3339
    #[error("invalid timestamp in rule '{rule}': {value}")]
    InvalidTimestamp { rule: String, value: String },
}

pub type CompileResult<T> = Result<T, CompileError>;

// ============================================================================
// RULE SET
// ============================================================================

/// Validated, ordered collection of uniquely named rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    rules: Vec<Rule>,
    by_name: HashMap<String, usize>,
}

impl RuleSet {
    /// Rules in definition order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Enabled rules in definition order.
    pub fn enabled(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| r.enabled)
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.by_name.get(name).map(|&i| &self.rules[i])
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn into_rules(self) -> Vec<Rule> {
        self.rules
    }

    /// Hex SHA-256 of the canonical DSL text. Stable across JSON/DSL round
    /// trips, so it can key caches of compiled rule sets.
    pub fn fingerprint(&self) -> String {
        let text = serialize_rules_to_dsl(&self.rules);
        hex::encode(Sha256::digest(text.as_bytes()))
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

// ============================================================================
// COMPILER
// ============================================================================

/// Rule-set compiler.
#[derive(Debug, Default)]
pub struct RuleSetCompiler {
    names: NameRegistry,
}

/// Tracks rule names to detect duplicates.
#[derive(Debug, Default)]
struct NameRegistry {
    rules: HashMap<String, usize>,
}

impl NameRegistry {
    fn register(&mut self, name: &str, index: usize) -> CompileResult<()> {
        if name.is_empty() {
            return Err(CompileError::EmptyName);
        }
        if self.rules.contains_key(name) {
            return Err(CompileError::DuplicateRule {
                name: name.to_string(),
            });
        }
        self.rules.insert(name.to_string(), index);
        Ok(())
    }
}

impl RuleSetCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile rules into a `RuleSet`, failing on the first violation.
    pub fn compile(rules: Vec<Rule>) -> CompileResult<RuleSet> {
        let mut compiler = Self::new();

        for (index, rule) in rules.iter().enumerate() {
            compiler.names.register(&rule.name, index)?;
            compiler.check_rule(rule)?;
        }

        tracing::debug!(rules = rules.len(), "compiled rule set");
        Ok(RuleSet {
            rules,
            by_name: compiler.names.rules,
        })
    }

    fn check_rule(&self, rule: &Rule) -> CompileResult<()> {
        if let Some(when) = &rule.when {
            let mut first_error = None;
            when.walk(&mut |node| {
                if first_error.is_none() {
                    if let Err(e) = Self::check_condition(&rule.name, node) {
                        first_error = Some(e);
                    }
                }
            });
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        for action in &rule.then {
            if let Action::Snooze { duration, .. } = action {
                Self::check_duration(&rule.name, duration)?;
            }
        }

        match &rule.trigger {
            Some(Trigger::RepeatEvery(d)) => Self::check_duration(&rule.name, d)?,
            Some(trigger @ Trigger::OnceAt(ts)) if trigger.once_at_time().is_none() => {
                return Err(CompileError::InvalidTimestamp {
                    rule: rule.name.clone(),
                    value: ts.clone(),
                });
            }
            _ => {}
        }

        Ok(())
    }

    fn check_condition(rule: &str, condition: &Condition) -> CompileResult<()> {
        let invalid = |path: &str, op: &str, expected: &str| CompileError::InvalidOperand {
            rule: rule.to_string(),
            path: path.to_string(),
            op: op.to_string(),
            expected: expected.to_string(),
        };

        match condition {
            Condition::In(path, literal) => match literal {
                Literal::List(_) => Ok(()),
                _ => Err(invalid(path, "in", "a string list")),
            },
            Condition::Is(path, literal) => match literal {
                Literal::Bool(_) | Literal::Null => Ok(()),
                _ => Err(invalid(path, "is", "true, false or null")),
            },
            Condition::Regex(path, regex) => match regex.compile() {
                Ok(_) => Ok(()),
                Err(e) => Err(CompileError::InvalidRegex {
                    rule: rule.to_string(),
                    pattern: format!("{} {}", path, regex.source()),
                    reason: e.to_string(),
                }),
            },
            Condition::Eq(path, Literal::List(_)) => Err(invalid(path, "==", "a single literal")),
            Condition::Neq(path, Literal::List(_)) => Err(invalid(path, "!=", "a single literal")),
            Condition::Gt(path, Literal::List(_)) => Err(invalid(path, ">", "a single literal")),
            Condition::Gte(path, Literal::List(_)) => Err(invalid(path, ">=", "a single literal")),
            Condition::Lt(path, Literal::List(_)) => Err(invalid(path, "<", "a single literal")),
            Condition::Lte(path, Literal::List(_)) => Err(invalid(path, "<=", "a single literal")),
            Condition::Contains(path, Literal::List(_)) => {
                Err(invalid(path, "contains", "a single literal"))
            }
            _ => Ok(()),
        }
    }

    fn check_duration(rule: &str, value: &str) -> CompileResult<()> {
        if is_duration_literal(value) {
            Ok(())
        } else {
            Err(CompileError::InvalidDuration {
                rule: rule.to_string(),
                value: value.to_string(),
            })
        }
    }
}
