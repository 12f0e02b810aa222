//! Condition evaluation.
//!
//! Evaluation is synchronous and pure: it reads a snapshot and its indices
//! and never suspends. Anything asynchronous (category lookups backed by
//! storage) must be materialized into the records before indexing; see
//! `batch::materialize_categories`.

use crate::index::Indices;
use crate::resolve::{resolve, EvalContext, FieldValue};
use tabrule_core::{is_duration_literal, parse_duration, TabSnapshot};
use tabrule_dsl::{flags, Condition, Literal, RegexLiteral, Rule};
use thiserror::Error;

/// Errors raised by `try_evaluate`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalError {
    /// Operand shape the parser never produces
    #[error("invalid condition AST at '{path}': {reason}")]
    InvalidAst { path: String, reason: String },
}

/// Evaluate `condition` for `tab`. Malformed trees evaluate to `false`.
pub fn evaluate(condition: &Condition, tab: &TabSnapshot, indices: &Indices, ctx: &EvalContext) -> bool {
    match try_evaluate(condition, tab, indices, ctx) {
        Ok(matched) => matched,
        Err(e) => {
            tracing::warn!(error = %e, tab = tab.id(), "condition evaluated as false");
            false
        }
    }
}

/// Evaluate `condition`, failing on operand shapes the parser cannot produce.
pub fn try_evaluate(
    condition: &Condition,
    tab: &TabSnapshot,
    indices: &Indices,
    ctx: &EvalContext,
) -> Result<bool, EvalError> {
    let field = |path: &str| resolve(path, tab, indices, ctx);

    match condition {
        Condition::All(children) => {
            for child in children {
                if !try_evaluate(child, tab, indices, ctx)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Condition::Any(children) => {
            for child in children {
                if try_evaluate(child, tab, indices, ctx)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Condition::Eq(path, lit) => Ok(loose_eq(&field(path), scalar(path, lit)?)),
        Condition::Neq(path, lit) => Ok(!loose_eq(&field(path), scalar(path, lit)?)),
        Condition::Gt(path, lit) => Ok(compare(&field(path), scalar(path, lit)?, |a, b| a > b)),
        Condition::Gte(path, lit) => Ok(compare(&field(path), scalar(path, lit)?, |a, b| a >= b)),
        Condition::Lt(path, lit) => Ok(compare(&field(path), scalar(path, lit)?, |a, b| a < b)),
        Condition::Lte(path, lit) => Ok(compare(&field(path), scalar(path, lit)?, |a, b| a <= b)),
        Condition::In(path, lit) => match lit {
            Literal::List(items) => Ok(member_of(&field(path), items)),
            _ => Err(invalid(path, "'in' requires a list operand")),
        },
        Condition::Contains(path, lit) => Ok(contains(&field(path), scalar(path, lit)?)),
        Condition::Is(path, lit) => match lit {
            Literal::Bool(b) => Ok(field(path) == FieldValue::Bool(*b)),
            Literal::Null => Ok(field(path).is_null()),
            _ => Err(invalid(path, "'is' requires true, false or null")),
        },
        Condition::Regex(path, regex) => Ok(regex_match(&field(path), regex)),
    }
}

/// Rule-level match: enabled, has a condition, respects `skipPinned`.
pub fn rule_matches(rule: &Rule, tab: &TabSnapshot, indices: &Indices, ctx: &EvalContext) -> bool {
    let Some(when) = &rule.when else {
        return false;
    };
    if !rule.enabled || (rule.has_flag(flags::SKIP_PINNED) && tab.is_pinned()) {
        return false;
    }
    evaluate(when, tab, indices, ctx)
}

/// Arena positions of every tab `rule` matches, in encounter order.
pub fn matching_tabs(rule: &Rule, indices: &Indices, ctx: &EvalContext) -> Vec<usize> {
    if !rule.enabled || rule.when.is_none() {
        return Vec::new();
    }
    let matches: Vec<usize> = indices
        .tabs()
        .iter()
        .enumerate()
        .filter(|(_, tab)| rule_matches(rule, tab, indices, ctx))
        .map(|(pos, _)| pos)
        .collect();
    tracing::debug!(rule = %rule.name, matches = matches.len(), "rule evaluated");
    matches
}

// ============================================================================
// OPERATOR SEMANTICS
// ============================================================================

fn invalid(path: &str, reason: &str) -> EvalError {
    EvalError::InvalidAst {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

fn scalar<'a>(path: &str, lit: &'a Literal) -> Result<&'a Literal, EvalError> {
    match lit {
        Literal::List(_) => Err(invalid(path, "list operand is only valid with 'in'")),
        _ => Ok(lit),
    }
}

/// Numeric reading of a string: plain number or duration literal.
fn numeric_str(s: &str) -> Option<f64> {
    let s = s.trim();
    if is_duration_literal(s) {
        return Some(parse_duration(s) as f64);
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn field_number(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Num(n) => Some(*n),
        FieldValue::Str(s) => numeric_str(s),
        _ => None,
    }
}

fn literal_number(lit: &Literal) -> Option<f64> {
    match lit {
        Literal::Number(n) => Some(*n),
        Literal::String(s) => numeric_str(s),
        _ => None,
    }
}

fn literal_text(lit: &Literal) -> Option<String> {
    match lit {
        Literal::String(s) => Some(s.clone()),
        Literal::Number(n) => Some(n.to_string()),
        Literal::Bool(b) => Some(b.to_string()),
        Literal::Null | Literal::List(_) => None,
    }
}

/// Loose equality across primitive types.
fn loose_eq(value: &FieldValue, lit: &Literal) -> bool {
    match (value, lit) {
        (FieldValue::Null, Literal::Null) => true,
        (FieldValue::Null, _) | (_, Literal::Null) => false,
        (FieldValue::List(items), _) => items
            .iter()
            .any(|item| loose_eq(&FieldValue::Str(item.clone()), lit)),
        (FieldValue::Bool(a), Literal::Bool(b)) => a == b,
        (FieldValue::Bool(a), Literal::String(s)) => s == if *a { "true" } else { "false" },
        (FieldValue::Str(s), Literal::Bool(b)) => s == if *b { "true" } else { "false" },
        (FieldValue::Str(a), Literal::String(b)) => a == b,
        (FieldValue::Num(_), _) | (_, Literal::Number(_)) => {
            match (field_number(value), literal_number(lit)) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            }
        }
        _ => false,
    }
}

fn compare(value: &FieldValue, lit: &Literal, op: fn(f64, f64) -> bool) -> bool {
    match (field_number(value), literal_number(lit)) {
        (Some(a), Some(b)) => op(a, b),
        _ => false,
    }
}

fn member_of(value: &FieldValue, items: &[String]) -> bool {
    match value {
        FieldValue::Str(s) => items.iter().any(|item| item == s),
        FieldValue::Num(n) => {
            let text = n.to_string();
            items.iter().any(|item| *item == text)
        }
        FieldValue::Bool(b) => {
            let text = b.to_string();
            items.iter().any(|item| *item == text)
        }
        FieldValue::List(values) => values.iter().any(|v| items.contains(v)),
        FieldValue::Null => false,
    }
}

/// Case-insensitive substring for strings, element match for lists.
fn contains(value: &FieldValue, lit: &Literal) -> bool {
    let Some(needle) = literal_text(lit) else {
        return false;
    };
    let needle = needle.to_lowercase();
    match value {
        FieldValue::Str(s) => s.to_lowercase().contains(&needle),
        FieldValue::List(items) => items.iter().any(|item| item.to_lowercase() == needle),
        _ => false,
    }
}

fn regex_match(value: &FieldValue, regex: &RegexLiteral) -> bool {
    let Some(compiled) = regex.compiled() else {
        return false;
    };
    match value {
        FieldValue::Str(s) => compiled.is_match(s),
        FieldValue::Num(n) => compiled.is_match(&n.to_string()),
        FieldValue::List(items) => items.iter().any(|item| compiled.is_match(item)),
        FieldValue::Bool(_) | FieldValue::Null => false,
    }
}
