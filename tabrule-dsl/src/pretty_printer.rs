//! Pretty printer for the rule DSL
//!
//! Renders a `Rule` back to canonical DSL text. Every node the parser can
//! produce has exactly one rendering, and re-parsing that rendering yields
//! an equal `Rule`.

use crate::lexer::{tokenize, TokenKind};
use crate::parser::*;
use tabrule_core::is_duration_literal;

const INDENT: &str = "  ";

/// Render one rule as canonical DSL text.
pub fn serialize_rule_to_dsl(rule: &Rule) -> String {
    let mut output = format!("rule \"{}\"", escape_string(&rule.name));
    if !rule.enabled {
        output.push_str(" disabled");
    }
    output.push_str(" {\n");

    if let Some(when) = &rule.when {
        output.push_str(&format!("{}when {}\n", INDENT, print_condition(when)));
    }

    if !rule.then.is_empty() {
        let actions: Vec<String> = rule.then.iter().map(print_action).collect();
        output.push_str(&format!("{}then {}\n", INDENT, actions.join(" and ")));
    }

    if let Some(trigger) = &rule.trigger {
        output.push_str(&format!("{}trigger {}\n", INDENT, print_trigger(trigger)));
    }

    let flags: Vec<&str> = rule.flags.enabled().collect();
    if !flags.is_empty() {
        output.push_str(&format!("{}flags {}\n", INDENT, flags.join(" ")));
    }

    output.push('}');
    output
}

/// Render a rule set, one blank line between rules.
pub fn serialize_rules_to_dsl(rules: &[Rule]) -> String {
    let mut output = rules
        .iter()
        .map(serialize_rule_to_dsl)
        .collect::<Vec<_>>()
        .join("\n\n");
    if !output.is_empty() {
        output.push('\n');
    }
    output
}

fn print_condition(condition: &Condition) -> String {
    match condition {
        Condition::Eq(path, lit) => format!("{} == {}", path, print_literal(lit)),
        Condition::Neq(path, lit) => format!("{} != {}", path, print_literal(lit)),
        Condition::Gt(path, lit) => format!("{} > {}", path, print_literal(lit)),
        Condition::Gte(path, lit) => format!("{} >= {}", path, print_literal(lit)),
        Condition::Lt(path, lit) => format!("{} < {}", path, print_literal(lit)),
        Condition::Lte(path, lit) => format!("{} <= {}", path, print_literal(lit)),
        Condition::In(path, lit) => format!("{} in {}", path, print_literal(lit)),
        Condition::Is(path, lit) => format!("{} is {}", path, print_literal(lit)),
        Condition::Contains(path, lit) => format!("{} contains {}", path, print_literal(lit)),
        Condition::Regex(path, regex) => format!("{} regex {}", path, print_regex(regex)),
        Condition::All(children) => format!("all({})", print_children(children)),
        Condition::Any(children) => format!("any({})", print_children(children)),
    }
}

fn print_children(children: &[Condition]) -> String {
    children
        .iter()
        .map(print_condition)
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_literal(literal: &Literal) -> String {
    match literal {
        Literal::Null => "null".to_string(),
        Literal::Bool(b) => b.to_string(),
        Literal::Number(n) => n.to_string(),
        Literal::String(s) if is_duration_literal(s) => s.clone(),
        Literal::String(s) => format!("\"{}\"", escape_string(s)),
        Literal::List(items) => {
            let items: Vec<String> = items
                .iter()
                .map(|s| format!("\"{}\"", escape_string(s)))
                .collect();
            format!("[{}]", items.join(", "))
        }
    }
}

/// Bare `/.../flags` when the source re-tokenizes to exactly that literal,
/// otherwise a quoted pattern string.
fn print_regex(regex: &RegexLiteral) -> String {
    let source = regex.source();
    let tokens = tokenize(source);
    let bare = matches!(
        tokens.as_slice(),
        [first, last] if first.kind == TokenKind::Regex(source.to_string()) && last.kind == TokenKind::Eof
    );
    if bare {
        source.to_string()
    } else {
        format!("\"{}\"", escape_string(source))
    }
}

fn print_action(action: &Action) -> String {
    match action {
        Action::Close { keep_first } => {
            if *keep_first {
                "close keepFirst".to_string()
            } else {
                "close".to_string()
            }
        }
        Action::Group {
            name,
            by,
            create_if_missing,
        } => {
            let mut out = "group".to_string();
            if let Some(name) = name {
                out.push_str(&format!(" name \"{}\"", escape_string(name)));
            }
            if let Some(by) = by {
                out.push_str(&format!(" by {}", by));
            }
            if *create_if_missing {
                out.push_str(" createIfMissing");
            }
            out
        }
        Action::Snooze { duration, wake_into } => match wake_into {
            Some(target) => format!("snooze for {} wakeInto {}", duration, target.as_str()),
            None => format!("snooze for {}", duration),
        },
        Action::Suspend => "suspend".to_string(),
    }
}

fn print_trigger(trigger: &Trigger) -> String {
    match trigger {
        Trigger::Immediate => "immediate".to_string(),
        Trigger::Manual => "manual".to_string(),
        Trigger::OnAction => "onAction".to_string(),
        Trigger::RepeatEvery(d) => format!("repeat every {}", d),
        Trigger::OnceAt(ts) => format!("once at \"{}\"", escape_string(ts)),
    }
}

pub(crate) fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\t', "\\t")
        .replace('\r', "\\r")
}

// ============================================================================
// TESTS
// ============================================================================
