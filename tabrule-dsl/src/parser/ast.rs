//! Abstract Syntax Tree types

use crate::lexer::{Token, TokenKind};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

// ============================================================================
// AST TYPES
// ============================================================================

/// One automation rule.
///
/// Rules are immutable once built; the `with_*` helpers return new values.
/// The serde shape (`name, enabled, when, then, trigger, flags`) is the
/// interchange format other subsystems persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// `None` only for an empty rule body; matches nothing.
    #[serde(default)]
    pub when: Option<Condition>,
    /// Ordered; order is execution order.
    #[serde(default)]
    pub then: Vec<Action>,
    #[serde(default, with = "trigger_repr")]
    pub trigger: Option<Trigger>,
    #[serde(default)]
    pub flags: FlagSet,
}

fn default_enabled() -> bool {
    true
}

impl Rule {
    /// An enabled rule with an empty body.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            enabled: true,
            when: None,
            then: Vec::new(),
            trigger: None,
            flags: FlagSet::default(),
        }
    }

    pub fn with_id(self, id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..self
        }
    }

    pub fn with_enabled(self, enabled: bool) -> Self {
        Self { enabled, ..self }
    }

    pub fn with_when(self, when: Condition) -> Self {
        Self {
            when: Some(when),
            ..self
        }
    }

    pub fn with_action(self, action: Action) -> Self {
        let mut then = self.then;
        then.push(action);
        Self { then, ..self }
    }

    pub fn with_trigger(self, trigger: Trigger) -> Self {
        Self {
            trigger: Some(trigger),
            ..self
        }
    }

    pub fn with_flag(self, flag: &str) -> Self {
        Self {
            flags: self.flags.with(flag),
            ..self
        }
    }

    /// True when the named flag is set.
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.is_set(flag)
    }
}

/// Condition tree node.
///
/// Leaves hold `(path, operand)`; `all`/`any` hold ordered children.
/// Serializes as `{"gt": ["tab.age", "7d"]}` / `{"all": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Eq(String, Literal),
    Neq(String, Literal),
    Gt(String, Literal),
    Gte(String, Literal),
    Lt(String, Literal),
    Lte(String, Literal),
    In(String, Literal),
    Contains(String, Literal),
    Regex(String, RegexLiteral),
    Is(String, Literal),
    All(Vec<Condition>),
    Any(Vec<Condition>),
}

impl Condition {
    /// Attribute path of a leaf; `None` for combinators.
    pub fn path(&self) -> Option<&str> {
        match self {
            Condition::Eq(p, _)
            | Condition::Neq(p, _)
            | Condition::Gt(p, _)
            | Condition::Gte(p, _)
            | Condition::Lt(p, _)
            | Condition::Lte(p, _)
            | Condition::In(p, _)
            | Condition::Contains(p, _)
            | Condition::Regex(p, _)
            | Condition::Is(p, _) => Some(p),
            Condition::All(_) | Condition::Any(_) => None,
        }
    }

    /// Visit this node and every descendant, depth first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Condition)) {
        visit(self);
        if let Condition::All(children) | Condition::Any(children) = self {
            for child in children {
                child.walk(visit);
            }
        }
    }
}

/// Comparison operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(f64),
    /// Durations used as comparison operands stay strings ("7d").
    String(String),
    List(Vec<String>),
}

impl Literal {
    pub fn string(s: impl Into<String>) -> Self {
        Literal::String(s.into())
    }

    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Literal::List(items.into_iter().map(Into::into).collect())
    }
}

/// Regex operand, kept as its source text (`/pattern/flags` or a bare
/// pattern) and compiled lazily on first use.
///
/// The compiled form is cached inside this node, so two rules never share
/// or invalidate each other's cache.
pub struct RegexLiteral {
    source: String,
    compiled: OnceLock<Option<Regex>>,
}

impl RegexLiteral {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            compiled: OnceLock::new(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Split `/pattern/flags` into its parts. Bare patterns return `None`.
    pub fn split_literal(&self) -> Option<(&str, &str)> {
        let rest = self.source.strip_prefix('/')?;
        let close = rest.rfind('/')?;
        let (pattern, flags) = (&rest[..close], &rest[close + 1..]);
        if flags.chars().all(|c| c.is_ascii_alphabetic()) {
            Some((pattern, flags))
        } else {
            None
        }
    }

    /// Compile the pattern, honouring `i`, `m`, `s` and `x` flags.
    pub fn compile(&self) -> Result<Regex, regex::Error> {
        let (pattern, flags) = self.split_literal().unwrap_or((self.source.as_str(), ""));
        RegexBuilder::new(pattern)
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .dot_matches_new_line(flags.contains('s'))
            .ignore_whitespace(flags.contains('x'))
            .build()
    }

    /// Cached compiled regex; `None` if the pattern is invalid.
    pub fn compiled(&self) -> Option<&Regex> {
        self.compiled
            .get_or_init(|| match self.compile() {
                Ok(regex) => Some(regex),
                Err(e) => {
                    tracing::warn!(source = %self.source, error = %e, "invalid regex literal");
                    None
                }
            })
            .as_ref()
    }
}

impl Clone for RegexLiteral {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            compiled: self.compiled.clone(),
        }
    }
}

impl PartialEq for RegexLiteral {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Debug for RegexLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RegexLiteral").field(&self.source).finish()
    }
}

impl Serialize for RegexLiteral {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for RegexLiteral {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(RegexLiteral::new)
    }
}

/// Closed action vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Action {
    Close {
        #[serde(rename = "keepFirst", default, skip_serializing_if = "is_false")]
        keep_first: bool,
    },
    Group {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        by: Option<String>,
        #[serde(rename = "createIfMissing", default, skip_serializing_if = "is_false")]
        create_if_missing: bool,
    },
    Snooze {
        /// Duration literal, e.g. "2h".
        #[serde(rename = "for")]
        duration: String,
        #[serde(rename = "wakeInto", default, skip_serializing_if = "Option::is_none")]
        wake_into: Option<WakeTarget>,
    },
    Suspend,
}

impl Action {
    /// DSL keyword naming this action.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Close { .. } => "close",
            Action::Group { .. } => "group",
            Action::Snooze { .. } => "snooze",
            Action::Suspend => "suspend",
        }
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Where a snoozed tab reopens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WakeTarget {
    SameWindow,
    NewWindow,
    OriginalWindow,
}

impl WakeTarget {
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "sameWindow" => Some(WakeTarget::SameWindow),
            "newWindow" => Some(WakeTarget::NewWindow),
            "originalWindow" => Some(WakeTarget::OriginalWindow),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WakeTarget::SameWindow => "sameWindow",
            WakeTarget::NewWindow => "newWindow",
            WakeTarget::OriginalWindow => "originalWindow",
        }
    }
}

/// Scheduling policy. A rule has at most one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Immediate,
    /// Duration literal, e.g. "1h".
    RepeatEvery(String),
    /// Timestamp text (RFC 3339).
    OnceAt(String),
    OnAction,
    Manual,
}

impl Trigger {
    /// Repeat interval in milliseconds, for `RepeatEvery` only.
    pub fn interval_ms(&self) -> Option<u64> {
        match self {
            Trigger::RepeatEvery(d) => Some(tabrule_core::parse_duration(d)),
            _ => None,
        }
    }

    /// Scheduled instant for `OnceAt`, if the timestamp parses.
    pub fn once_at_time(&self) -> Option<chrono::DateTime<chrono::FixedOffset>> {
        match self {
            Trigger::OnceAt(ts) => chrono::DateTime::parse_from_rfc3339(ts).ok(),
            _ => None,
        }
    }
}

/// Serde shape for `Option<Trigger>`: `{}` when absent, otherwise a
/// single-key object such as `{"repeat_every": "1h"}`.
mod trigger_repr {
    use super::{is_false, Trigger};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Default, Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct TriggerRepr {
        #[serde(default, skip_serializing_if = "is_false")]
        immediate: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        repeat_every: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        once_at: Option<String>,
        #[serde(default, skip_serializing_if = "is_false")]
        on_action: bool,
        #[serde(default, skip_serializing_if = "is_false")]
        manual: bool,
    }

    pub fn serialize<S: Serializer>(trigger: &Option<Trigger>, serializer: S) -> Result<S::Ok, S::Error> {
        let mut repr = TriggerRepr::default();
        match trigger {
            None => {}
            Some(Trigger::Immediate) => repr.immediate = true,
            Some(Trigger::RepeatEvery(d)) => repr.repeat_every = Some(d.clone()),
            Some(Trigger::OnceAt(ts)) => repr.once_at = Some(ts.clone()),
            Some(Trigger::OnAction) => repr.on_action = true,
            Some(Trigger::Manual) => repr.manual = true,
        }
        repr.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Trigger>, D::Error> {
        let repr = Option::<TriggerRepr>::deserialize(deserializer)?.unwrap_or_default();
        let mut found = Vec::new();
        if repr.immediate {
            found.push(Trigger::Immediate);
        }
        if let Some(d) = repr.repeat_every {
            found.push(Trigger::RepeatEvery(d));
        }
        if let Some(ts) = repr.once_at {
            found.push(Trigger::OnceAt(ts));
        }
        if repr.on_action {
            found.push(Trigger::OnAction);
        }
        if repr.manual {
            found.push(Trigger::Manual);
        }
        if found.len() > 1 {
            return Err(D::Error::custom("trigger policies are mutually exclusive"));
        }
        Ok(found.pop())
    }
}

/// Named boolean modifiers; absence means `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagSet(BTreeMap<String, bool>);

impl FlagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy with `flag` set to `true`.
    pub fn with(&self, flag: &str) -> Self {
        let mut flags = self.0.clone();
        flags.insert(flag.to_string(), true);
        Self(flags)
    }

    pub(crate) fn insert(&mut self, flag: String, value: bool) {
        self.0.insert(flag, value);
    }

    pub fn is_set(&self, flag: &str) -> bool {
        self.0.get(flag).copied().unwrap_or(false)
    }

    /// Names of flags set to `true`, in sorted order.
    pub fn enabled(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter(|(_, v)| **v).map(|(k, _)| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Well-known flag names.
pub mod flags {
    pub const SKIP_PINNED: &str = "skipPinned";
    pub const LOG: &str = "log";
    pub const IMMEDIATE: &str = "immediate";
}

// ============================================================================
// PARSE ERROR
// ============================================================================

/// Syntax error with source location.
///
/// Messages always begin with "Expected" or "Unexpected".
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    /// Byte offset of the offending token.
    pub position: usize,
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Parse error at line {}, column {}: {}",
            self.line, self.column, self.message
        )
    }
}

impl std::error::Error for ParseError {}

// ============================================================================
// PARSER
// ============================================================================

/// Recursive-descent parser for the rule DSL.
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) pos: usize,
}

impl Parser {
    /// Create a new parser from a vector of tokens.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind != TokenKind::Eof).unwrap_or(true) {
            let span = tokens.last().map(|t| t.span).unwrap_or_default();
            tokens.push(Token {
                kind: TokenKind::Eof,
                span,
            });
        }
        Self { tokens, pos: 0 }
    }

    /// Parse the token stream into a rule set.
    pub fn parse(&mut self) -> Result<Vec<Rule>, ParseError> {
        let mut rules = Vec::new();
        while !self.is_at_end() {
            rules.push(self.parse_rule()?);
        }
        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_compiles_lazily_and_once() {
        let lit = RegexLiteral::new("/git(hub|lab)/i");
        assert!(lit.compiled.get().is_none());

        let first = lit.compiled().unwrap();
        let second = lit.compiled().unwrap();
        assert!(std::ptr::eq(first, second));
        assert!(first.is_match("GitLab"));
    }

    #[test]
    fn test_invalid_regex_is_cached_as_none() {
        let lit = RegexLiteral::new("/(unclosed/");
        assert!(lit.compiled().is_none());
        assert!(matches!(lit.compiled.get(), Some(None)));
        assert!(lit.compiled().is_none());
    }

    #[test]
    fn test_regex_cache_is_per_node() {
        let a = RegexLiteral::new("/page.[13]/");
        let b = RegexLiteral::new("/page.[13]/");
        assert_eq!(a, b);

        let ra = a.compiled().unwrap();
        assert!(b.compiled.get().is_none());
        let rb = b.compiled().unwrap();
        assert!(!std::ptr::eq(ra, rb));
    }
}
