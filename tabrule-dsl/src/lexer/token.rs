//! Lexer token types

use std::fmt;

// ============================================================================
// LEXER TYPES
// ============================================================================

/// Reserved words of the rule DSL. Matched case-sensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Rule,
    When,
    Then,
    Trigger,
    Flags,
    All,
    Any,
    In,
    Is,
    Contains,
    Regex,
    Group,
    Snooze,
    Close,
    Immediate,
    Repeat,
    Every,
    Once,
    At,
    OnAction,
    Manual,
    And,
    Name,
    By,
    For,
}

impl Keyword {
    /// Look up a bare word. Returns `None` for ordinary paths.
    pub fn from_word(word: &str) -> Option<Self> {
        let keyword = match word {
            "rule" => Keyword::Rule,
            "when" => Keyword::When,
            "then" => Keyword::Then,
            "trigger" => Keyword::Trigger,
            "flags" => Keyword::Flags,
            "all" => Keyword::All,
            "any" => Keyword::Any,
            "in" => Keyword::In,
            "is" => Keyword::Is,
            "contains" => Keyword::Contains,
            "regex" => Keyword::Regex,
            "group" => Keyword::Group,
            "snooze" => Keyword::Snooze,
            "close" => Keyword::Close,
            "immediate" => Keyword::Immediate,
            "repeat" => Keyword::Repeat,
            "every" => Keyword::Every,
            "once" => Keyword::Once,
            "at" => Keyword::At,
            "onAction" => Keyword::OnAction,
            "manual" => Keyword::Manual,
            "and" => Keyword::And,
            "name" => Keyword::Name,
            "by" => Keyword::By,
            "for" => Keyword::For,
            _ => return None,
        };
        Some(keyword)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Rule => "rule",
            Keyword::When => "when",
            Keyword::Then => "then",
            Keyword::Trigger => "trigger",
            Keyword::Flags => "flags",
            Keyword::All => "all",
            Keyword::Any => "any",
            Keyword::In => "in",
            Keyword::Is => "is",
            Keyword::Contains => "contains",
            Keyword::Regex => "regex",
            Keyword::Group => "group",
            Keyword::Snooze => "snooze",
            Keyword::Close => "close",
            Keyword::Immediate => "immediate",
            Keyword::Repeat => "repeat",
            Keyword::Every => "every",
            Keyword::Once => "once",
            Keyword::At => "at",
            Keyword::OnAction => "onAction",
            Keyword::Manual => "manual",
            Keyword::And => "and",
            Keyword::Name => "name",
            Keyword::By => "by",
            Keyword::For => "for",
        }
    }
}

/// Relational operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
        }
    }
}

/// Token kinds for the rule DSL.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Keyword(Keyword),
    /// Dotted attribute reference or bare identifier (`tab.age`, `skipPinned`).
    Path(String),
    /// Unescaped string literal contents.
    String(String),
    Number(f64),
    /// Duration literal text, e.g. `30m`.
    Duration(String),
    /// Whole regex literal, slashes and flags included.
    Regex(String),
    Operator(Operator),
    /// Structural punctuation, or any character the lexer does not recognise.
    Punct(char),
    Eof,
}

impl TokenKind {
    /// Upper-case class name used in diagnostics.
    pub fn class_name(&self) -> &'static str {
        match self {
            TokenKind::Keyword(_) => "KEYWORD",
            TokenKind::Path(_) => "PATH",
            TokenKind::String(_) => "STRING",
            TokenKind::Number(_) => "NUMBER",
            TokenKind::Duration(_) => "DURATION",
            TokenKind::Regex(_) => "REGEX",
            TokenKind::Operator(_) => "OPERATOR",
            TokenKind::Punct(c) => punct_name(*c).unwrap_or("PUNCT"),
            TokenKind::Eof => "EOF",
        }
    }
}

/// Names for structural punctuation, as used in "Expected RBRACE" messages.
pub fn punct_name(c: char) -> Option<&'static str> {
    match c {
        '{' => Some("LBRACE"),
        '}' => Some("RBRACE"),
        '(' => Some("LPAREN"),
        ')' => Some("RPAREN"),
        '[' => Some("LBRACKET"),
        ']' => Some("RBRACKET"),
        ',' => Some("COMMA"),
        _ => None,
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Keyword(k) => write!(f, "KEYWORD '{}'", k.as_str()),
            TokenKind::Path(p) => write!(f, "PATH '{}'", p),
            TokenKind::String(s) => write!(f, "STRING \"{}\"", s),
            TokenKind::Number(n) => write!(f, "NUMBER {}", n),
            TokenKind::Duration(d) => write!(f, "DURATION {}", d),
            TokenKind::Regex(r) => write!(f, "REGEX {}", r),
            TokenKind::Operator(op) => write!(f, "OPERATOR '{}'", op.as_str()),
            TokenKind::Punct(c) => match punct_name(*c) {
                Some(name) => f.write_str(name),
                None => write!(f, "PUNCT '{}'", c),
            },
            TokenKind::Eof => f.write_str("EOF"),
        }
    }
}

/// Source location span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Default for Span {
    fn default() -> Self {
        Self {
            start: 0,
            end: 0,
            line: 1,
            column: 1,
        }
    }
}

/// A token with its kind and source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}
