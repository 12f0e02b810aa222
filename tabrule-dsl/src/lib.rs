//! Tabrule DSL - Rule Language Parser & Compiler
//!
//! This crate provides the tokenizer, parser, pretty-printer and rule-set
//! compiler for tab automation rules, plus migration from the legacy rule
//! format.
//!
//! Architecture:
//! ```text
//! DSL Source (rule "..." { ... })
//!     ↓
//! Lexer (tokens, never fails)
//!     ↓
//! Parser (tokens → Vec<Rule>)
//!     ↓
//! RuleSetCompiler (semantic checks) → RuleSet
//!     ↓
//! Pretty Printer (canonical text, round-trip safe)
//! ```
//!
//! Legacy rules enter through `migration` and join the pipeline as `Rule`
//! values.

pub mod compiler;
pub mod lexer;
pub mod migration;
pub mod parser;
pub mod pretty_printer;
pub mod validation;

// Re-export key types for convenience
pub use compiler::*;
pub use lexer::{tokenize, Keyword, Lexer, Operator, Span, Token, TokenKind};
pub use migration::{migrate_rule, migrate_rules, LegacyAction, LegacyCondition, LegacyRule, MigrationWarning};
pub use parser::*;
pub use pretty_printer::{serialize_rule_to_dsl, serialize_rules_to_dsl};
pub use validation::{validate_dsl, ValidationResult};
