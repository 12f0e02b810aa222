//! Lexer module for the rule DSL

pub mod token;
pub mod scanner;

pub use token::*;
pub use scanner::*;
