//! Parser module for the rule DSL

pub mod ast;
pub mod parser;

pub use ast::*;
pub use parser::*;
