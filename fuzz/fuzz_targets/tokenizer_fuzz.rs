//! Fuzz target for the rule tokenizer
//!
//! The tokenizer never fails: any UTF-8 input yields a token stream that
//! ends in EOF with well-formed spans.
//!
//! Run with: cargo +nightly fuzz run tokenizer_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use tabrule_dsl::{Lexer, TokenKind};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let tokens = Lexer::new(input).tokenize();

        assert!(
            matches!(tokens.last().map(|t| &t.kind), Some(TokenKind::Eof)),
            "token stream must end in EOF"
        );

        let mut previous_end = 0;
        for token in &tokens {
            assert!(token.span.start <= token.span.end, "span start after end");
            assert!(token.span.end <= input.len(), "span past end of input");
            assert!(token.span.start >= previous_end, "spans overlap");
            assert!(token.span.line >= 1 && token.span.column >= 1);
            previous_end = token.span.end;
        }
    }
});
