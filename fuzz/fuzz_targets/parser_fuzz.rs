//! Fuzz target for the rule parser and validation boundary
//!
//! Parsing returns `Ok` or a located `ParseError`, never panics. Anything
//! that parses must print and re-parse to the same rules.
//!
//! Run with: cargo +nightly fuzz run parser_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use tabrule_dsl::{parse_dsl, serialize_rules_to_dsl, validate_dsl};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        match parse_dsl(input) {
            Ok(rules) => {
                let printed = serialize_rules_to_dsl(&rules);
                match parse_dsl(&printed) {
                    Ok(reparsed) => assert_eq!(rules, reparsed, "round trip changed rules:\n{}", printed),
                    Err(e) => panic!("printed rules failed to parse: {}\n{}", e, printed),
                }
            }
            Err(err) => {
                assert!(err.line >= 1, "error line should be >= 1");
                assert!(err.column >= 1, "error column should be >= 1");
                assert!(!err.message.is_empty(), "error message should not be empty");
            }
        }

        let result = validate_dsl(input);
        assert_eq!(result.valid, result.rules.is_some());
        assert_eq!(result.valid, result.error.is_none());
    }
});
