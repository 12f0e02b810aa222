//! Duration literals ("30m", "7d") and their millisecond values.
//!
//! Parsing is deliberately permissive: any malformed input yields `0`,
//! which callers treat as "no effective delay".

use crate::DurationMs;
use serde_json::Value;

const MINUTE_MS: u64 = 60 * 1000;
const HOUR_MS: u64 = 60 * MINUTE_MS;
const DAY_MS: u64 = 24 * HOUR_MS;

/// Parse a duration literal of the exact shape `^\d+[mhd]$`.
///
/// Returns `0` for anything else (empty input, missing unit, decimals,
/// whitespace, signs, unknown units).
pub fn parse_duration(input: &str) -> DurationMs {
    let Some(unit) = input.chars().last() else {
        return 0;
    };
    let multiplier = match unit {
        'm' => MINUTE_MS,
        'h' => HOUR_MS,
        'd' => DAY_MS,
        _ => return 0,
    };

    let digits = &input[..input.len() - 1];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return 0;
    }

    digits
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .unwrap_or(0)
}

/// Parse a loosely typed duration value.
///
/// Non-negative integers are already milliseconds and pass through; strings
/// go through [`parse_duration`]; every other JSON shape yields `0`.
pub fn parse_duration_value(value: &Value) -> DurationMs {
    match value {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::String(s) => parse_duration(s),
        _ => 0,
    }
}

/// Render milliseconds using the largest exact unit (days, hours, minutes).
///
/// Values that are not a whole number of minutes fall back to an `ms`
/// suffix; that form is only ever produced, never parsed.
pub fn serialize_duration(ms: DurationMs) -> String {
    if ms == 0 {
        return "0m".to_string();
    }
    if ms % DAY_MS == 0 {
        format!("{}d", ms / DAY_MS)
    } else if ms % HOUR_MS == 0 {
        format!("{}h", ms / HOUR_MS)
    } else if ms % MINUTE_MS == 0 {
        format!("{}m", ms / MINUTE_MS)
    } else {
        format!("{}ms", ms)
    }
}

/// True when `input` is a well-formed duration literal.
pub fn is_duration_literal(input: &str) -> bool {
    input.len() >= 2
        && matches!(input.as_bytes()[input.len() - 1], b'm' | b'h' | b'd')
        && input[..input.len() - 1].bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_duration("30m"), 30 * 60 * 1000);
        assert_eq!(parse_duration("1h"), 3_600_000);
        assert_eq!(parse_duration("7d"), 7 * 86_400_000);
        assert_eq!(parse_duration("0m"), 0);
    }

    #[test]
    fn test_malformed_inputs_yield_zero() {
        for input in ["", "h", "1.5h", "1 h", " 1h", "1h ", "-1h", "+1h", "10", "10s", "10ms", "1w", "h1"] {
            assert_eq!(parse_duration(input), 0, "input {:?}", input);
        }
    }

    #[test]
    fn test_overflow_yields_zero() {
        assert_eq!(parse_duration("99999999999999999999d"), 0);
        assert_eq!(parse_duration("999999999999999d"), 0);
    }

    #[test]
    fn test_parse_value_shapes() {
        assert_eq!(parse_duration_value(&json!(1500)), 1500);
        assert_eq!(parse_duration_value(&json!("2h")), 7_200_000);
        assert_eq!(parse_duration_value(&json!(-5)), 0);
        assert_eq!(parse_duration_value(&json!(1.5)), 0);
        assert_eq!(parse_duration_value(&json!(true)), 0);
        assert_eq!(parse_duration_value(&json!(null)), 0);
        assert_eq!(parse_duration_value(&json!(["1h"])), 0);
        assert_eq!(parse_duration_value(&json!({"h": 1})), 0);
    }

    #[test]
    fn test_serialize_prefers_largest_unit() {
        assert_eq!(serialize_duration(86_400_000), "1d");
        assert_eq!(serialize_duration(2 * 86_400_000), "2d");
        assert_eq!(serialize_duration(90 * 60 * 1000), "90m");
        assert_eq!(serialize_duration(3 * 3_600_000), "3h");
        assert_eq!(serialize_duration(25 * 3_600_000), "25h");
        assert_eq!(serialize_duration(1500), "1500ms");
        assert_eq!(serialize_duration(0), "0m");
    }

    #[test]
    fn test_is_duration_literal() {
        assert!(is_duration_literal("7d"));
        assert!(is_duration_literal("30m"));
        assert!(!is_duration_literal("d"));
        assert!(!is_duration_literal("1.5h"));
        assert!(!is_duration_literal("7"));
    }
}
