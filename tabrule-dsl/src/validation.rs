//! Non-throwing validation boundary for DSL text.

use crate::compiler::RuleSetCompiler;
use crate::parser::{parse_dsl, Rule};
use serde::{Deserialize, Serialize};

/// Outcome of validating DSL source.
///
/// Exactly one of `rules` / `error` is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<Rule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationResult {
    fn ok(rules: Vec<Rule>) -> Self {
        Self {
            valid: true,
            rules: Some(rules),
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            valid: false,
            rules: None,
            error: Some(error),
        }
    }
}

/// Parse and compile `source`, folding any failure into the result.
pub fn validate_dsl(source: &str) -> ValidationResult {
    let rules = match parse_dsl(source) {
        Ok(rules) => rules,
        Err(e) => return ValidationResult::failed(e.to_string()),
    };

    match RuleSetCompiler::compile(rules) {
        Ok(set) => ValidationResult::ok(set.into_rules()),
        Err(e) => ValidationResult::failed(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_source() {
        let result = validate_dsl(r#"rule "Ok" { when tab.domain == "a.com" then close }"#);
        assert!(result.valid);
        assert_eq!(result.rules.as_ref().map(Vec::len), Some(1));
        assert!(result.error.is_none());
    }

    #[test]
    fn test_extra_operator_token() {
        let result = validate_dsl(r#"rule "X" { when tab.age > > 7d }"#);
        assert!(!result.valid);
        assert!(result.rules.is_none());
        let error = result.error.unwrap_or_default();
        assert!(error.contains("Unexpected") || error.contains("Expected"));
    }

    #[test]
    fn test_unterminated_body() {
        let result = validate_dsl(r#"rule "X" { then close"#);
        assert!(!result.valid);
        let error = result.error.unwrap_or_default();
        assert!(error.contains("EOF"));
        assert!(error.contains("RBRACE"));
    }

    #[test]
    fn test_compile_errors_use_same_shape() {
        let result = validate_dsl(r#"rule "A" { } rule "A" { }"#);
        assert!(!result.valid);
        assert_eq!(
            result.error.as_deref(),
            Some("duplicate rule: 'A' is already defined")
        );
    }

    #[test]
    fn test_json_shape_omits_absent_fields() {
        let result = validate_dsl("rule");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["valid"], false);
        assert!(value.get("rules").is_none());
        assert!(value["error"].as_str().unwrap_or("").contains("Expected STRING"));
    }
}
