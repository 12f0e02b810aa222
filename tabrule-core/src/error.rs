//! Error types for tabrule operations

use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {reason}")]
    ParseFailed { reason: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Category table errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CategoryError {
    #[error("Failed to load category table: {reason}")]
    LoadFailed { reason: String },
}

/// Master error type for core operations.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Category error: {0}")]
    Category(#[from] CategoryError),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidValue {
            field: "origins.direct".to_string(),
            value: "".to_string(),
            reason: "must not be empty".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("origins.direct"));
        assert!(msg.contains("must not be empty"));
    }

    #[test]
    fn test_core_error_from_category_error() {
        let err: CoreError = CategoryError::LoadFailed {
            reason: "bad json".to_string(),
        }
        .into();
        assert!(format!("{}", err).starts_with("Category error:"));
    }
}
