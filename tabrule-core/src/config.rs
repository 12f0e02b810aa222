//! Configuration types

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// A referrer service recognised when classifying tab origins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginService {
    /// Name reported as the tab's origin (e.g. "google").
    pub name: String,
    /// Hosts that identify the service; subdomains match too.
    pub hosts: Vec<String>,
}

impl OriginService {
    pub fn new(name: &str, hosts: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            hosts: hosts.iter().map(|h| h.to_string()).collect(),
        }
    }
}

/// Origin classification settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginConfig {
    /// Sentinel used when a tab has no (valid) referrer.
    pub direct: String,
    /// Known services, checked in order.
    pub services: Vec<OriginService>,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            direct: "direct".to_string(),
            services: vec![
                // gmail must precede google: mail.google.com would match both
                OriginService::new("gmail", &["mail.google.com"]),
                OriginService::new("google", &["google.com"]),
                OriginService::new("bing", &["bing.com"]),
                OriginService::new("duckduckgo", &["duckduckgo.com"]),
                OriginService::new("reddit", &["reddit.com"]),
                OriginService::new("hackernews", &["news.ycombinator.com"]),
                OriginService::new("twitter", &["twitter.com", "x.com", "t.co"]),
                OriginService::new("facebook", &["facebook.com"]),
                OriginService::new("linkedin", &["linkedin.com"]),
                OriginService::new("youtube", &["youtube.com"]),
                OriginService::new("github", &["github.com"]),
                OriginService::new("slack", &["slack.com"]),
            ],
        }
    }
}

/// Category settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    /// Sentinel category for domains without a mapping.
    pub unknown: String,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            unknown: "unknown".to_string(),
        }
    }
}

/// Duplicate-key normalization settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupeConfig {
    pub strip_query: bool,
    pub strip_fragment: bool,
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            strip_query: true,
            strip_fragment: true,
        }
    }
}

/// Master engine configuration.
///
/// Every section has defaults, so a partial TOML file only needs to name
/// the values it overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub origins: OriginConfig,
    pub categories: CategoryConfig,
    pub dedupe: DedupeConfig,
}

impl EngineConfig {
    /// Parse a TOML document and validate it.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig =
            toml::from_str(source).map_err(|e| ConfigError::ParseFailed {
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot reject on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.origins.direct.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "origins.direct".to_string(),
                value: self.origins.direct.clone(),
                reason: "sentinel must not be empty".to_string(),
            });
        }
        if self.categories.unknown.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "categories.unknown".to_string(),
                value: self.categories.unknown.clone(),
                reason: "sentinel must not be empty".to_string(),
            });
        }
        for (i, service) in self.origins.services.iter().enumerate() {
            if service.name.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("origins.services[{}].name", i),
                    value: service.name.clone(),
                    reason: "service name must not be empty".to_string(),
                });
            }
            if service.hosts.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("origins.services[{}].hosts", i),
                    value: String::new(),
                    reason: "service needs at least one host".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.origins.direct, "direct");
        assert_eq!(config.categories.unknown, "unknown");
        assert!(config.dedupe.strip_query);
        assert!(config.dedupe.strip_fragment);
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let source = r#"
            [dedupe]
            strip_fragment = false

            [origins]
            direct = "typed"

            [[origins.services]]
            name = "intranet"
            hosts = ["corp.example.com"]
        "#;
        let config = EngineConfig::from_toml_str(source).unwrap();
        assert!(config.dedupe.strip_query);
        assert!(!config.dedupe.strip_fragment);
        assert_eq!(config.origins.direct, "typed");
        assert_eq!(config.origins.services.len(), 1);
        assert_eq!(config.origins.services[0].name, "intranet");
        assert_eq!(config.categories.unknown, "unknown");
    }

    #[test]
    fn test_empty_sentinel_rejected() {
        let err = EngineConfig::from_toml_str("[categories]\nunknown = \"\"").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "categories.unknown"));
    }

    #[test]
    fn test_service_without_hosts_rejected() {
        let source = "[[origins.services]]\nname = \"x\"\nhosts = []";
        let err = EngineConfig::from_toml_str(source).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let err = EngineConfig::from_toml_str("[origins").unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailed { .. }));
    }
}
