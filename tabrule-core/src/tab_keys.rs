//! Keys derived from a tab's URL and referrer.

use crate::config::{DedupeConfig, OriginConfig};
use url::Url;

/// Host of `url` lowercased and stripped of a leading `www.`.
///
/// Returns an empty string when the URL cannot be parsed or has no host.
pub fn extract_domain(url: &str) -> String {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return String::new();
    };
    let Some(host) = parsed.host_str() else {
        return String::new();
    };
    let host = host.to_ascii_lowercase();
    match host.strip_prefix("www.") {
        Some(stripped) => stripped.to_string(),
        None => host,
    }
}

/// Normalize a URL for duplicate detection.
///
/// Two URLs that differ only by query string or fragment collapse to the
/// same key (subject to `config`).
pub fn dupe_key(url: &str, config: &DedupeConfig) -> String {
    match Url::parse(url.trim()) {
        Ok(mut parsed) => {
            if config.strip_query {
                parsed.set_query(None);
            }
            if config.strip_fragment {
                parsed.set_fragment(None);
            }
            parsed.to_string()
        }
        Err(_) => {
            let mut key = url.trim();
            if config.strip_fragment {
                key = key.split('#').next().unwrap_or(key);
            }
            if config.strip_query {
                key = key.split('?').next().unwrap_or(key);
            }
            key.to_string()
        }
    }
}

/// Classifies a tab's referrer into a coarse origin.
#[derive(Debug, Clone)]
pub struct OriginClassifier {
    config: OriginConfig,
}

impl OriginClassifier {
    pub fn new(config: OriginConfig) -> Self {
        Self { config }
    }

    /// Known service name, else the referrer's domain, else the `direct`
    /// sentinel (no referrer, empty referrer or unparsable URL).
    pub fn classify(&self, referrer: Option<&str>) -> String {
        let domain = referrer.map(extract_domain).unwrap_or_default();
        if domain.is_empty() {
            return self.config.direct.clone();
        }

        for service in &self.config.services {
            let matched = service.hosts.iter().any(|host| {
                let host = host.to_ascii_lowercase();
                domain == host || domain.ends_with(&format!(".{}", host))
            });
            if matched {
                return service.name.clone();
            }
        }

        domain
    }

    pub fn direct_sentinel(&self) -> &str {
        &self.config.direct
    }
}

impl Default for OriginClassifier {
    fn default() -> Self {
        Self::new(OriginConfig::default())
    }
}
