//! YAML configuration surface.
//!
//! Provider and cache identifiers are validated against their static tables
//! when a config is loaded, so a typo fails at startup rather than on the
//! first conversion.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache;
use crate::error::Error;
use crate::providers;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    #[default]
    Https,
}

impl Protocol {
    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

fn default_provider() -> String {
    providers::OpenExchangeRates::ID.to_string()
}

fn default_fallback() -> Vec<String> {
    vec![providers::Ecb::ID.to_string()]
}

fn default_retries() -> u32 {
    7
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Primary provider identifier.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Ordered fallback chain consulted after the primary is exhausted.
    #[serde(default = "default_fallback")]
    pub fallback: Vec<String>,
    /// Attempts per provider before cascading.
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Per-provider endpoint overrides, mainly for tests.
    #[serde(default)]
    pub base_urls: HashMap<String, String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            fallback: default_fallback(),
            retries: default_retries(),
            app_id: None,
            protocol: Protocol::default(),
            timeout_secs: default_timeout_secs(),
            base_urls: HashMap::new(),
        }
    }
}

impl ApiConfig {
    /// Primary followed by the fallbacks, in consultation order.
    pub fn provider_chain(&self) -> Vec<String> {
        std::iter::once(self.provider.clone())
            .chain(self.fallback.iter().cloned())
            .collect()
    }

    pub fn base_url_for(&self, id: &str) -> Option<&str> {
        self.base_urls.get(id).map(String::as_str)
    }
}

fn default_backend() -> String {
    cache::MEMORY.to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Directory for the disk backend.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct CambistConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl CambistConfig {
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let config_str = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "failed to read config file {}: {e}",
                path.as_ref().display()
            ))
        })?;

        let config: Self = serde_yaml::from_str(&config_str).map_err(|e| {
            Error::Config(format!(
                "failed to parse config file {}: {e}",
                path.as_ref().display()
            ))
        })?;
        config.validate()?;
        debug!("successfully loaded config");
        Ok(config)
    }

    /// Resolves every configured identifier against the static tables.
    pub fn validate(&self) -> Result<(), Error> {
        for id in self.api.provider_chain() {
            if !providers::PROVIDERS.contains(&id.as_str()) {
                return Err(Error::Config(format!("unknown rate provider: {id}")));
            }
        }
        if !cache::BACKENDS.contains(&self.cache.backend.as_str()) {
            return Err(Error::Config(format!(
                "unknown cache backend: {}",
                self.cache.backend
            )));
        }
        if self.cache.backend == cache::DISK && self.cache.path.is_none() {
            return Err(Error::Config(
                "disk cache backend requires a path".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_surface() {
        let config = CambistConfig::default();
        assert_eq!(config.api.provider, "open_exchange_rates");
        assert_eq!(config.api.fallback, vec!["ecb".to_string()]);
        assert_eq!(config.api.retries, 7);
        assert_eq!(config.api.protocol, Protocol::Https);
        assert_eq!(config.api.timeout_secs, 30);
        assert!(config.api.app_id.is_none());
        assert_eq!(config.cache.backend, "memory");
    }

    #[test]
    fn deserializes_a_full_document() {
        let yaml = r#"
api:
  provider: ecb
  fallback: [open_exchange_rates, fixed]
  retries: 3
  app_id: "KEY"
  protocol: http
  timeout_secs: 5
  base_urls:
    ecb: "http://localhost:9999"
cache:
  backend: disk
  path: "/tmp/rates"
"#;
        let config: CambistConfig = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();

        assert_eq!(config.api.provider, "ecb");
        assert_eq!(
            config.api.provider_chain(),
            vec!["ecb", "open_exchange_rates", "fixed"]
        );
        assert_eq!(config.api.retries, 3);
        assert_eq!(config.api.app_id.as_deref(), Some("KEY"));
        assert_eq!(config.api.protocol.scheme(), "http");
        assert_eq!(
            config.api.base_url_for("ecb"),
            Some("http://localhost:9999")
        );
        assert_eq!(config.cache.backend, "disk");
        assert_eq!(config.cache.path.as_deref(), Some("/tmp/rates"));
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config: CambistConfig = serde_yaml::from_str("{}").unwrap();
        config.validate().unwrap();
        assert_eq!(config.api.retries, 7);
    }

    #[test]
    fn rejects_unknown_provider_ids() {
        let yaml = "api:\n  provider: random\n";
        let config: CambistConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn rejects_unknown_fallback_ids() {
        let yaml = "api:\n  fallback: [ecb, random]\n";
        let config: CambistConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn rejects_unknown_cache_backends() {
        let yaml = "cache:\n  backend: sled\n";
        let config: CambistConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn disk_backend_requires_a_path() {
        let yaml = "cache:\n  backend: disk\n";
        let config: CambistConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn loads_from_a_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "api:\n  retries: 2\n").unwrap();

        let config = CambistConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.api.retries, 2);

        let err = CambistConfig::load_from_path("/does/not/exist.yaml").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
