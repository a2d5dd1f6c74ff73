//! Client configuration model.
//!
//! Loaded from `config.toml` by the infrastructure layer; every field has a
//! default so a missing or partial file is fine.

use crate::error::{Result, ShopdeskError};
use crate::resource::Resource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_API_URL: &str = "SHOPDESK_API_URL";
pub const ENV_LOG: &str = "SHOPDESK_LOG";
pub const ENV_DATA_DIR: &str = "SHOPDESK_DATA_DIR";

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Freshness window for resources without an override. Zero means
    /// every read goes to the network.
    pub default_stale_secs: u64,
    /// Per-resource overrides keyed by resource name (`categories = 600`).
    pub stale_secs: BTreeMap<String, u64>,
    /// How long an unobserved entry survives before garbage collection.
    pub cache_time_secs: u64,
    pub gc_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let stale_secs = [
            (Resource::Categories, 600),
            (Resource::BankAccounts, 300),
            (Resource::BusinessInfo, 300),
            (Resource::Users, 60),
        ]
        .into_iter()
        .map(|(resource, secs)| (resource.to_string(), secs))
        .collect();

        Self {
            default_stale_secs: 0,
            stale_secs,
            cache_time_secs: 300,
            gc_interval_secs: 60,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the persisted session. Platform data dir when unset.
    pub data_dir: Option<PathBuf>,
}

impl ClientConfig {
    pub fn stale_time(&self, resource: Resource) -> Duration {
        let secs = self
            .cache
            .stale_secs
            .get(&resource.to_string())
            .copied()
            .unwrap_or(self.cache.default_stale_secs);
        Duration::from_secs(secs)
    }

    pub fn cache_time(&self) -> Duration {
        Duration::from_secs(self.cache.cache_time_secs)
    }

    pub fn gc_interval(&self) -> Duration {
        Duration::from_secs(self.cache.gc_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    /// Applies `SHOPDESK_*` overrides read through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api.base_url = url;
        }
        if let Some(filter) = lookup(ENV_LOG) {
            self.logging.filter = filter;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.storage.data_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.api.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ShopdeskError::config(format!(
                "api.base_url must be an http(s) URL, got '{}'",
                self.api.base_url
            )));
        }
        if self.api.timeout_secs == 0 {
            return Err(ShopdeskError::config("api.timeout_secs must be positive"));
        }
        if self.cache.gc_interval_secs == 0 {
            return Err(ShopdeskError::config("cache.gc_interval_secs must be positive"));
        }
        for name in self.cache.stale_secs.keys() {
            Resource::from_str(name).map_err(|_| {
                ShopdeskError::config(format!("cache.stale_secs: unknown resource '{name}'"))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.stale_time(Resource::Accounts), Duration::ZERO);
        assert_eq!(config.stale_time(Resource::Categories), Duration::from_secs(600));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ClientConfig::default();
        config.apply_env_overrides(|key| match key {
            ENV_API_URL => Some("https://api.example.com".to_string()),
            _ => None,
        });
        assert_eq!(config.api.base_url, "https://api.example.com");
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_validate_rejects_unknown_resource() {
        let mut config = ClientConfig::default();
        config.cache.stale_secs.insert("widgets".to_string(), 10);
        assert!(matches!(config.validate(), Err(ShopdeskError::Config(_))));
    }
}
