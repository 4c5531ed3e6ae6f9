use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub dataset: DatasetConfig,
    pub cache: CacheConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Dispatches slower than this log at warn.
    pub slow_threshold_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            slow_threshold_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DatasetConfig {
    pub path: String,
    pub seed: u64,
    pub tickets: usize,
    pub customers: usize,
    pub span_days: i64,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: "data/analytics-dataset.json".to_string(),
            seed: 42,
            tickets: 6000,
            customers: 180,
            span_days: 90,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_seconds: 600 }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LimitsConfig {
    pub query_concurrency: usize,
    pub acquire_timeout_ms: u64,
    pub resolver_budget_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            query_concurrency: 16,
            acquire_timeout_ms: 2_000,
            resolver_budget_ms: 10_000,
        }
    }
}

impl Settings {
    /// Layered load: optional `config/settings` file, then `APP__`-prefixed
    /// environment overrides. Every field has a default so the binary runs
    /// with no configuration at all.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config/settings").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }

    pub fn dataset_path(&self) -> PathBuf {
        PathBuf::from(&self.dataset.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_section() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.dataset.tickets, 6000);
        assert_eq!(settings.dataset.span_days, 90);
        assert_eq!(settings.cache.ttl_seconds, 600);
        assert_eq!(settings.limits.query_concurrency, 16);
    }

    #[test]
    fn empty_config_deserializes_via_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.dataset.seed, 42);
    }
}
