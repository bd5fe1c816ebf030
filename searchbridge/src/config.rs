//! Backend configuration
//!
//! ```toml
//! [client]
//! url = "http://localhost:9200"
//! request_timeout_ms = 30000
//! # version = "7.10"
//! # version_check = true
//!
//! [bulk]
//! max_items = 1000
//! max_bytes = 5242880
//! refresh = "none"
//!
//! [lifecycle]
//! strategy = "create-or-validate"
//! minimal_required_status = "yellow"
//!
//! [indexes.book]
//! schema = "schemas/book.yaml"
//! sharding = { strategy = "hash", number_of_shards = 4 }
//! ```

use crate::lifecycle::{IndexStatus, LifecycleStrategy};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub bulk: BulkConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Logical indexes managed by this backend, by logical name
    #[serde(default)]
    pub indexes: BTreeMap<String, IndexConfig>,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bulk.max_items == 0 {
            return Err(Error::Configuration("bulk.max_items must be at least 1".into()));
        }
        if self.bulk.max_bytes == 0 {
            return Err(Error::Configuration("bulk.max_bytes must be at least 1".into()));
        }
        if !self.client.version_check && self.client.version.is_none() {
            return Err(Error::Configuration(
                "client.version is required when client.version_check is disabled".into(),
            ));
        }
        Ok(())
    }

    /// Resolve a configured path against the configuration file's directory
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    #[serde(default = "default_url")]
    pub url: String,

    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Request timeout in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Expected engine version, e.g. "7", "7.10" or "opensearch:2.11"
    #[serde(default)]
    pub version: Option<String>,

    /// Ask the cluster for its version at bootstrap
    #[serde(default = "default_true")]
    pub version_check: bool,
}

fn default_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_connect_timeout() -> u64 {
    5000
}

fn default_request_timeout() -> u64 {
    30000
}

fn default_true() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            connect_timeout_ms: default_connect_timeout(),
            request_timeout_ms: default_request_timeout(),
            version: None,
            version_check: true,
        }
    }
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Refresh behaviour attached to document writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RefreshStrategy {
    /// Rely on the engine's periodic refresh
    #[default]
    None,
    /// Make every bulk request visible to searches before it returns
    Force,
}

/// Auto-flush thresholds of the bulk executor
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BulkConfig {
    /// Flush once this many operations are queued
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// Flush once the queued payload reaches this many bytes
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    #[serde(default)]
    pub refresh: RefreshStrategy,
}

fn default_max_items() -> usize {
    1000
}

fn default_max_bytes() -> usize {
    5 * 1024 * 1024 // 5MB
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            max_items: default_max_items(),
            max_bytes: default_max_bytes(),
            refresh: RefreshStrategy::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LifecycleConfig {
    /// What to do with each index at bootstrap
    #[serde(default)]
    pub strategy: LifecycleStrategy,

    /// Health status an index must reach after creation
    #[serde(default = "default_required_status")]
    pub minimal_required_status: IndexStatus,

    /// How long to wait for that status, in milliseconds
    #[serde(default = "default_status_wait_timeout")]
    pub status_wait_timeout_ms: u64,
}

fn default_required_status() -> IndexStatus {
    IndexStatus::Yellow
}

fn default_status_wait_timeout() -> u64 {
    10000
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            strategy: LifecycleStrategy::default(),
            minimal_required_status: default_required_status(),
            status_wait_timeout_ms: default_status_wait_timeout(),
        }
    }
}

impl LifecycleConfig {
    pub fn status_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.status_wait_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info,searchbridge=debug".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// How documents of one logical index are spread over shards
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum ShardingConfig {
    #[default]
    None,
    Hash {
        number_of_shards: usize,
    },
    Explicit {
        shard_identifiers: Vec<String>,
    },
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct IndexConfig {
    /// Expected mappings/settings (YAML or JSON)
    #[serde(default)]
    pub schema: Option<PathBuf>,

    #[serde(default)]
    pub sharding: ShardingConfig,

    /// Overrides `lifecycle.strategy` for this index
    #[serde(default)]
    pub lifecycle: Option<LifecycleStrategy>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.client.url, "http://localhost:9200");
        assert_eq!(config.bulk.max_items, 1000);
        assert_eq!(config.bulk.refresh, RefreshStrategy::None);
        assert_eq!(config.lifecycle.strategy, LifecycleStrategy::CreateOrValidate);
        assert!(config.indexes.is_empty());
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml(
            r#"
[client]
url = "https://search.internal:9200"
version = "7.10"

[bulk]
max_items = 3
refresh = "force"

[lifecycle]
strategy = "create-or-update"
minimal_required_status = "green"

[indexes.book]
schema = "schemas/book.yaml"
sharding = { strategy = "hash", number_of_shards = 4 }

[indexes.author]
sharding = { strategy = "explicit", shard_identifiers = ["eu", "us"] }
lifecycle = "validate"
"#,
        )
        .unwrap();

        assert_eq!(config.client.version.as_deref(), Some("7.10"));
        assert_eq!(config.bulk.max_items, 3);
        assert_eq!(config.bulk.refresh, RefreshStrategy::Force);
        assert_eq!(config.lifecycle.minimal_required_status, IndexStatus::Green);
        assert_eq!(
            config.indexes["book"].sharding,
            ShardingConfig::Hash { number_of_shards: 4 }
        );
        assert_eq!(config.indexes["author"].lifecycle, Some(LifecycleStrategy::Validate));
    }

    #[test]
    fn test_version_required_without_check() {
        let err = Config::from_toml("[client]\nversion_check = false\n").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("searchbridge.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[indexes.book]\nschema = \"book.yaml\"").unwrap();

        let config = Config::load(&path).unwrap();
        let schema = config.indexes["book"].schema.as_ref().unwrap();
        assert_eq!(config.resolve_path(schema), dir.path().join("book.yaml"));
    }
}
