//! Engine configuration.
//!
//! Values are read from an optional file (any format the `config` crate recognizes by extension)
//! and then from `RULE_ENGINE_*` environment variables, where `__` separates nested keys:
//! `RULE_ENGINE_STORE__SNAPSHOT_PATH` sets `store.snapshot_path`. Every value has a default.

use crate::store::{RuleStore, StoreError};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Where stored rules live.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON snapshot mirroring the store. Rules are kept in memory only when unset.
    pub snapshot_path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn open(&self) -> Result<RuleStore, StoreError> {
        match &self.snapshot_path {
            Some(path) => RuleStore::open(path),
            None => Ok(RuleStore::new()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, overridden by `RUST_LOG` when set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

impl EngineConfig {
    pub const ENV_PREFIX: &'static str = "RULE_ENGINE";

    /// Load the configuration; the file, when given, must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder
            .add_source(
                Environment::with_prefix(Self::ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn default_config_keeps_rules_in_memory() {
        let config = EngineConfig::default();

        assert_eq!(None, config.store.snapshot_path);
        assert_eq!("info", config.logging.level);
        assert_eq!(LogFormat::Pretty, config.logging.format);
    }

    #[test]
    fn can_load_a_toml_file() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("engine.toml");
        fs::write(
            &path,
            r#"
[store]
snapshot_path = "/var/lib/rules.json"

[logging]
level = "debug"
format = "json"
"#,
        )
        .unwrap();

        let config = EngineConfig::load(Some(&path)).unwrap();

        assert_eq!(
            Some(PathBuf::from("/var/lib/rules.json")),
            config.store.snapshot_path
        );
        assert_eq!("debug", config.logging.level);
        assert_eq!(LogFormat::Json, config.logging.format);
    }

    #[test]
    fn missing_keys_fall_back_to_their_defaults() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("engine.toml");
        fs::write(&path, "[logging]\nformat = \"json\"\n").unwrap();

        let config = EngineConfig::load(Some(&path)).unwrap();

        assert_eq!(None, config.store.snapshot_path);
        assert_eq!("info", config.logging.level);
        assert_eq!(LogFormat::Json, config.logging.format);
    }

    #[test]
    fn return_an_error_when_the_file_is_missing() {
        let directory = tempfile::tempdir().unwrap();

        let config = EngineConfig::load(Some(&directory.path().join("missing.toml")));

        assert!(config.is_err());
    }

    #[test]
    fn return_an_error_on_an_unknown_log_format() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("engine.toml");
        fs::write(&path, "[logging]\nformat = \"xml\"\n").unwrap();

        assert!(EngineConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn can_open_the_configured_store() {
        let directory = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            snapshot_path: Some(directory.path().join("rules.json")),
        };

        let store = config.open().unwrap();

        assert!(store.is_empty());
        assert!(StoreConfig::default().open().unwrap().is_empty());
    }
}
