//! Persistent runtime settings stored as `config.json` in the asset directory.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub notifications: NotificationConfig,
    pub uploads: UploadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationConfig {
    /// Turns the background due-date monitor on or off. The pending list is always served.
    pub enabled: bool,
    #[ts(type = "number")]
    pub poll_interval_secs: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadConfig {
    /// Hard cap on a request body, applied before any per-type limit.
    #[ts(type = "number")]
    pub max_upload_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 110 * MIB,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.notifications.poll_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "pollIntervalSecs must be at least 1".to_string(),
            ));
        }
        if self.uploads.max_upload_bytes < MIB {
            return Err(ConfigError::ValidationError(format!(
                "maxUploadBytes must be at least {MIB}"
            )));
        }
        Ok(())
    }
}

/// Read the config at `config_path`. A missing file yields defaults, which are
/// written back; an unreadable or invalid one yields defaults and is left alone.
pub async fn load_config_from_file(config_path: &Path) -> Config {
    match std::fs::read_to_string(config_path) {
        Ok(raw) => match serde_json::from_str::<Config>(&raw) {
            Ok(config) if config.validate().is_ok() => config,
            Ok(_) => {
                tracing::warn!(path = %config_path.display(), "Config out of range, using defaults");
                Config::default()
            }
            Err(e) => {
                tracing::warn!(path = %config_path.display(), error = %e, "Failed to parse config, using defaults");
                Config::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let config = Config::default();
            if let Err(e) = save_config_to_file(&config, config_path).await {
                tracing::warn!(path = %config_path.display(), error = %e, "Failed to write default config");
            } else {
                tracing::info!(path = %config_path.display(), "Wrote default config");
            }
            config
        }
        Err(e) => {
            tracing::warn!(path = %config_path.display(), error = %e, "Failed to read config, using defaults");
            Config::default()
        }
    }
}

pub async fn save_config_to_file(config: &Config, config_path: &Path) -> Result<(), ConfigError> {
    config.validate()?;
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let raw = serde_json::to_string_pretty(config)?;
    std::fs::write(config_path, raw)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = load_config_from_file(&path).await;
        assert_eq!(config, Config::default());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn partial_file_fills_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "notifications": { "enabled": false } }"#).unwrap();

        let config = load_config_from_file(&path).await;
        assert!(!config.notifications.enabled);
        assert_eq!(config.notifications.poll_interval_secs, 60);
        assert_eq!(config.uploads, UploadConfig::default());
    }

    #[tokio::test]
    async fn invalid_values_are_rejected_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = Config::default();
        config.notifications.poll_interval_secs = 0;

        let err = save_config_to_file(&config, &path).await.unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert!(!path.exists());

        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_config_from_file(&path).await, Config::default());
    }
}
