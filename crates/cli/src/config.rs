//! CLI configuration management

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tether::EngineConfig;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CliConfig {
    #[serde(default)]
    pub general: GeneralSettings,
    #[serde(default)]
    pub capture: CaptureSettings,
    #[serde(default)]
    pub engine: EngineSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralSettings {
    /// Default log level; `RUST_LOG` and `--log-level` override it.
    #[serde(default = "GeneralSettings::default_log_level")]
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

impl GeneralSettings {
    fn default_log_level() -> String {
        "warn".to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Photo download directory.
    #[serde(default = "CaptureSettings::default_output_dir")]
    pub output_dir: PathBuf,
    /// Leave captured files on the camera's storage instead of deleting
    /// them after download.
    #[serde(default)]
    pub keep_on_camera: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            output_dir: Self::default_output_dir(),
            keep_on_camera: false,
        }
    }
}

impl CaptureSettings {
    fn default_output_dir() -> PathBuf {
        PathBuf::from("./tether")
    }
}

/// Engine timing knobs, mirrored from [`tether::EngineConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "EngineSettings::default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
    #[serde(default = "EngineSettings::default_miss_threshold")]
    pub miss_threshold: u32,
    #[serde(default = "EngineSettings::default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,
    #[serde(default = "EngineSettings::default_init_backoff_secs")]
    pub init_backoff_secs: u64,
    #[serde(default = "EngineSettings::default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            poll_timeout_ms: Self::default_poll_timeout_ms(),
            miss_threshold: Self::default_miss_threshold(),
            retry_backoff_secs: Self::default_retry_backoff_secs(),
            init_backoff_secs: Self::default_init_backoff_secs(),
            channel_capacity: Self::default_channel_capacity(),
        }
    }
}

impl EngineSettings {
    fn default_poll_timeout_ms() -> u64 {
        500
    }

    fn default_miss_threshold() -> u32 {
        10
    }

    fn default_retry_backoff_secs() -> u64 {
        1
    }

    fn default_init_backoff_secs() -> u64 {
        10
    }

    fn default_channel_capacity() -> usize {
        16
    }
}

impl CliConfig {
    /// Load configuration from the specified path, or the first standard
    /// location that exists.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p
        } else {
            let candidates = vec![Self::default_path(), PathBuf::from("/etc/tether/config.toml")];

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found, using defaults"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: CliConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config.validate()?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Load configuration or return defaults if not found.
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("No config loaded: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Default configuration file path.
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("tether").join("config.toml")
        } else {
            PathBuf::from(".config/tether/config.toml")
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.general.log_level,
                valid_levels.join(", ")
            ));
        }

        if self.engine.poll_timeout_ms == 0 {
            return Err(anyhow!("poll_timeout_ms must be greater than 0"));
        }
        if self.engine.channel_capacity == 0 {
            return Err(anyhow!("channel_capacity must be greater than 0"));
        }

        Ok(())
    }

    /// Translate the file-level settings into the engine's config.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            poll_timeout: Duration::from_millis(self.engine.poll_timeout_ms),
            miss_threshold: self.engine.miss_threshold,
            retry_backoff: Duration::from_secs(self.engine.retry_backoff_secs),
            init_backoff: Duration::from_secs(self.engine.init_backoff_secs),
            channel_capacity: self.engine.channel_capacity,
            delete_after_fetch: !self.capture.keep_on_camera,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();

        assert_eq!(config.general.log_level, "warn");
        assert_eq!(config.capture.output_dir, PathBuf::from("./tether"));
        assert!(!config.capture.keep_on_camera);
        assert_eq!(config.engine.poll_timeout_ms, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_engine_config_mapping() {
        let mut config = CliConfig::default();
        config.capture.keep_on_camera = true;
        config.engine.retry_backoff_secs = 2;

        let engine = config.engine_config();
        assert_eq!(engine.poll_timeout, Duration::from_millis(500));
        assert_eq!(engine.retry_backoff, Duration::from_secs(2));
        assert_eq!(engine.init_backoff, Duration::from_secs(10));
        assert!(!engine.delete_after_fetch);
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = CliConfig::default();
        assert!(config.validate().is_ok());

        config.general.log_level = "loud".to_string();
        assert!(config.validate().is_err());

        config.general.log_level = "debug".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut config = CliConfig::default();
        config.engine.channel_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = CliConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: CliConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.general.log_level, parsed.general.log_level);
        assert_eq!(config.engine.poll_timeout_ms, parsed.engine.poll_timeout_ms);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let parsed: CliConfig = toml::from_str("[capture]\nkeep_on_camera = true\n").unwrap();

        assert!(parsed.capture.keep_on_camera);
        assert_eq!(parsed.general.log_level, "warn");
        assert_eq!(parsed.engine.miss_threshold, 10);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = CliConfig::default();
        config.engine.poll_timeout_ms = 250;
        config.save(&path).unwrap();

        let reloaded = CliConfig::load(Some(path)).unwrap();
        assert_eq!(reloaded.engine.poll_timeout_ms, 250);
    }
}
