//! Configuration file support for Regimen.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/regimen/config.toml`.

use crate::catalog::MissingExercisePolicy;
use crate::{Error, ExerciseCategory, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub planning: PlanningConfig,

    #[serde(default)]
    pub analytics: AnalyticsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Exercise resolution while building plans
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct PlanningConfig {
    #[serde(default)]
    pub missing_exercise: MissingExercisePolicy,

    #[serde(default)]
    pub stub_category: ExerciseCategory,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Window used when no explicit date range is given
    #[serde(default = "default_window_days")]
    pub default_window_days: u32,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            default_window_days: default_window_days(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; RUST_LOG still wins
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| home_dir().join(".local/share"));
    base.join("regimen")
}

fn default_window_days() -> u32 {
    28
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| home_dir().join(".config"));
        base.join("regimen").join("config.toml")
    }

    pub fn validate(&self) -> Result<()> {
        if self.analytics.default_window_days == 0 {
            return Err(Error::Config(
                "analytics.default_window_days must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.planning.missing_exercise, MissingExercisePolicy::CreateStub);
        assert_eq!(config.planning.stub_category, ExerciseCategory::Strength);
        assert_eq!(config.analytics.default_window_days, 28);
        assert_eq!(config.logging.level, "info");
        assert!(config.data.data_dir.ends_with("regimen"));
    }

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.planning.missing_exercise = MissingExercisePolicy::Strict;
        config.analytics.default_window_days = 14;
        config.save_to(&path).unwrap();

        let parsed = Config::load_from(&path).unwrap();
        assert_eq!(parsed.planning.missing_exercise, MissingExercisePolicy::Strict);
        assert_eq!(parsed.analytics.default_window_days, 14);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[planning]
missing_exercise = "strict"
stub_category = "kettlebell"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.planning.missing_exercise, MissingExercisePolicy::Strict);
        assert_eq!(config.planning.stub_category, ExerciseCategory::Kettlebell);
        assert_eq!(config.analytics.default_window_days, 28); // default
    }

    #[test]
    fn test_zero_window_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[analytics]\ndefault_window_days = 0\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}
