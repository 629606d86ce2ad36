use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use toksum_core::PoolConfig;

/// Simple configuration for toksum
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub pool: PoolConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Emit JSON instead of the human-readable table.
    #[serde(default)]
    pub json: bool,

    /// Mark approximate counts in table output.
    #[serde(default = "default_mark_fallback")]
    pub mark_fallback: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json: false,
            mark_fallback: default_mark_fallback(),
        }
    }
}

fn default_mark_fallback() -> bool {
    true
}

impl Config {
    /// Load config from default location or create default if not found
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            // Create default config file
            let config = Config::default();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let content = toml::to_string_pretty(&config)?;
            std::fs::write(path, content)?;
            Ok(config)
        }
    }

    /// Get config file path
    pub fn config_path() -> PathBuf {
        if let Some(dirs) = directories::ProjectDirs::from("com", "toksum", "toksum") {
            dirs.config_dir().join("config.toml")
        } else {
            PathBuf::from("~/.toksum/config.toml")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.pool.pool_size >= 1);
        assert!(!config.output.json);
        assert!(config.output.mark_fallback);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.pool.chars_per_token_fallback, 4.0);

        // Second load reads the file back
        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.pool.pool_size, config.pool.pool_size);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[pool]\npool_size = 3\n\n[output]\njson = true\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.pool.pool_size, 3);
        assert!(config.output.json);
        assert_eq!(config.pool.job_queue_capacity, 256);
    }
}
