use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "facetsync";
const CONFIG_FILE: &str = "config.json";

/// Application configuration stored in the app config directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Records per result page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Quiet time before a typeahead term is requested
    #[serde(default = "default_typeahead_debounce_ms")]
    pub typeahead_debounce_ms: u64,

    /// Suggestion lists kept for returning terms (0 disables the cache)
    #[serde(default = "default_suggestion_cache_size")]
    pub suggestion_cache_size: usize,

    /// Log filter used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_page_size() -> u32 {
    10
}

fn default_typeahead_debounce_ms() -> u64 {
    200
}

fn default_suggestion_cache_size() -> usize {
    32
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            typeahead_debounce_ms: default_typeahead_debounce_ms(),
            suggestion_cache_size: default_suggestion_cache_size(),
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Load config from the app config directory, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&get_config_path()?)
    }

    /// Load config from an explicit file; a missing file yields defaults
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
            let config: AppConfig = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file {}", config_path.display()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to the app config directory
    pub fn save(&self) -> Result<()> {
        self.save_to(&get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .context("Failed to serialize config")?;
        fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file {}", config_path.display()))?;
        Ok(())
    }
}

/// Get the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    let app_dir = get_app_config_dir()?;
    Ok(app_dir.join(CONFIG_FILE))
}

/// Get the application config directory
pub fn get_app_config_dir() -> Result<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir()
            .map(|h| h.join("Library").join("Application Support"))
    } else {
        // Linux/Unix: XDG_CONFIG_HOME or ~/.config; Windows: roaming AppData
        dirs::config_dir()
    };

    let base = base.context("Could not determine app config directory")?;
    let app_dir = base.join(APP_NAME);

    fs::create_dir_all(&app_dir)
        .with_context(|| format!("Failed to create {}", app_dir.display()))?;
    Ok(app_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.page_size, 10);
        assert_eq!(config.typeahead_debounce_ms, 200);
        assert_eq!(config.suggestion_cache_size, 32);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_app_config_partial_json() {
        // Should use defaults for missing fields
        let json = r#"{"page_size": 25}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.page_size, 25);
        assert_eq!(config.typeahead_debounce_ms, 200);
    }

    #[test]
    fn test_app_config_empty_json() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_app_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let config = AppConfig {
            suggestion_cache_size: 0,
            log_level: "debug".to_string(),
            ..AppConfig::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_app_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_app_config_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "not json").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config file"));
    }
}
