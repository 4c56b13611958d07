use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable holding the assistant endpoint base URL
pub const API_BASE_ENV: &str = "CHATTERM_API_BASE";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub api_base: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self { api_base: None }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    /// Resolve the endpoint: explicit override, then environment, then file.
    ///
    /// Blank values are treated as unset. There is no built-in default.
    pub fn resolve_api_base(&self, override_base: Option<&str>) -> Option<String> {
        let from_env = std::env::var(API_BASE_ENV).ok();
        pick_api_base(override_base, from_env.as_deref(), self.api_base.as_deref())
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("chatterm"))
    }

    fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }
}

fn pick_api_base(
    override_base: Option<&str>,
    from_env: Option<&str>,
    from_file: Option<&str>,
) -> Option<String> {
    [override_base, from_env, from_file]
        .into_iter()
        .flatten()
        .map(|base| base.trim().trim_end_matches('/'))
        .find(|base| !base.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_wins() {
        let base = pick_api_base(Some("http://cli"), Some("http://env"), Some("http://file"));
        assert_eq!(base.as_deref(), Some("http://cli"));
    }

    #[test]
    fn test_env_before_file() {
        let base = pick_api_base(None, Some("http://env"), Some("http://file"));
        assert_eq!(base.as_deref(), Some("http://env"));
    }

    #[test]
    fn test_blank_values_are_absent() {
        assert_eq!(pick_api_base(Some("  "), Some(""), None), None);
        let base = pick_api_base(Some(" "), None, Some("http://file/"));
        assert_eq!(base.as_deref(), Some("http://file"));
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            api_base: Some("http://localhost:8080".to_string()),
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }
}
