//! Configuration file parsing.
//!
//! This module loads the optional TOML configuration file that points the CLI
//! at a backend, then applies `MAJOR_*` environment overrides.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

pub const DEFAULT_API_URL: &str = "https://api.major.build/cli";
pub const DEFAULT_FRONTEND_URI: &str = "https://app.major.build";
pub const DEFAULT_APP_URL_SUFFIX: &str = "major.build";

/// Runtime configuration.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Base URL of the backend API.
    pub api_url: String,
    /// Base URL of the web frontend.
    pub frontend_uri: String,
    /// Domain suffix deployed applications are served under.
    pub app_url_suffix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            frontend_uri: DEFAULT_FRONTEND_URI.to_string(),
            app_url_suffix: DEFAULT_APP_URL_SUFFIX.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    /// Keys missing from the file keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        if config.api_url.trim().is_empty() {
            anyhow::bail!("api_url must not be empty");
        }

        Ok(config)
    }

    /// Resolve the effective configuration: file (if found), then environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match crate::paths::find_config_file(explicit) {
            Some(path) => {
                log::debug!("loading config from {}", path.display());
                Self::from_file(&path)?
            }
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `MAJOR_API_URL`, `MAJOR_FRONTEND_URI` and `MAJOR_APP_URL_SUFFIX`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("MAJOR_API_URL")
            && !v.is_empty()
        {
            self.api_url = v;
        }
        if let Ok(v) = env::var("MAJOR_FRONTEND_URI")
            && !v.is_empty()
        {
            self.frontend_uri = v;
        }
        if let Ok(v) = env::var("MAJOR_APP_URL_SUFFIX")
            && !v.is_empty()
        {
            self.app_url_suffix = v;
        }
    }

    /// Public URL for a deploy slug, e.g. `https://my-app.major.build`.
    pub fn app_url_for_slug(&self, slug: &str) -> String {
        format!("https://{}.{}", slug, self.app_url_suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_config_from_file_full() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let config_content = r#"
api_url = "http://localhost:8080"
frontend_uri = "http://localhost:3000"
app_url_suffix = "localhost"
"#;
        fs::write(&config_path, config_content).unwrap();

        let config = Config::from_file(&config_path).unwrap();
        assert_eq!(config.api_url, "http://localhost:8080");
        assert_eq!(config.frontend_uri, "http://localhost:3000");
        assert_eq!(config.app_url_suffix, "localhost");
    }

    #[test]
    fn test_config_from_file_partial_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "api_url = \"http://localhost:8080\"\n").unwrap();

        let config = Config::from_file(&config_path).unwrap();
        assert_eq!(config.api_url, "http://localhost:8080");
        assert_eq!(config.frontend_uri, DEFAULT_FRONTEND_URI);
    }

    #[test]
    fn test_config_from_file_empty_api_url() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "api_url = \"  \"\n").unwrap();

        let result = Config::from_file(&config_path);
        assert!(result.unwrap_err().to_string().contains("api_url"));
    }

    #[test]
    fn test_config_from_file_missing() {
        let result = Config::from_file(Path::new("/nonexistent/major/config.toml"));
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        let original = env::var("MAJOR_API_URL").ok();
        unsafe {
            env::set_var("MAJOR_API_URL", "http://override");
        }
        let mut config = Config::default();
        config.apply_env_overrides();
        unsafe {
            match original {
                Some(v) => env::set_var("MAJOR_API_URL", v),
                None => env::remove_var("MAJOR_API_URL"),
            }
        }
        assert_eq!(config.api_url, "http://override");
        assert_eq!(config.frontend_uri, DEFAULT_FRONTEND_URI);
    }

    #[test]
    fn test_app_url_for_slug() {
        let config = Config::default();
        assert_eq!(config.app_url_for_slug("my-app"), "https://my-app.major.build");
    }
}
