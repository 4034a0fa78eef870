use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

/// Environment variable that overrides the configured backend URL.
pub const BACKEND_URL_ENV: &str = "NIMBUS_BACKEND_URL";

/// Backend used when neither the environment nor the config file name one.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// backend_url = "https://nimbus.example.com"
/// debounce_ms = 300
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_query_len: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast_len: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

/// Runtime tunables for the suggestion pipeline and the HTTP backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub debounce: Duration,
    pub min_query_len: usize,
    pub forecast_len: usize,
    pub request_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            min_query_len: 3,
            forecast_len: 5,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Resolve the backend base URL: environment override, then config file, then default.
    pub fn backend_url(&self) -> Result<String> {
        self.backend_url_with_override(std::env::var(BACKEND_URL_ENV).ok())
    }

    pub fn backend_url_with_override(&self, env_override: Option<String>) -> Result<String> {
        let raw = env_override
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.backend_url.clone())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

        normalize_backend_url(&raw)
    }

    /// Validate and store the backend URL.
    pub fn set_backend_url(&mut self, raw: &str) -> Result<()> {
        self.backend_url = Some(normalize_backend_url(raw)?);
        Ok(())
    }

    pub fn settings(&self) -> Settings {
        let defaults = Settings::default();

        Settings {
            debounce: self
                .debounce_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.debounce),
            min_query_len: self.min_query_len.unwrap_or(defaults.min_query_len),
            forecast_len: self.forecast_len.unwrap_or(defaults.forecast_len),
            request_timeout: self
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
        }
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "nimbus", "nimbus")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

fn normalize_backend_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = Url::parse(trimmed).with_context(|| format!("Invalid backend URL '{raw}'"))?;

    if !matches!(url.scheme(), "http" | "https") {
        bail!("Backend URL '{raw}' must use http or https");
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_url_falls_back_to_default() {
        let cfg = Config::default();
        let url = cfg.backend_url_with_override(None).unwrap();

        assert_eq!(url, DEFAULT_BACKEND_URL);
    }

    #[test]
    fn env_override_wins_over_config_file() {
        let mut cfg = Config::default();
        cfg.set_backend_url("https://file.example.com/").unwrap();

        let url = cfg
            .backend_url_with_override(Some("https://env.example.com".into()))
            .unwrap();
        assert_eq!(url, "https://env.example.com");

        let url = cfg.backend_url_with_override(Some("   ".into())).unwrap();
        assert_eq!(url, "https://file.example.com");
    }

    #[test]
    fn rejects_non_http_backend_url() {
        let mut cfg = Config::default();

        let err = cfg.set_backend_url("ftp://example.com").unwrap_err();
        assert!(err.to_string().contains("must use http or https"));

        let err = cfg.set_backend_url("not a url").unwrap_err();
        assert!(err.to_string().contains("Invalid backend URL"));
        assert!(cfg.backend_url.is_none());
    }

    #[test]
    fn settings_use_defaults_for_missing_fields() {
        let cfg = Config::from_toml("debounce_ms = 150\nforecast_len = 3\n").unwrap();
        let settings = cfg.settings();

        assert_eq!(settings.debounce, Duration::from_millis(150));
        assert_eq!(settings.forecast_len, 3);
        assert_eq!(settings.min_query_len, 3);
        assert_eq!(settings.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn empty_config_serializes_to_empty_toml() {
        let toml = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(toml.trim().is_empty());
    }
}
