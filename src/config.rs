//! Configuration Management
//!
//! Provider-level configuration: where the Sentinel API lives and how to
//! authenticate. Read from `<config dir>/sentinel/config.json`, then
//! overridden by `SENTINEL_ENDPOINT` / `SENTINEL_API_KEY`.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENDPOINT_ENV: &str = "SENTINEL_ENDPOINT";
pub const API_KEY_ENV: &str = "SENTINEL_API_KEY";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A credential that never shows up in logs, diagnostics or debug output
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value, for the one place that has to send it
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(***)")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

impl Serialize for SecretString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self)
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    /// Sentinel API base URL
    #[serde(default)]
    pub endpoint: Option<String>,
    /// API key for the Sentinel API
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Sentry catalog file replacing the built-in kinds
    #[serde(default)]
    pub catalog: Option<PathBuf>,
    /// Per-request timeout for the Sentinel API
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            catalog: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ProviderConfig {
    /// Get the default config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("sentinel").join("config.json"))
    }

    /// Load configuration from the default location, with env overrides
    pub fn load() -> Self {
        let config = match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable config {:?}: {:#}", path, e);
                Self::default()
            }),
            _ => Self::default(),
        };
        config.with_env()
    }

    /// Load configuration from an explicit file (JSON or YAML)
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        if is_yaml {
            serde_yaml::from_str(&content).context("Failed to parse YAML config")
        } else {
            serde_json::from_str(&content).context("Failed to parse JSON config")
        }
    }

    /// Save configuration to `path` as pretty JSON
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Apply `SENTINEL_ENDPOINT` / `SENTINEL_API_KEY` from the process environment
    pub fn with_env(self) -> Self {
        self.with_overrides(
            std::env::var(ENDPOINT_ENV).ok(),
            std::env::var(API_KEY_ENV).ok(),
        )
    }

    /// Non-empty overrides win over file values
    pub fn with_overrides(mut self, endpoint: Option<String>, api_key: Option<String>) -> Self {
        if let Some(endpoint) = endpoint.filter(|e| !e.trim().is_empty()) {
            self.endpoint = Some(endpoint);
        }
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            self.api_key = Some(SecretString::new(key));
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Endpoint with surrounding whitespace removed, `None` if blank
    pub fn effective_endpoint(&self) -> Option<&str> {
        self.endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_is_redacted() {
        let secret = SecretString::new("hunter2");
        assert_eq!(format!("{}", secret), "***");
        assert!(!format!("{:?}", secret).contains("hunter2"));
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_config_debug_redacts_api_key() {
        let config = ProviderConfig::default().with_overrides(None, Some("hunter2".to_string()));
        assert!(!format!("{:?}", config).contains("hunter2"));
    }

    #[test]
    fn test_overrides_win() {
        let config = ProviderConfig {
            endpoint: Some("https://file.example".to_string()),
            ..Default::default()
        }
        .with_overrides(Some("https://env.example".to_string()), None);

        assert_eq!(config.effective_endpoint(), Some("https://env.example"));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_blank_override_ignored() {
        let config = ProviderConfig {
            endpoint: Some("https://file.example".to_string()),
            ..Default::default()
        }
        .with_overrides(Some("  ".to_string()), Some(String::new()));

        assert_eq!(config.effective_endpoint(), Some("https://file.example"));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_save_and_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = ProviderConfig {
            endpoint: Some("https://api.sentinel.example".to_string()),
            api_key: Some(SecretString::new("k")),
            catalog: None,
            timeout_secs: 5,
        };

        config.save_to(&path).unwrap();
        let loaded = ProviderConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_yaml_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "endpoint: https://api.sentinel.example\n").unwrap();

        let loaded = ProviderConfig::load_from(&path).unwrap();
        assert_eq!(loaded.effective_endpoint(), Some("https://api.sentinel.example"));
        assert_eq!(loaded.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }
}
