//! Client configuration.
//!
//! Resolution order for every setting: CLI flag (applied by the binary), then
//! environment variable, then `<home>/config.toml`, then the built-in default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::defaults::{
    DEFAULT_API_BASE_URL, DEFAULT_IDENTITY_SCOPE, DEFAULT_REQUEST_TIMEOUT_MS, ENRICH_PATH,
};
use crate::paths;

pub const ENV_API_URL: &str = "LEADLENS_API_URL";
pub const ENV_TIMEOUT_MS: &str = "LEADLENS_TIMEOUT_MS";
pub const ENV_ISSUER: &str = "LEADLENS_ISSUER";
pub const ENV_CLIENT_ID: &str = "LEADLENS_CLIENT_ID";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid API base URL '{0}': {1}")]
    InvalidUrl(String, url::ParseError),

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

/// On-disk shape of `config.toml`. Every key is optional.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    #[serde(default)]
    pub identity: FileIdentityConfig,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct FileIdentityConfig {
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Identity provider settings for the device-code sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    pub issuer: Option<String>,
    pub client_id: Option<String>,
    pub scope: String,
}

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub home: PathBuf,
    pub api_base_url: url::Url,
    pub request_timeout: Duration,
    pub identity: IdentityConfig,
}

impl ClientConfig {
    /// Load from `<home>/config.toml` and the process environment.
    pub fn load(home: &Path) -> Result<Self, ConfigError> {
        let file = read_file_config(&paths::config_path(home))?;
        Self::resolve(home, file, |key| std::env::var(key).ok())
    }

    /// Merge a parsed config file with environment lookups.
    pub fn resolve(
        home: &Path,
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let raw_url = env(ENV_API_URL)
            .or(file.api_base_url)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_base_url = parse_base_url(&raw_url)?;

        let timeout_ms = match env(ENV_TIMEOUT_MS) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: ENV_TIMEOUT_MS,
                    value: raw.clone(),
                })?,
            None => file
                .request_timeout_ms
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
        };
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "request_timeout_ms",
                value: "0".to_string(),
            });
        }

        let identity = IdentityConfig {
            issuer: env(ENV_ISSUER).or(file.identity.issuer),
            client_id: env(ENV_CLIENT_ID).or(file.identity.client_id),
            scope: file
                .identity
                .scope
                .unwrap_or_else(|| DEFAULT_IDENTITY_SCOPE.to_string()),
        };

        Ok(Self {
            home: home.to_path_buf(),
            api_base_url,
            request_timeout: Duration::from_millis(timeout_ms),
            identity,
        })
    }

    /// Replace the API base URL (used for the `--api-url` flag).
    pub fn with_api_base_url(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.api_base_url = parse_base_url(raw)?;
        Ok(self)
    }

    /// Full URL of the enrichment endpoint.
    pub fn enrich_url(&self) -> String {
        let base = self.api_base_url.as_str().trim_end_matches('/');
        format!("{}{}", base, ENRICH_PATH)
    }

    pub fn credential_store_path(&self) -> PathBuf {
        paths::credential_store_path(&self.home)
    }

    pub fn provider_session_path(&self) -> PathBuf {
        paths::provider_session_path(&self.home)
    }

    pub fn config_path(&self) -> PathBuf {
        paths::config_path(&self.home)
    }
}

fn parse_base_url(raw: &str) -> Result<url::Url, ConfigError> {
    url::Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidUrl(raw.to_string(), e))
}

/// Read `config.toml`; a missing file yields the defaults.
pub fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_when_nothing_is_configured() {
        let config = ClientConfig::resolve(Path::new("/h"), FileConfig::default(), no_env).unwrap();
        assert_eq!(config.enrich_url(), "http://localhost:8000/api/enrich");
        assert_eq!(config.request_timeout, Duration::from_millis(10_000));
        assert_eq!(config.identity.scope, "openid profile email");
        assert!(config.identity.issuer.is_none());
    }

    #[test]
    fn environment_overrides_file() {
        let file: FileConfig = toml::from_str(
            r#"
api_base_url = "https://file.example.com"
request_timeout_ms = 2500

[identity]
issuer = "https://issuer.file"
client_id = "file-client"
"#,
        )
        .unwrap();
        let env: HashMap<&str, &str> = [
            (ENV_API_URL, "https://env.example.com/"),
            (ENV_CLIENT_ID, "env-client"),
        ]
        .into_iter()
        .collect();

        let config = ClientConfig::resolve(Path::new("/h"), file, |key| {
            env.get(key).map(|v| v.to_string())
        })
        .unwrap();

        assert_eq!(config.enrich_url(), "https://env.example.com/api/enrich");
        assert_eq!(config.request_timeout, Duration::from_millis(2500));
        assert_eq!(config.identity.issuer.as_deref(), Some("https://issuer.file"));
        assert_eq!(config.identity.client_id.as_deref(), Some("env-client"));
    }

    #[test]
    fn rejects_bad_timeout_and_url() {
        let bad_timeout = ClientConfig::resolve(Path::new("/h"), FileConfig::default(), |key| {
            (key == ENV_TIMEOUT_MS).then(|| "soon".to_string())
        });
        assert!(matches!(bad_timeout, Err(ConfigError::InvalidValue { .. })));

        let bad_url = ClientConfig::resolve(Path::new("/h"), FileConfig::default(), |key| {
            (key == ENV_API_URL).then(|| "not a url".to_string())
        });
        assert!(matches!(bad_url, Err(ConfigError::InvalidUrl(..))));
    }

    #[test]
    fn missing_config_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let file = read_file_config(&dir.path().join("config.toml")).unwrap();
        assert!(file.api_base_url.is_none());
    }

    #[test]
    fn malformed_config_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "api_base_url = [").unwrap();
        let err = read_file_config(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
