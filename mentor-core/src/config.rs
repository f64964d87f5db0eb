use std::path::PathBuf;

use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MentorConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Interval for the silent token renewal loop. Must stay strictly under
    /// the server-side token expiry (~15 minutes).
    pub refresh_interval_minutes: u64,
    /// Where the token/email pair is persisted. Defaults to
    /// `<config dir>/mymentor/credentials.json`.
    pub credentials_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_interval_minutes: 14,
            credentials_path: None,
        }
    }
}

impl MentorConfig {
    /// Load configuration from a TOML file. A missing file yields the
    /// defaults so the CLI runs without any setup.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .build()?;
        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = MentorConfig::load("does-not-exist").expect("defaults expected");
        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(config.session.refresh_interval_minutes, 14);
        assert!(config.session.credentials_path.is_none());
    }
}
