//! Server configuration.
//!
//! Deserialized from a TOML file at startup; secrets (backend API key, token
//! signing secret) may be supplied or overridden through the environment so
//! they never have to live in the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use credo_core::error::{CredoError, Result};
use credo_core::scorecard::DecisionBands;
use credo_gateway::GeminiConfig;

const API_KEY_ENV: &str = "GOOGLE_API_KEY";
const AUTH_SECRET_ENV: &str = "CREDO_AUTH_SECRET";

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_token_ttl_minutes() -> i64 {
    60
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    2
}

fn default_document_dir() -> PathBuf {
    PathBuf::from("documents")
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub auth: AuthSettings,
    pub gemini: GeminiSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    /// Decision-zone threshold table; policy, not code.
    #[serde(default)]
    pub scoring: DecisionBands,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// HS256 signing secret; `CREDO_AUTH_SECRET` overrides.
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiSettings {
    /// Backend API key; `GOOGLE_API_KEY` overrides.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_document_dir")]
    pub document_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            document_dir: default_document_dir(),
        }
    }
}

impl ServerConfig {
    /// Loads the configuration file and applies environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            CredoError::config(format!("cannot read {}: {err}", path.display()))
        })?;
        let mut config: ServerConfig = toml::from_str(&raw)?;

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            config.gemini.api_key = Some(key);
        }
        if let Ok(secret) = std::env::var(AUTH_SECRET_ENV) {
            config.auth.secret = Some(secret);
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.gemini.api_key.as_deref().unwrap_or_default().is_empty() {
            return Err(CredoError::config(format!(
                "missing Gemini API key (set [gemini].api_key or {API_KEY_ENV})"
            )));
        }
        if self.auth.secret.as_deref().unwrap_or_default().is_empty() {
            return Err(CredoError::config(format!(
                "missing token signing secret (set [auth].secret or {AUTH_SECRET_ENV})"
            )));
        }
        Ok(())
    }

    /// Gateway settings derived from the file.
    pub fn gemini_config(&self) -> GeminiConfig {
        let mut config = GeminiConfig::new(
            self.gemini.api_key.clone().unwrap_or_default(),
            self.gemini.model.clone(),
        );
        config.request_timeout = Duration::from_secs(self.gemini.request_timeout_secs);
        config.max_retries = self.gemini.max_retries;
        config
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_minimal_config_with_defaults() {
        let file = write_config(
            r#"
            [auth]
            secret = "test-secret"

            [gemini]
            api_key = "test-key"
            "#,
        );

        let config = ServerConfig::load(file.path()).unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8000);
        assert_eq!(config.gemini.model, "gemini-2.5-flash");
        assert_eq!(config.auth.token_ttl_minutes, 60);
        assert_eq!(config.scoring.zone_for(4.0), "approve");
    }

    #[test]
    fn test_load_custom_scoring_bands() {
        let file = write_config(
            r#"
            [auth]
            secret = "s"

            [gemini]
            api_key = "k"

            [[scoring]]
            floor = 4.0
            zone = "fast-track"

            [[scoring]]
            floor = 0.0
            zone = "manual"
            "#,
        );

        let config = ServerConfig::load(file.path()).unwrap();

        assert_eq!(config.scoring.zone_for(4.5), "fast-track");
        assert_eq!(config.scoring.zone_for(1.0), "manual");
    }

    #[test]
    fn test_missing_api_key_is_a_config_error() {
        let file = write_config(
            r#"
            [auth]
            secret = "s"

            [gemini]
            model = "gemini-2.5-flash"
            "#,
        );

        // The environment may carry a real key on developer machines; only
        // assert when it does not.
        if std::env::var(API_KEY_ENV).is_err() {
            assert!(ServerConfig::load(file.path()).is_err());
        }
    }
}
