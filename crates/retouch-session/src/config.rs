//! Session configuration, read from TOML.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use retouch_core::RasterFormat;

use crate::error::{Result, SessionError};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Settings for the remote adapter and commit encoding.
///
/// Every field is optional in the TOML source:
///
/// ```toml
/// base_url = "http://editor.local:5000"
/// timeout_ms = 10000
/// commit_format = { jpeg = { quality = 90 } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub base_url: String,
    /// Per-request timeout
    pub timeout_ms: u64,
    /// Extra attempts after a transport error or 5xx response
    pub max_retries: u32,
    /// Delay before retry `n` is `n * retry_backoff_ms`
    pub retry_backoff_ms: u64,
    /// Encoding of rasters committed to the service
    pub commit_format: RasterFormat,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: 30_000,
            max_retries: 2,
            retry_backoff_ms: 250,
            commit_format: RasterFormat::default(),
        }
    }
}

impl SessionConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| SessionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SessionError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(SessionError::Config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.timeout_ms == 0 {
            return Err(SessionError::Config("timeout_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Delay before the given retry attempt (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(attempt as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_source_gives_defaults() {
        let config = SessionConfig::from_toml_str("").unwrap();
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.base_url, "http://localhost:5000");
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_override() {
        let config = SessionConfig::from_toml_str(
            r#"
            base_url = "https://edit.example.com"
            max_retries = 0
            commit_format = { jpeg = { quality = 85 } }
            "#,
        )
        .unwrap();
        assert_eq!(config.base_url, "https://edit.example.com");
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.retry_backoff_ms, 250);
        assert_eq!(config.commit_format, RasterFormat::Jpeg { quality: 85 });
    }

    #[test]
    fn test_png_format_by_name() {
        let config = SessionConfig::from_toml_str(r#"commit_format = "png""#).unwrap();
        assert_eq!(config.commit_format, RasterFormat::Png);
    }

    #[test]
    fn test_rejects_bad_url() {
        let err = SessionConfig::from_toml_str(r#"base_url = "localhost:5000""#).unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        assert!(SessionConfig::from_toml_str("timeout_ms = \"soon\"").is_err());
    }

    #[test]
    fn test_linear_backoff() {
        let config = SessionConfig::default();
        assert_eq!(config.backoff(1), Duration::from_millis(250));
        assert_eq!(config.backoff(3), Duration::from_millis(750));
    }

    #[test]
    fn test_load_missing_file() {
        let err = SessionConfig::load("/nonexistent/retouch.toml").unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));
    }
}
