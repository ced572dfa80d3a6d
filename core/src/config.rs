//! Client configuration.
//!
//! A [`ClientConfig`] is validated once at construction time. A client can
//! never exist without a tenant URL and an API key, so those failures surface
//! before the first request instead of on it.

use std::time::Duration;

use crate::error::{KuraiError, Result};

/// Environment variable holding the tenant base URL.
pub const TENANT_URL_ENV: &str = "LEXIA_TENANT_URL";
/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "LEXIA_API_KEY";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable connection settings for a tenant.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        Self::resolve_with(Some(base_url.into()), Some(api_key.into()), |_| None)
    }

    /// Read both values from `LEXIA_TENANT_URL` and `LEXIA_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::resolve(None, None)
    }

    /// Explicit values win; the environment fills whatever is missing.
    pub fn resolve(base_url: Option<String>, api_key: Option<String>) -> Result<Self> {
        Self::resolve_with(base_url, api_key, |name| std::env::var(name).ok())
    }

    /// Like [`ClientConfig::resolve`], with `lookup` standing in for the
    /// process environment.
    pub fn resolve_with(
        base_url: Option<String>,
        api_key: Option<String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let base_url = non_blank(base_url)
            .or_else(|| non_blank(lookup(TENANT_URL_ENV)))
            .ok_or_else(|| {
                KuraiError::configuration(format!(
                    "tenant_url is required: pass it explicitly or set {TENANT_URL_ENV}"
                ))
            })?;
        let api_key = non_blank(api_key)
            .or_else(|| non_blank(lookup(API_KEY_ENV)))
            .ok_or_else(|| {
                KuraiError::configuration(format!(
                    "api_key is required: pass it explicitly or set {API_KEY_ENV}"
                ))
            })?;
        if reqwest::header::HeaderValue::from_str(&api_key).is_err() {
            return Err(KuraiError::configuration(
                "api_key contains characters that cannot be sent in an HTTP header",
            ));
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

// Keep the key out of logs and panic messages.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn env<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name: &str| {
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
        }
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let config = ClientConfig::new("https://api.example.test/", "lx-key").unwrap();
        assert_eq!(config.base_url(), "https://api.example.test");
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn missing_api_key_is_a_configuration_error() {
        let err = ClientConfig::resolve_with(
            Some("https://api.example.test".to_string()),
            None,
            env(&[]),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.message().contains(API_KEY_ENV));
    }

    #[test]
    fn missing_base_url_is_a_configuration_error() {
        let err = ClientConfig::resolve_with(None, Some("lx-key".to_string()), env(&[])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.message().contains(TENANT_URL_ENV));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let err = ClientConfig::new("https://api.example.test", "   ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn key_that_is_not_a_header_value_is_rejected() {
        for key in ["lx-key\n", "lx-\r\nkey", "lx-key\u{7f}"] {
            let err = ClientConfig::new("https://api.example.test", key).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration, "key {key:?}");
            assert!(err.message().starts_with("api_key contains characters"));
        }
    }

    #[test]
    fn environment_fills_the_gaps() {
        let vars = [
            (TENANT_URL_ENV, "https://env.example.test"),
            (API_KEY_ENV, "lx-env"),
        ];
        let config = ClientConfig::resolve_with(None, Some("lx-explicit".to_string()), env(&vars)).unwrap();
        assert_eq!(config.base_url(), "https://env.example.test");
        assert_eq!(config.api_key(), "lx-explicit");
    }

    #[test]
    fn debug_output_hides_the_key() {
        let config = ClientConfig::new("https://api.example.test", "lx-secret").unwrap();
        assert!(!format!("{config:?}").contains("lx-secret"));
    }
}
