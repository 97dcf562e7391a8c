/**
 * Host-facing SDK configuration.
 *
 * The recognized options are exactly: `app_id`, `public_key`, `api_key`,
 * `endpoint`, `timeout`, `retries`. The facade turns this bag into an
 * `ApiClient` plus the two reporters.
 */
use std::time::Duration;

use crate::error::MiteError;

/**
 * Configuration consumed by `Mite::new`.
 *
 * `app_id` and `public_key` are required; the rest default via the
 * builder-style setters.
 *
 * # Example
 * ```ignore
 * let config = MiteConfig::new("app-42", "pk_live_...")
 *     .api_key("sk_live_...")
 *     .endpoint("https://mite.example.com")
 *     .retries(3);
 * ```
 */
#[derive(Debug, Clone)]
pub struct MiteConfig {
    /// Application identifier included in every error report.
    pub app_id: String,

    /// Public key sent in the `X-App-Public-Key` header.
    pub public_key: String,

    /// API key for authenticated calls (release listing). Optional —
    /// without it, `get_releases` fails with a configuration error.
    pub api_key: Option<String>,

    /// Backend base URL. Defaults to `constants::DEFAULT_ENDPOINT`.
    pub endpoint: Option<String>,

    /// Per-request timeout. Defaults to `constants::DEFAULT_TIMEOUT`.
    pub timeout: Option<Duration>,

    /// Maximum retry attempts per failed request. 0 disables retries.
    pub retries: u32,
}

impl MiteConfig {
    pub fn new(app_id: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            public_key: public_key.into(),
            api_key: None,
            endpoint: None,
            timeout: None,
            retries: 0,
        }
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /**
     * Rejects configurations that cannot identify the application.
     */
    pub fn validate(&self) -> Result<(), MiteError> {
        if self.app_id.trim().is_empty() {
            return Err(MiteError::Config("app_id must not be empty".into()));
        }
        if self.public_key.trim().is_empty() {
            return Err(MiteError::Config("public_key must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_is_valid() {
        assert!(MiteConfig::new("app-1", "pk_test").validate().is_ok());
    }

    #[test]
    fn blank_app_id_is_rejected() {
        let config = MiteConfig::new("  ", "pk_test");
        assert!(matches!(config.validate(), Err(MiteError::Config(_))));
    }

    #[test]
    fn blank_public_key_is_rejected() {
        let config = MiteConfig::new("app-1", "");
        assert!(matches!(config.validate(), Err(MiteError::Config(_))));
    }

    #[test]
    fn setters_chain() {
        let config = MiteConfig::new("app-1", "pk_test")
            .api_key("sk_test")
            .endpoint("https://mite.example.com")
            .timeout(Duration::from_secs(3))
            .retries(2);

        assert_eq!(config.api_key.as_deref(), Some("sk_test"));
        assert_eq!(config.endpoint.as_deref(), Some("https://mite.example.com"));
        assert_eq!(config.timeout, Some(Duration::from_secs(3)));
        assert_eq!(config.retries, 2);
    }
}
