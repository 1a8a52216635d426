//! Configuration for connecting to a table service.

use std::env;
use std::time::Duration;

use crate::error::TableError;

/// Default request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for a PostgREST endpoint.
#[derive(Clone)]
pub struct ClientConfig {
    /// Project base URL (e.g., "https://xyzcompany.supabase.co").
    pub url: String,
    /// API key, sent both as `apikey` and as the bearer token.
    pub api_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Create a new configuration for the given project URL and key.
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let url: String = url.into();
        Self {
            url: url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `SUPABASE_URL` - Project base URL
    /// - `SUPABASE_KEY` - API key
    ///
    /// Optional environment variables:
    /// - `SUPABASE_TIMEOUT_SECS` - Request timeout (default: 30)
    pub fn from_env() -> Result<Self, TableError> {
        let url = env::var("SUPABASE_URL")
            .map_err(|_| TableError::Config("SUPABASE_URL not set".to_string()))?;
        let api_key = env::var("SUPABASE_KEY")
            .map_err(|_| TableError::Config("SUPABASE_KEY not set".to_string()))?;

        let timeout_secs = env::var("SUPABASE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Self::new(url, api_key).with_timeout(Duration::from_secs(timeout_secs)))
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the REST endpoint URL for a table.
    pub fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url, table)
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_trailing_slash() {
        let config = ClientConfig::new("https://example.supabase.co/", "key");
        assert_eq!(config.url, "https://example.supabase.co");
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_rest_url() {
        let config = ClientConfig::new("https://example.supabase.co", "key");
        assert_eq!(
            config.rest_url("users"),
            "https://example.supabase.co/rest/v1/users"
        );
    }

    #[test]
    fn test_debug_hides_key() {
        let config = ClientConfig::new("http://localhost:54321", "super-secret");
        let printed = format!("{:?}", config);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("localhost:54321"));
    }
}
