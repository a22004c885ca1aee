//! # Client Configuration
//!
//! Storefront API settings, loaded from environment variables.

use cart_core::CommerceError;
use reqwest::Url;
use std::env;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;

/// Storefront API configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL, without the `/api/v1` prefix
    pub api_base_url: String,

    /// Bearer token scoping the cart. `None` uses the anonymous cart.
    pub api_token: Option<String>,

    /// Per-request timeout
    pub timeout: Duration,

    /// Delay between payment status checks
    pub poll_interval: Duration,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `STOREFRONT_API_URL`
    ///
    /// Optional:
    /// - `STOREFRONT_API_TOKEN`
    /// - `STOREFRONT_TIMEOUT_SECS` (default 30)
    /// - `PAYMENT_POLL_INTERVAL_MS` (default 3000)
    pub fn from_env() -> Result<Self, CommerceError> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from any variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CommerceError> {
        let api_base_url = lookup("STOREFRONT_API_URL").ok_or_else(|| {
            CommerceError::Configuration("STOREFRONT_API_URL not set".to_string())
        })?;

        let timeout_secs = parse_var(&lookup, "STOREFRONT_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let poll_interval_ms =
            parse_var(&lookup, "PAYMENT_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?;

        let config = Self {
            api_base_url,
            api_token: lookup("STOREFRONT_API_TOKEN").filter(|t| !t.is_empty()),
            timeout: Duration::from_secs(timeout_secs),
            poll_interval: Duration::from_millis(poll_interval_ms),
        };
        config.validate()?;
        Ok(config)
    }

    /// Create config with explicit values (for testing)
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            api_token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    /// Check the base URL and intervals are usable
    pub fn validate(&self) -> Result<(), CommerceError> {
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            return Err(CommerceError::Configuration(
                "STOREFRONT_API_URL must start with http:// or https://".to_string(),
            ));
        }
        if self.timeout.is_zero() || self.poll_interval.is_zero() {
            return Err(CommerceError::Configuration(
                "timeouts and poll intervals must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Full URL for an API path such as `/cart/items`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.api_base_url.trim_end_matches('/'), path)
    }

    /// URL for `path` followed by `segments`, each percent-encoded as a
    /// single path segment
    pub fn resource_url(&self, path: &str, segments: &[&str]) -> Result<Url, CommerceError> {
        let mut url = Url::parse(&self.endpoint(path)).map_err(|e| {
            CommerceError::Configuration(format!("Invalid storefront URL: {}", e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                CommerceError::Configuration("Storefront URL cannot take a path".to_string())
            })?
            .extend(segments);
        Ok(url)
    }

    /// Builder: set the bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Builder: set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder: set the payment poll interval
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

fn parse_var(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: u64,
) -> Result<u64, CommerceError> {
    match lookup(name) {
        Some(value) => value.trim().parse().map_err(|_| {
            CommerceError::Configuration(format!("{} must be a positive integer", name))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_prefix() {
        let config = ClientConfig::new("http://localhost:8080/");
        assert_eq!(
            config.endpoint("/cart/items"),
            "http://localhost:8080/api/v1/cart/items"
        );
    }

    #[test]
    fn test_resource_url_encodes_ids() {
        let config = ClientConfig::new("http://localhost:8080");
        let url = config.resource_url("/cart/items", &["kit#2"]).unwrap();
        assert_eq!(url.path(), "/api/v1/cart/items/kit%232");

        let url = config.resource_url("/orders", &["a/b?c", "status"]).unwrap();
        assert_eq!(url.path(), "/api/v1/orders/a%2Fb%3Fc/status");
        assert!(url.query().is_none());
    }

    #[test]
    fn test_builders() {
        let config = ClientConfig::new("https://shop.example.com")
            .with_token("user-42")
            .with_timeout(Duration::from_secs(5))
            .with_poll_interval(Duration::from_millis(250));

        assert_eq!(config.api_token.as_deref(), Some("user-42"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(ClientConfig::new("localhost:8080").validate().is_err());
        assert!(ClientConfig::new("http://localhost")
            .with_poll_interval(Duration::ZERO)
            .validate()
            .is_err());
    }

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
        }
    }

    #[test]
    fn test_missing_url() {
        let result = ClientConfig::from_lookup(lookup(&[]));
        assert!(matches!(result, Err(CommerceError::Configuration(_))));
    }

    #[test]
    fn test_from_lookup() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("STOREFRONT_API_URL", "https://shop.example.com"),
            ("STOREFRONT_API_TOKEN", ""),
            ("PAYMENT_POLL_INTERVAL_MS", "500"),
        ]))
        .unwrap();

        assert!(config.api_token.is_none());
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.poll_interval, Duration::from_millis(500));

        let result = ClientConfig::from_lookup(lookup(&[
            ("STOREFRONT_API_URL", "https://shop.example.com"),
            ("STOREFRONT_TIMEOUT_SECS", "soon"),
        ]));
        assert!(matches!(result, Err(CommerceError::Configuration(_))));
    }
}
