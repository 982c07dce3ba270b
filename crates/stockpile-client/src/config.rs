//! Client configuration.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

/// Configuration for [`HttpClient`](crate::http::HttpClient) and the auth
/// endpoints.
///
/// Durations deserialize from humantime strings (`"10s"`, `"5m"`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ClientConfig {
    /// Base URL of the backend, e.g. `https://stash.example.com/api`.
    pub base_url: Url,

    /// Per-request budget. A request past this budget fails as a network
    /// error; it never triggers a token refresh.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Default lifetime of cached GET responses.
    #[serde(with = "humantime_serde")]
    pub cache_ttl: Duration,

    /// Interval of the background cache sweep. The sweep only bounds
    /// memory; expiry correctness comes from the lazy check on lookup.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("http://localhost:8080/api").expect("static URL is valid"),
            request_timeout: Duration::from_secs(10),
            cache_ttl: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(300),
        }
    }
}

impl ClientConfig {
    /// Configuration pointing at the given base URL, defaults elsewhere.
    ///
    /// # Errors
    ///
    /// Returns the URL parse error for an invalid base.
    pub fn for_base_url(base_url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            ..Self::default()
        })
    }

    /// Joins a request path onto the base URL.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
