use crate::scraper::{Result, ScraperError};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::{Client, header::RETRY_AFTER};
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Longest wait honoured from a `Retry-After` header
const MAX_RETRY_AFTER: Duration = Duration::from_secs(10);

/// Transport settings shared by every request of a provider
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// Per-request timeout
    pub timeout: Duration,
    /// Pause before the single retry of a transient failure
    pub retry_delay: Duration,
    /// Sustained request rate
    pub requests_per_second: u32,
    /// Requests allowed in a burst above the rate
    pub burst: u32,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            retry_delay: Duration::from_millis(500),
            requests_per_second: 4,
            burst: 10,
        }
    }
}

/// Rate-limited HTTP client wrapper for providers.
///
/// Clones share the same token bucket, so concurrent lookups through any
/// clone are throttled together.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    retry_delay: Duration,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: impl Into<String>, options: &HttpOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("reelname/", env!("CARGO_PKG_VERSION")))
            .timeout(options.timeout)
            .build()
            .map_err(|e| ScraperError::Config(format!("failed to build HTTP client: {e}")))?;

        let quota = Quota::per_second(
            NonZeroU32::new(options.requests_per_second).unwrap_or(NonZeroU32::MIN),
        )
        .allow_burst(NonZeroU32::new(options.burst).unwrap_or(NonZeroU32::MIN));

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            limiter: Arc::new(RateLimiter::direct(quota)),
            retry_delay: options.retry_delay,
        })
    }

    /// Build full URL from endpoint
    #[must_use]
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Execute GET request with query parameters, retrying once on a
    /// transient failure
    pub async fn get_with_params<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = self.url(endpoint);

        match self.send(&url, params).await {
            Err(e) if e.is_transient() => {
                let delay = match e {
                    ScraperError::RateLimit(Some(after)) => after.min(MAX_RETRY_AFTER),
                    _ => self.retry_delay,
                };
                warn!(endpoint = %endpoint, error = %e, retry_in_ms = delay.as_millis() as u64, "Request failed, retrying once");
                tokio::time::sleep(delay).await;
                self.send(&url, params).await
            }
            other => other,
        }
    }

    async fn send<T: DeserializeOwned>(&self, url: &str, params: &[(&str, &str)]) -> Result<T> {
        self.limiter.until_ready().await;
        debug!(url = %url, "GET");

        // reqwest errors carry the full URL, which includes the API key
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| ScraperError::Network(e.without_url()))?;

        Self::handle_response(response).await
    }

    /// Handle response and parse JSON
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            let message = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                401 | 403 => ScraperError::Unauthorized(message),
                404 => ScraperError::NotFound(message),
                429 => ScraperError::RateLimit(retry_after),
                code => ScraperError::Api {
                    status: code,
                    message,
                },
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ScraperError::Parse(format!("JSON parse error: {}", e.without_url())))
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("retry_delay", &self.retry_delay)
            .finish_non_exhaustive()
    }
}
