//! Remote HTTP destinations reached by the bus.

use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;

use domain::DomainEvent;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::Client as HttpClient;

use crate::error::{BusError, DeliveryError};

/// Header carrying the destination credential.
pub const API_KEY_HEADER: &str = "x-api-key";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// An HTTP endpoint that receives the full event envelope as a JSON POST.
///
/// Sends share one rate limiter per destination. A send over the ceiling
/// waits for capacity rather than failing.
pub struct HttpDestination {
    http: HttpClient,
    endpoint: String,
    api_key: Option<String>,
    limiter: DefaultDirectRateLimiter,
    rate_per_second: NonZeroU32,
}

impl HttpDestination {
    /// Creates a destination with its own HTTP client.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        rate_per_second: u32,
    ) -> Result<Self, BusError> {
        let http = HttpClient::builder().timeout(REQUEST_TIMEOUT).build()?;
        Self::with_client(http, endpoint, api_key, rate_per_second)
    }

    /// Creates a destination sharing an existing HTTP client.
    pub fn with_client(
        http: HttpClient,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        rate_per_second: u32,
    ) -> Result<Self, BusError> {
        let rate_per_second = NonZeroU32::new(rate_per_second).ok_or(BusError::InvalidRateLimit)?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.filter(|key| !key.is_empty()),
            limiter: RateLimiter::direct(Quota::per_second(rate_per_second)),
            rate_per_second,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn rate_per_second(&self) -> u32 {
        self.rate_per_second.get()
    }

    /// Makes one POST, after waiting for rate-limit capacity.
    pub async fn send(&self, event: &DomainEvent) -> Result<(), DeliveryError> {
        self.limiter.until_ready().await;

        let mut request = self.http.post(&self.endpoint).json(event);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

impl fmt::Debug for HttpDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpDestination")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("rate_per_second", &self.rate_per_second)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rate_is_rejected() {
        let result = HttpDestination::new("http://localhost/orders/", None, 0);
        assert!(matches!(result, Err(BusError::InvalidRateLimit)));
    }

    #[test]
    fn debug_hides_api_key() {
        let destination =
            HttpDestination::new("http://localhost/orders/", Some("secret".to_string()), 5)
                .unwrap();
        let debug = format!("{destination:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("http://localhost/orders/"));
    }

    #[test]
    fn empty_api_key_is_ignored() {
        let destination =
            HttpDestination::new("http://localhost/orders/", Some(String::new()), 5).unwrap();
        assert!(destination.api_key.is_none());
    }
}
