//! Publisher for contexts that reach the bus through its HTTP event API.

use std::time::Duration;

use async_trait::async_trait;
use domain::{DomainEvent, EventPublisher, PublishError};
use reqwest::Client as HttpClient;

use crate::error::BusError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts events to `{bus}/events`, where `bus` is the event API base URL.
#[derive(Debug, Clone)]
pub struct HttpEventPublisher {
    http: HttpClient,
}

impl HttpEventPublisher {
    pub fn new() -> Result<Self, BusError> {
        let http = HttpClient::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http })
    }

    pub fn with_client(http: HttpClient) -> Self {
        Self { http }
    }

    fn events_url(base: &str) -> String {
        format!("{}/events", base.trim_end_matches('/'))
    }
}

#[async_trait]
impl EventPublisher for HttpEventPublisher {
    #[tracing::instrument(skip(self, event), fields(event_id = %event.event_id()))]
    async fn publish(&self, bus: &str, event: DomainEvent) -> Result<(), PublishError> {
        let url = Self::events_url(bus);

        let response = self
            .http
            .post(&url)
            .json(&event)
            .send()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%url, status = status.as_u16(), "event api rejected event");
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(%url, "event accepted by event api");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_url_joins_without_double_slash() {
        assert_eq!(
            HttpEventPublisher::events_url("http://localhost:3000"),
            "http://localhost:3000/events"
        );
        assert_eq!(
            HttpEventPublisher::events_url("http://localhost:3000/"),
            "http://localhost:3000/events"
        );
    }
}
