//! HTTP client for the upstream poll API.
//!
//! Three calls make up the protocol: a cursor-paginated event fetch, an
//! acknowledgement of the consumed high-water mark, and an explicit
//! cursor reset. HTTP status codes are mapped onto the
//! [`UpstreamError`] taxonomy so the ingestion loop can tell fatal
//! conditions (bad credentials, malformed parameters) from transient
//! ones (network trouble, server errors, rate limiting).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, Response, StatusCode};
use tracing::{debug, warn};

use super::dto::RawEventPage;
use crate::config::UpstreamConfig;
use crate::error::{Result, UpstreamError};
use crate::port::{EventPage, EventSource, FetchQuery};

const API_KEY_HEADER: &str = "Api-Key";

/// Client for the upstream poll API.
pub struct PollClient {
    http: HttpClient,
    base_url: String,
    api_key: Option<String>,
}

impl PollClient {
    /// Create a client with default HTTP settings.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: trim_trailing_slash(base_url.into()),
            api_key: None,
        }
    }

    #[must_use]
    pub fn from_config(config: &UpstreamConfig) -> Self {
        let http = HttpClient::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "Failed to build HTTP client, using defaults");
                HttpClient::new()
            });

        Self {
            http,
            base_url: trim_trailing_slash(config.api_url.clone()),
            api_key: config.api_key.clone(),
        }
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        let mut request = self.http.request(method, url);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        request
    }

    /// Map a non-success response onto the upstream error taxonomy.
    async fn classify_failure(response: Response) -> UpstreamError {
        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED => UpstreamError::Unauthorized(body_snippet(response).await),
            StatusCode::FORBIDDEN => UpstreamError::Forbidden(body_snippet(response).await),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                UpstreamError::MalformedRequest(body_snippet(response).await)
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after_secs = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok());
                UpstreamError::RateLimited { retry_after_secs }
            }
            _ => UpstreamError::Server {
                status: status.as_u16(),
            },
        }
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(UpstreamError::Transport)?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::classify_failure(response).await.into())
        }
    }
}

#[async_trait]
impl EventSource for PollClient {
    async fn fetch_events(&self, query: &FetchQuery) -> Result<EventPage> {
        let mut request = self
            .request(reqwest::Method::GET, format!("{}/events", self.base_url))
            .query(&[("limit", query.limit.to_string())])
            .query(&[("finalizedOnly", query.finalized_only.to_string())]);

        if let Some(after) = query.after {
            request = request.query(&[("after", after.to_string())]);
        }
        for event_type in &query.event_types {
            request = request.query(&[("eventTypes", event_type.as_str())]);
        }

        let response = self.execute(request).await?;
        let page: RawEventPage = response
            .json()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;

        debug!(
            count = page.events.len(),
            last_id = ?page.last_id,
            has_more = page.has_more_events,
            "Fetched event page"
        );

        Ok(EventPage {
            events: page.events.into_iter().map(|e| e.normalize()).collect(),
            last_id: page.last_id,
            has_more: page.has_more_events,
        })
    }

    async fn acknowledge(&self, event_id: i64) -> Result<()> {
        let request = self.request(
            reqwest::Method::POST,
            format!("{}/events/{}/ack", self.base_url, event_id),
        );
        self.execute(request).await?;
        debug!(event_id, "Acknowledged events");
        Ok(())
    }

    async fn reset(&self, event_id: i64) -> Result<()> {
        let request = self.request(
            reqwest::Method::POST,
            format!("{}/events/{}/reset", self.base_url, event_id),
        );
        self.execute(request).await?;
        debug!(event_id, "Reset upstream cursor");
        Ok(())
    }

    fn source_name(&self) -> &'static str {
        "poll-api"
    }
}

fn trim_trailing_slash(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

async fn body_snippet(response: Response) -> String {
    const MAX_LEN: usize = 256;
    match response.text().await {
        Ok(body) => {
            let mut snippet: String = body.chars().take(MAX_LEN).collect();
            if body.chars().count() > MAX_LEN {
                snippet.push_str("...");
            }
            snippet
        }
        Err(_) => String::from("<unreadable body>"),
    }
}
