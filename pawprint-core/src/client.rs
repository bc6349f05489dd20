//! HTTP client for the events API
//!
//! Ships event batches produced by a tracking session to the configured
//! endpoint. Delivery is best-effort by contract: callers treat a failed
//! send as a diagnostic, never as an application error.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::events::{TrackingEvent, UserProperties};

/// Identity baked into a session at construction time
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    /// Client identifier attached to every request
    pub client_id: String,
    /// Session identifier events are recorded under
    pub session_id: String,
    /// Referrer reported at session start (may be empty)
    pub referrer: String,
    /// Static per-session metadata, including the device identifier
    pub user_properties: UserProperties,
}

/// Response from POST /v1/events
#[derive(Debug, Deserialize)]
pub struct EventsResponse {
    /// Number of events accepted
    pub accepted: usize,
    /// Number of events rejected (duplicates, validation errors)
    #[serde(default)]
    pub rejected: usize,
}

/// HTTP client for the events API
pub struct AnalyticsClient {
    config: ClientConfig,
    identity: SessionIdentity,
    http_client: reqwest::Client,
    base_url: String,
    /// Verbose per-event logging; off unless a caller opts in
    log_enabled: bool,
}

impl AnalyticsClient {
    /// Create a new client from configuration and a session identity
    ///
    /// Returns an error if the configuration is invalid or missing required fields.
    pub fn new(config: ClientConfig, identity: SessionIdentity) -> Result<Self> {
        config.validate()?;

        let base_url = config
            .server_url
            .clone()
            .ok_or_else(|| Error::Config("client.server_url is required".to_string()))?
            .trim_end_matches('/')
            .to_string();

        // Build default headers
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(api_key) = &config.api_key {
            let auth_value = format!("Bearer {}", api_key);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| Error::Config(format!("invalid api_key: {}", e)))?,
            );
        }

        headers.insert(
            "X-Client-ID",
            HeaderValue::from_str(&identity.client_id)
                .map_err(|e| Error::Config(format!("invalid client_id: {}", e)))?,
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            identity,
            http_client,
            base_url,
            log_enabled: false,
        })
    }

    /// The identity this client was constructed with
    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    /// Whether verbose per-event logging is on
    pub fn log_enabled(&self) -> bool {
        self.log_enabled
    }

    /// Toggle verbose per-event logging
    pub fn set_log_enabled(&mut self, enabled: bool) {
        self.log_enabled = enabled;
    }

    /// Send a batch of events for this session
    ///
    /// Returns the number of events accepted and rejected.
    pub async fn send_events(&self, events: &[TrackingEvent]) -> Result<EventsResponse> {
        if self.log_enabled {
            for event in events {
                tracing::debug!(
                    event_type = %event.event_type,
                    session_id = %self.identity.session_id,
                    "Shipping event"
                );
            }
        }

        let url = format!("{}/v1/events", self.base_url);

        let request_body = SendEventsRequest {
            session_id: &self.identity.session_id,
            events,
        };

        let response = self
            .http_client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| Error::Client(format!("HTTP request failed: {}", e)))?;

        let status = response.status();

        if status.is_success() {
            let result: EventsResponse = response
                .json()
                .await
                .map_err(|e| Error::Client(format!("failed to parse response: {}", e)))?;
            Ok(result)
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            Err(Error::Client(format!(
                "API error ({}): {}",
                status, error_text
            )))
        }
    }

    /// Send events with retry logic
    ///
    /// Retries transient failures (5xx, timeouts) with exponential backoff.
    pub async fn send_events_with_retry(&self, events: &[TrackingEvent]) -> Result<EventsResponse> {
        let mut last_error = None;
        let mut delay = Duration::from_millis(500);

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tracing::debug!(
                    "Retrying send_events (attempt {}/{}), waiting {:?}",
                    attempt + 1,
                    self.config.max_retries + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * 2, Duration::from_secs(30));
            }

            match self.send_events(events).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if is_retryable_error(&e) {
                        tracing::warn!("Transient error sending events: {}", e);
                        last_error = Some(e);
                        continue;
                    } else {
                        // Non-retryable error, fail immediately
                        return Err(e);
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Client("max retries exceeded".to_string())))
    }

    /// Tell the server this session is over
    ///
    /// Returns true on success, false if the server no longer knows the session.
    pub async fn close_session(&self, outcome: &str) -> Result<bool> {
        let url = format!(
            "{}/v1/sessions/{}/close",
            self.base_url,
            urlencoding::encode(&self.identity.session_id)
        );

        let request = SessionCloseRequest { outcome };

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Client(format!("HTTP request failed: {}", e)))?;

        let status = response.status();

        if status.is_success() {
            Ok(true)
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Ok(false)
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            Err(Error::Client(format!(
                "API error ({}): {}",
                status, error_text
            )))
        }
    }

    /// Check if the client can reach the server
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/health", self.base_url);

        match self.http_client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}

/// Blocking endpoint probe for CLI tools
///
/// Builds a throwaway client and runs one health check on a private runtime.
pub fn probe_endpoint(config: &ClientConfig) -> Result<bool> {
    let identity = SessionIdentity {
        client_id: config.client_id.clone(),
        session_id: config.session_id.clone(),
        referrer: config.referrer.clone(),
        user_properties: UserProperties::new(),
    };

    let client = AnalyticsClient::new(config.clone(), identity)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Client(format!("failed to create runtime: {}", e)))?;

    runtime.block_on(client.health_check())
}

/// Request body for POST /v1/events
#[derive(Serialize)]
struct SendEventsRequest<'a> {
    session_id: &'a str,
    events: &'a [TrackingEvent],
}

/// Request body for POST /v1/sessions/{session_id}/close
#[derive(Serialize)]
struct SessionCloseRequest<'a> {
    outcome: &'a str,
}

/// Check if an error is retryable (transient)
fn is_retryable_error(error: &Error) -> bool {
    match error {
        Error::Client(msg) => {
            // Retry on 5xx errors
            msg.contains("50") && (msg.contains("API error") || msg.contains("HTTP"))
                // Retry on network/timeout errors
                || msg.contains("timeout")
                || msg.contains("connection")
                || msg.contains("request failed")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_identity() -> SessionIdentity {
        SessionIdentity {
            client_id: "pawprint".to_string(),
            session_id: "main".to_string(),
            referrer: String::new(),
            user_properties: UserProperties::new(),
        }
    }

    #[test]
    fn test_client_requires_valid_config() {
        let config = ClientConfig {
            enabled: true,
            ..Default::default()
        };
        assert!(AnalyticsClient::new(config, test_identity()).is_err());
    }

    #[test]
    fn test_client_with_valid_config() {
        let config = ClientConfig {
            enabled: true,
            server_url: Some("https://events.example.com".to_string()),
            api_key: Some("pk_live_test".to_string()),
            ..Default::default()
        };

        let client = AnalyticsClient::new(config, test_identity()).unwrap();

        // Verbose logging is off on a fresh instance
        assert!(!client.log_enabled());
        assert_eq!(client.identity().session_id, "main");
    }

    #[test]
    fn test_client_rejects_unprintable_client_id() {
        let config = ClientConfig {
            enabled: true,
            server_url: Some("https://events.example.com".to_string()),
            ..Default::default()
        };
        let identity = SessionIdentity {
            client_id: "bad\nid".to_string(),
            ..test_identity()
        };
        assert!(AnalyticsClient::new(config, identity).is_err());
    }

    #[test]
    fn test_log_enabled_toggle() {
        let config = ClientConfig {
            enabled: true,
            server_url: Some("https://events.example.com".to_string()),
            ..Default::default()
        };
        let mut client = AnalyticsClient::new(config, test_identity()).unwrap();

        client.set_log_enabled(true);
        assert!(client.log_enabled());
        client.set_log_enabled(false);
        assert!(!client.log_enabled());
    }

    #[test]
    fn test_is_retryable_error() {
        assert!(is_retryable_error(&Error::Client(
            "API error (500): internal error".to_string()
        )));
        assert!(is_retryable_error(&Error::Client(
            "HTTP request failed: timeout".to_string()
        )));
        assert!(!is_retryable_error(&Error::Client(
            "API error (400): bad request".to_string()
        )));
        assert!(!is_retryable_error(&Error::Client(
            "API error (401): unauthorized".to_string()
        )));
        assert!(!is_retryable_error(&Error::Config(
            "client.server_url is required".to_string()
        )));
    }
}
