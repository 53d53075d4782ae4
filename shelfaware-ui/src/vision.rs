//! Vision backend client
//!
//! Drives the external vision-processing service over HTTP REST:
//! capture control (start/stop), status polling, and result processing.
//!
//! # Endpoints
//! - `POST /start` — begin capture; `status` is "started" or "error"
//! - `POST /stop` — end capture; `status` is "stopped"
//! - `GET /status` — `{ processing: bool, detected_text: string|null }`
//! - `GET /process_vision_results` — run the resolution pipeline
//! - `GET /video_feed` — MJPEG visual stream, keyed by a per-session token

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use shelfaware_common::{Error, Result};

/// Default timeout for vision backend requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Generic message when the backend fails without a usable message field
const GENERIC_START_ERROR: &str = "Failed to start processing. Please try again.";

/// Capture control and status polling surface of the vision backend
///
/// A trait seam so the scan engine takes an injected client and tests can
/// substitute a fake.
#[async_trait]
pub trait VisionBackend: Send + Sync {
    /// Begin a capture session on the backend
    async fn start_capture(&self) -> Result<()>;

    /// End the capture session; harmless when no capture is running
    async fn stop_capture(&self) -> Result<()>;

    /// Current processing status and detection, if any
    async fn status(&self) -> Result<ProcessingStatus>;

    /// Run the backend's result-processing pipeline after a detection
    async fn process_results(&self) -> Result<()>;

    /// URL the UI binds its image element to for the visual stream
    ///
    /// Keyed by a freshly generated token per session start so the browser
    /// treats each session as a distinct resource.
    fn stream_url(&self, token: Uuid) -> String;
}

/// Status poll response
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingStatus {
    /// Whether the backend is still looking for a detection
    pub processing: bool,
    /// Detected label text, present once the backend has a result
    pub detected_text: Option<String>,
}

/// HTTP client for the vision backend
pub struct HttpVisionClient {
    /// HTTP client for API requests
    http_client: Client,
    /// Base URL, e.g. `http://localhost:5001`
    base_url: String,
}

impl HttpVisionClient {
    /// Create a new client against the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl VisionBackend for HttpVisionClient {
    async fn start_capture(&self) -> Result<()> {
        debug!("Requesting capture start");

        let response: ControlResponse = self
            .http_client
            .post(self.url("/start"))
            .send()
            .await?
            .json()
            .await?;

        match response.status.as_str() {
            "started" => Ok(()),
            _ => Err(Error::Backend(
                response
                    .message
                    .unwrap_or_else(|| GENERIC_START_ERROR.to_string()),
            )),
        }
    }

    async fn stop_capture(&self) -> Result<()> {
        debug!("Requesting capture stop");

        let response: ControlResponse = self
            .http_client
            .post(self.url("/stop"))
            .send()
            .await?
            .json()
            .await?;

        match response.status.as_str() {
            "stopped" => Ok(()),
            other => Err(Error::Backend(format!(
                "Unexpected stop response status: {}",
                other
            ))),
        }
    }

    async fn status(&self) -> Result<ProcessingStatus> {
        let status: ProcessingStatus = self
            .http_client
            .get(self.url("/status"))
            .send()
            .await?
            .json()
            .await?;

        debug!(
            processing = status.processing,
            detected = status.detected_text.is_some(),
            "Status poll complete"
        );

        Ok(status)
    }

    async fn process_results(&self) -> Result<()> {
        debug!("Requesting result processing");

        let response = self
            .http_client
            .get(self.url("/process_vision_results"))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body: ControlResponse = response.json().await.unwrap_or(ControlResponse {
                status: String::new(),
                message: None,
            });
            return Err(Error::Backend(body.message.unwrap_or_else(|| {
                format!("Result processing failed with HTTP {}", status)
            })));
        }

        let body: ControlResponse = response.json().await?;
        if body.status == "success" {
            Ok(())
        } else {
            Err(Error::Backend(body.message.unwrap_or_else(|| {
                "Result processing did not succeed".to_string()
            })))
        }
    }

    fn stream_url(&self, token: Uuid) -> String {
        format!("{}?token={}", self.url("/video_feed"), token)
    }
}

// ============================================================================
// Vision Backend Response Types
// ============================================================================

/// Capture-control and result-processing response body
#[derive(Debug, Deserialize)]
struct ControlResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_url_is_keyed_by_token() {
        let client = HttpVisionClient::new("http://localhost:5001");
        let token = Uuid::new_v4();
        let url = client.stream_url(token);
        assert_eq!(
            url,
            format!("http://localhost:5001/video_feed?token={}", token)
        );
    }

    #[test]
    fn trailing_slash_in_base_url_is_tolerated() {
        let client = HttpVisionClient::new("http://localhost:5001/");
        assert_eq!(client.url("/status"), "http://localhost:5001/status");
    }

    #[test]
    fn control_response_parses_without_message() {
        let response: ControlResponse = serde_json::from_str(r#"{"status":"started"}"#).unwrap();
        assert_eq!(response.status, "started");
        assert!(response.message.is_none());
    }

    #[test]
    fn status_response_parses_null_detection() {
        let status: ProcessingStatus =
            serde_json::from_str(r#"{"processing":true,"detected_text":null}"#).unwrap();
        assert!(status.processing);
        assert!(status.detected_text.is_none());
    }

    #[test]
    fn status_response_parses_detection() {
        let status: ProcessingStatus =
            serde_json::from_str(r#"{"processing":true,"detected_text":"IZZE"}"#).unwrap();
        assert_eq!(status.detected_text.as_deref(), Some("IZZE"));
    }
}
