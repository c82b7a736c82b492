//! Media server collaborators
//!
//! The timer core never talks to players directly; it goes through two narrow
//! contracts, `SessionDirectory` (who is playing right now) and
//! `PlaybackController` (stop playback / show a message). `MediaServerClient`
//! implements both over the host media server's HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::timer::TimerKey;

/// Request timeout for media server calls. A slow or wedged server must not
/// stall sweep ticks or event handling indefinitely.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A live playback session on the media server.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerSession {
    #[serde(rename = "Id")]
    pub session_id: String,
    #[serde(rename = "UserId")]
    pub user_id: Uuid,
    #[serde(rename = "DeviceId", default)]
    pub device_id: String,
}

impl PlayerSession {
    /// Whether this session is owned by `key`. A key with an empty device id
    /// matches every device the user is playing on.
    pub fn matches(&self, key: &TimerKey) -> bool {
        self.user_id == key.user_id && (key.any_device() || self.device_id == key.device_id)
    }
}

/// Read access to the media server's live session inventory.
#[async_trait]
pub trait SessionDirectory: Send + Sync {
    /// Snapshot of the sessions currently known to the media server.
    async fn live_sessions(&self) -> Result<Vec<PlayerSession>>;
}

/// Remote control of a playback session. Commands are fire-and-forget and may
/// fail independently per session.
#[async_trait]
pub trait PlaybackController: Send + Sync {
    /// Ask the player behind `session_id` to stop playback.
    async fn stop_playback(&self, session_id: &str) -> Result<()>;

    /// Show a transient on-screen message in `session_id`.
    async fn send_message(
        &self,
        session_id: &str,
        header: &str,
        text: &str,
        timeout_ms: u64,
    ) -> Result<()>;
}

/// HTTP client for the host media server's session API.
pub struct MediaServerClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl MediaServerClient {
    pub fn new(base_url: &str, api_token: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl SessionDirectory for MediaServerClient {
    async fn live_sessions(&self) -> Result<Vec<PlayerSession>> {
        let response = self
            .http
            .get(self.url("/Sessions"))
            .header("X-Api-Key", &self.api_token)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }
}

#[async_trait]
impl PlaybackController for MediaServerClient {
    async fn stop_playback(&self, session_id: &str) -> Result<()> {
        self.http
            .post(self.url(&format!("/Sessions/{session_id}/Playing/Stop")))
            .header("X-Api-Key", &self.api_token)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    async fn send_message(
        &self,
        session_id: &str,
        header: &str,
        text: &str,
        timeout_ms: u64,
    ) -> Result<()> {
        self.http
            .post(self.url(&format!("/Sessions/{session_id}/Message")))
            .header("X-Api-Key", &self.api_token)
            .json(&serde_json::json!({
                "Header": header,
                "Text": text,
                "TimeoutMs": timeout_ms,
            }))
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
