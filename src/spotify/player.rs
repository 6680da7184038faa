use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    error::{ApiError, SessionError},
    session::SessionAuthority,
    spotify::client::SpotifyClient,
};

/// Token source handed to the in-browser playback SDK.
///
/// Every call goes back to the session; nothing is cached here.
#[derive(Clone)]
pub struct TokenCallback {
    session: SessionAuthority,
}

impl TokenCallback {
    pub async fn token(&self) -> Result<String, SessionError> {
        self.session.current_access_token().await
    }
}

/// How often and how patiently playback is moved to a freshly ready device.
#[derive(Debug, Clone, Copy)]
pub struct TransferPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for TransferPolicy {
    fn default() -> Self {
        TransferPolicy {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Wrapper around the browser player device: tracks which device the SDK
/// registered and forwards control commands to it.
pub struct PlaybackController {
    client: Arc<SpotifyClient>,
    device_id: Mutex<Option<String>>,
    policy: TransferPolicy,
}

impl PlaybackController {
    pub fn new(client: Arc<SpotifyClient>) -> Self {
        Self::with_policy(client, TransferPolicy::default())
    }

    pub fn with_policy(client: Arc<SpotifyClient>, policy: TransferPolicy) -> Self {
        PlaybackController {
            client,
            device_id: Mutex::new(None),
            policy,
        }
    }

    pub fn token_callback(&self) -> TokenCallback {
        TokenCallback {
            session: self.client.session().clone(),
        }
    }

    pub fn device_id(&self) -> Option<String> {
        self.device_id.lock().clone()
    }

    /// The SDK reported `device_id` ready: remember it and move playback there.
    ///
    /// Transient failures are retried with linear backoff up to the policy's
    /// attempt limit; anything else is returned on the first occurrence.
    pub async fn on_ready(&self, device_id: &str) -> Result<(), ApiError> {
        *self.device_id.lock() = Some(device_id.to_string());

        let mut attempt = 1;
        loop {
            match self.client.transfer_playback(device_id, false).await {
                Ok(()) => {
                    info!(device_id, attempt, "playback transferred");
                    return Ok(());
                }
                Err(e) if e.is_retryable() && attempt < self.policy.max_attempts => {
                    warn!(device_id, attempt, error = %e, "playback transfer failed, retrying");
                    sleep(self.policy.backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(device_id, attempt, error = %e, "playback transfer failed");
                    return Err(e);
                }
            }
        }
    }

    /// The SDK reported `device_id` offline.
    pub fn on_not_ready(&self, device_id: &str) {
        let mut current = self.device_id.lock();
        if current.as_deref() == Some(device_id) {
            *current = None;
        }
    }

    pub async fn toggle_play(&self, playing: bool) -> Result<(), ApiError> {
        let device = self.device_id();
        if playing {
            self.client.pause(device.as_deref()).await
        } else {
            self.client.play(device.as_deref()).await
        }
    }

    pub async fn play(&self) -> Result<(), ApiError> {
        self.client.play(self.device_id().as_deref()).await
    }

    pub async fn pause(&self) -> Result<(), ApiError> {
        self.client.pause(self.device_id().as_deref()).await
    }

    pub async fn next(&self) -> Result<(), ApiError> {
        self.client.next(self.device_id().as_deref()).await
    }

    pub async fn previous(&self) -> Result<(), ApiError> {
        self.client.previous(self.device_id().as_deref()).await
    }

    pub async fn set_volume(&self, percent: u8) -> Result<(), ApiError> {
        self.client
            .set_volume(percent, self.device_id().as_deref())
            .await
    }
}
