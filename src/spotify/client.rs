use std::time::Duration;

use reqwest::{Client, Method, Response, StatusCode, header::RETRY_AFTER};
use serde::{Serialize, de::DeserializeOwned};
use tokio::time::sleep;
use tracing::debug;

use crate::{
    config::Settings,
    error::{ApiError, ConfigError},
    session::SessionAuthority,
    types::{
        Device, DevicesResponse, Paging, Playlist, PlaylistItem, TransferPlaybackRequest,
        UserProfile,
    },
    utils::is_spotify_id,
};

/// Delay before the single retry of a 502 Bad Gateway response.
const BAD_GATEWAY_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Spotify Web API gateway.
///
/// Every request obtains its bearer token from the session at send time, so
/// refresh is invisible to callers and no token is kept between requests.
#[derive(Clone)]
pub struct SpotifyClient {
    http: Client,
    api_url: String,
    session: SessionAuthority,
}

impl SpotifyClient {
    pub fn new(
        api_url: impl Into<String>,
        timeout: Duration,
        session: SessionAuthority,
    ) -> Result<Self, ConfigError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(SpotifyClient {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn from_settings(settings: &Settings, session: SessionAuthority) -> Result<Self, ConfigError> {
        Self::new(settings.api_url.clone(), settings.http_timeout, session)
    }

    pub fn session(&self) -> &SessionAuthority {
        &self.session
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<Response, ApiError> {
        let url = format!("{}{}", self.api_url, path);
        let mut retried = false;

        loop {
            let token = self.session.current_access_token().await?;
            let mut request = self
                .http
                .request(method.clone(), &url)
                .bearer_auth(&token)
                .query(query);
            request = match body {
                Some(body) => request.json(body),
                None if method != Method::GET => request.header(reqwest::header::CONTENT_LENGTH, 0),
                None => request,
            };

            let response = request.send().await?;
            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }
            if status == StatusCode::BAD_GATEWAY && !retried {
                debug!(%url, "bad gateway, retrying once");
                retried = true;
                sleep(BAD_GATEWAY_RETRY_DELAY).await;
                continue;
            }

            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body, retry_after));
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let response = self.send::<()>(Method::GET, path, query, None).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    async fn command<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<(), ApiError> {
        self.send(method, path, query, body).await.map(|_| ())
    }

    pub async fn current_user(&self) -> Result<UserProfile, ApiError> {
        self.get_json("/me", &[]).await
    }

    pub async fn playlists(&self, limit: u32, offset: u32) -> Result<Paging<Playlist>, ApiError> {
        self.get_json(
            "/me/playlists",
            &[("limit", limit.clamp(1, 50).to_string()), ("offset", offset.to_string())],
        )
        .await
    }

    pub async fn playlist_tracks(
        &self,
        playlist_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Paging<PlaylistItem>, ApiError> {
        if !is_spotify_id(playlist_id) {
            return Err(ApiError::InvalidArgument(format!(
                "not a playlist id: {playlist_id}"
            )));
        }
        self.get_json(
            &format!("/playlists/{playlist_id}/tracks"),
            &[("limit", limit.clamp(1, 100).to_string()), ("offset", offset.to_string())],
        )
        .await
    }

    pub async fn devices(&self) -> Result<Vec<Device>, ApiError> {
        let response: DevicesResponse = self.get_json("/me/player/devices", &[]).await?;
        Ok(response.devices)
    }

    pub async fn transfer_playback(&self, device_id: &str, play: bool) -> Result<(), ApiError> {
        let body = TransferPlaybackRequest {
            device_ids: vec![device_id.to_string()],
            play,
        };
        self.command(Method::PUT, "/me/player", &[], Some(&body)).await
    }

    pub async fn play(&self, device_id: Option<&str>) -> Result<(), ApiError> {
        self.command::<()>(Method::PUT, "/me/player/play", &device_query(device_id), None)
            .await
    }

    pub async fn pause(&self, device_id: Option<&str>) -> Result<(), ApiError> {
        self.command::<()>(Method::PUT, "/me/player/pause", &device_query(device_id), None)
            .await
    }

    pub async fn next(&self, device_id: Option<&str>) -> Result<(), ApiError> {
        self.command::<()>(Method::POST, "/me/player/next", &device_query(device_id), None)
            .await
    }

    pub async fn previous(&self, device_id: Option<&str>) -> Result<(), ApiError> {
        self.command::<()>(Method::POST, "/me/player/previous", &device_query(device_id), None)
            .await
    }

    pub async fn set_volume(&self, percent: u8, device_id: Option<&str>) -> Result<(), ApiError> {
        let mut query = device_query(device_id);
        query.push(("volume_percent", percent.min(100).to_string()));
        self.command::<()>(Method::PUT, "/me/player/volume", &query, None)
            .await
    }
}

fn device_query(device_id: Option<&str>) -> Vec<(&'static str, String)> {
    device_id
        .map(|id| vec![("device_id", id.to_string())])
        .unwrap_or_default()
}
