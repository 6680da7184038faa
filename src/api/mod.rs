//! # API Module
//!
//! HTTP endpoints served to the browser player.
//!
//! ## Endpoints
//!
//! ### Authentication
//!
//! - [`login`] - redirects to Spotify's authorization page with a fresh PKCE
//!   challenge and state.
//! - [`callback`] - completes the authorization-code flow through the
//!   session authority.
//! - [`token`] - the player SDK's token callback; always answers with a
//!   currently-valid access token or a typed session error.
//! - [`session`] / [`logout`] - derived session state and sign-out.
//!
//! ### Provider gateway
//!
//! - [`me`], [`playlists`], [`playlist_tracks`], [`devices`] - read-only Web
//!   API calls.
//! - [`transfer`], [`play`], [`pause`], [`toggle`], [`next`], [`previous`],
//!   [`volume`] - player commands for the browser device.
//!
//! ### Monitoring
//!
//! - [`health`] - status, version and session state.
//!
//! Errors are rendered as JSON `{error, message, session_expired}` with a
//! status derived from [`ApiError`].

mod account;
mod callback;
mod gateway;
mod health;
mod player;

use std::sync::Arc;

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tokio::sync::Mutex;

use crate::{
    config::Settings,
    error::{ApiError, SessionError},
    session::SessionAuthority,
    spotify::{client::SpotifyClient, player::PlaybackController},
    types::PkceToken,
};

pub use callback::{callback, login};
pub use gateway::{devices, me, playlist_tracks, playlists};
pub use health::health;
pub use player::{next, pause, play, previous, toggle, transfer, volume};
pub use account::{logout, session, token};

/// Everything the handlers share.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub session: SessionAuthority,
    pub client: Arc<SpotifyClient>,
    pub player: Arc<PlaybackController>,
    pub pending: Arc<Mutex<Option<PkceToken>>>,
}

impl AppState {
    pub fn new(settings: Settings, session: SessionAuthority, client: SpotifyClient) -> Self {
        let client = Arc::new(client);
        AppState {
            settings: Arc::new(settings),
            session,
            player: Arc::new(PlaybackController::new(Arc::clone(&client))),
            client,
            pending: Arc::new(Mutex::new(None)),
        }
    }
}

fn session_status(err: &SessionError) -> StatusCode {
    match err {
        SessionError::NotAuthenticated
        | SessionError::SessionExpired
        | SessionError::SignInFailed(_) => StatusCode::UNAUTHORIZED,
        SessionError::RefreshTemporarilyUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn error_code(err: &ApiError) -> &'static str {
    match err {
        ApiError::Session(SessionError::NotAuthenticated) => "not_authenticated",
        ApiError::Session(SessionError::SessionExpired) => "session_expired",
        ApiError::Session(SessionError::RefreshTemporarilyUnavailable) => "refresh_unavailable",
        ApiError::Session(SessionError::SignInFailed(_)) => "sign_in_failed",
        ApiError::Unauthorized => "unauthorized",
        ApiError::Forbidden(_) => "forbidden",
        ApiError::NotFound(_) => "not_found",
        ApiError::RateLimited { .. } => "rate_limited",
        ApiError::Server(_) => "provider_error",
        ApiError::Network(_) => "network_error",
        ApiError::InvalidResponse(_) => "invalid_response",
        ApiError::InvalidArgument(_) => "invalid_argument",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Session(err) => session_status(err),
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Server(_) | ApiError::Network(_) | ApiError::InvalidResponse(_) => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(json!({
            "error": error_code(&self),
            "message": self.to_string(),
            "session_expired": matches!(self, ApiError::Session(SessionError::SessionExpired)),
        }));

        let mut response = (status, body).into_response();
        if let ApiError::RateLimited {
            retry_after: Some(after),
        } = self
        {
            if let Ok(value) = HeaderValue::from_str(&after.as_secs().to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }
        response
    }
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        ApiError::Session(self).into_response()
    }
}
