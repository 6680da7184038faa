use axum::{Extension, Json};
use serde::Serialize;

use super::AppState;
use crate::{error::SessionError, types::SessionState};

#[derive(Debug, Serialize)]
pub struct TokenBody {
    access_token: String,
    expires_in: Option<i64>,
}

/// Token callback for the browser playback SDK.
pub async fn token(Extension(state): Extension<AppState>) -> Result<Json<TokenBody>, SessionError> {
    let access_token = state.player.token_callback().token().await?;
    Ok(Json(TokenBody {
        access_token,
        expires_in: state.session.expires_in_millis().map(|ms| (ms / 1000).max(0)),
    }))
}

pub async fn session(Extension(state): Extension<AppState>) -> Json<SessionState> {
    Json(state.session.state())
}

pub async fn logout(Extension(state): Extension<AppState>) -> Json<SessionState> {
    state.session.sign_out();
    Json(state.session.state())
}
