use std::net::SocketAddr;

use axum::{
    Extension, Router,
    routing::{get, post, put},
};
use tracing::info;

use crate::api::{self, AppState};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/login", get(api::login))
        .route("/callback", get(api::callback))
        .route("/api/token", get(api::token))
        .route("/api/session", get(api::session))
        .route("/api/logout", post(api::logout))
        .route("/api/me", get(api::me))
        .route("/api/playlists", get(api::playlists))
        .route("/api/playlists/{id}/tracks", get(api::playlist_tracks))
        .route("/api/player/devices", get(api::devices))
        .route("/api/player/transfer/{device_id}", put(api::transfer))
        .route("/api/player/play", put(api::play))
        .route("/api/player/pause", put(api::pause))
        .route("/api/player/toggle", put(api::toggle))
        .route("/api/player/next", post(api::next))
        .route("/api/player/previous", post(api::previous))
        .route("/api/player/volume", put(api::volume))
        .layer(Extension(state))
}

pub async fn start_api_server(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "api server listening");
    axum::serve(listener, app).await
}
