use axum::{
    Extension, Json,
    extract::{Path, Query},
};
use serde::Deserialize;

use super::AppState;
use crate::{
    error::ApiError,
    types::{Device, Paging, Playlist, PlaylistItem, UserProfile},
};

#[derive(Debug, Deserialize)]
pub struct PageParams {
    limit: Option<u32>,
    offset: Option<u32>,
}

pub async fn me(Extension(state): Extension<AppState>) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(state.client.current_user().await?))
}

pub async fn playlists(
    Query(page): Query<PageParams>,
    Extension(state): Extension<AppState>,
) -> Result<Json<Paging<Playlist>>, ApiError> {
    let playlists = state
        .client
        .playlists(page.limit.unwrap_or(20), page.offset.unwrap_or(0))
        .await?;
    Ok(Json(playlists))
}

pub async fn playlist_tracks(
    Path(id): Path<String>,
    Query(page): Query<PageParams>,
    Extension(state): Extension<AppState>,
) -> Result<Json<Paging<PlaylistItem>>, ApiError> {
    let tracks = state
        .client
        .playlist_tracks(&id, page.limit.unwrap_or(50), page.offset.unwrap_or(0))
        .await?;
    Ok(Json(tracks))
}

pub async fn devices(Extension(state): Extension<AppState>) -> Result<Json<Vec<Device>>, ApiError> {
    Ok(Json(state.client.devices().await?))
}
