use axum::{
    Extension,
    extract::{Path, Query},
    http::StatusCode,
};
use serde::Deserialize;

use super::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ToggleParams {
    /// Whether the page currently shows playback as running.
    playing: bool,
}

#[derive(Debug, Deserialize)]
pub struct VolumeParams {
    percent: u8,
}

/// Called by the page once the SDK reports its device ready.
pub async fn transfer(
    Path(device_id): Path<String>,
    Extension(state): Extension<AppState>,
) -> Result<StatusCode, ApiError> {
    state.player.on_ready(&device_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn play(Extension(state): Extension<AppState>) -> Result<StatusCode, ApiError> {
    state.player.play().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn pause(Extension(state): Extension<AppState>) -> Result<StatusCode, ApiError> {
    state.player.pause().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle(
    Query(params): Query<ToggleParams>,
    Extension(state): Extension<AppState>,
) -> Result<StatusCode, ApiError> {
    state.player.toggle_play(params.playing).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn next(Extension(state): Extension<AppState>) -> Result<StatusCode, ApiError> {
    state.player.next().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn previous(Extension(state): Extension<AppState>) -> Result<StatusCode, ApiError> {
    state.player.previous().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn volume(
    Query(params): Query<VolumeParams>,
    Extension(state): Extension<AppState>,
) -> Result<StatusCode, ApiError> {
    state.player.set_volume(params.percent).await?;
    Ok(StatusCode::NO_CONTENT)
}
