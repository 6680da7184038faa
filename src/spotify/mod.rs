//! # Spotify Integration Module
//!
//! HTTP integration with Spotify's accounts service and Web API.
//!
//! ```text
//! Session layer (SessionAuthority)
//!          ↓ TokenExchange
//! auth    - token endpoint: authorization_code and refresh_token grants
//!
//! API consumers (axum handlers, CLI)
//!          ↓ current_access_token() per request
//! client  - profile, playlists, playlist tracks, player commands
//! player  - browser device tracking, token callback, playback transfer
//! ```
//!
//! ## Failure classification
//!
//! The token endpoint client splits failures into terminal ones (the grant
//! or refresh token will never be accepted; 4xx such as `invalid_grant`) and
//! transient ones (timeouts, connection errors, 5xx, 429). The session layer
//! turns the first into an expired session and retries the second on the
//! next access.
//!
//! The Web API client reports provider errors through [`crate::error::ApiError`]
//! and retries a 502 Bad Gateway once.

pub mod auth;
pub mod client;
pub mod player;
