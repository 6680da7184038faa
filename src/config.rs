//! Configuration management for the Sporlplay session backend.
//!
//! This module handles loading configuration values from environment
//! variables and `.env` files and turns them into a typed [`Settings`] value.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults (where applicable)

use std::{env, net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use crate::error::ConfigError;

pub const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_SCOPE: &str = "streaming user-read-email user-read-private user-read-playback-state user-modify-playback-state playlist-read-private playlist-read-collaborative";
pub const DEFAULT_REFRESH_MARGIN_SECS: u64 = 60;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Returns the application directory inside the platform's local data dir.
///
/// - Linux: `~/.local/share/sporlplay`
/// - macOS: `~/Library/Application Support/sporlplay`
/// - Windows: `%LOCALAPPDATA%/sporlplay`
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("sporlplay");
    path
}

/// Loads environment variables from a `.env` file in the local data directory.
///
/// Creates the directory if needed. A missing `.env` file is not an error:
/// every value may also come straight from the process environment, and
/// variables already present in the environment are never overridden.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the `.env` file
/// exists but cannot be parsed.
pub async fn load_env() -> Result<(), ConfigError> {
    let dir = data_dir();
    async_fs::create_dir_all(&dir).await?;

    match dotenv::from_path(dir.join(".env")) {
        Ok(()) => Ok(()),
        Err(dotenv::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ConfigError::Env(e.to_string())),
    }
}

/// Typed runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Bind address of the local callback/API server (`SERVER_ADDRESS`).
    pub server_addr: SocketAddr,
    /// `SPOTIFY_API_AUTH_CLIENT_ID`
    pub client_id: String,
    /// `SPOTIFY_API_AUTH_CLIENT_SECRET`; `None` for a PKCE public client.
    pub client_secret: Option<String>,
    /// `SPOTIFY_API_REDIRECT_URI`; must match the registered application.
    pub redirect_uri: String,
    /// `SPOTIFY_API_AUTH_SCOPE`
    pub scope: String,
    /// `SPOTIFY_API_AUTH_URL`
    pub auth_url: String,
    /// `SPOTIFY_API_TOKEN_URL`
    pub token_url: String,
    /// `SPOTIFY_API_URL`
    pub api_url: String,
    /// `SPORLPLAY_REFRESH_MARGIN_SECS`: how long before expiry a token is
    /// already treated as expired.
    pub refresh_margin: Duration,
    /// `SPORLPLAY_HTTP_TIMEOUT_SECS`: bound on every provider request.
    pub http_timeout: Duration,
}

impl Settings {
    /// Reads settings from the process environment.
    ///
    /// Call [`load_env`] first so values from the `.env` file are visible.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads settings through an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let server_addr = {
            let raw = required("SERVER_ADDRESS")?;
            SocketAddr::from_str(&raw).map_err(|e| ConfigError::Invalid {
                key: "SERVER_ADDRESS",
                reason: e.to_string(),
            })?
        };

        let redirect_uri = required("SPOTIFY_API_REDIRECT_URI")?;
        url::Url::parse(&redirect_uri).map_err(|e| ConfigError::Invalid {
            key: "SPOTIFY_API_REDIRECT_URI",
            reason: e.to_string(),
        })?;

        Ok(Settings {
            server_addr,
            client_id: required("SPOTIFY_API_AUTH_CLIENT_ID")?,
            client_secret: get("SPOTIFY_API_AUTH_CLIENT_SECRET"),
            redirect_uri,
            scope: get("SPOTIFY_API_AUTH_SCOPE").unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
            auth_url: get("SPOTIFY_API_AUTH_URL").unwrap_or_else(|| DEFAULT_AUTH_URL.to_string()),
            token_url: get("SPOTIFY_API_TOKEN_URL")
                .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            api_url: get("SPOTIFY_API_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            refresh_margin: Duration::from_secs(seconds(
                "SPORLPLAY_REFRESH_MARGIN_SECS",
                get("SPORLPLAY_REFRESH_MARGIN_SECS"),
                DEFAULT_REFRESH_MARGIN_SECS,
            )?),
            http_timeout: Duration::from_secs(seconds(
                "SPORLPLAY_HTTP_TIMEOUT_SECS",
                get("SPORLPLAY_HTTP_TIMEOUT_SECS"),
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
        })
    }
}

fn seconds(key: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse::<u64>().map_err(|e| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const MINIMAL: &[(&str, &str)] = &[
        ("SERVER_ADDRESS", "127.0.0.1:8888"),
        ("SPOTIFY_API_AUTH_CLIENT_ID", "client"),
        ("SPOTIFY_API_REDIRECT_URI", "http://127.0.0.1:8888/callback"),
    ];

    #[test]
    fn defaults_apply_when_optional_values_are_absent() {
        let settings = Settings::from_lookup(lookup(MINIMAL)).unwrap();
        assert_eq!(settings.token_url, DEFAULT_TOKEN_URL);
        assert_eq!(settings.api_url, DEFAULT_API_URL);
        assert_eq!(settings.refresh_margin, Duration::from_secs(60));
        assert_eq!(settings.http_timeout, Duration::from_secs(10));
        assert!(settings.client_secret.is_none());
    }

    #[test]
    fn missing_client_id_is_reported_by_name() {
        let pairs = [MINIMAL[0], MINIMAL[2]];
        let err = Settings::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SPOTIFY_API_AUTH_CLIENT_ID")));
    }

    #[test]
    fn empty_secret_means_public_client() {
        let mut pairs = MINIMAL.to_vec();
        pairs.push(("SPOTIFY_API_AUTH_CLIENT_SECRET", "  "));
        let settings = Settings::from_lookup(lookup(&pairs)).unwrap();
        assert!(settings.client_secret.is_none());
    }

    #[test]
    fn invalid_margin_is_rejected() {
        let mut pairs = MINIMAL.to_vec();
        pairs.push(("SPORLPLAY_REFRESH_MARGIN_SECS", "soon"));
        let err = Settings::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "SPORLPLAY_REFRESH_MARGIN_SECS",
                ..
            }
        ));
    }

    #[test]
    fn trailing_slash_is_stripped_from_api_url() {
        let mut pairs = MINIMAL.to_vec();
        pairs.push(("SPOTIFY_API_URL", "http://localhost:9000/v1/"));
        let settings = Settings::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(settings.api_url, "http://localhost:9000/v1");
    }
}
