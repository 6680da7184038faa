//! # CLI Module
//!
//! Command implementations for the `sporlplay` binary. Every command starts
//! from the same [`Context`]: settings, a session authority restored from the
//! credential cache, and the cache itself so the command can write back
//! whatever the session looks like when it is done.
//!
//! ## Commands
//!
//! - [`auth`] - browser sign-in through the local callback server
//! - [`serve`] - run the HTTP server for the browser player
//! - [`token`] - print a currently-valid access token
//! - [`status`] - show session state and time to expiry
//! - [`logout`] - end the session and drop the cached credential
//! - [`playlists`] - list the signed-in user's playlists

mod auth;
mod playlist;
mod serve;
mod session;

use std::{sync::Arc, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    config::Settings,
    error,
    session::{CredentialCache, SessionAuthority},
    spotify::auth::SpotifyTokenClient,
    warning,
};

pub use auth::auth;
pub use playlist::playlists;
pub use serve::serve;
pub use session::{logout, status, token};

pub struct Context {
    pub settings: Settings,
    pub session: SessionAuthority,
    pub cache: CredentialCache,
}

impl Context {
    /// Builds the session and restores the cached credential, if any.
    pub async fn load(settings: Settings) -> Self {
        let exchange = match SpotifyTokenClient::from_settings(&settings) {
            Ok(client) => Arc::new(client),
            Err(e) => error!("Cannot set up token client: {}", e),
        };
        let session = SessionAuthority::from_settings(exchange, &settings);
        let cache = CredentialCache::default_location();

        match cache.load().await {
            Ok(Some(credential)) => session.restore(credential),
            Ok(None) => {}
            Err(e) => warning!("Ignoring cached credential: {}", e),
        }

        Context {
            settings,
            session,
            cache,
        }
    }

    /// Writes the session's credential back to the cache.
    pub async fn persist(&self) {
        if let Err(e) = self.cache.sync_from(&self.session).await {
            warning!("Failed to save credential to cache: {}", e);
        }
    }
}

pub(crate) fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb
}
