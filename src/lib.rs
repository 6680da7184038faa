//! Spotify Browser Player Session Library
//!
//! Keeps a Spotify OAuth session alive for a browser-hosted player: the
//! authorization-code exchange, the stored credential, on-demand refresh of
//! the access token, and typed failures for consumers that need a token.
//! Around that core it ships the local HTTP server the player talks to and
//! the CLI that drives sign-in.
//!
//! # Modules
//!
//! - `session` - credential store, refresher and the session authority
//! - `spotify` - token endpoint client, Web API gateway, playback controller
//! - `api` - HTTP handlers for the browser player
//! - `server` - router assembly and the listener
//! - `cli` - command implementations
//! - `config` - settings from the environment
//! - `error` - typed errors
//! - `clock` - injectable time source
//! - `types` - credential, session and Web API data types
//! - `utils` - PKCE helpers and formatting
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use sporlplay::{config::Settings, session::SessionAuthority, spotify::auth::SpotifyTokenClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::from_env()?;
//!     let exchange = Arc::new(SpotifyTokenClient::from_settings(&settings)?);
//!     let session = SessionAuthority::from_settings(exchange, &settings);
//!     let token = session.current_access_token().await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod server;
pub mod session;
pub mod spotify;
pub mod types;
pub mod utils;

/// Prints an informational message with a blue bullet point.
///
/// Creates a formatted output line with a distinctive blue "o" indicator
/// followed by the provided message. Used for general information and
/// status updates throughout the application.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Example
///
/// ```
/// info!("Starting authentication process...");
/// info!("Access token expires in {}", remaining);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// Creates a formatted output line with a green "✓" indicator to signify
/// successful completion of operations. Used to provide positive feedback
/// when operations complete successfully.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Example
///
/// ```
/// success!("Authentication completed successfully");
/// success!("Signed out.");
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Creates a formatted error output with a red "!" indicator and immediately
/// terminates the program with exit code 1. Used for unrecoverable errors
/// that require immediate program termination.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Behavior
///
/// This macro will cause the program to exit immediately after printing
/// the error message. It should only be used for fatal errors where
/// recovery is not possible.
///
/// # Example
///
/// ```
/// error!("Cannot load environment. Err: {}", e);
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// Creates a formatted output line with a yellow "!" indicator to highlight
/// potential issues or important notices that don't require program termination.
/// Used for recoverable issues or important information that users should notice.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Example
///
/// ```
/// warning!("Ignoring cached credential: {}", e);
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
